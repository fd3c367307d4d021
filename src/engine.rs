use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::delivery::DeliveryChannel;
use crate::error::EngineError;
use crate::filter::TraceFilter;
use crate::parser::TraceParser;
use crate::source::{LineListener, LogSource};
use crate::types::{EngineConfig, Trace};

/// Observer side of the pipeline. Called once per flush, on the delivery
/// channel's context, never with an empty batch. The observer owns the
/// delivered traces; the engine retains no reference to them.
pub trait TraceObserver: Send + Sync {
    fn on_new_traces(&self, traces: &[Trace]);
}

/// Engine lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadState {
    Idle,
    Reading,
}

impl fmt::Display for ReadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Reading => write!(f, "reading"),
        }
    }
}

/// State shared with the source's per-line listener. The source invokes the
/// listener sequentially, so the mutex only exists to make the closure
/// `Sync`; there is no writer contention on the ingestion path.
struct Shared {
    filter: TraceFilter,
    sampling_interval_ms: u64,
    last_flush: Option<u64>,
    pending: Vec<Trace>,
}

type ObserverSet = Arc<RwLock<Vec<Arc<dyn TraceObserver>>>>;

/// The batching engine. Accumulates admitted traces into a pending batch
/// and flushes event-driven, on arrivals only:
///
/// * the first admitted trace after a (re)start flushes immediately and
///   alone;
/// * later arrivals flush when at least the sampling interval has elapsed
///   since the last flush, carrying everything buffered so far (the
///   triggering trace included);
/// * with no further arrivals a below-threshold buffer stays undelivered —
///   there is no background timer.
pub struct TraceEngine {
    source: Box<dyn LogSource>,
    delivery: Arc<dyn DeliveryChannel>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    observers: ObserverSet,
    shared: Arc<Mutex<Shared>>,
    listener: Option<LineListener>,
    state: ReadState,
}

impl TraceEngine {
    pub fn new(
        source: Box<dyn LogSource>,
        delivery: Arc<dyn DeliveryChannel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = EngineConfig::default();
        let shared = Arc::new(Mutex::new(Shared {
            filter: TraceFilter::new(config.filter.as_deref()),
            sampling_interval_ms: config.sampling_interval_ms,
            last_flush: None,
            pending: Vec::new(),
        }));

        Self {
            source,
            delivery,
            clock,
            config,
            observers: Arc::new(RwLock::new(Vec::new())),
            shared,
            listener: None,
            state: ReadState::Idle,
        }
    }

    /// Replace the engine configuration. The filter and interval are read
    /// through shared state, so the new values apply to lines processed
    /// from this point on; use [`restart`](Self::restart) to also reset
    /// batching state and the source.
    pub fn set_config(&mut self, config: EngineConfig) {
        {
            let mut shared = self.shared.lock();
            shared.filter = TraceFilter::new(config.filter.as_deref());
            shared.sampling_interval_ms = config.sampling_interval_ms;
        }
        self.config = config;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Register an observer. Safe to call while a flush is in flight.
    pub fn register_observer(&self, observer: Arc<dyn TraceObserver>) {
        self.observers.write().push(observer);
    }

    /// Remove an observer by identity. The observer set is snapshotted at
    /// post time, so a flush posted before this call may still reach the
    /// observer; nothing posted afterwards will.
    pub fn unregister_observer(&self, observer: &Arc<dyn TraceObserver>) {
        self.observers.write().retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// Begin reading from the source. Rejected when already reading.
    pub fn start_reading(&mut self) -> Result<(), EngineError> {
        if self.state == ReadState::Reading {
            return Err(EngineError::InvalidState {
                action: "start",
                state: self.state,
            });
        }

        self.reset_batching_state();
        let listener = self.line_listener();
        self.source.set_listener(listener);
        self.source.start();
        self.state = ReadState::Reading;
        info!("started reading");
        Ok(())
    }

    /// Stop reading. Rejected when idle.
    pub fn stop_reading(&mut self) -> Result<(), EngineError> {
        if self.state == ReadState::Idle {
            return Err(EngineError::InvalidState {
                action: "stop",
                state: self.state,
            });
        }

        self.source.stop_reading();
        self.state = ReadState::Idle;
        info!("stopped reading");
        Ok(())
    }

    /// Tear down the current source and resume with a fresh duplicate of
    /// it: same source configuration, fresh source state, reset batching
    /// state, and the same listener and registered observers as before.
    /// Only valid while reading.
    pub fn restart(&mut self) -> Result<(), EngineError> {
        if self.state != ReadState::Reading {
            return Err(EngineError::InvalidState {
                action: "restart",
                state: self.state,
            });
        }

        self.source.stop_reading();
        self.source.interrupt();
        self.source = self.source.duplicate();
        let listener = self.line_listener();
        self.source.set_listener(listener);
        self.reset_batching_state();
        self.source.start();
        info!("restarted reading");
        Ok(())
    }

    fn reset_batching_state(&self) {
        let mut shared = self.shared.lock();
        shared.last_flush = None;
        shared.pending = Vec::new();
    }

    /// The per-line callback handed to the source. Built once and reused
    /// across restarts so a duplicated source sees the same listener.
    fn line_listener(&mut self) -> LineListener {
        if let Some(listener) = &self.listener {
            return Arc::clone(listener);
        }

        let shared = Arc::clone(&self.shared);
        let observers = Arc::clone(&self.observers);
        let delivery = Arc::clone(&self.delivery);
        let clock = Arc::clone(&self.clock);

        let listener: LineListener = Arc::new(move |raw: &str| {
            let trace = match TraceParser::parse(raw) {
                Ok(trace) => trace,
                Err(err) => {
                    // Recoverable: drop the line, keep the stream alive
                    debug!(%err, "dropped unparseable line");
                    return;
                }
            };

            let mut state = shared.lock();
            if !state.filter.admits(&trace) {
                return;
            }
            state.pending.push(trace);

            let now = clock.now_millis();
            let due = match state.last_flush {
                None => true,
                Some(last) => now.saturating_sub(last) >= state.sampling_interval_ms,
            };
            if !due {
                return;
            }

            // Take the batch so the cleared buffer never aliases memory a
            // delivered batch still sees.
            let batch = std::mem::take(&mut state.pending);
            state.last_flush = Some(now);
            drop(state);

            let snapshot: Vec<Arc<dyn TraceObserver>> = observers.read().clone();
            delivery.post(Box::new(move || {
                for observer in &snapshot {
                    observer.on_new_traces(&batch);
                }
            }));
        });

        self.listener = Some(Arc::clone(&listener));
        listener
    }
}
