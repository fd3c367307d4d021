//! Time-sampled batching engine for streaming process logs.
//!
//! A [`TraceEngine`] tails an external line producer (a [`LogSource`],
//! typically a child process such as `adb logcat -v time`), parses each raw
//! line into a [`Trace`], filters it against an optional case-insensitive
//! pattern, and delivers admitted traces to registered [`TraceObserver`]s
//! in time-bounded batches instead of one notification per line.
//!
//! Flushing is event-driven: a new arrival flushes the pending batch when
//! at least the configured sampling interval has elapsed since the last
//! flush (the very first arrival flushes immediately). There is no
//! background timer, so a below-threshold buffer with no further arrivals
//! stays undelivered indefinitely; stop and restart drop it.
//!
//! Delivery crosses onto a caller-designated context through a
//! [`DeliveryChannel`], keeping observer-side work off the ingestion path.

mod clock;
mod delivery;
mod engine;
mod error;
mod filter;
mod parser;
mod source;
mod types;

pub use clock::{Clock, SystemClock};
pub use delivery::{DeliveryChannel, DeliveryTask, TokioDelivery};
pub use engine::{ReadState, TraceEngine, TraceObserver};
pub use error::{EngineError, MalformedLine};
pub use filter::TraceFilter;
pub use parser::TraceParser;
pub use source::{CommandSource, LineListener, LogSource};
pub use types::{DEFAULT_SAMPLING_INTERVAL_MS, EngineConfig, Trace, TraceLevel};
