use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use tracebatch::{
    CommandSource, EngineConfig, SystemClock, TokioDelivery, Trace, TraceEngine, TraceObserver,
};

/// Tail a process's log output and print it in time-sampled batches
#[derive(Parser, Debug)]
#[command(name = "tracebatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Minimum milliseconds between two batch deliveries
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Case-insensitive pattern; only matching traces are delivered
    #[arg(long, value_name = "PATTERN")]
    filter: Option<String>,

    /// TOML file with `sampling_interval_ms` and `filter` keys; flags win
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Command producing log lines (defaults to `adb logcat -v time`)
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    let argv = if args.command.is_empty() {
        vec![
            "adb".to_string(),
            "logcat".to_string(),
            "-v".to_string(),
            "time".to_string(),
        ]
    } else {
        args.command.clone()
    };

    let source = Box::new(CommandSource::new(argv));
    let delivery = TokioDelivery::spawn();
    let mut engine = TraceEngine::new(source, delivery, Arc::new(SystemClock));
    engine.set_config(config);
    engine.register_observer(Arc::new(StdoutObserver));

    engine.start_reading()?;
    tokio::signal::ctrl_c().await?;
    engine.stop_reading()?;

    Ok(())
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Some(interval) = args.interval {
        config.sampling_interval_ms = interval;
    }
    if args.filter.is_some() {
        config.filter = args.filter.clone();
    }

    Ok(config)
}

/// Prints each delivered batch to stdout with a local-time header
struct StdoutObserver;

impl TraceObserver for StdoutObserver {
    fn on_new_traces(&self, traces: &[Trace]) {
        let received = chrono::Local::now().format("%H:%M:%S%.3f");
        println!("-- {} trace(s) at {} --", traces.len(), received);
        for trace in traces {
            if trace.tag.is_empty() {
                println!("{} {}/{}", trace.timestamp, trace.level.as_str(), trace.message);
            } else {
                println!(
                    "{} {}/{}: {}",
                    trace.timestamp,
                    trace.level.as_str(),
                    trace.tag,
                    trace.message
                );
            }
        }
    }
}
