use std::path::Path;
use tracing::{subscriber::set_global_default, Subscriber};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, EnvFilter, Registry};

/// Creates a subscriber writing terse events to `console::Term::stdout`, and a full json record, including
/// the closing of solver spans, to `dosextract.log` in the output directory.
///
/// Simulations run on the rayon pool, so the json record carries the thread of each event.
pub(crate) fn get_subscriber(
    level: super::LogLevel,
    directory: &Path,
) -> (
    impl Subscriber + Send + Sync,
    tracing_appender::non_blocking::WorkerGuard,
) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let console_layer = tracing_subscriber::fmt::Layer::new()
        .with_writer(console::Term::stdout)
        .with_target(false)
        .without_time();

    let (log_file, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, "dosextract.log"));
    let json_layer = tracing_subscriber::fmt::Layer::new()
        .with_writer(log_file)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE)
        .json();

    (
        Registry::default()
            .with(env_filter)
            .with(console_layer)
            .with(json_layer),
        guard,
    )
}

/// Routes `log` records into tracing and installs `subscriber` for the lifetime of the process
pub(crate) fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> color_eyre::Result<()> {
    LogTracer::init()?;
    set_global_default(subscriber)?;
    Ok(())
}
