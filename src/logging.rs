use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_PREFIX: &str = "deploy";
const LOG_SUFFIX: &str = "log";

/// Install the global subscriber.
///
/// Every run appends JSON events to a daily log file under `log_dir`. The
/// terminal only gets log lines with `--verbose` or an explicit `RUST_LOG`,
/// since regular progress is printed by the console UI. The returned guard
/// must live until exit so buffered file events are flushed.
pub fn init(log_dir: &Path, verbose: bool) -> Option<WorkerGuard> {
    let stderr_filter = match (verbose, EnvFilter::try_from_default_env()) {
        (_, Ok(filter)) => filter,
        (true, Err(_)) => EnvFilter::new("jupyter_deploy=debug"),
        (false, Err(_)) => EnvFilter::new("off"),
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(stderr_filter);

    let appender = std::fs::create_dir_all(log_dir).ok().and_then(|()| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_PREFIX)
            .filename_suffix(LOG_SUFFIX)
            .build(log_dir)
            .ok()
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new("jupyter_deploy=debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();
    guard
}
