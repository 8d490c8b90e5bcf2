use std::path::PathBuf;

use time::OffsetDateTime;

pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Initialize logging. With a directory, logs rotate daily into it;
/// otherwise everything goes to stdout. Keep the returned guard alive for
/// the lifetime of the process or buffered lines are lost on exit.
pub fn init_log(log: Option<PathBuf>) -> tracing_appender::non_blocking::WorkerGuard {
    let subscriber_builder = tracing_subscriber::fmt::Subscriber::builder()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true);
    let (non_blocking, guard) = if let Some(log) = log {
        if !log.is_dir() {
            panic!("log path is not a directory");
        }
        let file_appender = tracing_appender::rolling::daily(log, "course_server.log");
        tracing_appender::non_blocking(file_appender)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };
    tracing::subscriber::set_global_default(
        subscriber_builder.with_writer(non_blocking).finish(),
    )
    .expect("init log failed");
    guard
}
