//! Logging bootstrap: a `fern` dispatcher writing to stdout and to
//! `<data_dir>/../log/trace.log`, gated by the configured level.
//!
//! Uses the `fern`+`log` pairing for the CLI bootstrap.

use std::path::Path;

pub fn init(level: log::LevelFilter, log_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let trace_path = log_dir.join("trace.log");

    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                process_uptime(),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .chain(fern::log_file(trace_path)?);

    dispatch.apply().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

/// Seconds since the epoch, without pulling in a date/time crate just for
/// one log line prefix.
fn process_uptime() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    format!("t+{secs}")
}
