use chrono::Local;
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Log to stderr as `2024-01-01T12:00:00 [INFO] - message`.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // Fails only when a logger is already set, e.g. in tests.
    let _ = Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .try_init();
}
