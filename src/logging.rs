use std::io::Write;

use log::LevelFilter;

/// Sets up `env_logger`. `RUST_LOG` wins when set; otherwise this crate logs
/// at info (debug when `verbose`) and everything else is silenced.
pub fn setup_logger(verbose: bool) {
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        let level = if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        builder.filter(None, LevelFilter::Off);
        builder.filter(Some(env!("CARGO_CRATE_NAME")), level);
    }

    builder.format(|buf, record| {
        // Keep warnings on their own line when the progress counter is active.
        writeln!(buf, "\r[{}] {}", record.level(), record.args())
    });

    let _ = builder.try_init();
}
