use std::io::{self, Write};

/// Setup logging to `filename` (appending) or stderr, at `level` unless
/// `RUST_LOG` says otherwise. Calling it again is harmless: the first logger wins.
pub fn setup(filename: &Option<String>, level: &str) -> io::Result<()> {
    let target = match filename {
        Some(logfile) => env_logger::Target::Pipe(Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(logfile)?,
        )),
        None => env_logger::Target::Stderr,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.to_lowercase()),
    );
    builder
        .target(target)
        .format_module_path(false)
        .format_timestamp_millis();

    #[cfg(not(debug_assertions))]
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {} - {}",
            buf.timestamp_millis(),
            record.level(),
            record.args()
        )
    });
    #[cfg(debug_assertions)]
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {} - {} {} {}",
            buf.timestamp_millis(),
            record.level(),
            record.target(),
            record.line().unwrap_or(0),
            record.args()
        )
    });

    builder.try_init().unwrap_or_default();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_twice_is_harmless() {
        assert!(setup(&None, "DEBUG").is_ok());
        assert!(setup(&None, "INFO").is_ok());
    }

    #[test]
    fn test_setup_bad_logfile() {
        let result = setup(&Some("/nonexistent-dir/tlssocket.log".to_string()), "INFO");
        assert!(result.is_err());
    }
}
