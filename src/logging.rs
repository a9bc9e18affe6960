use env_logger::{Builder, Env, Target};
use log::{LevelFilter, Record};
use std::io::{self, Write};

/// Records on this target are written as their bare message and are never
/// filtered below `info`, whatever `RUST_LOG` says.
pub const CONFIRMATION_TARGET: &str = "confirmation";

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

pub fn init() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    configure(&mut builder).init();
}

fn configure(builder: &mut Builder) -> &mut Builder {
    builder
        .target(Target::Stdout)
        .filter_module(CONFIRMATION_TARGET, LevelFilter::Info)
        .format(|buf, record| write_record(buf, record))
}

fn write_record<W: Write>(buf: &mut W, record: &Record) -> io::Result<()> {
    if record.target() == CONFIRMATION_TARGET {
        writeln!(buf, "{}", record.args())
    } else {
        writeln!(
            buf,
            "[{} {}] {}",
            record.level(),
            record.target(),
            record.args()
        )
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata};

    fn written(target: &str, level: Level, message: &str) -> String {
        let mut buf = Vec::new();
        write_record(
            &mut buf,
            &Record::builder()
                .args(format_args!("{}", message))
                .target(target)
                .level(level)
                .build(),
        )
        .unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn enabled(filters: &str, target: &str, level: Level) -> bool {
        let mut builder = Builder::new();
        builder.parse_filters(filters);
        let logger = configure(&mut builder).build();

        logger.enabled(&Metadata::builder().target(target).level(level).build())
    }

    #[test]
    fn test_confirmation_line_is_bare() {
        assert_eq!(
            written(
                CONFIRMATION_TARGET,
                Level::Info,
                "stopped your instances: ['i-1111111111111111a', 'i-2222222222222222b']"
            ),
            "stopped your instances: ['i-1111111111111111a', 'i-2222222222222222b']\n"
        );
    }

    #[test]
    fn test_other_records_keep_level_and_target() {
        assert_eq!(
            written("bootstrap::runtime", Level::Error, "invocation req-1 failed"),
            "[ERROR bootstrap::runtime] invocation req-1 failed\n"
        );
    }

    #[test]
    fn test_confirmation_survives_quiet_filters() {
        assert!(enabled("warn", CONFIRMATION_TARGET, Level::Info));
        assert!(enabled("off", CONFIRMATION_TARGET, Level::Info));
        assert!(!enabled("warn", "bootstrap::stopper", Level::Info));
        assert!(!enabled("info", CONFIRMATION_TARGET, Level::Debug));
    }
}
