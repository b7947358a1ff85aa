use std::io;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Installs a stderr fmt subscriber. `level` applies to this workspace's
/// crates; everything else is held at WARN.
pub(crate) fn setup_tracing(level: LevelFilter) {
    let own_level = level_from_filter(level);
    let filter_layer = tracing_subscriber::filter::filter_fn(move |metadata| {
        let Some(own_level) = own_level else {
            return false;
        };
        let effective_level = if metadata.target().starts_with("primgroup") {
            own_level
        } else {
            Level::WARN.min(own_level)
        };
        metadata.level() <= &effective_level
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter_layer))
        .init();
}

pub(crate) fn parse_level_filter(value: &str) -> Result<LevelFilter, String> {
    match value.to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::OFF),
        "error" => Ok(LevelFilter::ERROR),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        other => Err(format!("unknown log level '{other}'")),
    }
}

fn level_from_filter(level: LevelFilter) -> Option<Level> {
    match level {
        LevelFilter::OFF => None,
        LevelFilter::ERROR => Some(Level::ERROR),
        LevelFilter::WARN => Some(Level::WARN),
        LevelFilter::INFO => Some(Level::INFO),
        LevelFilter::DEBUG => Some(Level::DEBUG),
        LevelFilter::TRACE => Some(Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names() {
        assert_eq!(parse_level_filter("DEBUG"), Ok(LevelFilter::DEBUG));
        assert_eq!(parse_level_filter("warning"), Ok(LevelFilter::WARN));
        assert!(parse_level_filter("loud").is_err());
    }

    #[test]
    fn off_disables_everything() {
        assert_eq!(level_from_filter(LevelFilter::OFF), None);
        assert_eq!(level_from_filter(LevelFilter::INFO), Some(Level::INFO));
    }
}
