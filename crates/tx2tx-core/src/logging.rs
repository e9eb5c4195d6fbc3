//! Log level flags and resolution shared by both binaries.

use tracing::level_filters::LevelFilter;

/// Log verbosity levels, ordered least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Parses a level name case-insensitively.
    pub fn from_name(name: &str) -> Option<LogLevel> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warning" | "warn" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            "critical" => Some(LogLevel::Critical),
            _ => None,
        }
    }

    /// The tracing filter for this level. `Critical` maps to the error
    /// filter since tracing has no level above error.
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

/// Resolves the effective level from CLI flags and the configured level
/// name. The level flags are mutually exclusive in intent, but when several
/// are supplied the most restrictive wins; with no flags the configured
/// name applies, defaulting to info.
pub fn level_resolve(flags: &[LogLevel], configured: &str) -> LogLevel {
    if let Some(most_restrictive) = flags.iter().copied().max() {
        return most_restrictive;
    }
    LogLevel::from_name(configured).unwrap_or(LogLevel::Info)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_restrictive_flag_wins() {
        let flags = [LogLevel::Debug, LogLevel::Error, LogLevel::Info];
        assert_eq!(level_resolve(&flags, "info"), LogLevel::Error);
    }

    #[test]
    fn test_critical_outranks_error() {
        let flags = [LogLevel::Critical, LogLevel::Error];
        assert_eq!(level_resolve(&flags, "debug"), LogLevel::Critical);
    }

    #[test]
    fn test_config_level_applies_without_flags() {
        assert_eq!(level_resolve(&[], "warning"), LogLevel::Warning);
        assert_eq!(level_resolve(&[], "WARN"), LogLevel::Warning);
    }

    #[test]
    fn test_unknown_config_level_defaults_to_info() {
        assert_eq!(level_resolve(&[], "chatty"), LogLevel::Info);
    }

    #[test]
    fn test_critical_maps_to_error_filter() {
        assert_eq!(LogLevel::Critical.to_filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Debug.to_filter(), LevelFilter::DEBUG);
    }
}
