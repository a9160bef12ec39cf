//! Category-scoped logging on top of `tracing`
//!
//! The subscriber is installed once by the binary; library code only holds a
//! [`DebugLog`] handle carrying the configured verbosity.

use crate::config::Config;
use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Verbosity {
    /// Report every category at debug level, or none
    Flag(bool),
    /// Report only categories starting with one of these prefixes, at info level
    Categories(Vec<String>),
}

impl Verbosity {
    fn enabled(&self) -> bool {
        matches!(self, Verbosity::Flag(true))
    }

    fn matches(&self, category: &str) -> bool {
        match self {
            Verbosity::Categories(prefixes) => {
                prefixes.iter().any(|prefix| category.starts_with(prefix.as_str()))
            }
            Verbosity::Flag(_) => false,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Flag(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    verbosity: Verbosity,
}

impl DebugLog {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.verbose.clone())
    }

    /// Level a message in `category` is reported at, if at all.
    ///
    /// `verbose` is the per-call override: `Some(false)` silences the call,
    /// `Some(true)` forces debug output regardless of configuration.
    pub fn level(&self, category: &str, verbose: Option<bool>) -> Option<Level> {
        if verbose == Some(false) {
            return None;
        }
        if self.verbosity.matches(category) {
            return Some(Level::INFO);
        }
        if verbose == Some(true) || self.verbosity.enabled() {
            return Some(Level::DEBUG);
        }
        None
    }

    pub fn log(&self, category: &str, message: &str, verbose: Option<bool>) {
        match self.level(category, verbose) {
            Some(level) if level == Level::INFO => tracing::info!(category, "{}", message),
            Some(_) => tracing::debug!(category, "{}", message),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_override_silences() {
        let log = DebugLog::new(Verbosity::Flag(true));
        assert_eq!(log.level("convert", Some(false)), None);
    }

    #[test]
    fn test_config_flag() {
        assert_eq!(
            DebugLog::new(Verbosity::Flag(true)).level("convert", None),
            Some(Level::DEBUG)
        );
        assert_eq!(DebugLog::new(Verbosity::Flag(false)).level("convert", None), None);
        assert_eq!(
            DebugLog::new(Verbosity::Flag(false)).level("convert", Some(true)),
            Some(Level::DEBUG)
        );
    }

    #[test]
    fn test_category_prefixes() {
        let log = DebugLog::new(Verbosity::Categories(vec!["probe".to_string()]));
        assert_eq!(log.level("probe:json", None), Some(Level::INFO));
        assert_eq!(log.level("convert", None), None);
        assert_eq!(log.level("convert", Some(true)), Some(Level::DEBUG));
        assert_eq!(log.level("probe", Some(false)), None);
    }
}
