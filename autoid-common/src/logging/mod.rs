// Logging utilities for the Auto-ID engine
//
// This module provides:
// - Component-based structured logging
// - Identity label tracking through logger inheritance
// - Per-component level configuration on top of the `log` facade

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Arguments, Display, Formatter};

/// Predefined components for logging categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Keys,
    Certificates,
    Registry,
    Custom(&'static str),
}

impl Component {
    /// Get the string representation of the component
    pub fn as_str(&self) -> &str {
        match self {
            Component::Keys => "Keys",
            Component::Certificates => "Certificates",
            Component::Registry => "Registry",
            Component::Custom(name) => name,
        }
    }
}

// Avoids building a prefix String for the *_args variants
struct ComponentPrefixDisplay {
    parent: Option<Component>,
    component: Component,
}

impl Display for ComponentPrefixDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) if parent != self.component => {
                write!(f, "{}.{}", parent.as_str(), self.component.as_str())
            }
            _ => write!(f, "{}", self.component.as_str()),
        }
    }
}

/// Log levels understood by [`LoggingConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Logging configuration: a default level plus per-component overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub default_level: LogLevel,
    #[serde(default)]
    pub component_levels: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::default_info()
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default_info()
    }

    /// Info everywhere, no overrides
    pub fn default_info() -> Self {
        Self {
            default_level: LogLevel::Info,
            component_levels: HashMap::new(),
        }
    }

    pub fn with_default_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_component_level(mut self, component: Component, level: LogLevel) -> Self {
        self.component_levels
            .insert(component.as_str().to_string(), level);
        self
    }

    /// Effective level for a component
    pub fn level_for(&self, component: Component) -> LogLevel {
        self.component_levels
            .get(component.as_str())
            .copied()
            .unwrap_or(self.default_level)
    }

    /// Raise the global `log` max level so the most verbose configured level passes.
    /// Per-component filtering happens in [`Logger`].
    pub fn apply(&self) {
        let max = self
            .component_levels
            .values()
            .copied()
            .chain(std::iter::once(self.default_level))
            .max()
            .unwrap_or(LogLevel::Info);
        log::set_max_level(max.to_level_filter());
    }
}

/// A helper for creating component-specific loggers with identity tracking
#[derive(Clone, Debug)]
pub struct Logger {
    /// Component this logger is for
    component: Component,
    /// Label of the identity (or tool) this logger reports for
    label: String,
    /// Parent component for hierarchical logging (if any)
    parent_component: Option<Component>,
    /// Effective level for this component
    level: LogLevel,
}

impl Logger {
    /// Create a new root logger for a component
    pub fn new_root(component: Component, label: &str) -> Self {
        Self {
            component,
            label: label.to_string(),
            parent_component: None,
            level: LogLevel::Trace,
        }
    }

    /// Create a root logger whose level is taken from `config`
    pub fn with_config(component: Component, label: &str, config: &LoggingConfig) -> Self {
        Self {
            component,
            label: label.to_string(),
            parent_component: None,
            level: config.level_for(component),
        }
    }

    /// Create a child logger with the same label but a different component
    pub fn with_component(&self, component: Component) -> Self {
        Self {
            component,
            label: self.label.clone(),
            parent_component: Some(self.component),
            level: self.level,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn component(&self) -> Component {
        self.component
    }

    fn prefix(&self) -> ComponentPrefixDisplay {
        ComponentPrefixDisplay {
            parent: self.parent_component,
            component: self.component,
        }
    }

    fn enabled(&self, level: LogLevel, log_level: log::Level) -> bool {
        level <= self.level && log::log_enabled!(log_level)
    }

    /// Log a debug message
    pub fn debug(&self, message: impl Into<String>) {
        if self.enabled(LogLevel::Debug, log::Level::Debug) {
            debug!("[{}][{}] {}", self.label, self.prefix(), message.into());
        }
    }

    /// Log a debug message using fmt::Arguments (avoids allocating message String)
    pub fn debug_args(&self, args: Arguments) {
        if self.enabled(LogLevel::Debug, log::Level::Debug) {
            debug!("[{}][{}] {}", self.label, self.prefix(), args);
        }
    }

    /// Log an info message
    pub fn info(&self, message: impl Into<String>) {
        if self.enabled(LogLevel::Info, log::Level::Info) {
            info!("[{}][{}] {}", self.label, self.prefix(), message.into());
        }
    }

    /// Log a warning message
    pub fn warn(&self, message: impl Into<String>) {
        if self.enabled(LogLevel::Warn, log::Level::Warn) {
            warn!("[{}][{}] {}", self.label, self.prefix(), message.into());
        }
    }

    /// Log an error message
    pub fn error(&self, message: impl Into<String>) {
        if self.enabled(LogLevel::Error, log::Level::Error) {
            error!("[{}][{}] {}", self.label, self.prefix(), message.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_logger_keeps_label_and_records_parent() {
        let root = Logger::new_root(Component::Certificates, "issuer");
        let child = root.with_component(Component::Keys);
        assert_eq!(child.label(), "issuer");
        assert_eq!(child.component(), Component::Keys);
        assert_eq!(child.prefix().to_string(), "Certificates.Keys");
        assert_eq!(root.prefix().to_string(), "Certificates");
    }

    #[test]
    fn component_override_wins_over_default() {
        let config = LoggingConfig::new()
            .with_default_level(LogLevel::Warn)
            .with_component_level(Component::Registry, LogLevel::Debug);
        assert_eq!(config.level_for(Component::Registry), LogLevel::Debug);
        assert_eq!(config.level_for(Component::Keys), LogLevel::Warn);

        let logger = Logger::with_config(Component::Keys, "cli", &config);
        assert!(!logger.enabled(LogLevel::Info, log::Level::Error));
    }

    #[test]
    fn applied_config_gates_component_output() {
        let _ = env_logger::Builder::new()
            .is_test(true)
            .filter_level(log::LevelFilter::Trace)
            .try_init();
        let config = LoggingConfig::new()
            .with_default_level(LogLevel::Error)
            .with_component_level(Component::Certificates, LogLevel::Debug);
        config.apply();
        assert_eq!(log::max_level(), log::LevelFilter::Debug);

        let certificates = Logger::with_config(Component::Certificates, "root", &config);
        let registry = Logger::with_config(Component::Registry, "root", &config);
        assert!(certificates.enabled(LogLevel::Debug, log::Level::Debug));
        assert!(!registry.enabled(LogLevel::Info, log::Level::Info));
        assert!(registry.enabled(LogLevel::Error, log::Level::Error));

        certificates.debug("issued certificate");
        certificates.debug_args(format_args!("serial {:02x}", 7));
        registry.warn("suppressed");
        registry.error("registry unreachable");
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = LoggingConfig::new().with_component_level(Component::Custom("cli"), LogLevel::Trace);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"trace\""));
        let back: LoggingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
