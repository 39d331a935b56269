//! Conditional colored output for stderr logging.
//!
//! Colors are disabled by the `--no-color` flag, the `NO_COLOR` standard
//! (https://no-color.org/), the `SHELFSCAN_NO_COLOR` override, `TERM=dumb`,
//! or when stderr is not a TTY.

use colored::ColoredString;
use std::io::{stderr, IsTerminal};
use std::sync::OnceLock;

static COLOR_CONFIG: OnceLock<ColorConfig> = OnceLock::new();

fn should_disable_colors_from_env() -> bool {
    !std::env::var("NO_COLOR").unwrap_or_default().is_empty()
        || !std::env::var("SHELFSCAN_NO_COLOR")
            .unwrap_or_default()
            .is_empty()
        || std::env::var("TERM").unwrap_or_default() == "dumb"
        || !stderr().is_terminal()
}

#[derive(Debug, Clone)]
struct ColorConfig {
    colors_enabled: bool,
}

impl ColorConfig {
    fn new(no_color_flag: bool) -> Self {
        Self {
            colors_enabled: !no_color_flag && !should_disable_colors_from_env(),
        }
    }
}

/// Called once at startup, after CLI parsing.
pub fn init_color_config(no_color_flag: bool) {
    let config = ColorConfig::new(no_color_flag);
    COLOR_CONFIG.set(config).unwrap_or_else(|_| {
        eprintln!("Warning: Color configuration already initialized");
    });
}

fn colors_enabled() -> bool {
    COLOR_CONFIG
        .get()
        .map(|config| config.colors_enabled)
        .unwrap_or_else(|| !should_disable_colors_from_env())
}

pub fn maybe_color_stderr<F>(text: &str, color_fn: F) -> String
where
    F: FnOnce(&str) -> ColoredString,
{
    if colors_enabled() {
        color_fn(text).to_string()
    } else {
        text.to_string()
    }
}

/// Semantic color functions for log level tags.
pub mod colors {
    use super::maybe_color_stderr;
    use colored::Colorize;

    pub fn error_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.red().bold())
    }

    pub fn warning_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.yellow())
    }

    pub fn info_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.green())
    }

    pub fn debug_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.blue())
    }

    pub fn trace_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.magenta())
    }
}

/// Semantic symbols for operation states, blanked when colors are off.
pub mod symbols {
    use super::colors_enabled;

    pub fn identify_start() -> &'static str {
        if colors_enabled() {
            "🔍"
        } else {
            ""
        }
    }

    pub fn resources_found() -> &'static str {
        if colors_enabled() {
            "🎯"
        } else {
            ""
        }
    }

    pub fn completed_successfully() -> &'static str {
        if colors_enabled() {
            "✅"
        } else {
            "[SUCCESS]"
        }
    }

    pub fn operation_failed() -> &'static str {
        if colors_enabled() {
            "❌"
        } else {
            "[FAILED]"
        }
    }

    pub fn warning() -> &'static str {
        if colors_enabled() {
            "⚠️  "
        } else {
            ""
        }
    }

    pub fn save_file() -> &'static str {
        if colors_enabled() {
            "💾"
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_no_color_flag_disables_colors() {
        let config = ColorConfig::new(true);
        assert!(!config.colors_enabled);
    }

    #[test]
    #[serial]
    fn test_no_color_env_disables_colors() {
        std::env::set_var("NO_COLOR", "1");
        let config = ColorConfig::new(false);
        assert!(!config.colors_enabled);
        std::env::remove_var("NO_COLOR");
    }

    #[test]
    #[serial]
    fn test_term_dumb_disables_colors() {
        std::env::set_var("TERM", "dumb");
        let config = ColorConfig::new(false);
        assert!(!config.colors_enabled);
        std::env::remove_var("TERM");
    }

    #[test]
    #[serial]
    fn test_app_specific_env_disables_colors() {
        std::env::set_var("SHELFSCAN_NO_COLOR", "1");
        let config = ColorConfig::new(false);
        assert!(!config.colors_enabled);
        std::env::remove_var("SHELFSCAN_NO_COLOR");
    }
}
