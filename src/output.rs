//! # Output Configuration
//!
//! Controls how the CLI prints progress and summaries: whether colour and
//! emoji markers are used, and whether non-error output is printed at all.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//! - `--quiet` - Suppresses everything except errors

use std::env;

use console::style;

/// Output configuration for controlling colors, emojis and verbosity.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
    /// Print nothing but errors.
    pub quiet: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self {
            use_color,
            quiet: false,
        }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Print a step line (`==> message`), unless quiet.
    pub fn step(&self, message: &str) {
        if self.quiet {
            return;
        }
        let marker = emoji(self, "🔀", "==>");
        if self.use_color {
            println!("{} {}", marker, style(message).bold());
        } else {
            println!("{} {}", marker, message);
        }
    }

    /// Print an indented detail line, unless quiet.
    pub fn detail(&self, message: &str) {
        if !self.quiet {
            println!("   {}", message);
        }
    }

    /// Print the success line, unless quiet.
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let marker = emoji(self, "✅", "[OK]");
        if self.use_color {
            println!("{} {}", marker, style(message).green());
        } else {
            println!("{} {}", marker, message);
        }
    }

    /// Print a failure line to stderr. Never suppressed.
    pub fn failure(&self, message: &str) {
        let marker = emoji(self, "❌", "[FAILED]");
        if self.use_color {
            eprintln!("{} {}", marker, style(message).red());
        } else {
            eprintln!("{} {}", marker, message);
        }
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self {
            use_color: true,
            quiet: false,
        }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self {
            use_color: false,
            quiet: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}
