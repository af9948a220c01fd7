//! Terminal output: status lines, the per-unit report and the summary.
//!
//! Everything goes to stderr so that `--print-config` output on stdout stays
//! machine-readable.

mod format;
mod messages;

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::{OwoColorize, Style};

pub use format::{format_duration, format_size, summary_line, unit_line};
pub use messages::{detail, engine_log, info, success, warning};

static COLORS: AtomicBool = AtomicBool::new(true);

/// Whether the environment allows color: `NO_COLOR` disables it,
/// `FORCE_COLOR` forces it, otherwise stderr must be a terminal.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// Decide once, early in `main`, whether output is colored.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    COLORS.store(enabled, Ordering::Relaxed);
    console::set_colors_enabled_stderr(enabled);
}

pub(crate) fn paint(text: &str, style: Style) -> String {
    if COLORS.load(Ordering::Relaxed) {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_no_color_overrides_force() {
        unsafe {
            std::env::set_var("NO_COLOR", "1");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(!should_use_color());
        unsafe {
            std::env::remove_var("NO_COLOR");
            std::env::remove_var("FORCE_COLOR");
        }
    }

    #[test]
    #[serial]
    fn test_force_color() {
        unsafe {
            std::env::remove_var("NO_COLOR");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(should_use_color());
        unsafe { std::env::remove_var("FORCE_COLOR") };
    }

    #[test]
    #[serial]
    fn test_paint_without_colors() {
        init_colors(true);
        assert_eq!(paint("ok", Style::new().green().bold()), "ok");
    }
}
