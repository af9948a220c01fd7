//! Status lines on stderr.

use fob_pack::EngineLog;
use owo_colors::Style;

use super::paint;

pub fn success(message: &str) {
    eprintln!("{} {}", paint("✓", Style::new().green().bold()), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", paint("ℹ", Style::new().blue().bold()), message);
}

pub fn warning(message: &str) {
    eprintln!(
        "{} {}",
        paint("⚠", Style::new().yellow().bold()),
        paint(message, Style::new().yellow())
    );
}

/// Plain line under the current heading.
pub fn detail(message: &str) {
    eprintln!("  {message}");
}

/// One engine log that survived the unit's filter.
pub fn engine_log(log: &EngineLog) {
    warning(&log_text(log));
}

fn log_text(log: &EngineLog) -> String {
    let mut text = match &log.code {
        Some(code) => format!("({code}) {}", log.message),
        None => log.message.clone(),
    };
    if let Some(plugin) = &log.plugin {
        text = format!("[plugin {plugin}] {text}");
    }
    text
}
