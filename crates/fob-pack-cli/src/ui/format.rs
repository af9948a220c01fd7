//! Human-readable sizes, durations and report lines.

use std::time::Duration;

use fob_pack::{BundleStats, UnitReport};
use owo_colors::Style;

use super::paint;

/// Bytes in the largest fitting unit (`B`, `KB`, `MB`, `GB`).
///
/// ```
/// use fob_pack_cli::ui::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

/// `50ms`, `1.50s` or `2m 5s`.
///
/// ```
/// use std::time::Duration;
/// use fob_pack_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// One written unit: output path padded to `width`, then its size and kind.
pub fn unit_line(report: &UnitReport, width: usize) -> String {
    let kind = if report.declaration {
        "dts".to_string()
    } else {
        report.format.to_string()
    };
    format!(
        "{:<width$}  {}  {}",
        report.output,
        paint(&format_size(report.bytes), Style::new().dimmed()),
        paint(&kind, Style::new().dimmed()),
    )
}

/// Final totals line.
pub fn summary_line(stats: &BundleStats) -> String {
    let noun = if stats.unit_count == 1 { "file" } else { "files" };
    format!(
        "Built {} {noun} ({}) in {}",
        stats.unit_count,
        format_size(stats.total_bytes),
        format_duration(stats.elapsed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fob_pack::{Format, Phase};

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(10_240), "10.00 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
        // Stays in GB past 1024 GB.
        assert_eq!(format_size(2 * 1024 * 1_073_741_824), "2048.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "60.00s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_unit_line_pads_output() {
        let report = UnitReport {
            phase: Phase::Exports,
            label: ".".into(),
            output: "./dist/a.mjs".into(),
            format: Format::Esm,
            declaration: false,
            bytes: 2048,
            logs: Vec::new(),
        };
        let line = unit_line(&report, 20);
        assert!(line.starts_with("./dist/a.mjs        "), "{line:?}");
        assert!(line.contains("2.00 KB"));
        assert!(line.contains("esm"));

        let dts = UnitReport {
            declaration: true,
            ..report
        };
        assert!(unit_line(&dts, 0).contains("dts"));
    }

    #[test]
    fn test_summary_line() {
        let stats = BundleStats {
            total_bytes: 1536,
            unit_count: 1,
            elapsed: Duration::from_millis(12),
        };
        assert_eq!(summary_line(&stats), "Built 1 file (1.50 KB) in 12ms");
    }
}
