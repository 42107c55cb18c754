// snakecharm/src/ui/output.rs
//! Human-readable output for the snakecharm CLI.
//!
//! Every function takes the writer, the theme and whether the writer supports
//! color, so callers decide per stream (stdout for the payload, stderr for
//! status messages).

use owo_colors::OwoColorize;
use std::io::{self, Write};

use snakecharm_core::{BypassReport, FailureReport, SearchStats, Verification};

use crate::ui::theme::{ThemeEntry, ThemeMap};

/// Applies the theme color for `entry` when color is enabled.
pub fn paint(text: &str, entry: ThemeEntry, theme: &ThemeMap, supports_color: bool) -> String {
    if !supports_color {
        return text.to_string();
    }
    match theme.get(&entry).and_then(|style| style.fg.as_ref()) {
        Some(color) => text.color(color.to_ansi_color()).to_string(),
        None => text.to_string(),
    }
}

fn print_prefixed<W: Write>(
    writer: &mut W,
    prefix: &str,
    msg: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    writeln!(writer, "{}", paint(&format!("{prefix}{msg}"), entry, theme, supports_color))
}

pub fn print_warn_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_prefixed(writer, "Warning: ", msg, ThemeEntry::Warn, theme, supports_color)
}

pub fn print_error_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_prefixed(writer, "Error: ", msg, ThemeEntry::Error, theme, supports_color)
}

/// The rewritten payload on its own line, followed by its metrics.
pub fn print_report<W: Write>(
    writer: &mut W,
    report: &BypassReport,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    writeln!(writer, "{}", paint(report.text(), ThemeEntry::Payload, theme, supports_color))?;
    let metrics = format!(
        "  length {}, {} distinct characters ({})",
        report.length, report.charset_size, report.mode
    );
    writeln!(writer, "{}", paint(&metrics, ThemeEntry::Metric, theme, supports_color))?;
    if !report.rendering.applied.is_empty() {
        let steps: Vec<String> = report
            .rendering
            .applied
            .iter()
            .map(|step| paint(step, ThemeEntry::StrategyName, theme, supports_color))
            .collect();
        writeln!(writer, "  via {}", steps.join(", "))?;
    }
    if report.verification == Verification::Accepted {
        writeln!(writer, "  {}", paint("accepted by checker", ThemeEntry::Success, theme, supports_color))?;
    }
    for rejection in &report.rejected {
        writeln!(writer, "  {}", paint(&format!("skipped {rejection}"), ThemeEntry::Warn, theme, supports_color))?;
    }
    Ok(())
}

pub fn print_failure<W: Write>(
    writer: &mut W,
    failure: &FailureReport,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    print_error_message(
        writer,
        &format!("no bypass found for {:?}: {}", failure.original, failure.reason),
        theme,
        supports_color,
    )?;
    for rejection in &failure.rejected {
        writeln!(writer, "  {}", paint(&rejection.to_string(), ThemeEntry::Warn, theme, supports_color))?;
    }
    Ok(())
}

pub fn print_stats<W: Write>(writer: &mut W, stats: &SearchStats, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    let line = format!(
        "  {} nodes visited, {} memo hits, {} strategy applications, {} combinations tried",
        stats.nodes_visited, stats.memo_hits, stats.strategy_applications, stats.combinations_tried
    );
    writeln!(writer, "{}", paint(&line, ThemeEntry::Metric, theme, supports_color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::theme::ThemeStyle;
    use snakecharm_core::{Precedence, Rendering, SearchMode};

    fn report() -> BypassReport {
        let rendering = Rendering::new("0xa", Precedence::Atom).with_applied(vec!["int.by_hex".into()]);
        BypassReport::new("10", rendering, SearchMode::FirstSuccess, SearchStats::default())
    }

    #[test]
    fn plain_output_has_no_escapes() {
        let theme = ThemeStyle::default_theme_map();
        let mut out = Vec::new();
        print_report(&mut out, &report(), &theme, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("0xa\n"));
        assert!(text.contains("via int.by_hex"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn colored_output_strips_back_to_plain() {
        let theme = ThemeStyle::default_theme_map();
        let mut plain = Vec::new();
        let mut colored = Vec::new();
        print_report(&mut plain, &report(), &theme, false).unwrap();
        print_report(&mut colored, &report(), &theme, true).unwrap();
        assert_ne!(plain, colored);
        assert_eq!(strip_ansi_escapes::strip(&colored), plain);
    }
}
