//! Module for managing the terminal theme of the snakecharm CLI.
//!
//! Each logical output element (the rewritten payload, strategy names,
//! metrics, status messages) maps to a 16-color ANSI foreground. A theme can
//! be loaded from a YAML file; entries it leaves out fall back to the
//! defaults.

use anyhow::{Context, Result};
use owo_colors::AnsiColors;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Type alias for the theme map, providing a consistent type definition.
pub type ThemeMap = HashMap<ThemeEntry, ThemeStyle>;

/// The different logical parts of the output that can be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeEntry {
    /// Section titles, such as category headings in `strategies`.
    Header,
    /// A bypass was found.
    Success,
    /// Warnings, including aborted searches.
    Warn,
    /// Errors and "no bypass found".
    Error,
    /// The rewritten payload itself.
    Payload,
    /// Strategy references such as `int.by_hex`.
    StrategyName,
    /// Length, charset size and search statistics.
    Metric,
}

impl ThemeEntry {
    pub const ALL: [ThemeEntry; 7] = [
        ThemeEntry::Header,
        ThemeEntry::Success,
        ThemeEntry::Warn,
        ThemeEntry::Error,
        ThemeEntry::Payload,
        ThemeEntry::StrategyName,
        ThemeEntry::Metric,
    ];
}

/// Represents an ANSI color that can be used in the theme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ThemeColor {
    /// A named ANSI color (e.g., "red", "brightgreen").
    Named(String),
}

/// Error type for parsing an invalid `ThemeColor` string.
#[derive(Debug, Clone)]
pub struct ParseThemeColorError;

impl fmt::Display for ParseThemeColorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Invalid theme color; expected one of: black, red, green, yellow, blue, \
            magenta, cyan, white, brightblack, brightred, brightgreen, brightyellow, \
            brightblue, brightmagenta, brightcyan, brightwhite."
        )
    }
}

impl std::error::Error for ParseThemeColorError {}

impl FromStr for ThemeColor {
    type Err = ParseThemeColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "black" | "red" | "green" | "yellow" | "blue" | "magenta" | "cyan" | "white" | "brightblack"
            | "brightred" | "brightgreen" | "brightyellow" | "brightblue" | "brightmagenta" | "brightcyan"
            | "brightwhite" => Ok(ThemeColor::Named(lower)),
            _ => Err(ParseThemeColorError),
        }
    }
}

impl ThemeColor {
    fn named(name: &str) -> Self {
        ThemeColor::Named(name.to_string())
    }

    /// Converts the color into its `owo_colors::AnsiColors` counterpart.
    pub fn to_ansi_color(&self) -> AnsiColors {
        match self {
            ThemeColor::Named(name) => match name.to_lowercase().as_str() {
                "black" => AnsiColors::Black,
                "red" => AnsiColors::Red,
                "green" => AnsiColors::Green,
                "yellow" => AnsiColors::Yellow,
                "blue" => AnsiColors::Blue,
                "magenta" => AnsiColors::Magenta,
                "cyan" => AnsiColors::Cyan,
                "white" => AnsiColors::White,
                "brightblack" => AnsiColors::BrightBlack,
                "brightred" => AnsiColors::BrightRed,
                "brightgreen" => AnsiColors::BrightGreen,
                "brightyellow" => AnsiColors::BrightYellow,
                "brightblue" => AnsiColors::BrightBlue,
                "brightmagenta" => AnsiColors::BrightMagenta,
                "brightcyan" => AnsiColors::BrightCyan,
                "brightwhite" => AnsiColors::BrightWhite,
                _ => AnsiColors::White,
            },
        }
    }
}

/// Represents the style configuration for a specific `ThemeEntry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThemeStyle {
    /// An optional `ThemeColor` to apply as the foreground color.
    pub fg: Option<ThemeColor>,
}

/// `<config_dir>/snakecharm/theme.yaml`, used when no `--theme` is given.
pub fn user_theme_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snakecharm").join("theme.yaml"))
}

/// Loads the theme from `theme_path`, then the user theme file if it exists,
/// and otherwise returns the default theme.
pub fn build_theme_map(theme_path: Option<&Path>) -> Result<ThemeMap> {
    if let Some(path) = theme_path {
        return ThemeStyle::load_from_file(path);
    }
    match user_theme_path().filter(|path| path.is_file()) {
        Some(path) => ThemeStyle::load_from_file(path),
        None => Ok(ThemeStyle::default_theme_map()),
    }
}

impl ThemeStyle {
    /// Loads a theme from a YAML file and fills the gaps with default styles.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ThemeMap> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read theme file {}", path.display()))?;
        let mut custom: ThemeMap =
            serde_yml::from_str(&text).with_context(|| format!("Failed to parse theme file {}", path.display()))?;
        for (entry, style) in Self::default_theme_map() {
            custom.entry(entry).or_insert(style);
        }
        Ok(custom)
    }

    /// Returns a default theme map with predefined color mappings.
    pub fn default_theme_map() -> ThemeMap {
        let color = |name: &str| ThemeStyle {
            fg: Some(ThemeColor::named(name)),
        };
        ThemeEntry::ALL
            .into_iter()
            .map(|entry| {
                let style = match entry {
                    ThemeEntry::Header => color("brightblue"),
                    ThemeEntry::Success => color("green"),
                    ThemeEntry::Warn => color("yellow"),
                    ThemeEntry::Error => color("red"),
                    ThemeEntry::Payload => color("brightwhite"),
                    ThemeEntry::StrategyName => color("cyan"),
                    ThemeEntry::Metric => color("brightblack"),
                };
                (entry, style)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_named_colors() {
        assert!("red".parse::<ThemeColor>().is_ok());
        assert!("BrightGreen".parse::<ThemeColor>().is_ok());
        assert!("unknown".parse::<ThemeColor>().is_err());
    }

    #[test]
    fn to_ansi_color_roundtrip() {
        let tc: ThemeColor = "blue".parse().unwrap();
        assert_eq!(tc.to_ansi_color(), AnsiColors::Blue);
        let tc: ThemeColor = "brightmagenta".parse().unwrap();
        assert_eq!(tc.to_ansi_color(), AnsiColors::BrightMagenta);
    }

    #[test]
    fn default_theme_covers_every_entry() {
        let map = ThemeStyle::default_theme_map();
        assert!(ThemeEntry::ALL.iter().all(|entry| map.contains_key(entry)));
    }

    #[test]
    fn partial_theme_file_is_completed_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "payload:\n  fg: magenta").unwrap();
        let map = ThemeStyle::load_from_file(file.path()).unwrap();
        assert_eq!(map[&ThemeEntry::Payload].fg, Some(ThemeColor::named("magenta")));
        assert_eq!(map[&ThemeEntry::Error].fg, Some(ThemeColor::named("red")));
    }
}
