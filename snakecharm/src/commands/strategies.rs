//! The `strategies` command: list the builtin catalog.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use serde::Serialize;
use std::io::{self, Write};

use snakecharm_core::{Category, StrategyCatalog};

use crate::cli::StrategiesCommand;
use crate::ui::output::paint;
use crate::ui::theme::{ThemeEntry, ThemeMap};

#[derive(Debug, Serialize)]
struct StrategyListing<'a> {
    category: Category,
    name: &'a str,
    reference: String,
    description: &'a str,
}

fn listings<'a>(catalog: &'a StrategyCatalog, categories: &[Category]) -> Vec<StrategyListing<'a>> {
    categories
        .iter()
        .flat_map(|&category| {
            catalog.for_category(category).iter().map(move |strategy| StrategyListing {
                category,
                name: strategy.name(),
                reference: format!("{}.{}", category, strategy.name()),
                description: strategy.description(),
            })
        })
        .collect()
}

pub fn run_strategies(cmd: &StrategiesCommand, theme: &ThemeMap) -> Result<()> {
    let catalog = StrategyCatalog::builtin();
    let categories = match &cmd.category {
        Some(raw) => vec![raw
            .parse::<Category>()
            .with_context(|| format!("Unknown category '{}'", raw))?],
        None => Category::ALL.to_vec(),
    };
    let entries = listings(&catalog, &categories);

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    if cmd.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }

    let supports_color = stdout.is_terminal();
    write_listing(&mut writer, &entries, theme, supports_color)?;
    Ok(())
}

fn write_listing<W: Write>(
    writer: &mut W,
    entries: &[StrategyListing<'_>],
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    let mut current = None;
    for entry in entries {
        if current != Some(entry.category) {
            if current.is_some() {
                writeln!(writer)?;
            }
            writeln!(writer, "{}", paint(&format!("[{}]", entry.category), ThemeEntry::Header, theme, supports_color))?;
            current = Some(entry.category);
        }
        writeln!(
            writer,
            "  {:<20} {}",
            paint(entry.name, ThemeEntry::StrategyName, theme, supports_color),
            entry.description
        )?;
    }
    Ok(())
}
