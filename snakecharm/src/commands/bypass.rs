//! The `bypass` command: build a search configuration from flags, files and
//! profiles, run the search and print the result.

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info, warn};
use serde_json::json;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use snakecharm_core::{
    load_profile_by_name, CancellationToken, CheckerGate, CommandChecker, FilterSpec, RuleSpec, SearchController,
    SearchMemo, SearchMode, SearchOutcome, SearchSpec,
};

use crate::cli::BypassCommand;
use crate::ui::output;
use crate::ui::theme::ThemeMap;

/// Extra time the gate grants on top of the command's own timeout, so the
/// command is killed by its own loop rather than abandoned.
const GATE_GRACE: Duration = Duration::from_millis(500);

/// How a bypass run ended, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassExit {
    Found,
    NotFound,
    Aborted,
}

impl BypassExit {
    pub fn code(self) -> u8 {
        match self {
            BypassExit::Found => 0,
            BypassExit::NotFound | BypassExit::Aborted => 1,
        }
    }
}

/// Splits `-b` values on commas. A value that is exactly `,` bans the comma.
pub fn split_blacklist(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| {
            if value == "," {
                vec![value.clone()]
            } else {
                value.split(',').filter(|item| !item.is_empty()).map(str::to_string).collect()
            }
        })
        .collect()
}

fn read_payload(cmd: &BypassCommand) -> Result<String> {
    let raw = match &cmd.payload {
        Some(payload) => payload.clone(),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read payload from stdin")?;
            buffer
        }
    };
    let payload = raw.trim_end_matches(['\n', '\r']).to_string();
    if payload.trim().is_empty() {
        bail!("No payload given. Pass it as an argument or on stdin.");
    }
    Ok(payload)
}

fn load_rule_spec(path: &Path) -> Result<RuleSpec> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read rules file {}", path.display()))?;
    serde_yml::from_str(&text).with_context(|| format!("Failed to parse rules file {}", path.display()))
}

/// Layers the profile, the files and the flags, in that order.
pub fn build_spec(cmd: &BypassCommand) -> Result<SearchSpec> {
    let mut spec = match &cmd.profile {
        Some(name) => {
            let profile = load_profile_by_name(name).with_context(|| format!("Failed to load profile '{}'", name))?;
            info!("Using profile '{}'", profile.profile_name);
            profile.spec()
        }
        None => SearchSpec::default(),
    };

    if let Some(path) = &cmd.rules_file {
        spec.rules = load_rule_spec(path)?;
    }
    spec.rules.blacklist.extend(split_blacklist(&cmd.blacklist));
    if let Some(whitelist) = &cmd.whitelist {
        spec.rules.whitelist = Some(whitelist.clone());
    }
    spec.rules.patterns.extend(cmd.patterns.iter().cloned());

    if let Some(path) = &cmd.filter_file {
        spec.filter = FilterSpec::load_from_file(path)?;
    }
    if cmd.minlen || cmd.minset {
        spec.mode = SearchMode::from_flags(cmd.minlen, cmd.minset);
    }

    let options = &mut spec.options;
    if let Some(depth) = cmd.depth {
        options.max_depth = depth;
    }
    if let Some(beam) = cmd.beam {
        options.beam_width = beam;
    }
    if let Some(max_combinations) = cmd.max_combinations {
        options.max_combinations = max_combinations;
    }
    options.exhaustive |= cmd.exhaustive;
    options.parallel |= cmd.parallel;
    if cmd.timeout_ms.is_some() {
        options.timeout_ms = cmd.timeout_ms;
    }

    spec.validate()?;
    Ok(spec)
}

fn load_memo(path: Option<&Path>) -> SearchMemo {
    let Some(path) = path.filter(|p| p.exists()) else {
        return SearchMemo::new();
    };
    match SearchMemo::load(path) {
        Ok(memo) => {
            debug!("Loaded {} memo entries from {}", memo.len(), path.display());
            memo
        }
        Err(e) => {
            warn!("Ignoring unreadable memo {}: {}", path.display(), e);
            SearchMemo::new()
        }
    }
}

fn build_gate(cmd: &BypassCommand) -> Result<Option<CheckerGate>> {
    let Some(line) = &cmd.check_cmd else {
        return Ok(None);
    };
    let timeout = Duration::from_millis(cmd.check_timeout_ms);
    let Some(checker) = CommandChecker::from_command_line(line, timeout) else {
        bail!("--check-cmd needs a command to run");
    };
    Ok(Some(CheckerGate::new(Arc::new(checker), timeout + GATE_GRACE)))
}

/// Runs one bypass search. Errors are configuration, input or parse problems.
pub fn run_bypass(cmd: &BypassCommand, theme: &ThemeMap) -> Result<BypassExit> {
    let payload = read_payload(cmd)?;
    let spec = build_spec(cmd)?;
    let controller = SearchController::default();
    let config = spec.build(controller.catalog()).context("Invalid search configuration")?;
    let gate = build_gate(cmd)?;
    let memo = load_memo(cmd.memo.as_deref());
    let token = CancellationToken::new();

    info!("Searching with mode {} under {:?} rules", config.mode(), config.rules().mode());
    let outcome = controller.search_with(&payload, &config, &memo, &token, gate.as_ref())?;

    if let Some(path) = &cmd.memo {
        memo.save(path)
            .with_context(|| format!("Failed to save memo to {}", path.display()))?;
        debug!("Saved {} memo entries to {}", memo.len(), path.display());
    }

    if cmd.json {
        print_json(&outcome)?;
    } else {
        print_human(&outcome, theme)?;
    }
    if cmd.stats {
        let stderr_supports_color = io::stderr().is_terminal();
        output::print_stats(&mut io::stderr(), &outcome.stats(), theme, stderr_supports_color)?;
    }

    Ok(match outcome {
        SearchOutcome::Found(_) => BypassExit::Found,
        SearchOutcome::NoBypassFound(_) => BypassExit::NotFound,
        SearchOutcome::Aborted { .. } => BypassExit::Aborted,
    })
}

fn print_json(outcome: &SearchOutcome) -> Result<()> {
    let value = match outcome {
        SearchOutcome::Found(report) => json!({ "status": "found", "report": report }),
        SearchOutcome::NoBypassFound(failure) => json!({ "status": "no_bypass_found", "failure": failure }),
        SearchOutcome::Aborted { best, stats } => json!({ "status": "aborted", "best": best, "stats": stats }),
    };
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    writeln!(writer, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

fn print_human(outcome: &SearchOutcome, theme: &ThemeMap) -> Result<()> {
    let stdout = io::stdout();
    let stdout_supports_color = stdout.is_terminal();
    let stderr_supports_color = io::stderr().is_terminal();
    match outcome {
        SearchOutcome::Found(report) => {
            output::print_report(&mut stdout.lock(), report, theme, stdout_supports_color)?;
        }
        SearchOutcome::NoBypassFound(failure) => {
            output::print_failure(&mut io::stderr(), failure, theme, stderr_supports_color)?;
        }
        SearchOutcome::Aborted { best, .. } => {
            output::print_warn_message(
                &mut io::stderr(),
                "search aborted before it completed",
                theme,
                stderr_supports_color,
            )?;
            if let Some(report) = best {
                output::print_report(&mut stdout.lock(), report, theme, stdout_supports_color)?;
            }
        }
    }
    Ok(())
}
