// snakecharm-core/tests/search_scenarios.rs
use anyhow::Result;
use tempfile::tempdir;
use test_log::test;

use snakecharm_core::eval::{equivalent, eval_int, eval_str};
use snakecharm_core::{
    Category, CancellationToken, ConfigError, RuleSet, RuleSpec, SearchConfig, SearchController, SearchMemo,
    SearchMode, SearchOptions, SearchOutcome, StrategyFilterMap,
};

fn banned(items: &[&str]) -> SearchConfig {
    SearchConfig::new(RuleSet::blacklist(items).unwrap())
}

fn found(snippet: &str, config: &SearchConfig) -> String {
    match SearchController::default().search(snippet, config).unwrap() {
        SearchOutcome::Found(report) => report.text().to_string(),
        other => panic!("no bypass for {snippet}: {other:?}"),
    }
}

#[test]
fn integer_without_banned_digit() {
    let config = banned(&["1"]);
    let out = found("10", &config);
    assert!(!out.contains('1'), "{out}");
    assert_eq!(eval_int(&out), Some(10));
}

#[test]
fn string_without_any_quote_under_minlen() {
    let config = banned(&["'", "\""]).with_mode(SearchMode::MinLen);
    let out = found("'abc'", &config);
    assert!(!out.contains('\'') && !out.contains('"'), "{out}");
    assert_eq!(eval_str(&out).as_deref(), Some("abc"));
}

#[test]
fn builtins_only_cannot_hide_dunder() {
    let config = banned(&["__"]).with_filter(
        StrategyFilterMap::new()
            .white(Category::Name, ["by_builtins"])
            .unwrap(),
    );
    let outcome = SearchController::default().search("__import__('os')", &config).unwrap();
    assert!(matches!(outcome, SearchOutcome::NoBypassFound(_)), "{outcome:?}");
}

#[test]
fn mixed_rule_modes_fail_before_searching() {
    let spec = RuleSpec {
        blacklist: vec!["1".into()],
        patterns: vec!["[0-9]".into()],
        ..RuleSpec::default()
    };
    assert!(matches!(spec.build(), Err(ConfigError::ConflictingRuleModes(_))));
}

#[test]
fn unbalanced_parenthesis_is_a_parse_error() {
    let result = SearchController::default().search("print((1)", &banned(&["1"]));
    assert!(matches!(result, Err(snakecharm_core::BypassError::Parse(_))));
}

#[test]
fn minset_removes_digits_from_identifier_string() {
    let config = banned(&["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]).with_mode(SearchMode::MinSet);
    let outcome = SearchController::default().search("'macr0phag3'", &config).unwrap();
    let report = outcome.report().expect("a bypass");
    assert!(!report.text().chars().any(|c| c.is_ascii_digit()), "{}", report.text());
    assert_eq!(eval_str(report.text()).as_deref(), Some("macr0phag3"));
    assert_eq!(report.charset_size, report.rendering.charset.len());
}

#[test]
fn every_answer_is_valid_and_equivalent() {
    let cases: &[(&str, &[&str], SearchMode)] = &[
        ("__import__('os').system('ls')", &["__"], SearchMode::FirstSuccess),
        ("os.system('id')", &["."], SearchMode::FirstSuccess),
        ("dict(abc=1)", &["a"], SearchMode::FirstSuccess),
        ("10", &["1", "0"], SearchMode::MinLen),
        ("'yes' if 1 and (2 or 3) or 2 and 3 else 'no'", &["or", "and"], SearchMode::FirstSuccess),
        ("chr(97)", &["9", "7"], SearchMode::MinSetLen),
    ];
    for (snippet, items, mode) in cases {
        let config = banned(items).with_mode(*mode);
        let out = found(snippet, &config);
        assert!(config.rules().allows(&out), "{snippet} -> {out}");
        assert!(equivalent(snippet, &out), "{snippet} -> {out}");
    }
}

#[test]
fn nested_bool_ops_rewrite_to_bitwise_operators() {
    let config = banned(&["or", "and"])
        .with_filter(StrategyFilterMap::new().white(Category::BoolOp, ["by_bitwise"]).unwrap());
    let out = found("'yes' if 1 and (2 or 3) or 2 and 3 else 'no'", &config);
    assert_eq!(out, "'yes' if 1&(2|3)|2&3 else 'no'");
    assert!(equivalent("'yes' if 1 and (2 or 3) or 2 and 3 else 'no'", &out));
}

#[test]
fn integers_beyond_64_bits_are_carried_through() {
    let out = found("__import__(18446744073709551616)", &banned(&["__"]));
    assert!(out.ends_with("(18446744073709551616)"), "{out}");
    assert!(!out.contains("__"), "{out}");
}

#[test]
fn white_listed_strategies_are_the_only_ones_used() {
    let config = banned(&["'"])
        .with_mode(SearchMode::MinLen)
        .with_filter(StrategyFilterMap::new().white(Category::String, ["by_char"]).unwrap());
    let outcome = SearchController::default().search("'os'", &config).unwrap();
    let report = outcome.report().expect("a bypass");
    for step in report.rendering.applied.iter().filter(|s| s.starts_with("string.")) {
        assert_eq!(step, "string.by_char");
    }
    assert!(report.rendering.used_category("string"));
}

#[test]
fn repeated_searches_agree() {
    let config = banned(&["'", "."]).with_mode(SearchMode::MinSetLen);
    let first = found("os.system('id')", &config);
    let second = found("os.system('id')", &config);
    assert_eq!(first, second);
}

#[test]
fn memo_never_changes_the_answer() -> Result<()> {
    let controller = SearchController::default();
    let config = banned(&["1", "'"]).with_mode(SearchMode::MinLen);
    let snippet = "chr(1)+'x'";

    let fresh = controller.search(snippet, &config)?;

    let memo = SearchMemo::new();
    let token = CancellationToken::new();
    let warm_up = controller.search_with(snippet, &config, &memo, &token, None)?;
    assert!(!memo.is_empty());
    let warm = controller.search_with(snippet, &config, &memo, &token, None)?;
    assert_eq!(fresh.report().map(|r| r.text()), warm.report().map(|r| r.text()));
    assert_eq!(warm_up.report().map(|r| r.text()), warm.report().map(|r| r.text()));

    let dir = tempdir()?;
    let path = dir.path().join("memo.bin");
    memo.save(&path)?;
    let restored = SearchMemo::load(&path)?;
    let replay = controller.search_with(snippet, &config, &restored, &token, None)?;
    assert_eq!(fresh.report().map(|r| r.text()), replay.report().map(|r| r.text()));
    assert!(restored.hits() > 0);
    Ok(())
}

#[test]
fn memo_is_scoped_by_configuration() {
    let controller = SearchController::default();
    let memo = SearchMemo::new();
    let token = CancellationToken::new();

    let loose = banned(&["1"]);
    let strict = banned(&["1", "x"]);
    controller.search_with("10", &loose, &memo, &token, None).unwrap();
    let outcome = controller.search_with("10", &strict, &memo, &token, None).unwrap();
    let text = outcome.report().expect("a bypass").text().to_string();
    assert!(!text.contains('x'), "{text}");
}

#[test]
fn deadline_aborts_without_invalid_output() {
    let config = banned(&["1"])
        .with_mode(SearchMode::MinLen)
        .with_options(SearchOptions {
            timeout_ms: Some(0),
            ..SearchOptions::default()
        })
        .unwrap();
    let outcome = SearchController::default().search("10+11", &config).unwrap();
    let SearchOutcome::Aborted { best, .. } = outcome else {
        panic!("expected an aborted search, got {outcome:?}");
    };
    if let Some(report) = best {
        assert!(config.rules().allows(report.text()));
    }
}
