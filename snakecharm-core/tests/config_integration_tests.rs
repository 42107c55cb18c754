// snakecharm-core/tests/config_integration_tests.rs
use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;
use test_log::test;

use snakecharm_core::config::{FilterSpec, SearchSpec};
use snakecharm_core::{Category, RuleMode, SearchMode, StrategyCatalog, StrategyFilterMap};

fn write_temp(content: &str, suffix: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(content.as_bytes())?;
    Ok(file)
}

#[test]
fn test_load_search_spec_from_yaml() -> Result<()> {
    let yaml_content = r#"
rules:
  blacklist: ["1", "__"]
  groups:
    keywords: ["import", "or"]
filter:
  white:
    Bypass_Name: [by_unicode]
  black:
    int: [by_cal]
mode: minlen
options:
  max_depth: 3
  beam_width: 8
"#;
    let file = write_temp(yaml_content, ".yaml")?;
    let spec = SearchSpec::load_from_file(file.path())?;
    assert_eq!(spec.mode, SearchMode::MinLen);
    assert_eq!(spec.options.max_depth, 3);
    assert_eq!(spec.options.max_combinations, 4096);

    let config = spec.build(&StrategyCatalog::builtin())?;
    assert_eq!(config.rules().mode(), RuleMode::Blacklist);
    assert!(!config.rules().allows("import os"));
    assert!(config.rules().allows("imp0rt"));
    assert!(!config.filter().allows(Category::Name, "by_builtins"));
    assert!(!config.filter().allows(Category::Int, "by_cal"));
    assert!(config.filter().allows(Category::Int, "by_hex"));
    Ok(())
}

#[test]
fn test_load_search_spec_from_json() -> Result<()> {
    let json_content = r#"{"rules": {"whitelist": "abc()+"}, "mode": "minset"}"#;
    let file = write_temp(json_content, ".json")?;
    let spec = SearchSpec::load_from_file(file.path())?;
    let config = spec.build(&StrategyCatalog::builtin())?;
    assert_eq!(config.mode(), SearchMode::MinSet);
    assert!(config.rules().allows("(a+b)"));
    assert!(!config.rules().allows("a-b"));
    Ok(())
}

#[test]
fn test_invalid_spec_reports_every_problem() -> Result<()> {
    let yaml_content = r#"
rules:
  blacklist: ["1"]
  patterns: ["[0-9]"]
filter:
  white:
    Bypass_Float: []
options:
  beam_width: 0
"#;
    let file = write_temp(yaml_content, ".yaml")?;
    let err = SearchSpec::load_from_file(file.path()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Search specification is invalid"), "{message}");
    assert!(message.contains("blacklist + patterns"), "{message}");
    assert!(message.contains("Bypass_Float"), "{message}");
    assert!(message.contains("beam_width"), "{message}");
    Ok(())
}

#[test]
fn test_unknown_fields_are_rejected() -> Result<()> {
    let file = write_temp("rules:\n  blacklst: [\"1\"]\n", ".yaml")?;
    assert!(SearchSpec::load_from_file(file.path()).is_err());
    Ok(())
}

#[test]
fn test_load_filter_file() -> Result<()> {
    let yaml_content = r#"
white:
  Bypass_String: [by_char, by_dict]
"#;
    let file = write_temp(yaml_content, ".yaml")?;
    let spec = FilterSpec::load_from_file(file.path())?;
    let map = StrategyFilterMap::from_spec(&spec)?;
    assert!(map.allows(Category::String, "by_dict"));
    assert!(!map.allows(Category::String, "by_reverse"));
    assert!(map.allows(Category::Attribute, "by_getattr"));
    Ok(())
}

#[test]
fn test_missing_file_has_context() {
    let err = SearchSpec::load_from_file("/nonexistent/snakecharm.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/snakecharm.yaml"));
}

#[test]
fn test_fingerprint_tracks_search_affecting_fields() -> Result<()> {
    let catalog = StrategyCatalog::builtin();
    let base: SearchSpec = serde_yml::from_str("rules:\n  blacklist: [\"1\"]\n")?;
    let mut parallel = base.clone();
    parallel.options.parallel = true;
    let mut minlen = base.clone();
    minlen.mode = SearchMode::MinLen;

    let fp = base.build(&catalog)?.fingerprint(&catalog);
    assert_eq!(fp, parallel.build(&catalog)?.fingerprint(&catalog));
    assert_ne!(fp, minlen.build(&catalog)?.fingerprint(&catalog));
    Ok(())
}
