//! String literal strategies.

use super::{Category, FnStrategy, Rewrite, StrategyContext};
use crate::syntax::literal::{is_ascii_identifier, py_repr, quote_with};
use crate::syntax::Subject;

pub fn strategies() -> Vec<FnStrategy> {
    let table: [(&'static str, &'static str, super::ApplyFn); 13] = [
        ("by_empty_str", "str() for the empty string", by_empty_str),
        ("by_quote_trans", "the literal with either quote style", by_quote_trans),
        ("by_dict", "a dict keyword name read back as a key", by_dict),
        ("by_reverse", "the reversed literal sliced with [::-1]", by_reverse),
        ("by_char_add", "one literal per character, concatenated", by_char_add),
        ("by_char", "chr() per character, concatenated", by_char),
        ("by_char_format", "printf-style %c over character codes", by_char_format),
        ("by_format", "str.format over chr() calls", by_format),
        ("by_hex_encode", "\\x escapes", by_hex_encode),
        ("by_unicode_encode", "\\u escapes", by_unicode_encode),
        ("by_bytes_single", "characters indexed out of bytes reprs", by_bytes_single),
        ("by_bytes_full", "bytes([...]).decode()", by_bytes_full),
        ("by_join_map_str", "''.join(map(chr, [...]))", by_join_map_str),
    ];
    table
        .into_iter()
        .map(|(name, description, apply)| FnStrategy {
            name,
            category: Category::String,
            description,
            apply,
        })
        .collect()
}

fn value<'a>(subject: &Subject<'a>) -> Option<&'a str> {
    match subject {
        Subject::Str(s) => Some(*s),
        _ => None,
    }
}

/// The subject when it is a non-empty string.
fn non_empty<'a>(subject: &Subject<'a>) -> Option<&'a str> {
    value(subject).filter(|s| !s.is_empty())
}

fn one(text: String) -> Vec<Rewrite> {
    vec![Rewrite::Expr(text)]
}

fn codes(s: &str) -> Vec<String> {
    s.chars().map(|c| (c as u32).to_string()).collect()
}

fn by_empty_str(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    match value(subject) {
        Some("") => one("str()".to_string()),
        _ => Vec::new(),
    }
}

fn by_quote_trans(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = value(subject) else { return Vec::new() };
    vec![
        Rewrite::Expr(quote_with(s, '"')),
        Rewrite::Expr(quote_with(s, '\'')),
    ]
}

fn by_dict(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = non_empty(subject) else { return Vec::new() };
    let (key, suffix) = if is_ascii_identifier(s) {
        (s.to_string(), "")
    } else {
        let padded = format!("a{s}");
        if !is_ascii_identifier(&padded) {
            return Vec::new();
        }
        (padded, "[1:]")
    };
    [
        format!("list(dict({key}=()))[0]{suffix}"),
        format!("max(dict({key}=())){suffix}"),
        format!("next(iter(dict({key}=()))){suffix}"),
    ]
    .into_iter()
    .map(Rewrite::Expr)
    .collect()
}

fn by_reverse(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = value(subject) else { return Vec::new() };
    let reversed: String = s.chars().rev().collect();
    if s.chars().count() < 2 || reversed == s {
        return Vec::new();
    }
    one(format!("{}[::-1]", py_repr(&reversed)))
}

fn by_char_add(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = value(subject) else { return Vec::new() };
    if s.chars().count() < 2 {
        return Vec::new();
    }
    let parts: Vec<String> = s.chars().map(|c| py_repr(&c.to_string())).collect();
    vec![
        Rewrite::Expr(parts.join("+")),
        Rewrite::Expr(format!("''.join(({}))", parts.join(","))),
    ]
}

fn by_char(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = non_empty(subject) else { return Vec::new() };
    let calls: Vec<String> = codes(s).into_iter().map(|c| format!("chr({c})")).collect();
    one(calls.join("+"))
}

fn by_char_format(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = non_empty(subject) else { return Vec::new() };
    let codes = codes(s);
    let spec = "%c".repeat(codes.len());
    if codes.len() == 1 {
        one(format!("'{spec}'%{}", codes[0]))
    } else {
        one(format!("'{spec}'%({})", codes.join(",")))
    }
}

fn by_format(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = non_empty(subject) else { return Vec::new() };
    let codes = codes(s);
    let args: Vec<String> = codes.iter().map(|c| format!("chr({c})")).collect();
    one(format!("'{}'.format({})", "{}".repeat(codes.len()), args.join(",")))
}

fn escape(c: char, unicode_only: bool) -> String {
    let cp = c as u32;
    if cp < 0x100 && !unicode_only {
        format!("\\x{cp:02x}")
    } else if cp < 0x10000 {
        format!("\\u{cp:04x}")
    } else {
        format!("\\U{cp:08x}")
    }
}

fn by_hex_encode(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = non_empty(subject) else { return Vec::new() };
    let body: String = s.chars().map(|c| escape(c, false)).collect();
    one(format!("'{body}'"))
}

fn by_unicode_encode(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = non_empty(subject) else { return Vec::new() };
    let body: String = s.chars().map(|c| escape(c, true)).collect();
    one(format!("'{body}'"))
}

fn by_bytes_single(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = non_empty(subject) else { return Vec::new() };
    if !s.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return Vec::new();
    }
    let parts: Vec<String> = s.bytes().map(|b| format!("str(bytes([{b}]))[2]")).collect();
    one(parts.join("+"))
}

fn by_bytes_full(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = non_empty(subject) else { return Vec::new() };
    let bytes: Vec<String> = s.bytes().map(|b| b.to_string()).collect();
    one(format!("bytes([{}]).decode()", bytes.join(",")))
}

fn by_join_map_str(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(s) = non_empty(subject) else { return Vec::new() };
    one(format!("''.join(map(chr,[{}]))", codes(s).join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval_str;
    use crate::rules::RuleSet;

    fn texts(f: super::super::ApplyFn, s: &str) -> Vec<String> {
        let rules = RuleSet::unrestricted();
        let ctx = StrategyContext { rules: &rules };
        f(&Subject::Str(s), &ctx)
            .into_iter()
            .map(|r| match r {
                Rewrite::Expr(t) | Rewrite::Ident(t) => t,
            })
            .collect()
    }

    #[test]
    fn known_shapes() {
        assert_eq!(texts(by_empty_str, ""), vec!["str()"]);
        assert_eq!(texts(by_dict, "macr0phag3")[0], "list(dict(macr0phag3=()))[0]");
        assert_eq!(texts(by_dict, "0")[0], "list(dict(a0=()))[0][1:]");
        assert_eq!(texts(by_reverse, "HelloWorld")[0], "'dlroWolleH'[::-1]");
        assert_eq!(texts(by_char_format, "o")[0], "'%c'%111");
        assert_eq!(
            texts(by_hex_encode, "mac")[0],
            "'\\x6d\\x61\\x63'"
        );
        assert_eq!(texts(by_unicode_encode, "H")[0], "'\\u0048'");
        assert_eq!(texts(by_bytes_full, "mac")[0], "bytes([109,97,99]).decode()");
        assert_eq!(texts(by_format, "_")[0], "'{}'.format(chr(95))");
    }

    #[test]
    fn non_identifier_strings_skip_the_dict_trick() {
        assert!(texts(by_dict, "a b").is_empty());
        assert!(texts(by_dict, "").is_empty());
        assert_eq!(texts(by_dict, "for")[0], "list(dict(afor=()))[0][1:]");
    }

    #[test]
    fn every_rewrite_evaluates_to_the_original() {
        let samples = ["macr0phag3", "__import__", "it's", "ߨ x", "\n", "ab"];
        for strategy in strategies() {
            for sample in samples {
                for text in texts(strategy.apply, sample) {
                    assert_eq!(
                        eval_str(&text).as_deref(),
                        Some(sample),
                        "{} produced {text}",
                        strategy.name
                    );
                }
            }
        }
    }
}
