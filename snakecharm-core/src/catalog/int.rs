//! Integer literal strategies.

use super::arith;
use super::{Category, FnStrategy, Rewrite, StrategyContext};
use crate::syntax::literal::{py_repr, quote_with};
use crate::syntax::Subject;

/// Digit zero of the fonts `int()` accepts, tried in order.
const UNICODE_DIGITS: [u32; 6] = [0x1D7E2, 0x1D7CE, 0x1D7D8, 0x1D7EC, 0x1D7F6, 0xFF10];

pub fn strategies() -> Vec<FnStrategy> {
    vec![
        FnStrategy {
            name: "by_trans",
            category: Category::Int,
            description: "small integers spelled with builtins: True, len(()), -~False",
            apply: by_trans,
        },
        FnStrategy {
            name: "by_hex",
            category: Category::Int,
            description: "hexadecimal literal",
            apply: by_hex,
        },
        FnStrategy {
            name: "by_bin",
            category: Category::Int,
            description: "binary literal",
            apply: by_bin,
        },
        FnStrategy {
            name: "by_oct",
            category: Category::Int,
            description: "octal literal",
            apply: by_oct,
        },
        FnStrategy {
            name: "by_ord",
            category: Category::Int,
            description: "ord() of the character with that code point",
            apply: by_ord,
        },
        FnStrategy {
            name: "by_unicode",
            category: Category::Int,
            description: "int() over lookalike digits",
            apply: by_unicode,
        },
        FnStrategy {
            name: "by_cal",
            category: Category::Int,
            description: "arithmetic over the literals and atoms the rules allow",
            apply: by_cal,
        },
    ]
}

fn value(subject: &Subject<'_>) -> Option<i64> {
    match subject {
        Subject::Int(v) => Some(*v),
        _ => None,
    }
}

fn exprs<I: IntoIterator<Item = String>>(texts: I) -> Vec<Rewrite> {
    texts.into_iter().map(Rewrite::Expr).collect()
}

fn by_trans(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let forms: &[&str] = match value(subject) {
        Some(0) => &["False", "len(())", "int()"],
        Some(1) => &["True", "all(())", "-~False", "len([()])"],
        Some(2) => &["len(str(()))", "True+True", "-~True"],
        Some(3) => &["len(str(()))+True", "-~-~True"],
        Some(-1) => &["~False", "-True"],
        Some(-2) => &["~True", "-len(str(()))"],
        _ => &[],
    };
    exprs(forms.iter().map(|s| s.to_string()))
}

fn sign(v: i64) -> &'static str {
    if v < 0 {
        "-"
    } else {
        ""
    }
}

fn by_hex(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(v) = value(subject) else { return Vec::new() };
    let m = v.unsigned_abs();
    let s = sign(v);
    exprs([format!("{s}0x{m:x}"), format!("{s}0X{m:X}")])
}

fn by_bin(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(v) = value(subject) else { return Vec::new() };
    let m = v.unsigned_abs();
    let s = sign(v);
    exprs([format!("{s}0b{m:b}"), format!("{s}0B{m:b}")])
}

fn by_oct(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(v) = value(subject) else { return Vec::new() };
    let m = v.unsigned_abs();
    let s = sign(v);
    exprs([format!("{s}0o{m:o}"), format!("{s}0O{m:o}")])
}

fn by_ord(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(v) = value(subject) else { return Vec::new() };
    let Some(c) = u32::try_from(v.unsigned_abs()).ok().and_then(char::from_u32) else {
        return Vec::new();
    };
    let s = sign(v);
    let single = py_repr(&c.to_string());
    let double = quote_with(&c.to_string(), '"');
    let mut out = vec![format!("{s}ord({single})")];
    if double != single {
        out.push(format!("{s}ord({double})"));
    }
    exprs(out)
}

fn by_unicode(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(v) = value(subject) else { return Vec::new() };
    let digits = v.unsigned_abs().to_string();
    let s = sign(v);
    let forms = UNICODE_DIGITS.iter().filter_map(|&zero| {
        let lookalike: Option<String> = digits
            .bytes()
            .map(|d| char::from_u32(zero + u32::from(d - b'0')))
            .collect();
        lookalike.map(|l| format!("int('{s}{l}')"))
    });
    exprs(forms)
}

fn by_cal(subject: &Subject<'_>, ctx: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Some(v) = value(subject) else { return Vec::new() };
    exprs(arith::solve(v, ctx.rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    fn run(f: super::super::ApplyFn, v: i64) -> Vec<String> {
        let rules = RuleSet::unrestricted();
        let ctx = StrategyContext { rules: &rules };
        f(&Subject::Int(v), &ctx)
            .into_iter()
            .map(|r| match r {
                Rewrite::Expr(s) | Rewrite::Ident(s) => s,
            })
            .collect()
    }

    #[test]
    fn radix_forms() {
        assert_eq!(run(by_hex, 19)[0], "0x13");
        assert_eq!(run(by_hex, -2024)[0], "-0x7e8");
        assert_eq!(run(by_bin, 2024)[0], "0b11111101000");
        assert_eq!(run(by_oct, 8)[0], "0o10");
    }

    #[test]
    fn ord_forms() {
        assert_eq!(run(by_ord, 19)[0], "ord('\\x13')");
        assert_eq!(run(by_ord, 10)[0], "ord('\\n')");
        assert_eq!(run(by_ord, 2024)[0], "ord('ߨ')");
        assert_eq!(run(by_ord, -2024)[0], "-ord('ߨ')");
        assert!(run(by_ord, 0xD800).is_empty());
    }

    #[test]
    fn unicode_digit_forms() {
        assert_eq!(run(by_unicode, 1)[0], "int('𝟣')");
        assert_eq!(run(by_unicode, -1)[0], "int('-𝟣')");
        assert_eq!(run(by_unicode, 2024)[0], "int('𝟤𝟢𝟤𝟦')");
        assert_eq!(run(by_unicode, 7).len(), UNICODE_DIGITS.len());
    }

    #[test]
    fn trans_table_covers_small_values() {
        assert_eq!(run(by_trans, 1)[0], "True");
        assert_eq!(run(by_trans, 2)[0], "len(str(()))");
        assert!(run(by_trans, 42).is_empty());
    }
}
