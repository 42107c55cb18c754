//! Lookalike characters that Python folds back to ASCII.
//!
//! Python normalizes identifiers with NFKC, so `𝒊mport` and `import` name the
//! same binding. The tables here cover the fonts that survive that
//! normalization and can appear in identifiers.

use crate::rules::RuleSet;
use crate::syntax::literal::is_identifier;

/// Replacement fonts, tried in order. Each row is (first lowercase letter,
/// first uppercase letter, digit zero, underscore lookalike).
const FAMILIES: [(u32, u32, u32, u32); 4] = [
    (0x1D482, 0x1D468, 0x1D7CE, 0xFF3F), // bold italic, bold digits
    (0x1D41A, 0x1D400, 0x1D7E2, 0xFE4D), // bold, sans-serif digits
    (0x1D5BA, 0x1D5A0, 0x1D7F6, 0xFE4E), // sans-serif, monospace digits
    (0xFF41, 0xFF21, 0xFF10, 0xFE4F),    // fullwidth
];

pub fn family_count() -> usize {
    FAMILIES.len()
}

/// Lookalike of `c` in `family`, if there is one.
///
/// Digits and underscores cannot start an identifier in their lookalike form,
/// so callers pass `initial` for the first character.
pub fn substitute(c: char, family: usize, initial: bool) -> Option<char> {
    let (lower, upper, digit, underscore) = *FAMILIES.get(family)?;
    let code = match c {
        'a'..='z' => lower + (c as u32 - 'a' as u32),
        'A'..='Z' => upper + (c as u32 - 'A' as u32),
        '0'..='9' if !initial => digit + (c as u32 - '0' as u32),
        '_' if !initial => underscore,
        _ => return None,
    };
    char::from_u32(code)
}

/// The ASCII character `c` normalizes to, or `c` itself.
pub fn normalize_char(c: char) -> char {
    let cp = c as u32;
    let folded = match cp {
        0xFF01..=0xFF5E => Some(cp - 0xFEE0),
        0xFE4D..=0xFE4F => Some('_' as u32),
        0x1D400..=0x1D6A3 => {
            let idx = (cp - 0x1D400) % 52;
            if idx < 26 {
                Some('A' as u32 + idx)
            } else {
                Some('a' as u32 + idx - 26)
            }
        }
        0x1D7CE..=0x1D7FF => Some('0' as u32 + (cp - 0x1D7CE) % 10),
        _ => None,
    };
    folded.and_then(char::from_u32).unwrap_or(c)
}

pub fn normalize_identifier(ident: &str) -> String {
    ident.chars().map(normalize_char).collect()
}

/// Rewrites `ident` until `rules` accepts it, once per font family.
///
/// Each round looks at the first violation: the first ASCII letter inside it
/// is swapped for its lookalike, or failing that the last digit or underscore
/// that may legally be swapped. A family that runs out of swappable characters
/// contributes nothing. Results are distinct and differ from `ident`.
pub fn repair(ident: &str, rules: &RuleSet) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for family in 0..FAMILIES.len() {
        if let Some(candidate) = repair_with(ident, rules, family) {
            if candidate != ident && !out.contains(&candidate) {
                out.push(candidate);
            }
        }
    }
    out
}

fn repair_with(ident: &str, rules: &RuleSet, family: usize) -> Option<String> {
    let mut chars: Vec<char> = ident.chars().collect();
    let mut replaced = vec![false; chars.len()];

    for _ in 0..=chars.len() {
        let text: String = chars.iter().collect();
        let violations = rules.violations(&text);
        let Some(first) = violations.first() else {
            return is_identifier(&text).then_some(text);
        };
        let start = text[..first.start].chars().count();
        let end = start + text[first.start..first.end].chars().count();

        let letter = (start..end).find(|&i| !replaced[i] && chars[i].is_ascii_alphabetic());
        let pick = letter.or_else(|| {
            (start..end)
                .rev()
                .find(|&i| !replaced[i] && i > 0 && (chars[i].is_ascii_digit() || chars[i] == '_'))
        })?;

        chars[pick] = substitute(chars[pick], family, pick == 0)?;
        replaced[pick] = true;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blacklist(items: &[&str]) -> RuleSet {
        RuleSet::blacklist(items.iter().map(|s| s.to_string())).unwrap()
    }

    #[test]
    fn normalization_folds_every_family() {
        for family in 0..family_count() {
            for c in ('a'..='z').chain('A'..='Z') {
                let s = substitute(c, family, true).unwrap();
                assert_eq!(normalize_char(s), c, "family {family} char {c}");
            }
            for c in ('0'..='9').chain(['_']) {
                let s = substitute(c, family, false).unwrap();
                assert_eq!(normalize_char(s), c, "family {family} char {c}");
                assert!(substitute(c, family, true).is_none());
            }
        }
        assert_eq!(normalize_identifier("_＿import_＿"), "__import__");
    }

    #[test]
    fn double_underscore_is_broken_from_the_right() {
        let rules = blacklist(&["__"]);
        assert_eq!(repair("__import__", &rules)[0], "_＿import_＿");
    }

    #[test]
    fn letters_are_replaced_first() {
        let rules = blacklist(&["_i"]);
        assert_eq!(repair("__import__", &rules)[0], "__𝒊mport__");

        let rules = blacklist(&["imp", "rt"]);
        assert_eq!(repair("__import__", &rules)[0], "__𝒊mpo𝒓t__");

        let rules = blacklist(&["abc"]);
        assert_eq!(repair("abc", &rules)[0], "𝒂bc");
    }

    #[test]
    fn banned_lookalike_falls_through_to_next_family() {
        let rules = blacklist(&["imp", "𝒊"]);
        let repaired = repair("__import__", &rules);
        assert!(!repaired.is_empty());
        assert!(repaired.iter().all(|r| rules.allows(r)));
        assert!(repaired.iter().all(|r| normalize_identifier(r) == "__import__"));
    }

    #[test]
    fn leading_underscore_cannot_be_replaced() {
        let rules = blacklist(&["_"]);
        assert!(repair("_x", &rules).is_empty());
    }
}
