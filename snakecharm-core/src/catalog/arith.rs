//! Arithmetic solver behind `int.by_cal`.
//!
//! Builds an expression equal to a target integer from the decimal literals
//! and literal-free atoms the rules permit, joined by whichever of
//! `+ - * **` are permitted. Searches a bounded expression depth for the
//! shortest form and falls back to a plain additive chain.

use std::collections::HashMap;

use crate::rendering::Precedence;
use crate::rules::RuleSet;

const MAX_DEPTH: u8 = 5;
const MAX_CHAIN_TERMS: usize = 256;
const LITERAL_RETRIES: usize = 64;
const MUL_DIVISORS: usize = 2;

/// Literal-free spellings of small integers.
const SPECIALS: [(&str, i64); 5] = [
    ("True", 1),
    ("False", 0),
    ("len(str(()))", 2),
    ("all(())", 1),
    ("len(())", 0),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    text: String,
    precedence: Precedence,
}

impl Term {
    fn atom(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            precedence: Precedence::Atom,
        }
    }

    fn wrapped(&self, min: Precedence) -> String {
        if self.precedence < min {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }
}

struct Solver<'a> {
    rules: &'a RuleSet,
    digits: Vec<u8>,
    specials: Vec<(&'static str, i64)>,
    add: bool,
    sub: bool,
    mul: bool,
    pow: bool,
    memo: HashMap<(i64, u8), Option<Term>>,
}

/// Expressions equal to `target`, shortest first. Empty when no form exists.
pub fn solve(target: i64, rules: &RuleSet) -> Vec<String> {
    let mut solver = Solver::new(rules);
    let mut out: Vec<String> = Vec::new();

    if target >= 0 {
        if let Some(term) = solver.best(target) {
            out.push(term.text);
        }
    } else if let Some(m) = target.checked_neg() {
        if rules.allows("-") {
            if let Some(term) = solver.best(m) {
                out.push(format!("-{}", term.wrapped(Precedence::Factor)));
            }
        }
        if rules.allows("~") {
            if let Some(term) = solver.best(m - 1) {
                out.push(format!("~{}", term.wrapped(Precedence::Factor)));
            }
        }
    }

    out.retain(|text| rules.allows(text));
    out.sort_by_key(|text| text.chars().count());
    out.dedup();
    out
}

impl<'a> Solver<'a> {
    fn new(rules: &'a RuleSet) -> Self {
        let digits = (0u8..=9).filter(|d| rules.allows(&d.to_string())).collect();
        let specials = SPECIALS.iter().copied().filter(|(text, _)| rules.allows(text)).collect();
        Self {
            rules,
            digits,
            specials,
            add: rules.allows("+"),
            sub: rules.allows("-"),
            mul: rules.allows("*"),
            pow: rules.allows("**"),
            memo: HashMap::new(),
        }
    }

    /// Shortest form of `m >= 0` found by the bounded search, else the chain.
    fn best(&mut self, m: i64) -> Option<Term> {
        self.solve(m, MAX_DEPTH).or_else(|| self.chain(m))
    }

    fn literal(&self, m: i64) -> Option<Term> {
        if m < 0 {
            return None;
        }
        let text = m.to_string();
        let ok = text.bytes().all(|b| self.digits.contains(&(b - b'0'))) && self.rules.allows(&text);
        ok.then(|| Term::atom(text))
    }

    /// The best atom (literal or special) with exactly value `m`.
    fn atom(&self, m: i64) -> Option<Term> {
        let special = self
            .specials
            .iter()
            .filter(|(_, v)| *v == m)
            .map(|(text, _)| Term::atom(*text))
            .min_by_key(Term::len);
        match (self.literal(m), special) {
            (Some(l), Some(s)) => Some(if s.len() < l.len() { s } else { l }),
            (l, s) => l.or(s),
        }
    }

    /// Largest atom value in `1..=m`.
    fn atom_le(&self, m: i64) -> Option<(i64, Term)> {
        let mut best: Option<(i64, Term)> = None;
        if let Some(v) = self.literal_le(m) {
            if v > 0 {
                best = self.literal(v).map(|t| (v, t));
            }
        }
        for (text, v) in &self.specials {
            if *v > 0 && *v <= m && best.as_ref().map_or(true, |(b, _)| v > b) {
                best = Some((*v, Term::atom(*text)));
            }
        }
        best
    }

    /// Smallest atom value strictly above `m`.
    fn atom_gt(&self, m: i64) -> Option<(i64, Term)> {
        let mut best: Option<(i64, Term)> = m
            .checked_add(1)
            .and_then(|n| self.literal_ge(n))
            .and_then(|v| self.literal(v).map(|t| (v, t)));
        for (text, v) in &self.specials {
            if *v > m && best.as_ref().map_or(true, |(b, _)| v < b) {
                best = Some((*v, Term::atom(*text)));
            }
        }
        best
    }

    fn literal_le(&self, m: i64) -> Option<i64> {
        let mut n = m;
        for _ in 0..LITERAL_RETRIES {
            let v = largest_digits_le(n, &self.digits)?;
            if self.literal(v).is_some() {
                return Some(v);
            }
            n = v.checked_sub(1)?;
        }
        None
    }

    fn literal_ge(&self, m: i64) -> Option<i64> {
        let mut n = m;
        for _ in 0..LITERAL_RETRIES {
            let v = smallest_digits_ge(n, &self.digits)?;
            if self.literal(v).is_some() {
                return Some(v);
            }
            n = v.checked_add(1)?;
        }
        None
    }

    fn solve(&mut self, m: i64, depth: u8) -> Option<Term> {
        if let Some(hit) = self.memo.get(&(m, depth)) {
            return hit.clone();
        }
        let found = self.search(m, depth);
        self.memo.insert((m, depth), found.clone());
        found
    }

    fn search(&mut self, m: i64, depth: u8) -> Option<Term> {
        if let Some(atom) = self.atom(m) {
            return Some(atom);
        }
        if depth == 0 || m < 0 {
            return None;
        }
        let mut candidates: Vec<Term> = Vec::new();

        if self.add {
            if let Some((a, left)) = self.atom_le(m) {
                if a < m {
                    if let Some(rest) = self.solve(m - a, depth - 1) {
                        candidates.push(Term {
                            text: format!("{}+{}", left.text, rest.wrapped(Precedence::Arith)),
                            precedence: Precedence::Arith,
                        });
                    }
                }
            }
        }

        if self.sub {
            if let Some((b, left)) = self.atom_gt(m) {
                if let Some(rest) = self.solve(b - m, depth - 1) {
                    candidates.push(Term {
                        text: format!("{}-{}", left.text, rest.wrapped(Precedence::Term)),
                        precedence: Precedence::Arith,
                    });
                }
            }
        }

        if self.mul && m > 1 {
            let divisors: Vec<i64> = self
                .digits
                .iter()
                .rev()
                .map(|&d| i64::from(d))
                .filter(|&d| d > 1 && m % d == 0 && m / d > 1)
                .take(MUL_DIVISORS)
                .collect();
            for d in divisors {
                if let (Some(left), Some(right)) = (self.atom(d), self.solve(m / d, depth - 1)) {
                    candidates.push(Term {
                        text: format!("{}*{}", left.text, right.wrapped(Precedence::Term)),
                        precedence: Precedence::Term,
                    });
                }
            }
        }

        if self.pow && m > 1 {
            let bases: Vec<i64> = self.digits.iter().rev().map(|&d| i64::from(d)).collect();
            for base in bases {
                if base < 2 {
                    continue;
                }
                if let Some(exp) = exact_log(m, base) {
                    if let (Some(left), Some(right)) = (self.atom(base), self.solve(exp, depth - 1)) {
                        candidates.push(Term {
                            text: format!("{}**{}", left.text, right.wrapped(Precedence::Factor)),
                            precedence: Precedence::Power,
                        });
                    }
                }
            }
        }

        candidates.into_iter().min_by_key(Term::len)
    }

    /// `a+a+...+b`, largest atoms first.
    fn chain(&self, m: i64) -> Option<Term> {
        if m == 0 {
            return self.atom(0);
        }
        if !self.add {
            return None;
        }
        let mut remaining = m;
        let mut parts: Vec<String> = Vec::new();
        while remaining > 0 && parts.len() < MAX_CHAIN_TERMS {
            let (v, term) = self.atom_le(remaining)?;
            parts.push(term.text);
            remaining -= v;
        }
        if remaining != 0 {
            return None;
        }
        let precedence = if parts.len() > 1 { Precedence::Arith } else { Precedence::Atom };
        Some(Term {
            text: parts.join("+"),
            precedence,
        })
    }
}

/// `e >= 2` with `base ** e == m`.
fn exact_log(m: i64, base: i64) -> Option<i64> {
    let mut acc = base;
    let mut e = 1;
    while acc < m {
        acc = acc.checked_mul(base)?;
        e += 1;
    }
    (acc == m && e >= 2).then_some(e)
}

fn decimal_digits(n: i64) -> Vec<u8> {
    n.to_string().bytes().map(|b| b - b'0').collect()
}

fn from_digits(digits: &[u8]) -> Option<i64> {
    digits
        .iter()
        .try_fold(0i64, |acc, &d| acc.checked_mul(10)?.checked_add(i64::from(d)))
}

/// Largest `v <= n` whose decimal digits all come from `allowed`.
fn largest_digits_le(n: i64, allowed: &[u8]) -> Option<i64> {
    if n < 0 || allowed.is_empty() {
        return None;
    }
    let s = decimal_digits(n);
    let len = s.len();
    let max = *allowed.iter().max()?;
    let prefix = s.iter().take_while(|d| allowed.contains(d)).count();
    if prefix == len {
        return Some(n);
    }
    for i in (0..=prefix).rev() {
        let below = allowed
            .iter()
            .copied()
            .filter(|&d| d < s[i] && (i > 0 || d > 0 || len == 1))
            .max();
        if let Some(d) = below {
            let mut digits = s[..i].to_vec();
            digits.push(d);
            digits.extend(std::iter::repeat(max).take(len - i - 1));
            return from_digits(&digits);
        }
    }
    if len > 1 {
        if max > 0 {
            return from_digits(&vec![max; len - 1]);
        }
        return Some(0);
    }
    None
}

/// Smallest `v >= n` whose decimal digits all come from `allowed`.
fn smallest_digits_ge(n: i64, allowed: &[u8]) -> Option<i64> {
    if n < 0 || allowed.is_empty() {
        return None;
    }
    let s = decimal_digits(n);
    let len = s.len();
    let min = *allowed.iter().min()?;
    let prefix = s.iter().take_while(|d| allowed.contains(d)).count();
    if prefix == len {
        return Some(n);
    }
    for i in (0..=prefix).rev() {
        if let Some(d) = allowed.iter().copied().filter(|&d| d > s[i]).min() {
            let mut digits = s[..i].to_vec();
            digits.push(d);
            digits.extend(std::iter::repeat(min).take(len - i - 1));
            return from_digits(&digits);
        }
    }
    let lead = allowed.iter().copied().filter(|&d| d > 0).min()?;
    let mut digits = vec![lead];
    digits.extend(std::iter::repeat(min).take(len));
    from_digits(&digits)
}
