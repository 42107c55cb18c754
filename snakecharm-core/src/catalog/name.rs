//! Identifier strategies for names and keyword arguments.

use lazy_static::lazy_static;
use std::collections::HashSet;

use super::homoglyph::repair;
use super::{Category, FnStrategy, Rewrite, StrategyContext};
use crate::syntax::Subject;

lazy_static! {
    /// Names reachable as attributes of `__builtins__`.
    pub static ref BUILTINS: HashSet<&'static str> = [
        "__import__", "__build_class__", "abs", "all", "any", "ascii", "bin", "bool",
        "breakpoint", "bytearray", "bytes", "callable", "chr", "classmethod", "compile",
        "complex", "delattr", "dict", "dir", "divmod", "enumerate", "eval", "exec",
        "exit", "filter", "float", "format", "frozenset", "getattr", "globals",
        "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance",
        "issubclass", "iter", "len", "list", "locals", "map", "max", "memoryview",
        "min", "next", "object", "oct", "open", "ord", "pow", "print", "property",
        "quit", "range", "repr", "reversed", "round", "set", "setattr", "slice",
        "sorted", "staticmethod", "str", "sum", "super", "tuple", "type", "vars", "zip",
    ]
    .into_iter()
    .collect();
}

pub fn strategies() -> Vec<FnStrategy> {
    vec![
        FnStrategy {
            name: "by_unicode",
            category: Category::Name,
            description: "lookalike letters that normalize to the same name",
            apply: name_by_unicode,
        },
        FnStrategy {
            name: "by_builtins",
            category: Category::Name,
            description: "builtins reached through __builtins__",
            apply: by_builtins,
        },
    ]
}

pub fn keyword_strategies() -> Vec<FnStrategy> {
    vec![FnStrategy {
        name: "by_unicode",
        category: Category::Keyword,
        description: "lookalike letters in the keyword argument name",
        apply: keyword_by_unicode,
    }]
}

fn idents(candidates: Vec<String>) -> Vec<Rewrite> {
    candidates.into_iter().map(Rewrite::Ident).collect()
}

fn name_by_unicode(subject: &Subject<'_>, ctx: &StrategyContext<'_>) -> Vec<Rewrite> {
    match subject {
        Subject::Name(name) => idents(repair(name, ctx.rules)),
        _ => Vec::new(),
    }
}

fn by_builtins(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    match subject {
        Subject::Name(name) if BUILTINS.contains(*name) => {
            vec![Rewrite::Expr(format!("__builtins__.{name}"))]
        }
        _ => Vec::new(),
    }
}

fn keyword_by_unicode(subject: &Subject<'_>, ctx: &StrategyContext<'_>) -> Vec<Rewrite> {
    match subject {
        Subject::Keyword(arg) => idents(repair(arg, ctx.rules)),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    #[test]
    fn builtins_indirection_only_for_builtins() {
        let rules = RuleSet::unrestricted();
        let ctx = StrategyContext { rules: &rules };
        assert_eq!(
            by_builtins(&Subject::Name("__import__"), &ctx),
            vec![Rewrite::Expr("__builtins__.__import__".into())]
        );
        assert!(by_builtins(&Subject::Name("os"), &ctx).is_empty());
        assert!(by_builtins(&Subject::Name("__builtins__"), &ctx).is_empty());
    }

    #[test]
    fn keyword_names_are_repaired() {
        let rules = RuleSet::blacklist(["abc".to_string()]).unwrap();
        let ctx = StrategyContext { rules: &rules };
        let out = keyword_by_unicode(&Subject::Keyword("abc"), &ctx);
        assert_eq!(out[0], Rewrite::Ident("𝒂bc".into()));
    }
}
