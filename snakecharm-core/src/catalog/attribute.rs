//! Attribute access strategies.

use super::homoglyph::{normalize_identifier, repair};
use super::{Category, FnStrategy, Rewrite, StrategyContext};
use crate::syntax::literal::py_repr;
use crate::syntax::Subject;

pub fn strategies() -> Vec<FnStrategy> {
    vec![
        FnStrategy {
            name: "by_getattr",
            category: Category::Attribute,
            description: "getattr(obj, 'attr')",
            apply: by_getattr,
        },
        FnStrategy {
            name: "by_vars",
            category: Category::Attribute,
            description: "vars(name)['attr'] for a plain name",
            apply: by_vars,
        },
        FnStrategy {
            name: "by_dict_attr",
            category: Category::Attribute,
            description: "name.__dict__['attr'] for a plain name",
            apply: by_dict_attr,
        },
        FnStrategy {
            name: "by_unicode",
            category: Category::Attribute,
            description: "lookalike letters in the attribute name",
            apply: by_unicode,
        },
    ]
}

fn by_getattr(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    match subject {
        Subject::Attribute { object, attr, .. } => {
            let key = py_repr(&normalize_identifier(attr));
            vec![Rewrite::Expr(format!("getattr({object},{key})"))]
        }
        _ => Vec::new(),
    }
}

fn by_vars(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    match subject {
        Subject::Attribute {
            object,
            object_is_name: true,
            attr,
        } => {
            let key = py_repr(&normalize_identifier(attr));
            vec![Rewrite::Expr(format!("vars({object})[{key}]"))]
        }
        _ => Vec::new(),
    }
}

fn by_dict_attr(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    match subject {
        Subject::Attribute {
            object,
            object_is_name: true,
            attr,
        } => {
            let key = py_repr(&normalize_identifier(attr));
            vec![Rewrite::Expr(format!("{object}.__dict__[{key}]"))]
        }
        _ => Vec::new(),
    }
}

fn by_unicode(subject: &Subject<'_>, ctx: &StrategyContext<'_>) -> Vec<Rewrite> {
    match subject {
        Subject::Attribute { attr, .. } => repair(attr, ctx.rules).into_iter().map(Rewrite::Ident).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    fn subject(object_is_name: bool) -> Subject<'static> {
        Subject::Attribute {
            object: if object_is_name { "os" } else { "(1+1)" },
            object_is_name,
            attr: "system",
        }
    }

    #[test]
    fn reflection_forms() {
        let rules = RuleSet::unrestricted();
        let ctx = StrategyContext { rules: &rules };
        assert_eq!(
            by_getattr(&subject(true), &ctx),
            vec![Rewrite::Expr("getattr(os,'system')".into())]
        );
        assert_eq!(
            by_vars(&subject(true), &ctx),
            vec![Rewrite::Expr("vars(os)['system']".into())]
        );
        assert_eq!(
            by_dict_attr(&subject(true), &ctx),
            vec![Rewrite::Expr("os.__dict__['system']".into())]
        );
    }

    #[test]
    fn mapping_forms_need_a_plain_name() {
        let rules = RuleSet::unrestricted();
        let ctx = StrategyContext { rules: &rules };
        assert!(by_vars(&subject(false), &ctx).is_empty());
        assert!(by_dict_attr(&subject(false), &ctx).is_empty());
        assert_eq!(by_getattr(&subject(false), &ctx).len(), 1);
    }
}
