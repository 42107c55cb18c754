//! Boolean operator strategies.
//!
//! Both rewrites preserve the truth value of the whole expression for `int`
//! and `bool` operands. They do not preserve the operand that `and`/`or`
//! would have returned.

use super::{Category, FnStrategy, Rewrite, StrategyContext};
use crate::rendering::Precedence;
use crate::syntax::{BoolOperator, Operand, Subject};

pub fn strategies() -> Vec<FnStrategy> {
    vec![
        FnStrategy {
            name: "by_bitwise",
            category: Category::BoolOp,
            description: "and/or as & and |",
            apply: by_bitwise,
        },
        FnStrategy {
            name: "by_arithmetic",
            category: Category::BoolOp,
            description: "and/or as bool()*bool() and bool()+bool()",
            apply: by_arithmetic,
        },
    ]
}

fn operand_for(operand: &Operand<'_>, min: Precedence) -> String {
    if operand.precedence < min {
        format!("({})", operand.text)
    } else {
        operand.text.to_string()
    }
}

fn by_bitwise(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Subject::BoolOp { op, operands } = subject else { return Vec::new() };
    let (symbol, min) = match op {
        BoolOperator::And => ("&", Precedence::Shift),
        BoolOperator::Or => ("|", Precedence::BXor),
    };
    let parts: Vec<String> = operands.iter().map(|o| operand_for(o, min)).collect();
    vec![Rewrite::Expr(parts.join(symbol))]
}

fn by_arithmetic(subject: &Subject<'_>, _: &StrategyContext<'_>) -> Vec<Rewrite> {
    let Subject::BoolOp { op, operands } = subject else { return Vec::new() };
    let symbol = match op {
        BoolOperator::And => "*",
        BoolOperator::Or => "+",
    };
    let parts: Vec<String> = operands.iter().map(|o| format!("bool({})", o.text)).collect();
    vec![Rewrite::Expr(parts.join(symbol))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    #[test]
    fn loose_operands_are_parenthesized() {
        let rules = RuleSet::unrestricted();
        let ctx = StrategyContext { rules: &rules };
        let subject = Subject::BoolOp {
            op: BoolOperator::And,
            operands: vec![
                Operand {
                    text: "1",
                    precedence: Precedence::Atom,
                },
                Operand {
                    text: "2 or 3",
                    precedence: Precedence::Or,
                },
            ],
        };
        assert_eq!(by_bitwise(&subject, &ctx), vec![Rewrite::Expr("1&(2 or 3)".into())]);
        assert_eq!(
            by_arithmetic(&subject, &ctx),
            vec![Rewrite::Expr("bool(1)*bool(2 or 3)".into())]
        );
    }
}
