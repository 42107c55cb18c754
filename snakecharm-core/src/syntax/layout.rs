//! How a node is spelled in terms of its children.
//!
//! A [`Layout`] is a sequence of fixed text, child slots and at most one
//! identifier slot. The combiner fills the slots with child renderings;
//! a slot wraps its child in parentheses when the child binds more loosely
//! than the slot requires.

use std::borrow::Cow;

use crate::rendering::{Precedence, Rendering};
use crate::syntax::{NodeId, NodeKind, SyntaxTree, UnaryOperator};

#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(Cow<'static, str>),
    /// A child rendering. `dotted` marks the object of an attribute access,
    /// where a bare decimal literal needs parentheses.
    Child {
        id: NodeId,
        min: Precedence,
        dotted: bool,
    },
    /// The node's own identifier: a name, keyword argument or attribute.
    Ident(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub pieces: Vec<Piece>,
    pub precedence: Precedence,
}

impl Layout {
    pub fn child_ids(&self) -> Vec<NodeId> {
        self.pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Child { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn ident(&self) -> Option<&str> {
        self.pieces.iter().find_map(|p| match p {
            Piece::Ident(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Spells the node with `children` (in slot order) and `ident`.
    ///
    /// Stops at the first child slot with no rendering, so passing a prefix
    /// of the children yields a prefix of the text.
    pub fn assemble(&self, children: &[&Rendering], ident: Option<&str>) -> String {
        let mut out = String::new();
        let mut next_child = children.iter();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Ident(original) => out.push_str(ident.unwrap_or(original)),
                Piece::Child { min, dotted, .. } => {
                    let Some(child) = next_child.next() else { break };
                    if *dotted && child.text.bytes().all(|b| b.is_ascii_digit() || b == b'_') {
                        out.push('(');
                        out.push_str(&child.text);
                        out.push(')');
                    } else {
                        out.push_str(&child.text_for(*min));
                    }
                }
            }
        }
        out
    }
}

fn text(s: &'static str) -> Piece {
    Piece::Text(Cow::Borrowed(s))
}

fn child(id: NodeId, min: Precedence) -> Piece {
    Piece::Child { id, min, dotted: false }
}

fn separated(pieces: &mut Vec<Piece>, ids: &[NodeId], sep: &'static str, min: Precedence) {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            pieces.push(text(sep));
        }
        pieces.push(child(*id, min));
    }
}

/// Builds the layout of node `id`.
pub fn layout(tree: &SyntaxTree, id: NodeId) -> Layout {
    let precedence = tree.precedence(id);
    let mut pieces = Vec::new();
    match tree.kind(id) {
        NodeKind::Module { body, separator } => {
            let sep = if *separator == ';' { ";" } else { "\n" };
            separated(&mut pieces, body, sep, Precedence::Tuple);
        }
        NodeKind::Int(_) | NodeKind::BigInt | NodeKind::Float | NodeKind::Str(_) | NodeKind::Bytes(_) | NodeKind::Constant(_) => {
            pieces.push(Piece::Text(Cow::Owned(tree.text(id).to_string())));
        }
        NodeKind::Name(_) => pieces.push(Piece::Ident(tree.text(id).to_string())),
        NodeKind::Attribute { value, attr } => {
            pieces.push(Piece::Child {
                id: *value,
                min: Precedence::Atom,
                dotted: true,
            });
            pieces.push(text("."));
            pieces.push(Piece::Ident(attr.clone()));
        }
        NodeKind::Call { func, args } => {
            pieces.push(child(*func, Precedence::Atom));
            pieces.push(text("("));
            separated(&mut pieces, args, ",", Precedence::Test);
            pieces.push(text(")"));
        }
        NodeKind::Keyword { arg, value } => {
            pieces.push(Piece::Ident(arg.clone()));
            pieces.push(text("="));
            pieces.push(child(*value, Precedence::Test));
        }
        NodeKind::Starred { value, double } => {
            // Displays only take `*` over a bitwise-or operand.
            pieces.push(text(if *double { "**" } else { "*" }));
            pieces.push(child(*value, Precedence::BOr));
        }
        NodeKind::Subscript { value, slice } => {
            pieces.push(child(*value, Precedence::Atom));
            pieces.push(text("["));
            match tree.kind(*slice) {
                NodeKind::Tuple(elts) if !elts.is_empty() => {
                    separated(&mut pieces, elts, ",", Precedence::Test);
                    if elts.len() == 1 {
                        pieces.push(text(","));
                    }
                }
                _ => pieces.push(child(*slice, Precedence::Test)),
            }
            pieces.push(text("]"));
        }
        NodeKind::Slice { lower, upper, step } => {
            if let Some(lower) = lower {
                pieces.push(child(*lower, Precedence::Test));
            }
            pieces.push(text(":"));
            if let Some(upper) = upper {
                pieces.push(child(*upper, Precedence::Test));
            }
            if let Some(step) = step {
                pieces.push(text(":"));
                pieces.push(child(*step, Precedence::Test));
            }
        }
        NodeKind::BinOp { left, op, right } => {
            let own = op.precedence();
            let (left_min, right_min) = if own == Precedence::Power {
                (Precedence::Atom, Precedence::Factor)
            } else {
                (own, own.next())
            };
            pieces.push(child(*left, left_min));
            pieces.push(text(op.symbol()));
            pieces.push(child(*right, right_min));
        }
        NodeKind::UnaryOp { op, operand } => {
            let min = if *op == UnaryOperator::Not { Precedence::Not } else { Precedence::Factor };
            pieces.push(text(op.symbol()));
            pieces.push(child(*operand, min));
        }
        NodeKind::BoolOp { op, values } => {
            let sep = match op.keyword() {
                "and" => " and ",
                _ => " or ",
            };
            separated(&mut pieces, values, sep, op.precedence().next());
        }
        NodeKind::Compare { left, ops, comparators } => {
            pieces.push(child(*left, Precedence::BOr));
            for (op, comparator) in ops.iter().zip(comparators) {
                pieces.push(text(op.text()));
                pieces.push(child(*comparator, Precedence::BOr));
            }
        }
        NodeKind::IfExp { test, body, orelse } => {
            pieces.push(child(*body, Precedence::Or));
            pieces.push(text(" if "));
            pieces.push(child(*test, Precedence::Or));
            pieces.push(text(" else "));
            pieces.push(child(*orelse, Precedence::Test));
        }
        NodeKind::Tuple(elts) => {
            pieces.push(text("("));
            separated(&mut pieces, elts, ",", Precedence::Test);
            if elts.len() == 1 {
                pieces.push(text(","));
            }
            pieces.push(text(")"));
        }
        NodeKind::List(elts) => {
            pieces.push(text("["));
            separated(&mut pieces, elts, ",", Precedence::Test);
            pieces.push(text("]"));
        }
        NodeKind::Set(elts) => {
            pieces.push(text("{"));
            separated(&mut pieces, elts, ",", Precedence::Test);
            pieces.push(text("}"));
        }
        NodeKind::Dict(entries) => {
            pieces.push(text("{"));
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    pieces.push(text(","));
                }
                pieces.push(child(*key, Precedence::Test));
                pieces.push(text(":"));
                pieces.push(child(*value, Precedence::Test));
            }
            pieces.push(text("}"));
        }
    }
    Layout { pieces, precedence }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_expression;

    /// Renders every node with its children's own identity text.
    fn identity(tree: &SyntaxTree, id: NodeId) -> Rendering {
        let layout = layout(tree, id);
        let children: Vec<Rendering> = layout.child_ids().into_iter().map(|c| identity(tree, c)).collect();
        let refs: Vec<&Rendering> = children.iter().collect();
        Rendering::new(layout.assemble(&refs, None), layout.precedence)
    }

    fn roundtrip(src: &str) -> String {
        let tree = parse_expression(src).unwrap();
        identity(&tree, tree.root()).text
    }

    #[test]
    fn compact_identity_rendering() {
        assert_eq!(roundtrip("f(a, b=1)"), "f(a,b=1)");
        assert_eq!(roundtrip("'abc'[::-1]"), "'abc'[::-1]");
        assert_eq!(roundtrip("(1 + 2) * 3"), "(1+2)*3");
        assert_eq!(roundtrip("1 - (2 - 3)"), "1-(2-3)");
        assert_eq!(roundtrip("(2 ** 3) ** 2"), "(2**3)**2");
        assert_eq!(roundtrip("2 ** -1"), "2**-1");
        assert_eq!(roundtrip("(-1) ** 2"), "(-1)**2");
        assert_eq!(roundtrip("not a or b"), "not a or b");
        assert_eq!(roundtrip("a if b else c"), "a if b else c");
        assert_eq!(roundtrip("x in y"), "x in y");
        assert_eq!(roundtrip("(1,)"), "(1,)");
        assert_eq!(roundtrip("{'a': 1}"), "{'a':1}");
    }

    #[test]
    fn attribute_on_decimal_literal_is_parenthesized() {
        assert_eq!(roundtrip("(1).real"), "(1).real");
        assert_eq!(roundtrip("(1 + 2).real"), "(1+2).real");
        assert_eq!(roundtrip("os.system"), "os.system");
        assert_eq!(roundtrip("(1_000).real"), "(1_000).real");
        assert_eq!(roundtrip("(0x1f).real"), "0x1f.real");
    }

    #[test]
    fn starred_operands_stay_valid_in_displays() {
        assert_eq!(roundtrip("[*a, *b]"), "[*a,*b]");
        assert_eq!(roundtrip("f(*(a or b))"), "f(*(a or b))");
        assert_eq!(roundtrip("{*(a if b else c)}"), "{*(a if b else c)}");
        assert_eq!(roundtrip("[*(a < b)]"), "[*(a<b)]");
        assert_eq!(roundtrip("[*a | b]"), "[*a|b]");
    }

    #[test]
    fn ident_slot_is_replaceable() {
        let tree = parse_expression("dict(abc=1)").unwrap();
        let crate::syntax::NodeKind::Call { args, .. } = tree.kind(tree.root()) else {
            panic!("expected call");
        };
        let kw = layout(&tree, args[0]);
        assert_eq!(kw.ident(), Some("abc"));
        let value = Rendering::new("1", Precedence::Atom);
        assert_eq!(kw.assemble(&[&value], Some("𝒂bc")), "𝒂bc=1");
    }
}
