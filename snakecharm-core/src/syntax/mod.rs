//! syntax - Parsed snippets as an arena of immutable nodes.
//!
//! The parser produces a [`SyntaxTree`] that owns every [`SyntaxNode`]; nodes
//! refer to their children by [`NodeId`]. Leaves keep their source span so an
//! unchanged leaf renders exactly as the caller wrote it.
//!
//! License: MIT OR Apache-2.0

pub mod layout;
pub mod lexer;
pub mod literal;
pub mod parser;

pub use layout::{layout, Layout, Piece};
pub use parser::{parse_expression, parse_snippet};

use crate::catalog::Category;
use crate::rendering::Precedence;
use crate::catalog::homoglyph::normalize_identifier;

/// Index of a node inside its [`SyntaxTree`].
pub type NodeId = usize;

/// Byte range of a node in the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOperator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mult => "*",
            Self::MatMult => "@",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
        }
    }

    pub fn precedence(self) -> Precedence {
        match self {
            Self::BitOr => Precedence::BOr,
            Self::BitXor => Precedence::BXor,
            Self::BitAnd => Precedence::BAnd,
            Self::LShift | Self::RShift => Precedence::Shift,
            Self::Add | Self::Sub => Precedence::Arith,
            Self::Mult | Self::MatMult | Self::Div | Self::FloorDiv | Self::Mod => Precedence::Term,
            Self::Pow => Precedence::Power,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Neg,
    Pos,
    Invert,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Not => "not ",
            Self::Neg => "-",
            Self::Pos => "+",
            Self::Invert => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOperator {
    And,
    Or,
}

impl BoolOperator {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }

    pub fn precedence(self) -> Precedence {
        match self {
            Self::And => Precedence::And,
            Self::Or => Precedence::Or,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOperator {
    /// Operator text including the spaces word operators need.
    pub fn text(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::Is => " is ",
            Self::IsNot => " is not ",
            Self::In => " in ",
            Self::NotIn => " not in ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    True,
    False,
    None,
    Ellipsis,
}

/// Node payloads. Child references are arena indices.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Expression statements separated by `separator`.
    Module { body: Vec<NodeId>, separator: char },
    Int(i64),
    /// Integer literal outside the `i64` range; rendered verbatim.
    BigInt,
    /// Float or imaginary literal; rendered verbatim.
    Float,
    Str(String),
    Bytes(Vec<u8>),
    Constant(ConstantKind),
    Name(String),
    Attribute { value: NodeId, attr: String },
    Call { func: NodeId, args: Vec<NodeId> },
    Keyword { arg: String, value: NodeId },
    Starred { value: NodeId, double: bool },
    Subscript { value: NodeId, slice: NodeId },
    Slice { lower: Option<NodeId>, upper: Option<NodeId>, step: Option<NodeId> },
    BinOp { left: NodeId, op: BinOperator, right: NodeId },
    UnaryOp { op: UnaryOperator, operand: NodeId },
    BoolOp { op: BoolOperator, values: Vec<NodeId> },
    Compare { left: NodeId, ops: Vec<CmpOperator>, comparators: Vec<NodeId> },
    IfExp { test: NodeId, body: NodeId, orelse: NodeId },
    Tuple(Vec<NodeId>),
    List(Vec<NodeId>),
    Set(Vec<NodeId>),
    Dict(Vec<(NodeId, NodeId)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Span,
}

/// An operand of a boolean operation, as strategies see it.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand<'a> {
    pub text: &'a str,
    pub precedence: Precedence,
}

/// The semantic value of a node that has a strategy category.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject<'a> {
    Int(i64),
    Str(&'a str),
    Name(&'a str),
    Attribute {
        object: &'a str,
        object_is_name: bool,
        attr: &'a str,
    },
    Keyword(&'a str),
    BoolOp {
        op: BoolOperator,
        operands: Vec<Operand<'a>>,
    },
}

impl Subject<'_> {
    pub fn category(&self) -> Category {
        match self {
            Subject::Int(_) => Category::Int,
            Subject::Str(_) => Category::String,
            Subject::Name(_) => Category::Name,
            Subject::Attribute { .. } => Category::Attribute,
            Subject::Keyword(_) => Category::Keyword,
            Subject::BoolOp { .. } => Category::BoolOp,
        }
    }
}

/// A parsed snippet. Immutable once built.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<SyntaxNode>,
    root: NodeId,
}

impl SyntaxTree {
    pub(crate) fn new(source: String, nodes: Vec<SyntaxNode>, root: NodeId) -> Self {
        Self { source, nodes, root }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    /// Source text covered by the node.
    pub fn text(&self, id: NodeId) -> &str {
        let span = self.nodes[id].span;
        &self.source[span.start..span.end]
    }

    /// Direct children in rendering order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id].kind {
            NodeKind::Module { body, .. } => body.clone(),
            NodeKind::Int(_)
            | NodeKind::BigInt
            | NodeKind::Float
            | NodeKind::Str(_)
            | NodeKind::Bytes(_)
            | NodeKind::Constant(_)
            | NodeKind::Name(_) => Vec::new(),
            NodeKind::Attribute { value, .. }
            | NodeKind::Keyword { value, .. }
            | NodeKind::Starred { value, .. } => vec![*value],
            NodeKind::Call { func, args } => std::iter::once(*func).chain(args.iter().copied()).collect(),
            NodeKind::Subscript { value, slice } => vec![*value, *slice],
            NodeKind::Slice { lower, upper, step } => [*lower, *upper, *step].into_iter().flatten().collect(),
            NodeKind::BinOp { left, right, .. } => vec![*left, *right],
            NodeKind::UnaryOp { operand, .. } => vec![*operand],
            NodeKind::BoolOp { values, .. } => values.clone(),
            NodeKind::Compare { left, comparators, .. } => {
                std::iter::once(*left).chain(comparators.iter().copied()).collect()
            }
            NodeKind::IfExp { test, body, orelse } => vec![*body, *test, *orelse],
            NodeKind::Tuple(elts) | NodeKind::List(elts) | NodeKind::Set(elts) => elts.clone(),
            NodeKind::Dict(entries) => entries.iter().flat_map(|(k, v)| [*k, *v]).collect(),
        }
    }

    /// Binding strength of the node's own construct.
    pub fn precedence(&self, id: NodeId) -> Precedence {
        match &self.nodes[id].kind {
            NodeKind::Module { .. } => Precedence::Tuple,
            NodeKind::Int(v) if *v < 0 => Precedence::Factor,
            NodeKind::Keyword { .. } | NodeKind::Starred { .. } | NodeKind::Slice { .. } | NodeKind::IfExp { .. } => {
                Precedence::Test
            }
            NodeKind::BinOp { op, .. } => op.precedence(),
            NodeKind::UnaryOp { op: UnaryOperator::Not, .. } => Precedence::Not,
            NodeKind::UnaryOp { .. } => Precedence::Factor,
            NodeKind::BoolOp { op, .. } => op.precedence(),
            NodeKind::Compare { .. } => Precedence::Cmp,
            _ => Precedence::Atom,
        }
    }

    pub fn category(&self, id: NodeId) -> Option<Category> {
        self.subject(id).map(|s| s.category())
    }

    /// The value strategies operate on, for nodes that have a category.
    pub fn subject(&self, id: NodeId) -> Option<Subject<'_>> {
        match &self.nodes[id].kind {
            NodeKind::Int(v) => Some(Subject::Int(*v)),
            NodeKind::Str(s) => Some(Subject::Str(s)),
            NodeKind::Name(_) => Some(Subject::Name(self.text(id))),
            NodeKind::Attribute { value, attr } => Some(Subject::Attribute {
                object: self.text(*value),
                object_is_name: matches!(self.kind(*value), NodeKind::Name(_)),
                attr,
            }),
            NodeKind::Keyword { arg, .. } => Some(Subject::Keyword(arg)),
            NodeKind::BoolOp { op, values } => Some(Subject::BoolOp {
                op: *op,
                operands: values
                    .iter()
                    .map(|&v| Operand {
                        text: self.text(v),
                        precedence: self.precedence(v),
                    })
                    .collect(),
            }),
            _ => None,
        }
    }

    /// Name bound by a `Name` node after identifier normalization.
    pub fn normalized_name(&self, id: NodeId) -> Option<String> {
        match &self.nodes[id].kind {
            NodeKind::Name(name) => Some(normalize_identifier(name)),
            _ => None,
        }
    }
}
