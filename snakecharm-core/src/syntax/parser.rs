//! Recursive-descent parser for Python expressions.
//!
//! Grammar levels follow the Python reference, weakest binding first:
//! conditional, `or`, `and`, `not`, comparison, `|`, `^`, `&`, shifts,
//! additive, multiplicative, unary, power, primary.

use log::trace;
use std::collections::HashMap;

use crate::errors::ParseError;
use crate::syntax::lexer::{Lexer, Token, TokenKind};
use crate::syntax::literal::is_keyword;
use crate::syntax::{
    BinOperator, BoolOperator, CmpOperator, ConstantKind, NodeId, NodeKind, Span, SyntaxNode, SyntaxTree,
    UnaryOperator,
};

/// Parses a snippet of one or more expression statements.
///
/// The root is always a `Module` node.
pub fn parse_snippet(source: &str) -> Result<SyntaxTree, ParseError> {
    let mut parser = Parser::new(source)?;
    let root = parser.module()?;
    trace!("parsed snippet into {} nodes", parser.nodes.len());
    Ok(SyntaxTree::new(source.to_string(), parser.nodes, root))
}

/// Parses exactly one expression; the root is the expression itself.
pub fn parse_expression(source: &str) -> Result<SyntaxTree, ParseError> {
    let mut parser = Parser::new(source)?;
    parser.skip_newlines();
    let root = parser.expr_list()?;
    parser.skip_newlines();
    parser.expect_eof()?;
    Ok(SyntaxTree::new(source.to_string(), parser.nodes, root))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nodes: Vec<SyntaxNode>,
    /// Outer span of nodes written inside parentheses, parens included.
    grouped: HashMap<NodeId, Span>,
    source_len: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: Lexer::new(source).tokenize()?,
            pos: 0,
            nodes: Vec::new(),
            grouped: HashMap::new(),
            source_len: source.len(),
        })
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Op(o) if *o == op)
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Name(n) if n == word)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<Token, ParseError> {
        if self.at_op(op) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected '{op}'")))
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        match self.peek().kind {
            TokenKind::Eof => Ok(()),
            _ => Err(self.error("unexpected trailing input")),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::Name(n) => format!("'{n}'"),
            TokenKind::Op(o) => format!("'{o}'"),
            _ => "literal".to_string(),
        };
        ParseError::new(format!("{}, found {found}", message.into()), token.start.min(self.source_len))
    }

    fn push(&mut self, kind: NodeKind, start: usize, end: usize) -> NodeId {
        self.nodes.push(SyntaxNode { kind, span: Span { start, end } });
        self.nodes.len() - 1
    }

    /// The span a parent covers when it contains `id`: parentheses around
    /// `id` belong to the parent's text.
    fn span(&self, id: NodeId) -> Span {
        self.grouped.get(&id).copied().unwrap_or(self.nodes[id].span)
    }

    fn prev_end(&self) -> usize {
        self.pos.checked_sub(1).map_or(0, |p| self.tokens[p].end)
    }

    fn module(&mut self) -> Result<NodeId, ParseError> {
        self.skip_newlines();
        if matches!(self.peek().kind, TokenKind::Eof) {
            return Err(self.error("empty snippet"));
        }

        let mut body = Vec::new();
        let mut separator = None;
        loop {
            body.push(self.expr_list()?);
            match self.peek().kind.clone() {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    separator.get_or_insert('\n');
                    self.skip_newlines();
                }
                TokenKind::Op(";") => {
                    separator.get_or_insert(';');
                    self.bump();
                    self.skip_newlines();
                }
                TokenKind::Op("=") => return Err(self.error("assignments are not supported")),
                _ => return Err(self.error("expected end of statement")),
            }
            if matches!(self.peek().kind, TokenKind::Eof) {
                break;
            }
        }

        let start = self.span(body[0]).start;
        let end = self.span(body[body.len() - 1]).end;
        Ok(self.push(
            NodeKind::Module {
                body,
                separator: separator.unwrap_or('\n'),
            },
            start,
            end,
        ))
    }

    /// `test (',' test)* [',']`, a bare tuple when a comma appears.
    fn expr_list(&mut self) -> Result<NodeId, ParseError> {
        let first = self.test()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.starts_expression() {
                elts.push(self.test()?);
            } else {
                break;
            }
        }
        let start = self.span(first).start;
        let end = self.prev_end();
        Ok(self.push(NodeKind::Tuple(elts), start, end))
    }

    fn starts_expression(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Name(n) => !is_keyword(n) || matches!(n.as_str(), "True" | "False" | "None" | "not" | "lambda"),
            TokenKind::Int(_) | TokenKind::BigInt | TokenKind::Float | TokenKind::Str(_) | TokenKind::Bytes(_) => true,
            TokenKind::Op(o) => matches!(*o, "(" | "[" | "{" | "-" | "+" | "~" | "..." | "*"),
            _ => false,
        }
    }

    fn test(&mut self) -> Result<NodeId, ParseError> {
        if self.at_word("lambda") {
            return Err(self.error("lambda expressions are not supported"));
        }
        let body = self.or_test()?;
        if !self.eat_word("if") {
            return Ok(body);
        }
        let test = self.or_test()?;
        if !self.eat_word("else") {
            return Err(self.error("expected 'else' in conditional expression"));
        }
        let orelse = self.test()?;
        let start = self.span(body).start;
        let end = self.span(orelse).end;
        Ok(self.push(NodeKind::IfExp { test, body, orelse }, start, end))
    }

    fn or_test(&mut self) -> Result<NodeId, ParseError> {
        self.bool_chain(BoolOperator::Or)
    }

    fn bool_chain(&mut self, op: BoolOperator) -> Result<NodeId, ParseError> {
        let operand = |p: &mut Self| match op {
            BoolOperator::Or => p.bool_chain(BoolOperator::And),
            BoolOperator::And => p.not_test(),
        };
        let first = operand(self)?;
        let mut values = vec![first];
        while self.eat_word(op.keyword()) {
            values.push(operand(self)?);
        }
        if values.len() == 1 {
            return Ok(first);
        }
        let start = self.span(first).start;
        let end = self.span(values[values.len() - 1]).end;
        Ok(self.push(NodeKind::BoolOp { op, values }, start, end))
    }

    fn not_test(&mut self) -> Result<NodeId, ParseError> {
        if self.at_word("not") {
            let start = self.bump().start;
            let operand = self.not_test()?;
            let end = self.span(operand).end;
            return Ok(self.push(NodeKind::UnaryOp { op: UnaryOperator::Not, operand }, start, end));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<NodeId, ParseError> {
        let left = self.binary_level(0)?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some((op, width)) = self.comparison_operator() {
            self.pos += width;
            ops.push(op);
            comparators.push(self.binary_level(0)?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        let start = self.span(left).start;
        let end = self.span(comparators[comparators.len() - 1]).end;
        Ok(self.push(NodeKind::Compare { left, ops, comparators }, start, end))
    }

    /// The comparison operator at the cursor and how many tokens it spans.
    fn comparison_operator(&self) -> Option<(CmpOperator, usize)> {
        let next_is = |word: &str| matches!(self.peek_kind_at(1), Some(TokenKind::Name(n)) if n == word);
        let op = match &self.peek().kind {
            TokenKind::Op("==") => (CmpOperator::Eq, 1),
            TokenKind::Op("!=") => (CmpOperator::NotEq, 1),
            TokenKind::Op("<") => (CmpOperator::Lt, 1),
            TokenKind::Op("<=") => (CmpOperator::LtE, 1),
            TokenKind::Op(">") => (CmpOperator::Gt, 1),
            TokenKind::Op(">=") => (CmpOperator::GtE, 1),
            TokenKind::Name(n) if n == "in" => (CmpOperator::In, 1),
            TokenKind::Name(n) if n == "is" && next_is("not") => (CmpOperator::IsNot, 2),
            TokenKind::Name(n) if n == "is" => (CmpOperator::Is, 1),
            TokenKind::Name(n) if n == "not" && next_is("in") => (CmpOperator::NotIn, 2),
            _ => return None,
        };
        Some(op)
    }

    /// Left-associative binary levels from `|` down to the multiplicative operators.
    fn binary_level(&mut self, level: usize) -> Result<NodeId, ParseError> {
        const LEVELS: &[&[(&str, BinOperator)]] = &[
            &[("|", BinOperator::BitOr)],
            &[("^", BinOperator::BitXor)],
            &[("&", BinOperator::BitAnd)],
            &[("<<", BinOperator::LShift), (">>", BinOperator::RShift)],
            &[("+", BinOperator::Add), ("-", BinOperator::Sub)],
            &[
                ("*", BinOperator::Mult),
                ("@", BinOperator::MatMult),
                ("/", BinOperator::Div),
                ("//", BinOperator::FloorDiv),
                ("%", BinOperator::Mod),
            ],
        ];

        let next = |p: &mut Self| {
            if level + 1 < LEVELS.len() {
                p.binary_level(level + 1)
            } else {
                p.factor()
            }
        };

        let mut left = next(self)?;
        loop {
            let found = LEVELS[level].iter().find(|(sym, _)| self.at_op(sym)).map(|&(_, op)| op);
            let Some(op) = found else { break };
            self.bump();
            let right = next(self)?;
            let start = self.span(left).start;
            let end = self.span(right).end;
            left = self.push(NodeKind::BinOp { left, op, right }, start, end);
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<NodeId, ParseError> {
        let op = match self.peek().kind.clone() {
            TokenKind::Op("-") => UnaryOperator::Neg,
            TokenKind::Op("+") => UnaryOperator::Pos,
            TokenKind::Op("~") => UnaryOperator::Invert,
            _ => return self.power(),
        };
        let start = self.bump().start;
        let operand_token_is_int = matches!(self.peek().kind, TokenKind::Int(_));
        let operand = self.factor()?;
        let end = self.span(operand).end;

        // `-<int literal>` is one negative literal.
        if op == UnaryOperator::Neg && operand_token_is_int {
            if let NodeKind::Int(v) = self.nodes[operand].kind {
                if v >= 0 {
                    self.nodes[operand] = SyntaxNode {
                        kind: NodeKind::Int(-v),
                        span: Span { start, end },
                    };
                    return Ok(operand);
                }
            }
        }
        Ok(self.push(NodeKind::UnaryOp { op, operand }, start, end))
    }

    fn power(&mut self) -> Result<NodeId, ParseError> {
        let base = self.primary()?;
        if !self.eat_op("**") {
            return Ok(base);
        }
        let exponent = self.factor()?;
        let start = self.span(base).start;
        let end = self.span(exponent).end;
        Ok(self.push(
            NodeKind::BinOp {
                left: base,
                op: BinOperator::Pow,
                right: exponent,
            },
            start,
            end,
        ))
    }

    fn primary(&mut self) -> Result<NodeId, ParseError> {
        let mut node = self.atom()?;
        loop {
            let start = self.span(node).start;
            if self.eat_op(".") {
                let attr = match self.bump() {
                    Token { kind: TokenKind::Name(n), .. } if !is_keyword(&n) => n,
                    _ => return Err(self.error("expected attribute name")),
                };
                let end = self.prev_end();
                node = self.push(NodeKind::Attribute { value: node, attr }, start, end);
            } else if self.eat_op("(") {
                let args = self.call_arguments()?;
                let end = self.expect_op(")")?.end;
                node = self.push(NodeKind::Call { func: node, args }, start, end);
            } else if self.eat_op("[") {
                let slice = self.subscript()?;
                let end = self.expect_op("]")?.end;
                node = self.push(NodeKind::Subscript { value: node, slice }, start, end);
            } else {
                return Ok(node);
            }
        }
    }

    fn call_arguments(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut args = Vec::new();
        while !self.at_op(")") {
            let start = self.peek().start;
            let arg = if self.eat_op("**") || self.eat_op("*") {
                let double = self.tokens[self.pos - 1].kind == TokenKind::Op("**");
                let value = self.test()?;
                let end = self.span(value).end;
                self.push(NodeKind::Starred { value, double }, start, end)
            } else if let Some(arg) = self.keyword_argument_name() {
                self.pos += 2;
                let value = self.test()?;
                let end = self.span(value).end;
                self.push(NodeKind::Keyword { arg, value }, start, end)
            } else {
                self.test()?
            };
            args.push(arg);
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(args)
    }

    fn keyword_argument_name(&self) -> Option<String> {
        match (&self.peek().kind, self.peek_kind_at(1)) {
            (TokenKind::Name(n), Some(TokenKind::Op("="))) if !is_keyword(n) => Some(n.clone()),
            _ => None,
        }
    }

    fn subscript(&mut self) -> Result<NodeId, ParseError> {
        let first = self.slice_item()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            elts.push(self.slice_item()?);
        }
        let start = self.span(first).start;
        let end = self.prev_end();
        Ok(self.push(NodeKind::Tuple(elts), start, end))
    }

    fn slice_item(&mut self) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        let lower = if self.at_op(":") { None } else { Some(self.test()?) };
        if !self.eat_op(":") {
            return lower.ok_or_else(|| self.error("expected subscript"));
        }
        let bound = |p: &mut Self| -> Result<Option<NodeId>, ParseError> {
            if p.at_op(":") || p.at_op("]") || p.at_op(",") {
                Ok(None)
            } else {
                p.test().map(Some)
            }
        };
        let upper = bound(self)?;
        let step = if self.eat_op(":") { bound(self)? } else { None };
        let end = self.prev_end();
        Ok(self.push(NodeKind::Slice { lower, upper, step }, start, end))
    }

    fn atom(&mut self) -> Result<NodeId, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Name(name) => {
                let kind = match name.as_str() {
                    "True" => NodeKind::Constant(ConstantKind::True),
                    "False" => NodeKind::Constant(ConstantKind::False),
                    "None" => NodeKind::Constant(ConstantKind::None),
                    word if is_keyword(word) => return Err(self.error("unexpected keyword")),
                    _ => NodeKind::Name(name),
                };
                self.bump();
                Ok(self.push(kind, token.start, token.end))
            }
            TokenKind::Int(v) => {
                self.bump();
                Ok(self.push(NodeKind::Int(v), token.start, token.end))
            }
            TokenKind::BigInt => {
                self.bump();
                Ok(self.push(NodeKind::BigInt, token.start, token.end))
            }
            TokenKind::Float => {
                self.bump();
                Ok(self.push(NodeKind::Float, token.start, token.end))
            }
            TokenKind::Str(_) | TokenKind::Bytes(_) => self.string_atom(),
            TokenKind::Op("...") => {
                self.bump();
                Ok(self.push(NodeKind::Constant(ConstantKind::Ellipsis), token.start, token.end))
            }
            TokenKind::Op("(") => self.paren_atom(),
            TokenKind::Op("[") => {
                self.bump();
                let elts = self.sequence_items("]")?;
                let end = self.expect_op("]")?.end;
                Ok(self.push(NodeKind::List(elts), token.start, end))
            }
            TokenKind::Op("{") => self.brace_atom(),
            _ => Err(self.error("expected expression")),
        }
    }

    /// Adjacent string literals concatenate into one node.
    fn string_atom(&mut self) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        let mut text = String::new();
        let mut bytes: Vec<u8> = Vec::new();
        let mut is_bytes = None;
        let mut end = start;
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Str(s) => {
                    if *is_bytes.get_or_insert(false) {
                        return Err(self.error("cannot mix bytes and nonbytes literals"));
                    }
                    text.push_str(&s);
                }
                TokenKind::Bytes(b) => {
                    if !*is_bytes.get_or_insert(true) {
                        return Err(self.error("cannot mix bytes and nonbytes literals"));
                    }
                    bytes.extend_from_slice(&b);
                }
                _ => break,
            }
            end = token.end;
            self.bump();
        }
        let kind = if is_bytes == Some(true) {
            NodeKind::Bytes(bytes)
        } else {
            NodeKind::Str(text)
        };
        Ok(self.push(kind, start, end))
    }

    fn paren_atom(&mut self) -> Result<NodeId, ParseError> {
        let open = self.bump();
        if self.at_op(")") {
            let end = self.bump().end;
            return Ok(self.push(NodeKind::Tuple(Vec::new()), open.start, end));
        }
        let first = self.display_item()?;
        if self.at_op(")") {
            if matches!(self.nodes[first].kind, NodeKind::Starred { .. }) {
                return Err(self.error("starred expression outside a tuple"));
            }
            let end = self.bump().end;
            self.grouped.insert(first, Span { start: open.start, end });
            return Ok(first);
        }
        if !self.at_op(",") {
            return Err(self.error("expected ')'"));
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op(")") {
                break;
            }
            elts.push(self.display_item()?);
        }
        let end = self.expect_op(")")?.end;
        Ok(self.push(NodeKind::Tuple(elts), open.start, end))
    }

    fn brace_atom(&mut self) -> Result<NodeId, ParseError> {
        let open = self.bump();
        if self.at_op("}") {
            let end = self.bump().end;
            return Ok(self.push(NodeKind::Dict(Vec::new()), open.start, end));
        }
        let first = self.display_item()?;
        let first_is_starred = matches!(self.nodes[first].kind, NodeKind::Starred { .. });
        if !first_is_starred && self.eat_op(":") {
            let mut entries = vec![(first, self.test()?)];
            while self.eat_op(",") {
                if self.at_op("}") {
                    break;
                }
                let key = self.test()?;
                self.expect_op(":")?;
                entries.push((key, self.test()?));
            }
            let end = self.expect_op("}")?.end;
            return Ok(self.push(NodeKind::Dict(entries), open.start, end));
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            elts.push(self.display_item()?);
        }
        let end = self.expect_op("}")?.end;
        Ok(self.push(NodeKind::Set(elts), open.start, end))
    }

    /// A display element: an expression or `*` over a bitwise-or operand.
    fn display_item(&mut self) -> Result<NodeId, ParseError> {
        if !self.at_op("*") {
            return self.test();
        }
        let start = self.bump().start;
        let value = self.binary_level(0)?;
        let end = self.span(value).end;
        Ok(self.push(NodeKind::Starred { value, double: false }, start, end))
    }

    fn sequence_items(&mut self, close: &str) -> Result<Vec<NodeId>, ParseError> {
        let mut elts = Vec::new();
        while !self.at_op(close) {
            elts.push(self.display_item()?);
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(elts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_kind(src: &str) -> NodeKind {
        let tree = parse_expression(src).unwrap();
        tree.kind(tree.root()).clone()
    }

    #[test]
    fn snippet_root_is_module() {
        let tree = parse_snippet("1; 2").unwrap();
        match tree.kind(tree.root()) {
            NodeKind::Module { body, separator } => {
                assert_eq!(body.len(), 2);
                assert_eq!(*separator, ';');
            }
            other => panic!("unexpected root {other:?}"),
        }
    }

    #[test]
    fn negative_literal_is_folded() {
        let tree = parse_expression("-1").unwrap();
        assert_eq!(tree.kind(tree.root()), &NodeKind::Int(-1));
        assert_eq!(tree.text(tree.root()), "-1");
        assert!(matches!(root_kind("-(1)"), NodeKind::UnaryOp { .. }));
        assert!(matches!(root_kind("-x"), NodeKind::UnaryOp { .. }));
    }

    #[test]
    fn power_binds_tighter_than_unary_minus() {
        let tree = parse_expression("-2**2").unwrap();
        assert!(matches!(tree.kind(tree.root()), NodeKind::UnaryOp { op: UnaryOperator::Neg, .. }));
    }

    #[test]
    fn call_with_keywords_and_attributes() {
        let tree = parse_expression("__import__('os').popen('whoami').read()").unwrap();
        let NodeKind::Call { func, args } = tree.kind(tree.root()) else {
            panic!("expected call");
        };
        assert!(args.is_empty());
        assert!(matches!(tree.kind(*func), NodeKind::Attribute { attr, .. } if attr == "read"));

        let tree = parse_expression("dict(abc=1)").unwrap();
        let NodeKind::Call { args, .. } = tree.kind(tree.root()) else {
            panic!("expected call");
        };
        assert!(matches!(tree.kind(args[0]), NodeKind::Keyword { arg, .. } if arg == "abc"));
        assert_eq!(tree.text(args[0]), "abc=1");
    }

    #[test]
    fn boolean_chains_are_flattened() {
        let NodeKind::BoolOp { op, values } = root_kind("a and b and c") else {
            panic!("expected boolop");
        };
        assert_eq!(op, BoolOperator::And);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn parenthesized_groups_belong_to_the_parent_text() {
        let tree = parse_snippet("(2 or 3) and 1").unwrap();
        assert_eq!(tree.text(tree.root()), "(2 or 3) and 1");
        let tree = parse_snippet("1*(2+3)").unwrap();
        assert_eq!(tree.text(tree.root()), "1*(2+3)");

        let tree = parse_expression("1 and ((2 or 3))").unwrap();
        assert_eq!(tree.text(tree.root()), "1 and ((2 or 3))");
        let NodeKind::BoolOp { values, .. } = tree.kind(tree.root()) else {
            panic!("expected boolop");
        };
        assert_eq!(tree.text(values[1]), "2 or 3");

        let tree = parse_expression("(a).b").unwrap();
        assert_eq!(tree.text(tree.root()), "(a).b");
    }

    #[test]
    fn conditional_expression() {
        let tree = parse_expression("'yes' if 1 and (2 or 3) or 2 and 3 else 'no'").unwrap();
        let NodeKind::IfExp { test, .. } = tree.kind(tree.root()) else {
            panic!("expected conditional");
        };
        assert!(matches!(tree.kind(*test), NodeKind::BoolOp { op: BoolOperator::Or, .. }));
    }

    #[test]
    fn slices_and_implicit_concatenation() {
        let tree = parse_expression("'ab' 'c'[::-1]").unwrap();
        let NodeKind::Subscript { value, slice } = tree.kind(tree.root()) else {
            panic!("expected subscript");
        };
        assert_eq!(tree.kind(*value), &NodeKind::Str("abc".into()));
        assert!(matches!(tree.kind(*slice), NodeKind::Slice { lower: None, upper: None, step: Some(_) }));
    }

    #[test]
    fn containers() {
        assert!(matches!(root_kind("()"), NodeKind::Tuple(v) if v.is_empty()));
        assert!(matches!(root_kind("(1,)"), NodeKind::Tuple(v) if v.len() == 1));
        assert!(matches!(root_kind("[1, 2]"), NodeKind::List(v) if v.len() == 2));
        assert!(matches!(root_kind("{1: 2}"), NodeKind::Dict(v) if v.len() == 1));
        assert!(matches!(root_kind("{1}"), NodeKind::Set(v) if v.len() == 1));
    }

    #[test]
    fn starred_display_elements() {
        let NodeKind::List(elts) = root_kind("[*a, 1]") else {
            panic!("expected list");
        };
        assert_eq!(elts.len(), 2);
        assert!(matches!(root_kind("{*a}"), NodeKind::Set(v) if v.len() == 1));
        assert!(matches!(root_kind("(*a, *b)"), NodeKind::Tuple(v) if v.len() == 2));
        assert!(parse_expression("(*a)").is_err());
        assert!(parse_expression("[*a if b else c]").is_err());
    }

    #[test]
    fn comparisons() {
        let NodeKind::Compare { ops, .. } = root_kind("a not in b is not c < d") else {
            panic!("expected compare");
        };
        assert_eq!(ops, vec![CmpOperator::NotIn, CmpOperator::IsNot, CmpOperator::Lt]);
    }

    #[test]
    fn invalid_syntax_is_rejected() {
        assert!(parse_snippet("print((1)").is_err());
        assert!(parse_snippet("").is_err());
        assert!(parse_snippet("x = 1").is_err());
        assert!(parse_snippet("lambda: 1").is_err());
        assert!(parse_snippet("a.for").is_err());
        assert!(parse_expression("1 2").is_err());
    }
}
