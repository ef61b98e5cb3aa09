//! Recursive-descent parser producing the predicate AST.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! predicate   := "function" IDENT? "(" IDENT ")" block
//!              | IDENT "=>" body | "(" IDENT ")" "=>" body
//!              | expr                      (parameter is `value`)
//! body        := block | expr
//! block       := "{" "return" expr ";"? "}"
//! expr        := or ("?" expr ":" expr)?
//! or          := and ("||" and)*
//! and         := equality ("&&" equality)*
//! equality    := relational (("==" | "!=" | "===" | "!==") relational)*
//! relational  := additive (("<" | "<=" | ">" | ">=" | "in") additive)*
//! additive    := term (("+" | "-") term)*
//! term        := unary (("*" | "/" | "%") unary)*
//! unary       := ("!" | "-" | "+" | "typeof") unary | postfix
//! postfix     := primary ("." IDENT | "[" expr "]" | "(" args ")")*
//! ```

use super::lexer::{Token, TokenKind};
use super::PredicateError;

/// Maximum nesting depth accepted by the parser.
pub const MAX_DEPTH: usize = 64;

/// Parameter name bound when the source is a bare expression.
pub const IMPLICIT_PARAM: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    LooseEq,
    LooseNotEq,
    StrictEq,
    StrictNotEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Predicate expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Array(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Arrow {
        param: String,
        body: Box<Expr>,
    },
}

/// A parsed single-parameter predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateAst {
    pub param: String,
    pub body: Expr,
}

/// Parser over a token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

const RESERVED: &[&str] = &[
    "function",
    "return",
    "typeof",
    "in",
    "true",
    "false",
    "null",
    "undefined",
];

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse a complete predicate definition.
    pub fn parse_predicate(&mut self) -> Result<PredicateAst, PredicateError> {
        let ast = if self.check_ident("function") {
            self.advance();
            if matches!(self.peek(), TokenKind::Ident(_)) {
                self.advance();
            }
            self.expect(TokenKind::LParen)?;
            let param = self.expect_binding()?;
            self.expect(TokenKind::RParen)?;
            let body = self.parse_block()?;
            PredicateAst { param, body }
        } else if let Some(param) = self.try_arrow_header()? {
            let body = self.parse_arrow_body()?;
            PredicateAst { param, body }
        } else {
            PredicateAst {
                param: IMPLICIT_PARAM.to_string(),
                body: self.parse_expr()?,
            }
        };

        if self.peek() == &TokenKind::Semicolon {
            self.advance();
        }
        if self.peek() != &TokenKind::Eof {
            return Err(self.unexpected("end of input"));
        }
        Ok(ast)
    }

    // ==================== Token helpers ====================

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        let idx = (self.pos + ahead).min(self.tokens.len().saturating_sub(1));
        self.tokens
            .get(idx)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.offset).unwrap_or(0)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(s) if s == name)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), PredicateError> {
        if self.peek() == &kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_binding(&mut self) -> Result<String, PredicateError> {
        match self.peek().clone() {
            TokenKind::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("parameter name")),
        }
    }

    fn unexpected(&self, expected: &str) -> PredicateError {
        PredicateError::parse(
            self.offset(),
            format!("expected {}, found {}", expected, self.peek()),
        )
    }

    fn enter(&mut self) -> Result<(), PredicateError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(PredicateError::parse(
                self.offset(),
                format!("nesting deeper than {}", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Undo `count` calls to `enter` made while wrapping a left operand.
    fn release(&mut self, count: usize) {
        self.depth = self.depth.saturating_sub(count);
    }

    // ==================== Arrow functions ====================

    /// Consume `x =>` or `(x) =>` if present, returning the parameter.
    fn try_arrow_header(&mut self) -> Result<Option<String>, PredicateError> {
        match (self.peek_at(0), self.peek_at(1), self.peek_at(2), self.peek_at(3)) {
            (TokenKind::Ident(name), TokenKind::Arrow, _, _)
                if !RESERVED.contains(&name.as_str()) =>
            {
                let param = name.clone();
                self.pos += 2;
                Ok(Some(param))
            }
            (TokenKind::LParen, TokenKind::Ident(name), TokenKind::RParen, TokenKind::Arrow)
                if !RESERVED.contains(&name.as_str()) =>
            {
                let param = name.clone();
                self.pos += 4;
                Ok(Some(param))
            }
            _ => Ok(None),
        }
    }

    fn parse_arrow_body(&mut self) -> Result<Expr, PredicateError> {
        if self.peek() == &TokenKind::LBrace {
            self.parse_block()
        } else {
            self.parse_expr()
        }
    }

    fn parse_block(&mut self) -> Result<Expr, PredicateError> {
        self.expect(TokenKind::LBrace)?;
        if !self.check_ident("return") {
            return Err(self.unexpected("'return'"));
        }
        self.advance();
        let expr = self.parse_expr()?;
        if self.peek() == &TokenKind::Semicolon {
            self.advance();
        }
        self.expect(TokenKind::RBrace)?;
        Ok(expr)
    }

    // ==================== Expressions ====================

    pub fn parse_expr(&mut self) -> Result<Expr, PredicateError> {
        self.enter()?;
        let test = self.parse_or()?;
        let result = if self.peek() == &TokenKind::Question {
            self.advance();
            let consequent = self.parse_expr()?;
            self.expect(TokenKind::Colon)?;
            let alternate = self.parse_expr()?;
            Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }
        } else {
            test
        };
        self.leave();
        Ok(result)
    }

    fn parse_or(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_and()?;
        let mut wraps = 0;
        while self.peek() == &TokenKind::OrOr {
            self.advance();
            self.enter()?;
            wraps += 1;
            let right = self.parse_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.release(wraps);
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_equality()?;
        let mut wraps = 0;
        while self.peek() == &TokenKind::AndAnd {
            self.advance();
            self.enter()?;
            wraps += 1;
            let right = self.parse_equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.release(wraps);
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_relational()?;
        let mut wraps = 0;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinaryOp::LooseEq,
                TokenKind::NotEq => BinaryOp::LooseNotEq,
                TokenKind::StrictEq => BinaryOp::StrictEq,
                TokenKind::StrictNotEq => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance();
            self.enter()?;
            wraps += 1;
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
        self.release(wraps);
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_additive()?;
        let mut wraps = 0;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                TokenKind::Ident(s) if s == "in" => BinaryOp::In,
                _ => break,
            };
            self.advance();
            self.enter()?;
            wraps += 1;
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        self.release(wraps);
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_term()?;
        let mut wraps = 0;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.enter()?;
            wraps += 1;
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
        self.release(wraps);
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_unary()?;
        let mut wraps = 0;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            self.enter()?;
            wraps += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        self.release(wraps);
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, PredicateError> {
        let op = match self.peek() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Ident(s) if s == "typeof" => Some(UnaryOp::Typeof),
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                self.enter()?;
                let operand = self.parse_unary()?;
                self.leave();
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, PredicateError> {
        let mut expr = self.parse_primary()?;
        let mut wraps = 0;
        loop {
            if matches!(
                self.peek(),
                TokenKind::Dot | TokenKind::LBracket | TokenKind::LParen
            ) {
                self.enter()?;
                wraps += 1;
            }
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    match self.advance() {
                        TokenKind::Ident(property) => {
                            expr = Expr::Member {
                                object: Box::new(expr),
                                property,
                            };
                        }
                        _ => return Err(self.unexpected("property name")),
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }
        self.release(wraps);
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, PredicateError> {
        let mut args = Vec::new();
        if self.peek() == &TokenKind::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_argument()?);
            match self.advance() {
                TokenKind::Comma => continue,
                TokenKind::RParen => break,
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
        Ok(args)
    }

    fn parse_argument(&mut self) -> Result<Expr, PredicateError> {
        if let Some(param) = self.try_arrow_header()? {
            self.enter()?;
            let body = self.parse_arrow_body()?;
            self.leave();
            return Ok(Expr::Arrow {
                param,
                body: Box::new(body),
            });
        }
        self.parse_expr()
    }

    fn parse_primary(&mut self) -> Result<Expr, PredicateError> {
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::Ident(name) => {
                let expr = match name.as_str() {
                    "true" => Expr::Bool(true),
                    "false" => Expr::Bool(false),
                    "null" => Expr::Null,
                    "undefined" => Expr::Undefined,
                    "function" | "return" | "in" | "typeof" => {
                        return Err(self.unexpected("expression"))
                    }
                    _ => Expr::Ident(name),
                };
                self.advance();
                Ok(expr)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if self.peek() == &TokenKind::RBracket {
                    self.advance();
                    return Ok(Expr::Array(items));
                }
                loop {
                    items.push(self.parse_expr()?);
                    match self.advance() {
                        TokenKind::Comma => continue,
                        TokenKind::RBracket => break,
                        _ => return Err(self.unexpected("',' or ']'")),
                    }
                }
                Ok(Expr::Array(items))
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::lexer::Lexer;

    fn parse(src: &str) -> Result<PredicateAst, PredicateError> {
        let tokens = Lexer::new(src).tokenize()?;
        Parser::new(tokens).parse_predicate()
    }

    #[test]
    fn test_arrow_forms_bind_parameter() {
        assert_eq!(parse("x => x > 1").unwrap().param, "x");
        assert_eq!(parse("(n) => n > 1").unwrap().param, "n");
        assert_eq!(parse("(v) => { return v > 1; }").unwrap().param, "v");
        assert_eq!(
            parse("function isBig(y) { return y > 1 }").unwrap().param,
            "y"
        );
        assert_eq!(parse("value > 1").unwrap().param, IMPLICIT_PARAM);
    }

    #[test]
    fn test_precedence() {
        let ast = parse("x => x % 2 === 0 && x > 100").unwrap();
        match ast.body {
            Expr::Logical { op, left, .. } => {
                assert_eq!(op, LogicalOp::And);
                assert!(matches!(
                    *left,
                    Expr::Binary {
                        op: BinaryOp::StrictEq,
                        ..
                    }
                ));
            }
            other => panic!("expected logical and, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_arrow_argument() {
        let ast = parse("xs => xs.every(x => typeof x === 'number')").unwrap();
        match ast.body {
            Expr::Call { args, .. } => {
                assert!(matches!(args[0], Expr::Arrow { .. }));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_trailing_tokens_and_statements() {
        assert!(parse("x => x > 1 x").is_err());
        assert!(parse("x => { if (x) return true; }").is_err());
        assert!(parse("x =>").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("x => {}x{}", "(".repeat(100), ")".repeat(100));
        assert!(parse(&deep).is_err());
        let fine = format!("x => {}x{}", "(".repeat(10), ")".repeat(10));
        assert!(parse(&fine).is_ok());
    }

    #[test]
    fn test_long_operator_and_postfix_chains_are_bounded() {
        for op in [" + x", " * x", " && x", " || x", " === x", " < x"] {
            let long = format!("x => x{}", op.repeat(1000));
            assert!(parse(&long).is_err(), "unbounded chain accepted for {:?}", op);
        }
        assert!(parse(&format!("x => x{}", ".a".repeat(1000))).is_err());
        assert!(parse(&format!("x => x{}", "[0]".repeat(1000))).is_err());
        assert!(parse(&format!("x => f{}", "()".repeat(1000))).is_err());

        // Short chains still parse.
        assert!(parse(&format!("x => x{}", " + x".repeat(20))).is_ok());
        assert!(parse("o => o.a.b.c[0].length > 0 && o.a.b.c.length < 9").is_ok());
    }
}
