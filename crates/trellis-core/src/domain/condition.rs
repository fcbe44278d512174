//! Condition expression language: parsing and evaluation.
//!
//! The grammar embedded in `{{#if ...}}` markers is small and regular, so it
//! gets a hand-written recursive-descent parser rather than a general
//! templating dependency; that keeps "malformed input degrades gracefully"
//! easy to guarantee, because the parser reports a positioned
//! [`DomainError::MalformedExpression`] and never panics.
//!
//! ## Grammar
//!
//! ```text
//! expression := or
//! or         := and ( "||" and )*
//! and        := equality ( "&&" equality )*
//! equality   := unary ( ("==" | "!=") unary )*
//! unary      := "!" unary | primary
//! primary    := literal | path | "(" expression ")"
//! literal    := "true" | "false" | quoted string | number
//! path       := ident ( "." ident )*
//! ```
//!
//! ## Semantics
//!
//! - Paths resolve against the render context; a missing path is the
//!   *absent* value: falsy, equal to nothing (including another absent).
//! - Truthiness: non-empty string, non-zero number, `true`, non-empty map.
//! - `==` / `!=` compare like kinds only; mixed kinds are simply unequal.
//!
//! Evaluation of a parsed expression is total; every runtime oddity folds
//! into `false` rather than an error, so a broken variable never aborts a
//! whole generation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::error::DomainError;
use crate::domain::render::{ContextValue, RenderContext};

// ============================================================================
// AST
// ============================================================================

/// Parsed, immutable form of one conditional expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionExpr {
    Literal(Literal),
    /// Dotted variable path, e.g. `features.auth` → `["features", "auth"]`.
    Path(Vec<String>),
    Not(Box<ConditionExpr>),
    Binary {
        op: BinaryOp,
        lhs: Box<ConditionExpr>,
        rhs: Box<ConditionExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Path(Vec<String>),
    Str(String),
    Num(f64),
    Bool(bool),
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    BangEq,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn malformed(expression: &str, position: usize, reason: impl Into<String>) -> DomainError {
    DomainError::MalformedExpression {
        expression: expression.to_string(),
        position,
        reason: reason.into(),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn tokenize(input: &str) -> Result<Vec<Token>, DomainError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        match c {
            '(' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::LParen, position: pos });
            }
            ')' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::RParen, position: pos });
            }
            '&' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '&')) => {
                        chars.next();
                        tokens.push(Token { kind: TokenKind::AndAnd, position: pos });
                    }
                    _ => return Err(malformed(input, pos, "expected '&&'")),
                }
            }
            '|' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '|')) => {
                        chars.next();
                        tokens.push(Token { kind: TokenKind::OrOr, position: pos });
                    }
                    _ => return Err(malformed(input, pos, "expected '||'")),
                }
            }
            '=' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push(Token { kind: TokenKind::EqEq, position: pos });
                    }
                    _ => return Err(malformed(input, pos, "expected '=='")),
                }
            }
            '!' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push(Token { kind: TokenKind::BangEq, position: pos });
                    }
                    _ => tokens.push(Token { kind: TokenKind::Bang, position: pos }),
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                for (_, sc) in chars.by_ref() {
                    if sc == quote {
                        closed = true;
                        break;
                    }
                    value.push(sc);
                }
                if !closed {
                    return Err(malformed(input, pos, "unterminated string literal"));
                }
                tokens.push(Token { kind: TokenKind::Str(value), position: pos });
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                while let Some(&(_, nc)) = chars.peek() {
                    if nc.is_ascii_digit() || nc == '.' {
                        text.push(nc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = text
                    .parse()
                    .map_err(|_| malformed(input, pos, format!("invalid number '{text}'")))?;
                tokens.push(Token { kind: TokenKind::Num(value), position: pos });
            }
            c if is_ident_start(c) => {
                let mut segments = Vec::new();
                let mut segment = String::new();
                while let Some(&(_, nc)) = chars.peek() {
                    if is_ident_continue(nc) {
                        segment.push(nc);
                        chars.next();
                    } else if nc == '.' {
                        if segment.is_empty() {
                            return Err(malformed(input, pos, "empty path segment"));
                        }
                        segments.push(std::mem::take(&mut segment));
                        chars.next();
                    } else {
                        break;
                    }
                }
                if segment.is_empty() {
                    return Err(malformed(input, pos, "path ends with '.'"));
                }
                segments.push(segment);

                let kind = match (segments.len(), segments[0].as_str()) {
                    (1, "true") => TokenKind::Bool(true),
                    (1, "false") => TokenKind::Bool(false),
                    _ => TokenKind::Path(segments),
                };
                tokens.push(Token { kind, position: pos });
            }
            other => {
                return Err(malformed(input, pos, format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, DomainError> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            cursor: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn end_position(&self) -> usize {
        self.source.len()
    }

    fn parse(mut self) -> Result<ConditionExpr, DomainError> {
        if self.tokens.is_empty() {
            return Err(malformed(self.source, 0, "empty expression"));
        }
        let expr = self.parse_or()?;
        if let Some(extra) = self.peek() {
            return Err(malformed(
                self.source,
                extra.position,
                "unexpected trailing input",
            ));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<ConditionExpr, DomainError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::OrOr) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = ConditionExpr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<ConditionExpr, DomainError> {
        let mut lhs = self.parse_equality()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::AndAnd) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = ConditionExpr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<ConditionExpr, DomainError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::BangEq) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = ConditionExpr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ConditionExpr, DomainError> {
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Bang) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(ConditionExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ConditionExpr, DomainError> {
        let Some(token) = self.advance() else {
            return Err(malformed(
                self.source,
                self.end_position(),
                "unexpected end of expression",
            ));
        };

        match token.kind {
            TokenKind::Bool(b) => Ok(ConditionExpr::Literal(Literal::Bool(b))),
            TokenKind::Num(n) => Ok(ConditionExpr::Literal(Literal::Number(n))),
            TokenKind::Str(s) => Ok(ConditionExpr::Literal(Literal::String(s))),
            TokenKind::Path(segments) => Ok(ConditionExpr::Path(segments)),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(t) if t.kind == TokenKind::RParen => Ok(inner),
                    Some(t) => Err(malformed(self.source, t.position, "expected ')'")),
                    None => Err(malformed(self.source, self.end_position(), "expected ')'")),
                }
            }
            _ => Err(malformed(
                self.source,
                token.position,
                "expected a value, path, '!' or '('",
            )),
        }
    }
}

/// Parse one expression into its AST, without caching.
pub fn parse_expression(expression: &str) -> Result<ConditionExpr, DomainError> {
    Parser::new(expression)?.parse()
}

// ============================================================================
// Evaluation
// ============================================================================

/// A value during evaluation. `Absent` is the result of a missing path.
enum Value<'a> {
    Str(&'a str),
    Num(f64),
    Bool(bool),
    Map(&'a std::collections::BTreeMap<String, ContextValue>),
    Absent,
}

fn eval_value<'a>(expr: &'a ConditionExpr, ctx: &'a RenderContext) -> Value<'a> {
    match expr {
        ConditionExpr::Literal(Literal::String(s)) => Value::Str(s),
        ConditionExpr::Literal(Literal::Number(n)) => Value::Num(*n),
        ConditionExpr::Literal(Literal::Bool(b)) => Value::Bool(*b),
        ConditionExpr::Path(segments) => match ctx.lookup_segments(segments) {
            Some(ContextValue::String(s)) => Value::Str(s),
            Some(ContextValue::Number(n)) => Value::Num(*n),
            Some(ContextValue::Bool(b)) => Value::Bool(*b),
            Some(ContextValue::Map(m)) => Value::Map(m),
            None => Value::Absent,
        },
        ConditionExpr::Not(inner) => Value::Bool(!truthy(&eval_value(inner, ctx))),
        ConditionExpr::Binary { op, lhs, rhs } => match op {
            BinaryOp::And => {
                // Short-circuit: rhs untouched when lhs is falsy.
                let result = truthy(&eval_value(lhs, ctx)) && truthy(&eval_value(rhs, ctx));
                Value::Bool(result)
            }
            BinaryOp::Or => {
                let result = truthy(&eval_value(lhs, ctx)) || truthy(&eval_value(rhs, ctx));
                Value::Bool(result)
            }
            BinaryOp::Eq => Value::Bool(values_equal(
                &eval_value(lhs, ctx),
                &eval_value(rhs, ctx),
            )),
            BinaryOp::Ne => Value::Bool(!values_equal(
                &eval_value(lhs, ctx),
                &eval_value(rhs, ctx),
            )),
        },
    }
}

fn truthy(value: &Value<'_>) -> bool {
    match value {
        Value::Str(s) => !s.is_empty(),
        Value::Num(n) => *n != 0.0,
        Value::Bool(b) => *b,
        Value::Map(m) => !m.is_empty(),
        Value::Absent => false,
    }
}

fn values_equal(lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Num(a), Value::Num(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Map(a), Value::Map(b)) => a == b,
        // The absent value equals nothing, not even another absent value.
        _ => false,
    }
}

/// Evaluate an already-parsed expression. Total: never fails.
pub fn evaluate_parsed(expr: &ConditionExpr, ctx: &RenderContext) -> bool {
    truthy(&eval_value(expr, ctx))
}

// ============================================================================
// Memoization
// ============================================================================

/// Memo table mapping expression literal text to its parsed AST.
///
/// Templates repeat the same handful of conditions across many files, so the
/// renderer parses each distinct expression once per cache. Parse failures
/// are not cached: they are rare, cheap to reproduce, and keeping them out
/// keeps the table small.
///
/// The mutex guards only lookup/insert; the ASTs themselves are shared via
/// `Arc` and immutable once built, so concurrent renders never contend on
/// anything but the brief map access.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    inner: Mutex<HashMap<String, Arc<ConditionExpr>>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an expression, reusing the cached AST when the literal text was
    /// seen before.
    pub fn parse(&self, expression: &str) -> Result<Arc<ConditionExpr>, DomainError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(cached) = inner.get(expression) {
            return Ok(Arc::clone(cached));
        }

        let parsed = Arc::new(parse_expression(expression)?);
        inner.insert(expression.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Parses (with memoization) and evaluates boolean expressions against a
/// render context.
#[derive(Debug, Default)]
pub struct ConditionEvaluator {
    cache: ExpressionCache,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate an expression against a context.
    ///
    /// # Errors
    ///
    /// `MalformedExpression` if the text does not parse. Evaluation itself
    /// is total: missing paths are falsy, mixed-kind comparisons are unequal.
    pub fn evaluate(&self, expression: &str, ctx: &RenderContext) -> Result<bool, DomainError> {
        let parsed = self.cache.parse(expression)?;
        Ok(evaluate_parsed(&parsed, ctx))
    }

    /// Number of distinct expressions parsed so far.
    pub fn cached_expressions(&self) -> usize {
        self.cache.len()
    }
}
