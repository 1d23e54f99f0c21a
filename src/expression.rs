//! Unit conversion expressions.
//!
//! TI exports carry a per-field formula such as `x/2` or `(x-2731)*10` that
//! maps the human value `x` into the value the chip stores. Expressions are
//! parsed into a small syntax tree and evaluated in `f64`; nothing in the
//! input is ever executed.
//!
//! Supported grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | 'x' | '(' expr ')'
//! ```
//!
//! # Example
//!
//! ```
//! use bq_settings::expression::{evaluate, Expression};
//!
//! assert_eq!(evaluate("x/2", 100.0).unwrap(), 50.0);
//!
//! let expr = Expression::parse("(x - 2731) * 10").unwrap();
//! assert_eq!(expr.evaluate(2981.0).unwrap(), 2500.0);
//! ```

use crate::error::{Result, SettingsError};

/// Name of the free variable in conversion expressions.
pub const VARIABLE: &str = "x";

/// Deepest nesting of parentheses and unary signs accepted.
pub const MAX_DEPTH: usize = 64;

/// Longest expression accepted, in tokens.
pub const MAX_TOKENS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Variable,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f64),
    Variable,
    Negate(Box<Node>),
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

/// A parsed conversion expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Parses an expression.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Expression` on unknown characters or
    /// identifiers, unbalanced parentheses, an empty expression, nesting
    /// deeper than [`MAX_DEPTH`] or more than [`MAX_TOKENS`] tokens.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::expression::Expression;
    ///
    /// assert!(Expression::parse("x*1000").is_ok());
    /// assert!(Expression::parse("y*1000").is_err());
    /// assert!(Expression::parse("__import__('os')").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            source,
            tokens: &tokens,
            pos: 0,
            depth: 0,
        };

        let root = parser.expr()?;
        if let Some(token) = parser.peek() {
            return Err(SettingsError::expression(
                source,
                format!("unexpected {:?} after end of expression", token),
            ));
        }

        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Evaluates the expression with `x` bound to the given value.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Expression` on division by zero or a
    /// non-finite result.
    pub fn evaluate(&self, x: f64) -> Result<f64> {
        let value = eval(&self.root, x)
            .map_err(|reason| SettingsError::expression(&self.source, reason))?;
        if !value.is_finite() {
            return Err(SettingsError::expression(
                &self.source,
                format!("result {} is not finite", value),
            ));
        }
        Ok(value)
    }

    /// Returns the original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::str::FromStr for Expression {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parses and evaluates an expression in one step.
pub fn evaluate(formula: &str, x: f64) -> Result<f64> {
    Expression::parse(formula)?.evaluate(x)
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => {
                i += 1;
                continue;
            }
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Optional exponent: e.g. 1e-3
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| {
                    SettingsError::expression(source, format!("invalid number '{}'", text))
                })?;
                tokens.push(Token::Number(value));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if ident != VARIABLE {
                    return Err(SettingsError::expression(
                        source,
                        format!("unknown identifier '{}'", ident),
                    ));
                }
                tokens.push(Token::Variable);
                continue;
            }
            other => {
                return Err(SettingsError::expression(
                    source,
                    format!("unexpected character '{}' at position {}", other, i),
                ));
            }
        }
        i += 1;
    }

    if tokens.len() > MAX_TOKENS {
        return Err(SettingsError::expression(
            source,
            format!("longer than {} tokens", MAX_TOKENS),
        ));
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, reason: impl Into<String>) -> SettingsError {
        SettingsError::expression(self.source, reason)
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<Node>) -> Result<Node> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    fn expr(&mut self) -> Result<Node> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Node> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let inner = self.nested(Self::unary)?;
                Ok(Node::Negate(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Node> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Node::Number(value)),
            Some(Token::Variable) => Ok(Node::Variable),
            Some(Token::LParen) => {
                let inner = self.nested(Self::expr)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("missing closing parenthesis")),
                }
            }
            Some(token) => Err(self.error(format!("unexpected {:?}", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

fn eval(node: &Node, x: f64) -> std::result::Result<f64, String> {
    match node {
        Node::Number(value) => Ok(*value),
        Node::Variable => Ok(x),
        Node::Negate(inner) => Ok(-eval(inner, x)?),
        Node::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, x)?;
            let rhs = eval(rhs, x)?;
            match op {
                BinaryOp::Add => Ok(lhs + rhs),
                BinaryOp::Sub => Ok(lhs - rhs),
                BinaryOp::Mul => Ok(lhs * rhs),
                BinaryOp::Div if rhs == 0.0 => Err("division by zero".to_string()),
                BinaryOp::Div => Ok(lhs / rhs),
            }
        }
    }
}
