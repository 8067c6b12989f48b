//! Expression tokenizer and operator tables

use miette::Diagnostic;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Scientific and decimal literals, word runs (identifiers and integers) and
/// single-character symbols
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[0-9]+\.?[0-9]*|\.[0-9]+)[eE][+-]?[0-9]+|[0-9]*\.[0-9]+|[A-Za-z0-9_]+|[()+\-*/^]",
    )
    .unwrap_or_else(|e| panic!("invalid token pattern: {e}"))
});

/// Precedence shared by unary minus and every function
pub const UNARY_PRECEDENCE: u8 = 10;

/// Errors raised while splitting an expression into tokens
#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
pub enum TokenError {
    #[error("unexpected character '{ch}' at offset {offset} in '{expr}'")]
    #[diagnostic(
        code(tolstack::expr::unexpected_char),
        help("expressions may contain names, numbers, parentheses and + - * / ^")
    )]
    UnexpectedChar {
        ch: char,
        offset: usize,
        expr: String,
    },
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Sub),
            '*' => Some(BinaryOp::Mul),
            '/' => Some(BinaryOp::Div),
            '^' => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 3,
        }
    }
}

/// Unary minus and the trigonometric functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Sin,
    Cos,
    Tan,
    SinDeg,
    CosDeg,
    TanDeg,
}

impl UnaryOp {
    /// Look up a function by name
    pub fn function(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(UnaryOp::Sin),
            "cos" => Some(UnaryOp::Cos),
            "tan" => Some(UnaryOp::Tan),
            "sind" => Some(UnaryOp::SinDeg),
            "cosd" => Some(UnaryOp::CosDeg),
            "tand" => Some(UnaryOp::TanDeg),
            _ => None,
        }
    }

    /// RPN symbol: `u-` for negation, the function name otherwise
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "u-",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::SinDeg => "sind",
            UnaryOp::CosDeg => "cosd",
            UnaryOp::TanDeg => "tand",
        }
    }
}

/// A lexical token of an infix expression
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier or numeric literal
    Operand(String),
    /// Function name (`sin`, `cosd`, ...)
    Function(UnaryOp),
    /// Arithmetic symbol; `-` may still turn out to be unary
    Operator(BinaryOp),
    LParen,
    RParen,
}

impl Token {
    /// Arithmetic symbol or function name
    pub fn is_operator(&self) -> bool {
        matches!(self, Token::Operator(_) | Token::Function(_))
    }

    /// Word token that is not a function name
    pub fn is_variable(&self) -> bool {
        matches!(self, Token::Operand(_))
    }

    /// `-` or a function name
    pub fn can_be_unary_operator(&self) -> bool {
        matches!(self, Token::Operator(BinaryOp::Sub) | Token::Function(_))
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Operand(s) => write!(f, "{}", s),
            Token::Function(op) => write!(f, "{}", op.symbol()),
            Token::Operator(op) => write!(f, "{}", op.symbol()),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

/// Split an expression into tokens in a single pass, skipping whitespace
pub fn tokenize(expr: &str) -> Result<Vec<Token>, TokenError> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    for m in TOKEN_RE.find_iter(expr) {
        check_gap(expr, cursor, m.start())?;
        cursor = m.end();

        let text = m.as_str();
        let token = match text {
            "(" => Token::LParen,
            ")" => Token::RParen,
            _ => {
                let mut chars = text.chars();
                match (chars.next().and_then(BinaryOp::from_char), chars.next()) {
                    (Some(op), None) => Token::Operator(op),
                    _ => match UnaryOp::function(text) {
                        Some(func) => Token::Function(func),
                        None => Token::Operand(text.to_string()),
                    },
                }
            }
        };
        tokens.push(token);
    }
    check_gap(expr, cursor, expr.len())?;

    Ok(tokens)
}

/// Anything between two matches must be whitespace
fn check_gap(expr: &str, start: usize, end: usize) -> Result<(), TokenError> {
    match expr[start..end].char_indices().find(|(_, c)| !c.is_whitespace()) {
        Some((i, ch)) => Err(TokenError::UnexpectedChar {
            ch,
            offset: start + i,
            expr: expr.to_string(),
        }),
        None => Ok(()),
    }
}
