//! Infix to reverse Polish notation (shunting-yard)
//!
//! Unary minus and functions bind tighter than any binary operator. They
//! are emitted as distinct symbols (`u-`, `sin`, ...) so the tree builder
//! knows to take a single operand.

use miette::Diagnostic;
use thiserror::Error;

use crate::expr::token::{tokenize, BinaryOp, Token, TokenError, UnaryOp, UNARY_PRECEDENCE};

/// Errors raised while translating an expression to RPN
#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
pub enum RpnError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Token(#[from] TokenError),

    #[error("unbalanced parentheses")]
    #[diagnostic(code(tolstack::expr::unbalanced_paren))]
    UnbalancedParen,

    #[error("function '{name}' follows an operand")]
    #[diagnostic(
        code(tolstack::expr::misplaced_function),
        help("functions take the operand to their right, e.g. 'a * sin(b)'")
    )]
    MisplacedFunction { name: String },
}

/// One element of an RPN sequence
#[derive(Debug, Clone, PartialEq)]
pub enum RpnItem {
    Operand(String),
    Unary(UnaryOp),
    Binary(BinaryOp),
}

impl std::fmt::Display for RpnItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpnItem::Operand(s) => write!(f, "{}", s),
            RpnItem::Unary(op) => write!(f, "{}", op.symbol()),
            RpnItem::Binary(op) => write!(f, "{}", op.symbol()),
        }
    }
}

/// Operator stack entry
#[derive(Debug, Clone, Copy)]
enum Pending {
    Unary(UnaryOp),
    Binary(BinaryOp),
    LParen,
}

impl Pending {
    fn precedence(&self) -> Option<u8> {
        match self {
            Pending::Unary(_) => Some(UNARY_PRECEDENCE),
            Pending::Binary(op) => Some(op.precedence()),
            Pending::LParen => None,
        }
    }

    fn into_item(self) -> Option<RpnItem> {
        match self {
            Pending::Unary(op) => Some(RpnItem::Unary(op)),
            Pending::Binary(op) => Some(RpnItem::Binary(op)),
            Pending::LParen => None,
        }
    }
}

/// Tokenize and translate an infix expression
pub fn infix_to_rpn(expr: &str) -> Result<Vec<RpnItem>, RpnError> {
    let tokens = tokenize(expr)?;
    translate(&tokens)
}

/// Translate a token sequence to RPN
pub fn translate(tokens: &[Token]) -> Result<Vec<RpnItem>, RpnError> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Pending> = Vec::new();
    let mut prev: Option<&Token> = None;

    for token in tokens {
        // nothing to the left that could serve as an operand
        let unary_position = match prev {
            None | Some(Token::LParen) => true,
            Some(t) => t.is_operator(),
        };

        match token {
            Token::Operand(s) => output.push(RpnItem::Operand(s.clone())),
            t if t.can_be_unary_operator() && unary_position => {
                let op = match t {
                    Token::Function(func) => *func,
                    _ => UnaryOp::Neg,
                };
                pop_while(&mut stack, &mut output, |p| p > UNARY_PRECEDENCE);
                stack.push(Pending::Unary(op));
            }
            Token::Function(func) => {
                return Err(RpnError::MisplacedFunction {
                    name: func.symbol().to_string(),
                });
            }
            Token::Operator(op) => {
                let precedence = op.precedence();
                pop_while(&mut stack, &mut output, |p| p >= precedence);
                stack.push(Pending::Binary(*op));
            }
            Token::LParen => stack.push(Pending::LParen),
            Token::RParen => {
                pop_while(&mut stack, &mut output, |_| true);
                match stack.pop() {
                    Some(Pending::LParen) => {}
                    _ => return Err(RpnError::UnbalancedParen),
                }
            }
        }
        prev = Some(token);
    }

    while let Some(pending) = stack.pop() {
        match pending.into_item() {
            Some(item) => output.push(item),
            None => return Err(RpnError::UnbalancedParen),
        }
    }

    log::debug!("rpn: {}", format_rpn(&output));
    Ok(output)
}

/// Pop operators to the output while the predicate holds, stopping at `(`
fn pop_while(stack: &mut Vec<Pending>, output: &mut Vec<RpnItem>, pops: impl Fn(u8) -> bool) {
    while let Some(top) = stack.last() {
        match top.precedence() {
            Some(p) if pops(p) => {}
            _ => break,
        }
        if let Some(item) = stack.pop().and_then(Pending::into_item) {
            output.push(item);
        }
    }
}

/// Space-separated rendering of an RPN sequence
pub fn format_rpn(items: &[RpnItem]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
