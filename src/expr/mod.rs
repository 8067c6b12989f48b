//! Expression module - tokenizing, parsing and evaluating infix expressions

pub mod eval;
pub mod rpn;
pub mod symbols;
pub mod token;
pub mod tree;

pub use eval::{EvalError, Expression, LimitCheck};
pub use rpn::{format_rpn, infix_to_rpn, RpnError, RpnItem};
pub use symbols::SymbolTable;
pub use token::{tokenize, BinaryOp, Token, TokenError, UnaryOp};
pub use tree::{ExprTree, Node, NodeId, TreeError};
