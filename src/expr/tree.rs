//! Arena-allocated expression trees
//!
//! Nodes live in one `Vec` and refer to their children by index. An
//! expression that names an earlier expression reuses that expression's
//! root index, so composite expressions share sub-trees instead of copying
//! them.

use miette::Diagnostic;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::expr::rpn::{infix_to_rpn, RpnError, RpnItem};
use crate::expr::token::{BinaryOp, UnaryOp};

/// Errors raised while building an expression tree
#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
pub enum TreeError {
    #[error("expression '{expression}': {source}")]
    #[diagnostic(code(tolstack::expr::syntax))]
    Syntax {
        expression: String,
        #[source]
        source: RpnError,
    },

    #[error("expression '{expression}': '{token}' is not a defined constant, dimension or expression")]
    #[diagnostic(
        code(tolstack::expr::unresolved),
        help("define '{token}' before the expressions that use it")
    )]
    Unresolved { token: String, expression: String },

    #[error("expression '{expression}': '{token}' is not a valid number")]
    #[diagnostic(code(tolstack::expr::malformed_literal))]
    MalformedLiteral { token: String, expression: String },

    #[error("expression '{expression}': '{op}' is missing an operand")]
    #[diagnostic(code(tolstack::expr::missing_operand))]
    MissingOperand { op: String, expression: String },

    #[error("expression '{expression}': {count} operands are not joined by an operator")]
    #[diagnostic(code(tolstack::expr::dangling_operands))]
    DanglingOperands { count: usize, expression: String },

    #[error("expression '{expression}' is empty")]
    #[diagnostic(code(tolstack::expr::empty))]
    Empty { expression: String },
}

/// Index of a node in an [`ExprTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A tree node: a leaf token or an operator applied to child nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Variable name or numeric literal
    Leaf(String),
    Unary { op: UnaryOp, operand: NodeId },
    Binary { op: BinaryOp, left: NodeId, right: NodeId },
}

/// Node arena plus the root of every named expression built so far
#[derive(Debug, Clone, Default)]
pub struct ExprTree {
    nodes: Vec<Node>,
    roots: HashMap<String, NodeId>,
}

/// True for tokens that start like a number
pub fn looks_numeric(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.')
}

impl ExprTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Root of a previously built expression
    pub fn root(&self, name: &str) -> Option<NodeId> {
        self.roots.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Parse an infix expression and build its tree under `key`
    ///
    /// `is_value` reports whether a token names a quantity in the symbol
    /// table. Tokens that name earlier expressions resolve to their roots.
    pub fn construct(
        &mut self,
        key: &str,
        expr: &str,
        is_value: impl Fn(&str) -> bool,
    ) -> Result<NodeId, TreeError> {
        let rpn = infix_to_rpn(expr).map_err(|source| TreeError::Syntax {
            expression: key.to_string(),
            source,
        })?;
        self.build(key, &rpn, is_value)
    }

    /// Build a tree bottom-up from RPN and register its root under `key`
    pub fn build(
        &mut self,
        key: &str,
        rpn: &[RpnItem],
        is_value: impl Fn(&str) -> bool,
    ) -> Result<NodeId, TreeError> {
        // Nodes pushed by a failed build stay unreachable in the arena
        let mut stack: Vec<NodeId> = Vec::new();

        for item in rpn {
            let id = match item {
                RpnItem::Operand(token) => self.resolve(key, token, &is_value)?,
                RpnItem::Unary(op) => {
                    let operand = pop_operand(&mut stack, key, op.symbol())?;
                    self.push(Node::Unary { op: *op, operand })
                }
                RpnItem::Binary(op) => {
                    let right = pop_operand(&mut stack, key, op.symbol())?;
                    let left = pop_operand(&mut stack, key, op.symbol())?;
                    self.push(Node::Binary {
                        op: *op,
                        left,
                        right,
                    })
                }
            };
            stack.push(id);
        }

        let root = match stack.as_slice() {
            [root] => *root,
            [] => {
                return Err(TreeError::Empty {
                    expression: key.to_string(),
                })
            }
            _ => {
                return Err(TreeError::DanglingOperands {
                    count: stack.len(),
                    expression: key.to_string(),
                })
            }
        };

        self.roots.insert(key.to_string(), root);
        log::debug!("built tree for '{}' ({} nodes in arena)", key, self.nodes.len());
        Ok(root)
    }

    fn resolve(
        &mut self,
        key: &str,
        token: &str,
        is_value: &impl Fn(&str) -> bool,
    ) -> Result<NodeId, TreeError> {
        if is_value(token) {
            return Ok(self.push(Node::Leaf(token.to_string())));
        }
        if let Some(root) = self.root(token) {
            return Ok(root);
        }
        if looks_numeric(token) {
            return match token.parse::<f64>() {
                Ok(_) => Ok(self.push(Node::Leaf(token.to_string()))),
                Err(_) => Err(TreeError::MalformedLiteral {
                    token: token.to_string(),
                    expression: key.to_string(),
                }),
            };
        }
        Err(TreeError::Unresolved {
            token: token.to_string(),
            expression: key.to_string(),
        })
    }

    /// Every leaf token reachable from `id`, including literals
    pub fn leaves(&self, id: NodeId) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_leaves(id, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut BTreeSet<String>) {
        match self.node(id) {
            Node::Leaf(token) => {
                out.insert(token.clone());
            }
            Node::Unary { operand, .. } => self.collect_leaves(*operand, out),
            Node::Binary { left, right, .. } => {
                self.collect_leaves(*left, out);
                self.collect_leaves(*right, out);
            }
        }
    }

    /// Infix rendering with only the parentheses the grammar requires
    pub fn render(&self, id: NodeId) -> String {
        match self.node(id) {
            Node::Leaf(token) => token.clone(),
            Node::Unary { op, operand } => {
                let inner = self.render(*operand);
                match op {
                    UnaryOp::Neg => match self.node(*operand) {
                        Node::Binary { .. } => format!("-({})", inner),
                        _ => format!("-{}", inner),
                    },
                    func => format!("{}({})", func.symbol(), inner),
                }
            }
            Node::Binary { op, left, right } => {
                let l = self.render_child(*left, *op, false);
                let r = self.render_child(*right, *op, true);
                format!("{} {} {}", l, op.symbol(), r)
            }
        }
    }

    fn render_child(&self, child: NodeId, parent: BinaryOp, is_right: bool) -> String {
        let text = self.render(child);
        let Node::Binary { op, .. } = self.node(child) else {
            return text;
        };

        let lower = op.precedence() < parent.precedence();
        // a - (b - c), a / (b * c), a ^ (b ^ c)
        let regroups = is_right
            && op.precedence() == parent.precedence()
            && matches!(parent, BinaryOp::Sub | BinaryOp::Div | BinaryOp::Pow);

        if lower || regroups {
            format!("({})", text)
        } else {
            text
        }
    }
}

fn pop_operand(stack: &mut Vec<NodeId>, key: &str, op: &str) -> Result<NodeId, TreeError> {
    stack.pop().ok_or_else(|| TreeError::MissingOperand {
        op: op.to_string(),
        expression: key.to_string(),
    })
}
