//! Symbol table - named quantities plus the shared expression arena

use std::collections::HashMap;

use crate::core::Quantity;
use crate::expr::tree::{ExprTree, NodeId, TreeError};

/// Quantities by name and the trees that refer to them
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    values: HashMap<String, Quantity>,
    tree: ExprTree,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constant or dimension under its key
    pub fn insert(&mut self, quantity: Quantity) {
        self.values.insert(quantity.key().to_string(), quantity);
    }

    pub fn value(&self, name: &str) -> Option<&Quantity> {
        self.values.get(name)
    }

    /// True when `name` is a quantity or an already built expression
    pub fn is_defined(&self, name: &str) -> bool {
        self.values.contains_key(name) || self.tree.root(name).is_some()
    }

    pub fn tree(&self) -> &ExprTree {
        &self.tree
    }

    /// Build an expression tree against the quantities defined so far
    pub fn construct(&mut self, key: &str, expr: &str) -> Result<NodeId, TreeError> {
        let values = &self.values;
        self.tree
            .construct(key, expr, |token| values.contains_key(token))
    }
}
