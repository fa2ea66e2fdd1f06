//! The constant pool
//!
//! Caches boxed constants and generates labels for them. Constants are
//! keyed by value, not by source occurrence: every `5` in the program
//! shares one label, and likewise for identical string contents. `True`
//! and `False` are singletons allocated up front at fixed labels.
//!
//! Both maps preserve insertion order, which fixes the emission order of
//! the trailing constants section.

use crate::label::Label;
use indexmap::IndexMap;
use minipy_ast::Literal;

/// Deduplicating store of interned constants.
#[derive(Debug)]
pub struct ConstantPool {
    /// Counter used to generate unique `const_<n>` label names.
    next_label_suffix: u32,
    /// Labels for int constants, keyed by value.
    pub(crate) int_constants: IndexMap<i32, Label>,
    /// Labels for str constants, keyed by contents.
    pub(crate) str_constants: IndexMap<String, Label>,
    /// Label of the `False` singleton.
    false_constant: Label,
    /// Label of the `True` singleton.
    true_constant: Label,
}

impl ConstantPool {
    pub fn new() -> ConstantPool {
        // The two boolean singletons claim the first two counter values,
        // giving them the fixed labels const_0 and const_1.
        ConstantPool {
            next_label_suffix: 2,
            int_constants: IndexMap::new(),
            str_constants: IndexMap::new(),
            false_constant: Label::new("const_0"),
            true_constant: Label::new("const_1"),
        }
    }

    fn generate_constant_label(&mut self) -> Label {
        let label = Label::new(format!("const_{}", self.next_label_suffix));
        self.next_label_suffix += 1;
        label
    }

    /// The label for the boxed int with the given value, interning it if
    /// not already present.
    pub fn get_int_constant(&mut self, value: i32) -> Label {
        if let Some(label) = self.int_constants.get(&value) {
            return label.clone();
        }
        let label = self.generate_constant_label();
        self.int_constants.insert(value, label.clone());
        label
    }

    /// The label for the str constant with the given contents, interning
    /// it if not already present.
    pub fn get_str_constant(&mut self, value: &str) -> Label {
        if let Some(label) = self.str_constants.get(value) {
            return label.clone();
        }
        let label = self.generate_constant_label();
        self.str_constants.insert(value.to_string(), label.clone());
        label
    }

    /// The label for one of the two boxed booleans.
    pub fn get_bool_constant(&self, value: bool) -> Label {
        if value {
            self.true_constant.clone()
        } else {
            self.false_constant.clone()
        }
    }

    /// Label of the `False` singleton.
    pub fn false_constant(&self) -> &Label {
        &self.false_constant
    }

    /// Label of the `True` singleton.
    pub fn true_constant(&self) -> &Label {
        &self.true_constant
    }

    /// The label for an arbitrary literal, or `None` when the literal is
    /// `None` or absent (emitted as a null address).
    pub fn from_literal(&mut self, literal: Option<&Literal>) -> Option<Label> {
        match literal {
            Some(Literal::Int(value)) => Some(self.get_int_constant(*value)),
            Some(Literal::Str(value)) => Some(self.get_str_constant(value)),
            Some(Literal::Bool(value)) => Some(self.get_bool_constant(*value)),
            Some(Literal::None) | None => None,
        }
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        ConstantPool::new()
    }
}
