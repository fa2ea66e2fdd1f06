//! The value-type model
//!
//! Every variable, attribute, parameter, and expression in the analyzed
//! tree carries a `ValueType`: either a reference to a class (including
//! the built-ins `int`, `bool`, `str`, and `object`) or a list type. The
//! distinguished pseudo-class names `<None>` and `<Empty>` stand for the
//! types of `None` and of the empty list display.

use std::fmt;

/// Name of the pseudo-class that types the `None` value.
pub const NONE_CLASS: &str = "<None>";

/// Name of the pseudo-class that types the empty list display.
pub const EMPTY_CLASS: &str = "<Empty>";

/// The static type of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// A simple class reference, e.g. `int` or a user-defined class.
    Class { class_name: String },

    /// A list type, e.g. `[int]`.
    List { element_type: Box<ValueType> },
}

impl ValueType {
    /// A class type for the class named `name`.
    pub fn class(name: impl Into<String>) -> ValueType {
        ValueType::Class {
            class_name: name.into(),
        }
    }

    /// A list type with elements of type `element`.
    pub fn list(element: ValueType) -> ValueType {
        ValueType::List {
            element_type: Box::new(element),
        }
    }

    /// The type `object`.
    pub fn object_type() -> ValueType {
        ValueType::class("object")
    }

    /// The type `int`.
    pub fn int_type() -> ValueType {
        ValueType::class("int")
    }

    /// The type `bool`.
    pub fn bool_type() -> ValueType {
        ValueType::class("bool")
    }

    /// The type `str`.
    pub fn str_type() -> ValueType {
        ValueType::class("str")
    }

    /// The type of `None`.
    pub fn none_type() -> ValueType {
        ValueType::class(NONE_CLASS)
    }

    /// The type of `[]`.
    pub fn empty_type() -> ValueType {
        ValueType::class(EMPTY_CLASS)
    }

    /// The name of the class, if this is a class type.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            ValueType::Class { class_name } => Some(class_name),
            ValueType::List { .. } => None,
        }
    }

    /// For list types, the type of the elements.
    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::List { element_type } => Some(element_type),
            ValueType::Class { .. } => None,
        }
    }

    pub fn is_int(&self) -> bool {
        self.class_name() == Some("int")
    }

    pub fn is_bool(&self) -> bool {
        self.class_name() == Some("bool")
    }

    pub fn is_str(&self) -> bool {
        self.class_name() == Some("str")
    }

    /// True iff this is a type that does not include the value `None`.
    pub fn is_special_type(&self) -> bool {
        self.is_int() || self.is_bool() || self.is_str()
    }

    pub fn is_list_type(&self) -> bool {
        matches!(self, ValueType::List { .. })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Class { class_name } => write!(f, "{}", class_name),
            ValueType::List { element_type } => write!(f, "[{}]", element_type),
        }
    }
}
