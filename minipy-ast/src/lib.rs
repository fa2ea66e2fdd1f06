//! minipy compiler - annotated program tree
//!
//! This crate defines the tree that the code-generation backend consumes.
//! The tree has already been parsed, name-resolved, and type-checked by
//! the front end: every identifier resolves, every expression carries its
//! inferred value type, and super-class references are valid. The backend
//! treats the tree as read-only input.

pub mod ast;

pub use ast::{
    BinaryOp, ClassDef, Declaration, Expr, ExprKind, FuncDef, GlobalDecl, Literal, NonLocalDecl,
    Program, Stmt, TypeAnnotation, TypedVar, UnaryOp, VarDef,
};
