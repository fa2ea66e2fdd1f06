//! minipy compiler - RISC-V code-generation core
//!
//! This crate implements the backend half of the compiler for programs
//! that the front end has already parsed and type-checked:
//!
//! - Analysis: walks declarations and builds descriptors for every
//!   class, function, method, attribute, parameter, local, and global,
//!   together with the symbol-table tree modeling lexical scoping.
//! - Data layout: emits prototype objects, dispatch tables, globals, and
//!   interned constants in the fixed ABI layout.
//! - Text driver: emits the entry point, bootstraps the heap, and splices
//!   in the standard runtime routines after rewriting their literal
//!   placeholders against the constant pool.
//!
//! Instruction selection for user-written statements and expressions is
//! pluggable: implement [`CodeEmitter`] and pass it to
//! [`CodeGen::generate`].

pub mod analysis;
pub mod codegen;
pub mod constants;
pub mod emitter;
pub mod info;
pub mod label;
pub mod riscv;
mod runtime;
pub mod symtab;

pub use codegen::{CodeGen, CodeGenOptions, EmitContext};
pub use constants::ConstantPool;
pub use emitter::CodeEmitter;
pub use info::{
    AttrInfo, ClassId, ClassInfo, FuncEmitter, FuncId, FuncInfo, GlobalId, GlobalVarInfo,
    MethodSlot, ProgramInfo, StackVarId, StackVarInfo, SymbolInfo, HEADER_SIZE,
};
pub use label::Label;
pub use riscv::{Register, RiscvBackend, WORD_SIZE};
pub use symtab::{ScopeId, SymbolTable};
