//! The pluggable code-emission interface
//!
//! The core builds descriptors, lays out the data section, and drives the
//! text section, but it does not choose instructions for user-written
//! statements and expressions. That job belongs to a [`CodeEmitter`]
//! supplied by the caller. The core hands the emitter frozen descriptors
//! ([`ProgramInfo`]) and the mutable emission state ([`EmitContext`]) and
//! never inspects what the emitter writes.

use crate::codegen::EmitContext;
use crate::info::{FuncId, ProgramInfo};
use minipy_ast::Stmt;
use minipy_common::CompilerError;

/// Instruction selection for user-written code.
pub trait CodeEmitter {
    /// Emit the program's top-level statements. Called once, immediately
    /// after the entry-point preamble; on entry `gp` holds the heap
    /// pointer and `fp`/`ra` are zero.
    fn emit_top_level(
        &mut self,
        statements: &[Stmt],
        info: &ProgramInfo,
        ctx: &mut EmitContext,
    ) -> Result<(), CompilerError>;

    /// Emit the body of the user-defined function `func`.
    ///
    /// The function's parameters, locals, statements, symbol table, and
    /// code label are all set. The emitted text must execute the body and
    /// return when entered at the code label via a standard call.
    fn emit_func_body(
        &mut self,
        func: FuncId,
        info: &ProgramInfo,
        ctx: &mut EmitContext,
    ) -> Result<(), CompilerError>;

    /// Emit any additional helper routines that emitted bodies jump to.
    /// Called once, after all function bodies and runtime routines.
    fn emit_custom_code(
        &mut self,
        info: &ProgramInfo,
        ctx: &mut EmitContext,
    ) -> Result<(), CompilerError>;
}
