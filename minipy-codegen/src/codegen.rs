//! The code-generation driver
//!
//! `CodeGen` owns the two halves of a compilation: the durable descriptor
//! set ([`ProgramInfo`]) built by analysis, and the mutable emission
//! state ([`EmitContext`]) holding the assembly sink, the constant pool,
//! and the local-label counter.
//!
//! Output order is fixed: the `.equiv` preamble, a `.data` block with
//! prototypes, dispatch tables, and globals, a `.text` block with the
//! entry point, top-level code, every function body, the standard runtime
//! routines, and any custom code, and finally a trailing `.data` block
//! with the constants interned along the way.

use crate::constants::ConstantPool;
use crate::emitter::CodeEmitter;
use crate::info::{ClassId, FuncEmitter, ProgramInfo, HEADER_SIZE};
use crate::label::Label;
use crate::riscv::{Register, RiscvBackend};
use crate::runtime;
use log::debug;
use minipy_ast::{Literal, Program};
use minipy_common::{CompilerError, ValueType};

/// Size of heap memory: 32 MB.
const HEAP_SIZE_BYTES: i32 = 1024 * 1024 * 32;

/// Ecall numbers for intrinsic routines.
const EXIT2_ECALL: i32 = 17;
const PRINT_STRING_ECALL: i32 = 4;
const PRINT_CHAR_ECALL: i32 = 11;
const PRINT_INT_ECALL: i32 = 1;
const READ_STRING_ECALL: i32 = 8;
const FILL_LINE_BUFFER_ECALL: i32 = 18;
const SBRK_ECALL: i32 = 9;

/// Error codes reported by the runtime's abort routine.
const ERROR_ARG: i32 = 1;
const ERROR_DIV_ZERO: i32 = 2;
const ERROR_OOB: i32 = 3;
const ERROR_NONE: i32 = 4;
const ERROR_OOM: i32 = 5;
const ERROR_NYI: i32 = 6;

/// Tunables of a single compilation.
#[derive(Debug, Clone)]
pub struct CodeGenOptions {
    /// Size of the heap requested from the runtime, in bytes. Must be a
    /// multiple of 4 KB.
    pub heap_size_bytes: i32,
}

impl Default for CodeGenOptions {
    fn default() -> Self {
        CodeGenOptions {
            heap_size_bytes: HEAP_SIZE_BYTES,
        }
    }
}

/// Mutable per-compilation emission state, shared between the core and
/// the pluggable emitter.
#[derive(Debug, Default)]
pub struct EmitContext {
    /// The append-only assembly sink.
    pub backend: RiscvBackend,
    /// The constant pool; filled on demand during emission.
    pub constants: ConstantPool,
    /// Counter used to generate unique local label names.
    next_label_suffix: u32,
}

impl EmitContext {
    pub fn new() -> EmitContext {
        EmitContext::default()
    }

    /// Return a fresh label for a local jump target. All such labels have
    /// the prefix `label_` and are unique within the compilation.
    pub fn generate_local_label(&mut self) -> Label {
        let label = Label::new(format!("label_{}", self.next_label_suffix));
        self.next_label_suffix += 1;
        label
    }

    /// Emit a word containing a constant representing `value`, assuming
    /// it will be interpreted as a value of static type `ty`.
    ///
    /// For `int` and `bool` the numeric encoding is inlined directly;
    /// everything else emits the address of a pooled constant, or 0 for
    /// `None`.
    pub fn emit_constant(
        &mut self,
        value: Option<&Literal>,
        ty: Option<&ValueType>,
        comment: &str,
    ) {
        match ty {
            Some(ty) if ty.is_int() => {
                let literal = match value {
                    Some(Literal::Int(v)) => *v,
                    other => panic!(
                        "COMPILER ERROR: int-typed initializer must be an int literal, got {:?}",
                        other
                    ),
                };
                self.backend.emit_word_literal(literal, Some(comment));
            }
            Some(ty) if ty.is_bool() => {
                let literal = match value {
                    Some(Literal::Bool(v)) => *v as i32,
                    other => panic!(
                        "COMPILER ERROR: bool-typed initializer must be a bool literal, got {:?}",
                        other
                    ),
                };
                self.backend.emit_word_literal(literal, Some(comment));
            }
            _ => {
                let label = self.constants.from_literal(value);
                self.backend.emit_word_address(label.as_ref(), Some(comment));
            }
        }
    }
}

/// The code generator for a program.
///
/// Analyzes all declarations into descriptors, emits the data sections
/// and the text-section scaffolding, and delegates instruction selection
/// for user-written code to the supplied [`CodeEmitter`].
#[derive(Debug)]
pub struct CodeGen {
    /// Descriptors and symbol tables; frozen once analysis completes.
    pub info: ProgramInfo,
    /// Emission state handed to the pluggable emitter.
    pub ctx: EmitContext,
    options: CodeGenOptions,
}

impl CodeGen {
    /// A code generator with default options. Registers the predefined
    /// classes and functions and emits the symbolic-constant preamble.
    pub fn new() -> CodeGen {
        CodeGen::with_options(CodeGenOptions::default())
    }

    pub fn with_options(options: CodeGenOptions) -> CodeGen {
        let info = ProgramInfo::new();
        let mut ctx = EmitContext::new();
        define_asm_constants(&mut ctx.backend);
        CodeGen { info, ctx, options }
    }

    /// Generate assembly code for `program`, delegating bodies of
    /// user-defined functions and top-level statements to `emitter`.
    pub fn generate(
        mut self,
        program: &Program,
        emitter: &mut dyn CodeEmitter,
    ) -> Result<String, CompilerError> {
        self.info.analyze_program(program);
        debug!(
            "analysis complete: {} classes, {} functions, {} globals",
            self.info.classes.len(),
            self.info.functions.len(),
            self.info.globals.len()
        );

        self.ctx.backend.start_data();

        for index in 0..self.info.classes.len() {
            self.emit_prototype(ClassId::from_index(index));
        }

        for index in 0..self.info.classes.len() {
            self.emit_dispatch_table(ClassId::from_index(index));
        }

        for global in &self.info.globals {
            self.ctx.backend.emit_global_label(global.label());
            self.ctx.emit_constant(
                global.initial_value(),
                Some(global.var_type()),
                &format!("Initial value of global var: {}", global.var_name()),
            );
        }

        self.ctx.backend.start_code();

        let main_label = Label::new("main");
        self.ctx.backend.emit_global_label(&main_label);
        self.ctx.backend.emit_lui(
            Register::A0,
            self.options.heap_size_bytes >> 12,
            Some("Initialize heap size (in multiples of 4KB)"),
        );
        self.ctx
            .backend
            .emit_add(Register::S11, Register::S11, Register::A0, Some("Save heap size"));
        self.ctx
            .backend
            .emit_jal(&Label::new("heap.init"), Some("Call heap.init routine"));
        self.ctx
            .backend
            .emit_mv(Register::GP, Register::A0, Some("Initialize heap pointer"));
        self.ctx
            .backend
            .emit_mv(Register::S10, Register::GP, Some("Set beginning of heap"));
        self.ctx.backend.emit_add(
            Register::S11,
            Register::S10,
            Register::S11,
            Some("Set end of heap (= start of heap + heap size)"),
        );
        self.ctx.backend.emit_mv(
            Register::RA,
            Register::Zero,
            Some("No normal return from main program."),
        );
        self.ctx
            .backend
            .emit_mv(Register::FP, Register::Zero, Some("No preceding frame."));

        emitter.emit_top_level(&program.statements, &self.info, &mut self.ctx)?;

        for index in 0..self.info.functions.len() {
            let func = self.info.functions[index];
            match self.info.func(func).emitter() {
                FuncEmitter::Runtime => {
                    let label = self.info.func(func).code_label().clone();
                    self.emit_std_func_labeled(&label)?;
                }
                FuncEmitter::UserDefined => {
                    emitter.emit_func_body(func, &self.info, &mut self.ctx)?;
                }
            }
        }

        self.emit_std_func("alloc")?;
        self.emit_std_func("alloc2")?;
        self.emit_std_func("abort")?;
        self.emit_std_func("heap.init")?;

        emitter.emit_custom_code(&self.info, &mut self.ctx)?;

        // Last: constants are discovered while bodies and runtime
        // routines are emitted.
        self.ctx.backend.start_data();
        self.emit_constants();

        Ok(self.ctx.backend.finish())
    }

    /// Emit code to align the next data item to a word boundary.
    fn align_object(&mut self) {
        let word_size_log2 = (self.info.word_size() as u32).trailing_zeros();
        self.ctx.backend.align_next(word_size_log2);
    }

    /// Emit the prototype object for the class `class`.
    fn emit_prototype(&mut self, class: ClassId) {
        let class = self.info.class(class);
        let ctx = &mut self.ctx;
        debug!("emitting prototype for class {}", class.class_name());

        ctx.backend.emit_global_label(class.prototype_label());
        ctx.backend.emit_word_literal(
            class.type_tag(),
            Some(&format!("Type tag for class: {}", class.class_name())),
        );
        ctx.backend.emit_word_literal(
            (class.attributes.len() + HEADER_SIZE) as i32,
            Some("Object size"),
        );
        ctx.backend
            .emit_word_address(class.dispatch_table_label(), Some("Pointer to dispatch table"));
        for attr in &class.attributes {
            ctx.emit_constant(
                attr.initial_value(),
                attr.var_type(),
                &format!("Initial value of attribute: {}", attr.var_name()),
            );
        }
        self.align_object();
    }

    /// Emit the method dispatch table for the class `class`, if it has
    /// one.
    fn emit_dispatch_table(&mut self, class: ClassId) {
        let class = self.info.class(class);
        let Some(dispatch_table_label) = class.dispatch_table_label() else {
            return;
        };
        self.ctx.backend.emit_global_label(dispatch_table_label);
        for slot in &class.methods {
            let method = self.info.func(slot.func);
            self.ctx.backend.emit_word_address(
                Some(method.code_label()),
                Some(&format!(
                    "Implementation for method: {}.{}",
                    class.class_name(),
                    slot.name
                )),
            );
        }
    }

    /// Emit the trailing constants section: the boolean singletons, then
    /// every interned string and int, in insertion order.
    fn emit_constants(&mut self) {
        let bool_tag = self.info.class(self.info.bool_class()).type_tag();
        let bool_size = (self.info.class(self.info.bool_class()).attributes.len() + HEADER_SIZE) as i32;
        let bool_dispatch = self
            .info
            .class(self.info.bool_class())
            .dispatch_table_label()
            .cloned();

        for (label, payload) in [
            (self.ctx.constants.false_constant().clone(), 0),
            (self.ctx.constants.true_constant().clone(), 1),
        ] {
            self.ctx.backend.emit_global_label(&label);
            self.ctx
                .backend
                .emit_word_literal(bool_tag, Some("Type tag for class: bool"));
            self.ctx.backend.emit_word_literal(bool_size, Some("Object size"));
            self.ctx
                .backend
                .emit_word_address(bool_dispatch.as_ref(), Some("Pointer to dispatch table"));
            self.ctx
                .backend
                .emit_word_literal(payload, Some("Constant value of attribute: __bool__"));
            self.align_object();
        }

        let str_tag = self.info.class(self.info.str_class()).type_tag();
        let str_dispatch = self
            .info
            .class(self.info.str_class())
            .dispatch_table_label()
            .cloned();
        let word_size = self.info.word_size();

        let str_constants: Vec<(String, Label)> = self
            .ctx
            .constants
            .str_constants
            .iter()
            .map(|(value, label)| (value.clone(), label.clone()))
            .collect();
        for (value, label) in str_constants {
            let num_words_for_characters = value.len() / word_size + 1;
            self.ctx.backend.emit_global_label(&label);
            self.ctx
                .backend
                .emit_word_literal(str_tag, Some("Type tag for class: str"));
            self.ctx.backend.emit_word_literal(
                (HEADER_SIZE + 1 + num_words_for_characters) as i32,
                Some("Object size"),
            );
            self.ctx
                .backend
                .emit_word_address(str_dispatch.as_ref(), Some("Pointer to dispatch table"));
            self.ctx.backend.emit_word_literal(
                value.len() as i32,
                Some("Constant value of attribute: __len__"),
            );
            self.ctx
                .backend
                .emit_string_literal(&value, Some("Constant value of attribute: __str__"));
            self.align_object();
        }

        let int_tag = self.info.class(self.info.int_class()).type_tag();
        let int_size = (self.info.class(self.info.int_class()).attributes.len() + HEADER_SIZE) as i32;
        let int_dispatch = self
            .info
            .class(self.info.int_class())
            .dispatch_table_label()
            .cloned();

        let int_constants: Vec<(i32, Label)> = self
            .ctx
            .constants
            .int_constants
            .iter()
            .map(|(value, label)| (*value, label.clone()))
            .collect();
        for (value, label) in int_constants {
            self.ctx.backend.emit_global_label(&label);
            self.ctx
                .backend
                .emit_word_literal(int_tag, Some("Type tag for class: int"));
            self.ctx.backend.emit_word_literal(int_size, Some("Object size"));
            self.ctx
                .backend
                .emit_word_address(int_dispatch.as_ref(), Some("Pointer to dispatch table"));
            self.ctx
                .backend
                .emit_word_literal(value, Some("Constant value of attribute: __int__"));
            self.align_object();
        }
    }

    /// Emit label and body for the runtime routine named `name`.
    fn emit_std_func(&mut self, name: &str) -> Result<(), CompilerError> {
        self.emit_std_func_labeled(&Label::new(name))
    }

    /// Emit label and body for the runtime routine at `label`. The
    /// routine's source is looked up by the label's name with `$` signs
    /// removed, and its `STRING["..."]` placeholders are rewritten
    /// against the constant pool.
    fn emit_std_func_labeled(&mut self, label: &Label) -> Result<(), CompilerError> {
        let name = label.name().replace('$', "");
        let source = runtime::library_source(&name)
            .ok_or_else(|| CompilerError::missing_runtime(name.clone()))?;
        self.ctx.backend.emit_global_label(label);
        let converted = runtime::convert_literals(source, &mut self.ctx.constants);
        self.ctx.backend.emit(converted.trim_end_matches('\n'));
        Ok(())
    }
}

impl Default for CodeGen {
    fn default() -> Self {
        CodeGen::new()
    }
}

/// Define the `@`-constants referenced by generated code and by the
/// runtime routines: ecall numbers, object-layout byte offsets, and
/// error codes.
fn define_asm_constants(backend: &mut RiscvBackend) {
    backend.define_sym("sbrk", SBRK_ECALL);
    backend.define_sym("print_string", PRINT_STRING_ECALL);
    backend.define_sym("print_char", PRINT_CHAR_ECALL);
    backend.define_sym("print_int", PRINT_INT_ECALL);
    backend.define_sym("exit2", EXIT2_ECALL);
    backend.define_sym("read_string", READ_STRING_ECALL);
    backend.define_sym("fill_line_buffer", FILL_LINE_BUFFER_ECALL);

    backend.define_sym(".__obj_size__", 4);
    backend.define_sym(".__len__", 12);
    backend.define_sym(".__int__", 12);
    backend.define_sym(".__bool__", 12);
    backend.define_sym(".__str__", 16);
    backend.define_sym(".__elts__", 16);

    backend.define_sym("error_div_zero", ERROR_DIV_ZERO);
    backend.define_sym("error_arg", ERROR_ARG);
    backend.define_sym("error_oob", ERROR_OOB);
    backend.define_sym("error_none", ERROR_NONE);
    backend.define_sym("error_oom", ERROR_OOM);
    backend.define_sym("error_nyi", ERROR_NYI);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_runtime_routine_is_fatal() {
        let mut gen = CodeGen::new();
        let err = gen.emit_std_func("frobnicate").unwrap_err();
        assert_eq!(err, CompilerError::missing_runtime("frobnicate"));
    }

    #[test]
    fn test_local_labels_are_unique() {
        let mut ctx = EmitContext::new();
        let a = ctx.generate_local_label();
        let b = ctx.generate_local_label();
        assert_eq!(a.name(), "label_0");
        assert_eq!(b.name(), "label_1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_emit_constant_inlines_int_and_bool() {
        let mut ctx = EmitContext::new();
        ctx.emit_constant(
            Some(&Literal::Int(5)),
            Some(&ValueType::int_type()),
            "Initial value of global var: x",
        );
        ctx.emit_constant(Some(&Literal::Bool(true)), Some(&ValueType::bool_type()), "b");
        let text = ctx.backend.finish();
        assert!(text.contains(".word 5"));
        assert!(text.contains(".word 1"));
        // Inline encodings never touch the pool.
        assert!(ctx.constants.int_constants.is_empty());
    }

    #[test]
    fn test_emit_constant_boxes_other_types() {
        let mut ctx = EmitContext::new();
        ctx.emit_constant(
            Some(&Literal::Str("hello".to_string())),
            Some(&ValueType::str_type()),
            "s",
        );
        ctx.emit_constant(Some(&Literal::None), Some(&ValueType::object_type()), "o");
        ctx.emit_constant(None, None, "untyped");
        let text = ctx.backend.finish();
        assert!(text.contains(".word const_2"));
        assert_eq!(text.matches(".word 0").count(), 2);
        assert_eq!(ctx.constants.str_constants.len(), 1);
    }

    #[test]
    fn test_preamble_defines_symbols() {
        let mut backend = RiscvBackend::new();
        define_asm_constants(&mut backend);
        let text = backend.finish();
        for sym in [
            ".equiv @sbrk, 9",
            ".equiv @print_string, 4",
            ".equiv @print_char, 11",
            ".equiv @print_int, 1",
            ".equiv @exit2, 17",
            ".equiv @read_string, 8",
            ".equiv @fill_line_buffer, 18",
            ".equiv @.__obj_size__, 4",
            ".equiv @.__len__, 12",
            ".equiv @.__int__, 12",
            ".equiv @.__bool__, 12",
            ".equiv @.__str__, 16",
            ".equiv @.__elts__, 16",
            ".equiv @error_div_zero, 2",
            ".equiv @error_arg, 1",
            ".equiv @error_oob, 3",
            ".equiv @error_none, 4",
            ".equiv @error_oom, 5",
            ".equiv @error_nyi, 6",
        ] {
            assert!(text.contains(sym), "missing {}", sym);
        }
    }
}
