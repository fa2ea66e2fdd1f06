//! End-to-end tests for the code-generation core.
//!
//! The emitter used here is deliberately naive: it walks statements and
//! expressions, interns the literals it meets, and emits placeholder
//! loads. That is enough to exercise everything the core owns: analysis,
//! data layout, the entry preamble, runtime splicing, and the constant
//! pool. Instruction selection quality is out of scope.

use minipy_ast::{
    ClassDef, Declaration, Expr, ExprKind, FuncDef, Literal, Program, Stmt, TypeAnnotation,
    TypedVar, VarDef,
};
use indoc::indoc;
use minipy_codegen::{
    CodeEmitter, CodeGen, CodeGenOptions, EmitContext, FuncId, ProgramInfo, Register, SymbolInfo,
};
use minipy_common::CompilerError;

struct WalkingEmitter;

impl WalkingEmitter {
    fn emit_expr(&mut self, expr: &Expr, ctx: &mut EmitContext) {
        match &expr.kind {
            ExprKind::Literal(Literal::Str(value)) => {
                let label = ctx.constants.get_str_constant(value);
                ctx.backend.emit_la(Register::A1, &label, Some("Load string literal"));
            }
            ExprKind::Literal(Literal::Int(value)) => {
                ctx.backend.emit_li(Register::A0, *value, Some("Load int literal"));
            }
            ExprKind::Literal(Literal::Bool(value)) => {
                let label = ctx.constants.get_bool_constant(*value);
                ctx.backend.emit_la(Register::A0, &label, Some("Load bool literal"));
            }
            ExprKind::Literal(Literal::None) => {
                ctx.backend.emit_mv(Register::A0, Register::Zero, Some("Load None"));
            }
            ExprKind::Identifier(_) => {}
            ExprKind::Binary { left, right, .. } => {
                self.emit_expr(left, ctx);
                self.emit_expr(right, ctx);
            }
            ExprKind::Unary { operand, .. } => self.emit_expr(operand, ctx),
            ExprKind::IfElse {
                condition,
                then_expr,
                else_expr,
            } => {
                self.emit_expr(condition, ctx);
                let else_label = ctx.generate_local_label();
                ctx.backend
                    .emit_beqz(Register::A0, &else_label, Some("Branch on false"));
                self.emit_expr(then_expr, ctx);
                ctx.backend.emit_local_label(&else_label, None);
                self.emit_expr(else_expr, ctx);
            }
            ExprKind::Call { args, .. } | ExprKind::MethodCall { args, .. } => {
                for arg in args {
                    self.emit_expr(arg, ctx);
                }
            }
            ExprKind::Member { object, .. } => self.emit_expr(object, ctx),
            ExprKind::Index { list, index } => {
                self.emit_expr(list, ctx);
                self.emit_expr(index, ctx);
            }
            ExprKind::List(elements) => {
                for element in elements {
                    self.emit_expr(element, ctx);
                }
            }
        }
    }

    fn emit_stmt(&mut self, stmt: &Stmt, ctx: &mut EmitContext) {
        match stmt {
            Stmt::Expr(expr) => self.emit_expr(expr, ctx),
            Stmt::Assign { targets, value } => {
                self.emit_expr(value, ctx);
                for target in targets {
                    self.emit_expr(target, ctx);
                }
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                self.emit_expr(condition, ctx);
                for s in then_body {
                    self.emit_stmt(s, ctx);
                }
                for s in else_body {
                    self.emit_stmt(s, ctx);
                }
            }
            Stmt::While { condition, body } => {
                self.emit_expr(condition, ctx);
                for s in body {
                    self.emit_stmt(s, ctx);
                }
            }
            Stmt::For { iterable, body, .. } => {
                self.emit_expr(iterable, ctx);
                for s in body {
                    self.emit_stmt(s, ctx);
                }
            }
            Stmt::Return { value } => {
                if let Some(value) = value {
                    self.emit_expr(value, ctx);
                }
            }
            Stmt::Pass => {}
        }
    }
}

impl CodeEmitter for WalkingEmitter {
    fn emit_top_level(
        &mut self,
        statements: &[Stmt],
        _info: &ProgramInfo,
        ctx: &mut EmitContext,
    ) -> Result<(), CompilerError> {
        for stmt in statements {
            self.emit_stmt(stmt, ctx);
        }
        Ok(())
    }

    fn emit_func_body(
        &mut self,
        func: FuncId,
        info: &ProgramInfo,
        ctx: &mut EmitContext,
    ) -> Result<(), CompilerError> {
        ctx.backend.emit_global_label(info.func(func).code_label());
        for stmt in info.func(func).statements() {
            self.emit_stmt(stmt, ctx);
        }
        ctx.backend.emit_jr(Register::RA, Some("Return to caller"));
        Ok(())
    }

    fn emit_custom_code(
        &mut self,
        _info: &ProgramInfo,
        _ctx: &mut EmitContext,
    ) -> Result<(), CompilerError> {
        Ok(())
    }
}

fn generate(program: &Program) -> String {
    CodeGen::new()
        .generate(program, &mut WalkingEmitter)
        .expect("code generation should succeed")
}

fn var_def(name: &str, ty: &str, value: Literal) -> Declaration {
    Declaration::Var(VarDef {
        var: TypedVar {
            identifier: name.to_string(),
            type_annotation: TypeAnnotation::Class(ty.to_string()),
        },
        value,
    })
}

fn method_def(name: &str, self_type: &str) -> Declaration {
    Declaration::Func(FuncDef {
        name: name.to_string(),
        params: vec![TypedVar {
            identifier: "self".to_string(),
            type_annotation: TypeAnnotation::Class(self_type.to_string()),
        }],
        return_type: TypeAnnotation::Class("<None>".to_string()),
        declarations: vec![],
        statements: vec![Stmt::Pass],
    })
}

fn str_stmt(value: &str) -> Stmt {
    Stmt::Expr(Expr::new(
        ExprKind::Literal(Literal::Str(value.to_string())),
        minipy_common::ValueType::str_type(),
    ))
}

/// The `.word` lines immediately following the definition of `label`.
fn words_after<'a>(text: &'a str, label: &str) -> Vec<&'a str> {
    let mut words = Vec::new();
    let mut in_block = false;
    for line in text.lines() {
        if line.starts_with(&format!("{}:", label)) {
            in_block = true;
            continue;
        }
        if in_block {
            let trimmed = line.trim_start();
            if trimmed.starts_with(".word") {
                let word = trimmed.split('#').next().unwrap().trim();
                words.push(word);
            } else if trimmed.starts_with(".align") || trimmed.starts_with(".string") {
                continue;
            } else {
                break;
            }
        }
    }
    words
}

#[test]
fn empty_program_emits_builtin_scaffolding() {
    let text = generate(&Program::default());

    // Prototypes for the predefined classes, in registration order.
    let prototypes = [
        "$object$prototype",
        "$int$prototype",
        "$bool$prototype",
        "$str$prototype",
        "$.list$prototype",
    ];
    let mut last = 0;
    for proto in prototypes {
        let pos = text.find(&format!("{}:", proto)).unwrap_or_else(|| {
            panic!("missing prototype {}", proto)
        });
        assert!(pos > last, "{} out of order", proto);
        last = pos;
    }

    // Dispatch tables for every built-in except the synthetic list class.
    for table in [
        "$object$dispatchTable",
        "$int$dispatchTable",
        "$bool$dispatchTable",
        "$str$dispatchTable",
    ] {
        assert!(text.contains(&format!("{}:", table)), "missing {}", table);
    }
    assert!(!text.contains("$.list$dispatchTable"));

    // Header invariants of the built-in prototypes: tag, size = 3 + attrs,
    // dispatch pointer.
    assert_eq!(
        words_after(&text, "$object$prototype"),
        vec![".word 0", ".word 3", ".word $object$dispatchTable"]
    );
    assert_eq!(
        words_after(&text, "$int$prototype"),
        vec![".word 1", ".word 4", ".word $int$dispatchTable", ".word 0"]
    );
    assert_eq!(
        words_after(&text, "$str$prototype"),
        vec![
            ".word 3",
            ".word 5",
            ".word $str$dispatchTable",
            ".word 0",
            ".word 0"
        ]
    );
    assert_eq!(
        words_after(&text, "$.list$prototype"),
        vec![".word -1", ".word 4", ".word 0", ".word 0"]
    );

    // Entry point and heap bootstrap.
    assert!(text.contains(".globl main"));
    assert!(text.contains("lui a0, 8192"));
    assert!(text.contains("jal heap.init"));

    // Standard runtime routines are spliced in.
    for routine in ["alloc:", "alloc2:", "abort:", "heap.init:"] {
        assert!(text.contains(&format!("\n{}", routine)), "missing {}", routine);
    }
    // Predefined functions come from the resource store too.
    for func in ["$object.__init__:", "$print:", "$len:", "$input:"] {
        assert!(text.contains(func), "missing {}", func);
    }

    // Boolean singletons at fixed labels, False before True.
    assert_eq!(
        words_after(&text, "const_0"),
        vec![".word 2", ".word 4", ".word $bool$dispatchTable", ".word 0"]
    );
    assert_eq!(
        words_after(&text, "const_1"),
        vec![".word 2", ".word 4", ".word $bool$dispatchTable", ".word 1"]
    );
    let false_pos = text.find("const_0:").unwrap();
    let true_pos = text.find("const_1:").unwrap();
    assert!(false_pos < true_pos);

    // No user globals.
    assert!(!text.contains("Initial value of global var"));

    // No placeholder survives rewriting.
    assert!(!text.contains("STRING["));
}

#[test]
fn heap_size_is_configurable() {
    let options = CodeGenOptions {
        heap_size_bytes: 4 * 1024 * 1024,
    };
    let text = CodeGen::with_options(options)
        .generate(&Program::default(), &mut WalkingEmitter)
        .expect("code generation should succeed");
    assert!(text.contains("lui a0, 1024"));
}

#[test]
fn object_prototype_block_is_byte_stable() {
    let text = generate(&Program::default());
    let expected = indoc! {"
        .globl $object$prototype
        $object$prototype:
          .word 0                                  # Type tag for class: object
          .word 3                                  # Object size
          .word $object$dispatchTable              # Pointer to dispatch table
          .align 2
    "};
    assert!(
        text.contains(expected),
        "object prototype block not found in:\n{}",
        text
    );
}

#[test]
fn deterministic_output() {
    let program = Program {
        declarations: vec![
            var_def("x", "int", Literal::Int(7)),
            Declaration::Class(ClassDef {
                name: "A".to_string(),
                super_class: "object".to_string(),
                declarations: vec![method_def("f", "A")],
            }),
        ],
        statements: vec![str_stmt("hello"), str_stmt("world")],
    };
    assert_eq!(generate(&program), generate(&program));
}

#[test]
fn global_int_is_inlined_not_boxed() {
    let program = Program {
        declarations: vec![var_def("x", "int", Literal::Int(5))],
        statements: vec![],
    };
    let text = generate(&program);

    assert!(text.contains(".globl $x"));
    assert_eq!(words_after(&text, "$x"), vec![".word 5"]);

    // The static type is int, so no boxed constant is interned.
    assert!(!text.contains("Constant value of attribute: __int__"));
}

#[test]
fn global_str_references_pooled_constant() {
    let program = Program {
        declarations: vec![var_def("s", "str", Literal::Str("hey".to_string()))],
        statements: vec![],
    };
    let text = generate(&program);

    let words = words_after(&text, "$s");
    assert_eq!(words.len(), 1);
    assert!(words[0].starts_with(".word const_"));
    assert!(text.contains(".string \"hey\""));
}

#[test]
fn global_none_of_class_type_emits_zero() {
    let program = Program {
        declarations: vec![var_def("o", "object", Literal::None)],
        statements: vec![],
    };
    let text = generate(&program);
    assert_eq!(words_after(&text, "$o"), vec![".word 0"]);
}

#[test]
fn override_shares_dispatch_slot() {
    let program = Program {
        declarations: vec![
            Declaration::Class(ClassDef {
                name: "A".to_string(),
                super_class: "object".to_string(),
                declarations: vec![method_def("f", "A")],
            }),
            Declaration::Class(ClassDef {
                name: "B".to_string(),
                super_class: "A".to_string(),
                declarations: vec![method_def("f", "B")],
            }),
        ],
        statements: vec![],
    };
    let text = generate(&program);

    assert_eq!(
        words_after(&text, "$A$dispatchTable"),
        vec![".word $object.__init__", ".word $A.f"]
    );
    assert_eq!(
        words_after(&text, "$B$dispatchTable"),
        vec![".word $object.__init__", ".word $B.f"]
    );

    // Both bodies are present exactly once.
    assert_eq!(text.matches("\n$A.f:").count(), 1);
    assert_eq!(text.matches("\n$B.f:").count(), 1);
}

#[test]
fn repeated_string_literals_intern_once() {
    let program = Program {
        declarations: vec![],
        statements: vec![str_stmt("hi"), str_stmt("hi"), str_stmt("hi")],
    };
    let text = generate(&program);

    assert_eq!(text.matches(".string \"hi\"").count(), 1);

    // All three uses reference the same label. (The runtime fragments
    // load string constants too, so key on the emitter's comment.)
    let uses: Vec<&str> = text
        .lines()
        .filter(|line| line.contains("# Load string literal"))
        .collect();
    assert_eq!(uses.len(), 3);
    let first_label = uses[0].split_whitespace().nth(2).unwrap();
    assert!(first_label.starts_with("const_"));
    for use_line in &uses {
        assert_eq!(use_line.split_whitespace().nth(2), Some(first_label));
    }

    // The interned string's length word is 2.
    let words = words_after(&text, first_label);
    // tag, size, dispatch, __len__
    assert_eq!(words[0], ".word 3");
    assert_eq!(words[3], ".word 2");
}

#[test]
fn labels_are_defined_exactly_once() {
    let program = Program {
        declarations: vec![
            var_def("x", "int", Literal::Int(1)),
            Declaration::Class(ClassDef {
                name: "A".to_string(),
                super_class: "object".to_string(),
                declarations: vec![method_def("f", "A"), method_def("g", "A")],
            }),
        ],
        statements: vec![str_stmt("once"), str_stmt("twice")],
    };
    let text = generate(&program);

    let mut seen = std::collections::HashSet::new();
    for line in text.lines() {
        // Label definitions sit at column zero and end with a colon.
        if !line.starts_with(' ') && !line.starts_with('.') && line.contains(':') {
            let name = line.split(':').next().unwrap();
            assert!(seen.insert(name.to_string()), "label {} defined twice", name);
        }
    }
}

#[test]
fn runtime_fragments_intern_shared_messages() {
    let text = generate(&Program::default());

    // print and len both carry STRING["Invalid argument"]; the pool holds
    // one copy.
    assert_eq!(text.matches(".string \"Invalid argument\"").count(), 1);
    assert_eq!(text.matches(".string \"Out of memory\"").count(), 1);
    assert_eq!(text.matches(".string \"True\"").count(), 1);
    assert_eq!(text.matches(".string \"False\"").count(), 1);
}

#[test]
fn nested_function_resolves_captured_local() {
    // def outer():
    //     x:int = 0
    //     def inner():
    //         nonlocal x
    //         x = 1
    let inner = FuncDef {
        name: "inner".to_string(),
        params: vec![],
        return_type: TypeAnnotation::Class("<None>".to_string()),
        declarations: vec![Declaration::NonLocal(minipy_ast::NonLocalDecl {
            identifier: "x".to_string(),
        })],
        statements: vec![Stmt::Assign {
            targets: vec![Expr::untyped(ExprKind::Identifier("x".to_string()))],
            value: Expr::new(ExprKind::Literal(Literal::Int(1)), minipy_common::ValueType::int_type()),
        }],
    };
    let outer = FuncDef {
        name: "outer".to_string(),
        params: vec![],
        return_type: TypeAnnotation::Class("<None>".to_string()),
        declarations: vec![
            var_def("x", "int", Literal::Int(0)),
            Declaration::Func(inner),
        ],
        statements: vec![Stmt::Pass],
    };
    let program = Program {
        declarations: vec![Declaration::Func(outer)],
        statements: vec![],
    };

    let mut info = ProgramInfo::new();
    info.analyze_program(&program);

    let root = info.global_scope();
    let outer = match info.symbols.get(root, "outer") {
        Some(SymbolInfo::Func(f)) => *f,
        _ => panic!("outer not bound"),
    };
    let inner = match info.symbols.get(info.func(outer).symbol_table(), "inner") {
        Some(SymbolInfo::Func(f)) => *f,
        _ => panic!("inner not bound"),
    };

    // inner's activation record does not contain x; its scope chain
    // resolves x to outer's local at index 0 of outer's locals (slot 2).
    let x = match info.symbols.get(info.func(inner).symbol_table(), "x") {
        Some(SymbolInfo::StackVar(v)) => *v,
        other => panic!("expected stack var, got {:?}", other),
    };
    assert_eq!(info.stack_var(x).func(), outer);
    assert_eq!(info.var_index(outer, "x"), 2);

    // And generation of the whole program still succeeds.
    let text = generate(&program);
    assert!(text.contains("$outer.inner:"));
    assert!(text.contains("$outer:"));
}

#[test]
fn function_bodies_emitted_in_registration_order() {
    let program = Program {
        declarations: vec![Declaration::Func(FuncDef {
            name: "f".to_string(),
            params: vec![],
            return_type: TypeAnnotation::Class("<None>".to_string()),
            declarations: vec![],
            statements: vec![Stmt::Pass],
        })],
        statements: vec![],
    };
    let text = generate(&program);

    // Built-in bodies first, then the user function, then the allocator.
    let init_pos = text.find("$object.__init__:").unwrap();
    let print_pos = text.find("\n$print:").unwrap();
    let f_pos = text.find("\n$f:").unwrap();
    let alloc_pos = text.find("\nalloc:").unwrap();
    assert!(init_pos < print_pos);
    assert!(print_pos < f_pos);
    assert!(f_pos < alloc_pos);

    // The trailing constants section comes after everything else.
    let tail_data = text.rfind("\n.data").unwrap();
    assert!(tail_data > alloc_pos);
}
