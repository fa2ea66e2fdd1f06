//! Declaration analysis
//!
//! Walks the program tree and turns every declaration into descriptors,
//! building the symbol-table tree along the way. Runs in a fixed order:
//!
//! 1. Built-in classes and functions are registered before any user code
//!    is examined.
//! 2. All top-level variable declarations become globals, so that later
//!    `global x` declarations inside functions can resolve.
//! 3. Top-level classes and functions are analyzed in source order.
//!
//! Inside each function, local declarations (variables, `global`,
//! `nonlocal`) are analyzed before nested function definitions. The two
//! passes guarantee that a nested function sees every local of the
//! enclosing scope regardless of textual order.

use crate::info::{
    AttrInfo, ClassId, FuncEmitter, FuncId, FuncInfo, GlobalId, GlobalVarInfo, ProgramInfo,
    StackVarId, StackVarInfo, SymbolInfo,
};
use crate::symtab::ScopeId;
use log::debug;
use minipy_ast::{ClassDef, Declaration, FuncDef, Program};
use minipy_common::ValueType;

impl ProgramInfo {
    /// A fresh `ProgramInfo` with the predefined classes, methods, and
    /// functions already registered.
    pub fn new() -> ProgramInfo {
        let mut info = ProgramInfo::empty();
        info.init_classes();
        info.init_functions();
        info
    }

    /// Return a fresh type tag.
    fn next_type_tag(&mut self) -> i32 {
        let tag = self.next_type_tag;
        self.next_type_tag += 1;
        tag
    }

    /// Create descriptors and symbols for builtin classes and methods.
    fn init_classes(&mut self) {
        let root = self.symbols.root();

        let object_init = self.make_func(
            "object.__init__",
            0,
            ValueType::none_type(),
            root,
            None,
            FuncEmitter::Runtime,
        );
        let self_param =
            self.make_stack_var("self", ValueType::object_type(), None, object_init);
        self.add_param(object_init, self_param);
        self.functions.push(object_init);

        let tag = self.next_type_tag();
        let object_class = self.make_class("object", tag, None);
        self.class_mut(object_class).add_method("__init__", object_init);
        self.symbols
            .put(root, "object", SymbolInfo::Class(object_class));

        let tag = self.next_type_tag();
        let int_class = self.make_class("int", tag, Some(object_class));
        self.class_mut(int_class)
            .add_attribute(AttrInfo::new("__int__", None, None));
        self.symbols.put(root, "int", SymbolInfo::Class(int_class));

        let tag = self.next_type_tag();
        let bool_class = self.make_class("bool", tag, Some(object_class));
        self.class_mut(bool_class)
            .add_attribute(AttrInfo::new("__bool__", None, None));
        self.symbols.put(root, "bool", SymbolInfo::Class(bool_class));

        let tag = self.next_type_tag();
        let str_class = self.make_class("str", tag, Some(object_class));
        self.class_mut(str_class).add_attribute(AttrInfo::new(
            "__len__",
            Some(ValueType::int_type()),
            Some(minipy_ast::Literal::Int(0)),
        ));
        self.class_mut(str_class)
            .add_attribute(AttrInfo::new("__str__", None, None));
        self.symbols.put(root, "str", SymbolInfo::Class(str_class));

        // The list "class" is synthetic: it only exists to give list
        // objects a prototype, and it never dispatches.
        let list_class = self.make_class(".list", -1, Some(object_class));
        self.class_mut(list_class).add_attribute(AttrInfo::new(
            "__len__",
            Some(ValueType::int_type()),
            Some(minipy_ast::Literal::Int(0)),
        ));
        self.class_mut(list_class).clear_dispatch_table();

        self.builtins.object_class = object_class;
        self.builtins.int_class = int_class;
        self.builtins.bool_class = bool_class;
        self.builtins.str_class = str_class;
        self.builtins.list_class = list_class;
    }

    /// Create descriptors and symbols for builtin functions.
    fn init_functions(&mut self) {
        let root = self.symbols.root();

        let print_func = self.make_func(
            "print",
            0,
            ValueType::none_type(),
            root,
            None,
            FuncEmitter::Runtime,
        );
        let arg = self.make_stack_var("arg", ValueType::object_type(), None, print_func);
        self.add_param(print_func, arg);
        self.functions.push(print_func);
        self.symbols.put(root, "print", SymbolInfo::Func(print_func));

        let len_func = self.make_func(
            "len",
            0,
            ValueType::int_type(),
            root,
            None,
            FuncEmitter::Runtime,
        );
        let arg = self.make_stack_var("arg", ValueType::object_type(), None, len_func);
        self.add_param(len_func, arg);
        self.functions.push(len_func);
        self.symbols.put(root, "len", SymbolInfo::Func(len_func));

        let input_func = self.make_func(
            "input",
            0,
            ValueType::str_type(),
            root,
            None,
            FuncEmitter::Runtime,
        );
        self.functions.push(input_func);
        self.symbols.put(root, "input", SymbolInfo::Func(input_func));

        self.builtins.print_func = print_func;
        self.builtins.len_func = len_func;
        self.builtins.input_func = input_func;
    }

    /*------------------------------------------------------------*
     *           FACTORY METHODS TO CREATE DESCRIPTORS            *
     *------------------------------------------------------------*/

    /// Create a function descriptor with a fresh scope nested in
    /// `parent_scope` and register it in the arena.
    pub(crate) fn make_func(
        &mut self,
        func_name: &str,
        depth: u32,
        return_type: ValueType,
        parent_scope: ScopeId,
        parent: Option<FuncId>,
        emitter: FuncEmitter,
    ) -> FuncId {
        let scope = self.symbols.push_scope(parent_scope);
        let id = FuncId::from_index(self.funcs.len());
        self.funcs.push(FuncInfo::new(
            func_name,
            depth,
            return_type,
            scope,
            parent,
            emitter,
        ));
        id
    }

    /// Create a class descriptor whose attribute and method tables start
    /// as copies of the super class's, and register it in the arena.
    pub(crate) fn make_class(
        &mut self,
        class_name: &str,
        type_tag: i32,
        super_class: Option<ClassId>,
    ) -> ClassId {
        let mut class = crate::info::ClassInfo::new(class_name, type_tag);
        if let Some(super_class) = super_class {
            let super_class = self.class(super_class);
            class.attributes = super_class.attributes.clone();
            class.methods = super_class.methods.clone();
        }
        let id = ClassId::from_index(self.classes.len());
        self.classes.push(class);
        id
    }

    /// Create a stack-variable descriptor owned by `func`.
    pub(crate) fn make_stack_var(
        &mut self,
        var_name: &str,
        var_type: ValueType,
        initial_value: Option<minipy_ast::Literal>,
        func: FuncId,
    ) -> StackVarId {
        let id = StackVarId::from_index(self.stack_vars.len());
        self.stack_vars
            .push(StackVarInfo::new(var_name, var_type, initial_value, func));
        id
    }

    /// Create a global-variable descriptor and append it to the global
    /// list.
    pub(crate) fn make_global_var(
        &mut self,
        var_name: &str,
        var_type: ValueType,
        initial_value: Option<minipy_ast::Literal>,
    ) -> GlobalId {
        let id = GlobalId::from_index(self.globals.len());
        self.globals
            .push(GlobalVarInfo::new(var_name, var_type, initial_value));
        id
    }

    /// Register `var` as the next parameter of `func` and bind it in the
    /// function's scope.
    pub(crate) fn add_param(&mut self, func: FuncId, var: StackVarId) {
        let name = self.stack_var(var).var_name().to_string();
        let scope = self.func(func).symbol_table();
        self.func_mut(func).add_param(var);
        self.symbols.put(scope, name, SymbolInfo::StackVar(var));
    }

    /// Register `var` as the next local of `func` and bind it in the
    /// function's scope.
    pub(crate) fn add_local(&mut self, func: FuncId, var: StackVarId) {
        let name = self.stack_var(var).var_name().to_string();
        let scope = self.func(func).symbol_table();
        self.func_mut(func).add_local(var);
        self.symbols.put(scope, name, SymbolInfo::StackVar(var));
    }

    /*------------------------------------------------------------*
     *            ANALYSIS OF THE TREE INTO DESCRIPTORS           *
     *------------------------------------------------------------*/

    /// Analyze `program`, creating descriptors for all symbols and
    /// populating the global symbol table.
    pub fn analyze_program(&mut self, program: &Program) {
        let root = self.symbols.root();

        // Globals first, so that `global x` declarations encountered
        // inside functions below can resolve.
        for decl in &program.declarations {
            if let Declaration::Var(var_def) = decl {
                let var_type = var_def.var.type_annotation.value_type();
                let global = self.make_global_var(
                    &var_def.var.identifier,
                    var_type,
                    Some(var_def.value.clone()),
                );
                let name = self.global_var(global).var_name().to_string();
                self.symbols.put(root, name, SymbolInfo::GlobalVar(global));
            }
        }

        for decl in &program.declarations {
            match decl {
                Declaration::Class(class_def) => {
                    let class = self.analyze_class(class_def);
                    let name = self.class(class).class_name().to_string();
                    self.symbols.put(root, name, SymbolInfo::Class(class));
                }
                Declaration::Func(func_def) => {
                    let func = self.analyze_function(None, func_def, 0, root, None);
                    self.functions.push(func);
                    let name = self.func(func).base_name().to_string();
                    self.symbols.put(root, name, SymbolInfo::Func(func));
                }
                _ => {}
            }
        }
    }

    /// Analyze a class definition, creating descriptors for its
    /// attributes and methods. Methods are analyzed with
    /// `analyze_function` using the class name as qualifier.
    fn analyze_class(&mut self, class_def: &ClassDef) -> ClassId {
        debug!("analyzing class {}", class_def.name);

        let super_binding = self
            .symbols
            .get(self.symbols.root(), &class_def.super_class)
            .copied();
        let super_class = match super_binding {
            Some(SymbolInfo::Class(id)) => id,
            _ => panic!(
                "COMPILER ERROR: semantic analysis should ensure that super-class {} is defined",
                class_def.super_class
            ),
        };

        let tag = self.next_type_tag();
        let class = self.make_class(&class_def.name, tag, Some(super_class));

        for decl in &class_def.declarations {
            match decl {
                Declaration::Var(attr_def) => {
                    let attr_type = attr_def.var.type_annotation.value_type();
                    self.class_mut(class).add_attribute(AttrInfo::new(
                        &attr_def.var.identifier,
                        Some(attr_type),
                        Some(attr_def.value.clone()),
                    ));
                }
                Declaration::Func(method_def) => {
                    let root = self.symbols.root();
                    let method =
                        self.analyze_function(Some(class_def.name.as_str()), method_def, 0, root, None);
                    self.functions.push(method);
                    let base = self.func(method).base_name().to_string();
                    self.class_mut(class).add_method(&base, method);
                }
                _ => {}
            }
        }

        class
    }

    /// Analyze a function or method definition at nesting depth `depth`,
    /// recursively analyzing nested functions.
    ///
    /// `container` is the qualified name of the containing class or
    /// function (`None` for global functions); `parent_scope` is the
    /// enclosing region's symbol table; `parent_func` is set only for
    /// nested functions.
    fn analyze_function(
        &mut self,
        container: Option<&str>,
        func_def: &FuncDef,
        depth: u32,
        parent_scope: ScopeId,
        parent_func: Option<FuncId>,
    ) -> FuncId {
        let qualified_name = match container {
            Some(container) => format!("{}.{}", container, func_def.name),
            None => func_def.name.clone(),
        };
        debug!("analyzing function {} at depth {}", qualified_name, depth);

        let func = self.make_func(
            &qualified_name,
            depth,
            func_def.return_type.value_type(),
            parent_scope,
            parent_func,
            FuncEmitter::UserDefined,
        );

        for param in &func_def.params {
            let param_type = param.type_annotation.value_type();
            let var = self.make_stack_var(&param.identifier, param_type, None, func);
            self.add_param(func, var);
        }

        // Pass 1: locals and `global`/`nonlocal` declarations.
        for decl in &func_def.declarations {
            match decl {
                Declaration::Var(local_def) => {
                    let local_type = local_def.var.type_annotation.value_type();
                    let var = self.make_stack_var(
                        &local_def.var.identifier,
                        local_type,
                        Some(local_def.value.clone()),
                        func,
                    );
                    self.add_local(func, var);
                }
                Declaration::Global(decl) => {
                    let binding = self
                        .symbols
                        .get(self.symbols.root(), &decl.identifier)
                        .copied();
                    let global = match binding {
                        Some(SymbolInfo::GlobalVar(id)) => id,
                        _ => panic!(
                            "COMPILER ERROR: semantic analysis should ensure that global var {} exists",
                            decl.identifier
                        ),
                    };
                    let scope = self.func(func).symbol_table();
                    let name = self.global_var(global).var_name().to_string();
                    self.symbols.put(scope, name, SymbolInfo::GlobalVar(global));
                }
                Declaration::NonLocal(decl) => {
                    // A contract on code generation, not a binding: the
                    // name must already reach an enclosing local.
                    let scope = self.func(func).symbol_table();
                    assert!(
                        matches!(
                            self.symbols.get(scope, &decl.identifier),
                            Some(SymbolInfo::StackVar(_))
                        ),
                        "semantic analysis should ensure nonlocal var {} exists",
                        decl.identifier
                    );
                }
                _ => {}
            }
        }

        // Pass 2: nested function definitions, now that every local of
        // this scope is bound.
        for decl in &func_def.declarations {
            if let Declaration::Func(nested_def) = decl {
                let scope = self.func(func).symbol_table();
                let nested = self.analyze_function(
                    Some(qualified_name.as_str()),
                    nested_def,
                    depth + 1,
                    scope,
                    Some(func),
                );
                self.functions.push(nested);
                let base = self.func(nested).base_name().to_string();
                self.symbols.put(scope, base, SymbolInfo::Func(nested));
            }
        }

        self.func_mut(func).statements = func_def.statements.clone();
        func
    }
}

impl Default for ProgramInfo {
    fn default() -> Self {
        ProgramInfo::new()
    }
}
