//! Descriptors for classes, functions, and variables
//!
//! Analysis turns every declaration in the program into a descriptor
//! carrying the ABI-relevant facts code generation needs: type tags,
//! prototype and dispatch-table labels, attribute and method tables with
//! inheritance merged in, activation-record layout, and lexical nesting.
//!
//! Descriptors reference each other cyclically (a nested function points
//! at its parent, scopes point at enclosing scopes), so they live in flat
//! arenas owned by [`ProgramInfo`] and refer to one another through id
//! handles. After analysis the whole structure is frozen; emitters only
//! read it.

use crate::label::Label;
use crate::riscv::WORD_SIZE;
use crate::symtab::{ScopeId, SymbolTable};
use minipy_ast::{Literal, Stmt};
use minipy_common::ValueType;

/// The object header size, in words (type tag, size, dispatch table
/// pointer).
pub const HEADER_SIZE: usize = 3;

/// Handle for a function descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FuncId(u32);

/// Handle for a class descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClassId(u32);

/// Handle for a global-variable descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GlobalId(u32);

/// Handle for a parameter or local-variable descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StackVarId(u32);

impl FuncId {
    pub(crate) fn from_index(index: usize) -> FuncId {
        FuncId(index as u32)
    }
}

impl ClassId {
    pub(crate) fn from_index(index: usize) -> ClassId {
        ClassId(index as u32)
    }
}

impl GlobalId {
    pub(crate) fn from_index(index: usize) -> GlobalId {
        GlobalId(index as u32)
    }
}

impl StackVarId {
    pub(crate) fn from_index(index: usize) -> StackVarId {
        StackVarId(index as u32)
    }
}

/// What a name is bound to in a symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolInfo {
    GlobalVar(GlobalId),
    StackVar(StackVarId),
    Func(FuncId),
    Class(ClassId),
}

/// How a function's body is emitted: from the runtime resource store, or
/// by the pluggable code emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncEmitter {
    Runtime,
    UserDefined,
}

/// A global variable, living in static storage at a fixed label.
#[derive(Debug, Clone)]
pub struct GlobalVarInfo {
    var_name: String,
    var_type: ValueType,
    initial_value: Option<Literal>,
    /// The label is the variable name prepended with `$` to prevent
    /// clashes with runtime routine names.
    label: Label,
}

impl GlobalVarInfo {
    pub(crate) fn new(var_name: &str, var_type: ValueType, initial_value: Option<Literal>) -> Self {
        GlobalVarInfo {
            var_name: var_name.to_string(),
            var_type,
            initial_value,
            label: Label::new(format!("${}", var_name)),
        }
    }

    pub fn var_name(&self) -> &str {
        &self.var_name
    }

    pub fn var_type(&self) -> &ValueType {
        &self.var_type
    }

    pub fn initial_value(&self) -> Option<&Literal> {
        self.initial_value.as_ref()
    }

    /// The static storage location of this variable.
    pub fn label(&self) -> &Label {
        &self.label
    }
}

/// A parameter or local variable, allocated in an activation record.
#[derive(Debug, Clone)]
pub struct StackVarInfo {
    var_name: String,
    var_type: ValueType,
    initial_value: Option<Literal>,
    /// The function immediately enclosing this variable.
    func: FuncId,
}

impl StackVarInfo {
    pub(crate) fn new(
        var_name: &str,
        var_type: ValueType,
        initial_value: Option<Literal>,
        func: FuncId,
    ) -> Self {
        StackVarInfo {
            var_name: var_name.to_string(),
            var_type,
            initial_value,
            func,
        }
    }

    pub fn var_name(&self) -> &str {
        &self.var_name
    }

    pub fn var_type(&self) -> &ValueType {
        &self.var_type
    }

    pub fn initial_value(&self) -> Option<&Literal> {
        self.initial_value.as_ref()
    }

    /// The function in which this variable is defined.
    pub fn func(&self) -> FuncId {
        self.func
    }
}

/// An instance variable of a class.
///
/// The builtin payload attributes (`__int__`, `__bool__`, `__str__`)
/// carry no declared type; their slots are interpreted directly by the
/// runtime.
#[derive(Debug, Clone)]
pub struct AttrInfo {
    var_name: String,
    var_type: Option<ValueType>,
    initial_value: Option<Literal>,
}

impl AttrInfo {
    pub(crate) fn new(
        var_name: &str,
        var_type: Option<ValueType>,
        initial_value: Option<Literal>,
    ) -> Self {
        AttrInfo {
            var_name: var_name.to_string(),
            var_type,
            initial_value,
        }
    }

    pub fn var_name(&self) -> &str {
        &self.var_name
    }

    pub fn var_type(&self) -> Option<&ValueType> {
        self.var_type.as_ref()
    }

    pub fn initial_value(&self) -> Option<&Literal> {
        self.initial_value.as_ref()
    }
}

/// One slot of a class's method table: the method's base name and the
/// descriptor of the implementation occupying the slot.
#[derive(Debug, Clone)]
pub struct MethodSlot {
    pub name: String,
    pub func: FuncId,
}

/// A function or method definition.
#[derive(Debug, Clone)]
pub struct FuncInfo {
    /// The fully-qualified name: `f` for a global function, `C.m` for a
    /// method of class `C`, `F.g` for `g` nested in `F`.
    func_name: String,
    /// The label of the generated code for the body, `$<fqname>`.
    code_label: Label,
    /// Static nesting depth: 0 for global functions and methods.
    depth: u32,
    return_type: ValueType,
    /// Parameters, in order of definition.
    params: Vec<StackVarId>,
    /// Explicitly defined local variables, excluding parameters.
    locals: Vec<StackVarId>,
    /// The function body; filled in at the end of analysis.
    pub(crate) statements: Vec<Stmt>,
    /// The scope binding identifiers seen in the function's body.
    symbol_table: ScopeId,
    /// The enclosing function; only present for nested functions.
    parent: Option<FuncId>,
    emitter: FuncEmitter,
}

impl FuncInfo {
    pub(crate) fn new(
        func_name: &str,
        depth: u32,
        return_type: ValueType,
        symbol_table: ScopeId,
        parent: Option<FuncId>,
        emitter: FuncEmitter,
    ) -> Self {
        FuncInfo {
            func_name: func_name.to_string(),
            code_label: Label::new(format!("${}", func_name)),
            depth,
            return_type,
            params: Vec::new(),
            locals: Vec::new(),
            statements: Vec::new(),
            symbol_table,
            parent,
            emitter,
        }
    }

    /// The function's fully-qualified name.
    pub fn func_name(&self) -> &str {
        &self.func_name
    }

    /// The function's defined name: the last component of the
    /// dot-separated fully-qualified name.
    pub fn base_name(&self) -> &str {
        match self.func_name.rfind('.') {
            Some(dot) => &self.func_name[dot + 1..],
            None => &self.func_name,
        }
    }

    /// The label of the function's body in assembly.
    pub fn code_label(&self) -> &Label {
        &self.code_label
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn return_type(&self) -> &ValueType {
        &self.return_type
    }

    pub fn params(&self) -> &[StackVarId] {
        &self.params
    }

    pub fn locals(&self) -> &[StackVarId] {
        &self.locals
    }

    pub fn statements(&self) -> &[Stmt] {
        &self.statements
    }

    pub fn symbol_table(&self) -> ScopeId {
        self.symbol_table
    }

    pub fn parent(&self) -> Option<FuncId> {
        self.parent
    }

    pub fn emitter(&self) -> FuncEmitter {
        self.emitter
    }

    pub(crate) fn add_param(&mut self, var: StackVarId) {
        self.params.push(var);
    }

    pub(crate) fn add_local(&mut self, var: StackVarId) {
        self.locals.push(var);
    }
}

/// A class definition.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    class_name: String,
    /// Tag indicating type of value:
    ///     0: object
    ///     1: int
    ///     2: bool
    ///     3: str
    ///    -1: `[T]` for any T
    ///    >3: user-defined classes
    type_tag: i32,
    /// Instance variables in object layout order, inherited first.
    pub attributes: Vec<AttrInfo>,
    /// Method table in dispatch order, inherited first, overrides
    /// substituted in place.
    pub methods: Vec<MethodSlot>,
    prototype_label: Label,
    /// Absent for the synthetic list class, which dispatches nothing.
    dispatch_table_label: Option<Label>,
}

impl ClassInfo {
    pub(crate) fn new(class_name: &str, type_tag: i32) -> Self {
        ClassInfo {
            class_name: class_name.to_string(),
            type_tag,
            attributes: Vec::new(),
            methods: Vec::new(),
            prototype_label: Label::new(format!("${}$prototype", class_name)),
            dispatch_table_label: Some(Label::new(format!("${}$dispatchTable", class_name))),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn type_tag(&self) -> i32 {
        self.type_tag
    }

    /// The address of this class's prototype object.
    pub fn prototype_label(&self) -> &Label {
        &self.prototype_label
    }

    /// The address of this class's dispatch table, if it has one.
    pub fn dispatch_table_label(&self) -> Option<&Label> {
        self.dispatch_table_label.as_ref()
    }

    pub(crate) fn clear_dispatch_table(&mut self) {
        self.dispatch_table_label = None;
    }

    /// Append an attribute. Attributes cannot be overridden, so this
    /// always extends the layout.
    pub(crate) fn add_attribute(&mut self, attr: AttrInfo) {
        self.attributes.push(attr);
    }

    /// Add a method, overriding any inherited method of the same name in
    /// place so that slot indices are stable across inheritance.
    pub(crate) fn add_method(&mut self, name: &str, func: FuncId) {
        match self.method_index(name) {
            Some(idx) => self.methods[idx].func = func,
            None => self.methods.push(MethodSlot {
                name: name.to_string(),
                func,
            }),
        }
    }

    /// The slot index of the attribute named `attr_name` in the object
    /// layout (excluding the header), taking inherited attributes into
    /// account. This is an index, not a byte offset.
    pub fn attribute_index(&self, attr_name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|attr| attr.var_name() == attr_name)
    }

    /// The slot index of the method named `method_name` in the dispatch
    /// table, taking inherited and overridden methods into account.
    pub fn method_index(&self, method_name: &str) -> Option<usize> {
        self.methods.iter().position(|slot| slot.name == method_name)
    }
}

/// Handles for the predefined classes and functions registered before
/// user analysis begins.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Builtins {
    pub object_class: ClassId,
    pub int_class: ClassId,
    pub bool_class: ClassId,
    pub str_class: ClassId,
    pub list_class: ClassId,
    pub print_func: FuncId,
    pub len_func: FuncId,
    pub input_func: FuncId,
}

/// The durable result of program analysis: every descriptor the program
/// gives rise to, the symbol-table tree, and the flat registration lists
/// that fix emission order.
#[derive(Debug)]
pub struct ProgramInfo {
    pub(crate) funcs: Vec<FuncInfo>,
    pub(crate) classes: Vec<ClassInfo>,
    pub(crate) globals: Vec<GlobalVarInfo>,
    pub(crate) stack_vars: Vec<StackVarInfo>,

    /// The symbol-table tree; its root is the global scope.
    pub symbols: SymbolTable<SymbolInfo>,

    /// Functions in emission order. Nested functions and methods precede
    /// the definition that encloses them.
    pub(crate) functions: Vec<FuncId>,

    /// Counter for generating unique class type tags.
    pub(crate) next_type_tag: i32,

    pub(crate) builtins: Builtins,

    word_size: usize,
}

impl ProgramInfo {
    pub(crate) fn empty() -> ProgramInfo {
        ProgramInfo {
            funcs: Vec::new(),
            classes: Vec::new(),
            globals: Vec::new(),
            stack_vars: Vec::new(),
            symbols: SymbolTable::new(),
            functions: Vec::new(),
            next_type_tag: 0,
            builtins: Builtins::default(),
            word_size: WORD_SIZE,
        }
    }

    /// The word size, in bytes, all offsets are computed against.
    pub fn word_size(&self) -> usize {
        self.word_size
    }

    pub fn func(&self, id: FuncId) -> &FuncInfo {
        &self.funcs[id.0 as usize]
    }

    pub(crate) fn func_mut(&mut self, id: FuncId) -> &mut FuncInfo {
        &mut self.funcs[id.0 as usize]
    }

    pub fn class(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.0 as usize]
    }

    pub(crate) fn class_mut(&mut self, id: ClassId) -> &mut ClassInfo {
        &mut self.classes[id.0 as usize]
    }

    pub fn global_var(&self, id: GlobalId) -> &GlobalVarInfo {
        &self.globals[id.0 as usize]
    }

    pub fn stack_var(&self, id: StackVarId) -> &StackVarInfo {
        &self.stack_vars[id.0 as usize]
    }

    /// All classes in registration order (built-ins first, then user
    /// classes in source order).
    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassInfo)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, class)| (ClassId(i as u32), class))
    }

    /// All global variables in declaration order.
    pub fn global_vars(&self) -> impl Iterator<Item = (GlobalId, &GlobalVarInfo)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(i, global)| (GlobalId(i as u32), global))
    }

    /// All functions (including methods and nested functions) in emission
    /// order.
    pub fn functions(&self) -> &[FuncId] {
        &self.functions
    }

    /// The global scope.
    pub fn global_scope(&self) -> ScopeId {
        self.symbols.root()
    }

    pub fn object_class(&self) -> ClassId {
        self.builtins.object_class
    }

    pub fn int_class(&self) -> ClassId {
        self.builtins.int_class
    }

    pub fn bool_class(&self) -> ClassId {
        self.builtins.bool_class
    }

    pub fn str_class(&self) -> ClassId {
        self.builtins.str_class
    }

    pub fn list_class(&self) -> ClassId {
        self.builtins.list_class
    }

    pub fn print_func(&self) -> FuncId {
        self.builtins.print_func
    }

    pub fn len_func(&self) -> FuncId {
        self.builtins.len_func
    }

    pub fn input_func(&self) -> FuncId {
        self.builtins.input_func
    }

    /// The index of parameter or local variable `name` in `func`'s
    /// activation record.
    ///
    /// The convention is that for a function with N params and K locals,
    /// the i'th param is at index `i` and the j'th local is at index
    /// `N+j+2`; the N+1st and N+2nd slots hold the saved frame pointer
    /// and return address. This is an index, not a byte offset.
    ///
    /// Panics when `name` is neither a parameter nor a local of `func`;
    /// non-local and global names must be resolved through the symbol
    /// table instead.
    pub fn var_index(&self, func: FuncId, name: &str) -> usize {
        let f = self.func(func);
        if let Some(i) = f
            .params
            .iter()
            .position(|&v| self.stack_var(v).var_name() == name)
        {
            return i;
        }
        if let Some(j) = f
            .locals
            .iter()
            .position(|&v| self.stack_var(v).var_name() == name)
        {
            return f.params.len() + j + 2;
        }
        panic!(
            "COMPILER ERROR: {} is not a var defined in function {}",
            name,
            f.func_name()
        );
    }

    /// Byte offset of the type-tag field in an object.
    pub fn type_tag_offset(&self) -> i32 {
        0
    }

    /// Byte offset of the size field in an object.
    pub fn object_size_offset(&self) -> i32 {
        self.word_size as i32
    }

    /// Byte offset of the dispatch-table pointer in an object.
    pub fn dispatch_table_offset(&self) -> i32 {
        2 * self.word_size as i32
    }

    /// Byte offset of the attribute `attr_name` in an instance of the
    /// class `class`.
    pub fn attr_offset(&self, class: ClassId, attr_name: &str) -> i32 {
        let class = self.class(class);
        let index = class.attribute_index(attr_name).unwrap_or_else(|| {
            panic!(
                "COMPILER ERROR: class {} has no attribute {}",
                class.class_name(),
                attr_name
            )
        });
        (self.word_size * (HEADER_SIZE + index)) as i32
    }

    /// Byte offset of the method `method_name` in the dispatch table of
    /// the class `class`.
    pub fn method_offset(&self, class: ClassId, method_name: &str) -> i32 {
        let class = self.class(class);
        let index = class.method_index(method_name).unwrap_or_else(|| {
            panic!(
                "COMPILER ERROR: class {} has no method {}",
                class.class_name(),
                method_name
            )
        });
        (self.word_size * index) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_func(info: &mut ProgramInfo, params: &[&str], locals: &[&str]) -> FuncId {
        let root = info.symbols.root();
        let func = info.make_func(
            "f",
            0,
            ValueType::none_type(),
            root,
            None,
            FuncEmitter::UserDefined,
        );
        for name in params {
            let var = info.make_stack_var(name, ValueType::int_type(), None, func);
            info.add_param(func, var);
        }
        for name in locals {
            let var = info.make_stack_var(name, ValueType::int_type(), Some(Literal::Int(0)), func);
            info.add_local(func, var);
        }
        func
    }

    #[test]
    fn test_base_name() {
        let f = FuncInfo::new(
            "A.m",
            0,
            ValueType::none_type(),
            ScopeId::default(),
            None,
            FuncEmitter::UserDefined,
        );
        assert_eq!(f.base_name(), "m");
        assert_eq!(f.code_label().name(), "$A.m");

        let g = FuncInfo::new(
            "top",
            0,
            ValueType::int_type(),
            ScopeId::default(),
            None,
            FuncEmitter::UserDefined,
        );
        assert_eq!(g.base_name(), "top");
    }

    #[test]
    fn test_var_index_layout() {
        let mut info = ProgramInfo::empty();
        let func = sample_func(&mut info, &["a", "b"], &["x", "y", "z"]);

        assert_eq!(info.var_index(func, "a"), 0);
        assert_eq!(info.var_index(func, "b"), 1);
        // Locals start after the params and the two reserved slots.
        assert_eq!(info.var_index(func, "x"), 4);
        assert_eq!(info.var_index(func, "y"), 5);
        assert_eq!(info.var_index(func, "z"), 6);
    }

    #[test]
    #[should_panic(expected = "not a var defined in function")]
    fn test_var_index_unknown_name_panics() {
        let mut info = ProgramInfo::empty();
        let func = sample_func(&mut info, &["a"], &[]);
        info.var_index(func, "missing");
    }

    #[test]
    fn test_method_override_keeps_slot() {
        let mut info = ProgramInfo::empty();
        let root = info.symbols.root();
        let init = info.make_func(
            "object.__init__",
            0,
            ValueType::none_type(),
            root,
            None,
            FuncEmitter::Runtime,
        );
        let base_f = info.make_func(
            "A.f",
            0,
            ValueType::none_type(),
            root,
            None,
            FuncEmitter::UserDefined,
        );
        let override_f = info.make_func(
            "B.f",
            0,
            ValueType::none_type(),
            root,
            None,
            FuncEmitter::UserDefined,
        );

        let a = info.make_class("A", 4, None);
        info.class_mut(a).add_method("__init__", init);
        info.class_mut(a).add_method("f", base_f);

        let b = info.make_class("B", 5, Some(a));
        info.class_mut(b).add_method("f", override_f);

        assert_eq!(info.class(a).method_index("f"), info.class(b).method_index("f"));
        let slot = info.class(a).method_index("f").unwrap();
        assert_eq!(info.class(b).methods[slot].func, override_f);
        assert_eq!(info.class(b).methods.len(), info.class(a).methods.len());
    }

    #[test]
    fn test_attribute_layout_stable_under_inheritance() {
        let mut info = ProgramInfo::empty();
        let a = info.make_class("A", 4, None);
        info.class_mut(a)
            .add_attribute(AttrInfo::new("x", Some(ValueType::int_type()), Some(Literal::Int(0))));

        let b = info.make_class("B", 5, Some(a));
        info.class_mut(b)
            .add_attribute(AttrInfo::new("y", Some(ValueType::int_type()), Some(Literal::Int(0))));

        assert_eq!(info.class(a).attribute_index("x"), info.class(b).attribute_index("x"));
        assert_eq!(info.class(b).attribute_index("y"), Some(1));
        assert_eq!(info.class(a).attribute_index("y"), None);
    }

    #[test]
    fn test_offsets() {
        let mut info = ProgramInfo::empty();
        let a = info.make_class("A", 4, None);
        info.class_mut(a)
            .add_attribute(AttrInfo::new("x", Some(ValueType::int_type()), Some(Literal::Int(0))));
        info.class_mut(a)
            .add_attribute(AttrInfo::new("y", Some(ValueType::int_type()), Some(Literal::Int(0))));

        assert_eq!(info.type_tag_offset(), 0);
        assert_eq!(info.object_size_offset(), 4);
        assert_eq!(info.dispatch_table_offset(), 8);
        assert_eq!(info.attr_offset(a, "x"), 12);
        assert_eq!(info.attr_offset(a, "y"), 16);
    }

    #[test]
    fn test_class_labels() {
        let class = ClassInfo::new("Point", 4);
        assert_eq!(class.prototype_label().name(), "$Point$prototype");
        assert_eq!(
            class.dispatch_table_label().map(Label::name),
            Some("$Point$dispatchTable")
        );
    }
}
