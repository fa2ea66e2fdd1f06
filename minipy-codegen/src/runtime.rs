//! The runtime library binder
//!
//! The standard runtime routines are hand-written assembly fragments
//! embedded in the compiler binary. Before a fragment is appended to the
//! output, every occurrence of the placeholder pattern `STRING["..."]` is
//! rewritten to the label of the interned string constant with those
//! contents, interning it on first sight.
//!
//! The replacement is length-preserving: the label is right-padded with
//! spaces to the width of the placeholder so the hand-aligned comment
//! columns of the fragments survive rewriting.

use crate::constants::ConstantPool;
use regex::Regex;
use std::sync::OnceLock;

static STRING_LITERAL_RE: OnceLock<Regex> = OnceLock::new();

/// Pattern matching `STRING["..."]`.
fn string_literal_re() -> &'static Regex {
    STRING_LITERAL_RE.get_or_init(|| Regex::new(r#"STRING\["(.*?)"\]"#).unwrap())
}

/// The source text of the runtime routine named `name`, or `None` if the
/// resource store has no such routine.
pub(crate) fn library_source(name: &str) -> Option<&'static str> {
    match name {
        "alloc" => Some(include_str!("../runtime/alloc.s")),
        "alloc2" => Some(include_str!("../runtime/alloc2.s")),
        "abort" => Some(include_str!("../runtime/abort.s")),
        "heap.init" => Some(include_str!("../runtime/heap.init.s")),
        "print" => Some(include_str!("../runtime/print.s")),
        "len" => Some(include_str!("../runtime/len.s")),
        "input" => Some(include_str!("../runtime/input.s")),
        "object.__init__" => Some(include_str!("../runtime/object.__init__.s")),
        _ => None,
    }
}

/// Return `s` right-padded with spaces to `to_len` characters. Returns
/// `s` unchanged if it is already at least that long.
fn pad(s: &str, to_len: usize) -> String {
    let mut result = String::with_capacity(to_len.max(s.len()));
    result.push_str(s);
    while result.len() < to_len {
        result.push(' ');
    }
    result
}

/// Convert `STRING["..."]` notations in `source` to labels of string
/// constants, adding those constants to the pool.
pub(crate) fn convert_literals(source: &str, constants: &mut ConstantPool) -> String {
    let re = string_literal_re();
    let mut result = String::with_capacity(source.len());
    let mut last_end = 0;
    for caps in re.captures_iter(source) {
        let matched = caps.get(0).unwrap();
        let label = constants.get_str_constant(&caps[1]);
        result.push_str(&source[last_end..matched.start()]);
        result.push_str(&pad(label.name(), matched.len()));
        last_end = matched.end();
    }
    result.push_str(&source[last_end..]);
    result
}
