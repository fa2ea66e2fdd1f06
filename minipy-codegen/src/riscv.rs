//! RISC-V assembly-language generation utilities
//!
//! `RiscvBackend` is an append-only sink of assembly text. It knows how to
//! format directives, labels, literals, and every instruction the
//! downstream emitters use, but it performs no semantic checking of
//! operands: an invalid combination is a bug in the caller, not here.

use crate::label::Label;
use std::fmt;

/// The word size in bytes for RISC-V 32-bit.
pub const WORD_SIZE: usize = 4;

/// The RISC-V registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Register {
    A0, A1, A2, A3, A4, A5, A6, A7,
    T0, T1, T2, T3, T4, T5, T6,
    S1, S2, S3, S4, S5, S6, S7, S8, S9, S10, S11,
    FP, SP, GP, RA, Zero,
}

impl Register {
    /// The register's name in assembly.
    pub fn name(self) -> &'static str {
        match self {
            Register::A0 => "a0",
            Register::A1 => "a1",
            Register::A2 => "a2",
            Register::A3 => "a3",
            Register::A4 => "a4",
            Register::A5 => "a5",
            Register::A6 => "a6",
            Register::A7 => "a7",
            Register::T0 => "t0",
            Register::T1 => "t1",
            Register::T2 => "t2",
            Register::T3 => "t3",
            Register::T4 => "t4",
            Register::T5 => "t5",
            Register::T6 => "t6",
            Register::S1 => "s1",
            Register::S2 => "s2",
            Register::S3 => "s3",
            Register::S4 => "s4",
            Register::S5 => "s5",
            Register::S6 => "s6",
            Register::S7 => "s7",
            Register::S8 => "s8",
            Register::S9 => "s9",
            Register::S10 => "s10",
            Register::S11 => "s11",
            Register::FP => "fp",
            Register::SP => "sp",
            Register::GP => "gp",
            Register::RA => "ra",
            Register::Zero => "zero",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Accumulator for assembly code output.
#[derive(Debug, Default)]
pub struct RiscvBackend {
    asm_text: String,
}

impl RiscvBackend {
    pub fn new() -> RiscvBackend {
        RiscvBackend::default()
    }

    /// The word size in bytes for this backend.
    pub fn word_size(&self) -> usize {
        WORD_SIZE
    }

    /// The text accumulated so far.
    pub fn text(&self) -> &str {
        &self.asm_text
    }

    /// Consume the backend and return the accumulated text.
    pub fn finish(self) -> String {
        self.asm_text
    }

    /// Emit `str` verbatim as one or more output lines. `str` should have
    /// no trailing newline.
    pub fn emit(&mut self, str: &str) {
        self.asm_text.push_str(str);
        self.asm_text.push('\n');
    }

    /// Emit instruction or directive `insn` along with `comment` as a
    /// one-line comment, if present.
    pub fn emit_insn(&mut self, insn: &str, comment: Option<&str>) {
        match comment {
            Some(comment) => self.emit(&format!("  {:<40} # {}", insn, comment)),
            None => self.emit(&format!("  {}", insn)),
        }
    }

    /// Emit a local label marker for `label`. Invoke only once per unique
    /// label.
    pub fn emit_local_label(&mut self, label: &Label, comment: Option<&str>) {
        match comment {
            Some(comment) => self.emit(&format!("{:<42} # {}", format!("{}:", label), comment)),
            None => self.emit(&format!("{}:", label)),
        }
    }

    /// Emit a global label marker for `label`. Invoke only once per unique
    /// label.
    pub fn emit_global_label(&mut self, label: &Label) {
        self.emit(&format!("\n.globl {}", label));
        self.emit(&format!("{}:", label));
    }

    /// Define `@name` to have the value `value`, where `value` is another
    /// symbol or a numeral rendered as text.
    pub fn define_sym_str(&mut self, name: &str, value: &str) {
        if let Some(stripped) = name.strip_prefix('@') {
            self.emit_insn(&format!(".equiv @{}, {}", stripped, value), None);
        } else {
            self.emit_insn(&format!(".equiv @{}, {}", name, value), None);
        }
    }

    /// Define `@name` to have the integer value `value`.
    pub fn define_sym(&mut self, name: &str, value: i32) {
        self.define_sym_str(name, &value.to_string());
    }

    /// Emit a data word containing `value` as an integer literal.
    pub fn emit_word_literal(&mut self, value: i32, comment: Option<&str>) {
        self.emit_insn(&format!(".word {}", value), comment);
    }

    /// Emit a data word containing the address `addr`, or 0 if `addr` is
    /// absent.
    pub fn emit_word_address(&mut self, addr: Option<&Label>, comment: Option<&str>) {
        match addr {
            Some(addr) => self.emit_insn(&format!(".word {}", addr), comment),
            None => self.emit_word_literal(0, comment),
        }
    }

    /// Emit `value` as a null-terminated ASCII string constant.
    pub fn emit_string_literal(&mut self, value: &str, comment: Option<&str>) {
        let quoted = value
            .replace('\\', "\\\\")
            .replace('\n', "\\n")
            .replace('\t', "\\t")
            .replace('"', "\\\"");
        self.emit_insn(&format!(".string \"{}\"", quoted), comment);
    }

    /// Mark the start of a data section.
    pub fn start_data(&mut self) {
        self.emit("\n.data");
    }

    /// Mark the start of a code/text section.
    pub fn start_code(&mut self) {
        self.emit("\n.text");
    }

    /// Align the next instruction/word in memory to a multiple of
    /// `2**pow` bytes.
    pub fn align_next(&mut self, pow: u32) {
        self.emit_insn(&format!(".align {}", pow), None);
    }

    /// Emit an ecall instruction.
    pub fn emit_ecall(&mut self, comment: Option<&str>) {
        self.emit_insn("ecall", comment);
    }

    /// Emit a load-address instruction: `rd` = address of `label`.
    pub fn emit_la(&mut self, rd: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("la {}, {}", rd, label), comment);
    }

    /// Emit a load-immediate pseudo-op to set `rd` to `imm`.
    pub fn emit_li(&mut self, rd: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("li {}, {}", rd, imm), comment);
    }

    /// Emit a load-upper-immediate instruction to set the upper 20 bits of
    /// `rd` to `imm`, where `0 <= imm < 2**20`.
    pub fn emit_lui(&mut self, rd: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("lui {}, {}", rd, imm), comment);
    }

    /// Emit a move instruction to set `rd` to the contents of `rs`.
    pub fn emit_mv(&mut self, rd: Register, rs: Register, comment: Option<&str>) {
        self.emit_insn(&format!("mv {}, {}", rd, rs), comment);
    }

    /// Emit a jump-register (computed jump) instruction to the address in
    /// `rs`.
    pub fn emit_jr(&mut self, rs: Register, comment: Option<&str>) {
        self.emit_insn(&format!("jr {}", rs), comment);
    }

    /// Emit an unconditional jump to `label`.
    pub fn emit_j(&mut self, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("j {}", label), comment);
    }

    /// Emit a jump-and-link instruction to `label`.
    pub fn emit_jal(&mut self, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("jal {}", label), comment);
    }

    /// Emit a computed-jump-and-link instruction to the address in `rs`.
    pub fn emit_jalr(&mut self, rs: Register, comment: Option<&str>) {
        self.emit_insn(&format!("jalr {}", rs), comment);
    }

    /// Emit an add-immediate instruction: `rd = rs + imm`, where
    /// `-2048 <= imm < 2048`.
    pub fn emit_addi(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("addi {}, {}, {}", rd, rs, imm), comment);
    }

    /// Emit an add-immediate instruction whose immediate is a symbolic
    /// constant expression such as `@.__int__` or `@x+4`.
    pub fn emit_addi_sym(&mut self, rd: Register, rs: Register, imm: &str, comment: Option<&str>) {
        self.emit_insn(&format!("addi {}, {}, {}", rd, rs, imm), comment);
    }

    /// Emit an add instruction: `rd = rs1 + rs2` mod 2**32.
    pub fn emit_add(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("add {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit a subtract instruction: `rd = rs1 - rs2` mod 2**32.
    pub fn emit_sub(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("sub {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit a multiply instruction: `rd = rs1 * rs2` mod 2**32.
    pub fn emit_mul(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("mul {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit a signed divide instruction rounding toward zero.
    pub fn emit_div(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("div {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit a remainder instruction consistent with `emit_div`.
    pub fn emit_rem(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("rem {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit an xor instruction: `rd = rs1 ^ rs2`.
    pub fn emit_xor(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("xor {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit an xor-immediate instruction: `rd = rs ^ imm`.
    pub fn emit_xori(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("xori {}, {}, {}", rd, rs, imm), comment);
    }

    /// Emit a bitwise and instruction: `rd = rs1 & rs2`.
    pub fn emit_and(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("and {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit a bitwise and-immediate instruction: `rd = rs & imm`.
    pub fn emit_andi(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("andi {}, {}, {}", rd, rs, imm), comment);
    }

    /// Emit a bitwise or instruction: `rd = rs1 | rs2`.
    pub fn emit_or(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("or {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit a bitwise or-immediate instruction: `rd = rs | imm`.
    pub fn emit_ori(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("ori {}, {}, {}", rd, rs, imm), comment);
    }

    /// Emit a logical left shift instruction: `rd = rs1 << (rs2 & 0x1f)`.
    pub fn emit_sll(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("sll {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit a logical left shift instruction: `rd = rs << (imm & 0x1f)`.
    pub fn emit_slli(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("slli {}, {}, {}", rd, rs, imm), comment);
    }

    /// Emit a logical right shift instruction: `rd = rs1 >> (rs2 & 0x1f)`.
    pub fn emit_srl(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("srl {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit a logical right shift instruction: `rd = rs >> (imm & 0x1f)`.
    pub fn emit_srli(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("srli {}, {}, {}", rd, rs, imm), comment);
    }

    /// Emit an arithmetic right shift instruction.
    pub fn emit_sra(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("sra {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit an arithmetic right shift by immediate instruction.
    pub fn emit_srai(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("srai {}, {}, {}", rd, rs, imm), comment);
    }

    /// Emit a load-word instruction: `rd = memory[rs + imm]:4`.
    pub fn emit_lw(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("lw {}, {}({})", rd, imm, rs), comment);
    }

    /// Emit a load-word instruction whose offset is a symbolic constant
    /// expression (see `emit_addi_sym`).
    pub fn emit_lw_sym(&mut self, rd: Register, rs: Register, imm: &str, comment: Option<&str>) {
        self.emit_insn(&format!("lw {}, {}({})", rd, imm, rs), comment);
    }

    /// Emit a load-word instruction for globals: `rd = memory[label]:4`.
    pub fn emit_lw_global(&mut self, rd: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("lw {}, {}", rd, label), comment);
    }

    /// Emit a store-word instruction: `memory[rs1 + imm]:4 = rs2`.
    pub fn emit_sw(&mut self, rs2: Register, rs1: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("sw {}, {}({})", rs2, imm, rs1), comment);
    }

    /// Emit a store-word instruction whose offset is a symbolic constant
    /// expression (see `emit_addi_sym`).
    pub fn emit_sw_sym(&mut self, rs2: Register, rs1: Register, imm: &str, comment: Option<&str>) {
        self.emit_insn(&format!("sw {}, {}({})", rs2, imm, rs1), comment);
    }

    /// Emit a store-word instruction for globals: `memory[label]:4 = rs`,
    /// using `tmp` as a scratch register.
    pub fn emit_sw_global(&mut self, rs: Register, label: &Label, tmp: Register, comment: Option<&str>) {
        self.emit_insn(&format!("sw {}, {}, {}", rs, label, tmp), comment);
    }

    /// Emit a load-byte instruction, sign-extending the byte loaded.
    pub fn emit_lb(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("lb {}, {}({})", rd, imm, rs), comment);
    }

    /// Emit a load-byte-unsigned instruction, zero-extending the byte
    /// loaded.
    pub fn emit_lbu(&mut self, rd: Register, rs: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("lbu {}, {}({})", rd, imm, rs), comment);
    }

    /// Emit a store-byte instruction: assigns the low-order byte of `rs2`.
    pub fn emit_sb(&mut self, rs2: Register, rs1: Register, imm: i32, comment: Option<&str>) {
        self.emit_insn(&format!("sb {}, {}({})", rs2, imm, rs1), comment);
    }

    /// Emit a branch-if-equal instruction.
    pub fn emit_beq(&mut self, rs1: Register, rs2: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("beq {}, {}, {}", rs1, rs2, label), comment);
    }

    /// Emit a branch-if-unequal instruction.
    pub fn emit_bne(&mut self, rs1: Register, rs2: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("bne {}, {}, {}", rs1, rs2, label), comment);
    }

    /// Emit a branch-if-greater-or-equal (signed) instruction.
    pub fn emit_bge(&mut self, rs1: Register, rs2: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("bge {}, {}, {}", rs1, rs2, label), comment);
    }

    /// Emit a branch-if-greater-or-equal (unsigned) instruction.
    pub fn emit_bgeu(&mut self, rs1: Register, rs2: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("bgeu {}, {}, {}", rs1, rs2, label), comment);
    }

    /// Emit a branch-if-less-than (signed) instruction.
    pub fn emit_blt(&mut self, rs1: Register, rs2: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("blt {}, {}, {}", rs1, rs2, label), comment);
    }

    /// Emit a branch-if-less-than (unsigned) instruction.
    pub fn emit_bltu(&mut self, rs1: Register, rs2: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("bltu {}, {}, {}", rs1, rs2, label), comment);
    }

    /// Emit a branch-if-zero instruction.
    pub fn emit_beqz(&mut self, rs: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("beqz {}, {}", rs, label), comment);
    }

    /// Emit a branch-if-not-zero instruction.
    pub fn emit_bnez(&mut self, rs: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("bnez {}, {}", rs, label), comment);
    }

    /// Emit a branch-if-less-than-zero instruction.
    pub fn emit_bltz(&mut self, rs: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("bltz {}, {}", rs, label), comment);
    }

    /// Emit a branch-if-greater-than-zero instruction.
    pub fn emit_bgtz(&mut self, rs: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("bgtz {}, {}", rs, label), comment);
    }

    /// Emit a branch-if-less-or-equal-to-zero instruction.
    pub fn emit_blez(&mut self, rs: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("blez {}, {}", rs, label), comment);
    }

    /// Emit a branch-if-greater-or-equal-to-zero instruction.
    pub fn emit_bgez(&mut self, rs: Register, label: &Label, comment: Option<&str>) {
        self.emit_insn(&format!("bgez {}, {}", rs, label), comment);
    }

    /// Emit a set-less-than instruction: `rd = 1 if rs1 < rs2 else 0`.
    pub fn emit_slt(&mut self, rd: Register, rs1: Register, rs2: Register, comment: Option<&str>) {
        self.emit_insn(&format!("slt {}, {}, {}", rd, rs1, rs2), comment);
    }

    /// Emit a set-if-zero instruction: `rd = 1 if rs == 0 else 0`.
    pub fn emit_seqz(&mut self, rd: Register, rs: Register, comment: Option<&str>) {
        self.emit_insn(&format!("seqz {}, {}", rd, rs), comment);
    }

    /// Emit a set-if-not-zero instruction: `rd = 1 if rs != 0 else 0`.
    pub fn emit_snez(&mut self, rd: Register, rs: Register, comment: Option<&str>) {
        self.emit_insn(&format!("snez {}, {}", rd, rs), comment);
    }
}
