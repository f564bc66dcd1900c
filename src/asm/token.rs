//! Line tokenizer for the ASM peephole (§4.11, Supplemented).
//!
//! Lexes each line into structured form *before* any regex pattern runs, so
//! patterns match the reconstructed canonical form rather than raw text.
//! This resolves the ambiguity flagged in §9 about regexes over-matching
//! text that only happens to look like an instruction inside a comment.

use crate::common::{intern, Id};

/// One assembly operand: a register/indirect-register name, an immediate,
/// or a symbolic reference (label or constant name).
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Reg(Id),
    Imm(i64),
    Symbol(Id),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Imm(n) => write!(f, "#{n}"),
            Operand::Symbol(s) => write!(f, "{s}"),
        }
    }
}

/// One tokenized line of assembly.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Line {
    pub label: Option<Id>,
    pub mnemonic: Option<Id>,
    pub operands: Vec<Operand>,
    pub comment: Option<String>,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.label.is_none() && self.mnemonic.is_none() && self.comment.is_none()
    }

    pub fn is_instruction(&self, mnemonic: &str) -> bool {
        self.mnemonic.map(|m| m.as_str().eq_ignore_ascii_case(mnemonic)).unwrap_or(false)
    }

    /// Re-render to the canonical text pattern replacements are written
    /// against: `LABEL: MNEMONIC op1,op2 ; comment`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(l) = self.label {
            out.push_str(&format!("{l}:"));
            if self.mnemonic.is_some() {
                out.push(' ');
            }
        }
        if let Some(m) = self.mnemonic {
            out.push_str(&m.to_string());
            if !self.operands.is_empty() {
                out.push(' ');
                let ops: Vec<String> = self.operands.iter().map(|o| o.to_string()).collect();
                out.push_str(&ops.join(","));
            }
        }
        if let Some(c) = &self.comment {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("; ");
            out.push_str(c);
        }
        out
    }
}

/// Tokenize a full buffer, one [`Line`] per source line.
pub fn tokenize(buffer: &str) -> Vec<Line> {
    buffer.lines().map(tokenize_line).collect()
}

/// Tokenize a single line of Z80 assembly.
pub fn tokenize_line(raw: &str) -> Line {
    let (code, comment) = split_comment(raw);
    let code = code.trim();
    if code.is_empty() {
        return Line {
            comment,
            ..Line::default()
        };
    }

    let (label, rest) = split_label(code);
    let rest = rest.trim();
    if rest.is_empty() {
        return Line {
            label,
            comment,
            ..Line::default()
        };
    }

    let mut parts = rest.splitn(2, char::is_whitespace);
    let mnemonic = parts.next().map(|m| intern(m.to_uppercase()));
    let operand_str = parts.next().unwrap_or("").trim();
    let operands = if operand_str.is_empty() {
        Vec::new()
    } else {
        operand_str.split(',').map(|s| parse_operand(s.trim())).collect()
    };

    Line {
        label,
        mnemonic,
        operands,
        comment,
    }
}

fn split_comment(raw: &str) -> (&str, Option<String>) {
    match raw.find(';') {
        Some(i) => (&raw[..i], Some(raw[i + 1..].trim().to_string())),
        None => (raw, None),
    }
}

fn split_label(code: &str) -> (Option<Id>, &str) {
    match code.find(':') {
        Some(i) => (Some(intern(code[..i].trim())), &code[i + 1..]),
        None => (None, code),
    }
}

fn parse_operand(s: &str) -> Operand {
    if let Some(stripped) = s.strip_prefix('#') {
        if let Ok(n) = parse_int(stripped) {
            return Operand::Imm(n);
        }
    }
    if let Ok(n) = parse_int(s) {
        return Operand::Imm(n);
    }
    if is_register_name(s) {
        return Operand::Reg(intern(s.to_uppercase()));
    }
    Operand::Symbol(intern(s))
}

fn parse_int(s: &str) -> Result<i64, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16);
    }
    if let Some(hex) = s.strip_suffix('h').or_else(|| s.strip_suffix('H')) {
        return i64::from_str_radix(hex, 16);
    }
    s.parse::<i64>()
}

fn is_register_name(s: &str) -> bool {
    matches!(
        s.to_uppercase().as_str(),
        "A" | "B"
            | "C"
            | "D"
            | "E"
            | "H"
            | "L"
            | "F"
            | "BC"
            | "DE"
            | "HL"
            | "AF"
            | "AF'"
            | "SP"
            | "IX"
            | "IY"
            | "(HL)"
            | "(BC)"
            | "(DE)"
            | "(IX)"
            | "(IY)"
            | "(SP)"
            | "NZ"
            | "Z"
            | "NC"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_plain_instruction() {
        let line = tokenize_line("    LD A,0");
        assert_eq!(line.mnemonic, Some(intern("LD")));
        assert_eq!(line.operands, vec![Operand::Reg(intern("A")), Operand::Imm(0)]);
    }

    #[test]
    fn separates_label_and_comment() {
        let line = tokenize_line("loop: ADD HL,HL ; double");
        assert_eq!(line.label, Some(intern("loop")));
        assert_eq!(line.mnemonic, Some(intern("ADD")));
        assert_eq!(line.comment.as_deref(), Some("double"));
    }

    #[test]
    fn a_comment_only_line_has_no_mnemonic() {
        let line = tokenize_line("; ADD HL,HL looks like code but isn't");
        assert!(line.mnemonic.is_none());
        assert!(line.comment.is_some());
    }

    #[test]
    fn render_round_trips_a_canonical_form() {
        let line = tokenize_line("    INC B");
        assert_eq!(line.render(), "INC B");
    }
}
