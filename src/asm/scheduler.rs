//! ASM region reordering (§4.11, second mechanism): a dependency graph built
//! from Z80-specific register/flag/memory semantics, list-scheduled by
//! dependent count and cycle cost.

use crate::asm::cycles::base_cycles;
use crate::asm::token::{tokenize, Line, Operand};

const FLAGS: &str = "F";

/// Every register name a single 8-bit or 16-bit operand touches, expanded
/// to include its containing pair (writing `B` also touches `BC`) since the
/// Z80 exposes both views of the same physical storage.
fn footprint(name: &str) -> Vec<&'static str> {
    match name.to_uppercase().as_str() {
        "B" => vec!["B", "BC"],
        "C" => vec!["C", "BC"],
        "BC" => vec!["B", "C", "BC"],
        "D" => vec!["D", "DE"],
        "E" => vec!["E", "DE"],
        "DE" => vec!["D", "E", "DE"],
        "H" => vec!["H", "HL"],
        "L" => vec!["L", "HL"],
        "HL" => vec!["H", "L", "HL"],
        "A" => vec!["A", "AF"],
        "F" => vec!["F", "AF"],
        "AF" => vec!["A", "F", "AF"],
        "SP" => vec!["SP"],
        "IX" => vec!["IX"],
        "IY" => vec!["IY"],
        _ => vec![],
    }
}

fn is_conditional_branch(mnemonic: &str) -> bool {
    matches!(mnemonic, "JR" | "JP" | "CALL" | "RET")
}

fn is_flag_writer(mnemonic: &str) -> bool {
    matches!(
        mnemonic,
        "ADD" | "ADC" | "SUB" | "SBC" | "AND" | "OR" | "XOR" | "CP" | "INC" | "DEC" | "NEG" | "SCF"
            | "CCF" | "RLA" | "RLCA" | "RRA" | "RRCA" | "BIT"
    )
}

fn is_memory_operand(op: &Operand) -> bool {
    matches!(op, Operand::Reg(r) if r.starts_with('('))
}

/// Registers and memory this line reads, including an implicit `FLAGS` read
/// for conditional branches.
fn reads(line: &Line) -> Vec<String> {
    let mut out = Vec::new();
    let Some(mnemonic) = line.mnemonic else {
        return out;
    };
    let mnemonic = mnemonic.to_string();
    if is_conditional_branch(&mnemonic) && line.operands.len() > 1 {
        out.push(FLAGS.to_string());
    }
    let start = if mnemonic == "LD" { 1 } else { 0 };
    for op in line.operands.iter().skip(start) {
        if let Operand::Reg(r) = op {
            let name = r.trim_matches(|c| c == '(' || c == ')');
            out.extend(footprint(name).into_iter().map(String::from));
        }
    }
    // `LD (HL),A` reads HL as an address even though it's the destination slot.
    if let Some(Operand::Reg(r)) = line.operands.first() {
        if is_memory_operand(&Operand::Reg(*r)) {
            let name = r.trim_matches(|c| c == '(' || c == ')');
            out.extend(footprint(name).into_iter().map(String::from));
        }
    }
    out
}

/// Registers this line writes, including an implicit `FLAGS` write for
/// ALU-style opcodes.
fn writes(line: &Line) -> Vec<String> {
    let mut out = Vec::new();
    let Some(mnemonic) = line.mnemonic else {
        return out;
    };
    let mnemonic = mnemonic.to_string();
    if is_flag_writer(&mnemonic) {
        out.push(FLAGS.to_string());
    }
    if let Some(Operand::Reg(r)) = line.operands.first() {
        if !is_memory_operand(&Operand::Reg(*r)) {
            out.extend(footprint(r).into_iter().map(String::from));
        }
    }
    if mnemonic == "INC" || mnemonic == "DEC" {
        if let Some(Operand::Reg(r)) = line.operands.first() {
            out.extend(footprint(r).into_iter().map(String::from));
        }
    }
    out
}

fn touches_memory(line: &Line) -> bool {
    line.operands.iter().any(is_memory_operand)
}

fn is_region_boundary(line: &Line) -> bool {
    line.label.is_some()
        || line
            .mnemonic
            .map(|m| matches!(m.to_string().as_str(), "JR" | "JP" | "CALL" | "RET" | "DJNZ"))
            .unwrap_or(false)
}

struct Edge {
    before: usize,
    after: usize,
}

fn build_dependencies(region: &[Line]) -> Vec<Edge> {
    let mut edges = Vec::new();
    let mut last_writer: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut last_readers: std::collections::HashMap<String, Vec<usize>> = std::collections::HashMap::new();
    let mut last_memory_op: Option<usize> = None;

    for (i, line) in region.iter().enumerate() {
        for r in reads(line) {
            if let Some(&w) = last_writer.get(&r) {
                edges.push(Edge { before: w, after: i });
            }
            last_readers.entry(r).or_default().push(i);
        }
        for w in writes(line) {
            if let Some(readers) = last_readers.get(&w) {
                for &r in readers {
                    if r != i {
                        edges.push(Edge { before: r, after: i });
                    }
                }
            }
            if let Some(&pw) = last_writer.get(&w) {
                edges.push(Edge { before: pw, after: i });
            }
            last_writer.insert(w.clone(), i);
            last_readers.remove(&w);
        }
        if touches_memory(line) {
            if let Some(prev) = last_memory_op {
                edges.push(Edge { before: prev, after: i });
            }
            last_memory_op = Some(i);
        }
    }
    edges
}

/// Partition a token stream into reorderable regions split at labels and
/// control-flow lines (the control-flow line itself stays in its own
/// trailing, unscheduled slot).
fn partition_regions(lines: &[Line]) -> Vec<(Vec<Line>, Option<Line>)> {
    let mut regions = Vec::new();
    let mut current = Vec::new();
    for line in lines {
        if is_region_boundary(line) {
            if line.label.is_some() && line.mnemonic.is_none() {
                regions.push((std::mem::take(&mut current), None));
                current.push(line.clone());
                continue;
            }
            regions.push((std::mem::take(&mut current), Some(line.clone())));
            continue;
        }
        current.push(line.clone());
    }
    if !current.is_empty() {
        regions.push((current, None));
    }
    regions
}

fn schedule_region(region: &[Line]) -> Vec<Line> {
    let n = region.len();
    if n <= 1 {
        return region.to_vec();
    }
    let edges = build_dependencies(region);
    let dependents: Vec<usize> = (0..n)
        .map(|i| edges.iter().filter(|e| e.before == i).count())
        .collect();

    let mut scheduled = vec![false; n];
    let mut order = Vec::with_capacity(n);
    for _ in 0..n {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..n {
            if scheduled[i] {
                continue;
            }
            let ready = !edges.iter().any(|e| e.after == i && !scheduled[e.before]);
            if !ready {
                continue;
            }
            let mut priority = dependents[i] as f64 * 2.0 + base_cycles(&region[i]) as f64 * 0.1;
            if touches_memory(&region[i]) {
                priority += 3.0;
            }
            if best.map(|(_, p)| priority > p).unwrap_or(true) {
                best = Some((i, priority));
            }
        }
        let (chosen, _) = best.expect("acyclic region always has a ready instruction");
        scheduled[chosen] = true;
        order.push(region[chosen].clone());
    }
    order
}

/// Reorder an assembly buffer region by region, respecting Z80 register,
/// flag, and memory dependencies (§4.11).
pub fn reorder(buffer: &str) -> String {
    let lines = tokenize(buffer);
    let regions = partition_regions(&lines);
    let mut out = Vec::new();
    for (body, boundary) in regions {
        out.extend(schedule_region(&body).iter().map(Line::render));
        if let Some(b) = boundary {
            out.push(b.render());
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_loads_may_be_reordered_but_dependents_are_not() {
        let input = "LD B,1\nLD C,2\nADD A,B";
        let output = reorder(input);
        let lines: Vec<&str> = output.lines().collect();
        let add_pos = lines.iter().position(|l| l.starts_with("ADD")).unwrap();
        let b_pos = lines.iter().position(|l| *l == "LD B,1").unwrap();
        assert!(b_pos < add_pos);
    }

    #[test]
    fn a_label_starts_a_new_region() {
        let input = "LD A,1\nloop:\nLD B,2";
        let output = reorder(input);
        assert!(output.contains("loop:"));
    }
}
