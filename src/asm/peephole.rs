//! ASM-level peephole (§4.11): a fixed ordered list of (name, regex,
//! replacement) rules applied to the buffer's canonical-form lines
//! ([`crate::asm::token`]), re-swept to a fixed point capped at
//! `PipelineConfig::max_asm_iterations` (default 5).

use regex::Regex;

use crate::asm::token::{tokenize, Line};
use crate::config::PipelineConfig;

/// What a matched window is replaced with: either new canonical-form lines,
/// or the original lines kept verbatim with a trailing annotation (for
/// patterns that are already optimal and exist only to suppress a
/// diagnostic false positive, e.g. `ADD HL,HL`).
enum Action {
    Replace(fn(&regex::Captures) -> Vec<String>),
    Annotate(&'static str),
}

struct AsmPattern {
    name: &'static str,
    /// How many canonical lines (joined by `\n`) the regex spans.
    window: usize,
    regex: Regex,
    action: Action,
}

fn patterns() -> Vec<AsmPattern> {
    vec![
        AsmPattern {
            name: "load-zero-to-xor",
            window: 1,
            regex: Regex::new(r"^LD (\w+),0$").unwrap(),
            action: Action::Replace(|c| vec![format!("XOR {0},{0}", &c[1])]),
        },
        AsmPattern {
            name: "add-one-to-inc",
            window: 1,
            regex: Regex::new(r"^ADD (\w+),1$").unwrap(),
            action: Action::Replace(|c| vec![format!("INC {}", &c[1])]),
        },
        AsmPattern {
            name: "sub-one-to-dec",
            window: 1,
            regex: Regex::new(r"^SUB (\w+),1$").unwrap(),
            action: Action::Replace(|c| vec![format!("DEC {}", &c[1])]),
        },
        AsmPattern {
            name: "add-hl-hl-fast-shift",
            window: 1,
            regex: Regex::new(r"^ADD HL,HL$").unwrap(),
            action: Action::Annotate("fast shift: HL*2"),
        },
        AsmPattern {
            name: "push-pop-cancel",
            window: 2,
            regex: Regex::new(r"^PUSH (BC|DE|HL)\nPOP \1$").unwrap(),
            action: Action::Replace(|_| vec![]),
        },
        AsmPattern {
            name: "ld-d-h-e-l-ex-drops-the-exchange",
            window: 3,
            regex: Regex::new(r"^LD D,H\nLD E,L\nEX DE,HL$").unwrap(),
            // DE already equals HL after the two LDs; exchanging it with HL
            // (unchanged, since DE==HL at that point) is a no-op on HL and
            // a no-op on DE. Dropping the EX keeps the same DE,HL result.
            action: Action::Replace(|_| vec!["LD D,H".to_string(), "LD E,L".to_string()]),
        },
        AsmPattern {
            name: "double-ex-de-hl-cancel",
            window: 2,
            regex: Regex::new(r"^EX DE,HL\nEX DE,HL$").unwrap(),
            action: Action::Replace(|_| vec![]),
        },
        AsmPattern {
            name: "scf-ccf-to-or-a",
            window: 2,
            regex: Regex::new(r"^SCF\nCCF$").unwrap(),
            action: Action::Replace(|_| vec!["OR A".to_string()]),
        },
        AsmPattern {
            name: "cp-zero-to-or-a",
            window: 1,
            regex: Regex::new(r"^CP 0$").unwrap(),
            action: Action::Replace(|_| vec!["OR A".to_string()]),
        },
        AsmPattern {
            name: "neg-neg-cancel",
            window: 2,
            regex: Regex::new(r"^NEG\nNEG$").unwrap(),
            action: Action::Replace(|_| vec![]),
        },
        AsmPattern {
            name: "ld-hl-imm-split-to-de",
            window: 3,
            regex: Regex::new(r"^LD HL,#(-?\d+)\nLD D,H\nLD E,L$").unwrap(),
            action: Action::Replace(|c| {
                vec![
                    format!("LD DE,#{}", &c[1]),
                    "LD H,D".to_string(),
                    "LD L,E".to_string(),
                ]
            }),
        },
        AsmPattern {
            name: "conditional-skip-inversion",
            window: 2,
            regex: Regex::new(r"^JR NZ,\$\+5\nJP (\w+)$").unwrap(),
            action: Action::Replace(|c| vec![format!("JP Z,{}", &c[1])]),
        },
        AsmPattern {
            name: "inc-sp-twice-stack-drop",
            window: 2,
            regex: Regex::new(r"^INC SP\nINC SP$").unwrap(),
            action: Action::Annotate("2-byte stack drop"),
        },
    ]
}

/// A match event recorded for the diagnostic collector (§4.14): which
/// pattern fired, and in which line range of the rewritten buffer.
#[derive(Clone, Debug)]
pub struct PeepholeMatch {
    pub pattern: &'static str,
    pub line: usize,
}

pub struct AsmPeephole {
    max_sweeps: usize,
}

impl AsmPeephole {
    pub fn new(config: &PipelineConfig) -> Self {
        AsmPeephole {
            max_sweeps: config.max_asm_iterations,
        }
    }

    /// Run the pattern table to a fixed point over `buffer`, returning the
    /// rewritten text and the match events observed along the way.
    pub fn rewrite(&self, buffer: &str) -> (String, Vec<PeepholeMatch>) {
        let patterns = patterns();
        let mut lines: Vec<String> = tokenize(buffer).iter().map(Line::render).collect();
        let mut events = Vec::new();

        for _ in 0..self.max_sweeps {
            let (next, swept_events, changed) = sweep_once(&lines, &patterns);
            events.extend(swept_events);
            lines = next;
            if !changed {
                break;
            }
        }
        (lines.join("\n"), events)
    }
}

fn sweep_once(lines: &[String], patterns: &[AsmPattern]) -> (Vec<String>, Vec<PeepholeMatch>, bool) {
    let mut out = Vec::with_capacity(lines.len());
    let mut events = Vec::new();
    let mut i = 0;
    let mut changed = false;
    while i < lines.len() {
        let mut matched = false;
        for pat in patterns {
            if i + pat.window > lines.len() {
                continue;
            }
            let window = lines[i..i + pat.window].join("\n");
            if let Some(caps) = pat.regex.captures(&window) {
                events.push(PeepholeMatch {
                    pattern: pat.name,
                    line: i,
                });
                match &pat.action {
                    Action::Replace(f) => {
                        out.extend(f(&caps));
                    }
                    Action::Annotate(note) => {
                        for (j, l) in lines[i..i + pat.window].iter().enumerate() {
                            if j == 0 {
                                out.push(format!("{l} ; {note}"));
                            } else {
                                out.push(l.clone());
                            }
                        }
                    }
                }
                i += pat.window;
                matched = true;
                changed = true;
                break;
            }
        }
        if !matched {
            out.push(lines[i].clone());
            i += 1;
        }
    }
    (out, events, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_zero_becomes_xor() {
        let peephole = AsmPeephole::new(&PipelineConfig::default());
        let (out, events) = peephole.rewrite("LD A,0");
        assert_eq!(out, "XOR A,A");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pattern, "load-zero-to-xor");
    }

    #[test]
    fn push_pop_same_register_cancels() {
        let peephole = AsmPeephole::new(&PipelineConfig::default());
        let (out, _) = peephole.rewrite("PUSH BC\nPOP BC");
        assert_eq!(out, "");
    }

    #[test]
    fn ld_d_h_e_l_ex_drops_the_trailing_exchange() {
        let peephole = AsmPeephole::new(&PipelineConfig::default());
        let (out, _) = peephole.rewrite("LD D,H\nLD E,L\nEX DE,HL");
        assert_eq!(out, "LD D,H\nLD E,L");
    }

    #[test]
    fn fast_shift_is_kept_and_annotated() {
        let peephole = AsmPeephole::new(&PipelineConfig::default());
        let (out, events) = peephole.rewrite("ADD HL,HL");
        assert_eq!(out, "ADD HL,HL ; fast shift: HL*2");
        assert_eq!(events[0].pattern, "add-hl-hl-fast-shift");
    }

    #[test]
    fn sweeps_to_a_fixed_point_across_cascading_matches() {
        let peephole = AsmPeephole::new(&PipelineConfig::default());
        let (out, _) = peephole.rewrite("SCF\nCCF");
        assert_eq!(out, "OR A");
    }
}
