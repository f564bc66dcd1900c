//! The TAS cycle-event log (§6): one entry per externally-observable state
//! change, delta-cycle-encoded relative to the previous event so a long
//! idle stretch between memory writes costs only one extra integer, not a
//! full timestamp.

use serde::{Deserialize, Serialize};

/// One observable state change during recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    MemoryWrite { addr: u16, value: u8 },
    RegisterWrite { register: String, value: u16 },
    /// A TRUE-SMC/SMC patch applying at runtime — distinguished from a
    /// plain memory write so determinism detection (§6) can flag a
    /// mismatched patch address as a likely SMC bug rather than ordinary
    /// data divergence.
    SmcPatch { addr: u16, old: u8, new: u8 },
    IoOut { port: u16, value: u8 },
    IoIn { port: u16, value: u8 },
    InterruptTaken { vector: u8 },
}

/// One log entry: absolute cycle count plus the state change observed at
/// that cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub cycle: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(cycle: u64, kind: EventKind) -> Self {
        Event { cycle, kind }
    }

    /// The cycle delta against the previous event, for the binary format's
    /// delta-encoded event stream (§6).
    pub fn delta(&self, previous_cycle: u64) -> u64 {
        self.cycle.saturating_sub(previous_cycle)
    }
}

/// Encode a sequence of events as `(cycle, delta, kind)` triples; used by
/// both the binary writer and as the canonical ordering the determinism
/// detector compares against.
pub fn delta_encode(events: &[Event]) -> Vec<(u64, EventKind)> {
    let mut prev = 0u64;
    let mut out = Vec::with_capacity(events.len());
    for e in events {
        out.push((e.delta(prev), e.kind.clone()));
        prev = e.cycle;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_encoding_is_relative_to_the_previous_event() {
        let events = vec![
            Event::new(10, EventKind::MemoryWrite { addr: 0x4000, value: 1 }),
            Event::new(25, EventKind::MemoryWrite { addr: 0x4001, value: 2 }),
        ];
        let encoded = delta_encode(&events);
        assert_eq!(encoded[0].0, 10);
        assert_eq!(encoded[1].0, 15);
    }
}
