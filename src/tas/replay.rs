//! Replay (§6, C6): reconstruct machine state at an arbitrary cycle from a
//! [`TasFile`]'s snapshots and events, the read side of the time-travel
//! debugger the recorder's hybrid strategy exists to make cheap.

use crate::tas::event::EventKind;
use crate::tas::format::{RegisterFile, Snapshot, TasFile};

/// The reconstructed machine state at a target cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayedState {
    pub cycle: u64,
    pub registers: RegisterFile,
    pub flags: u8,
    pub memory: Vec<u8>,
}

/// Reconstruct machine state at `target_cycle`: start from the latest
/// snapshot at or before it (or an all-zero state if none exists) and apply
/// every event strictly after that snapshot up to and including
/// `target_cycle`, in order.
pub fn replay(file: &TasFile, target_cycle: u64) -> ReplayedState {
    let baseline = file
        .snapshots
        .iter()
        .filter(|s| s.cycle <= target_cycle)
        .max_by_key(|s| s.cycle);

    let (mut registers, mut flags, mut memory, start_cycle) = match baseline {
        Some(Snapshot { cycle, registers, flags, memory }) => {
            (*registers, *flags, memory.clone(), *cycle)
        }
        None => (RegisterFile::default(), 0, Vec::new(), 0),
    };

    for event in file
        .events
        .iter()
        .filter(|e| e.cycle > start_cycle && e.cycle <= target_cycle)
    {
        apply(&mut registers, &mut flags, &mut memory, &event.kind);
    }

    ReplayedState {
        cycle: target_cycle,
        registers,
        flags,
        memory,
    }
}

fn apply(registers: &mut RegisterFile, _flags: &mut u8, memory: &mut Vec<u8>, kind: &EventKind) {
    match kind {
        EventKind::MemoryWrite { addr, value } => write_byte(memory, *addr, *value),
        EventKind::SmcPatch { addr, new, .. } => write_byte(memory, *addr, *new),
        EventKind::RegisterWrite { register, value } => set_register(registers, register, *value),
        // I/O and interrupt-taken events are observable side effects with no
        // memory/register-visible trace of their own (§6) — whatever they
        // touched reaches replayed state through the MemoryWrite/
        // RegisterWrite events they trigger, not directly here.
        EventKind::IoOut { .. } | EventKind::IoIn { .. } | EventKind::InterruptTaken { .. } => {}
    }
}

fn write_byte(memory: &mut Vec<u8>, addr: u16, value: u8) {
    let addr = addr as usize;
    if addr >= memory.len() {
        memory.resize(addr + 1, 0);
    }
    memory[addr] = value;
}

fn set_register(registers: &mut RegisterFile, name: &str, value: u16) {
    match name {
        "af" => registers.af = value,
        "bc" => registers.bc = value,
        "de" => registers.de = value,
        "hl" => registers.hl = value,
        "af'" => registers.af_shadow = value,
        "bc'" => registers.bc_shadow = value,
        "de'" => registers.de_shadow = value,
        "hl'" => registers.hl_shadow = value,
        "ix" => registers.ix = value,
        "iy" => registers.iy = value,
        "sp" => registers.sp = value,
        "pc" => registers.pc = value,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tas::event::Event;

    #[test]
    fn replay_with_no_preceding_snapshot_starts_from_zeroed_state() {
        let mut file = TasFile::new();
        file.events.push(Event::new(1, EventKind::MemoryWrite { addr: 2, value: 7 }));
        let state = replay(&file, 1);
        assert_eq!(state.memory[2], 7);
        assert_eq!(state.registers, RegisterFile::default());
    }

    #[test]
    fn replay_applies_events_after_the_latest_eligible_snapshot() {
        let mut file = TasFile::new();
        file.snapshots.push(Snapshot {
            cycle: 10,
            registers: RegisterFile { hl: 0x1234, ..RegisterFile::default() },
            flags: 0,
            memory: vec![0u8; 4],
        });
        file.events.push(Event::new(11, EventKind::RegisterWrite { register: "hl".into(), value: 0x5678 }));
        file.events.push(Event::new(15, EventKind::MemoryWrite { addr: 1, value: 9 }));
        // an event past the target cycle must not be applied
        file.events.push(Event::new(20, EventKind::MemoryWrite { addr: 1, value: 99 }));

        let state = replay(&file, 15);
        assert_eq!(state.registers.hl, 0x5678);
        assert_eq!(state.memory[1], 9);
    }

    #[test]
    fn replay_picks_the_latest_snapshot_at_or_before_the_target() {
        let mut file = TasFile::new();
        file.snapshots.push(Snapshot {
            cycle: 0,
            registers: RegisterFile::default(),
            flags: 0,
            memory: vec![0u8; 1],
        });
        file.snapshots.push(Snapshot {
            cycle: 10,
            registers: RegisterFile { bc: 42, ..RegisterFile::default() },
            flags: 0,
            memory: vec![0u8; 1],
        });
        let state = replay(&file, 12);
        assert_eq!(state.registers.bc, 42);
    }

    #[test]
    fn an_smc_patch_event_writes_its_new_byte_to_memory() {
        let mut file = TasFile::new();
        file.events.push(Event::new(1, EventKind::SmcPatch { addr: 3, old: 0, new: 0xaa }));
        let state = replay(&file, 1);
        assert_eq!(state.memory[3], 0xaa);
    }
}
