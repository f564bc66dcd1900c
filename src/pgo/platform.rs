//! The platform memory-map table (§6), keyed by [`crate::config::Target::tag`].
//! Twelve entries, one per supported 8-bit platform.

/// A named, ordered memory region within a platform's address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    pub name: &'static str,
    pub start: u16,
    pub end: u16,
    /// Whether accesses in this region lose cycles to contention (ULA/video
    /// bus arbitration and similar).
    pub contended: bool,
    /// How strongly hot code should prefer this region over others with the
    /// same `contended` value (§4.13): higher packs first. Video/attribute
    /// memory and OS-reserved regions sit at the bottom even when
    /// technically uncontended, since placing code there competes with data
    /// the platform itself needs live.
    pub priority: u8,
    /// Whether the region is reachable at the CPU's base cycle timing with
    /// no paging/bank-switch overhead beyond `contended`'s wait states.
    pub fast_access: bool,
}

/// One platform's timing and address-space shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlatformEntry {
    pub tag: &'static str,
    pub cycles_per_frame: u32,
    pub hz: f64,
    pub usable_cycles: u32,
    pub contended: bool,
    pub contention_loss_fraction: f64,
    pub regions: &'static [MemoryRegion],
}

const SPECTRUM_REGIONS: &[MemoryRegion] = &[
    MemoryRegion { name: "rom", start: 0x0000, end: 0x3FFF, contended: false, priority: 100, fast_access: true },
    MemoryRegion { name: "screen", start: 0x4000, end: 0x5AFF, contended: true, priority: 0, fast_access: false },
    MemoryRegion { name: "attrs", start: 0x5800, end: 0x5AFF, contended: true, priority: 0, fast_access: false },
    MemoryRegion { name: "ram", start: 0x5B00, end: 0xFFFF, contended: false, priority: 50, fast_access: true },
];

const PENTAGON_REGIONS: &[MemoryRegion] = &[
    MemoryRegion { name: "rom", start: 0x0000, end: 0x3FFF, contended: false, priority: 100, fast_access: true },
    MemoryRegion { name: "screen", start: 0x4000, end: 0x5AFF, contended: false, priority: 20, fast_access: true },
    MemoryRegion { name: "ram", start: 0x5B00, end: 0xFFFF, contended: false, priority: 50, fast_access: true },
];

const CPM_REGIONS: &[MemoryRegion] = &[
    MemoryRegion { name: "zero-page", start: 0x0000, end: 0x00FF, contended: false, priority: 30, fast_access: true },
    MemoryRegion { name: "tpa", start: 0x0100, end: 0xEFFF, contended: false, priority: 100, fast_access: true },
    MemoryRegion { name: "bdos-bios", start: 0xF000, end: 0xFFFF, contended: false, priority: 10, fast_access: true },
];

const MSX_REGIONS: &[MemoryRegion] = &[
    MemoryRegion { name: "bios-rom", start: 0x0000, end: 0x3FFF, contended: false, priority: 40, fast_access: true },
    MemoryRegion { name: "cartridge", start: 0x4000, end: 0xBFFF, contended: false, priority: 100, fast_access: true },
    MemoryRegion { name: "ram", start: 0xC000, end: 0xFFFF, contended: false, priority: 50, fast_access: true },
];

const AMSTRAD_REGIONS: &[MemoryRegion] = &[
    MemoryRegion { name: "rom", start: 0x0000, end: 0x3FFF, contended: false, priority: 100, fast_access: true },
    MemoryRegion { name: "ram", start: 0x4000, end: 0xFFFF, contended: false, priority: 60, fast_access: true },
];

const GENERIC_RAM_REGIONS: &[MemoryRegion] =
    &[MemoryRegion { name: "ram", start: 0x0000, end: 0xFFFF, contended: false, priority: 100, fast_access: true }];

const TABLE: &[PlatformEntry] = &[
    PlatformEntry { tag: "spectrum", cycles_per_frame: 69888, hz: 3_500_000.0, usable_cycles: 69888, contended: true, contention_loss_fraction: 0.18, regions: SPECTRUM_REGIONS },
    PlatformEntry { tag: "pentagon", cycles_per_frame: 71680, hz: 3_500_000.0, usable_cycles: 71680, contended: false, contention_loss_fraction: 0.0, regions: PENTAGON_REGIONS },
    PlatformEntry { tag: "scorpion", cycles_per_frame: 71680, hz: 3_500_000.0, usable_cycles: 71680, contended: true, contention_loss_fraction: 0.10, regions: SPECTRUM_REGIONS },
    PlatformEntry { tag: "kay", cycles_per_frame: 71680, hz: 3_500_000.0, usable_cycles: 71680, contended: true, contention_loss_fraction: 0.10, regions: SPECTRUM_REGIONS },
    PlatformEntry { tag: "profi", cycles_per_frame: 71680, hz: 3_500_000.0, usable_cycles: 71680, contended: true, contention_loss_fraction: 0.12, regions: SPECTRUM_REGIONS },
    PlatformEntry { tag: "atm", cycles_per_frame: 71680, hz: 3_500_000.0, usable_cycles: 71680, contended: false, contention_loss_fraction: 0.0, regions: SPECTRUM_REGIONS },
    PlatformEntry { tag: "timex", cycles_per_frame: 69888, hz: 3_500_000.0, usable_cycles: 69888, contended: true, contention_loss_fraction: 0.18, regions: SPECTRUM_REGIONS },
    PlatformEntry { tag: "sam", cycles_per_frame: 79872, hz: 6_000_000.0, usable_cycles: 79872, contended: true, contention_loss_fraction: 0.08, regions: GENERIC_RAM_REGIONS },
    PlatformEntry { tag: "msx", cycles_per_frame: 59736, hz: 3_579_545.0, usable_cycles: 59736, contended: false, contention_loss_fraction: 0.0, regions: MSX_REGIONS },
    PlatformEntry { tag: "msx2", cycles_per_frame: 59736, hz: 3_579_545.0, usable_cycles: 59736, contended: false, contention_loss_fraction: 0.0, regions: MSX_REGIONS },
    PlatformEntry { tag: "amstrad", cycles_per_frame: 79872, hz: 4_000_000.0, usable_cycles: 79872, contended: true, contention_loss_fraction: 0.06, regions: AMSTRAD_REGIONS },
    PlatformEntry { tag: "cpm", cycles_per_frame: 0, hz: 2_000_000.0, usable_cycles: 0, contended: false, contention_loss_fraction: 0.0, regions: CPM_REGIONS },
];

/// Look up a platform entry by its [`crate::config::Target::tag`] string.
pub fn lookup(tag: &str) -> Option<&'static PlatformEntry> {
    TABLE.iter().find(|p| p.tag == tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;

    #[test]
    fn every_target_tag_has_a_platform_entry() {
        for target in [
            Target::Spectrum, Target::Pentagon, Target::Scorpion, Target::Kay, Target::Profi,
            Target::Atm, Target::Timex, Target::Sam, Target::Msx, Target::Msx2, Target::Amstrad,
            Target::Cpm,
        ] {
            assert!(lookup(target.tag()).is_some(), "missing platform entry for {}", target.tag());
        }
    }

    #[test]
    fn contended_platforms_carry_a_nonzero_loss_fraction() {
        let spectrum = lookup("spectrum").unwrap();
        assert!(spectrum.contended);
        assert!(spectrum.contention_loss_fraction > 0.0);
    }

    #[test]
    fn screen_memory_ranks_below_rom_even_though_both_can_be_uncontended() {
        let pentagon = lookup("pentagon").unwrap();
        let rom = pentagon.regions.iter().find(|r| r.name == "rom").unwrap();
        let screen = pentagon.regions.iter().find(|r| r.name == "screen").unwrap();
        assert!(!rom.contended && !screen.contended);
        assert!(rom.priority > screen.priority);
    }
}
