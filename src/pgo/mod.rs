//! C7 — profile-guided layout feedback into the optimizer (§4.13, §6).

pub mod layout;
pub mod platform;
pub mod profile;

pub use layout::{plan, LayoutPlan, Placement, Temperature};
pub use platform::{lookup as lookup_platform, MemoryRegion, PlatformEntry};
pub use profile::Profile;
