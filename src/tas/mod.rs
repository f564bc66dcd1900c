//! C6 — cycle-accurate recording, the TAS file format, and determinism
//! detection (§6).

pub mod determinism;
pub mod event;
pub mod format;
pub mod recorder;
pub mod replay;

pub use determinism::{compare, check_internal_consistency, DeterminismReport, Verdict};
pub use event::{delta_encode, Event, EventKind};
pub use format::{RegisterFile, Snapshot, StorageFormat, TasFile};
pub use recorder::TasRecorder;
pub use replay::{replay, ReplayedState};
