//! Error kinds for the core (§7).
//!
//! Only [`CoreError::Structural`] and [`CoreError::TasFormat`] are meant to
//! propagate out of a pass or file-format routine as `Err`. The remaining
//! variants exist so callers that *do* want to inspect a degraded outcome
//! (tests, diagnostics) can match on them, but passes handle them internally
//! by logging a [`log::warn!`] and returning `Ok` with no change applied or
//! a fallback in place — see each pass's module docs.

use crate::common::Id;

/// Errors raised anywhere in the core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An instruction references an unknown label, undefined register, or
    /// malformed opcode. Fatal; aborts the offending pass.
    #[error("structural error in function `{function}` at instruction {index}: {reason}")]
    Structural {
        function: Id,
        index: usize,
        reason: String,
    },

    /// Constant folding met a `/0` or `%0`. Folding is skipped for that
    /// instruction; the pass continues.
    #[error("division by zero folding function `{function}` at instruction {index}")]
    DivisionByZero { function: Id, index: usize },

    /// A callee exceeded the inline size threshold or recurses. The call
    /// site is silently skipped.
    #[error("inline budget exceeded for `{callee}` at call site in `{caller}`")]
    InlineBudget { caller: Id, callee: Id },

    /// The scheduler's dependency graph has a cycle, which should not
    /// happen for well-formed input. The scheduler falls back to the
    /// original instruction order.
    #[error("schedule infeasible in function `{function}`: dependency cycle detected")]
    ScheduleInfeasible { function: Id },

    /// A function declared non-recursive for SMC purposes was found to be
    /// recursive by call-graph analysis. `IsSMCEnabled` is forced off.
    #[error("function `{function}` claimed non-recursive but recursion was detected")]
    RecursionClaim { function: Id },

    /// An ASM regex rewrite produced a buffer that failed to re-tokenize.
    /// The substitution is reverted and the pattern is marked unsafe for
    /// the remainder of the session.
    #[error("pattern `{pattern}` misfired: {reason}")]
    PatternMisfire { pattern: String, reason: String },

    /// TAS file magic or version mismatch on load. Propagated to the
    /// caller; no partial parse is attempted.
    #[error("TAS format error: {0}")]
    TasFormat(String),

    /// Cost oscillated across the last four samples of the fixed-point
    /// loop. The loop stops and the current state is accepted.
    #[error("cost oscillation detected after pass `{pass}`, stopping at current state")]
    Oscillation { pass: String },

    /// I/O failure underlying a TAS or profile file operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure for the TAS JSON format or profile
    /// files.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary (de)serialization failure for the TAS binary payload.
    #[error("binary encoding error: {0}")]
    Bincode(#[from] bincode::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
