//! Error taxonomy for the simulation core (spec §7).
//!
//! Decoding outcomes (`DecodeDue`/`DecodeSdc`) are never represented here:
//! per §7 they are values returned from `decode` (`Outcome::Due`/`Outcome::Sdc`),
//! not exceptions. Everything in this enum is either a fatal construction-time
//! error or a locally-recoverable runtime condition.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EccSimError {
    /// Request for GF(2^m) with an `m` outside the hard-coded primitive
    /// polynomial table. Fatal to the codec constructor.
    #[error("GF(2^{0}) is not a supported field size")]
    UnsupportedField(u32),

    /// bitN/bitK/symR inconsistent, or codeword longer than 2^m - 1.
    #[error("codec shape mismatch: {0}")]
    CodecShapeMismatch(String),

    /// Retirement would exceed `maxRetiredBlkCount`. Recoverable: leave the
    /// fault in the operational list and continue.
    #[error("retirement budget exhausted: {retired}/{budget} blocks already retired")]
    OutOfRetirementBudget { retired: usize, budget: usize },

    /// Malformed line in `input_FIT.conf`. Recoverable: skip the line.
    #[error("malformed FIT input line {line}: {reason}")]
    FitInputParseError { line: usize, reason: String },

    /// `system-id` not present in the system catalog.
    #[error("unsupported system-id {0}")]
    UnsupportedSystemId(u32),

    /// CLI argument grammar violated (spec §6).
    #[error("usage error: {0}")]
    UsageError(String),

    /// `genRandomFault` invoked for a fault kind flagged "Not implemented"
    /// in the original source (spec §9, open question 2). Preserved as a
    /// fatal error, never a silent no-op.
    #[error("fault kind not implemented: {0}")]
    FaultKindNotImplemented(String),
}

pub type Result<T> = std::result::Result<T, EccSimError>;
