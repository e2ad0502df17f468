//! Error type for the digitization pipeline.

use thiserror::Error;

use crate::geom::StrawId;

/// Fatal digitization errors.
///
/// Empty results — no crossings, no coincidence, dead straws, blanked steps —
/// are normal outcomes, not errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    /// The event transport delivered no step collections at all.
    #[error("no step collections supplied for digitization")]
    NoStepCollections,
    /// A randomized draw or waveform sample fed a non-finite value into the
    /// digitizer. The physics models guarantee finiteness for finite inputs,
    /// so this is an internal invariant violation.
    #[error("non-finite voltage or time while digitizing straw {0}")]
    NonFinite(StrawId),
}

pub type SimResult<T> = Result<T, SimError>;
