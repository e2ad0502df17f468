//! Output data model: digitized hits and their truth linkage.

use crate::geom::{StrawId, Vec3};
use crate::step::StepRef;

/// One digitized hit: per-end TDC and TOT values plus the ADC waveform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digi {
    pub straw: StrawId,
    /// TDC counts, indexed by end.
    pub tdc: [u16; 2],
    /// Time-over-threshold counts, indexed by end.
    pub tot: [u16; 2],
    /// Digitized ADC samples.
    pub adc: Vec<u16>,
}

/// Truth record describing the digi at the same index.
#[derive(Debug, Clone, PartialEq)]
pub struct DigiTruth {
    pub straw: StrawId,
    /// Arrival time of the triggering cluster per end (ns, folded).
    pub end_time: [f64; 2],
    /// Ionization position of that cluster per end.
    pub cluster_pos: [Vec3; 2],
    /// Folded creation time of that cluster's parent step per end (ns).
    pub cluster_time: [f64; 2],
    /// Earliest contributing step per end.
    pub step: [Option<StepRef>; 2],
    /// All steps with a cluster inside the sampled ADC window.
    pub steps_in_window: Vec<StepRef>,
}

/// Per-event digitization output.
///
/// The collections are index-aligned: `truth[i]` and `step_links[i]`
/// describe `digis[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigiOutput {
    pub digis: Vec<Digi>,
    pub truth: Vec<DigiTruth>,
    /// Deduplicated contributing steps of the two trigger crossings.
    pub step_links: Vec<Vec<StepRef>>,
}
