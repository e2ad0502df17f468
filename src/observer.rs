//! Diagnostics observer: a pure side channel for per-stage aggregates.

use crate::digi::{Digi, DigiTruth};
use crate::geom::StrawId;

/// Aggregates of one step subdivision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDiag {
    pub straw: StrawId,
    pub n_clusters: usize,
    pub n_ions: u32,
    /// Summed pre-gain charge (pC).
    pub charge_sum: f64,
    pub step_length: f64,
    pub ionizing_edep: f64,
}

/// Aggregates of one drifted cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterDiag {
    pub straw: StrawId,
    pub gain: f64,
    /// Pre-gain cluster charge (pC).
    pub charge: f64,
    pub n_ions: u32,
}

/// Buffered diagnostic event. Events are replayed to the observer in
/// straw-id order, so serial and parallel runs observe identical sequences.
#[derive(Debug, Clone)]
pub enum DiagEvent {
    Step(StepDiag),
    Cluster(ClusterDiag),
}

/// Observer of the digitization pipeline.
///
/// All methods default to no-ops; implementations override what they care
/// about. Observers receive copies of intermediate values and cannot affect
/// the simulation outcome.
#[allow(unused_variables)]
pub trait DigiObserver {
    /// Called after a step is divided into ion clusters.
    fn on_step_divided(&mut self, diag: &StepDiag) {}
    /// Called after a cluster is drifted and amplified.
    fn on_cluster_drifted(&mut self, diag: &ClusterDiag) {}
    /// Called after a digi and its truth record are appended to the output.
    fn on_digi(&mut self, digi: &Digi, truth: &DigiTruth) {}
}

/// A [`DigiObserver`] that does nothing.
pub struct NoopObserver;

impl DigiObserver for NoopObserver {}
