//! Time-ordered analog arrival records at the wire ends.

use super::drift::{drift_cluster, propagate_charge};
use super::ionization::divide_step;
use crate::electronics::StrawElectronics;
use crate::geom::{Straw, StrawEnd, StrawId, Vec3};
use crate::observer::{ClusterDiag, DiagEvent, StepDiag};
use crate::physics::StrawPhysics;
use crate::rng::RandomStreams;
use crate::step::{Step, StepRef};

/// Whether a cluster is a real arrival or a periodic wraparound duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    Primary,
    Ghost,
}

/// One analog arrival record at one wire end.
///
/// Never mutated after insertion into a sequence.
#[derive(Debug, Clone)]
pub struct StrawCluster {
    pub kind: ClusterKind,
    pub straw: StrawId,
    pub end: StrawEnd,
    /// Arrival time folded into the readout period (ns); ghosts carry the
    /// folded time shifted one period forward.
    pub time: f64,
    /// Charge at the end (pC).
    pub charge: f64,
    /// Transverse drift distance (mm).
    pub drift_distance: f64,
    /// Propagation distance to this end (mm).
    pub wire_distance: f64,
    /// Originating step.
    pub step: StepRef,
    /// Ionization position (mm).
    pub pos: Vec3,
    /// Folded creation time of the parent step (ns).
    pub ctime: f64,
}

impl StrawCluster {
    /// Wraparound duplicate shifted one full period forward.
    pub fn ghost(&self, period: f64) -> StrawCluster {
        StrawCluster {
            kind: ClusterKind::Ghost,
            time: self.time + period,
            ..self.clone()
        }
    }
}

/// Time-ordered cluster container for one straw end.
#[derive(Debug, Clone)]
pub struct ClusterSequence {
    end: StrawEnd,
    clusters: Vec<StrawCluster>,
}

impl ClusterSequence {
    pub fn new(end: StrawEnd) -> ClusterSequence {
        ClusterSequence {
            end,
            clusters: Vec::new(),
        }
    }

    pub fn end(&self) -> StrawEnd {
        self.end
    }

    pub fn clusters(&self) -> &[StrawCluster] {
        &self.clusters
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Insert preserving non-decreasing time order; equal times keep their
    /// insertion order.
    pub fn insert(&mut self, clust: StrawCluster) {
        let at = self.clusters.partition_point(|c| c.time <= clust.time);
        self.clusters.insert(at, clust);
    }

    /// Summed charge of all clusters at this end (pC).
    pub fn total_charge(&self) -> f64 {
        self.clusters.iter().map(|c| c.charge).sum()
    }
}

/// The two per-end sequences of one straw: the unit of digitization.
#[derive(Debug, Clone)]
pub struct StrawClusterSequencePair {
    straw: StrawId,
    seqs: [ClusterSequence; 2],
}

impl StrawClusterSequencePair {
    pub fn new(straw: StrawId) -> StrawClusterSequencePair {
        StrawClusterSequencePair {
            straw,
            seqs: [
                ClusterSequence::new(StrawEnd::Cal),
                ClusterSequence::new(StrawEnd::Hv),
            ],
        }
    }

    pub fn straw(&self) -> StrawId {
        self.straw
    }

    pub fn sequence(&self, end: StrawEnd) -> &ClusterSequence {
        &self.seqs[end.index()]
    }

    fn sequence_mut(&mut self, end: StrawEnd) -> &mut ClusterSequence {
        &mut self.seqs[end.index()]
    }
}

/// Drift and propagate every ion cluster of one step into the pair's two
/// sequences, folding times into the readout period and duplicating ghosts
/// near the period boundary.
///
/// Steps whose folded time falls inside the flash-blanking interval (within
/// the step time buffer) are skipped without simulation.
pub fn add_step(
    pair: &mut StrawClusterSequencePair,
    step_ref: StepRef,
    step: &Step,
    time_offset: f64,
    straw: &Straw,
    phys: &StrawPhysics,
    ele: &StrawElectronics,
    high_dedx: f64,
    step_time_buffer: f64,
    rng: &mut RandomStreams,
    diag: &mut Vec<DiagEvent>,
) {
    let clusters = divide_step(step, phys, high_dedx, rng);
    diag.push(DiagEvent::Step(StepDiag {
        straw: pair.straw(),
        n_clusters: clusters.len(),
        n_ions: clusters.iter().map(|c| c.nion).sum(),
        charge_sum: clusters.iter().map(|c| c.charge).sum(),
        step_length: step.step_length,
        ionizing_edep: step.ionizing_edep,
    }));
    let tstep = step.time + time_offset;
    let mbtime = ele.fold_time(tstep);
    // only folded times outside the flash blanking are worth simulating
    if !(mbtime > ele.flash_end - step_time_buffer || mbtime < ele.flash_start) {
        return;
    }
    for cluster in &clusters {
        let wireq = drift_cluster(straw, cluster, phys, rng);
        diag.push(DiagEvent::Cluster(ClusterDiag {
            straw: pair.straw(),
            gain: if cluster.charge > 0.0 {
                wireq.charge / cluster.charge
            } else {
                0.0
            },
            charge: cluster.charge,
            n_ions: cluster.nion,
        }));
        for end in StrawEnd::BOTH {
            let weq = propagate_charge(straw, &wireq, end, phys);
            let gtime = tstep + wireq.time + weq.time;
            let clust = StrawCluster {
                kind: ClusterKind::Primary,
                straw: pair.straw(),
                end,
                time: ele.fold_time(gtime),
                charge: weq.charge,
                drift_distance: wireq.drift_distance,
                wire_distance: weq.wire_distance,
                step: step_ref,
                pos: cluster.pos,
                ctime: mbtime,
            };
            // ghosts keep the waveform continuous across the period boundary
            let ghost = (clust.time < ele.flash_start + ele.waveform_buffer())
                .then(|| clust.ghost(ele.readout_period));
            let seq = pair.sequence_mut(end);
            seq.insert(clust);
            if let Some(ghost) = ghost {
                seq.insert(ghost);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(time: f64) -> StrawCluster {
        StrawCluster {
            kind: ClusterKind::Primary,
            straw: StrawId(0),
            end: StrawEnd::Cal,
            time,
            charge: 1.0e-3,
            drift_distance: 1.0,
            wire_distance: 500.0,
            step: StepRef {
                collection: 0,
                index: 0,
            },
            pos: Vec3::ZERO,
            ctime: time,
        }
    }

    #[test]
    fn insertion_preserves_time_order() {
        let mut seq = ClusterSequence::new(StrawEnd::Cal);
        for t in [500.0, 120.0, 870.0, 120.0, 33.0, 1500.0, 870.0] {
            seq.insert(cluster(t));
        }
        let times: Vec<f64> = seq.clusters().iter().map(|c| c.time).collect();
        let mut sorted = times.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(times, sorted);
    }

    fn setup() -> (Straw, StrawPhysics, StrawElectronics) {
        let straw = Straw {
            id: StrawId(0),
            midpoint: Vec3::ZERO,
            direction: Vec3::new(1.0, 0.0, 0.0),
            half_length: 600.0,
            active_half_length: 590.0,
            inner_radius: 2.5,
            neighbors: vec![],
            preamp_neighbors: vec![],
        };
        (straw, StrawPhysics::default(), StrawElectronics::default())
    }

    fn step_at(time: f64) -> Step {
        Step {
            straw: StrawId(0),
            position: Vec3::new(0.0, 0.5, 0.0),
            momentum: Vec3::new(100.0, 0.0, 0.0),
            step_length: 0.1,
            ionizing_edep: 1.0e-3,
            time,
            track: 1,
        }
    }

    #[test]
    fn blanked_step_adds_no_clusters() {
        let (straw, phys, ele) = setup();
        let mut pair = StrawClusterSequencePair::new(StrawId(0));
        let mut rng = RandomStreams::from_seed(6);
        let mut diag = Vec::new();
        // folded time right inside the blanking interval
        let step = step_at(ele.flash_start + 50.0);
        let step_ref = StepRef {
            collection: 0,
            index: 0,
        };
        add_step(
            &mut pair, step_ref, &step, 0.0, &straw, &phys, &ele, 1.0e-3, 100.0, &mut rng,
            &mut diag,
        );
        assert!(pair.sequence(StrawEnd::Cal).is_empty());
        assert!(pair.sequence(StrawEnd::Hv).is_empty());
    }

    #[test]
    fn live_step_fills_both_ends_in_order() {
        let (straw, phys, ele) = setup();
        let mut pair = StrawClusterSequencePair::new(StrawId(0));
        let mut rng = RandomStreams::from_seed(7);
        let mut diag = Vec::new();
        for (i, t) in [700.0, 650.0, 900.0].into_iter().enumerate() {
            add_step(
                &mut pair,
                StepRef {
                    collection: 0,
                    index: i as u32,
                },
                &step_at(t),
                0.0,
                &straw,
                &phys,
                &ele,
                1.0e-3,
                100.0,
                &mut rng,
                &mut diag,
            );
        }
        for end in StrawEnd::BOTH {
            let seq = pair.sequence(end);
            assert!(!seq.is_empty());
            let times: Vec<f64> = seq.clusters().iter().map(|c| c.time).collect();
            assert!(times.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn early_cluster_gets_a_ghost_one_period_later() {
        let (straw, phys, ele) = setup();
        let mut pair = StrawClusterSequencePair::new(StrawId(0));
        let mut rng = RandomStreams::from_seed(8);
        let mut diag = Vec::new();
        // a step folded just below flash_start survives the gate and lands
        // inside the ghost buffer
        let step = step_at(ele.flash_start - 30.0);
        add_step(
            &mut pair,
            StepRef {
                collection: 0,
                index: 0,
            },
            &step,
            0.0,
            &straw,
            &phys,
            &ele,
            1.0e-3,
            100.0,
            &mut rng,
            &mut diag,
        );
        let seq = pair.sequence(StrawEnd::Cal);
        let ghosts: Vec<&StrawCluster> = seq
            .clusters()
            .iter()
            .filter(|c| c.kind == ClusterKind::Ghost)
            .collect();
        assert!(!ghosts.is_empty());
        for g in ghosts {
            let primary = seq
                .clusters()
                .iter()
                .find(|c| c.kind == ClusterKind::Primary && c.step == g.step)
                .unwrap();
            assert!((g.time - primary.time - ele.readout_period).abs() < 1e-9);
        }
    }
}
