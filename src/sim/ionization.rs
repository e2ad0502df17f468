//! Charge subdivision of an energy-deposit step into ionization clusters.

use crate::geom::Vec3;
use crate::physics::StrawPhysics;
use crate::rng::RandomStreams;
use crate::step::Step;

/// A packet of ionization charge, before drift and amplification.
#[derive(Debug, Clone)]
pub struct IonCluster {
    pub pos: Vec3,
    /// Pre-gain charge (pC).
    pub charge: f64,
    pub nion: u32,
}

/// Split a step into ion clusters whose ion counts sum exactly to the
/// step's total electron count.
///
/// Steps shorter than the mean free path are below the resolution of the
/// subdivision and yield a single cluster at the step position. Longer
/// steps are subdivided with stochastic per-cluster ion counts, or with a
/// fixed mean-free-path-derived count for steps above the high-dE/dx cut;
/// cluster positions are drawn uniformly along the straight-line path
/// (curvature within one step is ignored).
pub fn divide_step(
    step: &Step,
    phys: &StrawPhysics,
    high_dedx: f64,
    rng: &mut RandomStreams,
) -> Vec<IonCluster> {
    let nele = phys.ion_count(step.ionizing_edep);
    let mut clusters = Vec::new();
    if step.step_length > phys.mean_free_path {
        // highly ionizing steps get a fixed count per cluster; others sample
        // the cluster-size distribution
        let fixed = if step.ionizing_edep / step.step_length < high_dedx {
            None
        } else {
            let per = (nele as f64 * phys.mean_free_path / step.step_length).round();
            Some((per as u32).max(1))
        };
        let dir = step.momentum.unit_or_zero();
        let mut niontot = 0u32;
        while niontot < nele {
            let mut nion = match fixed {
                Some(n) => n,
                None => phys.ions_per_cluster(rng.uniform()),
            };
            // truncate the last cluster to conserve the total exactly
            if niontot + nion > nele {
                nion = nele - niontot;
            }
            let charge = phys.ionization_charge(nion as f64 * phys.ionization_energy);
            let along = rng.uniform_in(0.0, step.step_length);
            clusters.push(IonCluster {
                pos: step.position + dir.scaled(along),
                charge,
                nion,
            });
            niontot += nion;
        }
    } else {
        clusters.push(IonCluster {
            pos: step.position,
            charge: phys.ionization_charge(step.ionizing_edep),
            nion: nele,
        });
    }
    clusters
}
