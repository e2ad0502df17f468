//! Drift of an ion cluster to the wire and longitudinal propagation of the
//! arriving charge to the two wire ends.

use super::ionization::IonCluster;
use crate::geom::{Straw, StrawEnd};
use crate::physics::StrawPhysics;
use crate::rng::RandomStreams;

/// Charge arriving at the wire after transverse drift and avalanche gain.
#[derive(Debug, Clone, Copy)]
pub struct WireCharge {
    /// Post-gain charge (pC).
    pub charge: f64,
    /// Drift time relative to the ionization time (ns).
    pub time: f64,
    /// Transverse drift distance (mm).
    pub drift_distance: f64,
    /// Position along the wire relative to the center, signed by the wire
    /// direction (mm).
    pub wire_pos: f64,
}

/// Charge at one wire end after longitudinal propagation.
#[derive(Debug, Clone, Copy)]
pub struct WireEndCharge {
    pub charge: f64,
    /// Propagation delay (ns).
    pub time: f64,
    /// Distance from the collection point to the end (mm).
    pub wire_distance: f64,
}

/// Drift one cluster to the wire.
///
/// The drift distance is clamped to the straw's inner radius; the angular
/// (Lorentz) argument of the drift model stays at its fixed constant.
pub fn drift_cluster(
    straw: &Straw,
    cluster: &IonCluster,
    phys: &StrawPhysics,
    rng: &mut RandomStreams,
) -> WireCharge {
    let cpos = cluster.pos - straw.midpoint;
    let dd = cpos.perp_to(straw.direction).min(straw.inner_radius);
    let dphi = 0.0;
    let gain = phys.cluster_gain(rng, cluster.nion);
    WireCharge {
        charge: cluster.charge * gain,
        time: rng.gaussian(
            phys.drift_distance_to_time(dd, dphi),
            phys.drift_time_spread(dd, dphi),
        ),
        drift_distance: dd,
        wire_pos: cpos.dot(straw.direction),
    }
}

/// Propagate wire charge to one end.
///
/// Relies on `Straw::direction` pointing from the cal end toward the hv end.
/// The charge splits evenly between the two ends and attenuates with the
/// propagation distance; the delay is purely linear.
pub fn propagate_charge(
    straw: &Straw,
    wireq: &WireCharge,
    end: StrawEnd,
    phys: &StrawPhysics,
) -> WireEndCharge {
    let wdist = match end {
        StrawEnd::Hv => straw.half_length - wireq.wire_pos,
        StrawEnd::Cal => straw.half_length + wireq.wire_pos,
    };
    WireEndCharge {
        charge: 0.5 * wireq.charge * phys.propagation_attenuation(wdist),
        time: phys.propagation_time(wdist),
        wire_distance: wdist,
    }
}
