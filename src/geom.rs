//! Straw geometry and the read-only lookup services the digitizer consumes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Add, Sub};

/// Minimal 3-vector for positions, momenta and wire directions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Vec3 {
        Vec3 { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn scaled(self, s: f64) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    /// Unit vector, or zero for a vector with no length.
    pub fn unit_or_zero(self) -> Vec3 {
        let n = self.norm();
        if n > 0.0 { self.scaled(1.0 / n) } else { Vec3::ZERO }
    }

    /// Magnitude of the component perpendicular to a unit axis.
    pub fn perp_to(self, axis: Vec3) -> f64 {
        let along = self.dot(axis);
        (self.dot(self) - along * along).max(0.0).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// Identifier of one straw channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrawId(pub u16);

impl fmt::Display for StrawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two readout ends of a straw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrawEnd {
    /// Calibration-side end.
    Cal = 0,
    /// High-voltage end.
    Hv = 1,
}

impl StrawEnd {
    pub const BOTH: [StrawEnd; 2] = [StrawEnd::Cal, StrawEnd::Hv];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> StrawEnd {
        match self {
            StrawEnd::Cal => StrawEnd::Hv,
            StrawEnd::Hv => StrawEnd::Cal,
        }
    }
}

/// Geometry of a single straw.
///
/// `direction` must be a unit vector pointing from the cal end toward the hv
/// end; the end-distance computation in the propagation model relies on this
/// convention.
#[derive(Debug, Clone)]
pub struct Straw {
    pub id: StrawId,
    /// Wire center (mm, detector frame).
    pub midpoint: Vec3,
    /// Unit wire direction, cal end toward hv end.
    pub direction: Vec3,
    /// Full wire half-length (mm).
    pub half_length: f64,
    /// Half-length of the gas-sensitive region (mm).
    pub active_half_length: f64,
    /// Inner radius of the straw tube (mm).
    pub inner_radius: f64,
    /// Capacitively coupled neighbor straws.
    pub neighbors: Vec<StrawId>,
    /// Straws sharing front-end electronics.
    pub preamp_neighbors: Vec<StrawId>,
}

/// Read-only geometry lookup service.
pub trait Tracker {
    fn straw(&self, id: StrawId) -> Option<&Straw>;

    fn straw_exists(&self, id: StrawId) -> bool {
        self.straw(id).is_some()
    }
}

/// Simple in-memory [`Tracker`].
#[derive(Debug, Default)]
pub struct StrawMap {
    straws: BTreeMap<StrawId, Straw>,
}

impl StrawMap {
    pub fn new() -> StrawMap {
        StrawMap::default()
    }

    pub fn insert(&mut self, straw: Straw) {
        self.straws.insert(straw.id, straw);
    }
}

impl Tracker for StrawMap {
    fn straw(&self, id: StrawId) -> Option<&Straw> {
        self.straws.get(&id)
    }
}

/// Registry of dead channels, refreshed once per run.
///
/// A straw can be dead outright or dead beyond some distance from the wire
/// center; `is_alive` is queried with the absolute longitudinal position of
/// each step.
#[derive(Debug, Default)]
pub struct DeadStrawList {
    dead: HashMap<StrawId, f64>,
}

impl DeadStrawList {
    pub fn new() -> DeadStrawList {
        DeadStrawList::default()
    }

    /// Mark a straw fully dead.
    pub fn kill(&mut self, id: StrawId) {
        self.dead.insert(id, 0.0);
    }

    /// Mark a straw dead beyond `alive_half_length` from the wire center.
    pub fn kill_outer(&mut self, id: StrawId, alive_half_length: f64) {
        self.dead.insert(id, alive_half_length);
    }

    pub fn is_alive(&self, id: StrawId, wire_pos: f64) -> bool {
        match self.dead.get(&id) {
            None => true,
            Some(limit) => wire_pos.abs() < *limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perp_distance_ignores_axial_component() {
        let axis = Vec3::new(1.0, 0.0, 0.0);
        let v = Vec3::new(7.0, 3.0, 4.0);
        assert_relative_eq!(v.perp_to(axis), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn unit_of_zero_vector_is_zero() {
        assert_eq!(Vec3::ZERO.unit_or_zero(), Vec3::ZERO);
    }

    #[test]
    fn dead_list_kills_whole_and_outer_regions() {
        let mut dead = DeadStrawList::new();
        dead.kill(StrawId(3));
        dead.kill_outer(StrawId(4), 100.0);
        assert!(!dead.is_alive(StrawId(3), 0.0));
        assert!(dead.is_alive(StrawId(4), 99.0));
        assert!(!dead.is_alive(StrawId(4), 150.0));
        assert!(dead.is_alive(StrawId(5), 0.0));
    }
}
