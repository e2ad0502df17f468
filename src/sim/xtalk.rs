//! Cross-talk coupling descriptors between straws.

use crate::geom::{Straw, StrawId};

/// Coupling of a source straw's signal onto a destination straw.
///
/// Exactly one of the two coefficients is nonzero for a neighbor coupling.
/// The self descriptor (both zero, destination equal to source) is the
/// identity case and is processed first for every straw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XTalk {
    pub source: StrawId,
    pub dest: StrawId,
    /// Coupling induced before amplification (straw-to-straw).
    pub preamp: f64,
    /// Coupling injected after amplification (shared electronics).
    pub postamp: f64,
}

impl XTalk {
    /// The identity coupling of a straw onto itself.
    pub fn self_coupling(id: StrawId) -> XTalk {
        XTalk {
            source: id,
            dest: id,
            preamp: 0.0,
            postamp: 0.0,
        }
    }

    pub fn is_self(&self) -> bool {
        self.source == self.dest
    }

    /// Charge scale applied when synthesizing the destination's waveform.
    pub fn coupling(&self) -> f64 {
        if self.is_self() {
            1.0
        } else {
            self.preamp + self.postamp
        }
    }
}

/// Couplings from a straw to its neighbors, one descriptor per entry of the
/// two disjoint topology relations the geometry provides.
pub fn find_cross_talk_straws(straw: &Straw, preamp_coupling: f64, postamp_coupling: f64) -> Vec<XTalk> {
    let mut out = Vec::with_capacity(straw.neighbors.len() + straw.preamp_neighbors.len());
    for &n in &straw.neighbors {
        out.push(XTalk {
            source: straw.id,
            dest: n,
            preamp: preamp_coupling,
            postamp: 0.0,
        });
    }
    for &n in &straw.preamp_neighbors {
        out.push(XTalk {
            source: straw.id,
            dest: n,
            preamp: 0.0,
            postamp: postamp_coupling,
        });
    }
    out
}
