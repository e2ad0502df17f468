//! Gas and avalanche physics of the straw: ionization statistics, drift,
//! gain and longitudinal signal propagation.

use crate::rng::RandomStreams;

/// Charge of one electron (pC).
const ELECTRON_CHARGE_PC: f64 = 1.602_176_6e-7;

/// Gas/avalanche parameter object, refreshed once per data-taking period.
#[derive(Debug, Clone)]
pub struct StrawPhysics {
    /// Mean energy to create one ion pair (MeV).
    pub ionization_energy: f64,
    /// Mean free path between ionization clusters (mm).
    pub mean_free_path: f64,
    /// Cumulative distribution of ions per cluster; entry `n` is the
    /// probability of at most `n + 1` ions.
    pub cluster_size_cdf: Vec<f64>,
    /// Mean avalanche gas gain.
    pub gas_gain: f64,
    /// Relative gain spread for a single-ion avalanche.
    pub gain_spread: f64,
    /// Transverse drift velocity (mm/ns).
    pub drift_velocity: f64,
    /// Drift-time spread per sqrt(mm) of drift distance (ns).
    pub drift_spread: f64,
    /// Longitudinal signal propagation velocity (mm/ns).
    pub propagation_velocity: f64,
    /// Signal attenuation length along the wire (mm).
    pub attenuation_length: f64,
}

impl Default for StrawPhysics {
    fn default() -> StrawPhysics {
        StrawPhysics {
            ionization_energy: 27.0e-6,
            mean_free_path: 0.35,
            cluster_size_cdf: vec![
                0.656, 0.805, 0.868, 0.905, 0.927, 0.941, 0.951, 0.958, 0.964, 0.969, 0.973,
                0.976, 0.979, 0.982, 0.984, 0.986, 0.988, 0.989, 0.990, 0.991,
            ],
            gas_gain: 7.0e4,
            gain_spread: 0.25,
            drift_velocity: 0.0625,
            drift_spread: 1.0,
            propagation_velocity: 231.0,
            attenuation_length: 1100.0,
        }
    }
}

impl StrawPhysics {
    /// Total number of ionization electrons for an energy deposit, never
    /// fewer than one.
    pub fn ion_count(&self, edep: f64) -> u32 {
        (edep / self.ionization_energy).round().max(1.0) as u32
    }

    /// Ions in one cluster, sampled from the cluster-size distribution by a
    /// uniform variate in `[0, 1)`.
    pub fn ions_per_cluster(&self, u: f64) -> u32 {
        for (n, p) in self.cluster_size_cdf.iter().enumerate() {
            if u < *p {
                return n as u32 + 1;
            }
        }
        self.cluster_size_cdf.len() as u32 + 1
    }

    /// Pre-gain charge (pC) corresponding to an ionization energy (MeV).
    pub fn ionization_charge(&self, energy: f64) -> f64 {
        ELECTRON_CHARGE_PC * energy / self.ionization_energy
    }

    /// Avalanche gain for a cluster of `nion` ions. Relative fluctuations
    /// shrink with the number of primary ions.
    pub fn cluster_gain(&self, rng: &mut RandomStreams, nion: u32) -> f64 {
        let sigma = self.gas_gain * self.gain_spread / (nion.max(1) as f64).sqrt();
        rng.gaussian(self.gas_gain, sigma).max(0.0)
    }

    /// Mean drift time for a transverse drift distance (ns). The angular
    /// argument is reserved for a Lorentz-angle correction and is currently
    /// a fixed constant (field-free approximation).
    pub fn drift_distance_to_time(&self, dd: f64, _phi: f64) -> f64 {
        dd / self.drift_velocity
    }

    /// Drift-time spread for a transverse drift distance (ns).
    pub fn drift_time_spread(&self, dd: f64, _phi: f64) -> f64 {
        self.drift_spread * dd.max(0.0).sqrt()
    }

    /// Charge attenuation after propagating `wdist` mm along the wire.
    pub fn propagation_attenuation(&self, wdist: f64) -> f64 {
        (-wdist / self.attenuation_length).exp()
    }

    /// Propagation delay to a wire end (ns). Pure linear delay; dispersion
    /// is deliberately not modeled.
    pub fn propagation_time(&self, wdist: f64) -> f64 {
        wdist / self.propagation_velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ion_count_never_below_one() {
        let phys = StrawPhysics::default();
        assert_eq!(phys.ion_count(0.0), 1);
        assert_eq!(phys.ion_count(1.0e-9), 1);
        assert_eq!(phys.ion_count(27.0e-6 * 10.0), 10);
    }

    #[test]
    fn cluster_size_walks_the_cdf() {
        let phys = StrawPhysics::default();
        assert_eq!(phys.ions_per_cluster(0.0), 1);
        assert_eq!(phys.ions_per_cluster(0.7), 2);
        // past the table end: the overflow bin
        assert_eq!(
            phys.ions_per_cluster(0.9999),
            phys.cluster_size_cdf.len() as u32 + 1
        );
    }

    #[test]
    fn attenuation_decreases_with_distance() {
        let phys = StrawPhysics::default();
        assert_relative_eq!(phys.propagation_attenuation(0.0), 1.0);
        assert!(phys.propagation_attenuation(500.0) > phys.propagation_attenuation(1000.0));
    }

    #[test]
    fn charge_is_proportional_to_energy() {
        let phys = StrawPhysics::default();
        let q1 = phys.ionization_charge(phys.ionization_energy);
        let q5 = phys.ionization_charge(5.0 * phys.ionization_energy);
        assert_relative_eq!(q5, 5.0 * q1, epsilon = 1e-15);
    }
}
