//! Analog waveform at one wire end: the sum of the time-shifted impulse
//! responses of the clusters in a sequence.

use super::cluster::{ClusterSequence, StrawCluster};
use super::xtalk::XTalk;
use crate::electronics::{Path, StrawElectronics};

/// Mutable state of the threshold-crossing scan along one end's waveform.
#[derive(Debug, Clone, Copy)]
pub struct CrossingSearch {
    /// Current scan position; the crossing time once one is found (ns).
    pub time: f64,
    /// Index of the current cluster in the sequence.
    pub icluster: usize,
    /// Voltage at the found crossing (mV).
    pub vcross: f64,
}

impl CrossingSearch {
    pub fn starting_at(time: f64) -> CrossingSearch {
        CrossingSearch {
            time,
            icluster: 0,
            vcross: 0.0,
        }
    }
}

/// Waveform view over one end's cluster sequence for one coupling.
pub struct StrawWaveform<'a> {
    seq: &'a ClusterSequence,
    ele: &'a StrawElectronics,
    coupling: f64,
}

impl<'a> StrawWaveform<'a> {
    pub fn new(
        seq: &'a ClusterSequence,
        ele: &'a StrawElectronics,
        xtalk: &XTalk,
    ) -> StrawWaveform<'a> {
        StrawWaveform {
            seq,
            ele,
            coupling: xtalk.coupling(),
        }
    }

    pub fn clusters(&self) -> &[StrawCluster] {
        self.seq.clusters()
    }

    /// Voltage at `time` on the given signal path (mV).
    pub fn sample(&self, path: Path, time: f64) -> f64 {
        let horizon = self.ele.max_response_time(path);
        let mut v = 0.0;
        for clust in self.seq.clusters() {
            if clust.time > time {
                break;
            }
            if time - clust.time > horizon {
                continue;
            }
            v += clust.charge * self.ele.linear_response(path, time - clust.time);
        }
        v * self.coupling
    }

    /// Sample at an ordered set of times, reusing `out`.
    pub fn sample_all(&self, path: Path, times: &[f64], out: &mut Vec<f64>) {
        out.clear();
        out.extend(times.iter().map(|&t| self.sample(path, t)));
    }

    /// Time past which the waveform can no longer rise.
    fn quiet_after(&self, path: Path) -> Option<f64> {
        self.seq
            .clusters()
            .last()
            .map(|c| c.time + self.ele.max_response_time(path))
    }

    /// Index of the latest cluster at or before `time`.
    fn responsible_cluster(&self, time: f64) -> usize {
        let n = self.seq.clusters().partition_point(|c| c.time <= time);
        n.saturating_sub(1)
    }

    /// Bisect a bracketed rising edge down to the scan tolerance.
    fn refine_crossing(&self, threshold: f64, mut lo: f64, mut hi: f64) -> f64 {
        while hi - lo > self.ele.scan_tolerance {
            let mid = 0.5 * (lo + hi);
            if self.sample(Path::Thresh, mid) < threshold {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi
    }

    /// Search for the next rising crossing of `threshold` at or after
    /// `search.time`, bounded by `tmax`.
    ///
    /// On success the search state holds the crossing time, the responsible
    /// cluster (the latest at or before the crossing, never earlier than the
    /// current cluster pointer) and the voltage at the crossing.
    pub fn crosses_threshold(
        &self,
        threshold: f64,
        search: &mut CrossingSearch,
        tmax: f64,
    ) -> bool {
        let Some(quiet) = self.quiet_after(Path::Thresh) else {
            return false;
        };
        let step = self.ele.scan_step;
        let mut t = search.time;
        let mut prev = self.sample(Path::Thresh, t);
        while t < tmax {
            if prev < threshold && t > quiet {
                return false;
            }
            let tn = t + step;
            let v = self.sample(Path::Thresh, tn);
            if prev < threshold && v >= threshold {
                let tcross = self.refine_crossing(threshold, t, tn);
                if tcross > tmax {
                    return false;
                }
                search.time = tcross;
                search.icluster = self.responsible_cluster(tcross).max(search.icluster);
                search.vcross = self.sample(Path::Thresh, tcross);
                return true;
            }
            prev = v;
            t = tn;
        }
        false
    }

    /// Clock ticks the waveform stays above `threshold` from the rising
    /// crossing nearest at or after `tstart`, saturated at the TOT range.
    /// The tick at the crossing itself counts.
    pub fn digitize_tot(&self, threshold: f64, tstart: f64) -> u16 {
        let mut t = tstart;
        if self.sample(Path::Thresh, t) < threshold {
            let Some(quiet) = self.quiet_after(Path::Thresh) else {
                return 0;
            };
            let mut lo = t;
            loop {
                if lo > quiet {
                    return 0;
                }
                let hi = lo + self.ele.scan_step;
                if self.sample(Path::Thresh, hi) >= threshold {
                    t = self.refine_crossing(threshold, lo, hi);
                    break;
                }
                lo = hi;
            }
        }
        let mut ticks = 1u16;
        while ticks < self.ele.tot_max {
            if self.sample(Path::Thresh, t + ticks as f64 * self.ele.tot_lsb) < threshold {
                break;
            }
            ticks += 1;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{StrawEnd, StrawId, Vec3};
    use crate::sim::cluster::ClusterKind;
    use crate::step::StepRef;
    use approx::assert_relative_eq;

    fn sequence(times_and_charges: &[(f64, f64)]) -> ClusterSequence {
        let mut seq = ClusterSequence::new(StrawEnd::Cal);
        for &(time, charge) in times_and_charges {
            seq.insert(StrawCluster {
                kind: ClusterKind::Primary,
                straw: StrawId(0),
                end: StrawEnd::Cal,
                time,
                charge,
                drift_distance: 1.0,
                wire_distance: 500.0,
                step: StepRef {
                    collection: 0,
                    index: 0,
                },
                pos: Vec3::ZERO,
                ctime: time,
            });
        }
        seq
    }

    #[test]
    fn single_cluster_peaks_at_the_shaping_time() {
        let ele = StrawElectronics::default();
        let seq = sequence(&[(600.0, 0.2)]);
        let wf = StrawWaveform::new(&seq, &ele, &XTalk::self_coupling(StrawId(0)));
        let tau = ele.shaping_time[Path::Thresh.index()];
        let peak = wf.sample(Path::Thresh, 600.0 + tau);
        assert_relative_eq!(peak, 0.2 * ele.dvdi[Path::Thresh.index()], epsilon = 1e-9);
        assert_eq!(wf.sample(Path::Thresh, 599.0), 0.0);
        assert!(wf.sample(Path::Thresh, 600.0 + 2.0 * tau) < peak);
    }

    #[test]
    fn charges_superpose() {
        let ele = StrawElectronics::default();
        let single = sequence(&[(600.0, 0.2)]);
        let double = sequence(&[(600.0, 0.2), (600.0, 0.2)]);
        let wf1 = StrawWaveform::new(&single, &ele, &XTalk::self_coupling(StrawId(0)));
        let wf2 = StrawWaveform::new(&double, &ele, &XTalk::self_coupling(StrawId(0)));
        assert_relative_eq!(
            wf2.sample(Path::Thresh, 615.0),
            2.0 * wf1.sample(Path::Thresh, 615.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn crossing_search_finds_a_rising_edge_and_the_responsible_cluster() {
        let ele = StrawElectronics::default();
        let seq = sequence(&[(600.0, 0.2)]);
        let wf = StrawWaveform::new(&seq, &ele, &XTalk::self_coupling(StrawId(0)));
        let mut search = CrossingSearch::starting_at(500.0);
        assert!(wf.crosses_threshold(5.0, &mut search, 2000.0));
        assert!(search.time > 600.0);
        assert!(search.time < 600.0 + ele.shaping_time[Path::Thresh.index()]);
        assert_eq!(search.icluster, 0);
        assert_relative_eq!(search.vcross, 5.0, epsilon = 0.2);
    }

    #[test]
    fn no_crossing_when_threshold_is_above_the_peak() {
        let ele = StrawElectronics::default();
        let seq = sequence(&[(600.0, 0.2)]);
        let wf = StrawWaveform::new(&seq, &ele, &XTalk::self_coupling(StrawId(0)));
        let peak = 0.2 * ele.dvdi[Path::Thresh.index()];
        let mut search = CrossingSearch::starting_at(500.0);
        assert!(!wf.crosses_threshold(peak * 1.1, &mut search, 2000.0));
    }

    #[test]
    fn tot_grows_with_charge_and_saturates() {
        let ele = StrawElectronics::default();
        let small = sequence(&[(600.0, 0.02)]);
        let large = sequence(&[(600.0, 5.0)]);
        let wf_small = StrawWaveform::new(&small, &ele, &XTalk::self_coupling(StrawId(0)));
        let wf_large = StrawWaveform::new(&large, &ele, &XTalk::self_coupling(StrawId(0)));
        let mut search = CrossingSearch::starting_at(500.0);
        assert!(wf_small.crosses_threshold(2.0, &mut search, 2000.0));
        let tot_small = wf_small.digitize_tot(2.0, search.time);
        let mut search = CrossingSearch::starting_at(500.0);
        assert!(wf_large.crosses_threshold(2.0, &mut search, 2000.0));
        let tot_large = wf_large.digitize_tot(2.0, search.time);
        assert!(tot_small >= 1);
        assert!(tot_large > tot_small);
        assert!(tot_large <= ele.tot_max);
    }

    #[test]
    fn neighbor_coupling_scales_the_waveform() {
        let ele = StrawElectronics::default();
        let seq = sequence(&[(600.0, 0.2)]);
        let xtalk = XTalk {
            source: StrawId(0),
            dest: StrawId(1),
            preamp: 0.1,
            postamp: 0.0,
        };
        let own = StrawWaveform::new(&seq, &ele, &XTalk::self_coupling(StrawId(0)));
        let coupled = StrawWaveform::new(&seq, &ele, &xtalk);
        assert_relative_eq!(
            coupled.sample(Path::Thresh, 620.0),
            0.1 * own.sample(Path::Thresh, 620.0),
            epsilon = 1e-12
        );
    }
}
