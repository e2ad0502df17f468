//! Threshold-crossing detection over one end's waveform.

use super::waveform::{CrossingSearch, StrawWaveform};
use crate::electronics::{Path, StrawElectronics};
use crate::geom::StrawEnd;
use crate::rng::RandomStreams;

/// A candidate discriminator firing on one end.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdCrossing {
    /// Crossing time (ns).
    pub time: f64,
    pub end: StrawEnd,
    /// Index of the responsible cluster in that end's sequence.
    pub icluster: usize,
    /// Sampled voltage at the crossing (mV).
    pub vcross: f64,
}

/// Scan one end's waveform for discriminator crossings from the moment
/// readout enables after the flash blanking.
///
/// The threshold is redrawn for every crossing (per-crossing electronics
/// noise), the analog dead time separates accepted crossings, and the
/// cluster pointer advances so a used ionization cluster cannot re-fire the
/// discriminator. Crossings are inserted keeping the merged list
/// time-ordered. Finding none is a normal outcome.
pub fn find_threshold_crossings(
    wf: &StrawWaveform,
    end: StrawEnd,
    ele: &StrawElectronics,
    rng: &mut RandomStreams,
    xings: &mut Vec<ThresholdCrossing>,
) {
    let mut search = CrossingSearch::starting_at(ele.flash_end);
    let tmax = ele.readout_end();
    let mut threshold = rng.gaussian(ele.threshold, ele.noise(Path::Thresh));
    while search.time < tmax && wf.crosses_threshold(threshold, &mut search, tmax) {
        let at = xings.partition_point(|x| x.time < search.time);
        xings.insert(
            at,
            ThresholdCrossing {
                time: search.time,
                end,
                icluster: search.icluster,
                vcross: search.vcross,
            },
        );
        search.time += ele.dead_time_analog;
        if search.time > tmax {
            break;
        }
        search.icluster += 1;
        if search.icluster >= wf.clusters().len() {
            break;
        }
        threshold = rng.gaussian(ele.threshold, ele.noise(Path::Thresh));
    }
}
