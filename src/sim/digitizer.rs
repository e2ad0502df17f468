//! Coincidence pairing of threshold crossings and digi construction.

use std::collections::BTreeSet;

use super::cluster::StrawClusterSequencePair;
use super::discriminator::{ThresholdCrossing, find_threshold_crossings};
use super::waveform::StrawWaveform;
use super::xtalk::XTalk;
use crate::digi::{Digi, DigiTruth};
use crate::electronics::{Path, StrawElectronics};
use crate::error::{SimError, SimResult};
use crate::geom::{StrawEnd, StrawId, Vec3};
use crate::rng::RandomStreams;
use crate::step::StepRef;

/// Greedy earliest-first sweep over the merged, time-ordered crossing list.
///
/// For each unconsumed crossing, later crossings inside the coincidence
/// window are scanned; same-end crossings are skipped over without being
/// consumed, and the first opposite-end crossing is accepted as a pair.
/// After an accepted pair the sweep resumes strictly after the second
/// crossing, additionally skipping anything inside the digital dead time.
pub fn find_coincidences(
    xings: &[ThresholdCrossing],
    ele: &StrawElectronics,
) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut first = 0;
    while first < xings.len() {
        let mut accepted = None;
        for second in first + 1..xings.len() {
            if !ele.combine_ends(xings[first].time, xings[second].time) {
                break; // window exhausted, no match for this crossing
            }
            if xings[second].end != xings[first].end {
                accepted = Some(second);
                break;
            }
            // same end: skip over, leave unconsumed
        }
        match accepted {
            Some(second) => {
                pairs.push((first, second));
                // resume past the pair and the readout-busy dead time
                let busy_until = xings[second].time + ele.dead_time_digital;
                first = second + 1;
                while first < xings.len() && xings[first].time <= busy_until {
                    first += 1;
                }
            }
            None => first += 1,
        }
    }
    pairs
}

/// Build one digi from an accepted crossing pair.
///
/// Both end times share one clock-jitter draw; each end's TOT uses an
/// independently redrawn threshold; the ADC waveform is the noisy sum of
/// both ends sampled on the grid anchored to the first crossing.
fn create_digi(
    pair: [&ThresholdCrossing; 2],
    waveforms: &[StrawWaveform; 2],
    straw: StrawId,
    ele: &StrawElectronics,
    rng: &mut RandomStreams,
) -> SimResult<Digi> {
    let mut xtimes = [0.0f64; 2];
    let mut tot = [0u16; 2];
    let dt = rng.gaussian(0.0, ele.clock_jitter);
    for wfx in pair {
        let iend = wfx.end.index();
        xtimes[iend] = wfx.time + dt;
        let threshold = rng.gaussian(ele.threshold, ele.noise(Path::Thresh));
        tot[iend] = waveforms[iend].digitize_tot(threshold, wfx.time + dt);
    }
    let adc_times = ele.adc_times(pair[0].time);
    let mut volts = [Vec::new(), Vec::new()];
    for iend in 0..2 {
        waveforms[iend].sample_all(Path::Adc, &adc_times, &mut volts[iend]);
    }
    let mut summed = Vec::with_capacity(adc_times.len());
    for isamp in 0..adc_times.len() {
        summed.push(volts[0][isamp] + volts[1][isamp] + rng.gaussian(0.0, ele.noise(Path::Adc)));
    }
    if !(xtimes.iter().all(|t| t.is_finite()) && summed.iter().all(|v| v.is_finite())) {
        return Err(SimError::NonFinite(straw));
    }
    Ok(Digi {
        straw,
        tdc: [ele.digitize_time(xtimes[0]), ele.digitize_time(xtimes[1])],
        tot,
        adc: ele.digitize_waveform(&summed),
    })
}

/// Truth linkage for one accepted pair: the per-end responsible clusters,
/// the deduplicated step union of the pair, and every step contributing a
/// cluster inside the sampled ADC window.
fn associate_truth(
    pair: [&ThresholdCrossing; 2],
    seqs: &StrawClusterSequencePair,
    straw: StrawId,
    ele: &StrawElectronics,
) -> (DigiTruth, Vec<StepRef>) {
    let mut linked = BTreeSet::new();
    let mut end_time = [0.0f64; 2];
    let mut cluster_pos = [Vec3::ZERO; 2];
    let mut cluster_time = [0.0f64; 2];
    let mut step = [None; 2];
    for wfx in pair {
        let clust = &seqs.sequence(wfx.end).clusters()[wfx.icluster];
        linked.insert(clust.step);
        let iend = wfx.end.index();
        end_time[iend] = clust.time;
        cluster_pos[iend] = clust.pos;
        cluster_time[iend] = clust.ctime;
        step[iend] = Some(clust.step);
    }
    // the ADC sums both ends, so the window anchors to the earlier one
    let tmin = end_time[0].min(end_time[1]) - 0.01 * ele.adc_period;
    let tmax = tmin + (ele.n_adc_samples - ele.n_adc_presamples) as f64 * ele.adc_period;
    let mut in_window = BTreeSet::new();
    for clust in seqs.sequence(StrawEnd::Cal).clusters() {
        if clust.time >= tmin && clust.time < tmax {
            in_window.insert(clust.step);
        }
    }
    let truth = DigiTruth {
        straw,
        end_time,
        cluster_pos,
        cluster_time,
        step,
        steps_in_window: in_window.into_iter().collect(),
    };
    (truth, linked.into_iter().collect())
}

/// Digitize one straw's cluster-sequence pair under one coupling: find the
/// per-end threshold crossings, pair them across the ends, and emit digis
/// with index-aligned truth, attributed to the coupling's destination straw.
pub fn create_digis(
    seqs: &StrawClusterSequencePair,
    xtalk: &XTalk,
    ele: &StrawElectronics,
    rng: &mut RandomStreams,
    digis: &mut Vec<Digi>,
    truth: &mut Vec<DigiTruth>,
    step_links: &mut Vec<Vec<StepRef>>,
) -> SimResult<()> {
    let waveforms = [
        StrawWaveform::new(seqs.sequence(StrawEnd::Cal), ele, xtalk),
        StrawWaveform::new(seqs.sequence(StrawEnd::Hv), ele, xtalk),
    ];
    let mut xings = Vec::new();
    for end in StrawEnd::BOTH {
        find_threshold_crossings(&waveforms[end.index()], end, ele, rng, &mut xings);
    }
    // a digi needs a crossing on each end
    if xings.len() < 2 {
        return Ok(());
    }
    for (first, second) in find_coincidences(&xings, ele) {
        let pair = [&xings[first], &xings[second]];
        digis.push(create_digi(pair, &waveforms, xtalk.dest, ele, rng)?);
        let (t, links) = associate_truth(pair, seqs, xtalk.dest, ele);
        truth.push(t);
        step_links.push(links);
    }
    Ok(())
}
