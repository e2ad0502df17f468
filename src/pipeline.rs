//! Per-event digitization driver: groups steps by straw, runs the chain for
//! every straw, and merges the outputs in straw-id order.

use std::collections::BTreeMap;
use std::sync::Once;

use log::{debug, info};
use rayon::prelude::*;

use crate::digi::{Digi, DigiOutput, DigiTruth};
use crate::electronics::StrawElectronics;
use crate::error::{SimError, SimResult};
use crate::geom::{DeadStrawList, StrawEnd, StrawId, Tracker};
use crate::observer::{DiagEvent, DigiObserver};
use crate::physics::StrawPhysics;
use crate::rng::RandomStreams;
use crate::sim::cluster::{StrawClusterSequencePair, add_step};
use crate::sim::digitizer::create_digis;
use crate::sim::xtalk::{XTalk, find_cross_talk_straws};
use crate::step::{StepCollection, StepRef};

/// Event-level digitization parameters.
#[derive(Debug, Clone)]
pub struct DigiParams {
    /// Seed of the event's random streams.
    pub seed: u64,
    /// Whether to fan signals out to cross-talk neighbors.
    pub add_cross_talk: bool,
    /// Minimum collected charge (pC) before cross-talk is simulated.
    pub xtalk_min_charge: f64,
    /// Straw-to-straw coupling coefficient.
    pub preamp_xtalk: f64,
    /// Shared-electronics coupling coefficient.
    pub postamp_xtalk: f64,
    /// Energy-loss-rate cut separating highly ionizing steps (MeV/mm).
    pub high_dedx: f64,
    /// Buffer on the step-time blanking gate (ns).
    pub step_time_buffer: f64,
    /// Fan straw processing out across threads.
    pub parallel: bool,
}

impl Default for DigiParams {
    fn default() -> DigiParams {
        DigiParams {
            seed: 0,
            add_cross_talk: false,
            xtalk_min_charge: 0.0,
            preamp_xtalk: 0.0,
            postamp_xtalk: 0.02,
            high_dedx: 1.0e-3,
            step_time_buffer: 100.0,
            parallel: false,
        }
    }
}

/// Extension point for dynamically generated noise hits.
///
/// Deliberately empty: statistical noise generation is deferred, only the
/// hook is part of the pipeline contract.
fn add_noise(_seqs: &mut StrawClusterSequencePair) {}

struct StrawOutput {
    digis: Vec<Digi>,
    truth: Vec<DigiTruth>,
    step_links: Vec<Vec<StepRef>>,
    diag: Vec<DiagEvent>,
}

fn process_straw<T: Tracker>(
    id: StrawId,
    refs: &[StepRef],
    collections: &[StepCollection],
    tracker: &T,
    phys: &StrawPhysics,
    ele: &StrawElectronics,
    params: &DigiParams,
) -> SimResult<StrawOutput> {
    let mut out = StrawOutput {
        digis: Vec::new(),
        truth: Vec::new(),
        step_links: Vec::new(),
        diag: Vec::new(),
    };
    let Some(straw) = tracker.straw(id) else {
        return Ok(out);
    };
    let mut rng = RandomStreams::for_straw(params.seed, id);
    let mut seqs = StrawClusterSequencePair::new(id);
    for &step_ref in refs {
        let Some(step) = step_ref.lookup(collections) else {
            continue;
        };
        let offset = collections[step_ref.collection as usize].time_offset;
        add_step(
            &mut seqs,
            step_ref,
            step,
            offset,
            straw,
            phys,
            ele,
            params.high_dedx,
            params.step_time_buffer,
            &mut rng,
            &mut out.diag,
        );
    }
    add_noise(&mut seqs);
    // the self coupling is processed first for every straw
    create_digis(
        &seqs,
        &XTalk::self_coupling(id),
        ele,
        &mut rng,
        &mut out.digis,
        &mut out.truth,
        &mut out.step_links,
    )?;
    if params.add_cross_talk {
        // cross-talk only pays off above a minimum collected charge
        let total_charge = seqs.sequence(StrawEnd::Cal).total_charge();
        if total_charge > params.xtalk_min_charge {
            for xtalk in find_cross_talk_straws(straw, params.preamp_xtalk, params.postamp_xtalk) {
                create_digis(
                    &seqs,
                    &xtalk,
                    ele,
                    &mut rng,
                    &mut out.digis,
                    &mut out.truth,
                    &mut out.step_links,
                )?;
            }
        }
    }
    Ok(out)
}

/// Digitize one event.
///
/// Steps land in per-straw cluster sequences (nonexistent straws, dead
/// channels and deposits outside the active length are silently skipped),
/// each straw is digitized under its self coupling and, where the collected
/// charge warrants it, under each neighbor coupling, and the per-straw
/// outputs are merged in straw-id order. Bit-for-bit reproducible for a
/// fixed `params.seed`, with or without `params.parallel`.
pub fn digitize_event<T>(
    collections: &[StepCollection],
    tracker: &T,
    dead: &DeadStrawList,
    phys: &StrawPhysics,
    ele: &StrawElectronics,
    params: &DigiParams,
    observer: &mut dyn DigiObserver,
) -> SimResult<DigiOutput>
where
    T: Tracker + Sync,
{
    if collections.is_empty() {
        return Err(SimError::NoStepCollections);
    }
    static PROVENANCE: Once = Once::new();
    PROVENANCE.call_once(|| {
        let labels: Vec<&str> = collections.iter().map(|c| c.label.as_str()).collect();
        info!("digitizing steps from collections: {}", labels.join(", "));
    });

    // group steps by straw, applying the channel gates
    let mut by_straw: BTreeMap<StrawId, Vec<StepRef>> = BTreeMap::new();
    for (icoll, coll) in collections.iter().enumerate() {
        for (istep, step) in coll.steps.iter().enumerate() {
            let Some(straw) = tracker.straw(step.straw) else {
                debug!("skipping step in nonexistent straw {}", step.straw);
                continue;
            };
            let wire_pos = (step.position - straw.midpoint).dot(straw.direction).abs();
            if wire_pos >= straw.active_half_length || !dead.is_alive(step.straw, wire_pos) {
                debug!("skipping step in dead region of straw {}", step.straw);
                continue;
            }
            by_straw.entry(step.straw).or_default().push(StepRef {
                collection: icoll as u32,
                index: istep as u32,
            });
        }
    }

    let work: Vec<(StrawId, Vec<StepRef>)> = by_straw.into_iter().collect();
    let outputs: Vec<StrawOutput> = if params.parallel {
        work.par_iter()
            .map(|(id, refs)| process_straw(*id, refs, collections, tracker, phys, ele, params))
            .collect::<SimResult<Vec<_>>>()?
    } else {
        work.iter()
            .map(|(id, refs)| process_straw(*id, refs, collections, tracker, phys, ele, params))
            .collect::<SimResult<Vec<_>>>()?
    };

    // merge in straw-id order, replaying diagnostics as we go
    let mut out = DigiOutput::default();
    for straw_out in outputs {
        for event in &straw_out.diag {
            match event {
                DiagEvent::Step(d) => observer.on_step_divided(d),
                DiagEvent::Cluster(d) => observer.on_cluster_drifted(d),
            }
        }
        for ((digi, truth), links) in straw_out
            .digis
            .into_iter()
            .zip(straw_out.truth)
            .zip(straw_out.step_links)
        {
            observer.on_digi(&digi, &truth);
            out.digis.push(digi);
            out.truth.push(truth);
            out.step_links.push(links);
        }
    }
    info!(
        "digitized {} straws into {} digis",
        work.len(),
        out.digis.len()
    );
    Ok(out)
}
