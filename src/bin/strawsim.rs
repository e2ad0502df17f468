//! Run one synthetic event through the digitization chain and log a summary.
//!
//! Usage: `RUST_LOG=info cargo run --bin strawsim`

use log::{error, info};

use strawdigi::electronics::StrawElectronics;
use strawdigi::geom::{DeadStrawList, Straw, StrawId, StrawMap, Vec3};
use strawdigi::observer::NoopObserver;
use strawdigi::physics::StrawPhysics;
use strawdigi::pipeline::{DigiParams, digitize_event};
use strawdigi::step::{Step, StepCollection};

const N_STRAWS: u16 = 5;

/// A small bundle of parallel straws, 5 mm apart, wires along x.
fn bundle() -> StrawMap {
    let mut map = StrawMap::new();
    for i in 0..N_STRAWS {
        let neighbors = [i.checked_sub(1), (i + 1 < N_STRAWS).then_some(i + 1)]
            .into_iter()
            .flatten()
            .map(StrawId)
            .collect();
        map.insert(Straw {
            id: StrawId(i),
            midpoint: Vec3::new(0.0, 5.0 * i as f64, 0.0),
            direction: Vec3::new(1.0, 0.0, 0.0),
            half_length: 600.0,
            active_half_length: 590.0,
            inner_radius: 2.5,
            neighbors,
            preamp_neighbors: vec![],
        });
    }
    map
}

/// A few steps from a particle crossing the bundle.
fn synthetic_steps() -> Vec<Step> {
    (0..8u16)
        .map(|i| {
            let straw = i % N_STRAWS;
            Step {
                straw: StrawId(straw),
                position: Vec3::new(-20.0 + 6.0 * i as f64, 5.0 * straw as f64 + 0.8, 0.4),
                momentum: Vec3::new(45.0, 80.0, 8.0),
                step_length: 1.2,
                ionizing_edep: 2.4e-3,
                time: 620.0 + 35.0 * i as f64,
                track: 1,
            }
        })
        .collect()
}

fn main() {
    env_logger::init();

    let tracker = bundle();
    let collections = [StepCollection {
        label: "tracker".into(),
        time_offset: 0.0,
        steps: synthetic_steps(),
    }];
    let params = DigiParams {
        seed: 7,
        add_cross_talk: true,
        preamp_xtalk: 0.05,
        ..DigiParams::default()
    };

    match digitize_event(
        &collections,
        &tracker,
        &DeadStrawList::new(),
        &StrawPhysics::default(),
        &StrawElectronics::default(),
        &params,
        &mut NoopObserver,
    ) {
        Ok(out) => {
            info!("event produced {} digis", out.digis.len());
            for (digi, truth) in out.digis.iter().zip(&out.truth) {
                let peak = digi.adc.iter().copied().max().unwrap_or(0);
                info!(
                    "straw {}: tdc {:?} tot {:?} adc peak {} ({} steps in window)",
                    digi.straw,
                    digi.tdc,
                    digi.tot,
                    peak,
                    truth.steps_in_window.len()
                );
            }
        }
        Err(err) => error!("digitization failed: {err}"),
    }
}
