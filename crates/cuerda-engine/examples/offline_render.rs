//! Drives the full engine offline with a synthetic C major chord and prints
//! the status snapshot as the detector latches and the arp starts playing.
//!
//! ```sh
//! cargo run -p cuerda-engine --example offline_render
//! ```

use cuerda_engine::{Engine, EngineConfig, ParamId};
use std::f32::consts::TAU;

fn main() {
    let mut config = EngineConfig::default();
    config.arp_enabled = true;
    config.pattern = "up_down".into();
    config.synth = "pluck".into();
    config.tempo_bpm = 140.0;
    config.arp_duration_s = 2.0;

    let mut engine = Engine::new(config).expect("valid config");
    let handle = engine.handle();
    engine.start().expect("fresh engine starts");

    handle.set(ParamId::LeftDelayS, 0.25).unwrap();
    handle.set(ParamId::RightDelayS, 0.375).unwrap();
    handle.set(ParamId::Feedback, 0.35).unwrap();
    handle.set_bool(ParamId::PingPong, true).unwrap();
    handle.set(ParamId::StereoWidth, 0.6).unwrap();

    let sample_rate = engine.sample_rate();
    let block = engine.block_size();
    let mut input = vec![0.0f32; block * 2];
    let mut output = vec![0.0f32; block * 2];

    let mut clock = 0usize;
    for block_idx in 0..400 {
        for i in 0..block {
            let t = (clock + i) as f32 / sample_rate;
            let s = ((TAU * 261.63 * t).sin()
                + (TAU * 329.63 * t).sin()
                + (TAU * 392.0 * t).sin())
                / 3.0
                * 0.5;
            input[2 * i] = s;
            input[2 * i + 1] = s;
        }
        engine.process(&input, &mut output);
        clock += block;

        if block_idx % 25 == 0 {
            let status = handle.status();
            let chord = status
                .chord
                .map(|c| c.summary())
                .unwrap_or_else(|| "-".into());
            println!(
                "t={:>5.2}s  chord={chord:<10}  voices={:>2}  in={:.2}  out={:.2}  cpu={:.1}%",
                clock as f32 / sample_rate,
                status.active_voices,
                status.input_peak,
                status.output_peak,
                status.cpu_load * 100.0,
            );
        }
    }

    let status = handle.status();
    println!(
        "done: {} non-finite samples, {} voice steals, {} skipped analyses",
        status.non_finite_samples, status.voices_exhausted, status.analyses_skipped
    );
}
