//! End-to-end scenarios through the full engine.

use cuerda_engine::{ConfigError, Engine, EngineConfig, EngineError, ParamId};
use libm::sinf;
use std::f32::consts::TAU;

const SR: f32 = 48_000.0;
const BLOCK: usize = 512;

fn engine_with(configure: impl FnOnce(&mut EngineConfig)) -> Engine {
    let mut config = EngineConfig::default();
    config.sample_rate = 48_000;
    config.block_size = BLOCK;
    configure(&mut config);
    let mut engine = Engine::new(config).unwrap();
    engine.start().unwrap();
    engine
}

/// Drive `frames` of the given interleaved input through the engine in
/// block-sized chunks, returning the interleaved output.
fn run(engine: &mut Engine, input: &[f32]) -> Vec<f32> {
    let mut output = vec![0.0f32; input.len()];
    for (in_chunk, out_chunk) in input
        .chunks(BLOCK * 2)
        .zip(output.chunks_mut(BLOCK * 2))
    {
        engine.process(in_chunk, out_chunk);
    }
    output
}

fn c_major_tone(frames: usize, amplitude: f32) -> Vec<f32> {
    let mut interleaved = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f32 / SR;
        let s = amplitude
            * ((TAU * 261.63 * t).sin() + (TAU * 329.63 * t).sin() + (TAU * 392.0 * t).sin())
            / 3.0;
        interleaved.push(s);
        interleaved.push(s);
    }
    interleaved
}

#[test]
fn dry_passthrough_is_bit_exact() {
    let mut engine = engine_with(|c| {
        c.delay_enabled = false;
        c.arp_enabled = false;
    });

    let frames = 4 * BLOCK;
    let mut input = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let s = match i % 4 {
            0 => 0.5,
            1 => -0.5,
            2 => 0.25,
            _ => -0.25,
        };
        input.push(s);
        input.push(s);
    }

    let output = run(&mut engine, &input);
    assert_eq!(output, input);
}

#[test]
fn simple_echo_arrives_at_quarter_second() {
    let mut engine = engine_with(|c| c.arp_enabled = false);
    let handle = engine.handle();
    handle.set(ParamId::LeftDelayS, 0.25).unwrap();
    handle.set(ParamId::RightDelayS, 0.25).unwrap();
    handle.set(ParamId::Feedback, 0.0).unwrap();
    handle.set(ParamId::WetMix, 1.0).unwrap();
    handle.set(ParamId::DryMix, 0.0).unwrap();
    engine.reset();

    let frames = 14_000;
    let mut input = vec![0.0f32; frames * 2];
    input[0] = 1.0;
    input[1] = 1.0;

    let output = run(&mut engine, &input);

    let expect = 12_000i64;
    for ch in 0..2 {
        let mut peak = 0.0f32;
        let mut peak_idx = 0i64;
        for i in 0..frames {
            let v = output[2 * i + ch].abs();
            if v > peak {
                peak = v;
                peak_idx = i as i64;
            }
        }
        assert!(
            (peak_idx - expect).abs() <= 1,
            "channel {ch}: echo at {peak_idx}, expected ~{expect}"
        );
        assert!((peak - 1.0).abs() < 0.01, "channel {ch}: amplitude {peak}");

        for i in 0..frames {
            if (i as i64 - expect).abs() > 2 {
                assert!(
                    output[2 * i + ch].abs() < 1e-3,
                    "channel {ch}: unexpected signal at {i}"
                );
            }
        }
    }
}

#[test]
fn ping_pong_alternates_decaying_echoes() {
    let mut engine = engine_with(|c| c.arp_enabled = false);
    let handle = engine.handle();
    handle.set(ParamId::LeftDelayS, 0.25).unwrap();
    handle.set(ParamId::RightDelayS, 0.5).unwrap();
    handle.set(ParamId::Feedback, 0.5).unwrap();
    handle.set(ParamId::CrossFeedback, 0.0).unwrap();
    handle.set_bool(ParamId::PingPong, true).unwrap();
    handle.set(ParamId::WetMix, 1.0).unwrap();
    handle.set(ParamId::DryMix, 0.0).unwrap();
    engine.reset();

    let frames = 100_000;
    let mut input = vec![0.0f32; frames * 2];
    input[0] = 1.0; // left only

    let output = run(&mut engine, &input);

    let peak_near = |center: usize, ch: usize| -> f32 {
        let lo = center.saturating_sub(4);
        let hi = (center + 4).min(frames - 1);
        (lo..=hi)
            .map(|i| output[2 * i + ch].abs())
            .fold(0.0f32, f32::max)
    };

    // First pass through the left line.
    assert!((peak_near(12_001, 0) - 1.0).abs() < 0.02);
    // Cross to the right line, scaled by feedback.
    assert!((peak_near(36_002, 1) - 0.5).abs() < 0.02);
    // Back to the left at a quarter of the original energy.
    assert!((peak_near(48_003, 0) - 0.25).abs() < 0.02);

    // Magnitudes form a geometric sequence with ratio 0.5.
    let first = peak_near(12_001, 0);
    let second = peak_near(36_002, 1);
    let third = peak_near(48_003, 0);
    assert!((second / first - 0.5).abs() < 0.05);
    assert!((third / second - 0.5).abs() < 0.05);
}

#[test]
fn chord_latches_and_releases() {
    let mut engine = engine_with(|c| {
        c.arp_enabled = false;
        c.delay_enabled = false;
    });
    let handle = engine.handle();

    // One second of a C major triad.
    let tone = c_major_tone((SR as usize) + BLOCK, 0.9);
    run(&mut engine, &tone);

    let status = handle.status();
    let chord = status.chord.expect("chord should be latched after 1 s");
    assert_eq!(chord.summary(), "C major");
    assert!(chord.confidence >= 0.6);

    // A second and a half of silence clears the latch (hold time 0.5 s
    // after the analysis window drains).
    let silence = vec![0.0f32; ((1.5 * SR) as usize) * 2];
    run(&mut engine, &silence);
    assert!(handle.status().chord.is_none(), "latch should clear");
}

#[test]
fn arpeggiator_renders_voices_once_latched() {
    let mut engine = engine_with(|c| {
        c.arp_enabled = true;
        c.delay_enabled = false;
        c.synth = "sine".into();
        c.pattern = "up".into();
        c.tempo_bpm = 120.0;
        c.arp_duration_s = 1.0;
    });
    let handle = engine.handle();

    // Before anything is latched: no voices.
    let tone = c_major_tone(BLOCK * 4, 0.5);
    run(&mut engine, &tone);
    assert_eq!(handle.status().active_voices, 0);

    // Keep the chord sounding well past the hold time.
    let tone = c_major_tone(SR as usize, 0.5);
    let output = run(&mut engine, &tone);
    let status = handle.status();
    assert!(status.chord.is_some(), "chord should latch");
    assert!(
        status.active_voices > 0,
        "arp should be driving voices, status: {status:?}"
    );

    // The synth bus audibly adds to the input during the latched second.
    let tail = &output[output.len() / 2..];
    let tail_in = &tone[tone.len() / 2..];
    let mut diff_energy = 0.0f64;
    for (o, i) in tail.iter().zip(tail_in) {
        diff_energy += ((o - i) as f64).powi(2);
    }
    assert!(
        diff_energy > 1.0,
        "synth contribution missing, diff energy {diff_energy}"
    );
}

#[test]
fn non_finite_input_is_silenced_and_counted() {
    let mut engine = engine_with(|c| {
        c.arp_enabled = false;
        c.delay_enabled = false;
    });
    let handle = engine.handle();

    let frames = BLOCK;
    let mut input = vec![0.2f32; frames * 2];
    input[2 * 50] = f32::INFINITY; // left channel of frame 50

    let mut output = vec![0.0f32; frames * 2];
    engine.process(&input, &mut output);

    assert_eq!(output[2 * 50], 0.0, "poisoned sample must become silence");
    assert_eq!(output[2 * 50 + 1], 0.2, "right channel is unaffected");
    assert_eq!(output[2 * 49], 0.2);
    assert_eq!(output[2 * 51], 0.2, "subsequent frames are unaffected");
    assert_eq!(handle.status().non_finite_samples, 1);

    // The next block is clean.
    let input = vec![0.2f32; frames * 2];
    engine.process(&input, &mut output);
    assert!(output.iter().all(|&s| s == 0.2));
    assert_eq!(handle.status().non_finite_samples, 1);
}

#[test]
fn block_size_does_not_change_the_audio() {
    // Identical engines, one driven at 128 frames per call, one at 8192.
    let build = |block: usize| {
        let mut config = EngineConfig::default();
        config.block_size = block;
        config.arp_enabled = false;
        let mut e = Engine::new(config).unwrap();
        e.start().unwrap();
        let h = e.handle();
        h.set(ParamId::LeftDelayS, 0.1).unwrap();
        h.set(ParamId::RightDelayS, 0.15).unwrap();
        h.set(ParamId::Feedback, 0.6).unwrap();
        h.set(ParamId::WetMix, 0.8).unwrap();
        e.reset();
        e
    };

    let frames = 16_384;
    let input: Vec<f32> = (0..frames * 2)
        .map(|i| sinf(i as f32 * 0.013) * 0.4)
        .collect();

    let mut small = build(128);
    let mut small_out = vec![0.0f32; frames * 2];
    for (i, o) in input.chunks(256).zip(small_out.chunks_mut(256)) {
        small.process(i, o);
    }

    let mut large = build(8192);
    let mut large_out = vec![0.0f32; frames * 2];
    for (i, o) in input.chunks(16_384).zip(large_out.chunks_mut(16_384)) {
        large.process(i, o);
    }

    assert_eq!(small_out, large_out);
}

#[test]
fn loop_gain_is_bounded_at_the_parameter_boundary() {
    let mut engine = engine_with(|c| c.arp_enabled = false);
    let handle = engine.handle();

    handle.set(ParamId::Feedback, 0.9).unwrap();
    match handle.set(ParamId::CrossFeedback, 0.5) {
        Err(ConfigError::LoopGain(total)) => assert!(total >= 1.0),
        other => panic!("expected LoopGain rejection, got {other:?}"),
    }

    // The system keeps the stable combination and the impulse response
    // stays summable.
    handle.set(ParamId::WetMix, 1.0).unwrap();
    handle.set(ParamId::DryMix, 0.0).unwrap();
    handle.set(ParamId::LeftDelayS, 0.05).unwrap();
    handle.set(ParamId::RightDelayS, 0.05).unwrap();
    engine.reset();

    let frames = (5.0 * SR) as usize;
    let mut input = vec![0.0f32; frames * 2];
    input[0] = 1.0;
    input[1] = 1.0;
    let output = run(&mut engine, &input);

    let sum: f64 = output.iter().map(|&s| s.abs() as f64).sum();
    assert!(sum.is_finite());
    let tail_peak = output[output.len() - 9600..]
        .iter()
        .fold(0.0f32, |m, &v| m.max(v.abs()));
    assert!(tail_peak < 0.5, "echoes must decay, tail peak {tail_peak}");
}

#[test]
fn status_tracks_peaks_and_voices() {
    let mut engine = engine_with(|c| {
        c.arp_enabled = false;
        c.delay_enabled = false;
    });
    let handle = engine.handle();

    let frames = BLOCK;
    let input = vec![0.5f32; frames * 2];
    let mut output = vec![0.0f32; frames * 2];
    engine.process(&input, &mut output);

    let status = handle.status();
    assert!((status.input_peak - 0.5).abs() < 1e-6);
    assert!((status.output_peak - 0.5).abs() < 1e-6);
    assert_eq!(status.active_voices, 0);
    assert!(status.cpu_load >= 0.0);
}

#[test]
fn tempo_synced_delay_follows_bpm() {
    let mut engine = engine_with(|c| c.arp_enabled = false);
    let handle = engine.handle();

    handle.set_named(ParamId::LeftDivision, "quarter").unwrap();
    handle.set_named(ParamId::RightDivision, "dotted_eighth").unwrap();
    handle.set_bool(ParamId::DelaySync, true).unwrap();
    handle.set(ParamId::Bpm, 120.0).unwrap();
    engine.reset();

    let silence = vec![0.0f32; BLOCK * 2];
    let mut out = vec![0.0f32; BLOCK * 2];
    engine.process(&silence, &mut out);

    // Quarter at 120 BPM = 500 ms, dotted eighth = 375 ms.
    let audible = handle.status().audible;
    assert!((audible.left_delay_s - 0.5).abs() < 1e-3, "{audible:?}");
    assert!((audible.right_delay_s - 0.375).abs() < 1e-3, "{audible:?}");

    // Halving the tempo doubles the delay times.
    handle.set(ParamId::Bpm, 60.0).unwrap();
    engine.reset();
    engine.process(&silence, &mut out);
    let audible = handle.status().audible;
    assert!((audible.left_delay_s - 1.0).abs() < 1e-3, "{audible:?}");

    // Sync off: the manual times take back over.
    handle.set_bool(ParamId::DelaySync, false).unwrap();
    handle.set(ParamId::LeftDelayS, 0.05).unwrap();
    engine.reset();
    engine.process(&silence, &mut out);
    let audible = handle.status().audible;
    assert!((audible.left_delay_s - 0.05).abs() < 1e-3, "{audible:?}");
}

#[test]
fn audible_values_glide_toward_targets() {
    let mut engine = engine_with(|c| c.arp_enabled = false);
    let handle = engine.handle();

    // One warmup block publishes the settled defaults.
    let silence = vec![0.0f32; BLOCK * 2];
    let mut out = vec![0.0f32; BLOCK * 2];
    engine.process(&silence, &mut out);
    let before = handle.status().audible;
    assert!((before.wet_mix - 0.7).abs() < 0.05);

    handle.set(ParamId::WetMix, 0.2).unwrap();
    engine.process(&silence, &mut out);
    let mid = handle.status().audible;
    assert!(
        mid.wet_mix < before.wet_mix && mid.wet_mix > 0.2,
        "wet mix should be mid-glide, got {}",
        mid.wet_mix
    );

    // 200 ms is far beyond the smoothing constant.
    for _ in 0..20 {
        engine.process(&silence, &mut out);
    }
    let after = handle.status().audible;
    assert!((after.wet_mix - 0.2).abs() < 0.01, "got {}", after.wet_mix);
}

#[test]
fn rejected_parameter_reports_the_field() {
    let engine = engine_with(|c| c.arp_enabled = false);
    let handle = engine.handle();
    match handle.set(ParamId::LeftDelayS, 3.0) {
        Err(ConfigError::OutOfRange { name, .. }) => assert_eq!(name, "left_delay_s"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invalid_configuration_refuses_to_build() {
    let config = EngineConfig {
        sample_rate: 11_025,
        ..Default::default()
    };
    assert!(matches!(
        Engine::new(config),
        Err(EngineError::Config(ConfigError::SampleRate(11_025)))
    ));
}
