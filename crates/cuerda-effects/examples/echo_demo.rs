//! Renders an impulse through the ping-pong delay and prints where the
//! echoes land.
//!
//! ```sh
//! cargo run -p cuerda-effects --example echo_demo
//! ```

use cuerda_core::Effect;
use cuerda_effects::{DistortionKind, StereoDelay};

fn main() {
    let sample_rate = 48_000.0;
    let mut delay = StereoDelay::new(sample_rate, 2.0);
    delay.set_delay_times(0.25, 0.5);
    delay.set_feedback(0.5);
    delay.set_cross_feedback(0.3);
    delay.set_ping_pong(true);
    delay.set_wet_mix(1.0);
    delay.set_dry_mix(0.0);
    delay.set_distortion_enabled(true);
    delay.distortion_mut().set_kind(DistortionKind::Tube);
    delay.reset();

    let seconds = 4.0;
    let frames = (seconds * sample_rate) as usize;

    let mut echoes = Vec::new();
    for i in 0..frames {
        let x = if i == 0 { 1.0 } else { 0.0 };
        let (l, r) = delay.process_stereo(x, 0.0);
        if l.abs() > 0.05 {
            echoes.push((i, 'L', l));
        }
        if r.abs() > 0.05 {
            echoes.push((i, 'R', r));
        }
    }

    println!("ping-pong impulse response ({} echoes over {seconds} s):", echoes.len());
    for (frame, channel, amplitude) in echoes {
        println!(
            "  {:>7.3} s  {channel}  {amplitude:+.3}",
            frame as f32 / sample_rate
        );
    }
}
