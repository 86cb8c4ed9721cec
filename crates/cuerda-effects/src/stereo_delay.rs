//! Stereo delay with cross-feedback, ping-pong routing, and M/S width.
//!
//! ## Signal flow
//!
//! ```text
//!  L_in ──►(+)──► [left line] ──► L_d ──┐
//!           ▲                           ├─► M/S width ─► wet/dry ─► L/R out
//!  R_in ──►(+)──► [right line] ─► R_d ──┘
//!           ▲          │
//!           │   cross-feedback ◄── distortion blend
//!           └── feedback (straight or ping-pong crossed)
//! ```
//!
//! Within a step the taps are read before anything is written, so the
//! feedback "cycle" is purely temporal; the data graph per frame is acyclic.

use crate::{DistortionKind, DistortionUnit};
use cuerda_core::{
    flush_denormal, Effect, InterpolatedDelay, Lfo, NoteDivision, OnePole, SmoothedParam,
    TempoManager,
};

/// Feedback lowpass cutoffs at or above this are treated as bypass.
const FEEDBACK_LP_BYPASS_HZ: f32 = 20_000.0;

/// Smoothing time for delay-time changes. Long enough that retuning the
/// delay never produces audible pitch warble.
const DELAY_SMOOTHING_MS: f32 = 50.0;

/// Smoothing time for gain-class parameters (feedback, mixes, width).
const GAIN_SMOOTHING_MS: f32 = 15.0;

/// One channel of the stereo pair: a delay line with its own smoothed target
/// and LFO modulation state.
#[derive(Debug, Clone)]
struct DelayChannel {
    line: InterpolatedDelay,
    delay_samples: SmoothedParam,
    lfo: Lfo,
    /// Phase offset restored on reset; the two channels wobble against
    /// each other.
    lfo_home_phase: f32,
}

impl DelayChannel {
    fn new(sample_rate: f32, max_seconds: f32, initial_delay_s: f32, lfo_phase: f32) -> Self {
        let mut lfo = Lfo::new(sample_rate, 0.0);
        lfo.set_phase(lfo_phase);
        Self {
            line: InterpolatedDelay::from_seconds(sample_rate, max_seconds),
            delay_samples: SmoothedParam::new(
                initial_delay_s * sample_rate,
                sample_rate,
                DELAY_SMOOTHING_MS,
            ),
            lfo,
            lfo_home_phase: lfo_phase,
        }
    }

    /// Smoothed delay plus LFO wobble, clamped to the line capacity.
    #[inline]
    fn effective_delay(&mut self, lfo_depth: f32) -> f32 {
        let base = self.delay_samples.advance();
        let modulated = base + lfo_depth * self.lfo.next();
        modulated.clamp(1.0, (self.line.capacity() - 1) as f32)
    }
}

/// Dual delay lines with cross-feedback, optional inline distortion on the
/// cross path, ping-pong routing, and mid/side width enhancement.
///
/// All gain parameters are smoothed per sample; delay-time changes glide
/// over tens of milliseconds. Stability is the parameter boundary's job:
/// this struct assumes `feedback <= 0.9` and `cross_feedback <= 0.5` with
/// combined loop gain below 1.
///
/// # Example
///
/// ```rust
/// use cuerda_effects::StereoDelay;
/// use cuerda_core::Effect;
///
/// let mut delay = StereoDelay::new(48_000.0, 2.0);
/// delay.set_delay_times(0.25, 0.5);
/// delay.set_feedback(0.4);
/// delay.set_ping_pong(true);
///
/// let (l, r) = delay.process_stereo(0.5, 0.5);
/// assert!(l.is_finite() && r.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct StereoDelay {
    left: DelayChannel,
    right: DelayChannel,
    sample_rate: f32,
    max_delay_samples: f32,

    feedback: SmoothedParam,
    cross_feedback: SmoothedParam,
    wet_mix: SmoothedParam,
    dry_mix: SmoothedParam,
    stereo_width: SmoothedParam,
    ping_pong: bool,

    lfo_rate_hz: f32,
    lfo_depth_samples: f32,

    /// One-pole damping in each channel's straight feedback path; repeats
    /// darken like tape when the cutoff is pulled down.
    feedback_lp_l: OnePole,
    feedback_lp_r: OnePole,
    feedback_lp_hz: f32,

    // Tempo sync overrides the manual delay times with note divisions.
    tempo: TempoManager,
    sync: bool,
    division_left: NoteDivision,
    division_right: NoteDivision,

    distortion: DistortionUnit,
    distortion_enabled: bool,
    feedback_intensity: SmoothedParam,
}

impl StereoDelay {
    /// Create a stereo delay with `max_seconds` of per-channel headroom.
    ///
    /// Defaults: 0.3 s / 0.6 s delays, feedback 0.4, wet 0.7 / dry 1.0,
    /// no ping-pong, width 0, distortion off.
    pub fn new(sample_rate: f32, max_seconds: f32) -> Self {
        let max_delay_samples = sample_rate * max_seconds;
        Self {
            // Opposite LFO phases so the two channels wobble against each
            // other instead of in lockstep.
            left: DelayChannel::new(sample_rate, max_seconds, 0.3, 0.0),
            right: DelayChannel::new(sample_rate, max_seconds, 0.6, 0.5),
            sample_rate,
            max_delay_samples,
            feedback: SmoothedParam::new(0.4, sample_rate, GAIN_SMOOTHING_MS),
            cross_feedback: SmoothedParam::new(0.0, sample_rate, GAIN_SMOOTHING_MS),
            wet_mix: SmoothedParam::new(0.7, sample_rate, GAIN_SMOOTHING_MS),
            dry_mix: SmoothedParam::new(1.0, sample_rate, GAIN_SMOOTHING_MS),
            stereo_width: SmoothedParam::new(0.0, sample_rate, GAIN_SMOOTHING_MS),
            ping_pong: false,
            lfo_rate_hz: 0.0,
            lfo_depth_samples: 0.0,
            feedback_lp_l: OnePole::new(sample_rate, FEEDBACK_LP_BYPASS_HZ),
            feedback_lp_r: OnePole::new(sample_rate, FEEDBACK_LP_BYPASS_HZ),
            feedback_lp_hz: FEEDBACK_LP_BYPASS_HZ,
            tempo: TempoManager::new(sample_rate, 120.0),
            sync: false,
            division_left: NoteDivision::Quarter,
            division_right: NoteDivision::Half,
            distortion: DistortionUnit::new(DistortionKind::SoftClip),
            distortion_enabled: false,
            feedback_intensity: SmoothedParam::new(0.5, sample_rate, GAIN_SMOOTHING_MS),
        }
    }

    /// Set both channel delay times in seconds (clamped to 1 ms .. max).
    /// Ignored while tempo sync is active.
    pub fn set_delay_times(&mut self, left_s: f32, right_s: f32) {
        self.set_left_delay(left_s);
        self.set_right_delay(right_s);
    }

    /// Set the left delay time in seconds. Ignored while synced.
    pub fn set_left_delay(&mut self, seconds: f32) {
        if self.sync {
            return;
        }
        let samples = (seconds * self.sample_rate).clamp(1.0, self.max_delay_samples - 1.0);
        self.left.delay_samples.set_target(samples);
    }

    /// Set the right delay time in seconds. Ignored while synced.
    pub fn set_right_delay(&mut self, seconds: f32) {
        if self.sync {
            return;
        }
        let samples = (seconds * self.sample_rate).clamp(1.0, self.max_delay_samples - 1.0);
        self.right.delay_samples.set_target(samples);
    }

    /// Set the feedback lowpass cutoff. At 20 kHz and above the filter is
    /// bypassed exactly; lower cutoffs darken each repeat.
    pub fn set_feedback_lowpass(&mut self, freq_hz: f32) {
        let freq = freq_hz.clamp(200.0, FEEDBACK_LP_BYPASS_HZ);
        self.feedback_lp_hz = freq;
        self.feedback_lp_l.set_frequency(freq);
        self.feedback_lp_r.set_frequency(freq);
    }

    /// Enable tempo sync: delay times follow the current BPM and the
    /// per-channel note divisions, overriding the manual times.
    pub fn set_tempo_sync(&mut self, enabled: bool) {
        self.sync = enabled;
        if enabled {
            self.apply_synced_times();
        }
    }

    /// Whether tempo sync is active.
    pub fn tempo_sync(&self) -> bool {
        self.sync
    }

    /// Set the per-channel note divisions used while synced.
    pub fn set_divisions(&mut self, left: NoteDivision, right: NoteDivision) {
        self.division_left = left;
        self.division_right = right;
        if self.sync {
            self.apply_synced_times();
        }
    }

    /// Set the tempo used while synced.
    pub fn set_tempo_bpm(&mut self, bpm: f32) {
        self.tempo.set_bpm(bpm);
        if self.sync {
            self.apply_synced_times();
        }
    }

    fn apply_synced_times(&mut self) {
        let left = self
            .tempo
            .division_samples(self.division_left)
            .clamp(1.0, self.max_delay_samples - 1.0);
        let right = self
            .tempo
            .division_samples(self.division_right)
            .clamp(1.0, self.max_delay_samples - 1.0);
        self.left.delay_samples.set_target(left);
        self.right.delay_samples.set_target(right);
    }

    /// Filter one channel's straight feedback contribution.
    #[inline]
    fn damp_feedback(lp: &mut OnePole, lp_hz: f32, signal: f32) -> f32 {
        if lp_hz >= FEEDBACK_LP_BYPASS_HZ {
            signal
        } else {
            lp.process(signal)
        }
    }

    /// Per-channel feedback gain (clamped to 0..=0.9).
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback.set_target(feedback.clamp(0.0, 0.9));
    }

    /// Cross-feedback between channels (clamped to 0..=0.5).
    pub fn set_cross_feedback(&mut self, cross: f32) {
        self.cross_feedback.set_target(cross.clamp(0.0, 0.5));
    }

    /// Wet signal level (0..=1).
    pub fn set_wet_mix(&mut self, wet: f32) {
        self.wet_mix.set_target(wet.clamp(0.0, 1.0));
    }

    /// Dry signal level (0..=1).
    pub fn set_dry_mix(&mut self, dry: f32) {
        self.dry_mix.set_target(dry.clamp(0.0, 1.0));
    }

    /// Mid/side width enhancement (0..=1).
    pub fn set_stereo_width(&mut self, width: f32) {
        self.stereo_width.set_target(width.clamp(0.0, 1.0));
    }

    /// Enable ping-pong routing: each channel's delayed output feeds the
    /// other channel's loop.
    pub fn set_ping_pong(&mut self, enabled: bool) {
        self.ping_pong = enabled;
    }

    /// Current ping-pong state.
    pub fn ping_pong(&self) -> bool {
        self.ping_pong
    }

    /// Configure delay-time modulation (tape wow). Depth is in samples.
    pub fn set_modulation(&mut self, rate_hz: f32, depth_samples: f32) {
        self.lfo_rate_hz = rate_hz.max(0.0);
        self.lfo_depth_samples = depth_samples.max(0.0);
        self.left.lfo.set_frequency(self.lfo_rate_hz);
        self.right.lfo.set_frequency(self.lfo_rate_hz);
    }

    /// Enable or disable the cross-feedback distortion stage.
    pub fn set_distortion_enabled(&mut self, enabled: bool) {
        self.distortion_enabled = enabled;
    }

    /// Mutable access to the embedded distortion unit.
    pub fn distortion_mut(&mut self) -> &mut DistortionUnit {
        &mut self.distortion
    }

    /// How strongly the distorted cross signal replaces the clean one (0..=1).
    pub fn set_feedback_intensity(&mut self, intensity: f32) {
        self.feedback_intensity.set_target(intensity.clamp(0.0, 1.0));
    }

    /// Current post-smoothing delay times in seconds (left, right).
    pub fn current_delay_times(&self) -> (f32, f32) {
        (
            self.left.delay_samples.get() / self.sample_rate,
            self.right.delay_samples.get() / self.sample_rate,
        )
    }

    /// Current post-smoothing feedback gain.
    pub fn current_feedback(&self) -> f32 {
        self.feedback.get()
    }

    /// Current post-smoothing cross-feedback gain.
    pub fn current_cross_feedback(&self) -> f32 {
        self.cross_feedback.get()
    }

    /// Current post-smoothing wet and dry levels.
    pub fn current_mix(&self) -> (f32, f32) {
        (self.wet_mix.get(), self.dry_mix.get())
    }

    /// Current post-smoothing stereo width.
    pub fn current_stereo_width(&self) -> f32 {
        self.stereo_width.get()
    }
}

impl Effect for StereoDelay {
    fn process_stereo(&mut self, left_in: f32, right_in: f32) -> (f32, f32) {
        let feedback = self.feedback.advance();
        let cross = self.cross_feedback.advance();
        let wet = self.wet_mix.advance();
        let dry = self.dry_mix.advance();
        let width = self.stereo_width.advance();
        let intensity = self.feedback_intensity.advance();

        let delay_l = self.left.effective_delay(self.lfo_depth_samples);
        let delay_r = self.right.effective_delay(self.lfo_depth_samples);

        // Tap both lines before any write this step.
        let tap_l = self.left.line.read(delay_l);
        let tap_r = self.right.line.read(delay_r);

        let mut cross_l = tap_r * cross;
        let mut cross_r = tap_l * cross;

        if self.distortion_enabled {
            let shaped_l = self.distortion.process(cross_l);
            let shaped_r = self.distortion.process(cross_r);
            cross_l = cross_l + (shaped_l - cross_l) * intensity;
            cross_r = cross_r + (shaped_r - cross_r) * intensity;
        }

        let (fb_l, fb_r) = if self.ping_pong {
            (tap_r * feedback, tap_l * feedback)
        } else {
            (tap_l * feedback, tap_r * feedback)
        };
        let fb_l = Self::damp_feedback(&mut self.feedback_lp_l, self.feedback_lp_hz, fb_l);
        let fb_r = Self::damp_feedback(&mut self.feedback_lp_r, self.feedback_lp_hz, fb_r);

        self.left.line.write(flush_denormal(left_in + fb_l + cross_l));
        self.right
            .line
            .write(flush_denormal(right_in + fb_r + cross_r));

        // Mid/side width on the wet taps.
        let mid = 0.5 * (tap_l + tap_r);
        let side = 0.5 * (tap_l - tap_r) * (1.0 + width);
        let wet_l = mid + side;
        let wet_r = mid - side;

        (dry * left_in + wet * wet_l, dry * right_in + wet * wet_r)
    }

    fn is_true_stereo(&self) -> bool {
        true
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        // Delay buffers are sized at construction; only the smoothing
        // coefficients and delay-sample targets rescale.
        let ratio = sample_rate / self.sample_rate;
        self.sample_rate = sample_rate;
        for ch in [&mut self.left, &mut self.right] {
            let target = ch.delay_samples.target() * ratio;
            ch.delay_samples.set_sample_rate(sample_rate);
            ch.delay_samples.set_immediate(target);
            ch.lfo.set_sample_rate(sample_rate);
        }
        self.feedback.set_sample_rate(sample_rate);
        self.cross_feedback.set_sample_rate(sample_rate);
        self.wet_mix.set_sample_rate(sample_rate);
        self.dry_mix.set_sample_rate(sample_rate);
        self.stereo_width.set_sample_rate(sample_rate);
        self.feedback_intensity.set_sample_rate(sample_rate);
        self.feedback_lp_l.set_sample_rate(sample_rate);
        self.feedback_lp_r.set_sample_rate(sample_rate);
        self.tempo.set_sample_rate(sample_rate);
        if self.sync {
            self.apply_synced_times();
        }
    }

    fn reset(&mut self) {
        self.left.line.clear();
        self.right.line.clear();
        self.left.delay_samples.snap_to_target();
        self.right.delay_samples.snap_to_target();
        self.left.lfo.set_phase(self.left.lfo_home_phase);
        self.right.lfo.set_phase(self.right.lfo_home_phase);
        self.feedback.snap_to_target();
        self.cross_feedback.snap_to_target();
        self.wet_mix.snap_to_target();
        self.dry_mix.snap_to_target();
        self.stereo_width.snap_to_target();
        self.feedback_intensity.snap_to_target();
        self.feedback_lp_l.reset();
        self.feedback_lp_r.reset();
        self.distortion.reset();
    }
}
