//! Per-block orchestration.
//!
//! The engine owns every long-lived buffer (delay lines, voice pool,
//! analysis ring) and runs the fixed processing chain inside the host's
//! periodic callback:
//!
//! 1. drain the parameter bus (skipped when the generation is unchanged)
//! 2. poll the latched chord and regenerate the arp timeline if anything
//!    affecting it changed
//! 3. per frame: sanitize input, schedule arp notes, sum synth voices,
//!    run the stereo delay, clamp to the output rails, write the frame
//! 4. feed the input block to the chord detector and publish status
//!
//! `process` is total: anomalies are recovered locally (offending samples
//! become silence) and counted; nothing propagates out of the callback.

use crate::config::EngineConfig;
use crate::error::{
    AnomalyKind, EngineError, LifecycleError, ResourceError, Result,
};
use crate::params::{ParamBus, ParamId};
use crate::status::{AudibleLevels, StatusShared, StatusSnapshot};
use cuerda_arp::{generate, ArpPattern, ArpTimeline};
use cuerda_core::{output_clamp, saturate_guard, Effect, NoteDivision};
use cuerda_detect::{ChordDetector, ChordQuality, DetectorConfig, PitchClass};
use cuerda_effects::{DistortionKind, StereoDelay};
use cuerda_synth::{VoiceAllocation, VoicePool, Waveform};
use std::sync::Arc;
use std::time::Instant;

/// Compile-time ceiling on callback block length.
pub const MAX_BLOCK_FRAMES: usize = 8192;

/// Memory budget for the two delay lines.
const DELAY_MEMORY_BUDGET_BYTES: usize = 64 * 1024 * 1024;

/// Gain applied to the summed synth bus before it joins the input.
const ARP_BUS_GAIN: f32 = 0.7;

/// A note currently held by the pool, with its scheduled end.
#[derive(Debug, Clone, Copy)]
struct SoundingNote {
    pitch_class: PitchClass,
    octave: i32,
    end_clock: u64,
}

/// The real-time DSP core.
///
/// Built once from a validated [`EngineConfig`]; all buffers are allocated
/// here and never reallocated during streaming. Control collaborators
/// interact through the [`EngineHandle`].
pub struct Engine {
    sample_rate: f32,
    block_size: usize,

    params: Arc<ParamBus>,
    status: Arc<StatusShared>,
    last_generation: u64,

    delay: StereoDelay,
    delay_enabled: bool,

    detector: ChordDetector,

    pool: VoicePool,
    synth_kind: Waveform,
    arp_enabled: bool,
    tempo_bpm: f32,
    pattern: ArpPattern,
    arp_duration_s: f32,
    arp_seed: u32,
    regen_counter: u32,
    arp_dirty: bool,

    timeline: ArpTimeline,
    timeline_samples: u64,
    arp_pos: u64,
    next_note_idx: usize,
    engine_clock: u64,
    sounding: Vec<SoundingNote>,
    last_chord_key: Option<(PitchClass, ChordQuality)>,

    mono_scratch: Vec<f32>,
}

impl Engine {
    /// Validate the configuration, allocate every buffer, and build the
    /// engine in the stopped state.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate().map_err(EngineError::Config)?;

        if config.block_size > MAX_BLOCK_FRAMES {
            return Err(ResourceError::BlockTooLarge {
                requested: config.block_size,
                ceiling: MAX_BLOCK_FRAMES,
            }
            .into());
        }

        let sample_rate = config.sample_rate as f32;
        let line_samples = (sample_rate * config.max_delay_seconds) as usize + 1;
        let delay_bytes = line_samples * 2 * core::mem::size_of::<f32>();
        if delay_bytes > DELAY_MEMORY_BUDGET_BYTES {
            return Err(ResourceError::DelayBufferTooLarge {
                requested_bytes: delay_bytes,
                budget_bytes: DELAY_MEMORY_BUDGET_BYTES,
            }
            .into());
        }

        let pattern = config.parsed_pattern().map_err(EngineError::Config)?;
        let synth_kind = config.parsed_synth().map_err(EngineError::Config)?;

        let mut detector_config = DetectorConfig::new(sample_rate);
        detector_config.min_confidence = config.min_chord_confidence;
        detector_config.hold_time_s = config.chord_hold_time_s;
        // One FFT per stride bounds per-block work; the stride must cover a
        // whole block for that to hold.
        detector_config.analysis_stride = detector_config.analysis_stride.max(config.block_size);

        let params = Arc::new(ParamBus::new(|id| {
            initial_param(id, &config, pattern, synth_kind)
        }));

        let mut pool = VoicePool::new(config.voice_count, sample_rate);
        pool.set_voice_gain(1.0);

        Ok(Self {
            sample_rate,
            block_size: config.block_size,
            params,
            status: Arc::new(StatusShared::new()),
            last_generation: 0,
            delay: StereoDelay::new(sample_rate, config.max_delay_seconds),
            delay_enabled: config.delay_enabled,
            detector: ChordDetector::new(detector_config),
            pool,
            synth_kind,
            arp_enabled: config.arp_enabled,
            tempo_bpm: config.tempo_bpm,
            pattern,
            arp_duration_s: config.arp_duration_s,
            arp_seed: config.arp_seed,
            regen_counter: 0,
            arp_dirty: false,
            timeline: ArpTimeline::empty(),
            timeline_samples: 0,
            arp_pos: 0,
            next_note_idx: 0,
            engine_clock: 0,
            sounding: Vec::with_capacity(config.voice_count * 2),
            last_chord_key: None,
            mono_scratch: vec![0.0; config.block_size.min(MAX_BLOCK_FRAMES)],
        })
    }

    /// Control-side handle: parameter bus plus status readout.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            params: Arc::clone(&self.params),
            status: Arc::clone(&self.status),
        }
    }

    /// Session sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Configured block size in frames.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Arm the pipeline.
    pub fn start(&mut self) -> Result<()> {
        if self.status.is_running() {
            return Err(LifecycleError::AlreadyRunning.into());
        }
        self.status.set_running(true);
        Ok(())
    }

    /// Disarm the pipeline. Idempotent; effect state is preserved.
    pub fn stop(&mut self) {
        self.status.set_running(false);
    }

    /// Whether the pipeline is armed.
    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Zero delay buffers, voice state, detector history, and the arp
    /// cursor. Idempotent; parameters keep their current targets (pending
    /// bus writes are applied and snapped so nothing glides afterwards).
    pub fn reset(&mut self) {
        self.drain_params();
        self.delay.reset();
        self.pool.reset();
        self.detector.reset();
        self.timeline = ArpTimeline::empty();
        self.timeline_samples = 0;
        self.arp_pos = 0;
        self.next_note_idx = 0;
        self.sounding.clear();
        self.last_chord_key = None;
        self.status.publish_chord(None);
    }

    /// Process one interleaved stereo block.
    ///
    /// Total: never fails, never allocates on the steady-state path, always
    /// fills `output`. A stopped engine emits silence.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let started = Instant::now();
        let frames = (input.len() / 2).min(output.len() / 2);

        if !self.status.is_running() {
            output.fill(0.0);
            return;
        }

        self.drain_params();
        self.maybe_regenerate();

        let mut input_peak = 0.0f32;
        let mut output_peak = 0.0f32;

        for i in 0..frames {
            let mut l_in = input[2 * i];
            let mut r_in = input[2 * i + 1];
            if !l_in.is_finite() {
                self.status.count_anomaly(AnomalyKind::NonFiniteSample);
                l_in = 0.0;
            }
            if !r_in.is_finite() {
                self.status.count_anomaly(AnomalyKind::NonFiniteSample);
                r_in = 0.0;
            }
            input_peak = input_peak.max(l_in.abs()).max(r_in.abs());

            // The voice bus is soft-limited above 0.99 before it joins the
            // input so a full pool cannot swamp the chain; quieter material
            // passes untouched.
            let synth = if self.arp_enabled {
                self.advance_arp();
                saturate_guard(self.pool.process()) * ARP_BUS_GAIN
            } else {
                0.0
            };

            let l_pre = l_in + synth;
            let r_pre = r_in + synth;

            let (l_post, r_post) = if self.delay_enabled {
                self.delay.process_stereo(l_pre, r_pre)
            } else {
                (l_pre, r_pre)
            };

            let mut l_out = l_post;
            let mut r_out = r_post;
            if !l_out.is_finite() {
                self.status.count_anomaly(AnomalyKind::NonFiniteSample);
                l_out = 0.0;
            }
            if !r_out.is_finite() {
                self.status.count_anomaly(AnomalyKind::NonFiniteSample);
                r_out = 0.0;
            }
            // Transparent through full scale: a clean unity echo leaves at
            // exactly 1.0, only material beyond the rails is pinned.
            let l_out = output_clamp(l_out);
            let r_out = output_clamp(r_out);
            output_peak = output_peak.max(l_out.abs()).max(r_out.abs());

            output[2 * i] = l_out;
            output[2 * i + 1] = r_out;

            if i < self.mono_scratch.len() {
                self.mono_scratch[i] = 0.5 * (l_in + r_in);
            }
            self.engine_clock += 1;
        }

        // Anything the caller over-allocated stays silent.
        output[frames * 2..].fill(0.0);

        let fed = frames.min(self.mono_scratch.len());
        self.detector.feed(&self.mono_scratch[..fed]);
        if self.detector.is_behind() {
            self.status.count_anomaly(AnomalyKind::AnalysisSkipped);
        }

        let budget_s = frames as f32 / self.sample_rate;
        let cpu_load = if budget_s > 0.0 {
            started.elapsed().as_secs_f32() / budget_s
        } else {
            0.0
        };
        self.status.publish_chord(self.detector.latched());
        self.status
            .publish_block(self.pool.active_count(), input_peak, output_peak, cpu_load);

        let (left_delay_s, right_delay_s) = self.delay.current_delay_times();
        let (wet_mix, dry_mix) = self.delay.current_mix();
        self.status.publish_audible(AudibleLevels {
            left_delay_s,
            right_delay_s,
            feedback: self.delay.current_feedback(),
            cross_feedback: self.delay.current_cross_feedback(),
            wet_mix,
            dry_mix,
            stereo_width: self.delay.current_stereo_width(),
        });
    }

    /// Apply pending parameter-bus writes. Cheap no-op while the bus
    /// generation is unchanged.
    fn drain_params(&mut self) {
        let generation = self.params.generation();
        if generation == self.last_generation {
            return;
        }
        self.last_generation = generation;
        let params = Arc::clone(&self.params);

        self.delay.set_feedback(params.get(ParamId::Feedback));
        self.delay.set_wet_mix(params.get(ParamId::WetMix));
        self.delay.set_dry_mix(params.get(ParamId::DryMix));
        self.delay.set_ping_pong(params.get_bool(ParamId::PingPong));
        self.delay.set_stereo_width(params.get(ParamId::StereoWidth));
        self.delay
            .set_cross_feedback(params.get(ParamId::CrossFeedback));
        self.delay
            .set_distortion_enabled(params.get_bool(ParamId::DistortionEnabled));
        self.delay
            .set_feedback_intensity(params.get(ParamId::DistortionFeedbackIntensity));

        let kind = DistortionKind::ALL[params.get(ParamId::DistortionKind) as usize];
        self.delay.distortion_mut().set_kind(kind);
        self.delay
            .distortion_mut()
            .set_drive(params.get(ParamId::DistortionDrive));
        self.delay
            .distortion_mut()
            .set_mix(params.get(ParamId::DistortionMix));

        self.delay
            .set_feedback_lowpass(params.get(ParamId::DelayFeedbackLpHz));
        let left_div = NoteDivision::ALL[params.get(ParamId::LeftDivision) as usize];
        let right_div = NoteDivision::ALL[params.get(ParamId::RightDivision) as usize];
        self.delay.set_divisions(left_div, right_div);
        self.delay
            .set_tempo_sync(params.get_bool(ParamId::DelaySync));

        let bpm = params.get(ParamId::Bpm);
        self.delay.set_tempo_bpm(bpm);
        // Manual delay times land last: they are ignored while synced, and
        // they take back over the moment sync drops.
        self.delay.set_left_delay(params.get(ParamId::LeftDelayS));
        self.delay.set_right_delay(params.get(ParamId::RightDelayS));
        if bpm != self.tempo_bpm {
            self.tempo_bpm = bpm;
            self.arp_dirty = true;
        }
        let pattern = ArpPattern::ALL[params.get(ParamId::Pattern) as usize];
        if pattern != self.pattern {
            self.pattern = pattern;
            self.arp_dirty = true;
        }
        let duration = params.get(ParamId::ArpDurationS);
        if duration != self.arp_duration_s {
            self.arp_duration_s = duration;
            self.arp_dirty = true;
        }
        self.synth_kind = Waveform::ALL[params.get(ParamId::SynthKind) as usize];

        let arp_enabled = params.get_bool(ParamId::ArpEnabled);
        if arp_enabled != self.arp_enabled {
            self.arp_enabled = arp_enabled;
            self.arp_dirty = true;
            if !arp_enabled {
                self.pool.release_all();
            }
        }
        self.delay_enabled = params.get_bool(ParamId::DelayEnabled);

        self.detector
            .set_min_confidence(params.get(ParamId::MinChordConfidence));
        self.detector
            .set_hold_time(params.get(ParamId::ChordHoldTimeS));
    }

    /// Rebuild the arp timeline when the latched chord or any arp parameter
    /// changed. Regeneration resets the play cursor and cancels held notes.
    fn maybe_regenerate(&mut self) {
        if !self.arp_enabled {
            if self.last_chord_key.is_some() || !self.timeline.is_empty() {
                self.clear_timeline();
            }
            return;
        }

        let key = self
            .detector
            .latched()
            .map(|c| (c.root, c.quality));
        if key == self.last_chord_key && !self.arp_dirty {
            return;
        }
        self.arp_dirty = false;
        self.last_chord_key = key;

        // Copy the chord tones out before touching the rest of the engine.
        let mut chord_notes = [PitchClass::C; 12];
        let mut count = 0;
        if let Some(chord) = self.detector.latched() {
            for (i, &pc) in chord.notes.iter().take(12).enumerate() {
                chord_notes[i] = pc;
                count = i + 1;
            }
        }

        if count == 0 {
            self.clear_timeline();
            return;
        }

        self.regen_counter = self.regen_counter.wrapping_add(1);
        let seed = self.arp_seed.wrapping_add(self.regen_counter);
        self.timeline = generate(
            &chord_notes[..count],
            self.pattern,
            self.tempo_bpm,
            self.arp_duration_s,
            seed,
        );
        self.timeline_samples = ((self.timeline.duration_s() * self.sample_rate) as u64).max(1);
        self.arp_pos = 0;
        self.next_note_idx = 0;
        self.sounding.clear();
        self.pool.release_all();
    }

    fn clear_timeline(&mut self) {
        self.last_chord_key = None;
        self.timeline = ArpTimeline::empty();
        self.timeline_samples = 0;
        self.arp_pos = 0;
        self.next_note_idx = 0;
        self.sounding.clear();
        self.pool.release_all();
    }

    /// One frame of arp scheduling: trigger due notes, release ended ones.
    /// The timeline loops for as long as its chord stays latched.
    #[inline]
    fn advance_arp(&mut self) {
        if self.timeline.is_empty() {
            return;
        }

        if self.arp_pos >= self.timeline_samples {
            self.arp_pos = 0;
            self.next_note_idx = 0;
        }

        let notes = self.timeline.notes();
        while self.next_note_idx < notes.len() {
            let note = notes[self.next_note_idx];
            let start = (note.start_time * self.sample_rate) as u64;
            if start > self.arp_pos {
                break;
            }
            self.next_note_idx += 1;

            let allocation =
                self.pool
                    .note_on(note.pitch_class, note.octave, note.velocity, self.synth_kind);
            if allocation == VoiceAllocation::StoleActive {
                self.status.count_anomaly(AnomalyKind::VoiceExhausted);
            }

            if self.sounding.len() == self.sounding.capacity() {
                // Held-note ledger full: release the oldest entry early.
                let old = self.sounding.swap_remove(0);
                self.pool.note_off(old.pitch_class, old.octave);
            }
            let duration_samples = (note.duration * self.sample_rate) as u64;
            self.sounding.push(SoundingNote {
                pitch_class: note.pitch_class,
                octave: note.octave,
                end_clock: self.engine_clock + duration_samples,
            });
        }

        let mut i = 0;
        while i < self.sounding.len() {
            if self.sounding[i].end_clock <= self.engine_clock {
                let done = self.sounding.swap_remove(i);
                self.pool.note_off(done.pitch_class, done.octave);
            } else {
                i += 1;
            }
        }

        self.arp_pos += 1;
    }
}

/// Initial bus value for each parameter.
fn initial_param(
    id: ParamId,
    config: &EngineConfig,
    pattern: ArpPattern,
    synth: Waveform,
) -> f32 {
    match id {
        ParamId::LeftDelayS => 0.3,
        ParamId::RightDelayS => 0.6,
        ParamId::Feedback => 0.4,
        ParamId::WetMix => 0.7,
        ParamId::DryMix => 1.0,
        ParamId::PingPong => 0.0,
        ParamId::StereoWidth => 0.0,
        ParamId::CrossFeedback => 0.0,
        ParamId::DistortionEnabled => 0.0,
        ParamId::DistortionKind => 0.0,
        ParamId::DistortionDrive => 0.5,
        ParamId::DistortionMix => 1.0,
        ParamId::DistortionFeedbackIntensity => 0.5,
        ParamId::Bpm => config.tempo_bpm,
        ParamId::Pattern => ArpPattern::ALL.iter().position(|&p| p == pattern).unwrap() as f32,
        ParamId::SynthKind => Waveform::ALL.iter().position(|&w| w == synth).unwrap() as f32,
        ParamId::ArpDurationS => config.arp_duration_s,
        ParamId::ArpEnabled => config.arp_enabled as u32 as f32,
        ParamId::DelayEnabled => config.delay_enabled as u32 as f32,
        ParamId::DelayFeedbackLpHz => 20_000.0,
        ParamId::DelaySync => 0.0,
        ParamId::LeftDivision => division_index(NoteDivision::Quarter),
        ParamId::RightDivision => division_index(NoteDivision::Half),
        ParamId::MinChordConfidence => config.min_chord_confidence,
        ParamId::ChordHoldTimeS => config.chord_hold_time_s,
    }
}

fn division_index(division: NoteDivision) -> f32 {
    NoteDivision::ALL.iter().position(|&d| d == division).unwrap() as f32
}

/// Control-side view of a running engine: parameter writes and the status
/// snapshot. Clone freely; all access is lock-free.
#[derive(Clone)]
pub struct EngineHandle {
    params: Arc<ParamBus>,
    status: Arc<StatusShared>,
}

impl EngineHandle {
    /// Set a continuous parameter.
    pub fn set(&self, id: ParamId, value: f32) -> std::result::Result<(), crate::error::ConfigError> {
        self.params.set(id, value)
    }

    /// Set a toggle parameter.
    pub fn set_bool(&self, id: ParamId, on: bool) -> std::result::Result<(), crate::error::ConfigError> {
        self.params.set_bool(id, on)
    }

    /// Set a choice parameter by name ("fuzz", "up_down", "pad", ...).
    pub fn set_named(&self, id: ParamId, name: &str) -> std::result::Result<(), crate::error::ConfigError> {
        self.params.set_named(id, name)
    }

    /// Last accepted target for a parameter.
    pub fn get(&self, id: ParamId) -> f32 {
        self.params.get(id)
    }

    /// Point-in-time engine status.
    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn start_twice_fails() {
        let mut e = engine();
        e.start().unwrap();
        assert!(matches!(
            e.start(),
            Err(EngineError::Lifecycle(LifecycleError::AlreadyRunning))
        ));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut e = engine();
        e.stop();
        e.stop();
        e.start().unwrap();
        e.stop();
        e.stop();
        assert!(!e.is_running());
    }

    #[test]
    fn stopped_engine_emits_silence() {
        let mut e = engine();
        let input = vec![0.5; 1024];
        let mut output = vec![1.0; 1024];
        e.process(&input, &mut output);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn ceiling_block_size_is_accepted() {
        let config = EngineConfig {
            block_size: 8192,
            ..Default::default()
        };
        // 8192 passes both the config range and the engine ceiling.
        assert!(Engine::new(config).is_ok());
    }

    #[test]
    fn delay_budget_admits_the_supported_extremes() {
        let config = EngineConfig {
            sample_rate: 192_000,
            max_delay_seconds: 10.0,
            ..Default::default()
        };
        // 192k * 10s * 2 lines * 4 bytes is ~15 MB, inside the budget.
        assert!(Engine::new(config).is_ok());
    }

    #[test]
    fn reset_is_idempotent() {
        let mut e = engine();
        e.start().unwrap();
        let input = vec![0.25; 1024];
        let mut output = vec![0.0; 1024];
        e.process(&input, &mut output);
        e.reset();
        e.reset();
        assert!(e.is_running());
    }

    #[test]
    fn handle_survives_the_engine_lifecycle() {
        let mut e = engine();
        let handle = e.handle();
        assert!(!handle.status().running);
        e.start().unwrap();
        assert!(handle.status().running);
        handle.set(ParamId::Feedback, 0.2).unwrap();
        assert_eq!(handle.get(ParamId::Feedback), 0.2);
    }

    #[test]
    fn short_output_buffer_is_tolerated() {
        let mut e = engine();
        e.start().unwrap();
        let input = vec![0.5; 1024];
        let mut output = vec![0.0; 512];
        // Processes the min of the two lengths; must not panic.
        e.process(&input, &mut output);
    }
}
