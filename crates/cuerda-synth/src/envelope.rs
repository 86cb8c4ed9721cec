//! Linear-segment ADSR envelope for arp voices.

/// Envelope states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeState {
    /// Inactive, output zero.
    #[default]
    Idle,
    /// Rising toward peak.
    Attack,
    /// Falling toward the sustain level.
    Decay,
    /// Holding the sustain level while the gate is on.
    Sustain,
    /// Falling toward zero after gate release.
    Release,
}

/// ADSR envelope with linear segments.
///
/// Attack, decay, and release times are independent of note duration; the
/// release slope is fixed at gate-off so a voice released early still fades
/// over the configured release time.
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    state: EnvelopeState,
    level: f32,
    sample_rate: f32,

    attack_ms: f32,
    decay_ms: f32,
    sustain: f32,
    release_ms: f32,

    attack_inc: f32,
    decay_dec: f32,
    release_dec: f32,
}

impl AdsrEnvelope {
    /// Create an envelope with the given segment times.
    pub fn new(sample_rate: f32, attack_ms: f32, decay_ms: f32, sustain: f32, release_ms: f32) -> Self {
        let mut env = Self {
            state: EnvelopeState::Idle,
            level: 0.0,
            sample_rate,
            attack_ms: attack_ms.max(0.1),
            decay_ms: decay_ms.max(0.1),
            sustain: sustain.clamp(0.0, 1.0),
            release_ms: release_ms.max(0.1),
            attack_inc: 0.0,
            decay_dec: 0.0,
            release_dec: 0.0,
        };
        env.recalculate();
        env
    }

    /// Update the sample rate and recompute slopes.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Replace all four segment parameters at once.
    pub fn configure(&mut self, attack_ms: f32, decay_ms: f32, sustain: f32, release_ms: f32) {
        self.attack_ms = attack_ms.max(0.1);
        self.decay_ms = decay_ms.max(0.1);
        self.sustain = sustain.clamp(0.0, 1.0);
        self.release_ms = release_ms.max(0.1);
        self.recalculate();
    }

    /// Trigger the envelope. The level is preserved for smooth retriggers.
    pub fn gate_on(&mut self) {
        self.state = EnvelopeState::Attack;
    }

    /// Release the envelope from any active state.
    pub fn gate_off(&mut self) {
        if self.state != EnvelopeState::Idle {
            self.state = EnvelopeState::Release;
        }
    }

    /// Force idle with zero output.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
        self.level = 0.0;
    }

    /// Current state.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Current level without advancing.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// True while the envelope produces output.
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// True once the gate has been released (or the envelope finished).
    pub fn is_released(&self) -> bool {
        matches!(self.state, EnvelopeState::Release | EnvelopeState::Idle)
    }

    /// Advance one sample and return the level in [0, 1].
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.state {
            EnvelopeState::Idle => self.level = 0.0,
            EnvelopeState::Attack => {
                self.level += self.attack_inc;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.state = EnvelopeState::Decay;
                }
            }
            EnvelopeState::Decay => {
                self.level -= self.decay_dec;
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.state = EnvelopeState::Sustain;
                }
            }
            EnvelopeState::Sustain => self.level = self.sustain,
            EnvelopeState::Release => {
                self.level -= self.release_dec;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }
        self.level
    }

    fn recalculate(&mut self) {
        let ms_to_samples = self.sample_rate / 1000.0;
        self.attack_inc = 1.0 / (self.attack_ms * ms_to_samples).max(1.0);
        self.decay_dec = (1.0 - self.sustain).max(0.0) / (self.decay_ms * ms_to_samples).max(1.0);
        self.release_dec = 1.0 / (self.release_ms * ms_to_samples).max(1.0);
        if self.decay_dec == 0.0 {
            // Sustain at peak: skip the decay segment in one step.
            self.decay_dec = 1.0;
        }
    }
}
