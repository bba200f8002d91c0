//! Key-click tone and speaker.
//!
//! Two sound sources share one mono output at half volume each:
//!
//! - The key-click tone generator, a fixed-frequency square wave gated by
//!   ppi_m port B bit 1.
//! - The speaker, a 1-bit level from ppi_1 PC4 that BASIC's BEEP toggles.
//!
//! The mix is sampled at the CPU clock and box-filtered down to the output
//! rate.

/// Mixing level of each source.
const SOURCE_LEVEL: f32 = 0.5;

pub struct BeeperState {
    tone_enabled: bool,
    /// Position in the tone's cycle, 0.0 to 1.0.
    tone_phase: f32,
    /// Tone cycles per CPU tick.
    tone_step: f32,
    speaker: bool,
    accumulator: f32,
    sample_count: u32,
    /// CPU ticks per output sample (4,000,000 / 48,000 = 83.3).
    ticks_per_sample: f32,
    buffer: Vec<f32>,
}

impl BeeperState {
    #[must_use]
    pub fn new(cpu_frequency: u32, tone_frequency: u32, sample_rate: u32) -> Self {
        Self {
            tone_enabled: false,
            tone_phase: 0.0,
            tone_step: tone_frequency as f32 / cpu_frequency as f32,
            speaker: false,
            accumulator: 0.0,
            sample_count: 0,
            ticks_per_sample: cpu_frequency as f32 / sample_rate.max(1) as f32,
            buffer: Vec::with_capacity(sample_rate as usize / 50 + 1),
        }
    }

    /// Gate the key-click tone.
    pub fn set_tone(&mut self, enabled: bool) {
        if enabled != self.tone_enabled {
            log::trace!("key-click tone {}", if enabled { "on" } else { "off" });
        }
        self.tone_enabled = enabled;
    }

    #[must_use]
    pub fn tone_enabled(&self) -> bool {
        self.tone_enabled
    }

    /// Drive the speaker level.
    pub fn set_speaker(&mut self, level: bool) {
        self.speaker = level;
    }

    #[must_use]
    pub fn speaker(&self) -> bool {
        self.speaker
    }

    /// Advance one CPU tick.
    pub fn sample(&mut self) {
        let tone = if self.tone_enabled {
            self.tone_phase = (self.tone_phase + self.tone_step).fract();
            if self.tone_phase < 0.5 { 1.0 } else { -1.0 }
        } else {
            0.0
        };
        let speaker = if self.speaker { 1.0 } else { 0.0 };

        self.accumulator += (tone + speaker) * SOURCE_LEVEL;
        self.sample_count += 1;

        if self.sample_count as f32 >= self.ticks_per_sample {
            self.buffer.push(self.accumulator / self.sample_count as f32);
            self.accumulator = 0.0;
            self.sample_count = 0;
        }
    }

    /// Take the output buffer (drains it).
    pub fn take_buffer(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.buffer)
    }
}
