//! Metronome: bar and beat keys at a fixed tempo.

use keytide_midi::{checked_key, NUM_CHANNELS};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::output::{MuteMap, OutputScheduler};
use crate::{Error, Result};

pub const MIN_BPM: u32 = 1;
pub const MAX_BPM: u32 = 999;
/// Notes per bar; `mode` is a byte, so at most 256.
pub const MAX_SUBDIVISIONS: u32 = 256;
/// Subdivided notes per minute above which the spacing drops below 1 ms.
pub const MAX_NOTES_PER_MINUTE: u32 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub enabled: bool,
    /// Bars per minute; each bar is split into `mode + 1` notes.
    pub bpm: u32,
    pub mode: u8,
    /// Key of the first note of a bar. Outside 0-127 the beat key is used.
    pub key_bar: i32,
    pub key_beat: i32,
    pub channel: u8,
    /// Note velocity.
    pub volume: u8,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bpm: 120,
            mode: 0,
            key_bar: 76,
            key_beat: 77,
            channel: 9,
            volume: 96,
        }
    }
}

impl MetronomeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return Err(Error::InvalidTempo(self.bpm));
        }
        if self.channel as usize >= NUM_CHANNELS {
            return Err(keytide_midi::Error::InvalidChannel(self.channel).into());
        }
        checked_key(self.key_beat)?;
        if self.subdivisions() * self.bpm > MAX_NOTES_PER_MINUTE {
            return Err(Error::InvalidConfig(format!(
                "{} subdivisions at {} BPM leave less than 1 ms between notes",
                self.subdivisions(),
                self.bpm
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn subdivisions(&self) -> u32 {
        self.mode as u32 + 1
    }

    /// Timer period, one bar: `60000 / bpm` ms.
    #[inline]
    pub fn period_ms(&self) -> u32 {
        60_000 / self.bpm.max(MIN_BPM)
    }
}

/// Schedule one bar: `subdivisions` notes spaced `60000 / (subdivisions * bpm)`
/// ms apart, the first on `bar_key` when it is a valid key.
///
/// `subdivisions` is clamped to 1-256 and the spacing never drops below 1 ms.
/// Returns the number of notes scheduled.
pub fn emit_beat(
    scheduler: &mut OutputScheduler,
    channel: u8,
    bar_key: i32,
    beat_key: i32,
    subdivisions: u32,
    bpm: u32,
    volume: u8,
) -> usize {
    let subdivisions = subdivisions.clamp(1, MAX_SUBDIVISIONS);
    let per_minute = subdivisions.saturating_mul(bpm.max(MIN_BPM));
    let spacing = (MAX_NOTES_PER_MINUTE / per_minute).max(1);
    let duration = (spacing / 2).max(1);
    let bar_key = checked_key(bar_key).ok();

    let mut scheduled = 0;
    for i in 0..subdivisions {
        let key = match (i, bar_key) {
            (0, Some(key)) => key as i32,
            _ => beat_key,
        };
        if scheduler.schedule_key(channel, key, volume, i * spacing, duration) {
            scheduled += 1;
        }
    }
    scheduled
}

#[derive(Debug, Clone, Default)]
pub struct Metronome {
    config: MetronomeConfig,
    bars: u64,
}

impl Metronome {
    pub fn new(config: MetronomeConfig) -> Self {
        Self { config, bars: 0 }
    }

    pub fn config(&self) -> &MetronomeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MetronomeConfig) {
        self.config = config;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Bars emitted since creation.
    pub fn bars(&self) -> u64 {
        self.bars
    }

    /// Timer tick: emit a bar if the transport lets it through.
    ///
    /// `running` is the global trigger state (trigger set, not paused). The
    /// bar is also skipped when every device mutes the metronome channel.
    pub fn tick(&mut self, scheduler: &mut OutputScheduler, mute: &MuteMap, running: bool) -> usize {
        let config = &self.config;
        if !config.enabled || !running {
            trace!("metronome gated by trigger");
            return 0;
        }
        if !mute.is_channel_audible(config.channel) {
            trace!(channel = config.channel, "metronome channel muted");
            return 0;
        }
        let emitted = emit_beat(
            scheduler,
            config.channel,
            config.key_bar,
            config.key_beat,
            config.subdivisions(),
            config.bpm,
            config.volume,
        );
        self.bars += 1;
        emitted
    }
}
