//! Echo state machine.
//!
//! ```text
//! Disabled --enable--> Armed --new lowest key--> Echoing
//!    ^                   ^                          |
//!    +----disable--------+---count reached/no key---+
//! ```
//!
//! Each tick of the echo timer calls [`EchoGenerator::tick`] with the global
//! lock held.

use keytide_midi::transpose_key;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::config::{EchoConfig, EchoMode, UNITY};
use crate::keys::PressedKeyTable;
use crate::noise::Noise;
use crate::output::OutputScheduler;

/// Upper bound of the fixed-point amplitude (velocity 127 on a 128 scale).
pub const MAX_AMPLITUDE: u32 = 127 * 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoState {
    Disabled,
    Armed,
    Echoing,
}

/// One decay step: `amp * fact / 128 + 127 * jitter`, clamped to
/// `[0, MAX_AMPLITUDE]`. `jitter` is a draw from `noise8(amp_rand)`.
#[inline]
pub fn decay_amplitude(amplitude: u32, amp_fact: u32, jitter: u32) -> u32 {
    let next = (amplitude as u64 * amp_fact as u64) / UNITY as u64 + 127 * jitter as u64;
    next.min(MAX_AMPLITUDE as u64) as u32
}

#[derive(Debug, Clone)]
pub struct EchoGenerator {
    config: EchoConfig,
    enabled: bool,
    dirty: bool,
    state: EchoState,
    sequence_count: u32,
    amplitude: u32,
    /// Key and press stamp that started the current sequence.
    trigger: Option<(u8, u64)>,
}

impl EchoGenerator {
    pub fn new(config: EchoConfig) -> Self {
        Self {
            config,
            enabled: false,
            dirty: false,
            state: EchoState::Disabled,
            sequence_count: 0,
            amplitude: 0,
            trigger: None,
        }
    }

    pub fn config(&self) -> &EchoConfig {
        &self.config
    }

    /// Replace the configuration. The next tick is skipped.
    pub fn set_config(&mut self, config: EchoConfig) {
        self.config = config;
        self.dirty = true;
    }

    /// Mutate the configuration in place. The next tick is skipped.
    pub fn update_config<F: FnOnce(&mut EchoConfig)>(&mut self, f: F) {
        f(&mut self.config);
        self.dirty = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabling starts from a clean state, so configuration applied while
    /// disabled does not cost a tick.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        self.dirty = false;
        self.trigger = None;
        self.sequence_count = 0;
        self.state = if enabled {
            EchoState::Armed
        } else {
            EchoState::Disabled
        };
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn state(&self) -> EchoState {
        self.state
    }

    pub fn sequence_count(&self) -> u32 {
        self.sequence_count
    }

    pub fn amplitude(&self) -> u32 {
        self.amplitude
    }

    /// Run one timer tick. Returns the number of echo notes scheduled.
    pub fn tick(
        &mut self,
        table: &mut PressedKeyTable,
        scheduler: &mut OutputScheduler,
        noise: &mut Noise,
    ) -> usize {
        if !self.enabled {
            self.state = EchoState::Disabled;
            return 0;
        }
        if self.dirty {
            self.dirty = false;
            trace!("echo tick skipped after reconfiguration");
            return 0;
        }

        let Some(lowest) = table.lowest(self.config.in_channel) else {
            self.trigger = None;
            self.state = EchoState::Armed;
            return 0;
        };

        let trigger = (lowest.key, lowest.stamp);
        if self.trigger != Some(trigger) {
            self.trigger = Some(trigger);
            self.sequence_count = 0;
            self.amplitude =
                (lowest.velocity as u32 * self.config.amp_init).min(MAX_AMPLITUDE);
            self.state = EchoState::Echoing;
        }

        if self.state != EchoState::Echoing {
            return 0;
        }
        if self.sequence_count >= self.config.num_echo {
            self.state = EchoState::Armed;
            return 0;
        }
        self.sequence_count += 1;

        let keys = self.select_keys(table);
        if keys.is_empty() {
            self.state = EchoState::Armed;
            return 0;
        }

        let velocity = (self.amplitude / 128).min(127) as u8;
        let mut scheduled = 0;
        if velocity > 0 {
            for key in keys {
                scheduled += self.emit(key, velocity, scheduler, noise);
            }
        }

        let jitter = noise.noise8(self.config.amp_rand);
        self.amplitude = decay_amplitude(self.amplitude, self.config.amp_fact, jitter);

        if self.sequence_count >= self.config.num_echo {
            self.state = EchoState::Armed;
        }
        scheduled
    }

    fn select_keys(&self, table: &mut PressedKeyTable) -> SmallVec<[u8; 16]> {
        let channel = self.config.in_channel;
        match self.config.mode {
            EchoMode::Default => table.chord(channel),
            EchoMode::BaseOnly => {
                let chord = table.chord(channel);
                let mut keys = SmallVec::new();
                if let Some((&base, rest)) = chord.split_first() {
                    keys.push(base);
                    if let Some(&octave) = rest.iter().find(|&&k| (k - base) % 12 == 0) {
                        keys.push(octave);
                    }
                }
                keys
            }
            EchoMode::Slide => table
                .scan_next_where(|p| p.channel == channel)
                .map(|p| p.key)
                .into_iter()
                .collect(),
        }
    }

    fn emit(
        &self,
        key: u8,
        velocity: u8,
        scheduler: &mut OutputScheduler,
        noise: &mut Noise,
    ) -> usize {
        let config = &self.config;
        let Some(out_key) = transpose_key(key as i32, config.transpose) else {
            debug!(key, transpose = config.transpose, "echo key out of range, dropped");
            return 0;
        };
        let jitter = (config.ival_rand as u64 * noise.noise8(UNITY) as u64 / UNITY as u64) as u32;
        let delay = config.ival_init.saturating_add(jitter);
        let duration = (config.ival_repeat / 2).max(1);
        usize::from(scheduler.schedule_key(
            config.out_channel,
            out_key as i32,
            velocity,
            delay,
            duration,
        ))
    }
}
