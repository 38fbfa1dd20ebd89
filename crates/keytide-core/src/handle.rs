//! Fluent API handles for echo and metronome control

use keytide_midi::{MAX_KEY, NUM_CHANNELS};
use tracing::debug;

use crate::echo::{EchoConfig, EchoMode, EchoState, MAX_INTERVAL_MS, UNITY};
use crate::state::{Core, EchoId};
use crate::transport::{MetronomeConfig, MAX_BPM, MIN_BPM};
use crate::Result;

const MAX_CHANNEL: u8 = NUM_CHANNELS as u8 - 1;

/// Fluent API handle for one echo generator.
///
/// Created via `core.echo()`. The generator lives as long as the handle:
/// dropping it removes the generator and cancels its timer.
///
/// # Example
/// ```ignore
/// let echo = core.echo(EchoConfig::default())?
///     .repeat_ms(200)
///     .count(6)
///     .transpose(12)
///     .enable();
/// ```
pub struct EchoHandle {
    core: Core,
    id: EchoId,
}

impl EchoHandle {
    pub(crate) fn new(core: Core, config: EchoConfig) -> Result<Self> {
        let id = core.lock().add_echo(config)?;
        Ok(Self { core, id })
    }

    pub fn id(&self) -> EchoId {
        self.id
    }

    fn update<F: FnOnce(&mut EchoConfig)>(&self, f: F) {
        if let Err(e) = self.core.lock().update_echo_config(self.id, f) {
            debug!(id = ?self.id, error = %e, "echo update rejected");
        }
    }

    fn read<R>(&self, f: impl FnOnce(&EchoConfig) -> R) -> Option<R> {
        self.core.lock().echo(self.id).map(|echo| f(echo.config()))
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Option<EchoConfig> {
        self.read(|c| c.clone())
    }

    /// Replace the whole configuration.
    pub fn set_config(&self, config: EchoConfig) -> Result<()> {
        self.core.lock().set_echo_config(self.id, config)
    }

    pub fn state(&self) -> Option<EchoState> {
        self.core.lock().echo(self.id).map(|echo| echo.state())
    }

    /// Enable the generator.
    pub fn enable(self) -> Self {
        self.core.lock().set_echo_enabled(self.id, true);
        self
    }

    /// Disable the generator.
    pub fn disable(self) -> Self {
        self.core.lock().set_echo_enabled(self.id, false);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.core
            .lock()
            .echo(self.id)
            .is_some_and(|echo| echo.is_enabled())
    }

    /// Delay of each echo note after its tick (ms).
    pub fn initial_ms(self, ms: u32) -> Self {
        self.update(|c| c.ival_init = ms.min(MAX_INTERVAL_MS));
        self
    }

    pub fn get_initial_ms(&self) -> u32 {
        self.read(|c| c.ival_init).unwrap_or_default()
    }

    /// Tick period (ms). Zero pauses the generator.
    pub fn repeat_ms(self, ms: u32) -> Self {
        self.update(|c| c.ival_repeat = ms.min(MAX_INTERVAL_MS));
        self
    }

    pub fn get_repeat_ms(&self) -> u32 {
        self.read(|c| c.ival_repeat).unwrap_or_default()
    }

    /// Random extra delay, up to `ms`.
    pub fn random_ms(self, ms: u32) -> Self {
        self.update(|c| c.ival_rand = ms.min(MAX_INTERVAL_MS));
        self
    }

    pub fn get_random_ms(&self) -> u32 {
        self.read(|c| c.ival_rand).unwrap_or_default()
    }

    /// Initial amplitude factor, 128 = unity.
    pub fn amplitude(self, factor: u32) -> Self {
        self.update(|c| c.amp_init = factor.min(UNITY));
        self
    }

    pub fn get_amplitude(&self) -> u32 {
        self.read(|c| c.amp_init).unwrap_or_default()
    }

    /// Per-echo decay factor, 128 = unity.
    pub fn decay(self, factor: u32) -> Self {
        self.update(|c| c.amp_fact = factor.min(UNITY));
        self
    }

    pub fn get_decay(&self) -> u32 {
        self.read(|c| c.amp_fact).unwrap_or_default()
    }

    /// Random amplitude jitter factor, 128 = unity.
    pub fn amplitude_jitter(self, factor: u32) -> Self {
        self.update(|c| c.amp_rand = factor.min(UNITY));
        self
    }

    pub fn get_amplitude_jitter(&self) -> u32 {
        self.read(|c| c.amp_rand).unwrap_or_default()
    }

    /// Echoes per held key.
    pub fn count(self, count: u32) -> Self {
        self.update(|c| c.num_echo = count);
        self
    }

    pub fn get_count(&self) -> u32 {
        self.read(|c| c.num_echo).unwrap_or_default()
    }

    /// Semitone offset applied to echoed keys.
    pub fn transpose(self, semitones: i32) -> Self {
        let limit = MAX_KEY as i32;
        self.update(|c| c.transpose = semitones.clamp(-limit, limit));
        self
    }

    pub fn get_transpose(&self) -> i32 {
        self.read(|c| c.transpose).unwrap_or_default()
    }

    /// Channel whose held keys are echoed.
    pub fn input_channel(self, channel: u8) -> Self {
        self.update(|c| c.in_channel = channel.min(MAX_CHANNEL));
        self
    }

    pub fn get_input_channel(&self) -> u8 {
        self.read(|c| c.in_channel).unwrap_or_default()
    }

    /// Channel echo notes are sent on.
    pub fn output_channel(self, channel: u8) -> Self {
        self.update(|c| c.out_channel = channel.min(MAX_CHANNEL));
        self
    }

    pub fn get_output_channel(&self) -> u8 {
        self.read(|c| c.out_channel).unwrap_or_default()
    }

    /// Score view whose pressed keys are read. Unknown views are rejected.
    pub fn view(self, view: usize) -> Self {
        self.update(|c| c.view = view);
        self
    }

    pub fn get_view(&self) -> usize {
        self.read(|c| c.view).unwrap_or_default()
    }

    pub fn mode(self, mode: EchoMode) -> Self {
        self.update(|c| c.mode = mode);
        self
    }

    pub fn get_mode(&self) -> EchoMode {
        self.read(|c| c.mode).unwrap_or_default()
    }
}

impl Drop for EchoHandle {
    fn drop(&mut self) {
        if self.core.lock().remove_echo(self.id) {
            debug!(id = ?self.id, "echo removed");
        }
    }
}

/// Fluent API handle for metronome control.
///
/// Created via `core.metronome()`. Every setter reinstalls the configuration,
/// which starts, retimes or stops the metronome timer.
///
/// # Example
/// ```ignore
/// core.metronome()
///     .tempo(96)
///     .subdivisions(4)
///     .volume(80)
///     .on();
/// ```
#[derive(Clone)]
pub struct MetronomeHandle {
    core: Core,
}

impl MetronomeHandle {
    pub(crate) fn new(core: Core) -> Self {
        Self { core }
    }

    fn update<F: FnOnce(&mut MetronomeConfig)>(&self, f: F) {
        let mut state = self.core.lock();
        let mut config = state.metronome().config().clone();
        f(&mut config);
        if let Err(e) = state.set_metronome_config(config) {
            debug!(error = %e, "metronome update rejected");
        }
    }

    fn read<R>(&self, f: impl FnOnce(&MetronomeConfig) -> R) -> R {
        f(self.core.lock().metronome().config())
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> MetronomeConfig {
        self.read(|c| c.clone())
    }

    /// Replace the whole configuration.
    pub fn set_config(&self, config: MetronomeConfig) -> Result<()> {
        self.core.lock().set_metronome_config(config)
    }

    /// Turn the metronome on.
    pub fn on(self) -> Self {
        self.update(|c| c.enabled = true);
        self
    }

    /// Turn the metronome off.
    pub fn off(self) -> Self {
        self.update(|c| c.enabled = false);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.read(|c| c.enabled)
    }

    /// Set tempo in BPM (clamped to 1-999).
    pub fn tempo(self, bpm: u32) -> Self {
        self.update(|c| c.bpm = bpm.clamp(MIN_BPM, MAX_BPM));
        self
    }

    pub fn get_tempo(&self) -> u32 {
        self.read(|c| c.bpm)
    }

    /// Notes per bar; the first uses the bar key.
    pub fn subdivisions(self, count: u32) -> Self {
        self.update(|c| c.mode = (count.clamp(1, 256) - 1) as u8);
        self
    }

    pub fn get_subdivisions(&self) -> u32 {
        self.read(|c| c.subdivisions())
    }

    /// Key of the first note of each bar.
    pub fn bar_key(self, key: i32) -> Self {
        self.update(|c| c.key_bar = key);
        self
    }

    pub fn get_bar_key(&self) -> i32 {
        self.read(|c| c.key_bar)
    }

    /// Key of the remaining notes of each bar.
    pub fn beat_key(self, key: i32) -> Self {
        self.update(|c| c.key_beat = key);
        self
    }

    pub fn get_beat_key(&self) -> i32 {
        self.read(|c| c.key_beat)
    }

    pub fn channel(self, channel: u8) -> Self {
        self.update(|c| c.channel = channel.min(MAX_CHANNEL));
        self
    }

    pub fn get_channel(&self) -> u8 {
        self.read(|c| c.channel)
    }

    /// Note velocity (0-127).
    pub fn volume(self, volume: u8) -> Self {
        self.update(|c| c.volume = volume.min(127));
        self
    }

    pub fn get_volume(&self) -> u8 {
        self.read(|c| c.volume)
    }

    /// Bars emitted so far.
    pub fn bars(&self) -> u64 {
        self.core.lock().metronome().bars()
    }
}
