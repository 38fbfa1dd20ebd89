//! Shared core state behind the global lock.
//!
//! Every table, queue and generator of the scheduler lives in one
//! [`CoreState`]. [`Core`] wraps it in a single `parking_lot::Mutex`; timer
//! callbacks, key handlers and configuration setters all go through that one
//! lock, so there is at most one writer at any instant.

use std::collections::BTreeMap;
use std::sync::Arc;

use keytide_midi::{MidiSink, NUM_CHANNELS};
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::config::CoreConfig;
use crate::echo::{EchoConfig, EchoGenerator};
use crate::handle::{EchoHandle, MetronomeHandle};
use crate::keys::{Chord, PressOutcome, PressedKeyTable};
use crate::noise::Noise;
use crate::output::{LocalKeys, MuteMap, OutputScheduler, CC_LOCAL_CONTROL};
use crate::timer::{TimerAction, TimerCallback, TimerId, TimerRegistry};
use crate::transport::{Metronome, MetronomeConfig};
use crate::{Error, Result};

/// Handle of an echo generator registered with the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EchoId(u64);

struct EchoSlot {
    generator: EchoGenerator,
    timer: TimerId,
}

pub struct CoreState {
    config: CoreConfig,
    scheduler: OutputScheduler,
    mute: MuteMap,
    views: Vec<PressedKeyTable>,
    noise: Noise,
    timers: TimerRegistry<CoreState>,
    echoes: BTreeMap<EchoId, EchoSlot>,
    next_echo: u64,
    metronome: Metronome,
    metronome_timer: Option<TimerId>,
    trigger: bool,
    paused: bool,
    sink: Box<dyn MidiSink>,
}

impl CoreState {
    pub fn new(config: CoreConfig, sink: Box<dyn MidiSink>) -> Result<Self> {
        config.validate()?;
        let views = (0..config.num_views)
            .map(|_| PressedKeyTable::with_capacity(config.table_capacity))
            .collect();
        Ok(Self {
            scheduler: OutputScheduler::new(),
            mute: MuteMap::new(config.num_devices),
            views,
            noise: Noise::new(config.seed),
            timers: TimerRegistry::new(),
            echoes: BTreeMap::new(),
            next_echo: 1,
            metronome: Metronome::default(),
            metronome_timer: None,
            trigger: false,
            paused: false,
            sink,
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Current logical time in ms.
    #[inline]
    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    // ------------------------------------------------------------------
    // Driving
    // ------------------------------------------------------------------

    /// Run every timer due at or before `now`, in fire-time order.
    ///
    /// The clock is moved to each timer's fire time before its callback runs,
    /// so delays scheduled from a callback are relative to when it was due.
    pub fn run_timers(&mut self, now: u64) -> usize {
        let mut fired = 0;
        while let Some(mut due) = self.timers.take_due(now) {
            self.scheduler.clock_mut().advance_to(due.fire_time);
            let action = due.run(self);
            self.timers.restore(due, action);
            fired += 1;
        }
        fired
    }

    /// Deliver every queued event due by the current time.
    pub fn flush_output(&mut self) -> usize {
        let now = self.scheduler.now();
        self.scheduler
            .dispatch_due(now, &self.mute, self.sink.as_mut())
    }

    /// Advance logical time to `now`: run due timers, then dispatch due output.
    ///
    /// Returns the number of deliveries made to the sink.
    pub fn advance_to(&mut self, now: u64) -> usize {
        self.run_timers(now);
        self.scheduler.clock_mut().advance_to(now);
        self.flush_output()
    }

    /// Earliest time anything is due (timer or queued output).
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.timers.next_deadline(), self.scheduler.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    pub fn set_trigger(&mut self, trigger: bool) {
        self.trigger = trigger;
    }

    pub fn trigger(&self) -> bool {
        self.trigger
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    pub fn scheduler(&self) -> &OutputScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut OutputScheduler {
        &mut self.scheduler
    }

    pub fn noise_mut(&mut self) -> &mut Noise {
        &mut self.noise
    }

    pub fn mute(&self) -> &MuteMap {
        &self.mute
    }

    pub fn mute_mut(&mut self) -> &mut MuteMap {
        &mut self.mute
    }

    /// Set local-keys control for `device` and send it Local Control on every
    /// channel right away when it is `Enable` or `Disable`.
    pub fn set_local_keys(&mut self, device: usize, local_keys: LocalKeys) -> Result<()> {
        self.mute.set_local_keys(device, local_keys)?;
        if let Some(value) = local_keys.control_value() {
            for channel in 0..NUM_CHANNELS as u8 {
                self.scheduler
                    .schedule_device_control(device, channel, CC_LOCAL_CONTROL, value, 0);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pressed keys
    // ------------------------------------------------------------------

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    pub fn view(&self, view: usize) -> Option<&PressedKeyTable> {
        self.views.get(view)
    }

    pub fn view_mut(&mut self, view: usize) -> Option<&mut PressedKeyTable> {
        self.views.get_mut(view)
    }

    /// Record a key press in `view` and schedule its note-on after `delay_ms`.
    pub fn key_press(
        &mut self,
        view: usize,
        channel: u8,
        key: u8,
        velocity: u8,
        delay_ms: u32,
    ) -> PressOutcome {
        let Some(table) = self.views.get_mut(view) else {
            debug!(view, "key press for unknown view dropped");
            return PressOutcome::Dropped;
        };
        let stamp = self.scheduler.clock_mut().inc_time();
        let outcome = table.press(channel, key, velocity, stamp);
        if let PressOutcome::Inserted(_) = outcome {
            self.scheduler
                .schedule_key(channel, key as i32, velocity.max(1), delay_ms, 0);
        }
        outcome
    }

    /// Clear a key from `view` and schedule its note-off after `delay_ms`.
    ///
    /// Returns false if the key was not held.
    pub fn key_release(&mut self, view: usize, channel: u8, key: u8, delay_ms: u32) -> bool {
        let released = self
            .views
            .get_mut(view)
            .and_then(|table| table.release(channel, key))
            .is_some();
        if released {
            self.scheduler
                .schedule_key(channel, key as i32, 0, delay_ms, 0);
        }
        released
    }

    pub fn scan_lowest(&self, view: usize, channel: u8) -> Option<u8> {
        self.views.get(view)?.scan_lowest(channel)
    }

    pub fn chord(&self, view: usize, channel: u8) -> Chord {
        self.views
            .get(view)
            .map(|table| table.chord(channel))
            .unwrap_or_default()
    }

    /// Drop all pending output, release every held key with an immediate
    /// note-off, and clear the tables. Returns the number of keys released.
    pub fn panic(&mut self) -> usize {
        self.scheduler.clear();
        let mut released = 0;
        for table in self.views.iter_mut() {
            for pressed in table.clear() {
                self.scheduler
                    .schedule_key(pressed.channel, pressed.key as i32, 0, 0, 0);
                released += 1;
            }
        }
        released
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    pub fn timers(&self) -> &TimerRegistry<CoreState> {
        &self.timers
    }

    pub fn register_timer(&mut self, period_ms: u32, callback: TimerCallback<CoreState>) -> TimerId {
        let now = self.now();
        self.timers.register(period_ms, now, callback)
    }

    /// Swap the callback and period of an existing timer, keeping its handle.
    pub fn replace_timer(
        &mut self,
        id: TimerId,
        period_ms: u32,
        callback: TimerCallback<CoreState>,
    ) -> bool {
        let now = self.now();
        self.timers.replace(id, period_ms, now, callback)
    }

    pub fn unregister_timer(&mut self, id: TimerId) -> bool {
        self.timers.unregister(id)
    }

    pub fn update_timer(&mut self, id: TimerId, period_ms: u32, reset_phase: bool) -> bool {
        let now = self.now();
        self.timers.update(id, period_ms, reset_phase, now)
    }

    // ------------------------------------------------------------------
    // Echo
    // ------------------------------------------------------------------

    fn check_echo_config(&self, config: &EchoConfig) -> Result<()> {
        config.validate()?;
        if config.view >= self.views.len() {
            return Err(Error::InvalidView(config.view));
        }
        Ok(())
    }

    /// Register an echo generator, disabled, ticking every `ival_repeat` ms.
    pub fn add_echo(&mut self, config: EchoConfig) -> Result<EchoId> {
        self.check_echo_config(&config)?;
        let id = EchoId(self.next_echo);
        self.next_echo += 1;

        let period = config.ival_repeat;
        let timer = self.register_timer(
            period,
            Box::new(move |state: &mut CoreState, _timer: TimerId| {
                match state.tick_echo(id) {
                    Some(_) => TimerAction::Continue,
                    None => TimerAction::Cancel,
                }
            }),
        );
        self.echoes.insert(
            id,
            EchoSlot {
                generator: EchoGenerator::new(config),
                timer,
            },
        );
        debug!(?id, period, "echo registered");
        Ok(id)
    }

    /// Remove an echo generator and cancel its timer. Safe to repeat.
    pub fn remove_echo(&mut self, id: EchoId) -> bool {
        match self.echoes.remove(&id) {
            Some(slot) => {
                self.timers.unregister(slot.timer);
                true
            }
            None => false,
        }
    }

    pub fn echo(&self, id: EchoId) -> Option<&EchoGenerator> {
        self.echoes.get(&id).map(|slot| &slot.generator)
    }

    pub fn echo_timer(&self, id: EchoId) -> Option<TimerId> {
        self.echoes.get(&id).map(|slot| slot.timer)
    }

    pub fn set_echo_enabled(&mut self, id: EchoId, enabled: bool) -> bool {
        match self.echoes.get_mut(&id) {
            Some(slot) => {
                slot.generator.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Replace an echo's configuration. The tick period follows `ival_repeat`
    /// from now on and the next tick is skipped.
    pub fn set_echo_config(&mut self, id: EchoId, config: EchoConfig) -> Result<()> {
        self.check_echo_config(&config)?;
        let now = self.now();
        let slot = self
            .echoes
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown echo {:?}", id)))?;
        if slot.generator.config().ival_repeat != config.ival_repeat {
            self.timers
                .update(slot.timer, config.ival_repeat, true, now);
        }
        slot.generator.set_config(config);
        Ok(())
    }

    /// Apply `f` to a copy of the echo's configuration and install the result.
    pub fn update_echo_config<F>(&mut self, id: EchoId, f: F) -> Result<()>
    where
        F: FnOnce(&mut EchoConfig),
    {
        let mut config = self
            .echo(id)
            .map(|echo| echo.config().clone())
            .ok_or_else(|| Error::InvalidConfig(format!("unknown echo {:?}", id)))?;
        f(&mut config);
        self.set_echo_config(id, config)
    }

    /// One echo tick. `None` if the echo no longer exists.
    pub fn tick_echo(&mut self, id: EchoId) -> Option<usize> {
        let slot = self.echoes.get_mut(&id)?;
        let view = slot.generator.config().view;
        let Some(table) = self.views.get_mut(view) else {
            return Some(0);
        };
        Some(
            slot.generator
                .tick(table, &mut self.scheduler, &mut self.noise),
        )
    }

    // ------------------------------------------------------------------
    // Metronome
    // ------------------------------------------------------------------

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    pub fn metronome_timer(&self) -> Option<TimerId> {
        self.metronome_timer
    }

    /// Install a metronome configuration, starting or stopping its timer.
    pub fn set_metronome_config(&mut self, config: MetronomeConfig) -> Result<()> {
        config.validate()?;
        let period = config.period_ms();
        let enabled = config.enabled;
        self.metronome.set_config(config);

        match (enabled, self.metronome_timer) {
            (true, None) => {
                let timer = self.register_timer(
                    period,
                    Box::new(|state: &mut CoreState, _timer: TimerId| state.tick_metronome()),
                );
                self.metronome_timer = Some(timer);
            }
            (true, Some(timer)) => {
                self.update_timer(timer, period, false);
            }
            (false, Some(timer)) => {
                self.timers.unregister(timer);
                self.metronome_timer = None;
            }
            (false, None) => {}
        }
        Ok(())
    }

    /// Metronome timer body: emit a bar and re-arm at the current tempo.
    pub fn tick_metronome(&mut self) -> TimerAction {
        let running = self.trigger && !self.paused;
        self.metronome
            .tick(&mut self.scheduler, &self.mute, running);
        TimerAction::Reschedule(self.metronome.config().period_ms())
    }
}

/// Cloneable handle to the lock-protected [`CoreState`].
#[derive(Clone)]
pub struct Core {
    state: Arc<Mutex<CoreState>>,
}

impl Core {
    pub fn new(config: CoreConfig, sink: Box<dyn MidiSink>) -> Result<Self> {
        Ok(Self {
            state: Arc::new(Mutex::new(CoreState::new(config, sink)?)),
        })
    }

    /// Take the global lock.
    pub fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock()
    }

    /// Run `f` with the global lock held.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CoreState) -> R,
    {
        f(&mut self.state.lock())
    }

    pub fn now(&self) -> u64 {
        self.state.lock().now()
    }

    pub fn advance_to(&self, now: u64) -> usize {
        self.state.lock().advance_to(now)
    }

    /// Register a new echo generator; it is disabled until `enable()`.
    pub fn echo(&self, config: EchoConfig) -> Result<EchoHandle> {
        EchoHandle::new(self.clone(), config)
    }

    pub fn metronome(&self) -> MetronomeHandle {
        MetronomeHandle::new(self.clone())
    }
}
