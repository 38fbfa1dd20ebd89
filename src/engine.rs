//! KeytideEngine that owns the scheduler core and its timer driver

use keytide_core::{
    Chord, Core, CoreState, EchoConfig, EchoHandle, LocalKeys, MetronomeHandle, MuteMap,
    PressOutcome, TimerDriver,
};
use keytide_midi::MidiOutputConsumer;
use tracing::{debug, info};

use crate::{Error, Result};

/// Main entry point: the scheduler core, its optional timer driver and the
/// consumer side of the output ring buffer.
///
/// # Example
///
/// ```ignore
/// use keytide::prelude::*;
///
/// let mut engine = KeytideEngine::builder().devices(2).build()?;
/// let mut output = engine.take_output()?;
///
/// let _echo = engine.echo(EchoConfig::default())?.count(3).enable();
/// engine.metronome().tempo(90).on();
/// engine.set_trigger(true);
///
/// engine.key_press(0, 0, 60, 100, 0);
/// while let Some(event) = output.pop() {
///     send_to_device(event.device, &event.event.to_bytes());
/// }
/// ```
pub struct KeytideEngine {
    core: Core,
    driver: Option<TimerDriver>,
    output: Option<MidiOutputConsumer>,
}

impl KeytideEngine {
    pub(crate) fn new(
        core: Core,
        driver: Option<TimerDriver>,
        output: Option<MidiOutputConsumer>,
    ) -> Self {
        Self {
            core,
            driver,
            output,
        }
    }

    pub fn builder() -> crate::KeytideEngineBuilder {
        crate::KeytideEngineBuilder::default()
    }

    /// Shared core handle.
    pub fn core(&self) -> &Core {
        &self.core
    }

    /// Run `f` with the global lock held.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CoreState) -> R,
    {
        self.core.with(f)
    }

    /// Hand over the output consumer. Only available once, and only when the
    /// engine was built with its own ring buffer.
    pub fn take_output(&mut self) -> Result<MidiOutputConsumer> {
        self.output.take().ok_or(Error::OutputTaken)
    }

    /// Current logical time in ms.
    pub fn now(&self) -> u64 {
        self.core.now()
    }

    /// Advance logical time by hand. Returns the number of deliveries made.
    pub fn advance_to(&self, now: u64) -> usize {
        self.core.advance_to(now)
    }

    /// True if a driver thread is advancing the clock.
    pub fn is_driven(&self) -> bool {
        self.driver.as_ref().is_some_and(|d| d.is_running())
    }

    /// Stop the driver thread, if any. The clock then only moves via
    /// [`advance_to`](Self::advance_to).
    pub fn stop_driver(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.stop();
            info!("engine switched to manual clock");
        }
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    pub fn key_press(
        &self,
        view: usize,
        channel: u8,
        key: u8,
        velocity: u8,
        delay_ms: u32,
    ) -> PressOutcome {
        let outcome = self
            .core
            .lock()
            .key_press(view, channel, key, velocity, delay_ms);
        self.wake();
        outcome
    }

    pub fn key_release(&self, view: usize, channel: u8, key: u8, delay_ms: u32) -> bool {
        let released = self.core.lock().key_release(view, channel, key, delay_ms);
        self.wake();
        released
    }

    /// Keys held on `channel` in `view`, ascending.
    pub fn chord(&self, view: usize, channel: u8) -> Chord {
        self.core.lock().chord(view, channel)
    }

    pub fn scan_lowest(&self, view: usize, channel: u8) -> Option<u8> {
        self.core.lock().scan_lowest(view, channel)
    }

    /// Silence everything: drop pending output and release all held keys.
    pub fn panic(&self) -> usize {
        let released = self.core.lock().panic();
        self.wake();
        released
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    pub fn schedule_key(
        &self,
        channel: u8,
        key: i32,
        velocity: u8,
        delay_ms: u32,
        duration_ms: u32,
    ) -> bool {
        self.scheduled(|s| {
            s.scheduler_mut()
                .schedule_key(channel, key, velocity, delay_ms, duration_ms)
        })
    }

    pub fn schedule_control(&self, channel: u8, control: u8, value: u8, delay_ms: u32) -> bool {
        self.scheduled(|s| {
            s.scheduler_mut()
                .schedule_control(channel, control, value, delay_ms)
        })
    }

    pub fn schedule_program(&self, channel: u8, program: u8, delay_ms: u32) -> bool {
        self.scheduled(|s| s.scheduler_mut().schedule_program(channel, program, delay_ms))
    }

    pub fn schedule_pitch(&self, channel: u8, bend: i32, delay_ms: u32) -> bool {
        self.scheduled(|s| s.scheduler_mut().schedule_pitch(channel, bend, delay_ms))
    }

    pub fn schedule_pressure(&self, channel: u8, key: i32, pressure: u8, delay_ms: u32) -> bool {
        self.scheduled(|s| {
            s.scheduler_mut()
                .schedule_pressure(channel, key, pressure, delay_ms)
        })
    }

    fn scheduled(&self, f: impl FnOnce(&mut CoreState) -> bool) -> bool {
        let queued = self.core.with(f);
        if queued {
            self.wake();
        }
        queued
    }

    /// Run `f` on the mute map with the global lock held.
    pub fn mute<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut MuteMap) -> R,
    {
        f(self.core.lock().mute_mut())
    }

    pub fn set_local_keys(&self, device: usize, local_keys: LocalKeys) -> Result<()> {
        self.core.lock().set_local_keys(device, local_keys)?;
        self.wake();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transport and generators
    // ------------------------------------------------------------------

    pub fn set_trigger(&self, trigger: bool) {
        self.core.lock().set_trigger(trigger);
    }

    pub fn set_paused(&self, paused: bool) {
        self.core.lock().set_paused(paused);
    }

    pub fn echo(&self, config: EchoConfig) -> Result<EchoHandle> {
        Ok(self.core.echo(config)?)
    }

    pub fn metronome(&self) -> MetronomeHandle {
        self.core.metronome()
    }

    fn wake(&self) {
        if let Some(driver) = &self.driver {
            if let Err(e) = driver.wake() {
                debug!(error = %e, "driver wake dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_after_driver_thread_exit() {
        let mut engine = KeytideEngine::builder().devices(1).build().unwrap();
        let mut output = engine.take_output().unwrap();
        if let Some(driver) = engine.driver.as_mut() {
            driver.stop();
        }
        assert!(engine.driver.is_some());
        assert!(!engine.is_driven());

        assert!(matches!(
            engine.key_press(0, 0, 60, 100, 0),
            PressOutcome::Inserted(_)
        ));
        assert!(engine.schedule_control(0, 7, 100, 0));
        engine.advance_to(engine.now());
        assert!(output.pop().is_some());
    }
}
