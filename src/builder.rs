//! Builder for configuring and constructing a `KeytideEngine`.

use keytide_core::{Core, CoreConfig, TimerDriver};
use keytide_midi::{midi_output_channel_with_capacity, MidiSink};
use tracing::info;

use crate::{KeytideEngine, Result};

/// Default capacity of the engine-owned output ring buffer.
const DEFAULT_OUTPUT_CAPACITY: usize = 1024;

/// By default the engine owns a ring buffer whose consumer is handed out by
/// `engine.take_output()`, and a driver thread advances the clock in real
/// time. `.sink()` replaces the ring buffer; `.manual_clock()` skips the
/// driver so tests can step time with `engine.advance_to()`.
///
/// # Example
///
/// ```ignore
/// use keytide::prelude::*;
///
/// let mut engine = KeytideEngine::builder()
///     .views(2)
///     .devices(4)
///     .seed(7)
///     .manual_clock()
///     .build()?;
///
/// engine.key_press(0, 0, 60, 100, 0);
/// engine.advance_to(10);
/// ```
pub struct KeytideEngineBuilder {
    config: CoreConfig,
    output_capacity: usize,
    sink: Option<Box<dyn MidiSink>>,
    manual_clock: bool,
}

impl Default for KeytideEngineBuilder {
    fn default() -> Self {
        Self {
            config: CoreConfig::default(),
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            sink: None,
            manual_clock: false,
        }
    }
}

impl KeytideEngineBuilder {
    /// Replace the whole core configuration.
    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 2
    pub fn views(mut self, count: usize) -> Self {
        self.config.num_views = count;
        self
    }

    /// Default: 4
    pub fn devices(mut self, count: usize) -> Self {
        self.config.num_devices = count;
        self
    }

    /// Slots per pressed-key table. Default: 128
    pub fn table_capacity(mut self, capacity: usize) -> Self {
        self.config.table_capacity = capacity;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Driver wake-up interval. Default: 1 ms
    pub fn tick_interval_ms(mut self, ms: u32) -> Self {
        self.config.tick_interval_ms = ms;
        self
    }

    /// Capacity of the engine-owned output ring buffer. Default: 1024
    pub fn output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    /// Deliver output to `sink` instead of the engine-owned ring buffer.
    pub fn sink(mut self, sink: impl MidiSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Do not start a driver thread; time moves only through `advance_to`.
    pub fn manual_clock(mut self) -> Self {
        self.manual_clock = true;
        self
    }

    pub fn build(self) -> Result<KeytideEngine> {
        let (sink, output) = match self.sink {
            Some(sink) => (sink, None),
            None => {
                let (producer, consumer) =
                    midi_output_channel_with_capacity(self.output_capacity.max(1));
                (Box::new(producer) as Box<dyn MidiSink>, Some(consumer))
            }
        };

        let tick_interval_ms = self.config.tick_interval_ms;
        let core = Core::new(self.config, sink)?;

        let driver = if self.manual_clock {
            None
        } else {
            Some(TimerDriver::spawn(core.clone(), tick_interval_ms)?)
        };

        info!(driven = driver.is_some(), "keytide engine built");
        Ok(KeytideEngine::new(core, driver, output))
    }
}
