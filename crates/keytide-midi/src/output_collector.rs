//! Lock-free MIDI output collection between the scheduler and an output driver.

use crate::event::DeviceEvent;
use crate::sink::MidiSink;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use tracing::debug;

/// Default capacity for the MIDI output ring buffer
const DEFAULT_CAPACITY: usize = 1024;

/// Producer side, owned by the scheduler.
pub struct MidiOutputProducer {
    producer: HeapProd<DeviceEvent>,
}

impl MidiOutputProducer {
    /// Returns true if the event was pushed, false if the buffer is full.
    #[inline]
    pub fn push(&mut self, event: DeviceEvent) -> bool {
        self.producer.try_push(event).is_ok()
    }
}

impl MidiSink for MidiOutputProducer {
    fn deliver(&mut self, event: DeviceEvent) -> bool {
        let pushed = self.push(event);
        if !pushed {
            debug!("MIDI output ring buffer full, dropping event");
        }
        pushed
    }
}

/// Consumer side, drained by the device I/O layer.
pub struct MidiOutputConsumer {
    consumer: HeapCons<DeviceEvent>,
}

impl MidiOutputConsumer {
    #[inline]
    pub fn pop(&mut self) -> Option<DeviceEvent> {
        self.consumer.try_pop()
    }

    /// Drain all pending events into a vector
    pub fn drain_all(&mut self) -> Vec<DeviceEvent> {
        let mut events = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(event) = self.consumer.try_pop() {
            events.push(event);
        }
        events
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.consumer.is_empty()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }
}

/// Create a new MIDI output channel
pub fn midi_output_channel() -> (MidiOutputProducer, MidiOutputConsumer) {
    midi_output_channel_with_capacity(DEFAULT_CAPACITY)
}

/// Create a new MIDI output channel with specified capacity
pub fn midi_output_channel_with_capacity(
    capacity: usize,
) -> (MidiOutputProducer, MidiOutputConsumer) {
    let rb = HeapRb::new(capacity);
    let (producer, consumer) = rb.split();
    (
        MidiOutputProducer { producer },
        MidiOutputConsumer { consumer },
    )
}
