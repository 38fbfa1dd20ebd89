//! Output sink abstraction for dispatched MIDI events.

use crate::event::DeviceEvent;

/// Destination for events leaving the scheduler.
///
/// Implementations must not block: the scheduler calls `deliver` while the
/// global lock is held.
pub trait MidiSink: Send {
    /// Returns false if the sink dropped the event.
    fn deliver(&mut self, event: DeviceEvent) -> bool;
}

impl MidiSink for Vec<DeviceEvent> {
    fn deliver(&mut self, event: DeviceEvent) -> bool {
        self.push(event);
        true
    }
}

impl<S: MidiSink + ?Sized> MidiSink for Box<S> {
    fn deliver(&mut self, event: DeviceEvent) -> bool {
        (**self).deliver(event)
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MidiSink for NullSink {
    fn deliver(&mut self, _event: DeviceEvent) -> bool {
        true
    }
}
