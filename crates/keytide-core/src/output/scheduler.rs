//! Delayed MIDI output queue.
//!
//! Producers enqueue events relative to the logical clock; the driver drains
//! whatever has become due and fans it out to the devices admitted by the
//! [`MuteMap`]. Events sharing a due time leave in submission order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use keytide_midi::{checked_channel, transpose_key, DeviceEvent, MidiEvent, MidiSink};
use tracing::debug;

use super::mute::MuteMap;
use crate::clock::LogicalClock;

#[derive(Debug, Clone, Copy)]
struct Pending {
    seq: u64,
    /// Single device to deliver to; `None` fans out to every device.
    device: Option<usize>,
    event: MidiEvent,
}

impl Pending {
    #[inline]
    fn key(&self) -> (u64, u64) {
        (self.event.time_ms, self.seq)
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed so the BinaryHeap pops the earliest (time, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Time-ordered output queue. Owns the logical clock.
#[derive(Debug, Default)]
pub struct OutputScheduler {
    clock: LogicalClock,
    queue: BinaryHeap<Pending>,
    dropped: u64,
}

impl OutputScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    #[inline]
    pub fn clock(&self) -> &LogicalClock {
        &self.clock
    }

    #[inline]
    pub fn clock_mut(&mut self) -> &mut LogicalClock {
        &mut self.clock
    }

    /// Number of events rejected for range violations since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Due time of the earliest pending event.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|p| p.event.time_ms)
    }

    fn push(&mut self, delay_ms: u32, event: MidiEvent) {
        self.push_to(None, delay_ms, event);
    }

    fn push_to(&mut self, device: Option<usize>, delay_ms: u32, mut event: MidiEvent) {
        event.time_ms = self.clock.now() + delay_ms as u64;
        let seq = self.clock.inc_time();
        self.queue.push(Pending { seq, device, event });
    }

    fn accept_channel(&mut self, channel: u8) -> bool {
        if checked_channel(channel).is_err() {
            debug!(channel, "dropping output on out-of-range channel");
            self.dropped += 1;
            return false;
        }
        true
    }

    /// Enqueue a key at `now + delay_ms`.
    ///
    /// With `duration_ms > 0` a matching note-off follows at
    /// `now + delay_ms + duration_ms`. A zero velocity enqueues a note-off only.
    /// Keys outside 0-127 and channels outside 0-15 are dropped; returns
    /// whether anything was enqueued.
    pub fn schedule_key(
        &mut self,
        channel: u8,
        key: i32,
        velocity: u8,
        delay_ms: u32,
        duration_ms: u32,
    ) -> bool {
        let Some(key) = transpose_key(key, 0) else {
            debug!(key, "dropping out-of-range key");
            self.dropped += 1;
            return false;
        };
        if !self.accept_channel(channel) {
            return false;
        }
        let velocity = velocity.min(127);
        if velocity == 0 {
            self.push(delay_ms, MidiEvent::note_off(0, channel, key));
            return true;
        }
        self.push(delay_ms, MidiEvent::note_on(0, channel, key, velocity));
        if duration_ms > 0 {
            self.push(
                delay_ms.saturating_add(duration_ms),
                MidiEvent::note_off(0, channel, key),
            );
        }
        true
    }

    pub fn schedule_control(&mut self, channel: u8, control: u8, value: u8, delay_ms: u32) -> bool {
        if control > 127 || !self.accept_channel(channel) {
            return false;
        }
        self.push(
            delay_ms,
            MidiEvent::control_change(0, channel, control, value.min(127)),
        );
        true
    }

    /// Control change addressed to `device` only, still subject to its mute flags.
    pub fn schedule_device_control(
        &mut self,
        device: usize,
        channel: u8,
        control: u8,
        value: u8,
        delay_ms: u32,
    ) -> bool {
        if control > 127 || !self.accept_channel(channel) {
            return false;
        }
        self.push_to(
            Some(device),
            delay_ms,
            MidiEvent::control_change(0, channel, control, value.min(127)),
        );
        true
    }

    pub fn schedule_program(&mut self, channel: u8, program: u8, delay_ms: u32) -> bool {
        if !self.accept_channel(channel) {
            return false;
        }
        self.push(delay_ms, MidiEvent::program_change(0, channel, program.min(127)));
        true
    }

    /// `bend`: signed offset from centre, clamped to -8192..=8191.
    pub fn schedule_pitch(&mut self, channel: u8, bend: i32, delay_ms: u32) -> bool {
        if !self.accept_channel(channel) {
            return false;
        }
        let unsigned = (bend.clamp(-8192, 8191) + 8192) as u16;
        self.push(delay_ms, MidiEvent::pitch_bend(0, channel, unsigned));
        true
    }

    pub fn schedule_pressure(&mut self, channel: u8, key: i32, pressure: u8, delay_ms: u32) -> bool {
        let Some(key) = transpose_key(key, 0) else {
            self.dropped += 1;
            return false;
        };
        if !self.accept_channel(channel) {
            return false;
        }
        self.push(
            delay_ms,
            MidiEvent::key_pressure(0, channel, key, pressure.min(127)),
        );
        true
    }

    /// Deliver every event due at or before `now` to each admitting device.
    ///
    /// Returns the number of deliveries made.
    pub fn dispatch_due(&mut self, now: u64, mute: &MuteMap, sink: &mut dyn MidiSink) -> usize {
        let mut delivered = 0;
        while self.queue.peek().is_some_and(|p| p.event.time_ms <= now) {
            let Some(pending) = self.queue.pop() else {
                break;
            };
            for device in 0..mute.num_devices() {
                if pending.device.is_some_and(|target| target != device) {
                    continue;
                }
                if mute.admits(device, &pending.event)
                    && sink.deliver(DeviceEvent {
                        device,
                        event: pending.event,
                    })
                {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Discard all pending events, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.queue.len();
        self.queue.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut OutputScheduler, now: u64) -> Vec<DeviceEvent> {
        let mut out: Vec<DeviceEvent> = Vec::new();
        scheduler.dispatch_due(now, &MuteMap::new(1), &mut out);
        out
    }

    #[test]
    fn test_key_with_duration_emits_on_then_off() {
        let mut scheduler = OutputScheduler::new();
        assert!(scheduler.schedule_key(0, 60, 100, 10, 50));
        assert_eq!(scheduler.pending_len(), 2);

        assert!(drain(&mut scheduler, 9).is_empty());

        let on = drain(&mut scheduler, 10);
        assert_eq!(on.len(), 1);
        assert!(on[0].event.is_note_on());
        assert_eq!(on[0].event.time_ms, 10);

        let off = drain(&mut scheduler, 60);
        assert_eq!(off.len(), 1);
        assert!(off[0].event.is_note_off());
        assert_eq!(off[0].event.time_ms, 60);
    }

    #[test]
    fn test_zero_duration_is_single_event() {
        let mut scheduler = OutputScheduler::new();
        scheduler.schedule_key(0, 60, 100, 0, 0);
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn test_zero_velocity_is_note_off() {
        let mut scheduler = OutputScheduler::new();
        scheduler.schedule_key(2, 64, 0, 0, 100);
        let out = drain(&mut scheduler, 1000);
        assert_eq!(out.len(), 1);
        assert!(out[0].event.is_note_off());
    }

    #[test]
    fn test_out_of_range_dropped() {
        let mut scheduler = OutputScheduler::new();
        assert!(!scheduler.schedule_key(0, 128, 100, 0, 0));
        assert!(!scheduler.schedule_key(0, -1, 100, 0, 0));
        assert!(!scheduler.schedule_key(16, 60, 100, 0, 0));
        assert_eq!(scheduler.pending_len(), 0);
        assert_eq!(scheduler.dropped(), 3);
    }

    #[test]
    fn test_same_time_keeps_submission_order() {
        let mut scheduler = OutputScheduler::new();
        for key in [64, 60, 67, 62] {
            scheduler.schedule_key(0, key, 90, 5, 0);
        }
        let keys: Vec<u8> = drain(&mut scheduler, 5)
            .iter()
            .filter_map(|e| e.event.note())
            .collect();
        assert_eq!(keys, vec![64, 60, 67, 62]);
    }

    #[test]
    fn test_non_decreasing_time_order() {
        let mut scheduler = OutputScheduler::new();
        scheduler.schedule_key(0, 60, 90, 30, 0);
        scheduler.schedule_key(0, 61, 90, 10, 0);
        scheduler.schedule_key(0, 62, 90, 20, 0);
        let times: Vec<u64> = drain(&mut scheduler, 100)
            .iter()
            .map(|e| e.event.time_ms)
            .collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn test_delay_is_relative_to_clock() {
        let mut scheduler = OutputScheduler::new();
        scheduler.clock_mut().advance_to(1000);
        scheduler.schedule_key(0, 60, 90, 25, 0);
        assert_eq!(scheduler.next_due(), Some(1025));
    }

    #[test]
    fn test_fan_out_respects_mute() {
        let mut scheduler = OutputScheduler::new();
        let mut mute = MuteMap::new(3);
        mute.set_channel_muted(1, 0, true).unwrap();
        scheduler.schedule_key(0, 60, 90, 0, 0);

        let mut out: Vec<DeviceEvent> = Vec::new();
        assert_eq!(scheduler.dispatch_due(0, &mute, &mut out), 2);
        let devices: Vec<usize> = out.iter().map(|e| e.device).collect();
        assert_eq!(devices, vec![0, 2]);
    }

    #[test]
    fn test_device_control_targets_one_device() {
        let mut scheduler = OutputScheduler::new();
        scheduler.schedule_device_control(1, 0, 122, 0, 0);

        let mut out: Vec<DeviceEvent> = Vec::new();
        assert_eq!(scheduler.dispatch_due(0, &MuteMap::new(3), &mut out), 1);
        assert_eq!(out[0].device, 1);
        assert_eq!(out[0].event.controller(), Some(122));
    }

    #[test]
    fn test_pitch_bend_centre() {
        let mut scheduler = OutputScheduler::new();
        scheduler.schedule_pitch(0, 0, 0);
        let out = drain(&mut scheduler, 0);
        assert_eq!(out[0].event.to_bytes(), vec![0xE0, 0x00, 0x40]);
    }

    #[test]
    fn test_clear() {
        let mut scheduler = OutputScheduler::new();
        scheduler.schedule_key(0, 60, 90, 0, 100);
        assert_eq!(scheduler.clear(), 2);
        assert_eq!(scheduler.next_due(), None);
    }
}
