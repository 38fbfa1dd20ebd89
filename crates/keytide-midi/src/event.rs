//! Timestamped MIDI channel-voice events.

use midi_msg::{Channel, ChannelVoiceMsg, ControlChange, MidiMsg};

/// MIDI channel-voice event stamped with an absolute logical time in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    /// Absolute logical time at which the event is due.
    pub time_ms: u64,
    pub channel: Channel,
    pub msg: ChannelVoiceMsg,
}

impl MidiEvent {
    #[inline]
    pub fn new(time_ms: u64, channel: Channel, msg: ChannelVoiceMsg) -> Self {
        Self {
            time_ms,
            channel,
            msg,
        }
    }

    /// Note-on; a zero velocity makes this a note-off on the wire.
    #[inline]
    pub fn note_on(time_ms: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            time_ms,
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::NoteOn { note, velocity },
        }
    }

    #[inline]
    pub fn note_off(time_ms: u64, channel: u8, note: u8) -> Self {
        Self {
            time_ms,
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::NoteOff { note, velocity: 0 },
        }
    }

    #[inline]
    pub fn control_change(time_ms: u64, channel: u8, control: u8, value: u8) -> Self {
        Self {
            time_ms,
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC { control, value },
            },
        }
    }

    #[inline]
    pub fn program_change(time_ms: u64, channel: u8, program: u8) -> Self {
        Self {
            time_ms,
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::ProgramChange { program },
        }
    }

    /// `bend`: unsigned 14-bit, 8192 = centre.
    #[inline]
    pub fn pitch_bend(time_ms: u64, channel: u8, bend: u16) -> Self {
        Self {
            time_ms,
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::PitchBend { bend },
        }
    }

    #[inline]
    pub fn key_pressure(time_ms: u64, channel: u8, note: u8, pressure: u8) -> Self {
        Self {
            time_ms,
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::PolyPressure { note, pressure },
        }
    }

    #[inline]
    pub fn channel_num(&self) -> u8 {
        self.channel as u8
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self.msg, ChannelVoiceMsg::NoteOn { velocity, .. } if velocity > 0)
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.msg,
            ChannelVoiceMsg::NoteOff { .. } | ChannelVoiceMsg::NoteOn { velocity: 0, .. }
        )
    }

    #[inline]
    pub fn is_program_change(&self) -> bool {
        matches!(self.msg, ChannelVoiceMsg::ProgramChange { .. })
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { note, .. }
            | ChannelVoiceMsg::NoteOff { note, .. }
            | ChannelVoiceMsg::PolyPressure { note, .. } => Some(note),
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { velocity, .. }
            | ChannelVoiceMsg::NoteOff { velocity, .. } => Some(velocity),
            _ => None,
        }
    }

    /// Controller number, for control change events.
    #[inline]
    pub fn controller(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC { control, .. },
            } => Some(control),
            _ => None,
        }
    }

    #[inline]
    pub fn to_midi_msg(&self) -> MidiMsg {
        MidiMsg::ChannelVoice {
            channel: self.channel,
            msg: self.msg,
        }
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_midi_msg().to_midi()
    }
}

/// An event addressed to one output device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceEvent {
    pub device: usize,
    pub event: MidiEvent,
}
