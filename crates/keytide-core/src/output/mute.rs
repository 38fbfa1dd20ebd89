//! Per-device, per-channel output suppression.
//!
//! Every event leaving the scheduler is offered to each device in turn; the
//! device's [`DeviceMute`] decides whether it gets through.

use keytide_midi::{MidiEvent, NUM_CHANNELS};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Controller number of the sustain pedal.
pub const CC_PEDAL: u8 = 64;

/// Controller number of the Local Control channel-mode message.
pub const CC_LOCAL_CONTROL: u8 = 122;

/// Local keyboard control requested for a device.
///
/// Enable and disable are mutually exclusive; `Default` leaves the device alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocalKeys {
    #[default]
    Default,
    Enable,
    Disable,
}

impl LocalKeys {
    /// CC 122 value to send, if any.
    pub fn control_value(self) -> Option<u8> {
        match self {
            LocalKeys::Default => None,
            LocalKeys::Enable => Some(127),
            LocalKeys::Disable => Some(0),
        }
    }
}

/// Suppression flags for one output device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMute {
    pub channels: [bool; NUM_CHANNELS],
    pub program_change: bool,
    pub pedal: bool,
    pub all_control: bool,
    pub local_keys: LocalKeys,
}

impl DeviceMute {
    /// Whether `event` may be sent to this device.
    pub fn admits(&self, event: &MidiEvent) -> bool {
        let channel = event.channel_num() as usize;
        if self.channels[channel] {
            return false;
        }
        if self.program_change && event.is_program_change() {
            return false;
        }
        match event.controller() {
            // Local Control is how the local-keys setting reaches the device.
            Some(CC_LOCAL_CONTROL) => true,
            Some(CC_PEDAL) if self.pedal => false,
            Some(_) => !self.all_control,
            None => true,
        }
    }
}

/// Mute/routing table for all output devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteMap {
    devices: Vec<DeviceMute>,
}

impl MuteMap {
    pub fn new(num_devices: usize) -> Self {
        Self {
            devices: vec![DeviceMute::default(); num_devices],
        }
    }

    #[inline]
    pub fn num_devices(&self) -> usize {
        self.devices.len()
    }

    pub fn device(&self, device: usize) -> Option<&DeviceMute> {
        self.devices.get(device)
    }

    fn device_mut(&mut self, device: usize) -> Result<&mut DeviceMute> {
        self.devices
            .get_mut(device)
            .ok_or(Error::InvalidDevice(device))
    }

    pub fn set_channel_muted(&mut self, device: usize, channel: u8, muted: bool) -> Result<()> {
        let channel = keytide_midi::checked_channel(channel)?;
        self.device_mut(device)?.channels[channel as usize] = muted;
        Ok(())
    }

    pub fn is_channel_muted(&self, device: usize, channel: u8) -> bool {
        self.devices
            .get(device)
            .and_then(|d| d.channels.get(channel as usize))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_mute_program_change(&mut self, device: usize, muted: bool) -> Result<()> {
        self.device_mut(device)?.program_change = muted;
        Ok(())
    }

    pub fn set_mute_pedal(&mut self, device: usize, muted: bool) -> Result<()> {
        self.device_mut(device)?.pedal = muted;
        Ok(())
    }

    pub fn set_mute_all_control(&mut self, device: usize, muted: bool) -> Result<()> {
        self.device_mut(device)?.all_control = muted;
        Ok(())
    }

    pub fn set_local_keys(&mut self, device: usize, local_keys: LocalKeys) -> Result<()> {
        self.device_mut(device)?.local_keys = local_keys;
        Ok(())
    }

    pub fn local_keys(&self, device: usize) -> LocalKeys {
        self.devices
            .get(device)
            .map(|d| d.local_keys)
            .unwrap_or_default()
    }

    #[inline]
    pub fn admits(&self, device: usize, event: &MidiEvent) -> bool {
        self.devices.get(device).is_some_and(|d| d.admits(event))
    }

    /// True if at least one device would accept notes on `channel`.
    pub fn is_channel_audible(&self, channel: u8) -> bool {
        self.devices
            .iter()
            .any(|d| d.channels.get(channel as usize).is_some_and(|muted| !muted))
    }

    /// Clear every flag on every device.
    pub fn reset(&mut self) {
        for device in self.devices.iter_mut() {
            *device = DeviceMute::default();
        }
    }
}
