//! Fixed-capacity table of currently held keys for one view.

use keytide_midi::{checked_channel, MAX_KEY};
use smallvec::SmallVec;
use tracing::debug;

/// Slots per view.
pub const TABLE_CAPACITY: usize = 128;

/// One held key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressedKey {
    pub channel: u8,
    pub key: u8,
    pub velocity: u8,
    /// Logical-time stamp taken at press; distinguishes re-presses of a key.
    pub stamp: u64,
}

/// Result of [`PressedKeyTable::press`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    Inserted(usize),
    /// The (channel, key) pair already occupies this slot.
    AlreadyHeld(usize),
    /// Table full or key/channel out of range.
    Dropped,
}

/// Keys sorted ascending, as returned by [`PressedKeyTable::chord`].
pub type Chord = SmallVec<[u8; 16]>;

/// Pressed-key table.
///
/// Presses take the first empty slot. When every slot is in use the press is
/// dropped, so the matching release later finds nothing and is a no-op.
#[derive(Debug, Clone)]
pub struct PressedKeyTable {
    slots: Vec<Option<PressedKey>>,
    cursor: usize,
    held: usize,
}

impl Default for PressedKeyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PressedKeyTable {
    pub fn new() -> Self {
        Self::with_capacity(TABLE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            cursor: 0,
            held: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.held
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.held == 0
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn position(&self, channel: u8, key: u8) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.is_some_and(|p| p.channel == channel && p.key == key))
    }

    pub fn press(&mut self, channel: u8, key: u8, velocity: u8, stamp: u64) -> PressOutcome {
        if checked_channel(channel).is_err() || key > MAX_KEY {
            debug!(channel, key, "ignoring press outside MIDI range");
            return PressOutcome::Dropped;
        }
        if let Some(slot) = self.position(channel, key) {
            return PressOutcome::AlreadyHeld(slot);
        }
        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            debug!(channel, key, "pressed-key table full, dropping press");
            return PressOutcome::Dropped;
        };
        self.slots[slot] = Some(PressedKey {
            channel,
            key,
            velocity,
            stamp,
        });
        self.held += 1;
        PressOutcome::Inserted(slot)
    }

    /// Clear the slot holding (channel, key); no-op if none does.
    pub fn release(&mut self, channel: u8, key: u8) -> Option<PressedKey> {
        let slot = self.position(channel, key)?;
        self.held -= 1;
        self.slots[slot].take()
    }

    pub fn contains(&self, channel: u8, key: u8) -> bool {
        self.position(channel, key).is_some()
    }

    /// Held keys in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &PressedKey> {
        self.slots.iter().flatten()
    }

    /// The held key with the lowest note number on `channel`.
    pub fn lowest(&self, channel: u8) -> Option<PressedKey> {
        self.iter()
            .filter(|p| p.channel == channel)
            .min_by_key(|p| p.key)
            .copied()
    }

    /// Lowest key number held on `channel`, `None` if the channel is silent.
    #[inline]
    pub fn scan_lowest(&self, channel: u8) -> Option<u8> {
        self.lowest(channel).map(|p| p.key)
    }

    /// Next occupied slot at or after the cursor, wrapping once around.
    ///
    /// The cursor moves past the returned slot, so successive calls visit every
    /// occupied slot once before any repeats.
    pub fn scan_next(&mut self) -> Option<PressedKey> {
        self.scan_next_where(|_| true)
    }

    /// Like [`scan_next`](Self::scan_next) but skips keys rejected by `filter`.
    pub fn scan_next_where<F>(&mut self, mut filter: F) -> Option<PressedKey>
    where
        F: FnMut(&PressedKey) -> bool,
    {
        let capacity = self.slots.len();
        for offset in 0..capacity {
            let index = (self.cursor + offset) % capacity;
            if let Some(pressed) = self.slots[index] {
                if filter(&pressed) {
                    self.cursor = (index + 1) % capacity;
                    return Some(pressed);
                }
            }
        }
        None
    }

    /// Keys held on `channel`, ascending.
    pub fn chord(&self, channel: u8) -> Chord {
        let mut keys: Chord = self
            .iter()
            .filter(|p| p.channel == channel)
            .map(|p| p.key)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Empty the table, returning what was held.
    pub fn clear(&mut self) -> Vec<PressedKey> {
        let released: Vec<PressedKey> = self.slots.iter_mut().filter_map(Option::take).collect();
        self.held = 0;
        self.cursor = 0;
        released
    }
}
