pub(crate) mod table;

pub use table::{Chord, PressOutcome, PressedKey, PressedKeyTable, TABLE_CAPACITY};
