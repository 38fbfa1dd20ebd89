pub(crate) mod mute;
pub(crate) mod scheduler;

pub use mute::{DeviceMute, LocalKeys, MuteMap, CC_LOCAL_CONTROL, CC_PEDAL};
pub use scheduler::OutputScheduler;
