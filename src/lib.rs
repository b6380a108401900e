//! MidiCtrl - map MIDI controller input to simulator commands and datarefs
//!
//! Control-change events arrive from hardware on driver-owned threads, are
//! matched against each device's [`MappingTable`], and are queued for the
//! host. The host calls [`Dispatcher::drain`] once per tick to execute them.

pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod gesture;
pub mod host;
pub mod mapping;
pub mod midi;
pub mod paths;
pub mod queue;

pub use device::{Device, InboundProcessor};
pub use dispatcher::{Dispatcher, DrainStats};
pub use error::{MappingError, PortError};
pub use gesture::{Gesture, GestureTimer, PUSH_PULL_THRESHOLD};
pub use host::{ConsoleHost, Host};
pub use mapping::{Mapping, MappingTable};
pub use midi::InboundEvent;
pub use queue::{EventQueue, EventSender, MappedEvent};
