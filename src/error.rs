//! Error types for device ports and mapping registration

use std::fmt;
use thiserror::Error;

/// Which half of a device a port error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Inbound,
    Outbound,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Inbound => write!(f, "inbound"),
            PortDirection::Outbound => write!(f, "outbound"),
        }
    }
}

/// Failure to open a device's MIDI ports
///
/// Always recoverable: the device stays closed, other devices keep running.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("could not create {direction} MIDI client for device '{device}': {reason}")]
    Init {
        device: String,
        direction: PortDirection,
        reason: String,
    },

    #[error("{direction} port {index} not found for device '{device}' ({available} ports available)")]
    PortNotFound {
        device: String,
        direction: PortDirection,
        index: usize,
        available: usize,
    },

    #[error("could not open {direction} port {index} for device '{device}': {reason}")]
    Connect {
        device: String,
        direction: PortDirection,
        index: usize,
        reason: String,
    },
}

/// A mapping rejected at registration time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("command mapping for CC {control_id} has an empty command")]
    EmptyCommand { control_id: u32 },

    #[error("dataref mapping for CC {control_id} has an empty dataref")]
    EmptyDataref { control_id: u32 },

    #[error("dataref mapping for CC {control_id} has no values")]
    NoDatarefValues { control_id: u32 },

    #[error("push & pull mapping for CC {control_id} has an empty {which} command")]
    InvalidSubAction {
        control_id: u32,
        which: &'static str,
    },
}
