//! MIDI frame decoding and port discovery
//!
//! Turns raw inbound byte frames into [`InboundEvent`]s and lists the
//! ports a device can be bound to.

use colored::*;
use midir::{MidiInput, MidiOutput};
use std::fmt;
use std::time::Instant;

/// Status byte of a Control Change on channel 1, the only status we map
pub const CONTROL_CHANGE: u8 = 0xB0;

/// Velocity sent by a digital switch when pressed
pub const VELOCITY_PRESS: u8 = 127;

/// Velocity sent by a digital switch when released
pub const VELOCITY_RELEASE: u8 = 0;

/// Minimum length of a control change frame (status, cc, value)
const FRAME_LEN: usize = 3;

/// Control change event received from a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundEvent {
    pub status: u8,
    pub control_id: u32,
    pub velocity: u8,
    pub arrival: Instant,
}

/// Result of decoding a raw inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// A well-formed control change
    Event(InboundEvent),
    /// Fewer than three bytes; dropped without a diagnostic
    TooShort,
    /// Three or more bytes with a status we do not handle
    UnknownStatus(u8),
}

impl InboundEvent {
    /// Decode a raw frame received at `arrival`
    pub fn decode(data: &[u8], arrival: Instant) -> Frame {
        if data.len() < FRAME_LEN {
            return Frame::TooShort;
        }

        let status = data[0];
        if status != CONTROL_CHANGE {
            return Frame::UnknownStatus(status);
        }

        Frame::Event(InboundEvent {
            status,
            control_id: u32::from(data[1]),
            velocity: data[2],
            arrival,
        })
    }

    pub fn is_press(&self) -> bool {
        self.velocity == VELOCITY_PRESS
    }

    pub fn is_release(&self) -> bool {
        self.velocity == VELOCITY_RELEASE
    }
}

impl fmt::Display for InboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status:{:02X} cc:{} v:{}",
            self.status, self.control_id, self.velocity
        )
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Available MIDI ports, indexed the way devices reference them
#[derive(Debug, Clone, Default)]
pub struct PortListing {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Enumerate MIDI input and output ports
pub fn list_ports() -> Result<PortListing, midir::InitError> {
    let midi_in = MidiInput::new("MidiCtrl-Scanner")?;
    let midi_out = MidiOutput::new("MidiCtrl-Scanner")?;

    let inputs = midi_in
        .ports()
        .iter()
        .map(|p| midi_in.port_name(p).unwrap_or_else(|_| "<unknown>".to_string()))
        .collect();
    let outputs = midi_out
        .ports()
        .iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "<unknown>".to_string()))
        .collect();

    Ok(PortListing { inputs, outputs })
}

/// Print the port listing with the indices used in the configuration
pub fn print_ports(listing: &PortListing) {
    println!("\n{}", "=== MIDI Ports ===".bold().cyan());

    println!("\n{}", "Inbound (port_in):".bold());
    if listing.inputs.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for (index, name) in listing.inputs.iter().enumerate() {
        println!("  [{}] {}", index.to_string().yellow(), name.green());
    }

    println!("\n{}", "Outbound (port_out):".bold());
    if listing.outputs.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for (index, name) in listing.outputs.iter().enumerate() {
        println!("  [{}] {}", index.to_string().yellow(), name.green());
    }
}
