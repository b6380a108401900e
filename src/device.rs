//! Hardware MIDI device
//!
//! A [`Device`] owns one inbound and one outbound MIDI connection. Inbound
//! frames arrive on a thread owned by the MIDI driver; the
//! [`InboundProcessor`] running there decodes them, looks up mappings,
//! times push & pull gestures, and hands matched events to the queue.

use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::error::{PortDirection, PortError};
use crate::gesture::{Gesture, GestureTimer};
use crate::mapping::{Mapping, MappingTable};
use crate::midi::{format_hex, Frame, InboundEvent};
use crate::queue::{EventSender, MappedEvent};


/// Inbound frame counters for one device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub too_short: u64,
    pub unknown_status: u64,
    pub last_unknown_status: Option<u8>,
    pub enqueued: u64,
}

/// State living on the driver's callback thread for one device
pub struct InboundProcessor {
    device: String,
    table: Arc<MappingTable>,
    timer: GestureTimer,
    sender: EventSender,
    stats: Arc<Mutex<FrameStats>>,
}

impl InboundProcessor {
    pub fn new(device: impl Into<String>, table: Arc<MappingTable>, sender: EventSender) -> Self {
        Self::with_stats(device, table, sender, Arc::default())
    }

    /// Create a processor that counts into `stats`, shared with its owner
    pub fn with_stats(
        device: impl Into<String>,
        table: Arc<MappingTable>,
        sender: EventSender,
        stats: Arc<Mutex<FrameStats>>,
    ) -> Self {
        Self {
            device: device.into(),
            table,
            timer: GestureTimer::new(),
            sender,
            stats,
        }
    }

    pub fn stats(&self) -> FrameStats {
        *self.stats.lock()
    }

    /// Handle one raw frame received at `now`
    ///
    /// Returns the number of mapped events enqueued.
    pub fn process(&mut self, data: &[u8], now: Instant) -> usize {
        self.stats.lock().frames += 1;

        trace!(
            "Inbound from '{}' on {:?} :: {}",
            self.device,
            std::thread::current().id(),
            format_hex(data)
        );

        match InboundEvent::decode(data, now) {
            Frame::Event(event) => self.route(event),
            Frame::TooShort => {
                self.stats.lock().too_short += 1;
                0
            }
            Frame::UnknownStatus(status) => {
                {
                    let mut stats = self.stats.lock();
                    stats.unknown_status += 1;
                    stats.last_unknown_status = Some(status);
                }
                warn!(
                    "Invalid MIDI status 0x{:02X} in message from device '{}'",
                    status, self.device
                );
                0
            }
        }
    }

    fn route(&mut self, event: InboundEvent) -> usize {
        let table = Arc::clone(&self.table);
        let mappings = table.lookup(event.control_id);

        if mappings.is_empty() {
            debug!(
                "No mapping for CC {} from device '{}'",
                event.control_id, self.device
            );
            return 0;
        }

        // Resolved at most once per event so every push & pull mapping on
        // this control sees the same selection
        let mut gesture: Option<Option<Gesture>> = None;
        let mut enqueued = 0;

        for mapping in mappings {
            let mapped = match mapping.as_ref() {
                Mapping::PushAndPull { .. } => {
                    let selected = *gesture.get_or_insert_with(|| self.track_gesture(&event));
                    selected.map(|g| MappedEvent::with_gesture(event, Arc::clone(mapping), g))
                }
                Mapping::Dataref { .. } => event
                    .is_press()
                    .then(|| MappedEvent::new(event, Arc::clone(mapping))),
                Mapping::Command { .. } => Some(MappedEvent::new(event, Arc::clone(mapping))),
            };

            if let Some(mapped) = mapped {
                if self.sender.enqueue(mapped) {
                    enqueued += 1;
                }
            }
        }

        self.stats.lock().enqueued += enqueued as u64;
        enqueued
    }

    /// Advance the press/release state of a push & pull control
    fn track_gesture(&mut self, event: &InboundEvent) -> Option<Gesture> {
        if event.is_press() {
            self.timer.press(event.control_id, event.arrival);
            None
        } else if event.is_release() {
            let gesture = self.timer.complete(event.control_id, event.arrival);
            match gesture {
                Some(g) => debug!(
                    "CC {} on device '{}' classified as {}",
                    event.control_id, self.device, g
                ),
                None => debug!(
                    "Release of CC {} on device '{}' without a recorded press",
                    event.control_id, self.device
                ),
            }
            gesture
        } else {
            warn!(
                "Invalid velocity {} for a push & pull mapping on CC {} from device '{}'",
                event.velocity, event.control_id, self.device
            );
            None
        }
    }
}

/// A hardware controller bound to an inbound and an outbound MIDI port
pub struct Device {
    name: String,
    port_in: usize,
    port_out: usize,
    table: Arc<MappingTable>,
    sender: EventSender,
    stats: Arc<Mutex<FrameStats>>,
    input_conn: Option<MidiInputConnection<InboundProcessor>>,
    output_conn: Option<MidiOutputConnection>,
}

impl Device {
    /// Create a device; no port is opened yet
    pub fn new(
        name: impl Into<String>,
        port_in: usize,
        port_out: usize,
        table: MappingTable,
        sender: EventSender,
    ) -> Self {
        let name = name.into();
        info!(
            "Created MIDI device '{}' (port in {}, port out {}, {} mappings)",
            name,
            port_in,
            port_out,
            table.len()
        );

        Self {
            name,
            port_in,
            port_out,
            table: Arc::new(table),
            sender,
            stats: Arc::default(),
            input_conn: None,
            output_conn: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.table
    }

    /// Frame counters accumulated over every connection of this device
    ///
    /// Readable while the device is open; the callback updates them live.
    pub fn stats(&self) -> FrameStats {
        *self.stats.lock()
    }

    /// Check if both ports are connected
    pub fn is_open(&self) -> bool {
        self.input_conn.is_some() && self.output_conn.is_some()
    }

    /// Open both ports and start receiving
    ///
    /// On failure nothing stays open and the error names the device, the
    /// port, and the driver's reason.
    pub fn open(&mut self) -> Result<(), PortError> {
        self.close();

        let input_conn = self.open_input()?;
        info!(
            "Inbound port {} opened for device '{}'",
            self.port_in, self.name
        );

        let output_conn = match self.open_output() {
            Ok(conn) => conn,
            Err(e) => {
                // Leave the device fully closed rather than half open
                input_conn.close();
                return Err(e);
            }
        };
        info!(
            "Outbound port {} opened for device '{}'",
            self.port_out, self.name
        );

        self.input_conn = Some(input_conn);
        self.output_conn = Some(output_conn);
        Ok(())
    }

    fn open_input(&self) -> Result<MidiInputConnection<InboundProcessor>, PortError> {
        let direction = PortDirection::Inbound;

        let mut midi_in =
            MidiInput::new(&format!("MidiCtrl-{}-In", self.name)).map_err(|e| PortError::Init {
                device: self.name.clone(),
                direction,
                reason: e.to_string(),
            })?;
        midi_in.ignore(Ignore::None);

        let ports = midi_in.ports();
        let port = ports.get(self.port_in).ok_or_else(|| PortError::PortNotFound {
            device: self.name.clone(),
            direction,
            index: self.port_in,
            available: ports.len(),
        })?;

        let processor = InboundProcessor::with_stats(
            self.name.clone(),
            Arc::clone(&self.table),
            self.sender.clone(),
            Arc::clone(&self.stats),
        );

        midi_in
            .connect(
                port,
                "midictrl-in",
                |_stamp, data, processor: &mut InboundProcessor| {
                    processor.process(data, Instant::now());
                },
                processor,
            )
            .map_err(|e| PortError::Connect {
                device: self.name.clone(),
                direction,
                index: self.port_in,
                reason: e.to_string(),
            })
    }

    fn open_output(&self) -> Result<MidiOutputConnection, PortError> {
        let direction = PortDirection::Outbound;

        let midi_out =
            MidiOutput::new(&format!("MidiCtrl-{}-Out", self.name)).map_err(|e| PortError::Init {
                device: self.name.clone(),
                direction,
                reason: e.to_string(),
            })?;

        let ports = midi_out.ports();
        let port = ports.get(self.port_out).ok_or_else(|| PortError::PortNotFound {
            device: self.name.clone(),
            direction,
            index: self.port_out,
            available: ports.len(),
        })?;

        midi_out
            .connect(port, "midictrl-out")
            .map_err(|e| PortError::Connect {
                device: self.name.clone(),
                direction,
                index: self.port_out,
                reason: e.to_string(),
            })
    }

    /// Close both ports
    ///
    /// Safe to call repeatedly and on a device that was never opened. Once
    /// this returns the callback no longer runs; events it already queued
    /// are left for the dispatcher.
    pub fn close(&mut self) {
        if let Some(conn) = self.input_conn.take() {
            conn.close();
            let stats = self.stats();
            debug!(
                "Closed inbound port {} for device '{}' ({} frames, {} enqueued, {} invalid status)",
                self.port_in, self.name, stats.frames, stats.enqueued, stats.unknown_status
            );
            if let Some(status) = stats.last_unknown_status {
                debug!(
                    "Last invalid status from device '{}': 0x{:02X}",
                    self.name, status
                );
            }
        }

        if let Some(conn) = self.output_conn.take() {
            conn.close();
            debug!(
                "Closed outbound port {} for device '{}'",
                self.port_out, self.name
            );
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open every device, logging the ones that fail
///
/// Returns how many devices are open afterwards.
pub fn open_all(devices: &mut [Device]) -> usize {
    let mut open = 0;
    for device in devices.iter_mut() {
        match device.open() {
            Ok(()) => open += 1,
            Err(e) => error!("Device '{}' disabled: {}", device.name(), e),
        }
    }
    open
}
