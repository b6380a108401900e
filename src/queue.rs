//! Hand-off queue between device callbacks and the host tick
//!
//! Every device gets an [`EventSender`] cloned from the same channel, so
//! all producers and the single consumer share one synchronization point.

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::gesture::Gesture;
use crate::mapping::Mapping;
use crate::midi::InboundEvent;

/// An inbound event matched to the mapping it should trigger
#[derive(Debug, Clone)]
pub struct MappedEvent {
    pub event: InboundEvent,
    pub mapping: Arc<Mapping>,
    /// Push/pull selection, set only for push & pull mappings
    pub gesture: Option<Gesture>,
}

impl MappedEvent {
    pub fn new(event: InboundEvent, mapping: Arc<Mapping>) -> Self {
        Self {
            event,
            mapping,
            gesture: None,
        }
    }

    pub fn with_gesture(event: InboundEvent, mapping: Arc<Mapping>, gesture: Gesture) -> Self {
        Self {
            event,
            mapping,
            gesture: Some(gesture),
        }
    }
}

/// Unbounded FIFO of mapped events
pub struct EventQueue {
    tx: Sender<MappedEvent>,
    rx: Receiver<MappedEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    /// Producer handle for a device callback thread
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Take the oldest event without waiting
    pub fn try_dequeue(&self) -> Option<MappedEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable producer side of an [`EventQueue`]
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<MappedEvent>,
}

impl EventSender {
    /// Append an event; never blocks
    ///
    /// Returns false once the queue itself has been dropped.
    pub fn enqueue(&self, mapped: MappedEvent) -> bool {
        trace!(
            "Enqueue on {:?} :: {} -> {}",
            std::thread::current().id(),
            mapped.event,
            mapped.mapping
        );

        match self.tx.send(mapped) {
            Ok(()) => true,
            Err(e) => {
                debug!("Event queue closed, dropping {}", e.into_inner().event);
                false
            }
        }
    }
}
