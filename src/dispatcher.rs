//! Host-tick side of the pipeline
//!
//! The host calls [`Dispatcher::drain`] once per execution cycle. Every
//! queued event is executed against the host backend in FIFO order.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::host::Host;
use crate::mapping::Execution;
use crate::queue::{EventQueue, EventSender};

/// Counters for one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Events whose mapping reached the host
    pub dispatched: usize,
    /// Events dequeued but dropped by their mapping
    pub skipped: usize,
}

impl DrainStats {
    pub fn total(&self) -> usize {
        self.dispatched + self.skipped
    }
}

/// Drains the event queue into a host backend
pub struct Dispatcher {
    queue: EventQueue,
    host: Arc<dyn Host>,
}

impl Dispatcher {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self::with_queue(EventQueue::new(), host)
    }

    pub fn with_queue(queue: EventQueue, host: Arc<dyn Host>) -> Self {
        Self { queue, host }
    }

    /// Producer handle to give to a device
    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    /// Events waiting for the next tick
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Execute every event currently queued, without waiting for more
    ///
    /// Events enqueued while draining are picked up in the same pass.
    pub fn drain(&self) -> DrainStats {
        let mut stats = DrainStats::default();

        while let Some(mapped) = self.queue.try_dequeue() {
            trace!(
                "Dispatch on {:?} :: {} -> {}",
                std::thread::current().id(),
                mapped.event,
                mapped.mapping
            );

            match mapped
                .mapping
                .execute(&mapped.event, mapped.gesture, self.host.as_ref())
            {
                Execution::Fired => stats.dispatched += 1,
                Execution::Ignored => stats.skipped += 1,
            }
        }

        if stats.total() > 0 {
            debug!(
                "Drained {} events ({} dispatched, {} skipped)",
                stats.total(),
                stats.dispatched,
                stats.skipped
            );
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Gesture;
    use crate::host::testing::{HostCall, RecordingHost};
    use crate::mapping::Mapping;
    use crate::midi::{InboundEvent, CONTROL_CHANGE};
    use crate::queue::MappedEvent;
    use std::thread;
    use std::time::Instant;

    fn event(cc: u32, velocity: u8) -> InboundEvent {
        InboundEvent {
            status: CONTROL_CHANGE,
            control_id: cc,
            velocity,
            arrival: Instant::now(),
        }
    }

    fn command(cc: u32, name: &str) -> Arc<Mapping> {
        Arc::new(Mapping::Command {
            control_id: cc,
            command: name.to_string(),
        })
    }

    #[test]
    fn test_drain_empty_queue() {
        let host = Arc::new(RecordingHost::new());
        let dispatcher = Dispatcher::new(host.clone());

        assert_eq!(dispatcher.drain(), DrainStats::default());
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_drain_executes_in_order() {
        let host = Arc::new(RecordingHost::new());
        let dispatcher = Dispatcher::new(host.clone());
        let sender = dispatcher.sender();

        let mapping = command(10, "sim/a");
        sender.enqueue(MappedEvent::new(event(10, 127), mapping.clone()));
        sender.enqueue(MappedEvent::new(event(10, 0), mapping));

        let stats = dispatcher.drain();
        assert_eq!(stats.dispatched, 2);
        assert_eq!(dispatcher.pending(), 0);
        assert_eq!(
            host.calls(),
            vec![
                HostCall::Begin("sim/a".to_string()),
                HostCall::End("sim/a".to_string()),
            ]
        );
    }

    #[test]
    fn test_skipped_event_does_not_abort_drain() {
        let host = Arc::new(RecordingHost::new());
        let dispatcher = Dispatcher::new(host.clone());
        let sender = dispatcher.sender();

        let pnp = Arc::new(Mapping::PushAndPull {
            control_id: 12,
            push: "sim/push".to_string(),
            pull: "sim/pull".to_string(),
        });

        // No gesture selected: nothing to fire
        sender.enqueue(MappedEvent::new(event(12, 0), pnp.clone()));
        sender.enqueue(MappedEvent::with_gesture(event(12, 0), pnp, Gesture::Pull));

        let stats = dispatcher.drain();
        assert_eq!(stats, DrainStats { dispatched: 1, skipped: 1 });
        assert_eq!(host.calls(), vec![HostCall::Execute("sim/pull".to_string())]);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        const PRODUCERS: u32 = 8;
        const PER_PRODUCER: u32 = 250;

        let host = Arc::new(RecordingHost::new());
        let dispatcher = Dispatcher::new(host.clone());

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let sender = dispatcher.sender();
                let mapping = command(producer, &format!("dev{}", producer));
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        // Alternate press/release so each producer's order is visible
                        let velocity = if seq % 2 == 0 { 127 } else { 0 };
                        sender.enqueue(MappedEvent::new(event(producer, velocity), mapping.clone()));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = dispatcher.drain();
        assert_eq!(stats.dispatched, (PRODUCERS * PER_PRODUCER) as usize);
        assert_eq!(stats.skipped, 0);

        let calls = host.calls();
        assert_eq!(calls.len(), (PRODUCERS * PER_PRODUCER) as usize);

        for producer in 0..PRODUCERS {
            let name = format!("dev{}", producer);
            let own: Vec<&HostCall> = calls
                .iter()
                .filter(|c| match c {
                    HostCall::Begin(n) | HostCall::End(n) => *n == name,
                    _ => false,
                })
                .collect();

            assert_eq!(own.len(), PER_PRODUCER as usize);
            for (seq, call) in own.iter().enumerate() {
                if seq % 2 == 0 {
                    assert_eq!(**call, HostCall::Begin(name.clone()));
                } else {
                    assert_eq!(**call, HostCall::End(name.clone()));
                }
            }
        }
    }

    #[test]
    fn test_drain_while_producing() {
        let host = Arc::new(RecordingHost::new());
        let dispatcher = Dispatcher::new(host.clone());
        let sender = dispatcher.sender();
        let mapping = command(1, "sim/a");

        let producer = thread::spawn(move || {
            for _ in 0..1000 {
                sender.enqueue(MappedEvent::new(event(1, 127), mapping.clone()));
            }
        });

        let mut total = 0;
        while !producer.is_finished() {
            total += dispatcher.drain().total();
        }
        producer.join().unwrap();
        total += dispatcher.drain().total();

        assert_eq!(total, 1000);
        assert_eq!(host.calls().len(), 1000);
    }
}
