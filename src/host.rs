//! Host backends that dispatched mappings act upon
//!
//! The host owns command execution and dataref state. The dispatcher only
//! talks to it through the [`Host`] trait, so the pipeline can run against
//! the simulator, the console, or a test double.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Command and dataref backend of the host application
///
/// Methods take `&self`; implementations use interior mutability for state.
/// Calls happen on the host tick thread and must not block.
pub trait Host: Send + Sync {
    /// Start a command (button held down)
    fn begin_command(&self, command: &str);

    /// End a command started with [`Host::begin_command`]
    fn end_command(&self, command: &str);

    /// Fire a command once
    ///
    /// Default implementation: begin immediately followed by end.
    fn execute_command(&self, command: &str) {
        self.begin_command(command);
        self.end_command(command);
    }

    /// Current value of a dataref, if the host knows it
    fn read_dataref(&self, dataref: &str) -> Option<String>;

    /// Write a value to a dataref
    fn write_dataref(&self, dataref: &str, value: &str);
}

/// Host that logs every call instead of talking to a simulator
///
/// Dataref writes are kept in memory so toggle mappings cycle correctly.
pub struct ConsoleHost {
    datarefs: Mutex<HashMap<String, String>>,
    execution_count: AtomicU64,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self {
            datarefs: Mutex::new(HashMap::new()),
            execution_count: AtomicU64::new(0),
        }
    }

    /// Number of backend calls made so far
    pub fn execution_count(&self) -> u64 {
        self.execution_count.load(Ordering::Relaxed)
    }

    fn next_exec(&self) -> u64 {
        self.execution_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%H:%M:%S%.3f").to_string()
    }
}

impl Default for ConsoleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for ConsoleHost {
    fn begin_command(&self, command: &str) {
        let exec_num = self.next_exec();
        info!(
            "🎮 [{}] begin '{}' [exec #{}]",
            Self::timestamp(),
            command,
            exec_num
        );
    }

    fn end_command(&self, command: &str) {
        let exec_num = self.next_exec();
        info!(
            "🎮 [{}] end '{}' [exec #{}]",
            Self::timestamp(),
            command,
            exec_num
        );
    }

    fn execute_command(&self, command: &str) {
        let exec_num = self.next_exec();
        info!(
            "🎮 [{}] execute '{}' [exec #{}]",
            Self::timestamp(),
            command,
            exec_num
        );
    }

    fn read_dataref(&self, dataref: &str) -> Option<String> {
        self.datarefs.lock().get(dataref).cloned()
    }

    fn write_dataref(&self, dataref: &str, value: &str) {
        let exec_num = self.next_exec();
        let previous = self
            .datarefs
            .lock()
            .insert(dataref.to_string(), value.to_string());

        info!(
            "🎮 [{}] write '{}' = '{}' [exec #{}]",
            Self::timestamp(),
            dataref,
            value,
            exec_num
        );
        debug!(dataref, value, previous = ?previous, "ConsoleHost dataref write");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A single backend call observed by [`RecordingHost`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum HostCall {
        Begin(String),
        End(String),
        Execute(String),
        Write(String, String),
    }

    /// Host double that records calls in order
    #[derive(Default)]
    pub struct RecordingHost {
        calls: Mutex<Vec<HostCall>>,
        datarefs: Mutex<HashMap<String, String>>,
    }

    impl RecordingHost {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dataref(self, dataref: &str, value: &str) -> Self {
            self.datarefs
                .lock()
                .insert(dataref.to_string(), value.to_string());
            self
        }

        pub fn calls(&self) -> Vec<HostCall> {
            self.calls.lock().clone()
        }
    }

    impl Host for RecordingHost {
        fn begin_command(&self, command: &str) {
            self.calls.lock().push(HostCall::Begin(command.to_string()));
        }

        fn end_command(&self, command: &str) {
            self.calls.lock().push(HostCall::End(command.to_string()));
        }

        fn execute_command(&self, command: &str) {
            self.calls.lock().push(HostCall::Execute(command.to_string()));
        }

        fn read_dataref(&self, dataref: &str) -> Option<String> {
            self.datarefs.lock().get(dataref).cloned()
        }

        fn write_dataref(&self, dataref: &str, value: &str) {
            self.datarefs
                .lock()
                .insert(dataref.to_string(), value.to_string());
            self.calls
                .lock()
                .push(HostCall::Write(dataref.to_string(), value.to_string()));
        }
    }
}
