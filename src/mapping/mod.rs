//! Control mappings
//!
//! A [`Mapping`] ties a control id to an action in the host. Each variant
//! carries only the fields it needs, validates itself before it is
//! registered, and executes itself against a [`Host`] when dispatched.

pub mod table;

use std::fmt;
use tracing::{error, warn};

use crate::error::MappingError;
use crate::gesture::Gesture;
use crate::host::Host;
use crate::midi::InboundEvent;

pub use table::MappingTable;

/// Action bound to a control id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    /// Begin the command on press, end it on release
    Command { control_id: u32, command: String },

    /// Write a value on press, cycling through `values` on each press
    Dataref {
        control_id: u32,
        dataref: String,
        values: Vec<String>,
    },

    /// Fire `push` on a short press and `pull` on a long one
    PushAndPull {
        control_id: u32,
        push: String,
        pull: String,
    },
}

/// Whether dispatching a mapped event reached the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Fired,
    Ignored,
}

impl Mapping {
    pub fn control_id(&self) -> u32 {
        match self {
            Mapping::Command { control_id, .. }
            | Mapping::Dataref { control_id, .. }
            | Mapping::PushAndPull { control_id, .. } => *control_id,
        }
    }

    /// Short type tag, matching the configuration file
    pub fn kind(&self) -> &'static str {
        match self {
            Mapping::Command { .. } => "cmd",
            Mapping::Dataref { .. } => "drf",
            Mapping::PushAndPull { .. } => "pnp",
        }
    }

    /// Check the type-specific fields
    pub fn validate(&self) -> Result<(), MappingError> {
        match self {
            Mapping::Command {
                control_id,
                command,
            } => {
                if command.is_empty() {
                    return Err(MappingError::EmptyCommand {
                        control_id: *control_id,
                    });
                }
            }
            Mapping::Dataref {
                control_id,
                dataref,
                values,
            } => {
                if dataref.is_empty() {
                    return Err(MappingError::EmptyDataref {
                        control_id: *control_id,
                    });
                }
                if values.is_empty() {
                    return Err(MappingError::NoDatarefValues {
                        control_id: *control_id,
                    });
                }
            }
            Mapping::PushAndPull {
                control_id,
                push,
                pull,
            } => {
                if push.is_empty() {
                    return Err(MappingError::InvalidSubAction {
                        control_id: *control_id,
                        which: "push",
                    });
                }
                if pull.is_empty() {
                    return Err(MappingError::InvalidSubAction {
                        control_id: *control_id,
                        which: "pull",
                    });
                }
            }
        }
        Ok(())
    }

    /// Perform the mapped action
    ///
    /// `gesture` is the push/pull selection made when the release arrived;
    /// it is only consulted for [`Mapping::PushAndPull`].
    pub fn execute(
        &self,
        event: &InboundEvent,
        gesture: Option<Gesture>,
        host: &dyn Host,
    ) -> Execution {
        match self {
            Mapping::Command { command, .. } => {
                if event.is_press() {
                    host.begin_command(command);
                } else if event.is_release() {
                    host.end_command(command);
                } else {
                    error!(
                        "Invalid velocity {} for command mapping on CC {}",
                        event.velocity, event.control_id
                    );
                    return Execution::Ignored;
                }
                Execution::Fired
            }
            Mapping::Dataref {
                dataref, values, ..
            } => {
                if !event.is_press() {
                    return Execution::Ignored;
                }
                let current = host.read_dataref(dataref);
                match next_value(values, current.as_deref()) {
                    Some(value) => {
                        host.write_dataref(dataref, value);
                        Execution::Fired
                    }
                    None => Execution::Ignored,
                }
            }
            Mapping::PushAndPull { push, pull, .. } => match gesture {
                Some(Gesture::Push) => {
                    host.execute_command(push);
                    Execution::Fired
                }
                Some(Gesture::Pull) => {
                    host.execute_command(pull);
                    Execution::Fired
                }
                None => {
                    warn!(
                        "Push & pull mapping on CC {} dispatched without a gesture",
                        event.control_id
                    );
                    Execution::Ignored
                }
            },
        }
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mapping::Command {
                control_id,
                command,
            } => write!(f, "CC {} {} '{}'", control_id, self.kind(), command),
            Mapping::Dataref {
                control_id,
                dataref,
                values,
            } => write!(
                f,
                "CC {} {} '{}' [{}]",
                control_id,
                self.kind(),
                dataref,
                values.join(", ")
            ),
            Mapping::PushAndPull {
                control_id,
                push,
                pull,
            } => write!(
                f,
                "CC {} {} push '{}' pull '{}'",
                control_id,
                self.kind(),
                push,
                pull
            ),
        }
    }
}

/// Value to write for a dataref toggle given its current value
fn next_value<'a>(values: &'a [String], current: Option<&str>) -> Option<&'a str> {
    let position = current.and_then(|cur| values.iter().position(|v| v == cur));
    let index = match position {
        Some(i) => (i + 1) % values.len(),
        None => 0,
    };
    values.get(index).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::{HostCall, RecordingHost};
    use std::time::Instant;

    fn event(control_id: u32, velocity: u8) -> InboundEvent {
        InboundEvent {
            status: crate::midi::CONTROL_CHANGE,
            control_id,
            velocity,
            arrival: Instant::now(),
        }
    }

    fn command(cc: u32, name: &str) -> Mapping {
        Mapping::Command {
            control_id: cc,
            command: name.to_string(),
        }
    }

    fn dataref(cc: u32, name: &str, values: &[&str]) -> Mapping {
        Mapping::Dataref {
            control_id: cc,
            dataref: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn push_pull(cc: u32, push: &str, pull: &str) -> Mapping {
        Mapping::PushAndPull {
            control_id: cc,
            push: push.to_string(),
            pull: pull.to_string(),
        }
    }

    #[test]
    fn test_validation() {
        assert!(command(1, "sim/a").validate().is_ok());
        assert_eq!(
            command(1, "").validate(),
            Err(MappingError::EmptyCommand { control_id: 1 })
        );

        assert!(dataref(2, "sim/gear", &["0", "1"]).validate().is_ok());
        assert_eq!(
            dataref(2, "", &["1"]).validate(),
            Err(MappingError::EmptyDataref { control_id: 2 })
        );
        assert_eq!(
            dataref(2, "sim/gear", &[]).validate(),
            Err(MappingError::NoDatarefValues { control_id: 2 })
        );

        assert!(push_pull(3, "sim/p", "sim/q").validate().is_ok());
        assert_eq!(
            push_pull(3, "", "sim/q").validate(),
            Err(MappingError::InvalidSubAction {
                control_id: 3,
                which: "push"
            })
        );
        assert_eq!(
            push_pull(3, "sim/p", "").validate(),
            Err(MappingError::InvalidSubAction {
                control_id: 3,
                which: "pull"
            })
        );
    }

    #[test]
    fn test_command_begin_and_end() {
        let host = RecordingHost::new();
        let mapping = command(10, "sim/autopilot/hdg_up");

        assert_eq!(mapping.execute(&event(10, 127), None, &host), Execution::Fired);
        assert_eq!(mapping.execute(&event(10, 0), None, &host), Execution::Fired);

        assert_eq!(
            host.calls(),
            vec![
                HostCall::Begin("sim/autopilot/hdg_up".to_string()),
                HostCall::End("sim/autopilot/hdg_up".to_string()),
            ]
        );
    }

    #[test]
    fn test_command_ignores_other_velocities() {
        let host = RecordingHost::new();
        let mapping = command(10, "sim/a");

        for velocity in [1u8, 64, 126, 128, 255] {
            assert_eq!(
                mapping.execute(&event(10, velocity), None, &host),
                Execution::Ignored
            );
        }
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_dataref_writes_only_on_press() {
        let host = RecordingHost::new();
        let mapping = dataref(11, "sim/lights/beacon", &["1"]);

        assert_eq!(mapping.execute(&event(11, 0), None, &host), Execution::Ignored);
        assert_eq!(mapping.execute(&event(11, 64), None, &host), Execution::Ignored);
        assert_eq!(mapping.execute(&event(11, 127), None, &host), Execution::Fired);

        assert_eq!(
            host.calls(),
            vec![HostCall::Write(
                "sim/lights/beacon".to_string(),
                "1".to_string()
            )]
        );
    }

    #[test]
    fn test_dataref_toggles_through_values() {
        let host = RecordingHost::new().with_dataref("sim/gear", "0");
        let mapping = dataref(11, "sim/gear", &["0", "1"]);

        mapping.execute(&event(11, 127), None, &host);
        mapping.execute(&event(11, 127), None, &host);

        assert_eq!(
            host.calls(),
            vec![
                HostCall::Write("sim/gear".to_string(), "1".to_string()),
                HostCall::Write("sim/gear".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_dataref_unknown_value_starts_at_first() {
        assert_eq!(
            next_value(&["a".to_string(), "b".to_string()], Some("zzz")),
            Some("a")
        );
        assert_eq!(next_value(&["a".to_string()], None), Some("a"));
        assert_eq!(next_value(&[], None), None);
    }

    #[test]
    fn test_push_and_pull_fires_selected_command() {
        let host = RecordingHost::new();
        let mapping = push_pull(12, "sim/push", "sim/pull");

        mapping.execute(&event(12, 0), Some(Gesture::Push), &host);
        mapping.execute(&event(12, 0), Some(Gesture::Pull), &host);
        assert_eq!(
            mapping.execute(&event(12, 0), None, &host),
            Execution::Ignored
        );

        assert_eq!(
            host.calls(),
            vec![
                HostCall::Execute("sim/push".to_string()),
                HostCall::Execute("sim/pull".to_string()),
            ]
        );
    }
}
