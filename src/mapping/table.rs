//! Control id → mappings lookup

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::Mapping;
use crate::error::MappingError;

/// Mappings of one device, grouped by control id
///
/// Filled during setup, then shared read-only with the device's inbound
/// callback. Several mappings may share a control id; they are kept in
/// registration order.
#[derive(Debug, Default)]
pub struct MappingTable {
    by_control: HashMap<u32, Vec<Arc<Mapping>>>,
    len: usize,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a mapping
    ///
    /// A rejected mapping is logged and left out of the table.
    pub fn register(&mut self, mapping: Mapping) -> Result<(), MappingError> {
        if let Err(e) = mapping.validate() {
            warn!("Rejected mapping {}: {}", mapping, e);
            return Err(e);
        }

        debug!("Registered mapping {}", mapping);
        self.by_control
            .entry(mapping.control_id())
            .or_default()
            .push(Arc::new(mapping));
        self.len += 1;
        Ok(())
    }

    /// Mappings for a control id, empty when none are registered
    pub fn lookup(&self, control_id: u32) -> &[Arc<Mapping>] {
        self.by_control
            .get(&control_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of registered mappings
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Registered control ids in ascending order
    pub fn control_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.by_control.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
