//! # Service table: fixed-capacity slot array.
//!
//! The table is allocated once with `SupervisorConfig::max_services` slots and is
//! owned by the supervisor loop alone, so it needs no locking.
//!
//! ## Lookup
//! [`ServiceTable::find_or_claim`] scans linearly (the table holds tens of services):
//! ```text
//! 1. slot whose descriptor has the same name → reuse (crash_count kept)
//! 2. first free slot                         → claim (crash_count reset)
//! 3. neither                                 → CapacityExceeded
//! ```

use crate::core::slot::ServiceSlot;
use crate::error::StartError;

/// Result of a successful lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Claim {
    /// Slot index.
    pub index: usize,
    /// True if the slot already belonged to this service name.
    pub reused: bool,
}

/// Fixed-capacity array of supervision records.
pub(crate) struct ServiceTable {
    slots: Box<[ServiceSlot]>,
}

impl ServiceTable {
    /// Creates a table of `capacity` free slots.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| ServiceSlot::default()).collect();
        Self { slots }
    }

    /// Returns the slot held by `name`, else the first free slot.
    pub fn find_or_claim(&self, name: &str) -> Result<Claim, StartError> {
        if let Some(index) = self.find(name) {
            return Ok(Claim {
                index,
                reused: true,
            });
        }
        self.slots
            .iter()
            .position(ServiceSlot::is_free)
            .map(|index| Claim {
                index,
                reused: false,
            })
            .ok_or_else(|| StartError::CapacityExceeded {
                service: name.to_string(),
                capacity: self.capacity(),
            })
    }

    /// Index of the slot holding `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name() == Some(name))
    }

    /// Indices of occupied slots, in table order.
    pub fn occupied(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_free())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn slot(&self, index: usize) -> &ServiceSlot {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut ServiceSlot {
        &mut self.slots[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ServiceSlot)> {
        self.slots.iter().enumerate()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::services::ServiceDescriptor;

    fn occupy(table: &mut ServiceTable, index: usize, name: &'static str) {
        let desc = ServiceDescriptor::builder(name).build(|_ctx: CancellationToken| async { Ok(()) });
        table.slot_mut(index).descriptor = Some(Arc::new(desc));
    }

    #[test]
    fn claims_first_free_slot() {
        let mut table = ServiceTable::new(3);
        occupy(&mut table, 0, "eth");

        let claim = table.find_or_claim("mqtt").unwrap();
        assert_eq!(claim, Claim { index: 1, reused: false });
    }

    #[test]
    fn reuses_slot_of_same_name() {
        let mut table = ServiceTable::new(3);
        occupy(&mut table, 0, "eth");
        occupy(&mut table, 1, "mqtt");
        table.slot_mut(0).release();

        let claim = table.find_or_claim("mqtt").unwrap();
        assert_eq!(claim, Claim { index: 1, reused: true });
    }

    #[test]
    fn new_name_never_takes_an_occupied_slot() {
        let mut table = ServiceTable::new(2);
        occupy(&mut table, 0, "eth");
        occupy(&mut table, 1, "mqtt");

        let err = table.find_or_claim("temp").unwrap_err();
        assert!(matches!(err, StartError::CapacityExceeded { capacity: 2, .. }));
    }

    #[test]
    fn occupied_lists_in_order() {
        let mut table = ServiceTable::new(4);
        occupy(&mut table, 3, "c");
        occupy(&mut table, 1, "a");
        assert_eq!(table.occupied(), vec![1, 3]);
    }
}
