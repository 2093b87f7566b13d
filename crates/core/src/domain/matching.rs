use serde::{Deserialize, Serialize};

use crate::domain::availability::{AvailabilityRecord, AvailabilitySlot};

/// A group of users sharing one slot, to be introduced to each other.
///
/// `users` and `channel_ids` are parallel sequences: index `i` of both comes
/// from the same [`AvailabilityRecord`], in the order records were assigned
/// to the group. Matches are built fresh on every matching run and never
/// persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub slot: AvailabilitySlot,
    pub users: Vec<String>,
    pub channel_ids: Vec<String>,
}

impl Match {
    /// Starts a new group seeded with a single record.
    pub fn seeded_with(record: &AvailabilityRecord) -> Self {
        Self {
            slot: record.slot.clone(),
            users: vec![record.user_id.clone()],
            channel_ids: vec![record.channel_id.clone()],
        }
    }

    /// Appends a record's user and channel, keeping the sequences parallel.
    pub fn admit(&mut self, record: &AvailabilityRecord) {
        self.users.push(record.user_id.clone());
        self.channel_ids.push(record.channel_id.clone());
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
