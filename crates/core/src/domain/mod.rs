pub mod availability;
pub mod matching;

pub use availability::{AvailabilityRecord, AvailabilitySlot};
pub use matching::Match;
