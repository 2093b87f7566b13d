//! huddlematch core - availability scheduling and matching
//!
//! The algorithmic heart of the bot, free of any Slack or storage
//! specifics:
//! - **Time ranges** (`timerange`) - `HH:MM-HH:MM` parsing onto the
//!   30-minute slot grid, plus the rolling admission window
//! - **Repository contract** (`repository`) - the narrow async interface
//!   the storage collaborator must provide
//! - **Scheduler** (`scheduler`) - register / list / delete over that
//!   contract
//! - **Matching** (`matching`) - first-fit group matcher and the past-slot
//!   reaper
//!
//! Everything takes its collaborators by injection (`Arc<dyn ...>`): no
//! singletons, no ambient clock.

pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod matching;
pub mod repository;
pub mod scheduler;
pub mod timerange;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{AvailabilityRecord, AvailabilitySlot, Match};
pub use errors::{ApplicationError, InterfaceError, ScheduleError};
pub use matching::{MatchEngine, DEFAULT_MAX_USERS_PER_MATCH};
pub use repository::{AvailabilityRepository, StorageError};
pub use scheduler::Scheduler;
pub use timerange::{is_within_two_weeks, parse_time_range, AdmissionWindow, SLOT_MINUTES};
