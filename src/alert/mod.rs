//! Alert path: classification and phase tracking.
//!
//! - [`classifier`] turns raw feed bodies into [`AlertRecord`]s
//! - [`phase`] holds the [`Phase`] lookup table
//! - [`machine`] decides when a notification goes out

pub mod classifier;
pub mod machine;
pub mod phase;

pub use classifier::{AlertRecord, classify, flattened_locations, is_idle_body};
pub use machine::{AlertNotice, BridgeState, NoticeKind, PhaseMachine};
pub use phase::{AIRCRAFT_CATEGORIES, Phase};
