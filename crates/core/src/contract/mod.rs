//! Contract types shared by every layer
//!
//! - `version`: per-event mutation counter used for compare-and-swap
//! - `timestamp`: microsecond timestamps for stored versions and ledger expiry

pub mod timestamp;
pub mod version;

pub use timestamp::Timestamp;
pub use version::Version;
