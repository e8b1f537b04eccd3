//! Identifier space management
//!
//! The identifier space owns the set of IMO numbers a run is responsible
//! for and the per-unit delivery state. It decides what is dispatched next
//! and what happens after each outcome; it never performs IO itself.

mod imo;
mod space;
mod status;

pub use imo::{imo_checksum_ok, imo_from_vessel_url};
pub use space::{Disposition, IdentifierSpace, KeySpec, Outcome, SpaceCounts};
pub use status::{FailureKind, WorkStatus};
