//! Daily usage quota and the generation controller.
//!
//! The store keeps a per-day counter in key-value storage; the controller
//! gates every generation action on it:
//! - Check: at or over the limit means `Blocked`, nothing else happens
//! - Generate: prompt, fragment or fallback sentence
//! - Commit: the counter is incremented after any normal return

pub mod clock;
pub mod controller;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{ActionOutcome, QuotaController, QuotaSnapshot, QuotaState};
pub use store::{QuotaRecord, QuotaStore};
