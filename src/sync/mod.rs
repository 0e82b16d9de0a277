pub mod delivery;
pub mod engine;
pub mod opener;
pub mod worker;

pub use delivery::JournalTarget;
pub use engine::{sync_all, DayReport, DeliveryOutcome, SyncReport};
pub use opener::{SystemOpener, UrlOpener};
pub use worker::SyncController;
