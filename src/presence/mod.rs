mod activity;
mod detector;
mod manager;
mod scheduler;

pub use activity::{compose, ActivityMode, ActivitySnapshot, PresencePayload};
pub use detector::{classify_page, PageSnapshot, ProbeError, StateDetector, ViewProbe, ViewSlot};
pub use manager::{
    PresenceClient, PresenceConnector, PresenceError, PresenceManager, PresenceUpdate,
};
pub use scheduler::PollScheduler;
