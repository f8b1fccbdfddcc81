//! Trigger side: notifications in, one pipeline run out per distinct event.

pub mod dedup;
pub mod listener;
pub mod notification;

pub use dedup::DedupWindow;
pub use listener::{ListenSummary, ListenerConfig, TriggerListener};
pub use notification::Notification;
