//! Usage: Pure domain state (location tracking, notification feed, synthetic generator).

pub(crate) mod location;
pub(crate) mod notifications;
pub(crate) mod simulator;
