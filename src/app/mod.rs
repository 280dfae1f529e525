//! Usage: Application layer (real-time provider runtime, notices, logging, teardown).

pub(crate) mod cleanup;
pub(crate) mod logging;
pub(crate) mod notice;
pub(crate) mod real_time;
