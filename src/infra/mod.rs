//! Usage: Infrastructure adapters (filesystem paths, persistence, positioning hosts).

pub(crate) mod app_paths;
pub(crate) mod local_storage;
pub(crate) mod positioning;
pub(crate) mod profile;
pub(crate) mod settings;
