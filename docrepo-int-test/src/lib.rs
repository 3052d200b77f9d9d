//! Shared fixtures for the docrepo integration tests.

pub mod recording_store;
pub mod test_util;
