//! Shared helpers for dbot-telegram integration tests.

#![allow(dead_code)] // each test binary uses a different subset

pub mod fixtures;
pub mod mock_api;
