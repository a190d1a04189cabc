//! Monit process supervisor client

pub mod client;
pub mod retry;
