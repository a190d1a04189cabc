//! Boshscope Library
//!
//! Core modules for the boshscope Weave Scope plugin.

pub mod app;
pub mod errors;
pub mod filesys;
pub mod jobspec;
pub mod logs;
pub mod monit;
pub mod report;
pub mod server;
pub mod utils;
pub mod workers;
