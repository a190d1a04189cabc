//! Scope report assembly and shared report state

pub mod model;
pub mod store;
