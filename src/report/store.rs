//! Shared holder of the latest report
//!
//! The refresh worker is the only writer; request handlers are
//! readers. One reader/writer lock protects the whole `RefreshState`
//! so readers always observe a complete tick, never a half-written
//! one. The lock is held only around the clone/assign, never across
//! I/O.

use std::sync::RwLock;

use crate::errors::PluginError;
use crate::report::model::Report;

/// Latest refresh outcome: a successful tick sets the report and
/// clears the error, a failed tick sets the error and leaves the
/// previously stored report in place.
#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    pub report: Option<Report>,
    pub error: Option<String>,
}

/// Concurrently readable holder of the latest `RefreshState`
#[derive(Debug, Default)]
pub struct ReportStore {
    state: RwLock<RefreshState>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current state
    pub fn get(&self) -> RefreshState {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.clone()
    }

    /// Publish a fully built report, clearing any recorded error
    pub fn set_report(&self, report: Report) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.report = Some(report);
        state.error = None;
    }

    /// Record a failed tick, leaving the previous report untouched
    pub fn set_error(&self, error: &PluginError) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.error = Some(error.to_string());
    }
}
