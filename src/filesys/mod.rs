//! Filesystem module

pub mod file;
