//! Application layer orchestrating the dispatch workflow.
//!
//! This module defines the `DispatchEngine`, the single entry point through
//! which ambulances, locations and calls are created, changed and queried. It
//! works only against the storage ports, so any backend can sit behind it.

pub mod engine;
