//! Rule engine service: wires the key-value store, rule and audit databases
//! and the message log into per-partition ingest workers.
//!
//! One binary serves both event kinds; [`config::EngineConfig::engine`]
//! selects the rule set, topics and key namespaces.

pub mod app;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod logging;
pub mod worker;
