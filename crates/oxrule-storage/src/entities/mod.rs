pub mod audit_log;
pub mod rule;
pub mod service;
