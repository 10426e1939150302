//! CLI command modules.

pub mod address;
pub mod config;
pub mod peers;
pub mod service;
pub mod table;
