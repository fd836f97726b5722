//! Shared pieces of the fslog CLI

pub mod output;
pub mod system_config;
