//! Command implementations for the stackup CLI

pub mod completions;
pub mod plan;
pub mod resolve;
pub mod run;
pub mod version;
