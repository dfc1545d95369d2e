//! Layout fixtures, reports and logging setup for the `layout` tool.

pub mod errors;
pub mod logging;
pub mod report;
pub mod spec;
