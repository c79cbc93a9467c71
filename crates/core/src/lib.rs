// Core functionality for the Fabric MCP server: locating and driving the
// external engines, fetching input, and reporting environment health

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fabric;
pub mod fetch;
pub mod resolver;
pub mod runner;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{FabricError, FabricResult};
pub use fabric::Fabric;
