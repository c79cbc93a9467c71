// MCP (Model Context Protocol) server exposing Fabric patterns as tools
// to agent clients (Claude Desktop, IDE assistants, etc.)

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
pub use tools::{build_registry, ToolRegistry};
