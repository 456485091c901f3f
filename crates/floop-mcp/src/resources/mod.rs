//! MCP Resources
//!
//! Read-only URIs a host tool can fetch without an explicit tool call
//! (spec §6 resource surface).

pub mod behaviors;
