//! # MCP Server for Mallory
//!
//! This library provides an MCP (Model Context Protocol) server implementation
//! for the Mallory threat intelligence platform. It allows AI models and
//! automation scripts to look up threat actors and vulnerabilities through a
//! standardized protocol.
//!
//! ## Features
//!
//! - Look up threat actors by UUID or name, list them, and list recent mentions
//! - Look up vulnerabilities by CVE, list them, and list recent mentions
//! - Fetch detection signatures, exploitation records and affected
//!   configurations of a vulnerability
//! - Upstream failures are returned as a small structured error envelope
//!   (`authentication_error`, `api_error`, `general_error`) instead of
//!   failing the call
//!
//! ## Usage
//!
//! The server is typically run as a standalone binary that communicates
//! over stdio with MCP clients.

pub mod logging;
pub mod mallory;
pub mod server;
pub mod settings;
pub mod tools;

pub use mallory::{
    client::{IntelligenceApi, ListQuery, MalloryClient},
    error::MalloryApiError,
};
pub use server::MalloryToolsServer;
pub use settings::Settings;
pub use tools::{
    context::ToolContext,
    envelope::{ErrorEnvelope, ToolOutput},
    registry::{InvocationRequest, ToolError, ToolRegistry},
};
