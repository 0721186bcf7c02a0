use std::sync::Arc;

use crate::mallory::client::IntelligenceApi;

/// State handed to every tool invocation. Built once at startup.
#[derive(Clone)]
pub struct ToolContext {
    pub client: Arc<dyn IntelligenceApi>,
}

impl ToolContext {
    pub fn new(client: Arc<dyn IntelligenceApi>) -> Self {
        Self { client }
    }
}
