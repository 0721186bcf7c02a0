//! Threat actor lookups.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::context::ToolContext;
use super::params::{
    default_limit, default_order_asc, default_order_desc, default_sort_created_at,
    default_sort_name, list_query, require_identifier, require_min_limit,
};
use super::registry::{ToolBuilder, ToolError, ToolRegistry, Validate};

const FILTER_PREFIXES: [&str; 2] = ["name:", "uuid:"];

pub fn register_tools(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    registry.register(
        ToolBuilder::new("get_threat_actor")
            .description(
                "Retrieves a threat actor by identifier (UUID or name, e.g. 'dark_cloud_shield'). \
                 Returns the full actor record including its mentions.",
            )
            .build(get_threat_actor),
    )?;
    registry.register(
        ToolBuilder::new("list_threat_actors")
            .description(
                "Lists threat actors with optional filtering, pagination and sorting. \
                 Returns {total, offset, limit, message, data}.",
            )
            .build(list_threat_actors),
    )?;
    registry.register(
        ToolBuilder::new("get_mentioned_threat_actors")
            .description(
                "Retrieves recent mentions of threat actors in news, blogs and reports, \
                 paginated and sorted.",
            )
            .build(get_mentioned_threat_actors),
    )?;
    Ok(())
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetThreatActorParams {
    #[schemars(description = "The identifier of the threat actor: its UUID or its name")]
    pub identifier: String,
}

impl Validate for GetThreatActorParams {
    fn validate(&self) -> Result<(), String> {
        require_identifier("identifier", &self.identifier)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListThreatActorsParams {
    #[serde(default)]
    #[schemars(
        description = "Filter prefixed with 'name:' or 'uuid:'. Without a prefix the value is matched against names. Empty for no filter."
    )]
    pub filter: String,
    #[serde(default)]
    #[schemars(description = "Number of records to skip (default: 0)")]
    pub offset: u32,
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1), description = "Maximum number of records to return (default: 10)")]
    pub limit: u32,
    #[serde(default = "default_sort_name")]
    #[schemars(description = "Field to sort by: 'name', 'created_at' or 'updated_at' (default: 'name')")]
    pub sort: String,
    #[serde(default = "default_order_asc")]
    #[schemars(description = "Sort order: 'asc' or 'desc' (default: 'asc')")]
    pub order: String,
}

impl Validate for ListThreatActorsParams {
    fn validate(&self) -> Result<(), String> {
        require_min_limit(self.limit)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetMentionedThreatActorsParams {
    #[serde(default)]
    #[schemars(description = "Number of mentions to skip (default: 0)")]
    pub offset: u32,
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1), description = "Maximum number of mentions to return (default: 10)")]
    pub limit: u32,
    #[serde(default = "default_sort_created_at")]
    #[schemars(description = "Field to sort by (default: 'created_at')")]
    pub sort: String,
    #[serde(default = "default_order_desc")]
    #[schemars(description = "Sort order: 'asc' or 'desc' (default: 'desc')")]
    pub order: String,
}

impl Validate for GetMentionedThreatActorsParams {
    fn validate(&self) -> Result<(), String> {
        require_min_limit(self.limit)
    }
}

/// Empty stays empty, `name:`/`uuid:` pass through, anything else is a name filter.
pub fn normalize_actor_filter(filter: &str) -> Option<String> {
    let filter = filter.trim();
    if filter.is_empty() {
        return None;
    }
    if FILTER_PREFIXES.iter().any(|prefix| filter.starts_with(prefix)) {
        Some(filter.to_string())
    } else {
        Some(format!("name:{}", filter))
    }
}

async fn get_threat_actor(ctx: ToolContext, params: GetThreatActorParams) -> anyhow::Result<Value> {
    let identifier = params.identifier.trim();
    tracing::info!(identifier, "Retrieving threat actor");
    Ok(ctx.client.get_threat_actor(identifier).await?)
}

async fn list_threat_actors(
    ctx: ToolContext,
    params: ListThreatActorsParams,
) -> anyhow::Result<Value> {
    let query = list_query(
        normalize_actor_filter(&params.filter),
        params.offset,
        params.limit,
        Some(params.sort.as_str()),
        Some(params.order.as_str()),
    );
    tracing::info!(filter = ?query.filter, limit = query.limit, "Listing threat actors");
    Ok(ctx.client.list_threat_actors(&query).await?)
}

async fn get_mentioned_threat_actors(
    ctx: ToolContext,
    params: GetMentionedThreatActorsParams,
) -> anyhow::Result<Value> {
    let query = list_query(
        None,
        params.offset,
        params.limit,
        Some(params.sort.as_str()),
        Some(params.order.as_str()),
    );
    tracing::info!(limit = query.limit, "Retrieving threat actor mentions");
    Ok(ctx.client.list_mentioned_threat_actors(&query).await?)
}
