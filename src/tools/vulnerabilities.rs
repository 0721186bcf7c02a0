//! Vulnerability lookups and their sub-resources.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::context::ToolContext;
use super::params::{
    default_limit, default_order_desc, default_sort_created_at, list_query, non_blank,
    require_identifier, require_min_limit,
};
use super::registry::{ToolBuilder, ToolError, ToolRegistry, Validate};

pub fn register_tools(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    registry.register(
        ToolBuilder::new("find_vulnerability")
            .description("Finds a vulnerability by its CVE identifier (e.g. 'CVE-2024-3400').")
            .build(find_vulnerability),
    )?;
    registry.register(
        ToolBuilder::new("get_vulnerabilities")
            .description(
                "Lists vulnerabilities with optional filtering, pagination and sorting. \
                 Returns {total, offset, limit, message, data}.",
            )
            .build(get_vulnerabilities),
    )?;
    registry.register(
        ToolBuilder::new("get_mentioned_vulnerabilities")
            .description(
                "Retrieves recent mentions of vulnerabilities in news, blogs and reports, \
                 paginated and sorted.",
            )
            .build(get_mentioned_vulnerabilities),
    )?;
    registry.register(
        ToolBuilder::new("get_vulnerability_detection_signatures")
            .description(
                "Retrieves detection signatures (e.g. Nuclei, Sigma, Snort rules) for a vulnerability.",
            )
            .build(get_vulnerability_detection_signatures),
    )?;
    registry.register(
        ToolBuilder::new("get_vulnerability_exploitations")
            .description("Retrieves recorded in-the-wild exploitation events for a vulnerability.")
            .build(get_vulnerability_exploitations),
    )?;
    registry.register(
        ToolBuilder::new("get_vulnerability_configurations")
            .description(
                "Retrieves the affected product configurations (CPE) of a vulnerability.",
            )
            .build(get_vulnerability_configurations),
    )?;
    Ok(())
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FindVulnerabilityParams {
    #[schemars(description = "The CVE to search for")]
    pub cve: String,
}

impl Validate for FindVulnerabilityParams {
    fn validate(&self) -> Result<(), String> {
        require_identifier("cve", &self.cve)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetVulnerabilitiesParams {
    #[serde(default)]
    #[schemars(description = "Search filter passed to the API as-is. Empty for no filter.")]
    pub filter: String,
    #[serde(default)]
    #[schemars(description = "Number of records to skip (default: 0)")]
    pub offset: u32,
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1), description = "Maximum number of records to return (default: 10)")]
    pub limit: u32,
    #[serde(default = "default_sort_created_at")]
    #[schemars(description = "Field to sort by: 'created_at' or 'updated_at' (default: 'created_at')")]
    pub sort: String,
    #[serde(default = "default_order_desc")]
    #[schemars(description = "Sort order: 'asc' or 'desc' (default: 'desc')")]
    pub order: String,
}

impl Validate for GetVulnerabilitiesParams {
    fn validate(&self) -> Result<(), String> {
        require_min_limit(self.limit)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetMentionedVulnerabilitiesParams {
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

impl Validate for GetMentionedVulnerabilitiesParams {
    fn validate(&self) -> Result<(), String> {
        require_min_limit(self.limit)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VulnerabilityIdentifierParams {
    #[schemars(description = "The vulnerability's CVE identifier or UUID")]
    pub identifier: String,
}

impl Validate for VulnerabilityIdentifierParams {
    fn validate(&self) -> Result<(), String> {
        require_identifier("identifier", &self.identifier)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetVulnerabilityExploitationsParams {
    #[schemars(description = "The vulnerability's CVE identifier or UUID")]
    pub identifier: String,
    #[serde(default)]
    #[schemars(description = "Number of records to skip (default: 0)")]
    pub offset: u32,
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1), description = "Maximum number of records to return (default: 10)")]
    pub limit: u32,
    #[serde(default = "default_sort_created_at")]
    #[schemars(description = "Field to sort by (default: 'created_at')")]
    pub sort: String,
    #[serde(default = "default_order_desc")]
    #[schemars(description = "Sort order: 'asc' or 'desc' (default: 'desc')")]
    pub order: String,
}

impl Validate for GetVulnerabilityExploitationsParams {
    fn validate(&self) -> Result<(), String> {
        require_identifier("identifier", &self.identifier)?;
        require_min_limit(self.limit)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetVulnerabilityConfigurationsParams {
    #[schemars(description = "The vulnerability's CVE identifier or UUID")]
    pub identifier: String,
    #[serde(default)]
    #[schemars(description = "Number of records to skip (default: 0)")]
    pub offset: u32,
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1), description = "Maximum number of records to return (default: 10)")]
    pub limit: u32,
}

impl Validate for GetVulnerabilityConfigurationsParams {
    fn validate(&self) -> Result<(), String> {
        require_identifier("identifier", &self.identifier)?;
        require_min_limit(self.limit)
    }
}

async fn find_vulnerability(
    ctx: ToolContext,
    params: FindVulnerabilityParams,
) -> anyhow::Result<Value> {
    let cve = params.cve.trim();
    tracing::info!(cve, "Finding vulnerability");
    Ok(ctx.client.get_vulnerability(cve).await?)
}

async fn get_vulnerabilities(
    ctx: ToolContext,
    params: GetVulnerabilitiesParams,
) -> anyhow::Result<Value> {
    let query = list_query(
        non_blank(&params.filter),
        params.offset,
        params.limit,
        Some(params.sort.as_str()),
        Some(params.order.as_str()),
    );
    tracing::info!(filter = ?query.filter, limit = query.limit, "Listing vulnerabilities");
    Ok(ctx.client.list_vulnerabilities(&query).await?)
}

async fn get_mentioned_vulnerabilities(
    ctx: ToolContext,
    params: GetMentionedVulnerabilitiesParams,
) -> anyhow::Result<Value> {
    let query = list_query(
        None,
        params.offset,
        params.limit,
        Some(params.sort.as_str()),
        Some(params.order.as_str()),
    );
    tracing::info!(limit = query.limit, "Retrieving vulnerability mentions");
    Ok(ctx.client.list_mentioned_vulnerabilities(&query).await?)
}

async fn get_vulnerability_detection_signatures(
    ctx: ToolContext,
    params: VulnerabilityIdentifierParams,
) -> anyhow::Result<Value> {
    let identifier = params.identifier.trim();
    tracing::info!(identifier, "Retrieving detection signatures");
    Ok(ctx
        .client
        .get_vulnerability_detection_signatures(identifier)
        .await?)
}

async fn get_vulnerability_exploitations(
    ctx: ToolContext,
    params: GetVulnerabilityExploitationsParams,
) -> anyhow::Result<Value> {
    let identifier = params.identifier.trim();
    let query = list_query(
        None,
        params.offset,
        params.limit,
        Some(params.sort.as_str()),
        Some(params.order.as_str()),
    );
    tracing::info!(identifier, limit = query.limit, "Retrieving exploitations");
    Ok(ctx
        .client
        .get_vulnerability_exploitations(identifier, &query)
        .await?)
}

async fn get_vulnerability_configurations(
    ctx: ToolContext,
    params: GetVulnerabilityConfigurationsParams,
) -> anyhow::Result<Value> {
    let identifier = params.identifier.trim();
    let query = list_query(None, params.offset, params.limit, None, None);
    tracing::info!(identifier, limit = query.limit, "Retrieving configurations");
    Ok(ctx
        .client
        .get_vulnerability_configurations(identifier, &query)
        .await?)
}
