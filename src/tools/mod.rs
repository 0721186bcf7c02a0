pub mod context;
pub mod envelope;
pub mod params;
pub mod registry;
pub mod threat_actors;
pub mod vulnerabilities;

use registry::{ToolError, ToolRegistry};

/// Registers every tool module. Any failure aborts startup.
pub fn register_all_tools(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    threat_actors::register_tools(registry)?;
    vulnerabilities::register_tools(registry)?;
    Ok(())
}
