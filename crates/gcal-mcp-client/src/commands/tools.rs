//! The `tools` command: print the tool catalog.

use gcal_mcp_core::{CatalogOptions, Registry};
use gcal_mcp_server::list_tools_result;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Prints the catalog exactly as `tools/list` reports it.
pub fn print(config: &ClientConfig) -> ClientResult<()> {
    let catalog = catalog_json(&config.catalog_options())?;
    let text = serde_json::to_string_pretty(&catalog)
        .map_err(|e| ClientError::config(format!("failed to render catalog: {}", e)))?;
    println!("{}", text);
    Ok(())
}

/// The `tools/list` result for the given options.
pub fn catalog_json(options: &CatalogOptions) -> ClientResult<Value> {
    let registry = Registry::google_calendar(options)?;
    serde_json::to_value(list_tools_result(&registry))
        .map_err(|e| ClientError::config(format!("failed to render catalog: {}", e)))
}
