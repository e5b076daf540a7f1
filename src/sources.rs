use anyhow::Result;

use crate::traits::AdapterRegistry;

pub fn list_sources(registry: &AdapterRegistry) -> Result<()> {
    if registry.is_empty() {
        println!("No sources configured.");
        println!("Add an [adapters.grants_gov] or [adapters.agency.<name>] section to callboard.toml.");
        return Ok(());
    }

    println!("{:<20} DESCRIPTION", "SOURCE");
    for adapter in registry.adapters() {
        println!("{:<20} {}", adapter.name(), adapter.description());
    }

    Ok(())
}
