//! Resource graph builder
//!
//! Turns a [`StackConfig`] (or any list of [`ResourceSpec`]s) into ordered
//! groups where every resource's dependencies live in an earlier group.

use crate::error::{CloudError, Result};
use crate::resource::{ResourceKind, ResourceSpec};
use gateflow_config::StackConfig;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_RUNTIME: &str = "python311";
pub const DEFAULT_MEMORY_MB: u32 = 256;
pub const DEFAULT_TIMEOUT_SECS: u32 = 60;

/// Ids of the resources declared by [`build`]
pub const FUNCTION_ID: &str = "function";
pub const API_ID: &str = "api";
pub const API_CONFIG_ID: &str = "api-config";
pub const GATEWAY_ID: &str = "gateway";

/// Resources whose dependencies are all satisfied by earlier groups
pub type ResourceGroup = Vec<ResourceSpec>;

/// Validated set of resources
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    specs: BTreeMap<String, ResourceSpec>,
}

impl ResourceGraph {
    /// Validate ids and edges.
    ///
    /// Fails on duplicate ids and on dependencies that reference an id not
    /// present in `specs`.
    pub fn new(specs: impl IntoIterator<Item = ResourceSpec>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for spec in specs {
            if spec.id.trim().is_empty() {
                return Err(CloudError::config("resource id must not be empty"));
            }
            if map.contains_key(&spec.id) {
                return Err(CloudError::config(format!(
                    "resource '{}' is declared more than once",
                    spec.id
                )));
            }
            map.insert(spec.id.clone(), spec);
        }

        for spec in map.values() {
            for dep in &spec.depends_on {
                if !map.contains_key(dep) {
                    return Err(CloudError::config(format!(
                        "resource '{}' depends on unknown resource '{}'",
                        spec.id, dep
                    )));
                }
            }
        }

        Ok(Self { specs: map })
    }

    /// Topological layering (Kahn).
    ///
    /// Each group is sorted by id. A cycle leaves resources that can never be
    /// scheduled and is reported as a configuration error.
    pub fn layers(&self) -> Result<Vec<ResourceGroup>> {
        let mut remaining: BTreeMap<&str, BTreeSet<&str>> = self
            .specs
            .values()
            .map(|s| {
                (
                    s.id.as_str(),
                    s.depends_on.iter().map(String::as_str).collect(),
                )
            })
            .collect();

        let mut groups = Vec::new();
        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(id, _)| *id)
                .collect();

            if ready.is_empty() {
                let stuck: Vec<&str> = remaining.keys().copied().collect();
                return Err(CloudError::config(format!(
                    "dependency cycle between resources: {}",
                    stuck.join(", ")
                )));
            }

            for id in &ready {
                remaining.remove(id);
            }
            for deps in remaining.values_mut() {
                for id in &ready {
                    deps.remove(id);
                }
            }

            groups.push(ready.iter().map(|id| self.specs[*id].clone()).collect());
        }

        Ok(groups)
    }
}

/// Validate and layer an arbitrary list of specs
pub fn layer(specs: impl IntoIterator<Item = ResourceSpec>) -> Result<Vec<ResourceGroup>> {
    ResourceGraph::new(specs)?.layers()
}

/// Declare the function + API gateway stack and layer it.
///
/// Layers: `[api, function]`, `[api-config]`, `[gateway]`.
pub fn build(config: &StackConfig) -> Result<Vec<ResourceGroup>> {
    layer(declare(config)?)
}

/// Declare the stack resources without layering them
pub fn declare(config: &StackConfig) -> Result<Vec<ResourceSpec>> {
    let project = required(&config.project_id, "project_id")?;
    let function_name = required(&config.function_name, "function_name")?;
    let entry_point = required(&config.entry_point, "entry_point")?;
    let api_id = required(&config.api_id, "api_id")?;
    let openapi_spec = config
        .openapi_spec
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| CloudError::config("missing required option 'openapi_spec'"))?;

    let region = non_empty_or(&config.region, DEFAULT_REGION);
    let runtime = non_empty_or(&config.runtime, DEFAULT_RUNTIME);
    let api_config_id = config
        .api_config_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("{}-config", api_id));
    let gateway_id = config
        .gateway_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("{}-gateway", api_id));
    let source_dir = config
        .source_dir
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());

    let memory_mb = config.memory_mb.unwrap_or(DEFAULT_MEMORY_MB);
    if memory_mb == 0 {
        return Err(CloudError::config("memory_mb must be greater than zero"));
    }
    let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(CloudError::config("timeout_secs must be greater than zero"));
    }

    let function = ResourceSpec::new(FUNCTION_ID, ResourceKind::Function)
        .with_param("project", project)
        .with_param("name", function_name)
        .with_param("region", region)
        .with_param("runtime", runtime)
        .with_param("entry_point", entry_point)
        .with_param("source", source_dir)
        .with_param("memory_mb", memory_mb)
        .with_param("timeout_secs", timeout_secs)
        .with_param(
            "allow_unauthenticated",
            config.allow_unauthenticated.unwrap_or(false),
        );

    let api = ResourceSpec::new(API_ID, ResourceKind::Api)
        .with_param("project", project)
        .with_param("api_id", api_id);

    let api_config = ResourceSpec::new(API_CONFIG_ID, ResourceKind::ApiConfig)
        .depends_on(API_ID)
        .depends_on(FUNCTION_ID)
        .with_param("project", project)
        .with_param("api_id", api_id)
        .with_param("config_id", api_config_id.as_str())
        .with_param("openapi_spec", openapi_spec.display().to_string());

    let gateway = ResourceSpec::new(GATEWAY_ID, ResourceKind::Gateway)
        .depends_on(API_CONFIG_ID)
        .with_param("project", project)
        .with_param("gateway_id", gateway_id)
        .with_param("api_id", api_id)
        .with_param("config_id", api_config_id)
        .with_param("region", region);

    Ok(vec![function, api, api_config, gateway])
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CloudError::config(format!("missing required option '{}'", name)))
}

fn non_empty_or<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}
