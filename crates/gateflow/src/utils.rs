use clap::Args;
use colored::Colorize;
use gateflow_cloud::{
    DeploymentResult, IssuedKey, ResourceGroup, ResourceStatus, Result as CloudResult,
};
use gateflow_config::StackConfig;
use std::path::PathBuf;

/// Stack options shared by every command.
///
/// Precedence: flags, then environment, then the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct StackArgs {
    /// Config file (skips discovery)
    #[arg(long, env = "GATEFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Google Cloud project id
    #[arg(long, env = "GATEFLOW_PROJECT")]
    pub project: Option<String>,

    /// Region for the function and gateway [default: us-central1]
    #[arg(long, env = "GATEFLOW_REGION")]
    pub region: Option<String>,

    /// Function name
    #[arg(long = "function")]
    pub function_name: Option<String>,

    /// Function runtime [default: python311]
    #[arg(long)]
    pub runtime: Option<String>,

    /// Function entry point
    #[arg(long)]
    pub entry_point: Option<String>,

    /// Function source directory [default: .]
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Function memory in MB [default: 256]
    #[arg(long, env = "GATEFLOW_MEMORY")]
    pub memory: Option<u32>,

    /// Function timeout in seconds [default: 60]
    #[arg(long, env = "GATEFLOW_TIMEOUT")]
    pub timeout: Option<u32>,

    /// Allow unauthenticated function invocations
    #[arg(long)]
    pub allow_unauthenticated: bool,

    /// API id
    #[arg(long)]
    pub api: Option<String>,

    /// API config id [default: <api>-config]
    #[arg(long)]
    pub api_config: Option<String>,

    /// Gateway id [default: <api>-gateway]
    #[arg(long)]
    pub gateway: Option<String>,

    /// OpenAPI document for the API config
    #[arg(long, env = "GATEFLOW_OPENAPI_SPEC")]
    pub spec: Option<PathBuf>,
}

impl StackArgs {
    /// Values given on the command line or through the environment
    pub fn overrides(&self) -> StackConfig {
        StackConfig {
            project_id: self.project.clone(),
            region: self.region.clone(),
            function_name: self.function_name.clone(),
            runtime: self.runtime.clone(),
            entry_point: self.entry_point.clone(),
            source_dir: self.source.clone(),
            memory_mb: self.memory,
            timeout_secs: self.timeout,
            allow_unauthenticated: self.allow_unauthenticated.then_some(true),
            api_id: self.api.clone(),
            api_config_id: self.api_config.clone(),
            gateway_id: self.gateway.clone(),
            openapi_spec: self.spec.clone(),
        }
    }

    /// Config file values with command-line overrides applied
    pub fn resolve(&self) -> anyhow::Result<StackConfig> {
        let mut config = match gateflow_config::discover(self.config.as_deref())? {
            Some((path, config)) => {
                tracing::info!(path = %path.display(), "Loaded config file");
                config
            }
            None => {
                tracing::debug!("No config file found; using flags and environment only");
                StackConfig::new()
            }
        };
        config.merge(self.overrides());
        Ok(config)
    }
}

pub fn print_plan(groups: &[ResourceGroup]) {
    for (index, group) in groups.iter().enumerate() {
        println!("{}", format!("Group {}", index + 1).bold());
        for spec in group {
            let deps = if spec.depends_on.is_empty() {
                String::new()
            } else {
                format!(
                    " (after {})",
                    spec.depends_on
                        .iter()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            println!("  • {} [{}]{}", spec.id.cyan(), spec.kind, deps.dimmed());
        }
    }
}

/// One line per resource: id, kind, status and the failure reason if any
pub fn print_status_table(result: &DeploymentResult) {
    println!();
    println!("{}", "Resources:".bold());
    for (id, state) in &result.resource_states {
        let status = match state.status {
            ResourceStatus::Ready => state.status.to_string().green(),
            ResourceStatus::Failed => state.status.to_string().red(),
            ResourceStatus::Pending | ResourceStatus::Creating => {
                state.status.to_string().yellow()
            }
        };
        let detail = match (&state.error, state.outcome) {
            (Some(error), _) => format!("  {}", error),
            (None, Some(outcome)) if state.status == ResourceStatus::Ready => {
                format!("  ({})", outcome)
            }
            _ => String::new(),
        };
        println!(
            "  {:<12} {:<11} {}{}",
            id,
            state.kind.to_string(),
            status,
            detail
        );
    }
    println!();
    println!(
        "Status: {} ({}, {}ms)",
        result.status.to_string().bold(),
        result.summary(),
        result.duration_ms()
    );
}

/// Print issued keys as `display name: value`; returns whether all succeeded
pub fn print_keys(results: &[CloudResult<IssuedKey>]) -> bool {
    println!();
    println!("{}", "API keys:".bold());

    let mut all_ok = true;
    for result in results {
        match result {
            Ok(key) => println!("{}: {}", key.display_name, key.key_value()),
            Err(e) => {
                all_ok = false;
                eprintln!("{} {}", "✗ key creation failed:".red(), e);
            }
        }
    }
    all_ok
}
