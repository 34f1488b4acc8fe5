use crate::utils::{self, StackArgs};
use clap::Args;
use colored::Colorize;
use gateflow_cloud::graph::API_ID;
use gateflow_cloud::{
    CloudProvider, KeyIssuer, KeyRequest, MemoryProvider, ResourceKind, ResourceSpec,
};
use gateflow_cloud_gcp::GcpProvider;

#[derive(Args, Debug)]
pub struct CreateKeysArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Key to create as NAME:SCOPE (admin, client or development); repeatable
    #[arg(long = "key", value_name = "NAME:SCOPE")]
    pub keys: Vec<KeyRequest>,

    /// Display name prefix for the default admin/client/development keys
    #[arg(long)]
    pub prefix: Option<String>,

    /// Do not restrict keys to the API's managed service
    #[arg(long)]
    pub unrestricted: bool,

    /// Use the in-memory provider instead of gcloud
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle(args: CreateKeysArgs) -> anyhow::Result<bool> {
    let config = args.stack.resolve()?;
    let project = config
        .project_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow::anyhow!("missing required option 'project_id' (--project)"))?;

    let requests = if args.keys.is_empty() {
        let prefix = args
            .prefix
            .clone()
            .or_else(|| config.api_id.clone())
            .unwrap_or_else(|| "gateflow".to_string());
        KeyRequest::default_set(&prefix)
    } else {
        args.keys.clone()
    };

    let all_ok = if args.dry_run {
        issue(&MemoryProvider::new(), &requests).await
    } else {
        let mut provider = GcpProvider::new(project);
        if let Some(api_id) = config.api_id.as_deref().filter(|_| !args.unrestricted) {
            let api = ResourceSpec::new(API_ID, ResourceKind::Api)
                .with_param("project", project)
                .with_param("api_id", api_id);
            if let Some(service) = managed_service(&provider, &api).await {
                provider = provider.with_api_target(service);
            }
        }
        issue(&provider, &requests).await
    };

    Ok(all_ok)
}

/// Mint `requests` and print them; returns whether every key was created
pub(crate) async fn issue(provider: &dyn CloudProvider, requests: &[KeyRequest]) -> bool {
    println!(
        "{}",
        format!("Creating {} API key(s)...", requests.len()).blue()
    );
    let results = KeyIssuer::new(provider).issue_keys(requests).await;
    utils::print_keys(&results)
}

/// The managed service name of a deployed API, used to restrict keys
pub(crate) async fn managed_service(
    provider: &dyn CloudProvider,
    api: &ResourceSpec,
) -> Option<String> {
    match provider.describe(api).await {
        Ok(descriptor) => {
            let service = descriptor.get_attribute::<String>("managed_service");
            if service.is_none() {
                tracing::warn!(
                    api = %api.id,
                    "API reports no managed service; keys stay unrestricted"
                );
            }
            service
        }
        Err(e) => {
            tracing::warn!(api = %api.id, "Could not describe API; keys stay unrestricted: {}", e);
            None
        }
    }
}
