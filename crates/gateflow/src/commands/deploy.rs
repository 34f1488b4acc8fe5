use crate::commands::create_keys::{issue, managed_service};
use crate::utils::{self, StackArgs};
use clap::Args;
use colored::Colorize;
use gateflow_cloud::graph::API_ID;
use gateflow_cloud::{
    CloudProvider, DEFAULT_CONCURRENCY, KeyRequest, MemoryProvider, Orchestrator, PollConfig,
};
use gateflow_cloud_gcp::GcpProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Maximum concurrent provider calls within a group
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Seconds to wait for the gateway to become ready
    #[arg(long, default_value_t = 600)]
    pub wait_timeout: u64,

    /// Run against an in-memory provider; nothing is created in the cloud
    #[arg(long)]
    pub dry_run: bool,

    /// Skip API key creation after a successful deployment
    #[arg(long)]
    pub no_keys: bool,

    /// Display name prefix for the default keys [default: <api>]
    #[arg(long)]
    pub key_prefix: Option<String>,
}

pub async fn handle(args: DeployArgs, cancel: CancellationToken) -> anyhow::Result<bool> {
    let config = args.stack.resolve()?;

    // Validation happens here, before any provider call
    let groups = gateflow_cloud::build(&config)?;
    let project = config.project_id.clone().unwrap_or_default();
    let api_id = config.api_id.clone().unwrap_or_default();

    let (provider, gcp): (Arc<dyn CloudProvider>, Option<Arc<GcpProvider>>) = if args.dry_run {
        println!("{}", "Dry run: using the in-memory provider".yellow());
        (Arc::new(MemoryProvider::new()), None)
    } else {
        let gcp = Arc::new(GcpProvider::new(project.as_str()));
        (gcp.clone(), Some(gcp))
    };

    let auth = provider.check_auth().await?;
    if !auth.authenticated {
        anyhow::bail!(
            "{} is not authenticated: {}",
            provider.name(),
            auth.error.unwrap_or_default()
        );
    }
    tracing::info!(
        account = auth.account_info.as_deref().unwrap_or("unknown"),
        "Authenticated"
    );

    println!(
        "{}",
        format!(
            "Deploying {} to project {} ({} groups)...",
            api_id,
            project,
            groups.len()
        )
        .blue()
    );

    let poll = PollConfig::default().with_timeout(Duration::from_secs(args.wait_timeout));
    let result = Orchestrator::new(provider.clone())
        .with_concurrency(args.concurrency)
        .with_poll_config(poll)
        .with_cancellation(cancel)
        .apply(&groups)
        .await;

    utils::print_status_table(&result);

    if !result.is_success() {
        if result.cancelled {
            eprintln!("{}", "Deployment interrupted; re-run to resume.".yellow());
        } else {
            eprintln!(
                "{}",
                "Deployment did not complete; re-run to resume.".red().bold()
            );
        }
        return Ok(false);
    }

    match &result.endpoint {
        Some(endpoint) => println!("{} {}", "Endpoint:".green().bold(), endpoint),
        None => println!("{}", "Deployment succeeded but no endpoint was reported".yellow()),
    }

    if args.no_keys {
        return Ok(true);
    }

    let prefix = args.key_prefix.clone().unwrap_or_else(|| api_id.clone());
    let requests = KeyRequest::default_set(&prefix);

    let keys_ok = match gcp {
        Some(gcp) => {
            let api = groups
                .iter()
                .flatten()
                .find(|spec| spec.id == API_ID)
                .cloned();
            let mut key_provider = GcpProvider::new(gcp.project());
            if let Some(api) = api
                && let Some(service) = managed_service(gcp.as_ref(), &api).await
            {
                key_provider = key_provider.with_api_target(service);
            }
            issue(&key_provider, &requests).await
        }
        None => issue(provider.as_ref(), &requests).await,
    };

    Ok(keys_ok)
}
