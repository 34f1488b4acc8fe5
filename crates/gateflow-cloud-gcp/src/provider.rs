//! Google Cloud provider implementation

use crate::error::GcpError;
use crate::gcloud::{
    ApiKeyInfo, Description, Gcloud, api_config_create_args, api_create_args,
    api_key_create_args, api_key_list_args, describe_args, function_deploy_args,
    gateway_create_args, is_already_exists, is_not_found, parse_key_list, parse_key_string,
};
use async_trait::async_trait;
use gateflow_cloud::{
    AuthStatus, CloudError, CloudProvider, CreateOutcome, ResourceDescriptor, ResourceKind,
    ResourceSpec, Result,
};

/// Google Cloud provider driving the `gcloud` CLI
pub struct GcpProvider {
    gcloud: Gcloud,
    project: String,
    api_target: Option<String>,
}

impl GcpProvider {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            gcloud: Gcloud::new(),
            project: project.into(),
            api_target: None,
        }
    }

    pub fn with_gcloud(mut self, gcloud: Gcloud) -> Self {
        self.gcloud = gcloud;
        self
    }

    /// Restrict minted keys to one managed service
    pub fn with_api_target(mut self, service: impl Into<String>) -> Self {
        self.api_target = Some(service.into());
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Run a create command, folding "already exists" into the outcome
    async fn run_create(&self, spec: &ResourceSpec, args: Vec<String>) -> Result<CreateOutcome> {
        match self.gcloud.run(&args).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(GcpError::CommandFailed(stderr)) if is_already_exists(&stderr) => {
                tracing::debug!(resource = %spec.id, "gcloud reported existing resource");
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Keys already carrying `display_name` in this project
    async fn find_keys(&self, display_name: &str) -> Result<Vec<ApiKeyInfo>> {
        let output = self
            .gcloud
            .run(&api_key_list_args(display_name, &self.project))
            .await?;
        Ok(parse_key_list(&output, display_name)?)
    }
}

/// Display name of an `ApiKey` node; the id when none is given
fn key_display_name(spec: &ResourceSpec) -> &str {
    spec.param_str("display_name").unwrap_or(&spec.id)
}

fn key_descriptor(spec: &ResourceSpec, key: ApiKeyInfo) -> ResourceDescriptor {
    let mut descriptor = ResourceDescriptor::new(spec.id.clone(), spec.kind)
        .with_state("ACTIVE")
        .with_attribute("name", serde_json::json!(key.name));
    if let Some(uid) = key.uid {
        descriptor = descriptor.with_attribute("uid", serde_json::json!(uid));
    }
    descriptor
}

fn descriptor_from(spec: &ResourceSpec, desc: Description) -> ResourceDescriptor {
    let mut descriptor = ResourceDescriptor::new(spec.id.clone(), spec.kind);

    if let Some(url) = desc.function_url() {
        descriptor = descriptor.with_attribute("url", serde_json::json!(url));
    }
    if let Some(state) = desc.state {
        descriptor = descriptor.with_state(state);
    }
    if let Some(hostname) = desc.default_hostname {
        descriptor = descriptor.with_hostname(hostname);
    }
    if let Some(service) = desc.managed_service {
        descriptor = descriptor.with_attribute("managed_service", serde_json::json!(service));
    }
    if let Some(name) = desc.name {
        descriptor = descriptor.with_attribute("name", serde_json::json!(name));
    }
    descriptor
}

#[async_trait]
impl CloudProvider for GcpProvider {
    fn name(&self) -> &str {
        "gcp"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        match self.gcloud.active_accounts().await {
            Ok(accounts) => match accounts.first() {
                Some(account) => Ok(AuthStatus::ok(account.account.clone())),
                None => Ok(AuthStatus::failed(
                    "no active gcloud account; run `gcloud auth login`",
                )),
            },
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<CreateOutcome> {
        match spec.kind {
            // `functions deploy` updates in place
            ResourceKind::Function => {
                self.gcloud.run(&function_deploy_args(spec)?).await?;
                Ok(CreateOutcome::Created)
            }
            ResourceKind::Api => self.run_create(spec, api_create_args(spec)?).await,
            ResourceKind::ApiConfig => self.run_create(spec, api_config_create_args(spec)?).await,
            ResourceKind::Gateway => self.run_create(spec, gateway_create_args(spec)?).await,
            // Display names identify graph keys; the secret is only handed
            // out through `create_key`
            ResourceKind::ApiKey => {
                let display_name = key_display_name(spec);
                if !self.find_keys(display_name).await?.is_empty() {
                    tracing::debug!(resource = %spec.id, "api key already exists");
                    return Ok(CreateOutcome::AlreadyExists);
                }
                self.create_key(display_name).await?;
                Ok(CreateOutcome::Created)
            }
        }
    }

    async fn describe(&self, spec: &ResourceSpec) -> Result<ResourceDescriptor> {
        if spec.kind == ResourceKind::ApiKey {
            let key = self
                .find_keys(key_display_name(spec))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| CloudError::ResourceNotFound(spec.id.clone()))?;
            return Ok(key_descriptor(spec, key));
        }

        let output = match self.gcloud.run(&describe_args(spec)?).await {
            Ok(output) => output,
            Err(GcpError::CommandFailed(stderr)) if is_not_found(&stderr) => {
                return Err(CloudError::ResourceNotFound(spec.id.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let desc = Description::parse(&output).map_err(CloudError::from)?;
        Ok(descriptor_from(spec, desc))
    }

    async fn create_key(&self, display_name: &str) -> Result<String> {
        let args = api_key_create_args(display_name, &self.project, self.api_target.as_deref());
        let output = self.gcloud.run(&args).await?;
        Ok(parse_key_string(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_gateway() {
        let spec = ResourceSpec::new("gateway", ResourceKind::Gateway);
        let desc = Description::parse(
            r#"{"state": "ACTIVE", "defaultHostname": "gw-1.uc.gateway.dev"}"#,
        )
        .unwrap();

        let descriptor = descriptor_from(&spec, desc);
        assert!(descriptor.is_ready());
        assert_eq!(descriptor.hostname.as_deref(), Some("gw-1.uc.gateway.dev"));
        assert_eq!(descriptor.state.as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn test_descriptor_from_creating_gateway() {
        let spec = ResourceSpec::new("gateway", ResourceKind::Gateway);
        let desc = Description::parse(r#"{"state": "CREATING"}"#).unwrap();
        assert!(!descriptor_from(&spec, desc).is_ready());
    }

    #[test]
    fn test_descriptor_surfaces_managed_service() {
        let spec = ResourceSpec::new("api", ResourceKind::Api);
        let desc = Description::parse(
            r#"{"state": "ACTIVE", "managedService": "posts-0abc.apigateway.demo.cloud.goog"}"#,
        )
        .unwrap();
        let descriptor = descriptor_from(&spec, desc);
        assert_eq!(
            descriptor.get_attribute::<String>("managed_service").as_deref(),
            Some("posts-0abc.apigateway.demo.cloud.goog")
        );
    }

    #[tokio::test]
    async fn test_missing_gcloud_is_reported() {
        let provider = GcpProvider::new("demo-project")
            .with_gcloud(Gcloud::with_program("gateflow-test-no-such-gcloud"));

        let auth = provider.check_auth().await.unwrap();
        assert!(!auth.authenticated);
        assert!(auth.error.unwrap().contains("gcloud not found"));

        let err = provider.create_key("Posts Admin").await.unwrap_err();
        assert!(matches!(err, CloudError::CommandFailed(_)));
    }

    /// Stand-in gcloud that remembers created keys next to itself
    #[cfg(unix)]
    fn fake_gcloud(dir: &std::path::Path) -> Gcloud {
        use std::os::unix::fs::PermissionsExt;

        let script = r#"#!/bin/sh
dir=$(dirname "$0")
case "$3" in
  list)
    if [ -f "$dir/created" ]; then
      echo '[{"name": "projects/123/locations/global/keys/k-1", "uid": "k-1", "displayName": "Ops Admin"}]'
    else
      echo '[]'
    fi
    ;;
  create)
    echo created >> "$dir/created"
    echo '{"done": true, "response": {"keyString": "AIza-test"}}'
    ;;
  *)
    echo "ERROR: unexpected command: $*" >&2
    exit 1
    ;;
esac
"#;
        let path = dir.join("gcloud");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Gcloud::with_program(path.to_string_lossy())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_api_key_node_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let provider = GcpProvider::new("demo-project").with_gcloud(fake_gcloud(dir.path()));
        let spec = ResourceSpec::new("ops-key", ResourceKind::ApiKey)
            .with_param("display_name", "Ops Admin");

        assert!(matches!(
            provider.describe(&spec).await,
            Err(CloudError::ResourceNotFound(_))
        ));
        assert_eq!(provider.create(&spec).await.unwrap(), CreateOutcome::Created);
        assert_eq!(
            provider.create(&spec).await.unwrap(),
            CreateOutcome::AlreadyExists
        );

        let created = std::fs::read_to_string(dir.path().join("created")).unwrap();
        assert_eq!(created.lines().count(), 1);

        let descriptor = provider.describe(&spec).await.unwrap();
        assert_eq!(descriptor.get_attribute::<String>("uid").as_deref(), Some("k-1"));
        assert_eq!(
            descriptor.get_attribute::<String>("name").as_deref(),
            Some("projects/123/locations/global/keys/k-1")
        );
        assert!(descriptor.get_attribute::<String>("keyString").is_none());
    }

    #[tokio::test]
    async fn test_missing_parameter_fails_before_running() {
        let provider = GcpProvider::new("demo-project")
            .with_gcloud(Gcloud::with_program("gateflow-test-no-such-gcloud"));
        let spec = ResourceSpec::new("api", ResourceKind::Api);

        let err = provider.create(&spec).await.unwrap_err();
        assert!(matches!(err, CloudError::Configuration(_)));
    }
}
