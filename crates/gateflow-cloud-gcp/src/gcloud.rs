//! gcloud CLI wrapper
//!
//! Argument construction and output parsing are plain functions so they can
//! be checked without the SDK installed; [`Gcloud`] only runs the process.

use crate::error::{GcpError, Result};
use gateflow_cloud::{ResourceKind, ResourceSpec};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// Name of the gcloud executable for this platform
pub fn default_program() -> &'static str {
    if cfg!(windows) { "gcloud.cmd" } else { "gcloud" }
}

/// gcloud CLI wrapper
#[derive(Debug, Clone)]
pub struct Gcloud {
    program: String,
}

impl Default for Gcloud {
    fn default() -> Self {
        Self::new()
    }
}

impl Gcloud {
    pub fn new() -> Self {
        Self {
            program: default_program().to_string(),
        }
    }

    /// Use a specific executable instead of the one on `PATH`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Active credentialed accounts
    pub async fn active_accounts(&self) -> Result<Vec<AuthAccount>> {
        let output = self
            .run(&[
                "auth".to_string(),
                "list".to_string(),
                "--filter=status:ACTIVE".to_string(),
                "--format=json".to_string(),
            ])
            .await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&output)?)
    }

    /// Run a gcloud command and return stdout
    pub async fn run(&self, args: &[String]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.program, args.join(" "));

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GcpError::GcloudNotFound
            } else {
                GcpError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GcpError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Whether gcloud's stderr reports a conflict with an existing resource
pub fn is_already_exists(stderr: &str) -> bool {
    stderr.contains("ALREADY_EXISTS") || stderr.to_ascii_lowercase().contains("already exists")
}

/// Whether gcloud's stderr reports a missing resource
pub fn is_not_found(stderr: &str) -> bool {
    stderr.contains("NOT_FOUND") || stderr.to_ascii_lowercase().contains("not found")
}

fn param(spec: &ResourceSpec, key: &str) -> Result<String> {
    spec.param(key)
        .map(|v| v.to_string())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GcpError::MissingParameter {
            resource: spec.id.clone(),
            key: key.to_string(),
        })
}

fn flag(name: &str, value: impl std::fmt::Display) -> String {
    format!("--{}={}", name, value)
}

/// `gcloud functions deploy` for an HTTP-triggered function
pub fn function_deploy_args(spec: &ResourceSpec) -> Result<Vec<String>> {
    let mut args = vec![
        "functions".to_string(),
        "deploy".to_string(),
        param(spec, "name")?,
        flag("project", param(spec, "project")?),
        flag("region", param(spec, "region")?),
        flag("runtime", param(spec, "runtime")?),
        flag("entry-point", param(spec, "entry_point")?),
        flag("source", param(spec, "source")?),
        flag("memory", format!("{}MB", param(spec, "memory_mb")?)),
        flag("timeout", format!("{}s", param(spec, "timeout_secs")?)),
        "--trigger-http".to_string(),
    ];
    if spec.param_str("allow_unauthenticated") == Some("true") {
        args.push("--allow-unauthenticated".to_string());
    }
    args.push("--quiet".to_string());
    Ok(args)
}

pub fn api_create_args(spec: &ResourceSpec) -> Result<Vec<String>> {
    Ok(vec![
        "api-gateway".to_string(),
        "apis".to_string(),
        "create".to_string(),
        param(spec, "api_id")?,
        flag("project", param(spec, "project")?),
    ])
}

pub fn api_config_create_args(spec: &ResourceSpec) -> Result<Vec<String>> {
    Ok(vec![
        "api-gateway".to_string(),
        "api-configs".to_string(),
        "create".to_string(),
        param(spec, "config_id")?,
        flag("api", param(spec, "api_id")?),
        flag("openapi-spec", param(spec, "openapi_spec")?),
        flag("project", param(spec, "project")?),
    ])
}

/// Gateways converge in the background, so creation returns immediately
pub fn gateway_create_args(spec: &ResourceSpec) -> Result<Vec<String>> {
    Ok(vec![
        "api-gateway".to_string(),
        "gateways".to_string(),
        "create".to_string(),
        param(spec, "gateway_id")?,
        flag("api", param(spec, "api_id")?),
        flag("api-config", param(spec, "config_id")?),
        flag("location", param(spec, "region")?),
        flag("project", param(spec, "project")?),
        "--async".to_string(),
    ])
}

/// `gcloud services api-keys create`, optionally restricted to one service
pub fn api_key_create_args(
    display_name: &str,
    project: &str,
    api_target: Option<&str>,
) -> Vec<String> {
    let mut args = vec![
        "services".to_string(),
        "api-keys".to_string(),
        "create".to_string(),
        flag("display-name", display_name),
        flag("project", project),
    ];
    if let Some(service) = api_target {
        args.push(flag("api-target", format!("service={}", service)));
    }
    args.push("--format=json".to_string());
    args
}

/// `gcloud services api-keys list` narrowed to one display name
pub fn api_key_list_args(display_name: &str, project: &str) -> Vec<String> {
    vec![
        "services".to_string(),
        "api-keys".to_string(),
        "list".to_string(),
        flag("filter", format!("displayName=\"{}\"", display_name)),
        flag("project", project),
        "--format=json".to_string(),
    ]
}

/// The matching `describe --format=json` command for `spec`
pub fn describe_args(spec: &ResourceSpec) -> Result<Vec<String>> {
    let mut args = match spec.kind {
        ResourceKind::Function => vec![
            "functions".to_string(),
            "describe".to_string(),
            param(spec, "name")?,
            flag("region", param(spec, "region")?),
        ],
        ResourceKind::Api => vec![
            "api-gateway".to_string(),
            "apis".to_string(),
            "describe".to_string(),
            param(spec, "api_id")?,
        ],
        ResourceKind::ApiConfig => vec![
            "api-gateway".to_string(),
            "api-configs".to_string(),
            "describe".to_string(),
            param(spec, "config_id")?,
            flag("api", param(spec, "api_id")?),
        ],
        ResourceKind::Gateway => vec![
            "api-gateway".to_string(),
            "gateways".to_string(),
            "describe".to_string(),
            param(spec, "gateway_id")?,
            flag("location", param(spec, "region")?),
        ],
        ResourceKind::ApiKey => {
            return Err(GcpError::UnexpectedOutput(
                "api keys are looked up with `services api-keys list`".to_string(),
            ));
        }
    };
    args.push(flag("project", param(spec, "project")?));
    args.push("--format=json".to_string());
    Ok(args)
}

/// One entry of `gcloud auth list --format=json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthAccount {
    pub account: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Fields of interest from any `describe --format=json` output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    #[serde(default)]
    pub name: Option<String>,

    /// Gateways, APIs and configs report `state`; 1st gen functions `status`
    #[serde(default, alias = "status")]
    pub state: Option<String>,

    #[serde(default)]
    pub default_hostname: Option<String>,

    #[serde(default)]
    pub managed_service: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub https_trigger: Option<HttpsTrigger>,

    #[serde(default)]
    pub service_config: Option<ServiceConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpsTrigger {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub uri: Option<String>,
}

impl Description {
    pub fn parse(output: &str) -> Result<Self> {
        Ok(serde_json::from_str(output)?)
    }

    /// Invocation URL of a function, whichever generation reported it
    pub fn function_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| self.https_trigger.as_ref().and_then(|t| t.url.clone()))
            .or_else(|| self.service_config.as_ref().and_then(|c| c.uri.clone()))
    }
}

/// One entry of `services api-keys list --format=json` (never the secret)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyInfo {
    /// `projects/<number>/locations/global/keys/<uid>`
    pub name: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,
}

/// Listed keys whose display name is exactly `display_name`
pub fn parse_key_list(output: &str, display_name: &str) -> Result<Vec<ApiKeyInfo>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let keys: Vec<ApiKeyInfo> = serde_json::from_str(output)?;
    Ok(keys
        .into_iter()
        .filter(|key| key.display_name.as_deref() == Some(display_name))
        .collect())
}

/// Extract the secret from `services api-keys create --format=json` output.
///
/// gcloud prints either the key itself or the finished operation wrapping it
/// under `response`.
pub fn parse_key_string(output: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(output)?;
    value
        .get("keyString")
        .or_else(|| value.get("response").and_then(|r| r.get("keyString")))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GcpError::UnexpectedOutput("no keyString in api-keys output".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> ResourceSpec {
        ResourceSpec::new("gateway", ResourceKind::Gateway)
            .with_param("project", "demo-project")
            .with_param("gateway_id", "posts-gateway")
            .with_param("api_id", "posts")
            .with_param("config_id", "posts-config")
            .with_param("region", "us-central1")
    }

    #[test]
    fn test_function_deploy_args() {
        let spec = ResourceSpec::new("function", ResourceKind::Function)
            .with_param("project", "demo-project")
            .with_param("name", "render-post")
            .with_param("region", "europe-west1")
            .with_param("runtime", "python311")
            .with_param("entry_point", "generate_post")
            .with_param("source", ".")
            .with_param("memory_mb", 512u32)
            .with_param("timeout_secs", 120u32)
            .with_param("allow_unauthenticated", true);

        let args = function_deploy_args(&spec).unwrap();
        assert_eq!(&args[..3], &["functions", "deploy", "render-post"]);
        assert!(args.contains(&"--memory=512MB".to_string()));
        assert!(args.contains(&"--timeout=120s".to_string()));
        assert!(args.contains(&"--region=europe-west1".to_string()));
        assert!(args.contains(&"--trigger-http".to_string()));
        assert!(args.contains(&"--allow-unauthenticated".to_string()));
    }

    #[test]
    fn test_gateway_create_is_async() {
        let args = gateway_create_args(&gateway()).unwrap();
        assert_eq!(
            args,
            vec![
                "api-gateway",
                "gateways",
                "create",
                "posts-gateway",
                "--api=posts",
                "--api-config=posts-config",
                "--location=us-central1",
                "--project=demo-project",
                "--async",
            ]
        );
    }

    #[test]
    fn test_missing_parameter() {
        let spec = ResourceSpec::new("api", ResourceKind::Api).with_param("project", "p");
        match api_create_args(&spec) {
            Err(GcpError::MissingParameter { resource, key }) => {
                assert_eq!(resource, "api");
                assert_eq!(key, "api_id");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_describe_args() {
        let args = describe_args(&gateway()).unwrap();
        assert_eq!(args[2], "describe");
        assert!(args.contains(&"--location=us-central1".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--format=json"));

        let key = ResourceSpec::new("key", ResourceKind::ApiKey);
        assert!(describe_args(&key).is_err());
    }

    #[test]
    fn test_api_key_args() {
        let args = api_key_create_args("Posts Admin", "demo-project", Some("posts.apigateway.x"));
        assert!(args.contains(&"--display-name=Posts Admin".to_string()));
        assert!(args.contains(&"--api-target=service=posts.apigateway.x".to_string()));

        let args = api_key_create_args("Posts Client", "demo-project", None);
        assert!(!args.iter().any(|a| a.starts_with("--api-target")));
    }

    #[test]
    fn test_api_key_list_args() {
        let args = api_key_list_args("Posts Admin", "demo-project");
        assert_eq!(args[..3], ["services", "api-keys", "list"]);
        assert!(args.contains(&"--filter=displayName=\"Posts Admin\"".to_string()));
        assert!(args.contains(&"--project=demo-project".to_string()));
    }

    #[test]
    fn test_parse_key_list() {
        let output = r#"[
            {"name": "projects/123/locations/global/keys/k-1", "uid": "k-1", "displayName": "Posts Admin"},
            {"name": "projects/123/locations/global/keys/k-2", "uid": "k-2", "displayName": "Posts Admin (old)"}
        ]"#;
        let keys = parse_key_list(output, "Posts Admin").unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].uid.as_deref(), Some("k-1"));

        assert!(parse_key_list("[]", "Posts Admin").unwrap().is_empty());
        assert!(parse_key_list("", "Posts Admin").unwrap().is_empty());
    }

    #[test]
    fn test_already_exists_detection() {
        assert!(is_already_exists(
            "ERROR: (gcloud.api-gateway.apis.create) ALREADY_EXISTS: Resource 'posts' already exists"
        ));
        assert!(is_already_exists("Resource already exists in the project"));
        assert!(!is_already_exists("PERMISSION_DENIED: caller does not have permission"));
    }

    #[test]
    fn test_parse_gateway_description() {
        let output = r#"{
            "apiConfig": "projects/demo/locations/global/apis/posts/configs/posts-config",
            "defaultHostname": "posts-gateway-abc123.uc.gateway.dev",
            "name": "projects/demo/locations/us-central1/gateways/posts-gateway",
            "state": "ACTIVE"
        }"#;
        let desc = Description::parse(output).unwrap();
        assert_eq!(
            desc.default_hostname.as_deref(),
            Some("posts-gateway-abc123.uc.gateway.dev")
        );
        assert_eq!(desc.state.as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn test_function_url_generations() {
        let gen1 = Description::parse(
            r#"{"status": "ACTIVE", "httpsTrigger": {"url": "https://r-demo.cloudfunctions.net/f"}}"#,
        )
        .unwrap();
        assert_eq!(
            gen1.function_url().as_deref(),
            Some("https://r-demo.cloudfunctions.net/f")
        );
        assert_eq!(gen1.state.as_deref(), Some("ACTIVE"));

        let gen2 =
            Description::parse(r#"{"state": "ACTIVE", "serviceConfig": {"uri": "https://f.run.app"}}"#)
                .unwrap();
        assert_eq!(gen2.function_url().as_deref(), Some("https://f.run.app"));
    }

    #[test]
    fn test_parse_key_string() {
        assert_eq!(
            parse_key_string(r#"{"keyString": "AIza-direct"}"#).unwrap(),
            "AIza-direct"
        );
        assert_eq!(
            parse_key_string(r#"{"done": true, "response": {"keyString": "AIza-op"}}"#).unwrap(),
            "AIza-op"
        );
        assert!(parse_key_string(r#"{"done": true}"#).is_err());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let gcloud = Gcloud::with_program("gateflow-test-no-such-gcloud");
        let err = gcloud.run(&["version".to_string()]).await.unwrap_err();
        assert!(matches!(err, GcpError::GcloudNotFound));
    }
}
