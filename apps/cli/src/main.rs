//! grantwell operator CLI.
//!
//! One-shot lifecycle commands against a permission grant directory. Stands
//! in for the orchestrator that would normally drive the service: reads a
//! desired-state JSON file, validates it once, and runs a single operation.

#![forbid(unsafe_code)]

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use grantwell_application::{PermissionGrantDirectory, PermissionGrantService};
use grantwell_core::{ApplicationObjectId, GrantError, GrantResult};
use grantwell_domain::{
    ClientId, GrantConfiguration, GrantConfigurationInput, GrantKey, PermissionGrant, ResourceId,
};
use grantwell_infrastructure::{
    AccessTokenProvider, ClientCredentialsTokenProvider, GraphGrantDirectory,
    InMemoryGrantDirectory, StaticTokenProvider,
};

const USAGE: &str = "usage: grantwell <command> [arguments]

commands:
  apply <grant.json>                           create the configured grant
  replace <grant.json>                         delete existing grants, then recreate
  read <object_id> <client_id> <resource_id>   read one grant by identity
  list <object_id>                             list the application's grants
  destroy <object_id>                          delete the application's grants";

#[derive(Debug, Clone)]
struct CliConfig {
    provider: DirectoryProviderConfig,
}

#[derive(Debug, Clone)]
enum DirectoryProviderConfig {
    Memory,
    Graph(GraphRuntimeConfig),
}

#[derive(Debug, Clone)]
struct GraphRuntimeConfig {
    tenant_id: String,
    base_url: String,
    login_url: String,
    timeout_secs: u64,
    credentials: GraphCredentials,
}

#[derive(Debug, Clone)]
enum GraphCredentials {
    StaticToken(String),
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
}

/// Desired-state file shape: raw strings, validated by the domain boundary.
#[derive(Debug, Deserialize)]
struct GrantFile {
    client_id: String,
    object_id: String,
    resource_id: String,
    consent_type: String,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    expiry_time: Option<String>,
}

impl From<GrantFile> for GrantConfigurationInput {
    fn from(file: GrantFile) -> Self {
        Self {
            client_id: file.client_id,
            object_id: file.object_id,
            resource_id: file.resource_id,
            consent_type: file.consent_type,
            scope: file.scope,
            start_time: file.start_time,
            expiry_time: file.expiry_time,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), GrantError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let arguments: Vec<String> = env::args().skip(1).collect();
    let Some(command) = arguments.first() else {
        eprintln!("{USAGE}");
        return Err(GrantError::Validation("missing command".to_owned()));
    };

    let config = CliConfig::load()?;
    let service = build_service(&config)?;

    match command.as_str() {
        "apply" => {
            let desired = load_grant_file(required_argument(&arguments, 1, "grant file path")?)?;
            let grant = service.create(&desired).await?;
            info!(object_id = %grant.object_id, "permission grant created");
            print_grant(&grant)
        }
        "replace" => {
            let desired = load_grant_file(required_argument(&arguments, 1, "grant file path")?)?;
            let grant = service.replace(&desired).await?;
            info!(object_id = %grant.object_id, "permission grants replaced");
            print_grant(&grant)
        }
        "read" => {
            let key = grant_key_from(&arguments)?;
            let grant = service.read(&key).await?;
            print_grant(&grant)
        }
        "list" => {
            let object_id: ApplicationObjectId = parse_argument(&arguments, 1, "object id")?;
            let grants = service.list(object_id).await?;
            info!(object_id = %object_id, count = grants.len(), "permission grants listed");
            print_json(&grants)
        }
        "destroy" => {
            let object_id: ApplicationObjectId = parse_argument(&arguments, 1, "object id")?;
            service.delete(object_id).await?;
            info!(object_id = %object_id, "permission grants deleted");
            Ok(())
        }
        other => {
            eprintln!("{USAGE}");
            Err(GrantError::Validation(format!("unknown command '{other}'")))
        }
    }
}

fn build_service(config: &CliConfig) -> GrantResult<PermissionGrantService> {
    let directory: Arc<dyn PermissionGrantDirectory> = match &config.provider {
        DirectoryProviderConfig::Memory => Arc::new(InMemoryGrantDirectory::new()),
        DirectoryProviderConfig::Graph(graph) => {
            let http_client = reqwest::Client::builder()
                .timeout(Duration::from_secs(graph.timeout_secs))
                .build()
                .map_err(|error| {
                    GrantError::Internal(format!("failed to build HTTP client: {error}"))
                })?;

            let token_provider: Arc<dyn AccessTokenProvider> = match &graph.credentials {
                GraphCredentials::StaticToken(token) => {
                    Arc::new(StaticTokenProvider::new(token.clone()))
                }
                GraphCredentials::ClientCredentials {
                    client_id,
                    client_secret,
                } => Arc::new(ClientCredentialsTokenProvider::new(
                    http_client.clone(),
                    graph.login_url.clone(),
                    graph.base_url.clone(),
                    graph.tenant_id.clone(),
                    client_id.clone(),
                    client_secret.clone(),
                )),
            };

            Arc::new(GraphGrantDirectory::new(
                http_client,
                graph.base_url.clone(),
                graph.tenant_id.clone(),
                token_provider,
            ))
        }
    };

    Ok(PermissionGrantService::new(directory))
}

impl CliConfig {
    fn load() -> GrantResult<Self> {
        let provider_name = env::var("DIRECTORY_PROVIDER")
            .unwrap_or_else(|_| "memory".to_owned())
            .trim()
            .to_lowercase();

        let provider = match provider_name.as_str() {
            "memory" => DirectoryProviderConfig::Memory,
            "graph" => {
                let tenant_id = required_env("GRAPH_TENANT_ID")?;
                let base_url = url_env("GRAPH_BASE_URL", "https://graph.windows.net")?;
                let login_url = url_env("GRAPH_LOGIN_URL", "https://login.microsoftonline.com")?;
                let timeout_secs = parse_env_u64("GRAPH_TIMEOUT_SECS", 30)?;

                let static_token = env::var("GRAPH_ACCESS_TOKEN")
                    .ok()
                    .map(|value| value.trim().to_owned())
                    .filter(|value| !value.is_empty());
                let credentials = match static_token {
                    Some(token) => GraphCredentials::StaticToken(token),
                    None => GraphCredentials::ClientCredentials {
                        client_id: required_env("AZURE_CLIENT_ID")?,
                        client_secret: required_env("AZURE_CLIENT_SECRET")?,
                    },
                };

                DirectoryProviderConfig::Graph(GraphRuntimeConfig {
                    tenant_id,
                    base_url,
                    login_url,
                    timeout_secs,
                    credentials,
                })
            }
            other => {
                return Err(GrantError::Validation(format!(
                    "DIRECTORY_PROVIDER must be either 'memory' or 'graph', got '{other}'"
                )));
            }
        };

        Ok(Self { provider })
    }
}

fn load_grant_file(path: &str) -> GrantResult<GrantConfiguration> {
    let contents = std::fs::read_to_string(path).map_err(|error| {
        GrantError::Validation(format!("failed to read grant file '{path}': {error}"))
    })?;
    let file: GrantFile = serde_json::from_str(&contents).map_err(|error| {
        GrantError::Validation(format!("invalid grant file '{path}': {error}"))
    })?;

    GrantConfiguration::new(file.into())
}

fn grant_key_from(arguments: &[String]) -> GrantResult<GrantKey> {
    let object_id: ApplicationObjectId = parse_argument(arguments, 1, "object id")?;
    let client_id: ClientId = parse_argument(arguments, 2, "client id")?;
    let resource_id: ResourceId = parse_argument(arguments, 3, "resource id")?;

    Ok(GrantKey {
        object_id,
        client_id,
        resource_id,
    })
}

fn required_argument<'a>(arguments: &'a [String], index: usize, what: &str) -> GrantResult<&'a str> {
    arguments
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| GrantError::Validation(format!("missing {what} argument")))
}

fn parse_argument<T>(arguments: &[String], index: usize, what: &str) -> GrantResult<T>
where
    T: FromStr<Err = GrantError>,
{
    required_argument(arguments, index, what)?.parse()
}

fn print_grant(grant: &PermissionGrant) -> GrantResult<()> {
    print_json(grant)
}

fn print_json<T: serde::Serialize>(value: &T) -> GrantResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| GrantError::Internal(format!("failed to render output: {error}")))?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> GrantResult<String> {
    env::var(name).map_err(|_| GrantError::Validation(format!("{name} is required")))
}

fn url_env(name: &str, default: &str) -> GrantResult<String> {
    let value = env::var(name).unwrap_or_else(|_| default.to_owned());
    let parsed = Url::parse(value.trim()).map_err(|error| {
        GrantError::Validation(format!("invalid {name} value '{value}': {error}"))
    })?;

    Ok(parsed.to_string().trim_end_matches('/').to_owned())
}

fn parse_env_u64(name: &str, default: u64) -> GrantResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            GrantError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
