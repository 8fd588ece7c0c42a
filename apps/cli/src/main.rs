//! `iamsync` reconciles one custom role or role assignment definition
//! against the cloud identity provider.

#![forbid(unsafe_code)]

mod cli_config;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use iamsync_application::{
    AssignmentReconciler, DefinitionLoader, IdentityProviderClient, ReconciliationDispatcher,
    ReconciliationOutcome, RoleReconciler,
};
use iamsync_core::{AppError, AppResult, OrganizationId};
use iamsync_infrastructure::{
    AccessTokenProvider, FileSystemDefinitionStore, HttpIdentityProviderClient,
    IdentityProviderEndpoints, ImpersonatedAccessTokenProvider, MetadataServerTokenProvider,
    StaticAccessTokenProvider,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli_config::CliConfig;

#[derive(Debug, Parser)]
#[command(
    name = "iamsync",
    version,
    about = "Reconcile an IAM custom role or role assignment from a YAML definition"
)]
struct Cli {
    /// Numeric organization ID that owns the custom roles.
    org_id: String,

    /// Definition file name, looked up under the definitions directory first
    /// and the assignments directory second.
    #[arg(long = "role_file", visible_alias = "role-file")]
    role_file: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(parse_error) => {
            let _ = parse_error.print();
            return if parse_error.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(outcome) => {
            if outcome.is_mutation() {
                info!(outcome = outcome.label(), "identity provider updated");
            } else {
                info!(outcome = outcome.label(), "already up to date, nothing written");
            }
            ExitCode::SUCCESS
        }
        Err(run_error) => {
            error!(error = %run_error, "reconciliation failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<ReconciliationOutcome> {
    let organization_id = OrganizationId::new(cli.org_id)?;
    let config = CliConfig::load()?;
    let dispatcher = build_dispatcher(&config)?;

    info!(
        organization_id = %organization_id,
        role_file = %cli.role_file,
        "starting reconciliation"
    );
    dispatcher
        .reconcile_file(cli.role_file.as_str(), &organization_id)
        .await
}

fn build_dispatcher(config: &CliConfig) -> AppResult<ReconciliationDispatcher> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let token_provider = build_token_provider(config, http_client.clone())?;
    let client: Arc<dyn IdentityProviderClient> = Arc::new(HttpIdentityProviderClient::new(
        http_client,
        token_provider,
        IdentityProviderEndpoints {
            iam_base_url: config.iam_base_url.clone(),
            resource_manager_base_url: config.resource_manager_base_url.clone(),
        },
    ));

    let loader = DefinitionLoader::new(
        Arc::new(FileSystemDefinitionStore::new()),
        config.definitions_dir.clone(),
        config.assignments_dir.clone(),
    );

    Ok(ReconciliationDispatcher::new(
        loader,
        RoleReconciler::new(client.clone()),
        AssignmentReconciler::new(client),
    ))
}

fn build_token_provider(
    config: &CliConfig,
    http_client: reqwest::Client,
) -> AppResult<Arc<dyn AccessTokenProvider>> {
    let ambient: Arc<dyn AccessTokenProvider> = match config.access_token.as_deref() {
        Some(token) => Arc::new(StaticAccessTokenProvider::new(token)?),
        None => Arc::new(MetadataServerTokenProvider::new(
            http_client.clone(),
            config.metadata_base_url.clone(),
        )),
    };

    let Some(service_account) = config.impersonate_service_account.as_deref() else {
        return Ok(ambient);
    };

    info!(
        target_service_account = service_account,
        "impersonating service account"
    );
    Ok(Arc::new(ImpersonatedAccessTokenProvider::new(
        http_client,
        ambient,
        config.credentials_base_url.clone(),
        service_account,
        config.token_lifetime_seconds,
    )))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
