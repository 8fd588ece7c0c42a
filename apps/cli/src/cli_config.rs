use std::env;
use std::path::PathBuf;

use iamsync_core::{AppError, AppResult};
use url::Url;

const MAX_TOKEN_LIFETIME_SECONDS: u32 = 43_200;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub definitions_dir: PathBuf,
    pub assignments_dir: PathBuf,
    pub iam_base_url: String,
    pub resource_manager_base_url: String,
    pub credentials_base_url: String,
    pub metadata_base_url: String,
    pub impersonate_service_account: Option<String>,
    pub access_token: Option<String>,
    pub token_lifetime_seconds: u32,
    pub http_timeout_seconds: u64,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let with_default =
            |name: &str, default: &str| non_empty(name).unwrap_or_else(|| default.to_owned());

        let definitions_dir = PathBuf::from(with_default(
            "IAMSYNC_DEFINITIONS_DIR",
            "infrastructure/definitions",
        ));
        let assignments_dir = PathBuf::from(with_default(
            "IAMSYNC_ASSIGNMENTS_DIR",
            "infrastructure/assignments",
        ));
        let iam_base_url = base_url(
            "IAMSYNC_IAM_BASE_URL",
            with_default("IAMSYNC_IAM_BASE_URL", "https://iam.googleapis.com"),
        )?;
        let resource_manager_base_url = base_url(
            "IAMSYNC_RESOURCE_MANAGER_BASE_URL",
            with_default(
                "IAMSYNC_RESOURCE_MANAGER_BASE_URL",
                "https://cloudresourcemanager.googleapis.com",
            ),
        )?;
        let credentials_base_url = base_url(
            "IAMSYNC_CREDENTIALS_BASE_URL",
            with_default(
                "IAMSYNC_CREDENTIALS_BASE_URL",
                "https://iamcredentials.googleapis.com",
            ),
        )?;
        let metadata_base_url = base_url(
            "IAMSYNC_METADATA_BASE_URL",
            with_default("IAMSYNC_METADATA_BASE_URL", "http://metadata.google.internal"),
        )?;
        let impersonate_service_account = non_empty("IAMSYNC_IMPERSONATE_SERVICE_ACCOUNT");
        let access_token = non_empty("IAMSYNC_ACCESS_TOKEN");

        let token_lifetime_seconds = parse_u32(
            "IAMSYNC_TOKEN_LIFETIME_SECONDS",
            non_empty("IAMSYNC_TOKEN_LIFETIME_SECONDS"),
            3600,
        )?;
        if token_lifetime_seconds == 0 || token_lifetime_seconds > MAX_TOKEN_LIFETIME_SECONDS {
            return Err(AppError::Validation(format!(
                "IAMSYNC_TOKEN_LIFETIME_SECONDS must be between 1 and {MAX_TOKEN_LIFETIME_SECONDS}"
            )));
        }

        let http_timeout_seconds = parse_u64(
            "IAMSYNC_HTTP_TIMEOUT_SECONDS",
            non_empty("IAMSYNC_HTTP_TIMEOUT_SECONDS"),
            30,
        )?;
        if http_timeout_seconds == 0 {
            return Err(AppError::Validation(
                "IAMSYNC_HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            definitions_dir,
            assignments_dir,
            iam_base_url,
            resource_manager_base_url,
            credentials_base_url,
            metadata_base_url,
            impersonate_service_account,
            access_token,
            token_lifetime_seconds,
            http_timeout_seconds,
        })
    }
}

fn base_url(name: &str, value: String) -> AppResult<String> {
    let parsed = Url::parse(value.as_str())
        .map_err(|error| AppError::Validation(format!("invalid {name} value '{value}': {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "{name} must use http or https, got '{value}'"
        )));
    }

    Ok(value.trim_end_matches('/').to_owned())
}

fn parse_u32(name: &str, value: Option<String>, default: u32) -> AppResult<u32> {
    match value {
        Some(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_u64(name: &str, value: Option<String>, default: u64) -> AppResult<u64> {
    match value {
        Some(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
