#![deny(clippy::all, clippy::pedantic)]

use std::{fs, time::Duration};

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("site URL is required (use --site or JAVEA_SITE_URL)")]
    MissingSite,
    #[error("revalidation secret is required (use --secret-file or REVALIDATE_SECRET)")]
    MissingSecret,
    #[error("failed to read secret file: {0}")]
    SecretFile(std::io::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Server(String),
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Client,
    pub base: Url,
    pub secret: Option<String>,
}

impl Ctx {
    pub fn new(site: &str, secret: Option<String>, timeout: Duration) -> Result<Self, CliError> {
        let base = Url::parse(site)?.join("/")?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            secret,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("javea-cli/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, path: &str) -> Result<Url, CliError> {
        self.base.join(path).map_err(CliError::Url)
    }

    pub fn secret(&self) -> Result<&str, CliError> {
        self.secret.as_deref().ok_or(CliError::MissingSecret)
    }

    pub async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, CliError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            return Err(CliError::Server(format!("status {status} body {text}")));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| CliError::Server(format!("failed to parse body: {e}")))
    }
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<Ctx, CliError> {
    let site = cli.site.clone().ok_or(CliError::MissingSite)?;
    let secret = if let Some(path) = &cli.secret_file {
        Some(
            fs::read_to_string(path)
                .map_err(CliError::SecretFile)?
                .trim()
                .to_string(),
        )
    } else {
        cli.secret_env.clone()
    };
    let secret = secret.filter(|value| !value.is_empty());

    Ctx::new(&site, secret, Duration::from_secs(cli.timeout))
}
