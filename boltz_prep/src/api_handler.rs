// src/api_handler.rs

use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::PrepConfig;

/// Blocking JSON/text client shared by the UniProt and RCSB sources.
#[derive(Clone)]
pub struct ApiHandler {
    client: Client,
}

impl ApiHandler {
    pub fn new(config: &PrepConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { client })
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = check_status(url, self.client.get(url).send()?)?;
        response
            .json()
            .with_context(|| format!("Unexpected JSON from {}", url))
    }

    /// Like [`ApiHandler::get_json`], but a 404 is `Ok(None)`.
    pub fn get_optional_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(url, response)?;
        let value = response
            .json()
            .with_context(|| format!("Unexpected JSON from {}", url))?;
        Ok(Some(value))
    }

    pub fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        debug!("GET {} ({} query params)", url, query.len());
        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "text/plain")
            .send()?;
        Ok(check_status(url, response)?.text()?)
    }

    pub fn download(&self, url: &str, destination: &Path) -> Result<()> {
        debug!("Downloading {} to {}", url, destination.display());
        let mut response = check_status(url, self.client.get(url).header(ACCEPT, "*/*").send()?)?;
        let mut file = File::create(destination)
            .with_context(|| format!("Failed to create {}", destination.display()))?;
        if let Err(e) = response.copy_to(&mut file) {
            drop(file);
            // no half-written coordinate files
            let _ = fs::remove_file(destination);
            return Err(e).with_context(|| format!("Download of {} interrupted", url));
        }
        Ok(())
    }
}

fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().unwrap_or_default();
    bail!(
        "Failed to fetch data from URL: {}. Status: {}. Error: {}",
        url,
        status,
        error_text
    )
}
