// src/config.rs

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "boltz_prep.yaml";

pub fn project_root() -> PathBuf {
    match env::var_os("PROJECT_ROOT") {
        Some(val) => PathBuf::from(val),
        None => {
            // Fall back to current directory if PROJECT_ROOT not set
            env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    }
}

/// Endpoints and tuning knobs. Any field missing from the YAML file keeps
/// its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    pub uniprot_base_url: String,
    pub uniprot_accessions_url: String,
    pub rcsb_data_url: String,
    pub rcsb_files_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Some cluster proxies re-sign TLS traffic.
    pub accept_invalid_certs: bool,
    pub sequence_chunk_size: usize,
    pub batch_pause_ms: u64,
    /// Upper bound on simultaneous entry lookups when ranking.
    pub max_parallel_requests: usize,
    /// Unannotated polymer entities shorter than this are peptide ligands.
    pub peptide_max_len: usize,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            uniprot_base_url: "https://rest.uniprot.org/uniprotkb/".to_string(),
            uniprot_accessions_url: "https://rest.uniprot.org/uniprotkb/accessions".to_string(),
            rcsb_data_url: "https://data.rcsb.org/rest/v1".to_string(),
            rcsb_files_url: "https://files.rcsb.org/download".to_string(),
            user_agent: concat!("boltz-prep/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 15,
            accept_invalid_certs: false,
            sequence_chunk_size: 500,
            batch_pause_ms: 500,
            max_parallel_requests: 4,
            peptide_max_len: 60,
        }
    }
}

impl PrepConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// An explicit path must exist; otherwise `<project root>/boltz_prep.yaml`
    /// is used when present, and the defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading configuration from {}", path.display());
            return Self::from_yaml_file(path);
        }
        let fallback = project_root().join(CONFIG_FILE_NAME);
        if fallback.is_file() {
            info!("Loading configuration from {}", fallback.display());
            Self::from_yaml_file(&fallback)
        } else {
            Ok(Self::default())
        }
    }
}
