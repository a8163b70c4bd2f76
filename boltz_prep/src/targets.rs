// src/targets.rs

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Built-in template-conditioning benchmark set.
pub const DEFAULT_TARGETS: &str = include_str!("../data/template_targets.csv");

/// A receptor with a ligand-bound (holo) structure, an unbound (apo)
/// structure to use as template, and the CCD code of the bound ligand.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TemplateTarget {
    pub uniprot_id: String,
    pub holo_pdb: String,
    pub apo_pdb: String,
    pub ligand_ccd: String,
}

pub fn read_targets<R: Read>(reader: R) -> Result<Vec<TemplateTarget>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut targets = Vec::new();
    for (i, record) in rdr.deserialize().enumerate() {
        let target: TemplateTarget =
            record.with_context(|| format!("Bad target row {}", i + 1))?;
        targets.push(target);
    }
    Ok(targets)
}

pub fn load_targets(path: Option<&Path>) -> Result<Vec<TemplateTarget>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open targets file {}", path.display()))?;
            read_targets(file)
        }
        None => read_targets(DEFAULT_TARGETS.as_bytes()),
    }
}
