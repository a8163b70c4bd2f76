// src/boltz_yaml.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rcsb::Ligand;

pub const RECEPTOR_CHAIN: &str = "A";
pub const LIGAND_CHAIN: &str = "B";

/// One Boltz input file: `sequences`, then optional `templates` and
/// `properties`, in that key order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoltzConfig {
    pub sequences: Vec<SequenceEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<TemplateEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyEntry>,
}

/// Exactly one of `protein` / `ligand` is set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<ProteinChain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ligand: Option<LigandChain>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProteinChain {
    pub id: String,
    pub sequence: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LigandChain {
    pub id: String,
    pub smiles: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TemplateEntry {
    pub protein: TemplateProtein,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TemplateProtein {
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub affinity: Affinity,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Affinity {
    pub binder: String,
}

impl SequenceEntry {
    pub fn protein(id: &str, sequence: &str) -> Self {
        Self {
            protein: Some(ProteinChain {
                id: id.to_string(),
                sequence: sequence.to_string(),
            }),
            ligand: None,
        }
    }

    pub fn small_molecule(id: &str, smiles: &str) -> Self {
        Self {
            protein: None,
            ligand: Some(LigandChain {
                id: id.to_string(),
                smiles: smiles.to_string(),
            }),
        }
    }
}

impl BoltzConfig {
    /// Receptor plus small molecule, with an affinity prediction on the ligand.
    pub fn protein_ligand(protein_sequence: &str, smiles: &str) -> Self {
        Self {
            sequences: vec![
                SequenceEntry::protein(RECEPTOR_CHAIN, protein_sequence),
                SequenceEntry::small_molecule(LIGAND_CHAIN, smiles),
            ],
            templates: Vec::new(),
            properties: vec![PropertyEntry {
                affinity: Affinity {
                    binder: LIGAND_CHAIN.to_string(),
                },
            }],
        }
    }

    /// Receptor plus a peptide or small-molecule ligand, no properties.
    pub fn complex(receptor_sequence: &str, ligand: &Ligand) -> Self {
        let ligand_entry = match ligand {
            Ligand::Peptide(sequence) => SequenceEntry::protein(LIGAND_CHAIN, sequence),
            Ligand::SmallMolecule { smiles } => SequenceEntry::small_molecule(LIGAND_CHAIN, smiles),
        };
        Self {
            sequences: vec![
                SequenceEntry::protein(RECEPTOR_CHAIN, receptor_sequence),
                ligand_entry,
            ],
            templates: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Adds a receptor template; a forced template also pins `threshold: 1.0`.
    pub fn with_template(mut self, path: &str, force: bool) -> Self {
        self.templates.push(TemplateEntry {
            protein: TemplateProtein {
                id: RECEPTOR_CHAIN.to_string(),
                path: path.to_string(),
                force: force.then_some(true),
                threshold: force.then_some(1.0),
            },
        });
        self
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Destination for generated configs.
pub trait ConfigSink {
    fn write(&mut self, name: &str, config: &BoltzConfig) -> Result<PathBuf>;
}

/// Writes `<dir>/<name>.yaml`, creating `dir` on first use.
pub struct DirectorySink {
    dir: PathBuf,
    created: bool,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            created: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ConfigSink for DirectorySink {
    fn write(&mut self, name: &str, config: &BoltzConfig) -> Result<PathBuf> {
        if !self.created {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to create {}", self.dir.display()))?;
            self.created = true;
        }
        let path = self.dir.join(format!("{}.yaml", name));
        fs::write(&path, config.to_yaml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    #[test]
    fn affinity_config_layout() {
        let config = BoltzConfig::protein_ligand("MKTAYIAK", "CCO");
        let value: Value = serde_yaml::from_str(&config.to_yaml().unwrap()).unwrap();

        assert_eq!(value["sequences"][0]["protein"]["id"], "A");
        assert_eq!(value["sequences"][0]["protein"]["sequence"], "MKTAYIAK");
        assert_eq!(value["sequences"][1]["ligand"]["smiles"], "CCO");
        assert_eq!(value["properties"][0]["affinity"]["binder"], "B");
        assert!(value.get("templates").is_none());
    }

    #[test]
    fn forced_template_sets_threshold() {
        let ligand = Ligand::Peptide("QVQLQ".into());
        let yaml = BoltzConfig::complex("MKT", &ligand)
            .with_template("../templates/1XKK.pdb", true)
            .to_yaml()
            .unwrap();

        assert!(yaml.find("sequences:").unwrap() < yaml.find("templates:").unwrap());
        let value: Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value["sequences"][1]["protein"]["id"], "B");
        let template = &value["templates"][0]["protein"];
        assert_eq!(template["path"], "../templates/1XKK.pdb");
        assert_eq!(template["force"], true);
        assert_eq!(template["threshold"], 1.0);
        assert!(value.get("properties").is_none());
    }

    #[test]
    fn unforced_template_has_no_threshold() {
        let ligand = Ligand::SmallMolecule { smiles: "CCO".into() };
        let config = BoltzConfig::complex("MKT", &ligand).with_template("../templates/1XKK.pdb", false);
        let protein = &config.templates[0].protein;
        assert_eq!(protein.force, None);
        assert_eq!(protein.threshold, None);
    }

    #[test]
    fn directory_sink_creates_dir_and_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(tmp.path().join("output"));
        let config = BoltzConfig::protein_ligand("MKT", "CCO");

        let path = sink.write("P00533_NP0001", &config).unwrap();
        assert_eq!(path, tmp.path().join("output").join("P00533_NP0001.yaml"));

        let read_back: BoltzConfig =
            serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read_back, config);
    }
}
