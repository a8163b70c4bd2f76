// src/rcsb.rs

use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api_handler::ApiHandler;
use crate::config::PrepConfig;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Entry {
    #[serde(default)]
    pub rcsb_entry_container_identifiers: EntryIdentifiers,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct EntryIdentifiers {
    #[serde(default)]
    pub polymer_entity_ids: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PolymerEntity {
    #[serde(default)]
    pub rcsb_polymer_entity_container_identifiers: PolymerIdentifiers,
    #[serde(default)]
    pub entity_poly: EntityPoly,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PolymerIdentifiers {
    pub uniprot_ids: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct EntityPoly {
    pub pdbx_seq_one_letter_code: Option<String>,
    pub pdbx_seq_one_letter_code_can: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ChemComp {
    pub rcsb_chem_comp_descriptor: Option<ChemCompDescriptor>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ChemCompDescriptor {
    pub smiles: Option<String>,
    pub smiles_stereo: Option<String>,
}

impl PolymerEntity {
    pub fn uniprot_ids(&self) -> &[String] {
        self.rcsb_polymer_entity_container_identifiers
            .uniprot_ids
            .as_deref()
            .unwrap_or_default()
    }

    /// Canonical one-letter sequence with line breaks removed. Falls back
    /// to the deposited code when no canonical form is given.
    pub fn sequence(&self) -> Option<String> {
        let poly = &self.entity_poly;
        poly.pdbx_seq_one_letter_code_can
            .as_deref()
            .or(poly.pdbx_seq_one_letter_code.as_deref())
            .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect::<String>())
            .filter(|s| !s.is_empty())
    }
}

impl ChemComp {
    pub fn smiles(&self) -> Option<&str> {
        let descriptor = self.rcsb_chem_comp_descriptor.as_ref()?;
        descriptor
            .smiles
            .as_deref()
            .or(descriptor.smiles_stereo.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Read access to the RCSB data API and coordinate files. Lookups of
/// unknown identifiers give `Ok(None)`.
pub trait StructureSource {
    fn entry(&self, pdb_id: &str) -> Result<Option<Entry>>;
    fn polymer_entity(&self, pdb_id: &str, entity_id: &str) -> Result<Option<PolymerEntity>>;
    fn chem_comp(&self, ccd: &str) -> Result<Option<ChemComp>>;
    fn download_coordinates(&self, pdb_id: &str, destination: &Path) -> Result<()>;
}

pub struct RcsbClient {
    api: ApiHandler,
    data_url: String,
    files_url: String,
}

impl RcsbClient {
    pub fn new(api: ApiHandler, config: &PrepConfig) -> Self {
        Self {
            api,
            data_url: config.rcsb_data_url.trim_end_matches('/').to_string(),
            files_url: config.rcsb_files_url.trim_end_matches('/').to_string(),
        }
    }
}

impl StructureSource for RcsbClient {
    fn entry(&self, pdb_id: &str) -> Result<Option<Entry>> {
        let url = format!("{}/core/entry/{}", self.data_url, pdb_id.to_uppercase());
        self.api.get_optional_json(&url)
    }

    fn polymer_entity(&self, pdb_id: &str, entity_id: &str) -> Result<Option<PolymerEntity>> {
        let url = format!(
            "{}/core/polymer_entity/{}/{}",
            self.data_url,
            pdb_id.to_uppercase(),
            entity_id
        );
        self.api.get_optional_json(&url)
    }

    fn chem_comp(&self, ccd: &str) -> Result<Option<ChemComp>> {
        let url = format!("{}/core/chemcomp/{}", self.data_url, ccd.to_uppercase());
        self.api.get_optional_json(&url)
    }

    fn download_coordinates(&self, pdb_id: &str, destination: &Path) -> Result<()> {
        let url = format!("{}/{}.pdb", self.files_url, pdb_id.to_uppercase());
        info!("Downloading {} coordinates", pdb_id.to_uppercase());
        self.api.download(&url, destination)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ligand {
    Peptide(String),
    SmallMolecule { smiles: String },
}

/// Receptor sequence and bound ligand taken from one holo structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexInputs {
    pub receptor_sequence: String,
    pub ligand: Ligand,
}

/// Walks the polymer entities of `pdb_id`: the entity mapped to `uniprot_id`
/// is the receptor, the first unmapped entity shorter than `peptide_max_len`
/// is a peptide ligand. Without a peptide, the SMILES of `ccd` is used.
/// `Ok(None)` when the entry, the receptor or a ligand cannot be found.
pub fn resolve_complex<S: StructureSource>(
    source: &S,
    uniprot_id: &str,
    pdb_id: &str,
    ccd: &str,
    peptide_max_len: usize,
) -> Result<Option<ComplexInputs>> {
    let Some(entry) = source.entry(pdb_id)? else {
        warn!("No RCSB entry for {}", pdb_id);
        return Ok(None);
    };

    let mut receptor = None;
    let mut peptide = None;
    for entity_id in &entry.rcsb_entry_container_identifiers.polymer_entity_ids {
        let entity = match source.polymer_entity(pdb_id, entity_id) {
            Ok(Some(entity)) => entity,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping entity {}/{}: {:#}", pdb_id, entity_id, e);
                continue;
            }
        };
        let sequence = entity.sequence();
        let uniprot_ids = entity.uniprot_ids();

        if uniprot_ids.iter().any(|id| id == uniprot_id) {
            receptor = sequence;
        } else if uniprot_ids.is_empty() && peptide.is_none() {
            peptide = sequence.filter(|s| s.chars().count() < peptide_max_len);
        }
    }

    let ligand = match peptide {
        Some(seq) => Some(Ligand::Peptide(seq)),
        None => source
            .chem_comp(ccd)?
            .and_then(|comp| comp.smiles().map(str::to_string))
            .map(|smiles| Ligand::SmallMolecule { smiles }),
    };

    match (receptor, ligand) {
        (Some(receptor_sequence), Some(ligand)) => Ok(Some(ComplexInputs {
            receptor_sequence,
            ligand,
        })),
        (receptor, ligand) => {
            debug!(
                "{}: receptor found = {}, ligand found = {}",
                pdb_id,
                receptor.is_some(),
                ligand.is_some()
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;

    /// In-memory RCSB keyed by upper-case identifiers.
    #[derive(Default)]
    pub(crate) struct FakeRcsb {
        pub entries: HashMap<String, Entry>,
        pub entities: HashMap<(String, String), PolymerEntity>,
        pub chem_comps: HashMap<String, ChemComp>,
    }

    impl FakeRcsb {
        pub fn with_entry(mut self, pdb_id: &str, entities: Vec<PolymerEntity>) -> Self {
            let ids: Vec<String> = (1..=entities.len()).map(|i| i.to_string()).collect();
            for (id, entity) in ids.iter().zip(entities) {
                self.entities.insert((pdb_id.to_string(), id.clone()), entity);
            }
            self.entries.insert(
                pdb_id.to_string(),
                Entry {
                    rcsb_entry_container_identifiers: EntryIdentifiers {
                        polymer_entity_ids: ids,
                    },
                },
            );
            self
        }

        pub fn with_smiles(mut self, ccd: &str, smiles: &str) -> Self {
            let comp = serde_json::from_value(json!({
                "rcsb_chem_comp_descriptor": {"smiles": smiles}
            }))
            .unwrap();
            self.chem_comps.insert(ccd.to_string(), comp);
            self
        }
    }

    /// An empty `uniprot_ids` slice is sent as `null`, as RCSB does.
    pub(crate) fn entity(uniprot_ids: &[&str], sequence: &str) -> PolymerEntity {
        let uniprot_ids = (!uniprot_ids.is_empty()).then_some(uniprot_ids);
        serde_json::from_value(json!({
            "rcsb_polymer_entity_container_identifiers": {"uniprot_ids": uniprot_ids},
            "entity_poly": {"pdbx_seq_one_letter_code_can": sequence}
        }))
        .unwrap()
    }

    impl StructureSource for FakeRcsb {
        fn entry(&self, pdb_id: &str) -> Result<Option<Entry>> {
            Ok(self.entries.get(pdb_id).cloned())
        }

        fn polymer_entity(&self, pdb_id: &str, entity_id: &str) -> Result<Option<PolymerEntity>> {
            Ok(self
                .entities
                .get(&(pdb_id.to_string(), entity_id.to_string()))
                .cloned())
        }

        fn chem_comp(&self, ccd: &str) -> Result<Option<ChemComp>> {
            Ok(self.chem_comps.get(ccd).cloned())
        }

        fn download_coordinates(&self, pdb_id: &str, destination: &Path) -> Result<()> {
            fs::write(destination, format!("HEADER    {}\nEND\n", pdb_id))?;
            Ok(())
        }
    }

    #[test]
    fn small_molecule_ligand_from_ccd() {
        let source = FakeRcsb::default()
            .with_entry("1M17", vec![entity(&["P00533"], "GSHMASGEAPNQ\nALLRIL")])
            .with_smiles("AQ4", "COCCOc1cc2ncnc(Nc3cccc(c3)C#C)c2cc1OCCOC");

        let complex = resolve_complex(&source, "P00533", "1M17", "AQ4", 60)
            .unwrap()
            .unwrap();
        assert_eq!(complex.receptor_sequence, "GSHMASGEAPNQALLRIL");
        assert!(matches!(complex.ligand, Ligand::SmallMolecule { .. }));
    }

    #[test]
    fn short_unmapped_polymer_is_a_peptide() {
        let source = FakeRcsb::default()
            .with_entry(
                "3SN6",
                vec![
                    entity(&["P07550"], "MGQPGNGSAFLLAPNRSHAPDHDVTQQRDE"),
                    entity(&[], "QVQLQESGGGLVQ"),
                    entity(&[], "SHOULDNOTBEUSED"),
                ],
            )
            .with_smiles("EPN", "CNC[C@H](O)c1ccc(O)c(O)c1");

        let complex = resolve_complex(&source, "P07550", "3SN6", "EPN", 60)
            .unwrap()
            .unwrap();
        assert_eq!(complex.ligand, Ligand::Peptide("QVQLQESGGGLVQ".to_string()));
    }

    #[test]
    fn long_unmapped_polymer_falls_back_to_ccd() {
        let long_chain = "A".repeat(60);
        let source = FakeRcsb::default()
            .with_entry(
                "2RH1",
                vec![entity(&["P07550"], "MGQPG"), entity(&[], &long_chain)],
            )
            .with_smiles("CAU", "CC(C)NCC(O)COc1cccc2[nH]c3ccccc3c12");

        let complex = resolve_complex(&source, "P07550", "2RH1", "CAU", 60)
            .unwrap()
            .unwrap();
        assert!(matches!(complex.ligand, Ligand::SmallMolecule { .. }));
    }

    #[test]
    fn missing_receptor_or_entry_gives_none() {
        let source = FakeRcsb::default()
            .with_entry("1ERE", vec![entity(&["P99999"], "MTMTL")])
            .with_smiles("EST", "C[C@]12CC[C@H]3c4ccc(O)cc4CC[C@H]3[C@@H]1CC[C@@H]2O");

        assert_eq!(resolve_complex(&source, "P03372", "1ERE", "EST", 60).unwrap(), None);
        assert_eq!(resolve_complex(&source, "P03372", "9ZZZ", "EST", 60).unwrap(), None);
    }
}
