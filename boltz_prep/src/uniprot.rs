// src/uniprot.rs

use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use structure_ranker::{RawDomain, RawStructure};
use tracing::{debug, error, info};

use crate::api_handler::ApiHandler;
use crate::config::PrepConfig;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UniprotEntry {
    pub primary_accession: Option<String>,
    #[serde(default, rename = "uniProtKBCrossReferences")]
    pub cross_references: Vec<CrossReference>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CrossReference {
    pub database: Option<String>,
    pub id: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Property {
    pub key: String,
    pub value: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Location,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Location {
    pub start: Option<Position>,
    pub end: Option<Position>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Position {
    pub value: Option<i64>,
}

impl CrossReference {
    fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

impl UniprotEntry {
    /// PDB cross-references as unvalidated structure rows.
    pub fn structures(&self) -> Vec<RawStructure> {
        self.cross_references
            .iter()
            .filter(|x| matches!(x.database.as_deref(), None | Some("PDB")))
            .map(|x| RawStructure {
                id: x.id.clone(),
                method: x.property("Method").unwrap_or_default().to_string(),
                resolution: x.property("Resolution").map(str::to_string),
                chains: x.property("Chains").map(str::to_string),
            })
            .collect()
    }

    /// Domain features as unvalidated domain rows.
    pub fn domains(&self) -> Vec<RawDomain> {
        self.features
            .iter()
            .filter(|f| matches!(f.feature_type.as_deref(), None | Some("Domain")))
            .map(|f| RawDomain {
                description: f.description.clone(),
                start: f.location.start.as_ref().and_then(|p| p.value),
                end: f.location.end.as_ref().and_then(|p| p.value),
            })
            .collect()
    }
}

/// Anything that can look up protein entries and sequences by accession.
pub trait ProteinSource {
    fn fetch_entry(&self, accession: &str) -> Result<UniprotEntry>;

    /// One batch lookup; returns `(accession, sequence)` pairs.
    fn fetch_sequence_batch(&self, accessions: &[String]) -> Result<Vec<(String, String)>>;
}

pub struct UniprotClient {
    api: ApiHandler,
    base_url: String,
    accessions_url: String,
}

impl UniprotClient {
    pub fn new(api: ApiHandler, config: &PrepConfig) -> Self {
        Self {
            api,
            base_url: config.uniprot_base_url.clone(),
            accessions_url: config.uniprot_accessions_url.clone(),
        }
    }
}

impl ProteinSource for UniprotClient {
    fn fetch_entry(&self, accession: &str) -> Result<UniprotEntry> {
        info!("Fetching PDB cross-references and domains for {}", accession);
        let url = format!(
            "{}{}?fields=xref_pdb,ft_domain",
            self.base_url, accession
        );
        self.api
            .get_json(&url)
            .with_context(|| format!("UniProt lookup failed for {}", accession))
    }

    fn fetch_sequence_batch(&self, accessions: &[String]) -> Result<Vec<(String, String)>> {
        let joined = accessions.join(",");
        let query = [
            ("format", "tsv"),
            ("accessions", joined.as_str()),
            ("fields", "accession,sequence"),
        ];
        let text = self.api.get_text(&self.accessions_url, &query)?;
        parse_sequence_tsv(&text)
    }
}

#[derive(Deserialize)]
struct SequenceRow {
    #[serde(rename = "Entry")]
    entry: String,
    #[serde(rename = "Sequence")]
    sequence: String,
}

pub fn parse_sequence_tsv(text: &str) -> Result<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: SequenceRow = record.context("Malformed UniProt TSV row")?;
        rows.push((row.entry, row.sequence));
    }
    Ok(rows)
}

/// Looks up every distinct accession in batches of `chunk_size`. A failed
/// batch is logged and skipped; the accessions in it stay unmapped.
pub fn fetch_sequences<S: ProteinSource>(
    source: &S,
    accessions: &[String],
    chunk_size: usize,
    pause: Duration,
) -> HashMap<String, String> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = accessions
        .iter()
        .filter(|a| seen.insert(a.as_str()))
        .cloned()
        .collect();
    info!("Starting retrieval for {} unique IDs...", unique.len());

    let mut sequence_map = HashMap::new();
    let chunks: Vec<&[String]> = unique.chunks(chunk_size.max(1)).collect();
    for (i, chunk) in chunks.iter().enumerate() {
        match source.fetch_sequence_batch(chunk) {
            Ok(rows) => {
                sequence_map.extend(rows);
                let fetched = ((i + 1) * chunk_size.max(1)).min(unique.len());
                info!("Fetched {}/{}...", fetched, unique.len());
            }
            Err(e) => error!("Error fetching chunk {} of {}: {:#}", i + 1, chunks.len(), e),
        }
        if i + 1 < chunks.len() && !pause.is_zero() {
            debug!("Pausing {:?} between batches", pause);
            thread::sleep(pause);
        }
    }

    info!(
        "Mapped sequences for {} of {} unique IDs",
        sequence_map.len(),
        unique.len()
    );
    sequence_map
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::cell::RefCell;

    pub(crate) fn egfr_entry() -> UniprotEntry {
        serde_json::from_value(json!({
            "primaryAccession": "P00533",
            "uniProtKBCrossReferences": [
                {
                    "database": "PDB",
                    "id": "1M17",
                    "properties": [
                        {"key": "Method", "value": "X-ray"},
                        {"key": "Resolution", "value": "2.60 A"},
                        {"key": "Chains", "value": "A=671-998"}
                    ]
                },
                {
                    "database": "PDB",
                    "id": "1IVO",
                    "properties": [
                        {"key": "Method", "value": "X-ray"},
                        {"key": "Resolution", "value": "3.30 A"},
                        {"key": "Chains", "value": "A/B=25-642"}
                    ]
                },
                {
                    "database": "PDB",
                    "id": "2KS1",
                    "properties": [
                        {"key": "Method", "value": "NMR"},
                        {"key": "Resolution", "value": "-"},
                        {"key": "Chains", "value": "A=634-677"}
                    ]
                }
            ],
            "features": [
                {
                    "type": "Domain",
                    "description": "Protein kinase",
                    "location": {"start": {"value": 712}, "end": {"value": 979}}
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn entry_normalizes_to_raw_rows() {
        let entry = egfr_entry();
        let structures = entry.structures();
        assert_eq!(structures.len(), 3);
        assert_eq!(structures[0].id, "1M17");
        assert_eq!(structures[0].resolution.as_deref(), Some("2.60 A"));
        assert_eq!(structures[1].chains.as_deref(), Some("A/B=25-642"));
        assert_eq!(structures[2].method, "NMR");

        let domains = entry.domains();
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].start, Some(712));
        assert_eq!(domains[0].end, Some(979));
    }

    #[test]
    fn unknown_positions_stay_empty() {
        let entry: UniprotEntry = serde_json::from_value(json!({
            "features": [
                {"type": "Domain", "location": {"start": {"value": null}, "end": {"value": 40}}},
                {"type": "Region", "description": "Disordered", "location": {}}
            ]
        }))
        .unwrap();
        let domains = entry.domains();
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].start, None);
        assert!(domains[0].validate().is_err());
    }

    #[test]
    fn tsv_rows_parse() {
        let text = "Entry\tSequence\nP00533\tMRPSGTAGAALLALLAALCPASRA\nP00519\tMLEICLKLVG\n";
        let rows = parse_sequence_tsv(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], ("P00519".to_string(), "MLEICLKLVG".to_string()));
    }

    struct FakeUniprot {
        batches: RefCell<Vec<Vec<String>>>,
        failing: &'static str,
    }

    impl ProteinSource for FakeUniprot {
        fn fetch_entry(&self, _accession: &str) -> Result<UniprotEntry> {
            Ok(egfr_entry())
        }

        fn fetch_sequence_batch(&self, accessions: &[String]) -> Result<Vec<(String, String)>> {
            self.batches.borrow_mut().push(accessions.to_vec());
            if accessions.iter().any(|a| a == self.failing) {
                return Err(anyhow!("HTTP 500"));
            }
            Ok(accessions
                .iter()
                .map(|a| (a.clone(), format!("SEQ{}", a)))
                .collect())
        }
    }

    #[test]
    fn batches_are_deduplicated_and_failures_skipped() {
        let source = FakeUniprot {
            batches: RefCell::new(Vec::new()),
            failing: "Q3",
        };
        let ids: Vec<String> = ["P1", "P2", "P1", "Q3", "P4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let map = fetch_sequences(&source, &ids, 2, Duration::ZERO);

        let batches = source.batches.borrow();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], ["P1", "P2"]);
        assert_eq!(batches[1], ["Q3", "P4"]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["P2"], "SEQP2");
        assert!(!map.contains_key("P4"));
    }
}
