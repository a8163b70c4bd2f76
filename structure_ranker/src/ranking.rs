// src/ranking.rs

use tracing::{debug, warn};

use crate::coverage::{domain_union_length, overlap_residues};
use crate::error::RankerError;
use crate::models::{ChainSpan, DomainRecord, RawDomain, RawStructure, StructureRecord};

/// A template-grade structure with the residues of functional domains it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedStructure {
    pub structure: StructureRecord,
    /// Chain span the coverage was scored on.
    pub span: ChainSpan,
    pub coverage: u32,
}

impl RankedStructure {
    pub fn id(&self) -> &str {
        self.structure.id()
    }

    pub fn resolution(&self) -> Option<f64> {
        self.structure.resolution()
    }

    /// Coverage relative to the union of all domain residues.
    pub fn coverage_fraction(&self, domains: &[DomainRecord]) -> Option<f64> {
        match domain_union_length(domains) {
            0 => None,
            total => Some(f64::from(self.coverage) / f64::from(total)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Structure,
    Domain,
}

/// A rejected input row and why it was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: RecordKind,
    pub error: RankerError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingReport {
    pub ranked: Vec<RankedStructure>,
    pub domains: Vec<DomainRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Keeps X-ray and EM structures, in input order, each scored on its best
/// chain span. Ties between spans go to the first one listed.
pub fn rank_structures(
    structures: &[StructureRecord],
    domains: &[DomainRecord],
) -> Vec<RankedStructure> {
    structures
        .iter()
        .filter(|s| s.method().is_template_grade())
        .filter_map(|structure| {
            let (span, coverage) = best_span(structure, domains)?;
            debug!(
                "{} chain {} ({}-{}) covers {} domain residues",
                structure.id(),
                span.chain,
                span.start,
                span.end,
                coverage
            );
            Some(RankedStructure {
                structure: structure.clone(),
                span: span.clone(),
                coverage,
            })
        })
        .collect()
}

fn best_span<'a>(
    structure: &'a StructureRecord,
    domains: &[DomainRecord],
) -> Option<(&'a ChainSpan, u32)> {
    let mut best: Option<(&ChainSpan, u32)> = None;
    for span in structure.spans() {
        let coverage = overlap_residues(span.start, span.end, domains);
        if best.map_or(true, |(_, top)| coverage > top) {
            best = Some((span, coverage));
        }
    }
    best
}

/// Validates raw rows, reports the rejected ones and ranks the rest.
pub fn rank_records(structures: &[RawStructure], domains: &[RawDomain]) -> RankingReport {
    let mut diagnostics = Vec::new();

    let valid_domains: Vec<DomainRecord> = domains
        .iter()
        .filter_map(|raw| match raw.validate() {
            Ok(domain) => Some(domain),
            Err(error) => {
                warn!("Skipping domain: {}", error);
                diagnostics.push(Diagnostic {
                    kind: RecordKind::Domain,
                    error,
                });
                None
            }
        })
        .collect();

    let valid_structures: Vec<StructureRecord> = structures
        .iter()
        .filter_map(|raw| match raw.validate() {
            Ok(structure) => Some(structure),
            Err(error) => {
                warn!("Skipping structure: {}", error);
                diagnostics.push(Diagnostic {
                    kind: RecordKind::Structure,
                    error,
                });
                None
            }
        })
        .collect();

    let ranked = rank_structures(&valid_structures, &valid_domains);
    debug!(
        "Ranked {} of {} structures against {} domains ({} rows rejected)",
        ranked.len(),
        structures.len(),
        valid_domains.len(),
        diagnostics.len()
    );

    RankingReport {
        ranked,
        domains: valid_domains,
        diagnostics,
    }
}
