// src/template_selection.rs

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use structure_ranker::{DomainRecord, RankedStructure};

/// Best template first: most domain residues covered, then the sharper
/// resolution (unknown last), then PDB id.
pub fn select_templates(mut ranked: Vec<RankedStructure>) -> Vec<RankedStructure> {
    ranked.sort_by(|a, b| {
        b.coverage
            .cmp(&a.coverage)
            .then_with(|| compare_resolution(a.resolution(), b.resolution()))
            .then_with(|| a.id().cmp(b.id()))
    });
    ranked
}

fn compare_resolution(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RankingRow {
    pub accession: String,
    pub rank: usize,
    pub pdb_id: String,
    pub method: String,
    pub resolution: Option<f64>,
    pub chain: String,
    pub start: u32,
    pub end: u32,
    pub coverage: u32,
    pub coverage_fraction: Option<f64>,
}

pub fn ranking_rows(
    accession: &str,
    ordered: &[RankedStructure],
    domains: &[DomainRecord],
) -> Vec<RankingRow> {
    ordered
        .iter()
        .enumerate()
        .map(|(i, r)| RankingRow {
            accession: accession.to_string(),
            rank: i + 1,
            pdb_id: r.id().to_string(),
            method: r.structure.method().to_string(),
            resolution: r.resolution(),
            chain: r.span.chain.clone(),
            start: r.span.start,
            end: r.span.end,
            coverage: r.coverage,
            coverage_fraction: r.coverage_fraction(domains),
        })
        .collect()
}

pub fn write_ranking_csv(path: &Path, rows: &[RankingRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use structure_ranker::{rank_structures, ChainSpan, ExperimentalMethod, StructureRecord};

    fn structure(id: &str, resolution: Option<f64>, start: u32, end: u32) -> StructureRecord {
        StructureRecord::new(
            id,
            ExperimentalMethod::XRay,
            resolution,
            vec![ChainSpan::new("A", start, end).unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn coverage_then_resolution_then_id() {
        let domains = [DomainRecord::new("Protein kinase", 712, 979).unwrap()];
        let structures = [
            structure("4HJO", Some(2.75), 696, 1022),
            structure("1XKK", Some(2.40), 695, 1022),
            structure("1IVO", Some(3.30), 25, 642),
            structure("5UG9", None, 695, 1022),
            structure("1M17", Some(2.60), 671, 998),
        ];
        let ordered = select_templates(rank_structures(&structures, &domains));
        let ids: Vec<&str> = ordered.iter().map(RankedStructure::id).collect();
        assert_eq!(ids, ["1XKK", "1M17", "4HJO", "5UG9", "1IVO"]);
    }

    #[test]
    fn rows_carry_rank_and_fraction() {
        let domains = [DomainRecord::new("Protein kinase", 712, 979).unwrap()];
        let ordered = select_templates(rank_structures(
            &[structure("1M17", Some(2.6), 671, 998), structure("1IVO", Some(3.3), 25, 642)],
            &domains,
        ));
        let rows = ranking_rows("P00533", &ordered, &domains);

        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].pdb_id, "1M17");
        assert_eq!(rows[0].method, "X-ray");
        assert_eq!(rows[0].coverage_fraction, Some(1.0));
        assert_eq!(rows[1].coverage, 0);

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rankings.csv");
        write_ranking_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("accession,rank,pdb_id,method,resolution,chain,start,end,coverage,coverage_fraction")
        );
        assert_eq!(lines.next(), Some("P00533,1,1M17,X-ray,2.6,A,671,998,268,1.0"));
    }
}
