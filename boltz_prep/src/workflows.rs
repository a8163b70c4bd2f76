// src/workflows.rs

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use polars::prelude::DataFrame;
use structure_ranker::{rank_records, Diagnostic, DomainRecord, RankedStructure};
use tracing::{error, info, warn};

use crate::boltz_yaml::{BoltzConfig, ConfigSink, DirectorySink};
use crate::rcsb::{resolve_complex, StructureSource};
use crate::tables::{self, LIGAND_ID, SEQUENCE, SMILES, UNIPROT_ID};
use crate::targets::TemplateTarget;
use crate::template_selection::select_templates;
use crate::uniprot::{fetch_sequences, ProteinSource};

pub const PROTEIN_COLUMNS: [&str; 3] = ["ID", "Name", UNIPROT_ID];
pub const TEMPLATES_DIR: &str = "templates";
pub const GROUP_DIRS: [&str; 3] = ["group_1", "group_2", "group_3"];

const PROGRESS_EVERY: usize = 100;

// ───────────────────────────── ranking ─────────────────────────────

#[derive(Debug, Clone)]
pub struct AccessionRanking {
    pub accession: String,
    /// Best template first.
    pub ordered: Vec<RankedStructure>,
    pub domains: Vec<DomainRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AccessionRanking {
    pub fn best(&self) -> Option<&RankedStructure> {
        self.ordered.first()
    }
}

pub fn rank_accession<S: ProteinSource>(source: &S, accession: &str) -> Result<AccessionRanking> {
    let entry = source.fetch_entry(accession)?;
    if let Some(primary) = entry.primary_accession.as_deref() {
        if primary != accession {
            info!("{} resolves to primary accession {}", accession, primary);
        }
    }

    let report = rank_records(&entry.structures(), &entry.domains());
    info!(
        "{}: {} template-grade structures, {} domains, {} rejected rows",
        accession,
        report.ranked.len(),
        report.domains.len(),
        report.diagnostics.len()
    );

    Ok(AccessionRanking {
        accession: accession.to_string(),
        ordered: select_templates(report.ranked),
        domains: report.domains,
        diagnostics: report.diagnostics,
    })
}

/// Ranks accessions on scoped threads, at most `max_parallel` at a time.
/// Results keep input order.
pub fn rank_accessions<S: ProteinSource + Sync>(
    source: &S,
    accessions: &[String],
    max_parallel: usize,
) -> Vec<(String, Result<AccessionRanking>)> {
    let mut results = Vec::with_capacity(accessions.len());
    for batch in accessions.chunks(max_parallel.max(1)) {
        thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|accession| {
                    let handle = scope.spawn(move || rank_accession(source, accession));
                    (accession.clone(), handle)
                })
                .collect();
            for (accession, handle) in handles {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("ranking thread for {} panicked", accession)));
                results.push((accession, result));
            }
        });
    }
    results
}

/// Fetches the coordinates of each accession's best template into `dir`,
/// skipping files already present. Returns how many files were fetched.
pub fn download_best_templates<S: StructureSource>(
    source: &S,
    rankings: &[AccessionRanking],
    dir: &Path,
) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut downloaded = 0;
    for ranking in rankings {
        let Some(best) = ranking.best() else {
            warn!("{}: no template-grade structure to download", ranking.accession);
            continue;
        };
        let pdb_id = best.id().to_uppercase();
        let destination = dir.join(format!("{}.pdb", pdb_id));
        if destination.exists() {
            info!("{} already present, skipping download", destination.display());
            continue;
        }
        match source.download_coordinates(&pdb_id, &destination) {
            Ok(()) => downloaded += 1,
            Err(e) => error!("{}: download of {} failed: {:#}", ranking.accession, pdb_id, e),
        }
    }
    Ok(downloaded)
}

// ───────────────────────────── sequences ─────────────────────────────

/// Trims the target table to [`PROTEIN_COLUMNS`] and adds a `Sequence`
/// column fetched in batches.
pub fn attach_uniprot_sequences<S: ProteinSource>(
    source: &S,
    proteins: &DataFrame,
    chunk_size: usize,
    pause: Duration,
) -> Result<DataFrame> {
    let mut trimmed = proteins.select(PROTEIN_COLUMNS)?;
    info!("Read and processed {} proteins.", trimmed.height());

    let accessions: Vec<String> = tables::optional_strings(&trimmed, UNIPROT_ID)?
        .into_iter()
        .flatten()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    let sequences = fetch_sequences(source, &accessions, chunk_size, pause);
    tables::attach_sequences(&mut trimmed, UNIPROT_ID, &sequences)?;
    Ok(trimmed)
}

// ───────────────────────────── YAML generation ─────────────────────────────

/// One affinity config per protein × ligand pair, named
/// `<UniProt ID>_<NP_MRD_ID>`, stopping after `cap` files.
pub fn generate_affinity_configs<K: ConfigSink>(
    proteins: &DataFrame,
    ligands: &DataFrame,
    sink: &mut K,
    cap: Option<usize>,
) -> Result<usize> {
    let proteins = tables::filter_blank(proteins, &[UNIPROT_ID, SEQUENCE])?;
    let ligands = tables::filter_blank(ligands, &[SMILES])?;
    info!(
        "After filtering: {} proteins and {} ligands remain.",
        proteins.height(),
        ligands.height()
    );

    let protein_rows: Vec<(String, String)> = tables::strings(&proteins, UNIPROT_ID)?
        .into_iter()
        .zip(tables::strings(&proteins, SEQUENCE)?)
        .collect();
    let ligand_rows: Vec<(String, String)> = tables::strings(&ligands, LIGAND_ID)?
        .into_iter()
        .zip(tables::strings(&ligands, SMILES)?)
        .collect();

    let cap = cap.unwrap_or(usize::MAX);
    let mut count = 0;
    info!("Generating Boltz YAML files...");

    'outer: for (uniprot_id, sequence) in &protein_rows {
        for (ligand_id, smiles) in &ligand_rows {
            if count >= cap {
                break 'outer;
            }
            let config = BoltzConfig::protein_ligand(sequence.trim(), smiles.trim());
            sink.write(&format!("{}_{}", uniprot_id.trim(), ligand_id.trim()), &config)?;
            count += 1;
            if count % PROGRESS_EVERY == 0 {
                info!("Progress: {} files generated.", count);
            }
        }
    }

    info!("Success: {} YAML files written", count);
    Ok(count)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TemplateSummary {
    pub written: usize,
    pub failed: Vec<String>,
}

/// For every target writes three configs under `output_dir`: `group_1`
/// without a template, `group_2` with the apo structure as template and
/// `group_3` with the template forced. Apo coordinates go to
/// `output_dir/templates`.
pub fn generate_template_configs<S: StructureSource>(
    source: &S,
    targets: &[TemplateTarget],
    output_dir: &Path,
    peptide_max_len: usize,
) -> Result<TemplateSummary> {
    let [mut plain, mut templated, mut forced] =
        GROUP_DIRS.map(|group| DirectorySink::new(output_dir.join(group)));
    let templates_dir = output_dir.join(TEMPLATES_DIR);
    fs::create_dir_all(&templates_dir)
        .with_context(|| format!("Failed to create {}", templates_dir.display()))?;

    let mut summary = TemplateSummary::default();
    info!("Preparing template-conditioning inputs for {} targets", targets.len());

    for target in targets {
        let uniprot = target.uniprot_id.as_str();
        info!("Target: {} ({})...", uniprot, target.holo_pdb);

        let complex = match resolve_complex(
            source,
            uniprot,
            &target.holo_pdb,
            &target.ligand_ccd,
            peptide_max_len,
        ) {
            Ok(Some(complex)) => complex,
            Ok(None) => {
                warn!("{}: receptor or ligand not found in {}", uniprot, target.holo_pdb);
                summary.failed.push(uniprot.to_string());
                continue;
            }
            Err(e) => {
                error!("{}: lookup of {} failed: {:#}", uniprot, target.holo_pdb, e);
                summary.failed.push(uniprot.to_string());
                continue;
            }
        };

        let base = BoltzConfig::complex(&complex.receptor_sequence, &complex.ligand);
        plain.write(uniprot, &base)?;

        let apo = target.apo_pdb.to_uppercase();
        let apo_file = templates_dir.join(format!("{}.pdb", apo));
        if !apo_file.exists() {
            if let Err(e) = source.download_coordinates(&apo, &apo_file) {
                warn!("{}: could not download template {}: {:#}", uniprot, apo, e);
            }
        }

        // group directories are siblings of the templates directory
        let template_path = format!("../{}/{}.pdb", TEMPLATES_DIR, apo);
        templated.write(uniprot, &base.clone().with_template(&template_path, false))?;
        forced.write(uniprot, &base.with_template(&template_path, true))?;

        summary.written += 1;
        info!("{}: SUCCESS", uniprot);
    }

    info!(
        "Template inputs written for {} targets, {} failed",
        summary.written,
        summary.failed.len()
    );
    Ok(summary)
}
