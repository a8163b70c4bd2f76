// src/main.rs

mod api_handler;
mod boltz_yaml;
mod config;
mod rcsb;
mod tables;
mod targets;
mod template_selection;
mod uniprot;
mod workflows;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api_handler::ApiHandler;
use crate::boltz_yaml::DirectorySink;
use crate::config::PrepConfig;
use crate::rcsb::RcsbClient;
use crate::template_selection::{ranking_rows, write_ranking_csv};
use crate::uniprot::UniprotClient;

#[derive(Debug, Subcommand)]
enum Command {
    /// Rank the experimental structures of proteins by functional-domain coverage
    #[command(arg_required_else_help = true)]
    Rank {
        /// UniProt accessions, e.g. P00533
        #[arg(required = true)]
        accessions: Vec<String>,
        /// Ranking table (CSV)
        #[arg(long, short = 'o', default_value = "pdb_rankings.csv")]
        out: PathBuf,
        /// Download the best template of each protein into this directory
        #[arg(long)]
        download_dir: Option<PathBuf>,
    },
    /// Add UniProt sequences to a DrugBank-style target table
    Sequences {
        #[arg(long, short = 'i', default_value = "drugbank-targets.csv")]
        input: PathBuf,
        #[arg(long, short = 'o', default_value = "proteins_with_sequences.csv")]
        output: PathBuf,
    },
    /// Write one affinity config per protein × ligand pair
    Generate {
        /// Proteins with a `Sequence` column
        #[arg(long, default_value = "proteins_with_sequences.csv")]
        proteins: PathBuf,
        /// Directory of ligand CSV files with NP_MRD_ID and SMILES columns
        #[arg(long, default_value = "natural_products")]
        ligands: PathBuf,
        #[arg(long, short = 'o', default_value = "output")]
        output: PathBuf,
        /// Stop after this many files
        #[arg(long)]
        cap: Option<usize>,
    },
    /// Write template-conditioning configs (no template, template, forced template)
    Templates {
        /// CSV with uniprot_id,holo_pdb,apo_pdb,ligand_ccd; the built-in set when omitted
        #[arg(long)]
        targets: Option<PathBuf>,
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,
    },
}

#[derive(Debug, Parser)]
#[command(version, about = "Prepare Boltz inputs from UniProt and RCSB PDB", long_about = None)]
struct Cli {
    /// YAML config file; defaults to boltz_prep.yaml in PROJECT_ROOT when present
    #[arg(long, env = "BOLTZ_PREP_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = PrepConfig::load(cli.config.as_deref())?;
    let api = ApiHandler::new(&config)?;

    match cli.command {
        Command::Rank {
            accessions,
            out,
            download_dir,
        } => {
            let uniprot = UniprotClient::new(api.clone(), &config);
            let mut rankings = Vec::new();
            for (accession, result) in workflows::rank_accessions(
                &uniprot,
                &accessions,
                config.max_parallel_requests,
            ) {
                match result {
                    Ok(ranking) => rankings.push(ranking),
                    Err(e) => error!("{}: {:#}", accession, e),
                }
            }

            let rows: Vec<_> = rankings
                .iter()
                .flat_map(|r| ranking_rows(&r.accession, &r.ordered, &r.domains))
                .collect();
            write_ranking_csv(&out, &rows)?;
            info!("Wrote {} ranked structures to {}", rows.len(), out.display());

            for ranking in &rankings {
                if !ranking.diagnostics.is_empty() {
                    warn!(
                        "{}: {} cross-reference or domain rows rejected",
                        ranking.accession,
                        ranking.diagnostics.len()
                    );
                }
                match ranking.best() {
                    Some(best) => info!(
                        "{}: best template {} chain {} covers {} domain residues",
                        ranking.accession,
                        best.id(),
                        best.span.chain,
                        best.coverage
                    ),
                    None => warn!("{}: no X-ray or EM structure", ranking.accession),
                }
            }

            if let Some(dir) = download_dir {
                let rcsb = RcsbClient::new(api, &config);
                let fetched = workflows::download_best_templates(&rcsb, &rankings, &dir)?;
                info!("Downloaded {} template files into {}", fetched, dir.display());
            }
        }
        Command::Sequences { input, output } => {
            let uniprot = UniprotClient::new(api, &config);
            let proteins = tables::read_csv(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let mut df = workflows::attach_uniprot_sequences(
                &uniprot,
                &proteins,
                config.sequence_chunk_size,
                Duration::from_millis(config.batch_pause_ms),
            )?;
            tables::write_csv(&mut df, &output)?;
            info!("Saved proteins with sequences to {}", output.display());
        }
        Command::Generate {
            proteins,
            ligands,
            output,
            cap,
        } => {
            info!("Reading data...");
            let proteins = tables::read_csv(&proteins)
                .with_context(|| format!("Failed to read {}", proteins.display()))?;
            let ligands = tables::read_ligand_dir(&ligands)
                .with_context(|| format!("Failed to read ligands from {}", ligands.display()))?;
            info!(
                "Read {} proteins and {} ligands.",
                proteins.height(),
                ligands.height()
            );

            let mut sink = DirectorySink::new(&output);
            let count = workflows::generate_affinity_configs(&proteins, &ligands, &mut sink, cap)?;
            info!("{} YAML files in '{}'", count, sink.dir().display());
        }
        Command::Templates {
            targets: targets_file,
            output,
        } => {
            let targets = targets::load_targets(targets_file.as_deref())?;
            let rcsb = RcsbClient::new(api, &config);
            let summary = workflows::generate_template_configs(
                &rcsb,
                &targets,
                &output,
                config.peptide_max_len,
            )?;
            if !summary.failed.is_empty() {
                warn!("Failed targets: {}", summary.failed.join(", "));
            }
        }
    }

    Ok(())
}
