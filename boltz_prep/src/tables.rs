// src/tables.rs

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

pub const UNIPROT_ID: &str = "UniProt ID";
pub const SEQUENCE: &str = "Sequence";
pub const LIGAND_ID: &str = "NP_MRD_ID";
pub const SMILES: &str = "SMILES";

pub fn read_csv(file_path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(file_path)))?
        .finish()
}

pub fn write_csv(df: &mut DataFrame, file_path: &Path) -> PolarsResult<()> {
    let mut file = File::create(file_path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!("Saved {} rows to {}", df.height(), file_path.display());
    Ok(())
}

/// Column values as strings, whatever their inferred dtype; nulls stay `None`.
pub fn optional_strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Like [`optional_strings`] with nulls as empty strings.
pub fn strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    Ok(optional_strings(df, name)?
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

/// Drops rows where any of `columns` is null or only whitespace.
pub fn filter_blank(df: &DataFrame, columns: &[&str]) -> PolarsResult<DataFrame> {
    let values = columns
        .iter()
        .map(|c| optional_strings(df, c))
        .collect::<PolarsResult<Vec<_>>>()?;
    let mask: BooleanChunked = (0..df.height())
        .map(|row| {
            values
                .iter()
                .all(|col| col[row].as_deref().is_some_and(|s| !s.trim().is_empty()))
        })
        .collect();
    let filtered = df.filter(&mask)?;
    debug!(
        "Blank filter on {:?}: {} -> {} rows",
        columns,
        df.height(),
        filtered.height()
    );
    Ok(filtered)
}

/// Stacks the ligand ID and SMILES columns of every `*.csv` in `dir`, in
/// file-name order.
pub fn read_ligand_dir(dir: &Path) -> PolarsResult<DataFrame> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    paths.sort();

    let mut combined: Option<DataFrame> = None;
    for path in &paths {
        debug!("Reading ligands from {}", path.display());
        let df = read_csv(path)?
            .lazy()
            .select([
                col(LIGAND_ID).cast(DataType::String),
                col(SMILES).cast(DataType::String),
            ])
            .collect()?;
        match combined.as_mut() {
            Some(all) => {
                all.vstack_mut(&df)?;
            }
            None => combined = Some(df),
        }
    }

    combined.ok_or_else(|| {
        PolarsError::NoData(format!("no ligand CSV files in {}", dir.display()).into())
    })
}

/// Adds a `Sequence` column looked up by the trimmed accession in
/// `id_column`.
pub fn attach_sequences(
    df: &mut DataFrame,
    id_column: &str,
    sequences: &HashMap<String, String>,
) -> PolarsResult<()> {
    let mapped: Vec<Option<String>> = optional_strings(df, id_column)?
        .into_iter()
        .map(|id| id.and_then(|id| sequences.get(id.trim()).cloned()))
        .collect();
    df.with_column(Series::new(PlSmallStr::from(SEQUENCE), mapped))?;
    Ok(())
}
