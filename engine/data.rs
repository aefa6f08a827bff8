//! # Tabular Ingestion and Output
//!
//! The engine's only external interface is a table: one row per respondent in,
//! the same rows with derived columns appended out. This module is the
//! exclusive entry point for that data. Column names are dataset-specific and
//! come from the [`ColumnMap`]; failures are assumed to be user-input errors
//! and the [`DataError`] variants are written to give actionable feedback.
//!
//! Persistence details stop here: nothing downstream of this module knows the
//! rows came from CSV.

use crate::config::{ColumnMap, RoundingPolicy};
use crate::types::{RawRecord, RespondentKey, ScoredRecord, TobaccoType};
use itertools::Itertools;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A comprehensive error type for all table reading and writing failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check the column map in your config against the file's header row."
    )]
    ColumnNotFound(String),
    #[error("The input file has no header row.")]
    MissingHeader,
    #[error(
        "Output file '{0}' already exists. It will not be overwritten; remove or rename it before running."
    )]
    OutputExists(PathBuf),
    #[error("Input and scored row counts disagree ({input} vs {scored}); this is a bug.")]
    RowCountMismatch { input: usize, scored: usize },
}

/// Header positions of every mapped column, resolved once per file.
#[derive(Debug, Clone)]
struct ColumnIndices {
    respondent_key: usize,
    lifetime_smoking: usize,
    threshold: [usize; 5],
    peak_frequency: [usize; 5],
    time_to_first_use: usize,
    difficulty_refraining: usize,
    hardest_to_give_up: usize,
    more_in_morning: usize,
    use_when_ill: usize,
}

/// One ingested table: the verbatim header and rows (kept so the output can
/// echo the input unchanged), plus the extracted raw records in row order.
#[derive(Debug)]
pub struct InputTable {
    pub headers: csv::StringRecord,
    pub rows: Vec<csv::StringRecord>,
    pub records: Vec<RawRecord>,
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
}

fn resolve_columns(
    headers: &csv::StringRecord,
    columns: &ColumnMap,
) -> Result<ColumnIndices, DataError> {
    if headers.is_empty() {
        return Err(DataError::MissingHeader);
    }

    let respondent_key = find_column(headers, &columns.respondent_key)?;
    let lifetime_smoking = find_column(headers, &columns.lifetime_smoking)?;

    let mut threshold = [0usize; 5];
    let mut peak_frequency = [0usize; 5];
    for tobacco_type in TobaccoType::ALL {
        threshold[tobacco_type.slot()] = find_column(headers, columns.threshold.get(tobacco_type))?;
        peak_frequency[tobacco_type.slot()] =
            find_column(headers, columns.peak_frequency.get(tobacco_type))?;
    }

    Ok(ColumnIndices {
        respondent_key,
        lifetime_smoking,
        threshold,
        peak_frequency,
        time_to_first_use: find_column(headers, &columns.components.time_to_first_use)?,
        difficulty_refraining: find_column(headers, &columns.components.difficulty_refraining)?,
        hardest_to_give_up: find_column(headers, &columns.components.hardest_to_give_up)?,
        more_in_morning: find_column(headers, &columns.components.more_in_morning)?,
        use_when_ill: find_column(headers, &columns.components.use_when_ill)?,
    })
}

fn cell(row: &csv::StringRecord, index: usize) -> String {
    row.get(index).unwrap_or("").trim().to_string()
}

fn extract_record(row: &csv::StringRecord, indices: &ColumnIndices) -> RawRecord {
    RawRecord {
        key: RespondentKey(cell(row, indices.respondent_key)),
        lifetime_smoking: cell(row, indices.lifetime_smoking),
        threshold: std::array::from_fn(|slot| cell(row, indices.threshold[slot])),
        peak_frequency: std::array::from_fn(|slot| cell(row, indices.peak_frequency[slot])),
        time_to_first_use: cell(row, indices.time_to_first_use),
        difficulty_refraining: cell(row, indices.difficulty_refraining),
        hardest_to_give_up: cell(row, indices.hardest_to_give_up),
        more_in_morning: cell(row, indices.more_in_morning),
        use_when_ill: cell(row, indices.use_when_ill),
    }
}

/// Reads the full respondent table, resolving the column map against the
/// header row exactly once.
pub fn read_respondents(path: &Path, columns: &ColumnMap) -> Result<InputTable, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let indices = resolve_columns(&headers, columns)?;

    let mut rows = Vec::new();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(extract_record(&row, &indices));
        rows.push(row);
    }

    log::info!(
        "read {} respondents from '{}'",
        records.len(),
        path.display()
    );

    Ok(InputTable {
        headers,
        rows,
        records,
    })
}

/// The derived columns appended to every output row, in order.
pub const DERIVED_HEADERS: [&str; 11] = [
    "is_threshold_eligible",
    "primary_tobacco_type",
    "resolved_cpd_item",
    "ftnd_cpd",
    "ftnd_time_to_first_use",
    "ftnd_difficulty_refraining",
    "ftnd_hardest_to_give_up",
    "ftnd_more_in_morning",
    "ftnd_use_when_ill",
    "ftnd_sum_score",
    "qc_flags",
];

fn optional_u8(value: Option<u8>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn derived_cells(scored: &ScoredRecord, rounding: RoundingPolicy) -> Vec<String> {
    let mut cells = Vec::with_capacity(DERIVED_HEADERS.len());
    cells.push(if scored.is_threshold_eligible { "1" } else { "0" }.to_string());
    cells.push(
        scored
            .primary_tobacco_type
            .map(|t| t.label().to_string())
            .unwrap_or_else(|| "none".to_string()),
    );
    cells.push(optional_u8(scored.resolved_cpd_item));
    for value in scored.components.0 {
        cells.push(optional_u8(value));
    }
    cells.push(
        scored
            .ftnd_sum_score
            .map(|s| rounding.apply(s).to_string())
            .unwrap_or_default(),
    );
    cells.push(scored.qc_flags.iter().map(|f| f.to_string()).join(";"));
    cells
}

/// Writes the scored table: every input row echoed verbatim with the derived
/// columns of [`DERIVED_HEADERS`] appended. Absent values serialize as empty
/// fields. Refuses to overwrite an existing file.
pub fn write_scored(
    path: &Path,
    table: &InputTable,
    scored: &[ScoredRecord],
    rounding: RoundingPolicy,
) -> Result<(), DataError> {
    if path.exists() {
        return Err(DataError::OutputExists(path.to_path_buf()));
    }
    if table.rows.len() != scored.len() {
        return Err(DataError::RowCountMismatch {
            input: table.rows.len(),
            scored: scored.len(),
        });
    }

    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;

    let mut header_row: Vec<String> = table.headers.iter().map(str::to_string).collect();
    header_row.extend(DERIVED_HEADERS.iter().map(|h| h.to_string()));
    writer.write_record(&header_row)?;

    for (row, record) in table.rows.iter().zip(scored) {
        let mut out: Vec<String> = row.iter().map(str::to_string).collect();
        // Ragged input rows are padded so the derived columns stay aligned.
        while out.len() < table.headers.len() {
            out.push(String::new());
        }
        out.extend(derived_cells(record, rounding));
        writer.write_record(&out)?;
    }

    writer.flush()?;
    log::info!("wrote {} scored rows to '{}'", scored.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::config::test_support::EXAMPLE_TOML;
    use std::io::Write;

    fn config() -> EngineConfig {
        EngineConfig::from_toml_str(EXAMPLE_TOML).unwrap()
    }

    const HEADER: &str = "SEQN,SMQ020,SMD630,SMD640,SMD650,SMD660,SMD670,\
                          SMD631,SMD641,SMD651,SMD661,SMD671,\
                          SMQ077,SMQ078,SMQ079,SMQ080,SMQ081";

    fn write_input(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("input.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "{body}").unwrap();
        path
    }

    #[test]
    fn reads_mapped_columns_into_raw_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input(&dir, "51624,1,1,2,2,2,2,4,,,,,1,1,1,1,1");

        let table = read_respondents(&path, &config().columns).unwrap();
        assert_eq!(table.records.len(), 1);
        let record = &table.records[0];
        assert_eq!(record.key.0, "51624");
        assert_eq!(record.lifetime_smoking, "1");
        assert_eq!(record.threshold[0], "1");
        assert_eq!(record.threshold[1], "2");
        assert_eq!(record.peak_frequency[0], "4");
        assert_eq!(record.peak_frequency[1], "");
        assert_eq!(record.time_to_first_use, "1");
    }

    #[test]
    fn unknown_column_is_an_actionable_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        std::fs::write(&path, "SEQN,other\n1,2\n").unwrap();

        let err = read_respondents(&path, &config().columns).unwrap_err();
        match err {
            DataError::ColumnNotFound(name) => assert_eq!(name, "SMQ020"),
            other => panic!("expected ColumnNotFound, got {other}"),
        }
    }

    #[test]
    fn output_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(&dir, "51624,1,1,2,2,2,2,4,,,,,1,1,1,1,1");
        let table = read_respondents(&input, &config().columns).unwrap();
        let scored = crate::pipeline::Engine::new(config()).score_batch(&table.records);

        let output = dir.path().join("out.csv");
        std::fs::write(&output, "occupied").unwrap();
        let err = write_scored(&output, &table, &scored, RoundingPolicy::Decimals(2)).unwrap_err();
        assert!(matches!(err, DataError::OutputExists(_)));
    }

    #[test]
    fn output_appends_derived_columns_and_echoes_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(&dir, "51624,1,1,2,2,2,2,4,,,,,1,1,1,1,1");
        let table = read_respondents(&input, &config().columns).unwrap();
        let scored = crate::pipeline::Engine::new(config()).score_batch(&table.records);

        let output = dir.path().join("out.csv");
        write_scored(&output, &table, &scored, RoundingPolicy::Decimals(2)).unwrap();

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 17 + DERIVED_HEADERS.len());
        assert_eq!(&headers[0], "SEQN");
        assert_eq!(&headers[17], "is_threshold_eligible");

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "51624");
        assert_eq!(&row[17], "1"); // eligible
        assert_eq!(&row[18], "cigarette");
        assert_eq!(&row[19], "3"); // resolved cpd item
        assert_eq!(&row[26], "10"); // ftnd_sum_score
        assert_eq!(&row[27], ""); // no qc flags
    }
}
