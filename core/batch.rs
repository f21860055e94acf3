//! # Batch Record Loading and Prediction Output
//!
//! Reads learner records from a tab-separated file for offline scoring and
//! writes the resulting predictions back out as TSV.
//!
//! - The header uses the same keys as the JSON request body. The two optional
//!   average columns may be absent entirely or left empty per row.
//! - An optional `sample_id` column labels each row; without it, rows are
//!   numbered from 1.
//! - Failures are assumed to be user-input errors and name the offending
//!   column or data row.

use crate::model::Prediction;
use crate::record::LearnerRecord;
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::Path;
use thiserror::Error;

const SAMPLE_ID_COLUMN: &str = "sample_id";

/// Columns every batch file must provide.
const REQUIRED_COLUMNS: [&str; 12] = [
    "genero",
    "campesino",
    "estrato",
    "nivel_educacion",
    "discapacidad",
    "tipo_formacion",
    "victima_conflicto",
    "tiempo_segundos",
    "puntaje_eje",
    "autoidentificacion_etnica",
    "eje_final",
    "nivel",
];

/// Records read from a batch file, with one identifier per record.
#[derive(Debug)]
pub struct RecordBatch {
    pub sample_ids: Vec<String>,
    pub records: Vec<LearnerRecord>,
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Error reading tab-separated input: {0}")]
    CsvError(#[from] csv::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error("Data row {row} could not be read as a learner record: {source}")]
    InvalidRow { row: usize, source: csv::Error },
    #[error("Data row {row} holds a non-finite value in column '{column}'.")]
    NonFiniteValue { row: usize, column: &'static str },
    #[error("The input file contains a header but no data rows.")]
    NoRows,
    #[error("Got {predictions} predictions for {ids} sample identifiers.")]
    LengthMismatch { ids: usize, predictions: usize },
}

impl DataError {
    /// True when the input file itself is malformed, as opposed to an I/O
    /// failure or a caller bug.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DataError::ColumnNotFound(_)
                | DataError::InvalidRow { .. }
                | DataError::NonFiniteValue { .. }
                | DataError::NoRows
        )
    }
}

/// Loads and validates a TSV batch of learner records.
pub fn load_records(path: impl AsRef<Path>) -> Result<RecordBatch, DataError> {
    let path = path.as_ref();
    log::info!("Loading learner records from '{}'", path.display());

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(File::open(path)?);

    let headers = reader.headers()?.clone();
    let present: HashSet<&str> = headers.iter().collect();
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|col| !present.contains(*col)) {
        return Err(DataError::ColumnNotFound(missing.to_string()));
    }
    let sample_id_idx = headers.iter().position(|h| h == SAMPLE_ID_COLUMN);

    let mut sample_ids = Vec::new();
    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row_number = idx + 1;
        let row = row.map_err(|source| DataError::InvalidRow {
            row: row_number,
            source,
        })?;
        let record: LearnerRecord =
            row.deserialize(Some(&headers))
                .map_err(|source| DataError::InvalidRow {
                    row: row_number,
                    source,
                })?;
        if let Some(column) = record.non_finite_field() {
            return Err(DataError::NonFiniteValue {
                row: row_number,
                column,
            });
        }

        let sample_id = sample_id_idx
            .and_then(|i| row.get(i))
            .filter(|id| !id.is_empty())
            .map_or_else(|| row_number.to_string(), str::to_string);

        sample_ids.push(sample_id);
        records.push(record);
    }

    if records.is_empty() {
        return Err(DataError::NoRows);
    }

    log::info!("Loaded {} learner records", records.len());
    Ok(RecordBatch {
        sample_ids,
        records,
    })
}

/// Writes predictions as TSV: `sample_id`, `probabilidad_exito`, `prediccion`.
pub fn save_predictions(
    path: impl AsRef<Path>,
    sample_ids: &[String],
    predictions: &[Prediction],
) -> Result<(), DataError> {
    if sample_ids.len() != predictions.len() {
        return Err(DataError::LengthMismatch {
            ids: sample_ids.len(),
            predictions: predictions.len(),
        });
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_ref())?;
    writer.write_record([SAMPLE_ID_COLUMN, "probabilidad_exito", "prediccion"])?;
    for (id, prediction) in sample_ids.iter().zip(predictions) {
        writer.write_record([
            id.as_str(),
            &format!("{:.6}", prediction.probability),
            &prediction.label.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    const HEADER: &str = "sample_id\tgenero\tcampesino\testrato\tnivel_educacion\tdiscapacidad\ttipo_formacion\tvictima_conflicto\ttiempo_segundos\tpuntaje_eje\tautoidentificacion_etnica\teje_final\tnivel\tpromedio_lineas";

    fn create_test_tsv(content: &str) -> io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", content)?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_records_success() {
        let content = format!(
            "{HEADER}\n\
             s-1\tFemenino\tfalse\t3\tEducación Media\tfalse\tVirtual\tfalse\t1200\t78.5\tNegro, Mulato\tProgramación\tBásico\t\n\
             \tMasculino\ttrue\t1\tEspecialización\ttrue\tHíbrida\ttrue\t30.5\t40\tIndígena\tAnálisis de Datos\tAvanzado\t4.2"
        );
        let file = create_test_tsv(&content).unwrap();
        let batch = load_records(file.path()).unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.sample_ids, vec!["s-1".to_string(), "2".to_string()]);

        let first = &batch.records[0];
        assert_eq!(first.gender, "Femenino");
        assert_eq!(first.socioeconomic_stratum, 3);
        assert_eq!(first.elapsed_seconds, 1200.0);
        assert_eq!(first.ethnic_self_identification, "Negro, Mulato");
        assert_eq!(first.avg_lines, None);
        assert_eq!(first.avg_areas, None);

        let second = &batch.records[1];
        assert!(second.is_rural_worker);
        assert_eq!(second.training_modality, "Híbrida");
        assert_eq!(second.avg_lines, Some(4.2));
    }

    #[test]
    fn test_missing_sample_id_column_numbers_rows() {
        let header = HEADER.replacen("sample_id\t", "", 1);
        let row = "Femenino\tfalse\t3\tEducación Media\tfalse\tVirtual\tfalse\t1200\t78.5\tno sé\tProgramación\tBásico\t";
        let file = create_test_tsv(&format!("{header}\n{row}\n{row}")).unwrap();
        let batch = load_records(file.path()).unwrap();
        assert_eq!(batch.sample_ids, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_error_column_not_found() {
        let header = HEADER.replace("\tnivel\t", "\t");
        let file = create_test_tsv(&header).unwrap();
        match load_records(file.path()) {
            Err(DataError::ColumnNotFound(col)) => assert_eq!(col, "nivel"),
            other => panic!("Expected ColumnNotFound(nivel), got {:?}", other),
        }
    }

    #[test]
    fn test_error_names_bad_row() {
        let content = format!(
            "{HEADER}\n\
             a\tFemenino\tfalse\t3\tEducación Media\tfalse\tVirtual\tfalse\t1200\t78.5\tno sé\tProgramación\tBásico\t\n\
             b\tFemenino\tquizás\t3\tEducación Media\tfalse\tVirtual\tfalse\t1200\t78.5\tno sé\tProgramación\tBásico\t"
        );
        let file = create_test_tsv(&content).unwrap();
        match load_records(file.path()) {
            Err(DataError::InvalidRow { row, .. }) => assert_eq!(row, 2),
            other => panic!("Expected InvalidRow, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let content = format!(
            "{HEADER}\n\
             a\tFemenino\tfalse\t3\tEducación Media\tfalse\tVirtual\tfalse\t1200\t78.5\tno sé\tProgramación\tBásico\t\n\
             b\tFemenino\tfalse\t3\tEducación Media\tfalse\tVirtual\tfalse\t1200\tNaN\tno sé\tProgramación\tBásico\t\n\
             c\tFemenino\tfalse\t3\tEducación Media\tfalse\tVirtual\tfalse\tinf\t78.5\tno sé\tProgramación\tBásico\t"
        );
        let file = create_test_tsv(&content).unwrap();
        match load_records(file.path()) {
            Err(err @ DataError::NonFiniteValue { .. }) => {
                assert!(err.is_client_error());
                assert!(matches!(
                    err,
                    DataError::NonFiniteValue {
                        row: 2,
                        column: "puntaje_eje"
                    }
                ));
            }
            other => panic!("Expected NonFiniteValue, got {:?}", other),
        }
    }

    #[test]
    fn test_error_no_rows() {
        let file = create_test_tsv(HEADER).unwrap();
        assert!(matches!(load_records(file.path()), Err(DataError::NoRows)));
    }

    #[test]
    fn test_save_predictions_format() {
        let file = NamedTempFile::new().unwrap();
        let ids = vec!["a".to_string(), "b".to_string()];
        let predictions = vec![
            Prediction {
                probability: 0.123456789,
                label: 0,
            },
            Prediction {
                probability: 0.9,
                label: 1,
            },
        ];
        save_predictions(file.path(), &ids, &predictions).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            written,
            "sample_id\tprobabilidad_exito\tprediccion\na\t0.123457\t0\nb\t0.900000\t1\n"
        );

        assert!(matches!(
            save_predictions(file.path(), &ids[..1], &predictions),
            Err(DataError::LengthMismatch { ids: 1, predictions: 2 })
        ));
    }
}
