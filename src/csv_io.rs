//! CSV batch uploads and result downloads.

use crate::engine::PredictionResult;
use crate::validation::{RawRecord, RawValue};
use std::fmt::Display;
use std::io;
use thiserror::Error;

/// Columns appended to every input row in a result file.
pub const RESULT_COLUMNS: [&str; 6] = [
    "prediction",
    "prediction_label",
    "probability_no",
    "probability_yes",
    "confidence",
    "error",
];

const SAMPLE_CSV: &str = "\
age,occupation,marital_status,education,has_credit,housing_loan,personal_loan,contact_mode,month,week_day,last_contact_duration,contacts_per_campaign,N_last_days,nb_previous_contact,previous_outcome,emp_var_rate,cons_price_index,cons_conf_index,euri_3_month,nb_employees
35,admin.,married,university.degree,no,yes,no,cellular,may,thu,261,1,999,0,nonexistent,1.1,93.994,-36.4,4.857,5191
42,management,single,high.school,no,no,yes,telephone,nov,fri,151,2,999,0,nonexistent,-0.1,93.2,-42.0,4.191,5099
28,student,married,university.degree,yes,yes,no,cellular,jul,mon,198,1,999,0,nonexistent,1.4,94.465,-41.8,4.961,5228
";

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("uploaded file is empty")]
    Empty,
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{results} results for {records} records")]
    LengthMismatch { records: usize, results: usize },
}

/// Rows of an uploaded CSV, with the header order kept for the response.
#[derive(Clone, Debug, PartialEq)]
pub struct CsvBatch {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

/// Read a CSV upload; every cell becomes text, empty cells become missing.
///
/// Rows may be ragged: absent trailing cells leave their fields out of the
/// record and cells past the last header are dropped, so a bad row surfaces
/// as a validation error for that row alone.
pub fn read_records<R: io::Read>(reader: R) -> Result<CsvBatch, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(CsvError::Empty);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| {
                let value = if cell.is_empty() {
                    RawValue::Missing
                } else {
                    RawValue::Text(cell.to_string())
                };
                (name.as_str(), value)
            })
            .collect();
        records.push(record);
    }

    if records.is_empty() {
        return Err(CsvError::Empty);
    }
    Ok(CsvBatch { headers, records })
}

/// Write the input columns followed by [`RESULT_COLUMNS`], one row per record.
pub fn write_results<W, E>(
    writer: W,
    batch: &CsvBatch,
    results: &[Result<PredictionResult, E>],
) -> Result<(), CsvError>
where
    W: io::Write,
    E: Display,
{
    if batch.records.len() != results.len() {
        return Err(CsvError::LengthMismatch {
            records: batch.records.len(),
            results: results.len(),
        });
    }

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(
        batch
            .headers
            .iter()
            .map(String::as_str)
            .chain(RESULT_COLUMNS),
    )?;

    for (record, result) in batch.records.iter().zip(results) {
        let mut row: Vec<String> = batch
            .headers
            .iter()
            .map(|h| match record.get(h) {
                Some(RawValue::Text(s)) => s.clone(),
                Some(RawValue::Number(n)) => n.to_string(),
                Some(RawValue::Missing) | None => String::new(),
            })
            .collect();
        match result {
            Ok(r) => row.extend([
                r.prediction().to_string(),
                r.prediction_label().to_string(),
                r.probability_negative().to_string(),
                r.probability_positive.to_string(),
                r.confidence().to_string(),
                String::new(),
            ]),
            Err(err) => {
                row.extend(std::iter::repeat(String::new()).take(RESULT_COLUMNS.len() - 1));
                row.push(err.to_string());
            }
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Three example rows for the built-in bank marketing schema.
pub fn sample_csv() -> &'static str {
    SAMPLE_CSV
}
