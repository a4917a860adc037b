//! Measurement table loader
//!
//! Reads a CSV table, drops identifier columns, normalizes labels and imputes
//! missing feature values with the column median.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ndarray::Array2;

use crate::error::ClassifierError;
use crate::logic::features::FEATURE_COUNT;
use crate::logic::label::Sex;

/// Column holding the class label
pub const DEFAULT_LABEL_COLUMN: &str = "Gender";

/// Identifier columns that never participate in modeling
pub const DEFAULT_EXCLUDED_COLUMNS: [&str; 2] = ["S. No.", "ID No."];

/// Cell values treated as missing
const MISSING_MARKERS: [&str; 6] = ["", "na", "n/a", "nan", "null", "none"];

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub label_column: String,
    pub excluded_columns: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Cleaned training table
#[derive(Debug, Clone)]
pub struct Dataset {
    /// One row per sample, columns in `feature_names` order
    pub features: Array2<f64>,
    /// Label codes ("F" / "M"), aligned with rows
    pub labels: Vec<String>,
    pub feature_names: Vec<String>,
    /// Number of cells filled by median imputation
    pub imputed_cells: usize,
}

impl Dataset {
    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    /// (label code, count) in ascending label order
    pub fn class_distribution(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for label in &self.labels {
            match counts.iter_mut().find(|(l, _)| l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((label.clone(), 1)),
            }
        }
        counts.sort();
        counts
    }
}

/// Load a CSV measurement table from disk
pub fn load_csv(path: &Path, options: &LoadOptions) -> Result<Dataset, ClassifierError> {
    let file = File::open(path)
        .map_err(|e| ClassifierError::DataLoad(format!("{}: {}", path.display(), e)))?;
    let dataset = read_csv(BufReader::new(file), options)?;

    tracing::info!(
        "Dataset loaded from {}: {} samples x {} features",
        path.display(),
        dataset.n_samples(),
        dataset.feature_names.len()
    );
    for (label, count) in dataset.class_distribution() {
        tracing::info!(
            "  {}: {} ({:.1}%)",
            label,
            count,
            count as f64 * 100.0 / dataset.n_samples() as f64
        );
    }
    if dataset.imputed_cells > 0 {
        tracing::info!("  {} missing values imputed with column medians", dataset.imputed_cells);
    }

    Ok(dataset)
}

/// Parse a CSV measurement table from any reader
pub fn read_csv<R: Read>(reader: R, options: &LoadOptions) -> Result<Dataset, ClassifierError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| ClassifierError::DataLoad(e.to_string()))?
        .clone();

    let label_idx = headers
        .iter()
        .position(|h| h == options.label_column)
        .ok_or_else(|| {
            ClassifierError::DataLoad(format!("label column '{}' not found", options.label_column))
        })?;

    let feature_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != label_idx && !options.excluded_columns.iter().any(|e| e.as_str() == *h))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    if feature_columns.len() != FEATURE_COUNT {
        return Err(ClassifierError::DataLoad(format!(
            "expected {} feature columns, found {}",
            FEATURE_COUNT,
            feature_columns.len()
        )));
    }

    let mut rows: Vec<Vec<Option<f64>>> = Vec::new();
    let mut labels = Vec::new();

    for (line, record) in reader.records().enumerate() {
        // Header is line 1
        let row_number = line + 2;
        let record = record.map_err(|e| ClassifierError::DataLoad(e.to_string()))?;

        let raw_label = record.get(label_idx).unwrap_or("");
        if raw_label.is_empty() {
            tracing::warn!("Row {}: empty label, skipping", row_number);
            continue;
        }
        let sex = Sex::parse(raw_label).ok_or_else(|| {
            ClassifierError::DataLoad(format!("row {}: unrecognized label '{}'", row_number, raw_label))
        })?;

        let values = feature_columns
            .iter()
            .map(|(idx, name)| parse_cell(record.get(*idx).unwrap_or(""), row_number, name))
            .collect::<Result<Vec<_>, _>>()?;

        rows.push(values);
        labels.push(sex.code().to_string());
    }

    if rows.is_empty() {
        return Err(ClassifierError::DataLoad("table contains no labeled rows".into()));
    }

    let feature_names: Vec<String> = feature_columns.into_iter().map(|(_, name)| name).collect();
    let (features, imputed_cells) = impute_with_median(&rows, &feature_names)?;

    Ok(Dataset {
        features,
        labels,
        feature_names,
        imputed_cells,
    })
}

fn parse_cell(raw: &str, row: usize, column: &str) -> Result<Option<f64>, ClassifierError> {
    if MISSING_MARKERS.contains(&raw.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ClassifierError::DataLoad(format!(
            "row {}: column '{}' has non-numeric value '{}'",
            row, column, raw
        ))),
    }
}

/// Fill gaps with the median of the whole column.
///
/// The median is taken over every loaded row, before the train/test split,
/// so held-out rows contribute to it. This keeps artifacts reproducible from
/// the raw table alone at the cost of a small leak into the held-out score.
fn impute_with_median(
    rows: &[Vec<Option<f64>>],
    feature_names: &[String],
) -> Result<(Array2<f64>, usize), ClassifierError> {
    let n_cols = feature_names.len();
    let mut medians = Vec::with_capacity(n_cols);

    for (j, name) in feature_names.iter().enumerate() {
        let mut present: Vec<f64> = rows.iter().filter_map(|r| r[j]).collect();
        let m = median(&mut present).ok_or_else(|| {
            ClassifierError::DataLoad(format!("column '{}' has no values", name))
        })?;
        medians.push(m);
    }

    let mut imputed = 0;
    let matrix = Array2::from_shape_fn((rows.len(), n_cols), |(i, j)| {
        rows[i][j].unwrap_or_else(|| {
            imputed += 1;
            medians[j]
        })
    });

    Ok((matrix, imputed))
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> String {
        let features: Vec<String> = (1..=FEATURE_COUNT).map(|i| format!("M{}", i)).collect();
        format!("S. No.,ID No.,{},Gender", features.join(","))
    }

    fn row(serial: usize, values: &[&str], label: &str) -> String {
        format!("{},ID{},{},{}", serial, serial, values.join(","), label)
    }

    #[test]
    fn test_drops_identifier_columns() {
        let v: Vec<String> = (0..FEATURE_COUNT).map(|i| format!("{}.5", i)).collect();
        let v: Vec<&str> = v.iter().map(String::as_str).collect();
        let csv = format!("{}\n{}\n{}\n", header(), row(1, &v, "M"), row(2, &v, "Female"));

        let ds = read_csv(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.features.dim(), (2, FEATURE_COUNT));
        assert_eq!(ds.feature_names[0], "M1");
        assert_eq!(ds.labels, vec!["M", "F"]);
        assert_eq!(ds.features[[0, 0]], 0.5);
    }

    #[test]
    fn test_median_imputation_over_full_table() {
        let mut rows = Vec::new();
        for (i, first) in ["1", "", "3", "10"].iter().enumerate() {
            let mut v = vec!["1"; FEATURE_COUNT];
            v[0] = *first;
            rows.push(row(i, &v, if i % 2 == 0 { "F" } else { "M" }));
        }
        let csv = format!("{}\n{}\n", header(), rows.join("\n"));

        let ds = read_csv(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.imputed_cells, 1);
        // median of {1, 3, 10}
        assert_eq!(ds.features[[1, 0]], 3.0);
    }

    #[test]
    fn test_missing_label_column() {
        let csv = "a,b\n1,2\n";
        let err = read_csv(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ClassifierError::DataLoad(_)));
    }

    #[test]
    fn test_non_numeric_cell_is_rejected() {
        let mut v = vec!["1"; FEATURE_COUNT];
        v[4] = "abc";
        let csv = format!("{}\n{}\n", header(), row(1, &v, "F"));
        let err = read_csv(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("M5"));
    }

    #[test]
    fn test_empty_label_rows_are_skipped() {
        let v = vec!["2"; FEATURE_COUNT];
        let csv = format!("{}\n{}\n{}\n", header(), row(1, &v, ""), row(2, &v, "m"));
        let ds = read_csv(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.n_samples(), 1);
        assert_eq!(ds.class_distribution(), vec![("M".to_string(), 1)]);
    }

    #[test]
    fn test_unreadable_source() {
        let err = load_csv(Path::new("/nonexistent/table.csv"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ClassifierError::DataLoad(_)));
    }
}
