//! Common routines for handling input data.
use crate::id::Label;
use crate::matrix::LabelledMatrix;
use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use nalgebra::DMatrix;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a series of type `T`s from a CSV file.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<impl Iterator<Item = T>> {
    let vec = read_csv_internal(file_path).with_context(|| input_err_msg(file_path))?;
    ensure!(!vec.is_empty(), "CSV file {} cannot be empty", file_path.display());

    Ok(vec.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    deserialise_records(reader)
}

/// Read a series of type `T`s from a string containing CSV data
pub fn parse_csv<T: DeserializeOwned>(csv_data: &str) -> Result<Vec<T>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());
    deserialise_records(reader)
}

fn deserialise_records<T, R>(reader: csv::Reader<R>) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: std::io::Read,
{
    let vec = reader
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Tokens which mark a missing value in a table (in addition to an empty cell)
const MISSING_VALUE_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Parse a single cell of a table, treating missing values as zero
fn parse_cell(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() || MISSING_VALUE_TOKENS.contains(&raw) {
        return Ok(0.0);
    }

    let value: f64 = raw
        .parse()
        .with_context(|| format!("'{raw}' is not a number"))?;
    if value.is_nan() {
        return Ok(0.0);
    }
    ensure!(!value.is_infinite(), "Value '{raw}' is not finite");

    Ok(value)
}

/// Read a labelled matrix from a CSV file.
///
/// The first row holds the column labels and the first column holds the row labels (the top-left
/// cell is ignored). Labels are trimmed and lower-cased. Empty cells, missing cells and cells
/// holding a missing-value marker such as `NA` are read as zero.
pub fn read_labelled_matrix(file_path: &Path) -> Result<LabelledMatrix> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;
    read_labelled_matrix_from_reader(reader).with_context(|| input_err_msg(file_path))
}

/// Read a labelled matrix from a string containing CSV data
pub fn parse_labelled_matrix(csv_data: &str) -> Result<LabelledMatrix> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_data.as_bytes());
    read_labelled_matrix_from_reader(reader)
}

fn read_labelled_matrix_from_reader<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<LabelledMatrix> {
    let col_labels = reader
        .headers()?
        .iter()
        .skip(1)
        .map(Label::new)
        .collect_vec();
    let ncols = col_labels.len();

    let mut row_labels = Vec::new();
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(row_label) = record.get(0) else {
            continue;
        };
        let row_label = Label::new(row_label);
        ensure!(
            record.len() <= ncols + 1,
            "Row '{row_label}' has {} values but there are only {ncols} columns",
            record.len() - 1
        );

        let mut row = vec![0.0; ncols];
        for (col, raw) in record.iter().skip(1).enumerate() {
            row[col] = parse_cell(raw)
                .with_context(|| format!("Invalid value in row '{row_label}', column {}", col + 2))?;
        }

        row_labels.push(row_label);
        values.extend(row);
    }

    if row_labels.is_empty() && ncols == 0 {
        bail!("Table is empty");
    }

    let data = DMatrix::from_row_slice(row_labels.len(), ncols, &values);
    LabelledMatrix::new(row_labels, col_labels, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, labelled_matrix};
    use nalgebra::dmatrix;
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello,1\nworld,2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );

        // File with no data (only column headers)
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_toml() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Value {
            value: u32,
        }

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "value = 1").unwrap();
        }
        assert_eq!(read_toml::<Value>(&file_path).unwrap(), Value { value: 1 });

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "bad toml syntax").unwrap();
        }
        assert!(read_toml::<Value>(&file_path).is_err());
    }

    #[test]
    fn test_parse_labelled_matrix() {
        let matrix = parse_labelled_matrix(
            ",Sector A , sector b
 CO2,1.5,2
CH4,,3",
        )
        .unwrap();
        assert_eq!(
            matrix,
            labelled_matrix(
                &["co2", "ch4"],
                &["sector a", "sector b"],
                dmatrix![1.5, 2.0; 0.0, 3.0]
            )
        );
    }

    #[test]
    fn test_parse_labelled_matrix_short_row() {
        let matrix = parse_labelled_matrix("label,a,b\nx,1\n").unwrap();
        assert_eq!(matrix, labelled_matrix(&["x"], &["a", "b"], dmatrix![1.0, 0.0]));
    }

    #[test]
    fn test_parse_labelled_matrix_bad_value() {
        assert_error!(
            parse_labelled_matrix("label,a\nx,abc\n"),
            "Invalid value in row 'x', column 2"
        );
    }

    #[rstest]
    #[case("NA")]
    #[case("N/A")]
    #[case("#N/A")]
    #[case("NaN")]
    #[case("nan")]
    #[case("NULL")]
    #[case("null")]
    #[case("None")]
    #[case("<NA>")]
    #[case(" NA ")]
    fn test_parse_labelled_matrix_missing_value(#[case] cell: &str) {
        let matrix = parse_labelled_matrix(&format!("label,a,b\nx,1,{cell}\n")).unwrap();
        assert_eq!(matrix, labelled_matrix(&["x"], &["a", "b"], dmatrix![1.0, 0.0]));
    }

    #[rstest]
    #[case("inf")]
    #[case("-inf")]
    #[case("Infinity")]
    fn test_parse_labelled_matrix_infinite_value(#[case] cell: &str) {
        assert_error!(
            parse_labelled_matrix(&format!("label,a\nx,{cell}\n")),
            "Invalid value in row 'x', column 2"
        );
    }

    #[test]
    fn test_parse_labelled_matrix_too_many_values() {
        assert_error!(
            parse_labelled_matrix("label,a\nx,1,2\n"),
            "Row 'x' has 2 values but there are only 1 columns"
        );
    }

    #[test]
    fn test_parse_labelled_matrix_duplicate_labels() {
        assert_error!(
            parse_labelled_matrix("label,a\nx,1\n X,2\n"),
            "Duplicate row label 'x'"
        );
    }

    #[test]
    fn test_read_labelled_matrix_file() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "s,a\nb,4");
        let matrix = read_labelled_matrix(&file_path).unwrap();
        assert_eq!(matrix, labelled_matrix(&["b"], &["a"], dmatrix![4.0]));

        assert!(read_labelled_matrix(&dir.path().join("missing.csv")).is_err());
    }
}
