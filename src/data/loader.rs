use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use reqwest::blocking::Client;
use serde_json::Value as JsonValue;

use crate::config::PipelineConfig;

/// Cell spellings treated as "missing", as the pandas CSV reader does.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ---------------------------------------------------------------------------
// RawTable – untyped table as read from a source
// ---------------------------------------------------------------------------

/// Column names plus rows of optional cells. Missing cells are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

fn na_cell(raw: &str) -> Option<String> {
    if NA_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

// ---------------------------------------------------------------------------
// DataSource – where the raw table comes from
// ---------------------------------------------------------------------------

/// A place the neighbourhood table can be read from.
pub trait DataSource {
    /// Short description (URL, path) used in logs and errors.
    fn origin(&self) -> String;

    /// Read the whole table.
    fn fetch(&self) -> Result<RawTable>;
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn origin(&self) -> String {
        (**self).origin()
    }

    fn fetch(&self) -> Result<RawTable> {
        (**self).fetch()
    }
}

/// CSV served over HTTP(S).
pub struct RemoteCsv {
    url: String,
    client: Client,
}

impl RemoteCsv {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.source_url.clone(), config.timeout)
    }
}

impl DataSource for RemoteCsv {
    fn origin(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<RawTable> {
        debug!("fetching {}", self.url);
        let resp = self
            .client
            .get(&self.url)
            .send()
            .with_context(|| format!("requesting {}", self.url))?;

        if !resp.status().is_success() {
            bail!("request to {} failed with status {}", self.url, resp.status());
        }

        let body = resp.bytes().context("reading response body")?;
        debug!("received {} bytes", body.len());
        parse_csv(body.as_ref())
    }
}

/// A dataset file on disk. Format chosen by extension.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for LocalFile {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<RawTable> {
        load_file(&self.path)
    }
}

/// CSV text already held in memory.
#[derive(Debug, Clone)]
pub struct CsvText(pub String);

impl DataSource for CsvText {
    fn origin(&self) -> String {
        "<in-memory csv>".to_string()
    }

    fn fetch(&self) -> Result<RawTable> {
        parse_csv(self.0.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// File entry-point
// ---------------------------------------------------------------------------

/// Load a raw table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, comma-separated
/// * `.json`    – `[{ "bairro": ..., "regiao": ..., ... }, ...]`
/// * `.parquet` – flat columns of strings and numbers
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            parse_csv(file)
        }
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Parse CSV with a header row.
///
/// Short rows are padded with missing cells, so they are dropped later like
/// any incomplete row. A row with more cells than the header is an error.
pub fn parse_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > columns.len() {
            bail!(
                "CSV row {row_no}: expected {} fields, found {}",
                columns.len(),
                record.len()
            );
        }
        let mut cells: Vec<Option<String>> = record.iter().map(na_cell).collect();
        cells.resize(columns.len(), None);
        rows.push(cells);
    }

    Ok(RawTable { columns, rows })
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Keys absent from a
/// record are missing cells.
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).and_then(json_cell))
                .collect()
        })
        .collect();

    Ok(RawTable { columns, rows })
}

fn json_cell(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) => na_cell(s),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Load a Parquet snapshot, e.g. one written by `df.to_parquet()`.
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        append_batch_rows(&batch, &columns, &mut rows)?;
    }

    Ok(RawTable { columns, rows })
}

/// Append the rows of one batch. Row numbers in errors count from the start
/// of the file, not of the batch.
fn append_batch_rows(
    batch: &RecordBatch,
    columns: &[String],
    rows: &mut Vec<Vec<Option<String>>>,
) -> Result<()> {
    let offset = rows.len();
    for row in 0..batch.num_rows() {
        let cells = batch
            .columns()
            .iter()
            .zip(columns)
            .map(|(col, name)| {
                parquet_cell(col, row)
                    .with_context(|| format!("Row {}, column '{name}'", offset + row))
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(cells);
    }
    Ok(())
}

/// Render one Arrow cell as text. Nulls and NaN floats are missing.
fn parquet_cell(col: &Arc<dyn Array>, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            na_cell(arr.value(row))
        }
        DataType::LargeUtf8 => na_cell(col.as_string::<i64>().value(row)),
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Some(arr.value(row).to_string())
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Some(arr.value(row).to_string())
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            let v = arr.value(row);
            (!v.is_nan()).then(|| v.to_string())
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            let v = arr.value(row);
            (!v.is_nan()).then(|| v.to_string())
        }
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            Some(arr.value(row).to_string())
        }
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn csv_na_tokens_become_missing() {
        let table = parse_csv(",bairro,populacao\n0,Alecrim,NaN\n1,,100\n2,Lagoa Nova,200\n".as_bytes())
            .unwrap();
        assert_eq!(table.columns, ["", "bairro", "populacao"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][2], None);
        assert_eq!(table.rows[1][1], None);
        assert_eq!(table.rows[2][1].as_deref(), Some("Lagoa Nova"));
    }

    #[test]
    fn csv_short_row_is_padded_with_missing_cells() {
        let table = parse_csv("a,b,c\n1,2,3\n4\n".as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], [Some("4".to_string()), None, None]);
    }

    #[test]
    fn csv_long_row_is_an_error() {
        let err = parse_csv("a,b\n1,2\n3,4,5\n".as_bytes()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("CSV row 1"), "{msg}");
        assert!(msg.contains("found 3"), "{msg}");
    }

    #[test]
    fn parquet_errors_count_rows_across_batches() {
        use arrow::array::{ArrayRef, Date32Array};
        use arrow::datatypes::{Field, Schema};

        let schema = Arc::new(Schema::new(vec![Field::new("dia", DataType::Date32, false)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Date32Array::from(vec![19_000])) as ArrayRef],
        )
        .unwrap();

        let mut rows = vec![vec![None]; 1024];
        let err = append_batch_rows(&batch, &["dia".to_string()], &mut rows).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Row 1024, column 'dia'"), "{msg}");
    }

    #[test]
    fn json_records_fill_absent_keys_with_missing() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"bairro": "Tirol", "populacao": 15000}}, {{"bairro": null, "regiao": "leste"}}]"#
        )
        .unwrap();

        let table = load_file(file.path()).unwrap();
        let bairro = table.column_index("bairro").unwrap();
        let pop = table.column_index("populacao").unwrap();
        let regiao = table.column_index("regiao").unwrap();
        assert_eq!(table.rows[0][pop].as_deref(), Some("15000"));
        assert_eq!(table.rows[0][regiao], None);
        assert_eq!(table.rows[1][bairro], None);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_file(Path::new("bairros.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }
}
