use anyhow::{bail, Context, Result};
use log::{debug, warn};

use super::loader::RawTable;
use super::model::{Dataset, NeighborhoodRecord};
use crate::config::NameCorrection;

/// Columns left behind by an earlier `to_csv` that wrote the row index.
const INDEX_COLUMNS: &[&str] = &["", "Unnamed: 0"];

const COL_NAME: &str = "bairro";
const COL_REGION: &str = "regiao";
const COL_POPULATION: &str = "populacao";
const COL_AVERAGE_INCOME: &str = "rendimento_nominal_medio";
const COL_INCOME_PER_PERSON: &str = "renda_mensal_pessoa";
const COL_X: &str = "x";
const COL_Y: &str = "y";

/// A neighbourhood whose name arrives malformed in the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownCorrection {
    /// Zero-based data row in the source, counted before incomplete rows are dropped.
    pub position: usize,
    pub original: &'static str,
    pub corrected: &'static str,
}

pub const NAME_CORRECTIONS: [KnownCorrection; 3] = [
    KnownCorrection {
        position: 0,
        original: "Nossa Senhora da Apresentação",
        corrected: "ns_apresentacao",
    },
    KnownCorrection {
        position: 34,
        original: "Nossa Senhora de Nazaré",
        corrected: "ns_nazare",
    },
    KnownCorrection {
        position: 32,
        original: "Cidade da Esperança",
        corrected: "c_esperanca",
    },
];

/// Positions of the columns the records are built from.
struct ColumnIndex {
    name: usize,
    region: usize,
    population: usize,
    average_income: usize,
    income_per_person: usize,
    x: usize,
    y: usize,
}

impl ColumnIndex {
    fn locate(columns: &[String]) -> Result<Self> {
        let find = |col: &str| {
            columns
                .iter()
                .position(|c| c == col)
                .with_context(|| format!("missing '{col}' column"))
        };
        Ok(Self {
            name: find(COL_NAME)?,
            region: find(COL_REGION)?,
            population: find(COL_POPULATION)?,
            average_income: find(COL_AVERAGE_INCOME)?,
            income_per_person: find(COL_INCOME_PER_PERSON)?,
            x: find(COL_X)?,
            y: find(COL_Y)?,
        })
    }
}

/// A complete row, tagged with its position in the source.
struct SourceRow {
    position: usize,
    cells: Vec<String>,
}

/// Turn a raw table into the cleaned dataset.
///
/// Drops every row with a missing cell in any column, removes the
/// serialization index column, fixes the known malformed names and types the
/// remaining columns.
pub fn clean(table: RawTable, mode: NameCorrection) -> Result<Dataset> {
    let RawTable { mut columns, rows } = table;
    let total = rows.len();

    let mut rows: Vec<SourceRow> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(position, cells)| {
            cells
                .into_iter()
                .collect::<Option<Vec<String>>>()
                .map(|cells| SourceRow { position, cells })
        })
        .collect();
    if rows.len() < total {
        debug!("dropped {} incomplete rows of {total}", total - rows.len());
    }

    if let Some(dropped) = drop_index_column(&mut columns, &mut rows) {
        debug!("removed index column '{dropped}'");
    }

    let index = ColumnIndex::locate(&columns)?;
    apply_corrections(&mut rows, index.name, mode);

    let records = rows
        .iter()
        .map(|row| {
            to_record(row, &index).with_context(|| format!("source row {}", row.position))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Dataset::from_records(records))
}

/// Remove the first index column from the header and from every row.
/// Returns its name, if there was one.
fn drop_index_column(columns: &mut Vec<String>, rows: &mut [SourceRow]) -> Option<String> {
    let idx = columns
        .iter()
        .position(|c| INDEX_COLUMNS.contains(&c.as_str()))?;
    for row in rows.iter_mut() {
        row.cells.remove(idx);
    }
    Some(columns.remove(idx))
}

fn apply_corrections(rows: &mut [SourceRow], name_col: usize, mode: NameCorrection) {
    for fix in &NAME_CORRECTIONS {
        let mut applied = 0;
        for row in rows.iter_mut() {
            let hit = match mode {
                NameCorrection::ByPosition => row.position == fix.position,
                NameCorrection::ByName => fold_name(&row.cells[name_col]) == fold_name(fix.original),
            };
            if hit {
                row.cells[name_col] = fix.corrected.to_string();
                applied += 1;
            }
        }
        if applied == 0 {
            warn!(
                "name correction to '{}' matched no row ({mode:?})",
                fix.corrected
            );
        }
    }
}

/// Lower-cased alphanumerics only, so spacing and punctuation do not matter.
fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn to_record(row: &SourceRow, columns: &ColumnIndex) -> Result<NeighborhoodRecord> {
    let cell = |idx: usize| row.cells[idx].as_str();
    Ok(NeighborhoodRecord {
        name: cell(columns.name).to_string(),
        region: cell(columns.region).trim().to_lowercase(),
        population: parse_count(cell(columns.population), COL_POPULATION)?,
        average_income: parse_amount(cell(columns.average_income), COL_AVERAGE_INCOME)?,
        income_per_person: parse_amount(cell(columns.income_per_person), COL_INCOME_PER_PERSON)?,
        x: parse_coordinate(cell(columns.x), COL_X)?,
        y: parse_coordinate(cell(columns.y), COL_Y)?,
    })
}

/// Whole non-negative number. Accepts `1234.0`, which is how a float column
/// holding integers is written out.
fn parse_count(s: &str, col: &str) -> Result<u64> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u64>() {
        return Ok(n);
    }
    let v: f64 = s
        .parse()
        .with_context(|| format!("'{col}': '{s}' is not a number"))?;
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
        bail!("'{col}': '{s}' is not a non-negative integer");
    }
    Ok(v as u64)
}

fn parse_amount(s: &str, col: &str) -> Result<f64> {
    let v = parse_coordinate(s, col)?;
    if v < 0.0 {
        bail!("'{col}': '{}' is negative", s.trim());
    }
    Ok(v)
}

fn parse_coordinate(s: &str, col: &str) -> Result<f64> {
    let s = s.trim();
    let v: f64 = s
        .parse()
        .with_context(|| format!("'{col}': '{s}' is not a number"))?;
    if !v.is_finite() {
        bail!("'{col}': '{s}' is not finite");
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;

    const HEADER: &str =
        ",bairro,regiao,populacao,rendimento_nominal_medio,renda_mensal_pessoa,x,y\n";

    /// A table of `n` complete rows named `bairro_<i>`.
    fn table(n: usize) -> String {
        let mut csv = HEADER.to_string();
        for i in 0..n {
            csv.push_str(&format!(
                "{i},bairro_{i},{},{},{}.5,{}.25,{},{}\n",
                ["norte", "sul", "leste", "oeste"][i % 4],
                1000 + i,
                i % 5,
                300 + i,
                245_000 + i,
                9_350_000 + i,
            ));
        }
        csv
    }

    fn clean_csv(csv: &str, mode: NameCorrection) -> Result<Dataset> {
        clean(parse_csv(csv.as_bytes())?, mode)
    }

    #[test]
    fn positional_corrections_apply_regardless_of_content() {
        let ds = clean_csv(&table(40), NameCorrection::ByPosition).unwrap();
        assert_eq!(ds.len(), 40);
        assert_eq!(ds.records()[0].name, "ns_apresentacao");
        assert_eq!(ds.records()[32].name, "c_esperanca");
        assert_eq!(ds.records()[34].name, "ns_nazare");
        assert_eq!(ds.records()[1].name, "bairro_1");
        assert_eq!(ds.records()[33].name, "bairro_33");
    }

    #[test]
    fn positions_refer_to_source_rows_not_surviving_rows() {
        let mut csv = table(40);
        // Blank the region of source row 5; rows after it shift down by one.
        csv = csv.replace("5,bairro_5,sul,", "5,bairro_5,,");
        let ds = clean_csv(&csv, NameCorrection::ByPosition).unwrap();
        assert_eq!(ds.len(), 39);
        assert_eq!(ds.records()[31].name, "c_esperanca");
        assert_eq!(ds.records()[33].name, "ns_nazare");
        assert!(ds.iter().all(|r| r.name != "bairro_5"));
    }

    #[test]
    fn correction_for_dropped_row_is_skipped() {
        let csv = table(3).replace("0,bairro_0,norte,1000,", "0,bairro_0,norte,NaN,");
        let ds = clean_csv(&csv, NameCorrection::ByPosition).unwrap();
        assert_eq!(ds.len(), 2);
        assert!(ds.iter().all(|r| r.name != "ns_apresentacao"));
    }

    #[test]
    fn name_mode_matches_original_spelling_anywhere() {
        let csv = table(3)
            .replace("bairro_2", "Nossa Senhora de  Nazaré")
            .replace("bairro_0", "Lagoa Nova");
        let ds = clean_csv(&csv, NameCorrection::ByName).unwrap();
        let names: Vec<&str> = ds.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Lagoa Nova", "bairro_1", "ns_nazare"]);
    }

    #[test]
    fn region_is_lower_cased_and_index_column_dropped() {
        let csv = "Unnamed: 0,bairro,regiao,populacao,rendimento_nominal_medio,renda_mensal_pessoa,x,y\n\
                   7,Tirol,Leste,18000.0,7.9,2500.5,256000,9361000\n";
        let ds = clean_csv(csv, NameCorrection::ByName).unwrap();
        let r = &ds.records()[0];
        assert_eq!(r.region, "leste");
        assert_eq!(r.population, 18000);
        let json = serde_json::to_value(r).unwrap();
        assert!(json.get("Unnamed: 0").is_none());
    }

    #[test]
    fn index_column_is_removed_from_header_and_rows() {
        let mut columns: Vec<String> = ["Unnamed: 0", "bairro", "regiao"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let mut rows = vec![SourceRow {
            position: 0,
            cells: vec!["0".into(), "Tirol".into(), "leste".into()],
        }];

        let dropped = drop_index_column(&mut columns, &mut rows);
        assert_eq!(dropped.as_deref(), Some("Unnamed: 0"));
        assert_eq!(columns, ["bairro", "regiao"]);
        assert_eq!(rows[0].cells, ["Tirol", "leste"]);
        assert_eq!(drop_index_column(&mut columns, &mut rows), None);
    }

    #[test]
    fn missing_required_column_fails() {
        let csv = "bairro,regiao\nTirol,leste\n";
        let err = clean_csv(csv, NameCorrection::ByPosition).unwrap_err();
        assert!(err.to_string().contains("populacao"));
    }

    #[test]
    fn non_numeric_value_fails_with_row_context() {
        let csv = table(2).replace("1001", "lots");
        let err = clean_csv(&csv, NameCorrection::ByPosition).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("source row 1"), "{msg}");
        assert!(msg.contains("populacao"), "{msg}");
    }

    #[test]
    fn fractional_population_is_rejected() {
        assert!(parse_count("12.5", COL_POPULATION).is_err());
        assert!(parse_count("-3", COL_POPULATION).is_err());
        assert_eq!(parse_count("12.0", COL_POPULATION).unwrap(), 12);
    }
}
