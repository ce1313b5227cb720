use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;

/// SplitMix64: enough for reproducible synthetic rows.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[low, high)`, from the top 53 bits.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        low + (high - low) * unit
    }
}

/// Region, centre of its neighbourhoods (metres), income multiplier.
const REGIONS: [(&str, (f64, f64), f64); 4] = [
    ("norte", (247_000.0, 9_365_000.0), 0.6),
    ("sul", (256_000.0, 9_350_000.0), 1.8),
    ("leste", (257_000.0, 9_361_000.0), 2.5),
    ("oeste", (250_000.0, 9_355_000.0), 0.8),
];

const ROWS: usize = 36;

/// Rows whose names the loader corrects, with their original spelling.
const MALFORMED: [(usize, &str); 3] = [
    (0, "Nossa Senhora da Apresentação"),
    (32, "Cidade da Esperança"),
    (34, "Nossa Senhora de Nazaré"),
];

/// Rows written with one blank cell, which the loader drops.
const INCOMPLETE: [usize; 2] = [7, 21];

struct Row {
    name: String,
    region: &'static str,
    population: i64,
    average_income: Option<f64>,
    income_per_person: f64,
    x: f64,
    y: f64,
}

fn generate(rng: &mut SplitMix64) -> Vec<Row> {
    (0..ROWS)
        .map(|i| {
            let (region, (cx, cy), wealth) = REGIONS[i % REGIONS.len()];
            let name = MALFORMED
                .iter()
                .find(|(pos, _)| *pos == i)
                .map(|(_, n)| n.to_string())
                .unwrap_or_else(|| format!("Bairro {i:02}"));
            let average_income = (rng.uniform(0.8, 4.0) * wealth * 100.0).round() / 100.0;
            Row {
                name,
                region,
                population: rng.uniform(2_000.0, 70_000.0).round() as i64,
                average_income: (!INCOMPLETE.contains(&i)).then_some(average_income),
                income_per_person: (average_income * rng.uniform(350.0, 450.0) * 100.0).round() / 100.0,
                x: (cx + rng.uniform(-3_000.0, 3_000.0)).round(),
                y: (cy + rng.uniform(-3_000.0, 3_000.0)).round(),
            }
        })
        .collect()
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record([
        "",
        "bairro",
        "regiao",
        "populacao",
        "rendimento_nominal_medio",
        "renda_mensal_pessoa",
        "x",
        "y",
    ])?;
    for (i, row) in rows.iter().enumerate() {
        writer.write_record([
            i.to_string(),
            row.name.clone(),
            row.region.to_string(),
            row.population.to_string(),
            row.average_income.map(|v| v.to_string()).unwrap_or_default(),
            row.income_per_person.to_string(),
            row.x.to_string(),
            row.y.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &str) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("bairro", DataType::Utf8, false),
        Field::new("regiao", DataType::Utf8, false),
        Field::new("populacao", DataType::Int64, false),
        Field::new("rendimento_nominal_medio", DataType::Float64, true),
        Field::new("renda_mensal_pessoa", DataType::Float64, false),
        Field::new("x", DataType::Float64, false),
        Field::new("y", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(rows.iter().map(|r| r.region).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.population).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.average_income).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.income_per_person).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.x).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.y).collect::<Vec<_>>())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SplitMix64(42);
    let rows = generate(&mut rng);

    write_csv(&rows, "sample_bairros.csv")?;
    write_parquet(&rows, "sample_bairros.parquet")?;

    info!(
        "wrote {} neighbourhoods ({} incomplete) to sample_bairros.csv and sample_bairros.parquet",
        rows.len(),
        INCOMPLETE.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_rows() {
        let a = generate(&mut SplitMix64(42));
        let b = generate(&mut SplitMix64(42));
        assert_eq!(a.len(), ROWS);
        assert!(a
            .iter()
            .zip(&b)
            .all(|(x, y)| x.population == y.population && x.x == y.x));
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = SplitMix64(7);
        assert!((0..1000)
            .map(|_| rng.uniform(2.0, 3.0))
            .all(|v| (2.0..3.0).contains(&v)));
    }

    #[test]
    fn malformed_and_incomplete_rows_are_planted() {
        let rows = generate(&mut SplitMix64(42));
        assert_eq!(rows[32].name, "Cidade da Esperança");
        assert!(rows[7].average_income.is_none());
        assert!(rows[8].average_income.is_some());
    }
}
