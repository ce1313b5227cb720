use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Indicator – one of the numeric columns selectable for analysis
// ---------------------------------------------------------------------------

/// Numeric indicator of a neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Resident population (`populacao`).
    Population,
    /// Average nominal income, in multiples of the minimum wage
    /// (`rendimento_nominal_medio`).
    AverageIncome,
    /// Monthly income per person, in R$ (`renda_mensal_pessoa`).
    IncomePerPerson,
}

impl Indicator {
    /// Selection order used by the dashboards.
    pub const ALL: [Indicator; 3] = [
        Indicator::IncomePerPerson,
        Indicator::AverageIncome,
        Indicator::Population,
    ];

    /// Column name in the source table.
    pub fn column(self) -> &'static str {
        match self {
            Indicator::Population => "populacao",
            Indicator::AverageIncome => "rendimento_nominal_medio",
            Indicator::IncomePerPerson => "renda_mensal_pessoa",
        }
    }

    /// Human-readable label, as shown next to charts.
    pub fn label(self) -> &'static str {
        match self {
            Indicator::Population => "População Total",
            Indicator::AverageIncome => "Rendimento Nominal Médio (sal. mín.)",
            Indicator::IncomePerPerson => "Renda Mensal por Pessoa (R$)",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Indicator::Population => "inhabitants",
            Indicator::AverageIncome => "minimum wages",
            Indicator::IncomePerPerson => "R$",
        }
    }

    /// Look an indicator up by its source column name.
    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ind| ind.column() == column)
    }

    /// Extract this indicator from a record.
    pub fn value(self, record: &NeighborhoodRecord) -> f64 {
        match self {
            Indicator::Population => record.population as f64,
            Indicator::AverageIncome => record.average_income,
            Indicator::IncomePerPerson => record.income_per_person,
        }
    }

    /// Whether statistics over this indicator are reported as integers.
    pub fn is_integral(self) -> bool {
        matches!(self, Indicator::Population)
    }

    /// Marker size for the spatial scatter, scaled so that all three
    /// indicators land in a comparable pixel range.
    pub fn marker_size(self, value: f64) -> f64 {
        match self {
            Indicator::Population => value / 150.0,
            Indicator::AverageIncome => value * 50.0,
            Indicator::IncomePerPerson => value / 20.0,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// NeighborhoodRecord – one row of the cleaned table
// ---------------------------------------------------------------------------

/// A single neighbourhood (one row of the source table).
///
/// Serialises with the source column names so exported records line up with
/// the original CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborhoodRecord {
    #[serde(rename = "bairro")]
    pub name: String,
    /// Lower-cased region label (`norte`, `sul`, `leste`, `oeste`).
    #[serde(rename = "regiao")]
    pub region: String,
    #[serde(rename = "populacao")]
    pub population: u64,
    #[serde(rename = "rendimento_nominal_medio")]
    pub average_income: f64,
    #[serde(rename = "renda_mensal_pessoa")]
    pub income_per_person: f64,
    /// Planar coordinates in metres.
    pub x: f64,
    pub y: f64,
}

impl NeighborhoodRecord {
    pub fn x_km(&self) -> f64 {
        self.x / 1e3
    }

    pub fn y_km(&self) -> f64 {
        self.y / 1e3
    }
}

// ---------------------------------------------------------------------------
// Dataset – an ordered, immutable collection of records
// ---------------------------------------------------------------------------

/// The cleaned dataset, or any view derived from it.
///
/// Views are freshly allocated: filtering never touches the dataset it was
/// derived from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    records: Vec<NeighborhoodRecord>,
    /// Sorted set of distinct region labels.
    regions: BTreeSet<String>,
}

impl Dataset {
    /// Build the region index from the given records.
    pub fn from_records(records: Vec<NeighborhoodRecord>) -> Self {
        let regions = records.iter().map(|r| r.region.clone()).collect();
        Dataset { records, regions }
    }

    pub fn records(&self) -> &[NeighborhoodRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NeighborhoodRecord> {
        self.records.iter()
    }

    /// Distinct regions, alphabetically.
    pub fn regions(&self) -> &BTreeSet<String> {
        &self.regions
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All values of one indicator, in record order.
    pub fn values(&self, indicator: Indicator) -> Vec<f64> {
        self.records.iter().map(|r| indicator.value(r)).collect()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a NeighborhoodRecord;
    type IntoIter = std::slice::Iter<'a, NeighborhoodRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<NeighborhoodRecord> for Dataset {
    fn from_iter<I: IntoIterator<Item = NeighborhoodRecord>>(iter: I) -> Self {
        Dataset::from_records(iter.into_iter().collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(name: &str, region: &str, population: u64, income: f64) -> NeighborhoodRecord {
        NeighborhoodRecord {
            name: name.to_string(),
            region: region.to_string(),
            population,
            average_income: income,
            income_per_person: income * 500.0,
            x: 250_000.0,
            y: 9_350_000.0,
        }
    }

    #[test]
    fn regions_are_sorted_and_distinct() {
        let ds = Dataset::from_records(vec![
            record("a", "sul", 10, 1.0),
            record("b", "leste", 20, 2.0),
            record("c", "sul", 30, 3.0),
        ]);
        let regions: Vec<&str> = ds.regions().iter().map(String::as_str).collect();
        assert_eq!(regions, ["leste", "sul"]);
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn indicator_lookup_by_column() {
        for ind in Indicator::ALL {
            assert_eq!(Indicator::from_column(ind.column()), Some(ind));
        }
        assert_eq!(Indicator::from_column("bairro"), None);
    }

    #[test]
    fn coordinates_convert_to_kilometres() {
        let r = record("a", "sul", 10, 1.0);
        assert!((r.x_km() - 250.0).abs() < 1e-9);
        assert!((r.y_km() - 9350.0).abs() < 1e-9);
    }

    #[test]
    fn serialises_with_source_column_names() {
        let json = serde_json::to_value(record("a", "sul", 10, 1.5)).unwrap();
        assert_eq!(json["bairro"], "a");
        assert_eq!(json["regiao"], "sul");
        assert_eq!(json["populacao"], 10);
        assert_eq!(json["rendimento_nominal_medio"], 1.5);
    }
}
