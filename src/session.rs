use std::cell::OnceCell;

use log::{debug, info};

use crate::color::RegionPalette;
use crate::config::{NameCorrection, PipelineConfig};
use crate::data::clean::clean;
use crate::data::filter::{filter_by_range, filter_by_region};
use crate::data::loader::{DataSource, RemoteCsv};
use crate::data::model::{Dataset, Indicator};
use crate::data::stats::{aggregate_by_region, indicator_bounds, RegionStats};
use crate::error::DataError;

// ---------------------------------------------------------------------------
// Selection – control values for one interaction
// ---------------------------------------------------------------------------

/// The dashboard controls, passed in on every interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// `None` or `"all"` for every region.
    pub region: Option<String>,
    pub indicator: Indicator,
    /// Inclusive bounds on `indicator`; `None` keeps every value.
    pub range: Option<(f64, f64)>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            region: None,
            indicator: Indicator::IncomePerPerson,
            range: None,
        }
    }
}

impl Selection {
    pub fn new(indicator: Indicator) -> Self {
        Self {
            indicator,
            ..Self::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_range(mut self, low: f64, high: f64) -> Self {
        self.range = Some((low, high));
        self
    }
}

/// Everything one interaction re-derives.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Region filter, then range filter, applied to the full dataset.
    pub filtered: Dataset,
    /// Per-region statistics of the selected indicator over the full dataset.
    pub aggregates: Vec<RegionStats>,
    /// Extent of the selected indicator over the full dataset.
    pub bounds: Option<(f64, f64)>,
}

// ---------------------------------------------------------------------------
// Session – one user's loaded dataset
// ---------------------------------------------------------------------------

/// Fetch and clean the dataset once, without caching.
pub fn load<S: DataSource + ?Sized>(source: &S, mode: NameCorrection) -> Result<Dataset, DataError> {
    let origin = source.origin();
    let dataset = source
        .fetch()
        .and_then(|table| clean(table, mode))
        .map_err(|e| {
            debug!("loading {origin} failed: {e:#}");
            DataError::unavailable(origin.as_str(), &e)
        })?;
    info!("loaded {} neighbourhoods from {origin}", dataset.len());
    Ok(dataset)
}

/// Per-session state: a data source and, once loaded, the cleaned dataset.
///
/// Not shared between sessions. A failed load leaves the session unloaded,
/// so the next call fetches again.
pub struct Session<S: DataSource> {
    source: S,
    name_correction: NameCorrection,
    dataset: OnceCell<Dataset>,
}

impl Session<RemoteCsv> {
    /// Session over the remote CSV described by `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, DataError> {
        let source = RemoteCsv::from_config(config)
            .map_err(|e| DataError::unavailable(config.source_url.as_str(), &e))?;
        Ok(Self::new(source, config.name_correction))
    }
}

impl<S: DataSource> Session<S> {
    pub fn new(source: S, name_correction: NameCorrection) -> Self {
        Self {
            source,
            name_correction,
            dataset: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.get().is_some()
    }

    /// The cleaned dataset, fetched on first use.
    pub fn dataset(&self) -> Result<&Dataset, DataError> {
        if let Some(ds) = self.dataset.get() {
            return Ok(ds);
        }
        let loaded = load(&self.source, self.name_correction)?;
        Ok(self.dataset.get_or_init(|| loaded))
    }

    /// Region colours, stable for the whole session.
    pub fn palette(&self) -> Result<RegionPalette, DataError> {
        Ok(RegionPalette::new(self.dataset()?.regions()))
    }

    /// Derive the filtered view and the regional aggregates for `selection`.
    pub fn query(&self, selection: &Selection) -> Result<QueryResult, DataError> {
        let full = self.dataset()?;
        let indicator = selection.indicator;

        let mut filtered = filter_by_region(full, selection.region.as_deref());
        if let Some((low, high)) = selection.range {
            filtered = filter_by_range(&filtered, indicator, low, high);
        }

        Ok(QueryResult {
            filtered,
            aggregates: aggregate_by_region(full, indicator),
            bounds: indicator_bounds(full, indicator),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::bail;

    use super::*;
    use crate::data::loader::{CsvText, RawTable};

    const CSV: &str = "\
,bairro,regiao,populacao,rendimento_nominal_medio,renda_mensal_pessoa,x,y
0,Nossa Senhora da Apresentação,norte,89000,1.1,520.1,247000,9365000
1,Potengi,norte,60000,1.4,640.0,246000,9363000
2,Tirol,leste,18000,8.2,3100.5,256000,9361000
3,Petrópolis,leste,9000,,3500.0,257000,9362000
4,Ponta Negra,sul,26000,6.5,2700.0,259000,9348000
";

    /// Counts fetches so tests can see the memoisation.
    struct Counting {
        inner: CsvText,
        fetches: Cell<usize>,
    }

    impl DataSource for Counting {
        fn origin(&self) -> String {
            "counting".to_string()
        }

        fn fetch(&self) -> anyhow::Result<RawTable> {
            self.fetches.set(self.fetches.get() + 1);
            self.inner.fetch()
        }
    }

    struct Unreachable;

    impl DataSource for Unreachable {
        fn origin(&self) -> String {
            "http://offline.invalid/bairros.csv".to_string()
        }

        fn fetch(&self) -> anyhow::Result<RawTable> {
            bail!("connection refused")
        }
    }

    fn session() -> Session<Counting> {
        Session::new(
            Counting {
                inner: CsvText(CSV.to_string()),
                fetches: Cell::new(0),
            },
            NameCorrection::ByPosition,
        )
    }

    #[test]
    fn dataset_is_fetched_once() {
        let s = session();
        assert!(!s.is_loaded());
        let first = s.dataset().unwrap().clone();
        let second = s.dataset().unwrap();
        assert_eq!(&first, second);
        assert_eq!(s.source.fetches.get(), 1);
        assert!(s.is_loaded());
    }

    #[test]
    fn load_drops_incomplete_rows_and_fixes_names() {
        let s = session();
        let ds = s.dataset().unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.records()[0].name, "ns_apresentacao");
    }

    #[test]
    fn query_filters_view_but_aggregates_everything() {
        let s = session();
        let sel = Selection::new(Indicator::Population)
            .with_region("Norte")
            .with_range(70000.0, 100000.0);
        let result = s.query(&sel).unwrap();

        assert_eq!(result.filtered.len(), 1);
        assert_eq!(result.filtered.records()[0].population, 89000);
        let regions: Vec<&str> = result.aggregates.iter().map(|a| a.region.as_str()).collect();
        assert_eq!(regions, ["leste", "norte", "sul"]);
        assert_eq!(result.aggregates[1].mean, 74500.0);
        assert_eq!(result.bounds, Some((18000.0, 89000.0)));
    }

    #[test]
    fn unreachable_source_is_data_unavailable() {
        let s = Session::new(Unreachable, NameCorrection::ByPosition);
        let err = s.dataset().unwrap_err();
        assert_eq!(
            err.to_string(),
            "dataset unavailable from http://offline.invalid/bairros.csv: connection refused"
        );
        let DataError::DataUnavailable { origin, reason } = err;
        assert_eq!(origin, "http://offline.invalid/bairros.csv");
        assert!(reason.contains("connection refused"));
        assert!(!s.is_loaded());
        assert!(s.query(&Selection::default()).is_err());
    }
}
