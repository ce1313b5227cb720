use std::str::FromStr;
use std::time::Duration;

use log::warn;

/// Raw CSV of the Natal/RN neighbourhood table.
pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/igendriz/DCA3501-Ciencia-Dados/main/Dataset/Bairros_Natal_v01.csv";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_SOURCE_URL: &str = "BAIRROS_SOURCE_URL";
const ENV_TIMEOUT_SECS: &str = "BAIRROS_FETCH_TIMEOUT_SECS";
const ENV_NAME_CORRECTION: &str = "BAIRROS_NAME_CORRECTION";

/// How the known-malformed neighbourhood names are located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameCorrection {
    /// Fix the rows at fixed positions of the source table.
    #[default]
    ByPosition,
    /// Fix whichever rows carry the original (uncorrected) names.
    ByName,
}

impl FromStr for NameCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "position" | "by_position" => Ok(NameCorrection::ByPosition),
            "name" | "by_name" => Ok(NameCorrection::ByName),
            other => Err(format!("unknown name correction mode '{other}'")),
        }
    }
}

/// Settings for loading the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub source_url: String,
    /// Upper bound for the whole HTTP exchange.
    pub timeout: Duration,
    pub name_correction: NameCorrection,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            name_correction: NameCorrection::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, overridden by `BAIRROS_*` environment variables when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`], reading values through `lookup`.
    /// Unparseable values are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_SOURCE_URL).filter(|u| !u.trim().is_empty()) {
            config.source_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => warn!("ignoring {ENV_TIMEOUT_SECS}={raw:?}: expected a positive integer"),
            }
        }

        if let Some(raw) = lookup(ENV_NAME_CORRECTION) {
            match raw.parse() {
                Ok(mode) => config.name_correction = mode,
                Err(e) => warn!("ignoring {ENV_NAME_CORRECTION}: {e}"),
            }
        }

        config
    }
}
