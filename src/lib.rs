//! Loading and querying of the Natal/RN neighbourhood socioeconomic table.
//!
//! A dashboard host creates one [`Session`] per user session, then calls
//! [`Session::query`] with the current control values on every interaction
//! and renders what comes back. The dataset is fetched once per session.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod session;
pub mod view;

pub use config::{NameCorrection, PipelineConfig};
pub use data::loader::{CsvText, DataSource, LocalFile, RemoteCsv};
pub use data::model::{Dataset, Indicator, NeighborhoodRecord};
pub use error::DataError;
pub use session::{load, QueryResult, Selection, Session};
