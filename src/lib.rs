//! Refreshes the JSON document behind the game companion site.
//!
//! One run: fetch the source page once, derive the nine data sections from it,
//! merge them into the stored document (other top-level keys are left alone),
//! stamp `last_updated`, and write the file back atomically.

pub mod config;
pub mod error;
pub mod fetch;
pub mod sections;
pub mod store;
pub mod types;
pub mod update;

pub use config::UpdaterConfig;
pub use error::{ConfigError, DeriveError, FetchError, StoreError, UpdateError};
pub use fetch::{Fetcher, HttpFetcher};
pub use sections::{Derived, DeriverSet, SectionDeriver};
pub use store::{JsonFileStore, StagedWrite, Store};
pub use types::{Document, Percent, RawContent, SectionKey, LAST_UPDATED_KEY};
pub use update::{SectionFailure, SectionFallback, UpdateReport, Updater};
