//! Target geometries and their search windows.
//!
//! A target is one GeoJSON feature collection file. [`FeatureSource`] lists
//! and parses target files from a store; [`IntervalResolver`] assigns each
//! one the acquisition date window to search.

use chrono::{Days, NaiveDate};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{FeatureSet, GeometryError};
use crate::storage::{file_name, BlobStore, StorageError};

/// File extensions recognized as target collections.
pub const TARGET_EXTENSIONS: [&str; 2] = [".geojson", ".json"];

/// Default half-width of a filename-derived window.
pub const DEFAULT_HALF_WIDTH_DAYS: u64 = 30;

/// Default date format of a filename prefix (`2021_06_30_site.geojson`).
pub const DEFAULT_DATE_FORMAT: &str = "%Y_%m_%d";

/// Default number of leading filename characters holding the date.
pub const DEFAULT_PREFIX_LEN: usize = 10;

/// Errors raised while loading targets.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid target {path}: {source}")]
    Geometry {
        path: String,
        #[source]
        source: GeometryError,
    },

    #[error("Cannot resolve date interval for {path}: {reason}")]
    Interval { path: String, reason: String },
}

/// Inclusive acquisition date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Interval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Start as a provider timestamp (`YYYY-MM-DDT00:00:00Z`).
    pub fn start_timestamp(&self) -> String {
        format!("{}T00:00:00Z", self.start.format("%Y-%m-%d"))
    }

    /// End as a provider timestamp (`YYYY-MM-DDT00:00:00Z`).
    pub fn end_timestamp(&self) -> String {
        format!("{}T00:00:00Z", self.end.format("%Y-%m-%d"))
    }
}

/// Strategy deriving a target's date window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalResolver {
    /// Parses a date from the first `prefix_len` characters of the file
    /// name and searches `half_width_days` either side of it.
    FromFilename {
        half_width_days: u64,
        date_format: String,
        prefix_len: usize,
    },
    /// Reads ISO dates (`YYYY-MM-DD`) from the collection's members, or
    /// from the first feature's properties.
    FromAttributes { start_key: String, end_key: String },
}

impl Default for IntervalResolver {
    fn default() -> Self {
        IntervalResolver::FromFilename {
            half_width_days: DEFAULT_HALF_WIDTH_DAYS,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            prefix_len: DEFAULT_PREFIX_LEN,
        }
    }
}

impl IntervalResolver {
    /// Resolves the window for the target at `path`.
    pub fn resolve(&self, path: &str, features: &FeatureSet) -> Result<Interval, TargetError> {
        let fail = |reason: String| TargetError::Interval {
            path: path.to_string(),
            reason,
        };

        match self {
            IntervalResolver::FromFilename {
                half_width_days,
                date_format,
                prefix_len,
            } => {
                let name = file_name(path);
                let prefix: String = name.chars().take(*prefix_len).collect();
                let date = NaiveDate::parse_from_str(&prefix, date_format).map_err(|e| {
                    fail(format!("'{}' does not match {}: {}", prefix, date_format, e))
                })?;
                let days = Days::new(*half_width_days);
                let start = date
                    .checked_sub_days(days)
                    .ok_or_else(|| fail("start date out of range".to_string()))?;
                let end = date
                    .checked_add_days(days)
                    .ok_or_else(|| fail("end date out of range".to_string()))?;
                Ok(Interval::new(start, end))
            }
            IntervalResolver::FromAttributes { start_key, end_key } => {
                let lookup = |key: &str| -> Option<&str> {
                    features.member_str(key).or_else(|| {
                        features
                            .features
                            .first()
                            .and_then(|f| f.property_str(key))
                    })
                };
                let parse = |key: &str| -> Result<NaiveDate, TargetError> {
                    let raw = lookup(key).ok_or_else(|| fail(format!("missing '{}'", key)))?;
                    let date_part = raw.get(..10).unwrap_or(raw);
                    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                        .map_err(|e| fail(format!("'{}' = '{}': {}", key, raw, e)))
                };

                let start = parse(start_key)?;
                let end = parse(end_key)?;
                if end < start {
                    return Err(fail(format!("end {} precedes start {}", end, start)));
                }
                Ok(Interval::new(start, end))
            }
        }
    }
}

/// A parsed target with its resolved window.
#[derive(Debug, Clone)]
pub struct Target {
    pub path: String,
    pub features: FeatureSet,
    pub interval: Interval,
}

/// Lists and loads target collections from a store directory.
pub struct FeatureSource<'a, S: BlobStore + ?Sized> {
    store: &'a S,
    dir: String,
    resolver: IntervalResolver,
}

impl<'a, S: BlobStore + ?Sized> FeatureSource<'a, S> {
    pub fn new(store: &'a S, dir: impl Into<String>, resolver: IntervalResolver) -> Self {
        Self {
            store,
            dir: dir.into(),
            resolver,
        }
    }

    /// Paths of every target file, sorted.
    pub fn paths(&self) -> Result<Vec<String>, TargetError> {
        let paths: Vec<String> = self
            .store
            .list(&self.dir, None)?
            .into_iter()
            .filter(|p| TARGET_EXTENSIONS.iter().any(|ext| p.ends_with(ext)))
            .collect();
        debug!(dir = %self.dir, count = paths.len(), "Found target files");
        Ok(paths)
    }

    /// Reads and resolves one target file.
    pub fn load(&self, path: &str) -> Result<Target, TargetError> {
        let bytes = self.store.get_bytes(path)?;
        let features = FeatureSet::from_slice(&bytes).map_err(|source| TargetError::Geometry {
            path: path.to_string(),
            source,
        })?;
        let interval = self.resolver.resolve(path, &features)?;
        Ok(Target {
            path: path.to_string(),
            features,
            interval,
        })
    }

    /// Lazily loads every target; each file is read when the iterator
    /// reaches it.
    pub fn targets(
        &self,
    ) -> Result<impl Iterator<Item = Result<Target, TargetError>> + '_, TargetError> {
        let paths = self.paths()?;
        Ok(paths.into_iter().map(move |path| self.load(&path)))
    }
}
