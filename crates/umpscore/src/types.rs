//! Core data types: captured responses, targets, records, and flat rows.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output key for the entity a record was scraped for.
pub const KEY_SOURCE_ENTITY: &str = "source_entity";
/// Output key for the response URL a record came from.
pub const KEY_SOURCE_URL: &str = "source_url";
/// Output key for the capture timestamp (RFC 3339).
pub const KEY_CAPTURED_AT: &str = "captured_at";

/// All provenance keys, in the order they are appended to a record.
pub const PROVENANCE_KEYS: [&str; 3] = [KEY_SOURCE_ENTITY, KEY_SOURCE_URL, KEY_CAPTURED_AT];

/// A JSON response observed during a page visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedResponse {
    url: String,
    status: u16,
    content_type: String,
    body: Value,
    observed_at: DateTime<Utc>,
}

impl CapturedResponse {
    /// Build a response from an already-decoded body.
    pub fn new(
        url: impl Into<String>,
        status: u16,
        content_type: impl Into<String>,
        body: Value,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            status,
            content_type: content_type.into(),
            body,
            observed_at,
        }
    }

    /// Parse a raw body captured off the wire.
    ///
    /// Fails with [`HarvestError::Json`] when the body is not JSON; the caller
    /// drops the response.
    pub fn from_raw(
        url: impl Into<String>,
        status: u16,
        content_type: impl Into<String>,
        raw_body: &str,
        observed_at: DateTime<Utc>,
    ) -> HarvestResult<Self> {
        let body = serde_json::from_str(raw_body)?;
        Ok(Self::new(url, status, content_type, body, observed_at))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// One named thing a scrape is asked to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    Umpire { name: String },
    Game { game_id: String },
}

impl Target {
    /// An umpire target. Blank names are rejected.
    pub fn umpire(name: &str) -> HarvestResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HarvestError::InvalidTarget("umpire name is empty".into()));
        }
        Ok(Self::Umpire {
            name: name.to_string(),
        })
    }

    /// A single-game target. Blank ids are rejected.
    pub fn game(game_id: &str) -> HarvestResult<Self> {
        let game_id = game_id.trim();
        if game_id.is_empty() {
            return Err(HarvestError::InvalidTarget("game id is empty".into()));
        }
        Ok(Self::Game {
            game_id: game_id.to_string(),
        })
    }

    /// Split comma-separated umpire names, dropping blanks.
    pub fn parse_list(input: &str) -> Vec<Self> {
        input
            .split(',')
            .filter_map(|name| Self::umpire(name).ok())
            .collect()
    }

    /// The provenance entity string for records from this target.
    pub fn entity(&self) -> String {
        match self {
            Self::Umpire { name } => name.clone(),
            Self::Game { game_id } => format!("game:{game_id}"),
        }
    }

    /// The page to visit for this target under `base_url`.
    pub fn page_url(&self, base_url: &str) -> HarvestResult<String> {
        let mut url = url::Url::parse(base_url)
            .map_err(|e| HarvestError::InvalidUrl(format!("{base_url}: {e}")))?;
        match self {
            Self::Umpire { name } => {
                url.path_segments_mut()
                    .map_err(|()| HarvestError::InvalidUrl(format!("{base_url}: cannot be a base")))?
                    .pop_if_empty()
                    .extend(["data", "single-umpire", name.as_str()]);
            }
            Self::Game { game_id } => {
                url.set_path("/single_game/");
                url.query_pairs_mut().clear().append_pair("game_id", game_id);
            }
        }
        Ok(url.to_string())
    }

    /// Stem for per-target output files, e.g. `adam_beck`.
    pub fn file_stem(&self) -> String {
        match self {
            Self::Umpire { name } => name.to_lowercase().replace(' ', "_"),
            Self::Game { game_id } => format!("game_{game_id}"),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Umpire { name } => write!(f, "{name}"),
            Self::Game { game_id } => write!(f, "game {game_id}"),
        }
    }
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_entity: String,
    pub source_url: String,
    pub captured_at: DateTime<Utc>,
}

impl Provenance {
    pub fn new(target: &Target, source_url: &str, captured_at: DateTime<Utc>) -> Self {
        Self {
            source_entity: target.entity(),
            source_url: source_url.to_string(),
            captured_at,
        }
    }

    /// Write the provenance keys into `fields`, overwriting same-named keys.
    fn stamp(&self, fields: &mut Map<String, Value>) {
        fields.insert(
            KEY_SOURCE_ENTITY.to_string(),
            Value::String(self.source_entity.clone()),
        );
        fields.insert(
            KEY_SOURCE_URL.to_string(),
            Value::String(self.source_url.clone()),
        );
        fields.insert(
            KEY_CAPTURED_AT.to_string(),
            Value::String(self.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
}

/// A harvested record: the source mapping plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Merge `fields` with `provenance`. Provenance wins on key collisions.
    pub fn new(mut fields: Map<String, Value>, provenance: &Provenance) -> Self {
        provenance.stamp(&mut fields);
        Self { fields }
    }

    /// Wrap a mapping that already carries provenance (e.g. re-read rows).
    ///
    /// Returns `None` if `source_entity` or `captured_at` is missing or blank.
    pub fn from_stamped(fields: Map<String, Value>) -> Option<Self> {
        let present = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty())
        };
        (present(KEY_SOURCE_ENTITY) && present(KEY_CAPTURED_AT)).then_some(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn source_entity(&self) -> &str {
        self.fields
            .get(KEY_SOURCE_ENTITY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single-level row: key → scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRow {
    cells: Map<String, Value>,
}

impl FlatRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a scalar. Object and array values are stored as JSON text.
    pub fn insert(&mut self, key: String, value: Value) {
        let value = match value {
            Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
            scalar => scalar,
        };
        self.cells.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.cells.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.cells.keys()
    }

    pub fn cells(&self) -> &Map<String, Value> {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The cell as written to a delimited file. Absent and null are empty.
    pub fn to_cell(&self, key: &str) -> String {
        match self.cells.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Treat this row as a record again (used for idempotence checks).
    pub fn into_map(self) -> Map<String, Value> {
        self.cells
    }
}

/// Errors that can occur in the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
