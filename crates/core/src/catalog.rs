//! Catalog Store: read-only product snapshots with atomic reload.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::canonical::budget::parse_amount_value;
use crate::canonical::canonicalize_features;
use crate::domain::product::{Product, ProductId};
use crate::errors::DomainError;

/// Column holding the price, as a number or a string with separators.
pub const PRICE_COLUMN: &str = "Price";
/// Columns that may hold the feature record, in lookup order.
pub const FEATURE_COLUMNS: [&str; 2] = ["laptop_feature", "features"];
/// Column used as the feature column when writing a catalog back out.
pub const FEATURE_COLUMN: &str = FEATURE_COLUMNS[0];

const ID_COLUMN: &str = "id";
const NAME_COLUMNS: [&str; 2] = ["Model Name", "name"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("could not write catalog `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("could not serialize catalog: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Versioned {
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        prepared_at: Option<DateTime<Utc>>,
        products: Vec<Value>,
    },
    Rows(Vec<Value>),
}

#[derive(Debug, Serialize)]
struct CatalogDocumentOut<'a> {
    version: Option<&'a str>,
    prepared_at: Option<DateTime<Utc>>,
    products: Vec<Map<String, Value>>,
}

/// An immutable view of the catalog. Matching always runs against one
/// snapshot, never against a catalog that is being replaced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub version: Option<String>,
    pub prepared_at: Option<DateTime<Utc>>,
    pub products: Vec<Product>,
}

impl CatalogSnapshot {
    pub fn new(products: Vec<Product>) -> Self {
        Self { version: None, prepared_at: None, products }
    }

    /// Builds products from raw rows. Malformed rows are logged and kept with
    /// an unusable price or no feature record; they never fail the load.
    /// Rows that are not objects at all are logged and skipped.
    pub fn from_rows(rows: Vec<Value>) -> Self {
        let products = rows
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| match row {
                Value::Object(row) => Some(product_from_row(index, row)),
                other => {
                    report_skipped(index, &other);
                    None
                }
            })
            .collect();
        Self::new(products)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let snapshot = match serde_json::from_str::<CatalogDocument>(raw)? {
            CatalogDocument::Versioned { version, prepared_at, products } => {
                Self { version, prepared_at, ..Self::from_rows(products) }
            }
            CatalogDocument::Rows(rows) => Self::from_rows(rows),
        };
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::Read { path: path.to_path_buf(), source })?;
        let snapshot = Self::from_json_str(&raw)
            .map_err(|source| CatalogError::Parse { path: path.to_path_buf(), source })?;

        info!(
            event_name = "core.catalog.loaded",
            path = %path.display(),
            products = snapshot.products.len(),
            version = snapshot.version.as_deref().unwrap_or("unversioned"),
            "catalog snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Writes the snapshot in the versioned document shape, with each
    /// feature record stored as an object under [`FEATURE_COLUMN`].
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let document = CatalogDocumentOut {
            version: self.version.as_deref(),
            prepared_at: self.prepared_at,
            products: self.products.iter().map(product_to_row).collect(),
        };
        let rendered =
            serde_json::to_string_pretty(&document).map_err(CatalogError::Serialize)?;
        fs::write(path, rendered)
            .map_err(|source| CatalogError::Write { path: path.to_path_buf(), source })
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn find(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == product_id)
    }
}

/// Shared handle to the current snapshot.
///
/// Readers clone an `Arc` and keep using it even if a reload swaps in a new
/// snapshot meanwhile.
#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogStore {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)) }
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Swaps in a new snapshot and returns the previous one.
    pub fn replace(&self, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }

    /// Loads `path` fully before swapping, so a failed reload leaves the
    /// current snapshot in place.
    pub fn reload_from(&self, path: &Path) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let snapshot = CatalogSnapshot::load(path)?;
        self.replace(snapshot);
        Ok(self.snapshot())
    }
}

fn product_from_row(index: usize, mut row: Map<String, Value>) -> Product {
    let id = row
        .get(ID_COLUMN)
        .and_then(scalar_text)
        .map(ProductId)
        .unwrap_or_else(|| ProductId(format!("row-{index}")));
    let name = NAME_COLUMNS
        .iter()
        .find_map(|column| row.get(*column).and_then(scalar_text))
        .unwrap_or_else(|| id.0.clone());

    let price = match row.get(PRICE_COLUMN) {
        Some(raw) => {
            let parsed = parse_amount_value(raw);
            if parsed.is_none() {
                report_malformed(&id, format!("price `{raw}` is not a non-negative whole amount"));
            }
            parsed
        }
        None => {
            report_malformed(&id, "price column is missing".to_string());
            None
        }
    };

    let raw_features = FEATURE_COLUMNS.iter().find_map(|column| row.remove(*column));
    let features = match raw_features {
        Some(raw) => {
            let parsed = canonicalize_features(&raw);
            if parsed.is_none() {
                report_malformed(&id, "feature record is not a recognizable mapping".to_string());
            }
            parsed
        }
        None => None,
    };

    Product { id, name, price, attributes: row, features }
}

fn product_to_row(product: &Product) -> Map<String, Value> {
    let mut row = product.attributes.clone();
    if let Some(features) = &product.features {
        row.insert(FEATURE_COLUMN.to_string(), Value::Object(features.to_map()));
    }
    row
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn report_malformed(product_id: &ProductId, reason: String) {
    let error = DomainError::MalformedCatalogEntry { product_id: product_id.clone(), reason };
    warn!(
        event_name = "core.catalog.malformed_entry",
        product_id = %product_id.0,
        error = %error,
        "catalog entry kept but excluded from the affected stage"
    );
}

fn report_skipped(index: usize, row: &Value) {
    let product_id = ProductId(format!("row-{index}"));
    let error = DomainError::MalformedCatalogEntry {
        product_id: product_id.clone(),
        reason: format!("row `{row}` is not an object"),
    };
    warn!(
        event_name = "core.catalog.malformed_entry",
        product_id = %product_id.0,
        error = %error,
        "catalog row skipped"
    );
}
