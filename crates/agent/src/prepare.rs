use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use shopassist_core::{CatalogSnapshot, FeatureRecord};
use tracing::{info, warn};

use crate::extraction::FeatureExtractor;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PreparationReport {
    pub total: usize,
    pub already_prepared: usize,
    pub extracted: usize,
    pub cache_hits: usize,
    pub unclassifiable: usize,
    pub missing_description: usize,
    pub failed: usize,
}

impl PreparationReport {
    /// Rows that still have no feature record after preparation.
    pub fn unprepared(&self) -> usize {
        self.unclassifiable + self.missing_description + self.failed
    }
}

/// Fills in missing feature records once, ahead of matching.
///
/// Results are cached by description text, so identical descriptions cost
/// one collaborator call per preparer. Rows that already carry a record are
/// left untouched. A failed call leaves that row without a record and moves
/// on; one bad row never aborts the batch.
pub struct CatalogPreparer<E> {
    extractor: E,
    cache: HashMap<String, Option<FeatureRecord>>,
}

impl<E> CatalogPreparer<E>
where
    E: FeatureExtractor,
{
    pub fn new(extractor: E) -> Self {
        Self { extractor, cache: HashMap::new() }
    }

    pub fn cached_descriptions(&self) -> usize {
        self.cache.len()
    }

    pub async fn prepare(
        &mut self,
        mut snapshot: CatalogSnapshot,
    ) -> (CatalogSnapshot, PreparationReport) {
        let mut report = PreparationReport { total: snapshot.products.len(), ..Default::default() };

        for product in &mut snapshot.products {
            if product.features.is_some() {
                report.already_prepared += 1;
                continue;
            }

            let Some(description) = product.description().map(str::to_owned) else {
                report.missing_description += 1;
                warn!(
                    event_name = "agent.prepare.missing_description",
                    product_id = %product.id.0,
                    "row has no description to classify"
                );
                continue;
            };

            let record = match self.cache.get(&description) {
                Some(cached) => {
                    report.cache_hits += 1;
                    *cached
                }
                None => match self.extractor.extract_features(&description).await {
                    Ok(record) => {
                        report.extracted += 1;
                        self.cache.insert(description, record);
                        record
                    }
                    Err(error) => {
                        report.failed += 1;
                        warn!(
                            event_name = "agent.prepare.extraction_failed",
                            product_id = %product.id.0,
                            error = %error,
                            "feature extraction failed, row left unprepared"
                        );
                        continue;
                    }
                },
            };

            if record.is_none() {
                report.unclassifiable += 1;
            }
            product.features = record;
        }

        snapshot.prepared_at = Some(Utc::now());
        info!(
            event_name = "agent.prepare.completed",
            total = report.total,
            extracted = report.extracted,
            cache_hits = report.cache_hits,
            unprepared = report.unprepared(),
            "catalog preparation completed"
        );
        (snapshot, report)
    }
}
