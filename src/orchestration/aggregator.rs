// Tue Jan 13 2026 - Alex

use crate::model::{Diagnostic, RecordKey, RegistrationRecord};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationStatistics {
    pub input: usize,
    pub duplicates_removed: usize,
    pub malformed_rejected: usize,
    pub output: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub records: Vec<RegistrationRecord>,
    pub statistics: AggregationStatistics,
    pub diagnostics: Vec<Diagnostic>,
}

/// Merges records from every source into one set with at most one record per
/// (target, implementation), sorted by `order`.
///
/// Among duplicates the lowest `order` wins, then the strongest source
/// (explicit, convention, plugin), then the first seen.
#[derive(Debug, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate<I>(&self, records: I) -> Aggregation
    where
        I: IntoIterator<Item = RegistrationRecord>,
    {
        let mut statistics = AggregationStatistics::default();
        let mut diagnostics = Vec::new();
        let mut unique: IndexMap<RecordKey, RegistrationRecord> = IndexMap::new();

        for record in records {
            statistics.input += 1;

            if !record.is_well_formed() {
                statistics.malformed_rejected += 1;
                diagnostics.push(Diagnostic::error(
                    "aggregator",
                    format!("rejected record with empty target or implementation: {}", record),
                ));
                continue;
            }

            match unique.entry(record.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    statistics.duplicates_removed += 1;
                    if rank(&record) < rank(slot.get()) {
                        slot.insert(record);
                    }
                }
            }
        }

        let mut records: Vec<RegistrationRecord> = unique.into_values().collect();
        records.sort_by_key(rank);
        statistics.output = records.len();

        Aggregation {
            records,
            statistics,
            diagnostics,
        }
    }
}

fn rank(record: &RegistrationRecord) -> (i32, u8) {
    (record.order, record.source.precedence())
}
