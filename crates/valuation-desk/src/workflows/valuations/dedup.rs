use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::domain::ValuationRecord;

/// Collapses records sharing a logical identity to the single freshest
/// version, preserving first-seen order.
///
/// Records without a usable `unique_id` pass through unconditionally. When a
/// key repeats, a strictly newer effective timestamp replaces the earlier
/// record at its original position; ties and older duplicates are dropped.
pub fn deduplicate(records: Vec<ValuationRecord>) -> Vec<ValuationRecord> {
    let mut survivors: Vec<ValuationRecord> = Vec::with_capacity(records.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(key) = record.dedup_key().map(str::to_owned) else {
            survivors.push(record);
            continue;
        };

        match positions.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(survivors.len());
                survivors.push(record);
            }
            Entry::Occupied(slot) => {
                let position = *slot.get();
                if supersedes(
                    record.effective_timestamp(),
                    survivors[position].effective_timestamp(),
                ) {
                    survivors[position] = record;
                }
            }
        }
    }

    survivors
}

/// A record with an effective timestamp beats one without; two records
/// without timestamps tie, and ties keep the earlier-seen record.
fn supersedes(incoming: Option<DateTime<Utc>>, held: Option<DateTime<Utc>>) -> bool {
    match (incoming, held) {
        (Some(incoming), Some(held)) => incoming > held,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
