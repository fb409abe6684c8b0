use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::inventory::{InventoryRecord, InventoryStatus};

const UNKNOWN_PRODUCT: &str = "Unknown product";
const UNKNOWN_BATCH: &str = "?";

/// Alert category shown in the notification dropdown.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Expired,
    NearExpiry,
}

impl AlertCategory {
    pub fn title(self) -> &'static str {
        match self {
            Self::Expired => "Item Expired",
            Self::NearExpiry => "Near Expiry Alert",
        }
    }
}

/// One derived notification.
///
/// Entries are rebuilt from scratch on every refresh and never mutated in
/// place. The timestamp of an expired alert is the item's expiry date; the
/// timestamp of a near-expiry alert is the refresh instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEntry {
    pub id: i64,
    pub category: AlertCategory,
    pub message: String,
    pub timestamp: OffsetDateTime,
}

/// Map one inventory record to at most one alert.
///
/// `now` is the refresh instant; every record classified within one refresh
/// must be given the same `now` so near-expiry timestamps are stable across
/// the snapshot.
pub fn classify(record: &InventoryRecord, now: OffsetDateTime) -> Option<AlertEntry> {
    let product = record.product_name.as_deref().unwrap_or(UNKNOWN_PRODUCT);

    match record.status {
        InventoryStatus::Expired => {
            let batch = record.batch_number.as_deref().unwrap_or(UNKNOWN_BATCH);
            let timestamp = record.parsed_expiry_date().unwrap_or_else(|| {
                warn!(
                    id = record.id,
                    expiry_date = record.expiry_date.as_deref().unwrap_or(""),
                    "Could not parse the expiry date; falling back to the refresh time",
                );

                now
            });

            Some(AlertEntry {
                id: record.id,
                category: AlertCategory::Expired,
                message: format!("{product} (Batch {batch}) has expired!"),
                timestamp,
            })
        }

        InventoryStatus::NearExpiry => Some(AlertEntry {
            id: record.id,
            category: AlertCategory::NearExpiry,
            message: format!(
                "{product} expires in {} days.",
                record.days_until_expiry.unwrap_or(0)
            ),
            timestamp: now,
        }),

        // `OK` and anything the service adds later: no alert.
        _ => None,
    }
}

/// Classify a whole snapshot, preserving its order and dropping records that
/// produce no alert.
pub fn classify_all(records: &[InventoryRecord], now: OffsetDateTime) -> Vec<AlertEntry> {
    records
        .iter()
        .filter_map(|record| classify(record, now))
        .collect()
}
