use std::sync::{Arc, RwLock};

use time::OffsetDateTime;

use crate::classify::AlertEntry;

/// The result of one successful refresh, swapped in as a unit.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub alerts: Vec<AlertEntry>,
    pub refreshed_at: OffsetDateTime,
}

/// The notification feed handed to the HTTP layer.
///
/// Holds nothing until the first successful refresh and afterwards always the
/// result of the last successful one; a failed refresh never touches it.
/// Readers receive an `Arc` to a complete snapshot, so the alert list and the
/// badge count always come from the same snapshot and a refresh can never
/// expose a half-built collection.
#[derive(Debug, Default)]
pub struct AlertFeed {
    snapshot: RwLock<Option<Arc<FeedSnapshot>>>,
}

impl AlertFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Option<Arc<FeedSnapshot>> {
        self.snapshot.read().unwrap().clone()
    }

    /// Replace the previous snapshot wholesale.
    pub fn replace(&self, snapshot: FeedSnapshot) {
        *self.snapshot.write().unwrap() = Some(Arc::new(snapshot));
    }
}
