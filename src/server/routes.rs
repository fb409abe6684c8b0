use anyhow::{anyhow, Context};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Result;
use axum::Json;
use serde::Serialize;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::classify::AlertCategory;
use crate::server::convert_errors;
use crate::state::State as AppState;

static DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day] \
        [hour]:[minute]:[second] \
        [offset_hour sign:mandatory]:[offset_minute]"
);

#[derive(Serialize, Debug, Clone)]
pub struct StatusSummary {
    service: &'static str,
    version: &'static str,
    state: &'static str,
    alert_count: usize,
    last_refreshed: String,
}

pub async fn index(State(state): State<AppState>) -> Result<Json<StatusSummary>> {
    convert_errors(async move {
        let snapshot = state.feed.load();

        let (feed_state, alert_count, last_refreshed) = match &snapshot {
            Some(snapshot) => {
                let refreshed_at = snapshot.refreshed_at;

                (
                    "populated",
                    snapshot.alerts.len(),
                    refreshed_at.format(DATE_FORMAT).with_context(|| {
                        anyhow!("could not format the refresh time {refreshed_at}")
                    })?,
                )
            }

            None => ("empty", 0, "never".into()),
        };

        Ok(Json(StatusSummary {
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            state: feed_state,
            alert_count,
            last_refreshed,
        }))
    })
    .await
}

/// One alert as shown in the notification dropdown.
#[derive(Serialize, Debug, Clone)]
pub struct AlertView {
    id: i64,
    category: AlertCategory,
    title: &'static str,
    message: String,
    time: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct AlertFeedResponse {
    alerts: Vec<AlertView>,
    count: usize,
}

pub async fn get_alerts(State(state): State<AppState>) -> Result<Json<AlertFeedResponse>> {
    convert_errors(async move {
        let Some(snapshot) = state.feed.load() else {
            return Ok(Json(AlertFeedResponse {
                alerts: vec![],
                count: 0,
            }));
        };

        let mut alerts = Vec::with_capacity(snapshot.alerts.len());

        for entry in &snapshot.alerts {
            alerts.push(AlertView {
                id: entry.id,
                category: entry.category,
                title: entry.category.title(),
                message: entry.message.clone(),
                time: entry.timestamp.format(DATE_FORMAT).with_context(|| {
                    anyhow!("could not format the alert time {}", entry.timestamp)
                })?,
            });
        }

        let count = alerts.len();

        Ok(Json(AlertFeedResponse { alerts, count }))
    })
    .await
}

pub async fn refresh(State(state): State<AppState>) -> StatusCode {
    state.refresh.notify_waiters();

    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;

    use time::macros::datetime;

    use crate::classify::AlertEntry;
    use crate::config::Config;
    use crate::feed::FeedSnapshot;

    fn test_state() -> AppState {
        AppState::new(Config::default())
    }

    #[tokio::test]
    async fn an_empty_feed_serves_no_alerts() {
        let state = test_state();

        let Json(response) = get_alerts(State(state)).await.unwrap();

        assert!(response.alerts.is_empty());
        assert_eq!(response.count, 0);
    }

    #[tokio::test]
    async fn the_feed_and_the_badge_count_come_from_one_snapshot() {
        let state = test_state();
        state.feed.replace(FeedSnapshot {
            alerts: vec![
                AlertEntry {
                    id: 1,
                    category: AlertCategory::Expired,
                    message: "Milk (Batch B1) has expired!".into(),
                    timestamp: datetime!(2024-01-01 00:00 UTC),
                },
                AlertEntry {
                    id: 2,
                    category: AlertCategory::NearExpiry,
                    message: "Bread expires in 3 days.".into(),
                    timestamp: datetime!(2024-03-05 12:00 UTC),
                },
            ],
            refreshed_at: datetime!(2024-03-05 12:00 UTC),
        });

        let Json(response) = get_alerts(State(state)).await.unwrap();

        assert_eq!(response.count, 2);
        assert_eq!(response.alerts.len(), response.count);

        let expired = &response.alerts[0];
        assert_eq!(expired.id, 1);
        assert_eq!(expired.title, "Item Expired");
        assert_eq!(expired.time, "2024-01-01 00:00:00 +00:00");

        let near = &response.alerts[1];
        assert_eq!(near.title, "Near Expiry Alert");
        assert_eq!(near.time, "2024-03-05 12:00:00 +00:00");
    }

    #[tokio::test]
    async fn the_index_reports_the_feed_state() {
        let state = test_state();

        let Json(summary) = index(State(state.clone())).await.unwrap();
        assert_eq!(summary.state, "empty");
        assert_eq!(summary.alert_count, 0);
        assert_eq!(summary.last_refreshed, "never");

        state.feed.replace(FeedSnapshot {
            alerts: vec![],
            refreshed_at: datetime!(2024-03-05 12:00 UTC),
        });

        let Json(summary) = index(State(state)).await.unwrap();
        assert_eq!(summary.state, "populated");
        assert_eq!(summary.last_refreshed, "2024-03-05 12:00:00 +00:00");
    }

    #[tokio::test]
    async fn a_refresh_request_is_accepted() {
        let state = test_state();

        assert_eq!(refresh(State(state)).await, StatusCode::ACCEPTED);
    }
}
