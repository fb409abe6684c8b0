use std::pin::pin;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use ::time::OffsetDateTime;
use tokio::time::Instant;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::classify::classify_all;
use crate::feed::FeedSnapshot;
use crate::inventory::InventoryClient;
use crate::state::State;

pub struct Fetcher {
    state: State,
}

impl Fetcher {
    pub fn new(state: State) -> Self {
        Self { state }
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        async move {
            let client = InventoryClient::new(self.state.cfg.inventory_url.clone())?;

            let max_initial_sleep: Duration = self.state.cfg.max_initial_fetch_sleep.into();
            let initial_sleep = if max_initial_sleep.is_zero() {
                Duration::ZERO
            } else {
                let mut rng = SmallRng::from_rng(&mut thread_rng()).unwrap();
                rng.gen_range(Duration::ZERO..max_initial_sleep)
            };

            debug!("Scheduling the first refresh in {}s", initial_sleep.as_secs());
            let mut next_fetch = pin!(time::sleep(initial_sleep));
            let refresh_notify = self.state.refresh.clone();
            let mut manual_refresh = pin!(refresh_notify.notified());

            loop {
                select! {
                    _ = cancel.cancelled() => {
                        debug!("Received a cancellation signal; exiting");
                        break;
                    }

                    _ = &mut manual_refresh => {
                        manual_refresh.set(refresh_notify.notified());

                        let deadline = next_fetch.deadline();
                        let now = Instant::now();
                        let preempted_by = deadline.saturating_duration_since(now).as_secs();
                        info!(
                            "Received a manual refresh request \
                                (preempted the next scheduled refresh by {preempted_by}s)"
                        );
                    }

                    _ = &mut next_fetch => {}
                }

                if let Err(e) = self.refresh(&client).await {
                    error!("Encountered a failure while refreshing the alert feed: {e:#}");
                }

                let fetch_interval: Duration = self.state.cfg.fetch_interval.into();
                debug!(
                    "Scheduling the next refresh in {}s",
                    fetch_interval.as_secs()
                );
                next_fetch.as_mut().reset(Instant::now() + fetch_interval);
            }

            Ok(())
        }
        .instrument(info_span!("fetcher"))
        .await
    }

    /// One refresh cycle: fetch the snapshot, derive the alerts, swap the
    /// feed. On failure the previously held feed is left untouched.
    async fn refresh(&self, client: &InventoryClient) -> Result<()> {
        let records = client.get_all().await?;
        let now = OffsetDateTime::now_utc();

        let alerts = classify_all(&records, now);
        let record_count = records.len();
        let alert_count = alerts.len();

        self.state.feed.replace(FeedSnapshot {
            alerts,
            refreshed_at: now,
        });

        info!("Derived {alert_count} alerts from {record_count} inventory records");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use crate::classify::AlertCategory;
    use crate::config::Config;

    async fn serve_snapshot(snapshot: Value) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/api/inventory",
            get(move || async move { Json(snapshot) }),
        );

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/api/inventory"), server)
    }

    fn feed_len(state: &State) -> usize {
        state
            .feed
            .load()
            .map(|snapshot| snapshot.alerts.len())
            .unwrap_or(0)
    }

    fn test_state(url: &str) -> State {
        let mut cfg = Config::default();
        cfg.inventory_url = url.parse().unwrap();

        State::new(cfg)
    }

    #[tokio::test]
    async fn a_successful_refresh_populates_the_feed() {
        let (url, server) = serve_snapshot(json!([
            {
                "id": 1,
                "status": "EXPIRED",
                "productName": "Milk",
                "batchNumber": "B1",
                "expiryDate": "2024-01-01"
            },
            {"id": 2, "status": "NEAR_EXPIRY", "productName": "Bread", "daysUntilExpiry": 3},
            {"id": 3, "status": "OK", "productName": "Cheese"},
        ]))
        .await;

        let state = test_state(&url);
        let fetcher = Fetcher::new(state.clone());
        let client = InventoryClient::new(state.cfg.inventory_url.clone()).unwrap();

        fetcher.refresh(&client).await.unwrap();

        let snapshot = state.feed.load().unwrap();
        assert_eq!(snapshot.alerts.len(), 2);
        assert_eq!(snapshot.alerts[0].category, AlertCategory::Expired);
        assert_eq!(snapshot.alerts[0].message, "Milk (Batch B1) has expired!");
        assert_eq!(snapshot.alerts[1].category, AlertCategory::NearExpiry);
        assert_eq!(snapshot.alerts[1].message, "Bread expires in 3 days.");

        server.abort();
    }

    #[tokio::test]
    async fn a_failed_refresh_keeps_the_previous_feed() {
        let (url, server) = serve_snapshot(json!([
            {"id": 1, "status": "EXPIRED", "productName": "Milk", "batchNumber": "B1"},
            {"id": 2, "status": "NEAR_EXPIRY", "productName": "Bread", "daysUntilExpiry": 1},
        ]))
        .await;

        let state = test_state(&url);
        let fetcher = Fetcher::new(state.clone());
        let client = InventoryClient::new(state.cfg.inventory_url.clone()).unwrap();

        fetcher.refresh(&client).await.unwrap();
        assert_eq!(feed_len(&state), 2);

        server.abort();
        let _ = server.await;

        assert!(fetcher.refresh(&client).await.is_err());
        assert_eq!(feed_len(&state), 2);
    }

    #[tokio::test]
    async fn a_failed_refresh_leaves_an_empty_feed_empty() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let state = test_state(&format!("http://{addr}/api/inventory"));
        let fetcher = Fetcher::new(state.clone());
        let client = InventoryClient::new(state.cfg.inventory_url.clone()).unwrap();

        assert!(fetcher.refresh(&client).await.is_err());
        assert!(state.feed.load().is_none());
        assert_eq!(feed_len(&state), 0);
    }

    #[tokio::test]
    async fn a_malformed_snapshot_body_is_a_whole_fetch_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/api/inventory", get(|| async { "not json" }));
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let state = test_state(&format!("http://{addr}/api/inventory"));
        let fetcher = Fetcher::new(state.clone());
        let client = InventoryClient::new(state.cfg.inventory_url.clone()).unwrap();

        assert!(fetcher.refresh(&client).await.is_err());
        assert!(state.feed.load().is_none());

        server.abort();
    }
}
