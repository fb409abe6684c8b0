use std::sync::Arc;

use tokio::sync::Notify;

use crate::config::Config;
use crate::feed::AlertFeed;

#[derive(Clone)]
pub struct State {
    pub cfg: Arc<Config>,
    pub feed: Arc<AlertFeed>,
    pub refresh: Arc<Notify>,
}

impl State {
    pub fn new(cfg: Config) -> Self {
        State {
            cfg: Arc::new(cfg),
            feed: Arc::new(AlertFeed::new()),
            refresh: Arc::new(Notify::new()),
        }
    }
}
