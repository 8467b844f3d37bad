//! Polling adapter for the store's change feed.
//!
//! The hosted platform pushes document events over a websocket; this client
//! approximates that by polling the latest window of a collection and
//! emitting a `Created` event for every document that enters it. Updates and
//! deletions are not observable this way, which is enough for the consumers
//! here: they only react to creations.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::application::collaborators::{
    DocumentAction, DocumentEvent, DocumentQuery, DocumentStore, RealtimeFeed,
};
use crate::domain::types::Collection;

const POLL_WINDOW: u32 = 100;

pub struct PollingFeed {
    store: Arc<dyn DocumentStore>,
    interval: Duration,
}

impl PollingFeed {
    pub fn new(store: Arc<dyn DocumentStore>, interval: Duration) -> Self {
        Self { store, interval }
    }
}

impl RealtimeFeed for PollingFeed {
    fn subscribe(&self, collection: Collection) -> BoxStream<'static, DocumentEvent> {
        let store = Arc::clone(&self.store);
        let interval = self.interval;

        let stream = stream! {
            // The first poll only establishes the baseline window.
            let mut seen: Option<HashSet<String>> = None;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let query = DocumentQuery::new()
                    .order_desc("$createdAt")
                    .limit(POLL_WINDOW);
                let documents = match store.list(collection, &query).await {
                    Ok(documents) => documents,
                    Err(err) => {
                        warn!(
                            collection = collection.as_str(),
                            error = %err,
                            "realtime poll failed"
                        );
                        continue;
                    }
                };

                let window: HashSet<String> =
                    documents.iter().map(|document| document.id.clone()).collect();
                if let Some(previous) = seen.replace(window) {
                    for document in documents.into_iter().rev() {
                        if !previous.contains(&document.id) {
                            yield DocumentEvent {
                                collection,
                                action: DocumentAction::Created,
                                document,
                            };
                        }
                    }
                }
            }
        };

        stream.boxed()
    }
}
