//! Article feeds and search.
//!
//! The store only answers equality/order/limit queries, so text search is
//! done client-side over a recent window: the feed fetches the newest
//! hundred articles and filters in memory, exactly the shape the reader
//! pages have always used.

use std::collections::HashSet;
use std::sync::Arc;

use crate::application::collaborators::{DocumentQuery, DocumentStore, StoreError};
use crate::domain::entities::ArticleRecord;
use crate::domain::types::Collection;

/// Articles shown per feed page.
pub const FEED_PAGE_SIZE: u32 = 20;

/// Window of recent articles a text search runs over.
const SEARCH_WINDOW: u32 = 100;

const QUICK_SEARCH_RESULTS: usize = 5;
const QUICK_SEARCH_MIN_CHARS: usize = 2;

pub struct FeedService {
    store: Arc<dyn DocumentStore>,
}

impl FeedService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// The home feed, newest first.
    pub async fn latest(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        let query = DocumentQuery::new()
            .order_desc("$createdAt")
            .limit(FEED_PAGE_SIZE);
        self.run(query).await
    }

    /// Most viewed articles.
    pub async fn trending(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        let query = DocumentQuery::new().order_desc("views").limit(FEED_PAGE_SIZE);
        self.run(query).await
    }

    /// Full search over title, tags, and raw content within the recent
    /// window.
    pub async fn search(&self, term: &str) -> Result<Vec<ArticleRecord>, StoreError> {
        let window = self.window().await?;
        Ok(window
            .into_iter()
            .filter(|article| article.matches_query(term))
            .collect())
    }

    /// The abbreviated search behind the navigation bar: short terms match
    /// nothing, only title and tags are consulted, and at most five results
    /// come back.
    pub async fn quick_search(&self, term: &str) -> Result<Vec<ArticleRecord>, StoreError> {
        if term.chars().count() < QUICK_SEARCH_MIN_CHARS {
            return Ok(Vec::new());
        }
        let needle = term.to_lowercase();
        let window = self.window().await?;
        Ok(window
            .into_iter()
            .filter(|article| {
                article.title.to_lowercase().contains(&needle)
                    || article
                        .tags
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&needle))
            })
            .take(QUICK_SEARCH_RESULTS)
            .collect())
    }

    /// Recent articles written by authors in `author_ids`, newest first.
    pub async fn by_authors(
        &self,
        author_ids: &HashSet<String>,
    ) -> Result<Vec<ArticleRecord>, StoreError> {
        let window = self.window().await?;
        Ok(window
            .into_iter()
            .filter(|article| author_ids.contains(&article.author_id))
            .collect())
    }

    /// Everything one author has published, newest first.
    pub async fn by_author(&self, author_id: &str) -> Result<Vec<ArticleRecord>, StoreError> {
        let query = DocumentQuery::new()
            .equal("authorId", author_id)
            .order_desc("$createdAt");
        self.run(query).await
    }

    async fn window(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        let query = DocumentQuery::new()
            .order_desc("$createdAt")
            .limit(SEARCH_WINDOW);
        self.run(query).await
    }

    async fn run(&self, query: DocumentQuery) -> Result<Vec<ArticleRecord>, StoreError> {
        let docs = self.store.list(Collection::Articles, &query).await?;
        Ok(docs
            .into_iter()
            .map(|doc| ArticleRecord::from_parts(doc.id, doc.created_at, &doc.fields))
            .collect())
    }
}
