//! Retrieval contract and the local dataset retriever.
//!
//! The hosted vector store stays an external collaborator behind the
//! [`Retriever`] trait; [`DatasetRetriever`] answers against a local crawl
//! so the chain runs without any remote service.

use std::path::Path;

use async_trait::async_trait;

use ragpipe_shared::{PageRecord, Result};

/// A ranked piece of supporting text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Where the text came from (page URL).
    pub source: String,
    /// The supporting text itself.
    pub text: String,
}

/// Ranked snippet lookup: `(query, k) -> up to k snippets`.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Snippet>>;
}

// ---------------------------------------------------------------------------
// DatasetRetriever
// ---------------------------------------------------------------------------

/// Ranks crawled page records by query term overlap.
///
/// Pages sharing no terms with the query are never returned, so an unrelated
/// question yields an empty result rather than noise.
pub struct DatasetRetriever {
    records: Vec<PageRecord>,
}

impl DatasetRetriever {
    /// Build a retriever over in-memory records.
    pub fn new(records: Vec<PageRecord>) -> Self {
        Self { records }
    }

    /// Load a crawl dataset from a JSONL file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(ragpipe_dataset::read_records(path)?))
    }

    /// Number of records backing this retriever.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the retriever has no records at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl Retriever for DatasetRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Snippet>> {
        let terms = tokenize(query);

        let mut scored: Vec<(usize, &PageRecord)> = self
            .records
            .iter()
            .map(|record| (overlap_score(&terms, record), record))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Highest overlap first; ties keep dataset order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, record)| Snippet {
                source: record.url.clone(),
                text: format!("{}: {}", record.title, record.content),
            })
            .collect())
    }
}

/// Lowercased alphanumeric terms longer than two characters.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Count how many query terms appear in the record's title or content.
fn overlap_score(terms: &[String], record: &PageRecord) -> usize {
    let haystack = format!("{} {}", record.title, record.content).to_lowercase();
    terms.iter().filter(|t| haystack.contains(t.as_str())).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<PageRecord> {
        vec![
            PageRecord {
                url: "https://example.com/hours".into(),
                title: "Store hours".into(),
                content: "We are open from 9am to 5pm on weekdays.".into(),
            },
            PageRecord {
                url: "https://example.com/returns".into(),
                title: "Return policy".into(),
                content: "Items can be returned within 30 days.".into(),
            },
        ]
    }

    #[tokio::test]
    async fn ranks_overlapping_pages_first() {
        let retriever = DatasetRetriever::new(records());
        let snippets = retriever.search("what are your store hours", 5).await.unwrap();

        assert!(!snippets.is_empty());
        assert_eq!(snippets[0].source, "https://example.com/hours");
        assert!(snippets[0].text.contains("9am to 5pm"));
    }

    #[tokio::test]
    async fn unrelated_query_returns_nothing() {
        let retriever = DatasetRetriever::new(records());
        let snippets = retriever
            .search("capital of a nonexistent country", 5)
            .await
            .unwrap();
        assert!(snippets.is_empty());
    }

    #[tokio::test]
    async fn respects_k_limit() {
        let retriever = DatasetRetriever::new(records());
        let snippets = retriever.search("returned store open", 1).await.unwrap();
        assert_eq!(snippets.len(), 1);
    }

    #[test]
    fn tokenize_drops_short_terms() {
        let terms = tokenize("is it on at 9am?");
        assert_eq!(terms, vec!["9am"]);
    }
}
