//! Query intent classification and intent-driven re-ranking.
//!
//! Re-ranking only reorders: it never drops a result and never touches a score.

use crate::models::SearchResult;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Factual,
    Exploratory,
    CrossModal,
    General,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::Factual => "factual",
            QueryType::Exploratory => "exploratory",
            QueryType::CrossModal => "cross_modal",
            QueryType::General => "general",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked in order; the first rule with a matching phrase wins.
const RULES: &[(QueryType, &[&str])] = &[
    (
        QueryType::Factual,
        &["what is", "who is", "when did", "where is", "how many", "how much", "which"],
    ),
    (
        QueryType::Exploratory,
        &["find", "show me", "tell me about", "explain", "summary", "information about"],
    ),
    (
        QueryType::CrossModal,
        &["chart", "graph", "image", "picture", "diagram", "photo", "visual", "figure"],
    ),
];

pub fn classify(query: &str) -> QueryType {
    let lowered = query.to_lowercase();

    RULES
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|phrase| lowered.contains(phrase)))
        .map(|(query_type, _)| *query_type)
        .unwrap_or(QueryType::General)
}

/// Stable partition: factual queries put text-layer results first, cross-modal
/// queries put OCR results first, everything else keeps the index order.
pub fn rerank(query_type: QueryType, results: Vec<SearchResult>) -> Vec<SearchResult> {
    let promote: fn(&SearchResult) -> bool = match query_type {
        QueryType::Factual => |result: &SearchResult| result.document_type.is_textual(),
        QueryType::CrossModal => |result: &SearchResult| result.document_type.is_visual(),
        QueryType::Exploratory | QueryType::General => return results,
    };

    let (mut front, back): (Vec<_>, Vec<_>) = results.into_iter().partition(promote);
    front.extend(back);
    front
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileType, RecordMetadata};

    fn result(id: &str, metadata: RecordMetadata, score: f64) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            content: id.to_string(),
            document_type: metadata.file_type,
            metadata,
            score,
        }
    }

    fn mixed() -> Vec<SearchResult> {
        vec![
            result("scan", RecordMetadata::image("scan.png"), 0.9),
            result("notes", RecordMetadata::text("notes.txt", 0, 1), 0.8),
            result("figure", RecordMetadata::pdf_image("report.pdf", 1, 0), 0.7),
            result("body", RecordMetadata::pdf_text("report.pdf", 1, 0), 0.6),
        ]
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|result| result.id.as_str()).collect()
    }

    #[test]
    fn classification_is_first_match_wins() {
        assert_eq!(classify("What is artificial intelligence?"), QueryType::Factual);
        assert_eq!(classify("Which chart shows revenue"), QueryType::Factual);
        assert_eq!(classify("Explain the diagram"), QueryType::Exploratory);
        assert_eq!(classify("revenue CHART for 2024"), QueryType::CrossModal);
        assert_eq!(classify("quarterly revenue"), QueryType::General);
        assert_eq!(classify(""), QueryType::General);
    }

    #[test]
    fn factual_queries_put_text_first() {
        let results = vec![
            result("img", RecordMetadata::image("scan.png"), 0.9),
            result("txt", RecordMetadata::text("notes.txt", 0, 1), 0.4),
        ];
        let ranked = rerank(classify("What is artificial intelligence?"), results);
        assert_eq!(ids(&ranked), ["txt", "img"]);
        assert_eq!(ranked[0].score, 0.4);
        assert_eq!(ranked[1].document_type, FileType::Image);
    }

    #[test]
    fn partitions_are_stable() {
        assert_eq!(
            ids(&rerank(QueryType::Factual, mixed())),
            ["notes", "body", "scan", "figure"]
        );
        assert_eq!(
            ids(&rerank(QueryType::CrossModal, mixed())),
            ["scan", "figure", "notes", "body"]
        );
        assert_eq!(
            ids(&rerank(QueryType::General, mixed())),
            ["scan", "notes", "figure", "body"]
        );
    }

    #[test]
    fn rerank_is_a_permutation() {
        for query_type in [
            QueryType::Factual,
            QueryType::Exploratory,
            QueryType::CrossModal,
            QueryType::General,
        ] {
            let mut before = mixed();
            let mut after = rerank(query_type, mixed());
            before.sort_by(|left, right| left.id.cmp(&right.id));
            after.sort_by(|left, right| left.id.cmp(&right.id));
            assert_eq!(before, after);
        }
    }
}
