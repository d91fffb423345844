//! Reference sources and citation retrieval
//!
//! The assistant grounds its answers in a small, static corpus of reference
//! documents. Each [`Source`] carries keyword-tagged [`Snippet`]s; a chat query
//! is matched against them and the best few come back as [`Citation`]s.
//!
//! The corpus is loaded once at startup and never mutated afterwards.

mod scorer;

pub use scorer::{snippet_score, title_score, tokenize};

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default number of citations returned per query
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// A tagged excerpt of a source document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snippet {
    /// Snippet identifier, unique within the corpus
    #[serde(default)]
    pub id: String,

    /// Excerpt text
    pub content: String,

    /// Keyword tags used for matching
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A static reference document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: String,
    pub title: String,

    /// Publisher or document kind (e.g. a statute or an internal guideline)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub snippets: Vec<Snippet>,
}

/// A matched snippet as handed to the chat caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub title: String,
    pub source_id: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Citation {
    fn from_snippet(source: &Source, snippet: &Snippet) -> Self {
        Self {
            title: source.title.clone(),
            source_id: source.id.clone(),
            snippet: snippet.content.clone(),
            url: source.url.clone(),
        }
    }
}

/// Immutable, validated set of reference sources
#[derive(Debug, Clone, Default)]
pub struct SourceCorpus {
    sources: Vec<Source>,
}

impl SourceCorpus {
    /// Build a corpus from already-parsed sources, validating them
    pub fn new(sources: Vec<Source>) -> Result<Self> {
        let mut source_ids = HashSet::new();
        let mut snippet_ids = HashSet::new();
        let mut sources = sources;

        for source in &mut sources {
            if source.id.trim().is_empty() {
                return Err(AppError::Fixture {
                    message: format!("source '{}' has an empty id", source.title),
                });
            }
            if source.title.trim().is_empty() {
                return Err(AppError::Fixture {
                    message: format!("source '{}' has an empty title", source.id),
                });
            }
            if !source_ids.insert(source.id.clone()) {
                return Err(AppError::Fixture {
                    message: format!("duplicate source id '{}'", source.id),
                });
            }

            for (index, snippet) in source.snippets.iter_mut().enumerate() {
                if snippet.content.trim().is_empty() {
                    return Err(AppError::Fixture {
                        message: format!("source '{}' snippet {} has no content", source.id, index),
                    });
                }
                if snippet.id.trim().is_empty() {
                    snippet.id = format!("{}-{}", source.id, index);
                }
                if !snippet_ids.insert(snippet.id.clone()) {
                    return Err(AppError::Fixture {
                        message: format!("duplicate snippet id '{}'", snippet.id),
                    });
                }
                // An empty tag would match every token
                snippet.keywords.retain(|k| !k.trim().is_empty());
            }
        }

        Ok(Self { sources })
    }

    /// Parse a JSON fixture: an array of sources
    pub fn from_json(raw: &str) -> Result<Self> {
        let sources: Vec<Source> = serde_json::from_str(raw).map_err(|e| AppError::Fixture {
            message: format!("malformed source fixture: {}", e),
        })?;
        Self::new(sources)
    }

    /// Load the fixture file from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Fixture {
                message: format!("cannot read {}: {}", path.display(), e),
            })?;

        let corpus = Self::from_json(&raw)?;

        tracing::info!(
            path = %path.display(),
            sources = corpus.sources.len(),
            snippets = corpus.snippet_count(),
            "Reference sources loaded"
        );

        Ok(corpus)
    }

    /// All sources in fixture order
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn snippet_count(&self) -> usize {
        self.sources.iter().map(|s| s.snippets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.snippet_count() == 0
    }

    /// Pick the snippets most relevant to `query`.
    ///
    /// Every snippet with a positive [`snippet_score`] becomes a candidate.
    /// Candidates are ranked by that score plus the [`title_score`] of their
    /// source, using a stable sort so ties keep corpus order. At most
    /// `max_results` citations are returned.
    pub fn find_relevant_sources(&self, query: &str, max_results: usize) -> Vec<Citation> {
        let tokens = tokenize(query);
        if tokens.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<(u32, Citation)> = Vec::new();
        for source in &self.sources {
            for snippet in &source.snippets {
                let score = snippet_score(snippet, &tokens);
                if score > 0 {
                    let rank = score + title_score(&source.title, &tokens);
                    candidates.push((rank, Citation::from_snippet(source, snippet)));
                }
            }
        }

        // sort_by is stable: equal ranks stay in corpus order
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates.truncate(max_results);

        tracing::debug!(
            tokens = tokens.len(),
            returned = candidates.len(),
            "Citation candidates ranked"
        );

        candidates.into_iter().map(|(_, citation)| citation).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(id: &str, content: &str, keywords: &[&str]) -> Snippet {
        Snippet {
            id: id.to_string(),
            content: content.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn source(id: &str, title: &str, snippets: Vec<Snippet>) -> Source {
        Source {
            id: id.to_string(),
            title: title.to_string(),
            source: None,
            url: Some(format!("https://kca.example/{}", id)),
            snippets,
        }
    }

    fn sample_corpus() -> SourceCorpus {
        SourceCorpus::new(vec![
            source(
                "exam-schedule",
                "시험 일정 안내",
                vec![
                    snippet("s1", "필기시험 접수기간은 시험일 30일 전부터 7일간입니다.", &["접수", "필기시험"]),
                    snippet("s2", "실기시험은 필기 합격자 발표 후 진행됩니다.", &["실기시험"]),
                ],
            ),
            source(
                "refund",
                "환불규정",
                vec![snippet("s3", "접수 취소 시 기간에 따라 응시료를 돌려드립니다.", &["환불", "취소"])],
            ),
            source(
                "certificate",
                "자격증 발급",
                vec![snippet("s4", "자격증 발급 신청은 온라인으로 가능합니다.", &["발급", "자격증"])],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let corpus = sample_corpus();
        assert!(corpus.find_relevant_sources("", 3).is_empty());
        assert!(corpus.find_relevant_sources("   \t\n ", 3).is_empty());
        // single-character tokens are ignored
        assert!(corpus.find_relevant_sources("a 접", 3).is_empty());
    }

    #[test]
    fn test_no_matching_tokens_returns_nothing() {
        let corpus = sample_corpus();
        assert!(corpus.find_relevant_sources("날씨 어때요", 3).is_empty());
    }

    #[test]
    fn test_result_length_is_bounded() {
        let corpus = sample_corpus();
        let query = "접수 실기시험 환불 발급";
        assert_eq!(corpus.find_relevant_sources(query, 2).len(), 2);
        assert!(corpus.find_relevant_sources(query, 10).len() <= 4);
        assert!(corpus.find_relevant_sources(query, 0).is_empty());
    }

    #[test]
    fn test_compound_title_query_ranks_first() {
        let corpus = SourceCorpus::new(vec![
            source(
                "other",
                "시험 안내",
                vec![snippet("o1", "시험 관련 내용을 알려줘 드립니다.", &["시험"])],
            ),
            source(
                "refund",
                "환불규정",
                vec![snippet("r1", "응시료는 기간에 따라 돌려드립니다.", &["환불"])],
            ),
        ])
        .unwrap();

        let citations = corpus.find_relevant_sources("환불규정 알려줘", 3);
        assert!(!citations.is_empty());
        assert_eq!(citations[0].source_id, "refund");
        assert_eq!(citations[0].title, "환불규정");
    }

    #[test]
    fn test_keyword_match_beats_substring_match() {
        let corpus = SourceCorpus::new(vec![source(
            "guide",
            "업무 안내",
            vec![
                snippet("sub", "감독 배정은 시험 전주에 확정됩니다.", &["일정"]),
                snippet("kw", "시험장 운영 절차입니다.", &["감독"]),
            ],
        )])
        .unwrap();

        let citations = corpus.find_relevant_sources("감독", 3);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].snippet, "시험장 운영 절차입니다.");
    }

    #[test]
    fn test_rank_counts_keyword_tags() {
        let corpus = SourceCorpus::new(vec![source(
            "guide",
            "업무 안내",
            vec![
                snippet("body", "감독 배정 확정", &[]),
                snippet("tag", "시험장 운영 절차", &["감독"]),
                snippet("both", "감독관 교육 일정", &["감독"]),
            ],
        )])
        .unwrap();

        let snippets: Vec<_> = corpus
            .find_relevant_sources("감독", 3)
            .into_iter()
            .map(|c| c.snippet)
            .collect();
        assert_eq!(snippets, vec!["감독관 교육 일정", "시험장 운영 절차", "감독 배정 확정"]);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let corpus = SourceCorpus::new(vec![
            source("a", "첫번째", vec![snippet("a1", "응시료 안내", &[])]),
            source("b", "두번째", vec![snippet("b1", "응시료 납부", &[])]),
            source("c", "세번째", vec![snippet("c1", "응시료 환급", &[])]),
        ])
        .unwrap();

        let ids: Vec<_> = corpus
            .find_relevant_sources("응시료", 3)
            .into_iter()
            .map(|c| c.source_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_query_is_idempotent() {
        let corpus = sample_corpus();
        let first = corpus.find_relevant_sources("필기시험 접수기간과 환불규정 알려줘", 3);
        let second = corpus.find_relevant_sources("필기시험 접수기간과 환불규정 알려줘", 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_citations_come_from_corpus() {
        let corpus = sample_corpus();
        for citation in corpus.find_relevant_sources("접수 환불 발급 자격증", 5) {
            let source = corpus
                .sources()
                .iter()
                .find(|s| s.id == citation.source_id)
                .expect("citation source exists");
            assert!(source.snippets.iter().any(|s| s.content == citation.snippet));
            assert_eq!(source.url, citation.url);
        }
    }

    #[test]
    fn test_citation_serializes_camel_case() {
        let citation = Citation {
            title: "환불규정".into(),
            source_id: "refund".into(),
            snippet: "내용".into(),
            url: None,
        };
        let value = serde_json::to_value(&citation).unwrap();
        assert_eq!(value["sourceId"], "refund");
        assert!(value.get("url").is_none());
    }

    #[test]
    fn test_fixture_validation() {
        let duplicate = r#"[
            {"id": "a", "title": "A", "snippets": []},
            {"id": "a", "title": "B", "snippets": []}
        ]"#;
        assert!(matches!(
            SourceCorpus::from_json(duplicate),
            Err(AppError::Fixture { .. })
        ));

        let missing_title = r#"[{"id": "a", "snippets": []}]"#;
        assert!(SourceCorpus::from_json(missing_title).is_err());

        let empty_snippet = r#"[{"id": "a", "title": "A", "snippets": [{"content": "  "}]}]"#;
        assert!(SourceCorpus::from_json(empty_snippet).is_err());
    }

    #[test]
    fn test_missing_snippet_ids_are_derived() {
        let raw = r#"[{"id": "refund", "title": "환불규정", "snippets": [
            {"content": "첫 번째", "keywords": ["환불", ""]},
            {"content": "두 번째", "keywords": []}
        ]}]"#;
        let corpus = SourceCorpus::from_json(raw).unwrap();
        let snippets = &corpus.sources()[0].snippets;
        assert_eq!(snippets[0].id, "refund-0");
        assert_eq!(snippets[1].id, "refund-1");
        assert_eq!(snippets[0].keywords, vec!["환불".to_string()]);
        assert_eq!(corpus.snippet_count(), 2);
    }

    #[tokio::test]
    async fn test_bundled_fixture_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/sources.json");
        let corpus = SourceCorpus::load(&path).await.unwrap();
        assert!(!corpus.is_empty());

        let citations = corpus.find_relevant_sources("필기시험 접수기간과 환불규정 알려줘", 3);
        assert!(!citations.is_empty());
        assert!(citations.len() <= 3);
    }
}
