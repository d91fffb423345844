//! Keyword-overlap scoring
//!
//! Scores are small integers:
//! - keyword tag hit: 2
//! - substring hit in the snippet body: 1
//! - substring hit in the source title: 3 (ranking only)

use super::Snippet;

const KEYWORD_WEIGHT: u32 = 2;
const BODY_WEIGHT: u32 = 1;
const TITLE_WEIGHT: u32 = 3;

/// Lowercase the query and split on whitespace, dropping one-character tokens
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 1)
        .map(String::from)
        .collect()
}

/// Tag and token match when either contains the other, so `환불규정` hits `환불`
fn keyword_matches(keyword: &str, token: &str) -> bool {
    let keyword = keyword.to_lowercase();
    keyword.contains(token) || token.contains(keyword.as_str())
}

/// Candidate score of a snippet: keyword tag hits plus body substring hits
pub fn snippet_score(snippet: &Snippet, tokens: &[String]) -> u32 {
    let body = snippet.content.to_lowercase();

    tokens
        .iter()
        .map(|token| {
            let mut score = 0;
            if snippet.keywords.iter().any(|k| keyword_matches(k, token)) {
                score += KEYWORD_WEIGHT;
            }
            if body.contains(token.as_str()) {
                score += BODY_WEIGHT;
            }
            score
        })
        .sum()
}

/// Ranking bonus for tokens found in the source title
pub fn title_score(title: &str, tokens: &[String]) -> u32 {
    let title = title.to_lowercase();
    tokens
        .iter()
        .filter(|token| title.contains(token.as_str()))
        .count() as u32
        * TITLE_WEIGHT
}
