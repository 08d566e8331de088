use std::collections::HashSet;

use ashfree_memory::KnowledgeStore;
use ashfree_schema::{KnowledgePassage, RetrievalResult};

pub const DEFAULT_RETRIEVAL_K: usize = 3;

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Scores every passage by how many distinct query tokens it contains and
/// keeps the best `k`. Ties keep store order.
pub fn rank(passages: &[KnowledgePassage], query: &str, k: usize) -> Vec<RetrievalResult> {
    let query_tokens = tokens(query);
    if k == 0 || query_tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<RetrievalResult> = passages
        .iter()
        .filter_map(|passage| {
            let passage_tokens = tokens(&passage.text);
            let score = query_tokens.intersection(&passage_tokens).count();
            (score > 0).then(|| RetrievalResult {
                text: passage.text.clone(),
                source: passage.source.clone(),
                score,
            })
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(k);
    scored
}

/// Top-`k` passages from the store for `query`.
///
/// A store that cannot be loaded behaves as an empty one; the prompt then
/// falls back to a motivational tip.
pub async fn retrieve(store: &KnowledgeStore, query: &str, k: usize) -> Vec<RetrievalResult> {
    match store.snapshot().await {
        Ok(passages) => rank(&passages, query, k),
        Err(error) => {
            tracing::warn!(%error, "knowledge base unavailable, retrieving nothing");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb() -> Vec<KnowledgePassage> {
        vec![
            KnowledgePassage::new("Cravings usually pass within minutes", "A"),
            KnowledgePassage::new("Deep breathing helps with cravings and stress", "B"),
            KnowledgePassage::new("Exercise reduces stress", "C"),
            KnowledgePassage::new("Drink water when cravings hit", "D"),
        ]
    }

    #[test]
    fn overlapping_query_ranks_by_score() {
        let results = rank(&kb(), "breathing helps stress", 3);
        assert!(!results.is_empty());
        assert_eq!(results[0].source, "B");
        assert_eq!(results[0].score, 3);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn ties_keep_store_order() {
        let results = rank(&kb(), "cravings", 10);
        let sources: Vec<_> = results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, ["A", "B", "D"]);
    }

    #[test]
    fn matching_is_case_insensitive_and_token_exact() {
        let results = rank(&kb(), "EXERCISE", 3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "C");
        // "crav" is not a token of any passage
        assert!(rank(&kb(), "crav", 3).is_empty());
    }

    #[test]
    fn repeated_query_tokens_count_once() {
        let results = rank(&kb(), "stress stress stress", 3);
        assert!(results.iter().all(|r| r.score == 1));
    }

    #[test]
    fn degenerate_inputs_give_nothing() {
        assert!(rank(&kb(), "quantum chromodynamics", 3).is_empty());
        assert!(rank(&kb(), "   ", 3).is_empty());
        assert!(rank(&kb(), "stress", 0).is_empty());
        assert!(rank(&[], "stress", 3).is_empty());
    }

    #[test]
    fn result_is_capped_at_k() {
        let results = rank(&kb(), "cravings stress", 2);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn retrieve_reads_store_snapshot() {
        let store = KnowledgeStore::in_memory(kb());
        let results = retrieve(&store, "drink water", DEFAULT_RETRIEVAL_K).await;
        assert_eq!(results[0].source, "D");
    }
}
