use std::collections::{HashMap, HashSet};

use delver_common::TopUrlCandidate;
use regex::Regex;

use crate::types::ResearchOutput;

/// Default recommended-candidate count when the query names none.
pub const DEFAULT_TOP_URL_COUNT: usize = 5;

/// Order-preserving set union: `additions` are appended in order, skipping
/// URLs already present in `base`.
pub fn merge_url_sets(base: Vec<String>, additions: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashSet<String> = base.iter().cloned().collect();
    let mut merged = base;
    for url in additions {
        if seen.insert(url.clone()) {
            merged.push(url);
        }
    }
    merged
}

/// Merge candidates keyed by URL with last-write-wins semantics: a later
/// entry's description supersedes an earlier one, in the earlier entry's
/// position.
pub fn merge_top_candidates(base: &mut Vec<TopUrlCandidate>, additions: Vec<TopUrlCandidate>) {
    let mut index: HashMap<String, usize> = base
        .iter()
        .enumerate()
        .map(|(i, c)| (c.url.clone(), i))
        .collect();

    for candidate in additions {
        match index.get(&candidate.url) {
            Some(&i) => base[i] = candidate,
            None => {
                index.insert(candidate.url.clone(), base.len());
                base.push(candidate);
            }
        }
    }
}

/// Fan-in for sibling branch results: learnings concatenate (duplicates
/// across branches are kept), URL sets union, top candidates merge
/// last-write-wins.
pub fn merge_branch_outputs(outputs: Vec<ResearchOutput>) -> ResearchOutput {
    let mut merged = ResearchOutput::default();
    for output in outputs {
        merged.learnings.extend(output.learnings);
        merged.visited_urls = merge_url_sets(std::mem::take(&mut merged.visited_urls), output.visited_urls);
        merge_top_candidates(&mut merged.top_url_candidates, output.top_url_candidates);
        merged.relevant_urls = merge_url_sets(std::mem::take(&mut merged.relevant_urls), output.relevant_urls);
    }
    merged
}

/// Recommended candidate count from a `top <N>` pattern in the query text
/// in scope at the merging level.
pub fn recommended_count(query: &str) -> usize {
    let re = Regex::new(r"(?i)\btop\s+(\d{1,3})\b").expect("valid regex");
    re.captures(query)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_TOP_URL_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use delver_common::Learning;

    fn candidate(url: &str, desc: &str) -> TopUrlCandidate {
        TopUrlCandidate {
            url: url.to_string(),
            description: desc.to_string(),
        }
    }

    #[test]
    fn url_union_is_idempotent_and_order_independent() {
        let a = vec!["https://a".to_string(), "https://b".to_string()];
        let b = vec!["https://b".to_string(), "https://c".to_string()];

        let once = merge_url_sets(a.clone(), b.clone());
        let twice = merge_url_sets(once.clone(), b.clone());
        assert_eq!(once, twice);

        let reversed = merge_url_sets(b, a);
        let mut sorted_once = once.clone();
        let mut sorted_reversed = reversed;
        sorted_once.sort();
        sorted_reversed.sort();
        assert_eq!(sorted_once, sorted_reversed);
    }

    #[test]
    fn top_candidates_last_write_wins() {
        let mut merged = vec![candidate("https://a", "x")];
        merge_top_candidates(&mut merged, vec![candidate("https://a", "y")]);
        assert_eq!(merged, vec![candidate("https://a", "y")]);
    }

    #[test]
    fn top_candidates_keep_first_seen_position() {
        let mut merged = vec![candidate("https://a", "x"), candidate("https://b", "y")];
        merge_top_candidates(
            &mut merged,
            vec![candidate("https://c", "z"), candidate("https://a", "x2")],
        );
        assert_eq!(
            merged,
            vec![
                candidate("https://a", "x2"),
                candidate("https://b", "y"),
                candidate("https://c", "z"),
            ]
        );
    }

    #[test]
    fn branch_merge_concatenates_learnings_without_dedup() {
        let learning = Learning {
            insight: "same".to_string(),
            source_title: String::new(),
            source_url: String::new(),
        };
        let branch = ResearchOutput {
            learnings: vec![learning.clone()],
            visited_urls: vec!["https://a".to_string()],
            top_url_candidates: Vec::new(),
            relevant_urls: Vec::new(),
        };
        let merged = merge_branch_outputs(vec![branch.clone(), branch]);
        assert_eq!(merged.learnings.len(), 2);
        assert_eq!(merged.visited_urls, vec!["https://a".to_string()]);
    }

    #[test]
    fn recommended_count_parses_top_n() {
        assert_eq!(recommended_count("top 10 rust web frameworks"), 10);
        assert_eq!(recommended_count("The Top 7 tools for X"), 7);
        assert_eq!(recommended_count("rust web frameworks"), DEFAULT_TOP_URL_COUNT);
        assert_eq!(recommended_count("laptop 3000 review"), DEFAULT_TOP_URL_COUNT);
        assert_eq!(recommended_count("top 0 things"), DEFAULT_TOP_URL_COUNT);
    }
}
