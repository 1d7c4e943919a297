//! Deterministic fallback values for every insight operation.
//!
//! Both `UnavailableInsight` and the engine's absorb-on-failure paths build
//! their substitutes here, so a degraded run produces identical output no
//! matter which layer caught the failure.

use delver_common::{FeedbackQuestions, Learning, SubQuery};

/// Template sub-queries: the verbatim query plus two standard refinements,
/// cycled to fill `count`.
pub fn sub_queries(query: &str, count: usize) -> Vec<SubQuery> {
    let templates = [
        (
            query.to_string(),
            format!("Gather broad background information on {query}"),
        ),
        (
            format!("{query} latest developments"),
            format!("Surface the most recent developments around {query}"),
        ),
        (
            format!("{query} detailed analysis"),
            format!("Find in-depth analysis and commentary on {query}"),
        ),
    ];

    (0..count.max(1))
        .map(|i| {
            let (query_text, research_goal) = &templates[i % templates.len()];
            SubQuery {
                query_text: query_text.clone(),
                research_goal: research_goal.clone(),
            }
        })
        .collect()
}

/// Three generic learnings used when extraction fails for a sub-query.
pub fn learnings(query: &str) -> Vec<Learning> {
    [
        format!("Research on '{query}' returned material that could not be distilled into specific insights."),
        format!("Coverage of '{query}' appears fragmented across the retrieved sources."),
        format!("Further targeted searches are needed to corroborate findings on '{query}'."),
    ]
    .into_iter()
    .map(|insight| Learning {
        insight,
        source_title: String::new(),
        source_url: String::new(),
    })
    .collect()
}

/// Three generic follow-up questions used when extraction fails.
pub fn follow_up_questions(query: &str) -> Vec<String> {
    vec![
        format!("What are the latest developments regarding {query}?"),
        format!("What do authoritative sources say about {query}?"),
        format!("What open questions remain about {query}?"),
    ]
}

const SUMMARY_LIMIT: usize = 400;

/// Extractive summary: leading text up to the limit, cut at a word boundary.
pub fn summary(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= SUMMARY_LIMIT {
        return trimmed.to_string();
    }
    let mut cut = SUMMARY_LIMIT;
    while cut > 0 && !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = &trimmed[..cut];
    let head = head.rsplit_once(' ').map(|(h, _)| h).unwrap_or(head);
    format!("{head}…")
}

/// Plain bullet-list markdown report used when report writing fails.
pub fn report(query: &str, executive_summary: &str, learnings: &[Learning]) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Research Report: {query}\n\n"));
    if !executive_summary.is_empty() {
        out.push_str("## Executive Summary\n\n");
        out.push_str(executive_summary);
        out.push_str("\n\n");
    }
    out.push_str("## Findings\n\n");
    if learnings.is_empty() {
        out.push_str("No findings were collected.\n");
    }
    for learning in learnings {
        if learning.source_url.is_empty() {
            out.push_str(&format!("- {}\n", learning.insight));
        } else {
            out.push_str(&format!(
                "- {} ([{}]({}))\n",
                learning.insight, learning.source_title, learning.source_url
            ));
        }
    }
    out
}

/// Generic clarifying questions used when question generation fails.
pub fn feedback_questions(query: &str, count: usize) -> FeedbackQuestions {
    let templates = [
        format!("What specific aspect of '{query}' matters most to you?"),
        format!("Is there a time period or region that research on '{query}' should focus on?"),
        format!("How will the findings about '{query}' be used?"),
    ];
    FeedbackQuestions {
        questions: templates.into_iter().cycle().take(count.max(1)).collect(),
        detected_language: "English".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_queries_truncate_to_breadth() {
        let subs = sub_queries("quantum batteries", 2);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].query_text, "quantum batteries");
        assert_eq!(subs[1].query_text, "quantum batteries latest developments");
    }

    #[test]
    fn sub_queries_pad_by_cycling() {
        let subs = sub_queries("quantum batteries", 5);
        assert_eq!(subs.len(), 5);
        assert_eq!(subs[3].query_text, subs[0].query_text);
        assert_eq!(subs[4].query_text, subs[1].query_text);
    }

    #[test]
    fn exactly_three_generic_learnings_and_follow_ups() {
        assert_eq!(learnings("q").len(), 3);
        assert_eq!(follow_up_questions("q").len(), 3);
    }

    #[test]
    fn summary_cuts_at_word_boundary() {
        let text = "word ".repeat(200);
        let s = summary(&text);
        assert!(s.len() <= SUMMARY_LIMIT + '…'.len_utf8());
        assert!(s.ends_with('…'));
    }

    #[test]
    fn short_text_summarizes_to_itself() {
        assert_eq!(summary("A short note."), "A short note.");
    }

    #[test]
    fn report_lists_findings_with_sources() {
        let report = report(
            "quantum batteries",
            "Summary here.",
            &[Learning {
                insight: "They charge fast.".to_string(),
                source_title: "Lab note".to_string(),
                source_url: "https://example.org/note".to_string(),
            }],
        );
        assert!(report.contains("# Research Report: quantum batteries"));
        assert!(report.contains("Summary here."));
        assert!(report.contains("[Lab note](https://example.org/note)"));
    }
}
