use delver_common::{CancelToken, Learning, TopUrlCandidate};

/// State for one recursion level. A new task is created at engine entry and
/// at every recursive call; depth strictly decreases by 1 per recursion and
/// breadth halves rounded up.
#[derive(Debug, Clone)]
pub struct ResearchTask {
    pub query: String,
    pub breadth: usize,
    pub depth: usize,
    /// Learnings accumulated along this branch, root to here.
    pub learnings: Vec<Learning>,
    /// Visited URLs accumulated along this branch; monotonically
    /// non-decreasing down the tree.
    pub visited_urls: Vec<String>,
    pub cancel: CancelToken,
}

impl ResearchTask {
    pub fn new(query: impl Into<String>, breadth: usize, depth: usize, cancel: CancelToken) -> Self {
        Self {
            query: query.into(),
            breadth: breadth.max(1),
            depth,
            learnings: Vec::new(),
            visited_urls: Vec::new(),
            cancel,
        }
    }
}

/// Merged output of a research level (and, at the root, of the whole run).
#[derive(Debug, Clone, Default)]
pub struct ResearchOutput {
    pub learnings: Vec<Learning>,
    pub visited_urls: Vec<String>,
    pub top_url_candidates: Vec<TopUrlCandidate>,
    pub relevant_urls: Vec<String>,
}
