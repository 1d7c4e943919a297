/// Model markers whose completions are slow/expensive enough that a level
/// should fan out one sub-query at a time.
const HEAVY_MODEL_MARKERS: [&str; 3] = ["opus", "o1", "deepseek-r"];

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Maximum parallel sub-queries allowed at a recursion level for the
/// selected model. Used only to cap, never to raise, the caller-requested
/// concurrency.
pub fn max_concurrency_for_model(model: &str) -> usize {
    let lowered = model.to_lowercase();
    if HEAVY_MODEL_MARKERS.iter().any(|m| lowered.contains(m)) {
        1
    } else {
        DEFAULT_MAX_CONCURRENCY
    }
}
