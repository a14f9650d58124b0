//! Final answer cleanup.

/// Filler tokens stripped from final answers, in removal order.
const FILLER_TOKENS: [&str; 3] = ["yes.", "Yes.", "yes"];

/// Remove filler affirmative tokens wherever they appear, then trim.
///
/// Removal repeats until a fixed point, so the function is idempotent even
/// when a removal splices a new token together out of its neighbors.
pub fn clean(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let mut next = current.clone();
        for token in FILLER_TOKENS {
            next = next.replace(token, "");
        }
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}
