/// Minimum similarity (0..=1) for a fuzzy title match to be accepted.
pub const SIMILARITY_FLOOR: f64 = 0.6;

/// Single best candidate whose similarity to `needle` is at least `floor`.
///
/// Similarity is normalized Levenshtein (`1 - edits / longer length`), not a
/// longest-matching-block ratio. Inputs are slugs, where most misses are a
/// dropped or swapped character, and edit distance scores those steadily; it
/// is stricter on reordered words, which keeps the floor conservative.
///
/// Ties keep the earliest candidate. Returns the candidate's index so callers
/// can map back to richer data.
pub fn best_match<'a, I>(needle: &str, candidates: I, floor: f64) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let score = strsim::normalized_levenshtein(needle, candidate);
        if score < floor {
            continue;
        }
        match best {
            Some((_, top)) if top >= score => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::{best_match, SIMILARITY_FLOOR};

    #[test]
    fn picks_closest_above_floor() {
        let candidates = ["hollow-knight", "hollow-night-deluxe", "celeste"];
        let hit = best_match("hollow-knigt", candidates, SIMILARITY_FLOOR);
        assert_eq!(hit, Some(0));
    }

    #[test]
    fn nothing_close_enough() {
        let candidates = ["celeste", "hades"];
        assert_eq!(best_match("stardew-valley", candidates, SIMILARITY_FLOOR), None);
    }

    #[test]
    fn score_is_edit_ratio_over_longer_slug() {
        // 1 edit over 5 characters scores 0.8; 3 edits scores 0.4.
        assert_eq!(best_match("abcde", ["abcdx"], SIMILARITY_FLOOR), Some(0));
        assert_eq!(best_match("abcde", ["abxyz"], SIMILARITY_FLOOR), None);
        // Reordered words share every character but need many edits.
        assert_eq!(best_match("knight-hollow", ["hollow-knight"], SIMILARITY_FLOOR), None);
    }

    #[test]
    fn ties_keep_first() {
        let candidates = ["abcx", "abcy"];
        assert_eq!(best_match("abcz", candidates, SIMILARITY_FLOOR), Some(0));
    }
}
