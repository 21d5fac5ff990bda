use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Replacements applied to a query, original term -> corrected term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellingCorrection {
    pub mapping: BTreeMap<String, String>,
}

impl SpellingCorrection {
    pub fn new() -> Self { Self::default() }

    pub fn no_correction(&self) -> bool { self.mapping.is_empty() }

    pub fn insert(&mut self, original: impl Into<String>, corrected: impl Into<String>) {
        self.mapping.insert(original.into(), corrected.into());
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.mapping.get(original).map(String::as_str)
    }
}

impl fmt::Display for SpellingCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.mapping.iter().map(|(k, v)| format!("{k} -> {v}")).collect();
        f.write_str(&pairs.join(", "))
    }
}

const KEYBOARD_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

fn key_position(c: char) -> Option<(f32, f32)> {
    let c = c.to_ascii_lowercase();
    KEYBOARD_ROWS
        .iter()
        .enumerate()
        .find_map(|(y, row)| row.find(c).map(|x| (x as f32, y as f32)))
}

/// Substituting neighbouring keys is cheap, distant keys expensive.
fn substitution_cost(a: char, b: char) -> f32 {
    if a == b {
        return 0.0;
    }
    match (key_position(a), key_position(b)) {
        (Some((ax, ay)), Some((bx, by))) => ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt(),
        _ => 1.0,
    }
}

/// Levenshtein distance with unit insert/delete and keyboard-distance substitution.
pub fn weighted_levenshtein(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len() as f32;
    }
    if b.is_empty() {
        return a.len() as f32;
    }
    let mut prev: Vec<f32> = (0..=b.len()).map(|j| j as f32).collect();
    let mut curr = vec![0.0f32; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i as f32;
        for j in 1..=b.len() {
            let delete = prev[j] + 1.0;
            let insert = curr[j - 1] + 1.0;
            let substitute = prev[j - 1] + substitution_cost(a[i - 1], b[j - 1]);
            curr[j] = delete.min(insert).min(substitute);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest vocabulary term to `word`. `terms` must be sorted; on equal
/// distance the lexicographically smallest term wins. A word already in
/// the vocabulary is returned as-is. `None` only for an empty vocabulary.
pub fn get_closest_term<'a>(word: &str, terms: &'a [String]) -> Option<&'a str> {
    if let Ok(i) = terms.binary_search_by(|t| t.as_str().cmp(word)) {
        return Some(&terms[i]);
    }
    let mut best: Option<(f32, &'a str)> = None;
    for term in terms {
        let d = weighted_levenshtein(word, term);
        match best {
            Some((bd, _)) if d >= bd => {}
            _ => best = Some((d, term)),
        }
    }
    best.map(|(_, t)| t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(words: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = words.iter().map(|s| s.to_string()).collect();
        v.sort();
        v
    }

    #[test]
    fn identical_strings_have_zero_distance() {
        assert_eq!(weighted_levenshtein("system", "system"), 0.0);
        assert_eq!(weighted_levenshtein("", "abc"), 3.0);
    }

    #[test]
    fn neighbouring_keys_cost_less() {
        // 'r' sits next to 't', far from 'p'
        assert!(weighted_levenshtein("cat", "car") < weighted_levenshtein("cap", "car"));
        assert_eq!(weighted_levenshtein("cat", "car"), 1.0);
    }

    #[test]
    fn known_word_is_returned_unchanged() {
        let v = vocab(&["operating", "operation", "system"]);
        assert_eq!(get_closest_term("operation", &v), Some("operation"));
    }

    #[test]
    fn misspelling_maps_to_nearest() {
        let v = vocab(&["database", "design", "operating", "procedures", "system"]);
        assert_eq!(get_closest_term("operatng", &v), Some("operating"));
        assert_eq!(get_closest_term("sistem", &v), Some("system"));
    }

    #[test]
    fn ties_prefer_smallest_term() {
        let v = vocab(&["bc", "ac"]);
        // one deletion each
        assert_eq!(get_closest_term("abc", &v), Some("ac"));
        assert_eq!(get_closest_term("x", &[]), None);
    }

    #[test]
    fn best_term_is_never_beaten() {
        let v = vocab(&["apple", "apply", "ample", "maple", "happy"]);
        let w = "appel";
        let best = get_closest_term(w, &v).unwrap();
        let bd = weighted_levenshtein(w, best);
        assert!(v.iter().all(|t| weighted_levenshtein(w, t) >= bd));
    }
}
