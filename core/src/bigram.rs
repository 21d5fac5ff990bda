//! Boundary-aware character bigrams and wildcard term resolution.
//!
//! A term such as `ge` is indexed under `$g`, `ge` and `e$`. A wildcard
//! pattern produces the same shingles minus the one spanning its `*`, and the
//! terms shared by all remaining shingles are a superset of the matches.

use crate::error::{Error, Result};
use crate::TermId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const BOUNDARY: char = '$';
pub const WILDCARD: char = '*';

/// Placeholder operand standing in for a wildcard with no matching term.
/// Operands are always lowercased before they reach the evaluator, so this
/// can never collide with a vocabulary entry.
pub const NO_MATCH_TERM: &str = "NO_MATCH";

/// Shingles of `pattern` with `$` boundary markers, minus the shingle that
/// spans the wildcard. Patterns with more than one `*` are not supported.
pub fn get_bigrams(pattern: &str) -> BTreeSet<String> {
    if pattern.is_empty() {
        return BTreeSet::new();
    }
    let mut chars = vec![BOUNDARY];
    chars.extend(pattern.chars().filter(|&c| c != WILDCARD));
    chars.push(BOUNDARY);

    let mut bigrams: Vec<String> = chars.windows(2).map(|w| w.iter().collect()).collect();
    let first = pattern.chars().next();
    let last = pattern.chars().last();
    if first == Some(WILDCARD) {
        bigrams.remove(0);
    } else if last == Some(WILDCARD) {
        bigrams.pop();
    } else if let Some(pos) = pattern.chars().position(|c| c == WILDCARD) {
        bigrams.remove(pos);
    }
    bigrams.into_iter().collect()
}

/// Whether `term` carries `bigram`: boundary shingles check the prefix or
/// suffix, interior ones check containment.
pub fn bigram_term_matched(bigram: &str, term: &str) -> bool {
    let chars: Vec<char> = bigram.chars().collect();
    if chars.len() != 2 {
        return false;
    }
    if chars[0] == BOUNDARY {
        term.starts_with(chars[1])
    } else if chars[1] == BOUNDARY {
        term.ends_with(chars[0])
    } else {
        term.contains(bigram)
    }
}

fn is_indexable(term: &str) -> bool {
    term.chars().count() >= 2 && term.chars().all(char::is_alphabetic)
}

/// Secondary index from shingle to the sorted ids of vocabulary terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BigramIndex {
    map: BTreeMap<String, Vec<TermId>>,
}

impl BigramIndex {
    /// Index every alphabetic term of length two or more. `terms` must be
    /// the sorted vocabulary; ids are positions in it.
    pub fn build(terms: &[String]) -> Self {
        let mut map: BTreeMap<String, Vec<TermId>> = BTreeMap::new();
        for (tid, term) in terms.iter().enumerate() {
            if !is_indexable(term) { continue; }
            for bigram in get_bigrams(term) {
                map.entry(bigram).or_default().push(tid as TermId);
            }
        }
        Self { map }
    }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn get(&self, bigram: &str) -> &[TermId] {
        self.map.get(bigram).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<TermId>)> {
        self.map.iter()
    }

    /// Terms present under every shingle. With no shingles at all (a lone
    /// `*`) every indexed term is a candidate.
    pub fn bigrams_to_terms(&self, bigrams: &BTreeSet<String>) -> BTreeSet<TermId> {
        if bigrams.is_empty() {
            return self.map.values().flatten().copied().collect();
        }
        let mut iter = bigrams.iter();
        let mut acc: BTreeSet<TermId> = match iter.next() {
            Some(b) => self.get(b).iter().copied().collect(),
            None => BTreeSet::new(),
        };
        for b in iter {
            if acc.is_empty() { break; }
            let next = self.get(b);
            acc.retain(|t| next.binary_search(t).is_ok());
        }
        acc
    }

    /// Consistency check used after deserialization.
    pub(crate) fn validate(&self, vocabulary_len: usize) -> Result<()> {
        for (bigram, ids) in &self.map {
            if bigram.chars().count() != 2 {
                return Err(Error::Serialization(format!("malformed bigram {bigram:?}")));
            }
            if ids.windows(2).any(|w| w[0] >= w[1]) || ids.iter().any(|&t| t as usize >= vocabulary_len) {
                return Err(Error::Serialization(format!("bigram {bigram:?} has unsorted or dangling term ids")));
            }
        }
        Ok(())
    }
}

/// Anchored regex for a wildcard pattern; `*` matches zero or more letters.
pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let body: Vec<String> = pattern.split(WILDCARD).map(regex::escape).collect();
    let expr = format!(r"^{}$", body.join(r"\p{L}*"));
    Regex::new(&expr).map_err(|e| Error::Syntax(format!("invalid wildcard {pattern:?}: {e}")))
}

/// Keep the candidates that really match `pattern` and render them as
/// `( a OR b OR ... )`. No match renders as `( NO_MATCH )`.
pub fn equivalences_to_query<'a, I>(candidates: I, pattern: &str) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let re = wildcard_regex(pattern)?;
    let matched: BTreeSet<&str> = candidates.into_iter().filter(|t| re.is_match(t)).collect();
    if matched.is_empty() {
        return Ok(format!("( {NO_MATCH_TERM} )"));
    }
    Ok(format!("( {} )", matched.into_iter().collect::<Vec<_>>().join(" OR ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn trailing_wildcard_drops_last_shingle() {
        assert_eq!(get_bigrams("ge*"), set(&["$g", "ge"]));
    }

    #[test]
    fn leading_wildcard_drops_first_shingle() {
        assert_eq!(get_bigrams("*ge"), set(&["ge", "e$"]));
    }

    #[test]
    fn interior_wildcard_drops_spanning_shingle() {
        assert_eq!(get_bigrams("g*e"), set(&["$g", "e$"]));
        assert_eq!(get_bigrams("ge"), set(&["$g", "ge", "e$"]));
    }

    #[test]
    fn shingle_matching() {
        assert!(bigram_term_matched("$o", "oper"));
        assert!(!bigram_term_matched("$p", "oper"));
        assert!(bigram_term_matched("r$", "oper"));
        assert!(bigram_term_matched("pe", "oper"));
        assert!(!bigram_term_matched("ep", "oper"));
    }

    #[test]
    fn index_lookup_and_intersection() {
        let terms: Vec<String> = ["design", "oper", "operand", "system", "x1"].iter().map(|s| s.to_string()).collect();
        let idx = BigramIndex::build(&terms);
        assert!(idx.get("$x").is_empty());
        let candidates = idx.bigrams_to_terms(&get_bigrams("oper*"));
        assert_eq!(candidates.into_iter().collect::<Vec<_>>(), vec![1, 2]);
        for (bigram, ids) in idx.iter() {
            for &t in ids {
                assert!(bigram_term_matched(bigram, &terms[t as usize]));
            }
        }
    }

    #[test]
    fn equivalences_filter_false_positives() {
        // "rare" carries both "$r" and "re" without starting with "re"
        let terms: Vec<String> = ["rare", "read", "red"].iter().map(|s| s.to_string()).collect();
        let idx = BigramIndex::build(&terms);
        let candidates = idx.bigrams_to_terms(&get_bigrams("re*"));
        assert_eq!(candidates.len(), 3);
        let q = equivalences_to_query(candidates.iter().map(|&t| terms[t as usize].as_str()), "re*").unwrap();
        assert_eq!(q, "( read OR red )");
        let none = equivalences_to_query(["system"], "oper*").unwrap();
        assert_eq!(none, format!("( {NO_MATCH_TERM} )"));
    }
}
