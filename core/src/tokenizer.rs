use crate::config::IndexConfiguration;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Turns raw text into index terms under an [`IndexConfiguration`].
///
/// One value is built up front and shared by reference between the index
/// builder and both query evaluators.
pub struct TextNormalizer {
    token_re: Regex,
    stemmer: Stemmer,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            // letters/digits, optionally joined by interior hyphens or periods ("low-cost", "u.s.a")
            token_re: Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*(?:[-.][\p{L}\p{N}][\p{L}\p{N}_']*)*")
                .expect("valid regex"),
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Tokenize `text` and apply the configured steps, in order:
    /// normalization, lowercasing, stop word removal, stemming.
    ///
    /// Never returns an empty vector: when every token is filtered out the
    /// result is a single empty placeholder token.
    pub fn process(&self, text: &str, config: &IndexConfiguration) -> Vec<String> {
        let prepared = prepare(text, config);
        let mut tokens = Vec::new();
        for mat in self.token_re.find_iter(&prepared) {
            let token = mat.as_str();
            if config.stop_words_removal && is_stopword(token) { continue; }
            if config.stemming {
                tokens.push(self.stemmer.stem(token).into_owned());
            } else {
                tokens.push(token.to_string());
            }
        }
        if tokens.is_empty() {
            return vec![String::new()];
        }
        tokens
    }

    /// Sorted, deduplicated, non-empty terms of `text`.
    pub fn terms(&self, text: &str, config: &IndexConfiguration) -> Vec<String> {
        let set: BTreeSet<String> = self.process(text, config).into_iter().filter(|t| !t.is_empty()).collect();
        set.into_iter().collect()
    }

    /// First processed token of a single query word, the placeholder when filtered out.
    pub fn first_term(&self, word: &str, config: &IndexConfiguration) -> String {
        self.process(word, config).swap_remove(0)
    }
}

impl Default for TextNormalizer {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for TextNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextNormalizer").field("stopwords", &STOPWORDS.len()).finish()
    }
}

fn prepare(text: &str, config: &IndexConfiguration) -> String {
    if config.normalization {
        // low-cost -> low cost, U.S.A -> USA
        text.nfkc().collect::<String>().replace('-', " ").replace('.', "").to_lowercase()
    } else {
        text.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_on() -> IndexConfiguration { IndexConfiguration::new(true, true, true) }
    fn all_off() -> IndexConfiguration { IndexConfiguration::new(false, false, false) }

    #[test]
    fn basic_process() {
        let n = TextNormalizer::new();
        let t = n.process("Running, runner's run!", &all_on());
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn placeholder_when_everything_is_filtered() {
        let n = TextNormalizer::new();
        assert_eq!(n.process("the and of", &all_on()), vec![String::new()]);
        assert_eq!(n.process("", &all_off()), vec![String::new()]);
        assert!(n.terms("the and of", &all_on()).is_empty());
    }

    #[test]
    fn normalization_splits_hyphens_and_drops_periods() {
        let n = TextNormalizer::new();
        let cfg = IndexConfiguration::new(false, false, true);
        assert_eq!(n.process("Low-cost U.S.A", &cfg), vec!["low", "cost", "usa"]);
        assert_eq!(n.process("Low-cost U.S.A", &all_off()), vec!["low-cost", "u.s.a"]);
    }

    #[test]
    fn first_term_keeps_only_leading_token() {
        let n = TextNormalizer::new();
        let cfg = IndexConfiguration::new(false, false, true);
        assert_eq!(n.first_term("low-cost", &cfg), "low");
        assert_eq!(n.first_term("the", &all_on()), "");
    }
}
