//! Boolean retrieval: `AND`, `OR`, `AND_NOT` and parentheses over terms and
//! single-`*` wildcard patterns.

use crate::bigram::{NO_MATCH_TERM, WILDCARD};
use crate::config::RetrievalSettings;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::spelling::{get_closest_term, SpellingCorrection};
use crate::tokenizer::TextNormalizer;
use crate::{DocId, SearchResult};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Or,
    And,
    AndNot,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Operator> {
        match s {
            "OR" => Some(Operator::Or),
            "AND" => Some(Operator::And),
            "AND_NOT" => Some(Operator::AndNot),
            _ => None,
        }
    }

    /// `(` sits below every operator at 0.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::AndNot => 3,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Or => "OR",
            Operator::And => "AND",
            Operator::AndNot => "AND_NOT",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Operand(String),
    Op(Operator),
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Operand(t) => f.write_str(t),
            Token::Op(op) => write!(f, "{op}"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

/// Split a raw query into tokens, treating parentheses as separate tokens
/// even when glued to a word.
pub fn tokenize_query(raw: &str) -> Result<Vec<Token>> {
    let spaced = raw.replace('(', " ( ").replace(')', " ) ");
    spaced
        .split_whitespace()
        .map(|t| match t {
            "(" => Ok(Token::LParen),
            ")" => Ok(Token::RParen),
            "NOT" => Err(Error::Syntax("unrecognized operator NOT, use AND_NOT".into())),
            other => Ok(Operator::parse(other).map(Token::Op).unwrap_or_else(|| Token::Operand(other.to_string()))),
        })
        .collect()
}

/// Shunting-yard conversion. The output holds operands and operators only.
///
/// Operands and operators must alternate: `a b AND` or `a AND OR b` are
/// rejected rather than silently reinterpreted.
pub fn infix_to_postfix(tokens: &[Token]) -> Result<Vec<Token>> {
    let mut stack: Vec<Token> = Vec::new();
    let mut postfix: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut expect_operand = true;

    for token in tokens {
        match token {
            Token::Operand(t) => {
                if !expect_operand {
                    return Err(Error::Syntax(format!("missing operator before {t:?}")));
                }
                expect_operand = false;
                postfix.push(token.clone());
            }
            Token::LParen => {
                if !expect_operand {
                    return Err(Error::Syntax("missing operator before '('".into()));
                }
                stack.push(Token::LParen);
            }
            Token::RParen => {
                if expect_operand {
                    return Err(Error::Syntax("missing operand before ')'".into()));
                }
                loop {
                    match stack.pop() {
                        Some(Token::LParen) => break,
                        Some(top) => postfix.push(top),
                        None => return Err(Error::Syntax("unbalanced ')'".into())),
                    }
                }
            }
            Token::Op(op) => {
                if expect_operand {
                    return Err(Error::Syntax(format!("missing operand before {op}")));
                }
                expect_operand = true;
                while let Some(Token::Op(top)) = stack.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    postfix.push(Token::Op(*top));
                    stack.pop();
                }
                stack.push(Token::Op(*op));
            }
        }
    }

    if expect_operand && !tokens.is_empty() {
        return Err(Error::Syntax("query ends without an operand".into()));
    }
    while let Some(top) = stack.pop() {
        if top == Token::LParen {
            return Err(Error::Syntax("unbalanced '('".into()));
        }
        postfix.push(top);
    }
    Ok(postfix)
}

/// Ascending intersection of two sorted sequences.
pub fn and_merge<T: Ord + Copy>(l1: &[T], l2: &[T]) -> Vec<T> {
    let mut result = Vec::new();
    let (mut p1, mut p2) = (0, 0);
    while p1 < l1.len() && p2 < l2.len() {
        match l1[p1].cmp(&l2[p2]) {
            std::cmp::Ordering::Equal => {
                result.push(l1[p1]);
                p1 += 1;
                p2 += 1;
            }
            std::cmp::Ordering::Greater => p2 += 1,
            std::cmp::Ordering::Less => p1 += 1,
        }
    }
    result
}

/// Ascending difference `l1 - l2` of two sorted sequences.
pub fn and_not_merge<T: Ord + Copy>(l1: &[T], l2: &[T]) -> Vec<T> {
    let mut result = Vec::new();
    let (mut p1, mut p2) = (0, 0);
    while p1 < l1.len() && p2 < l2.len() {
        match l1[p1].cmp(&l2[p2]) {
            std::cmp::Ordering::Greater => p2 += 1,
            std::cmp::Ordering::Equal => {
                p1 += 1;
                p2 += 1;
            }
            std::cmp::Ordering::Less => {
                result.push(l1[p1]);
                p1 += 1;
            }
        }
    }
    result.extend_from_slice(&l1[p1..]);
    result
}

/// Union keeping `l1` in its order, followed by the unseen elements of `l2`
/// in theirs. The output is not necessarily sorted.
pub fn or_merge<T: Eq + Hash + Copy>(l1: &[T], l2: &[T]) -> Vec<T> {
    let mut seen: HashSet<T> = l1.iter().copied().collect();
    let mut result = l1.to_vec();
    for &e in l2 {
        if seen.insert(e) {
            result.push(e);
        }
    }
    result
}

/// Operand stack entry: a term still to be looked up, or documents already
/// computed by a previous operator.
#[derive(Debug, Clone, PartialEq)]
enum StackItem {
    Unresolved(String),
    Resolved(Vec<DocId>),
}

impl StackItem {
    fn resolve(self, index: &Index) -> Vec<DocId> {
        match self {
            StackItem::Unresolved(term) => index.get(&term),
            StackItem::Resolved(docs) => docs,
        }
    }
}

fn apply(op: Operator, left: &[DocId], right: &[DocId]) -> Vec<DocId> {
    match op {
        Operator::And => and_merge(left, right),
        Operator::AndNot => and_not_merge(left, right),
        Operator::Or => {
            // AND/AND_NOT downstream rely on sorted input
            let mut merged = or_merge(left, right);
            merged.sort_unstable();
            merged
        }
    }
}

/// Evaluate postfix tokens against `index`.
pub fn evaluate_postfix(index: &Index, postfix: &[Token]) -> Result<Vec<DocId>> {
    let mut stack: Vec<StackItem> = Vec::new();
    for token in postfix {
        match token {
            Token::Operand(term) => stack.push(StackItem::Unresolved(term.clone())),
            Token::Op(op) => {
                let right = stack.pop().ok_or_else(|| Error::Syntax(format!("missing operands for {op}")))?;
                let left = stack.pop().ok_or_else(|| Error::Syntax(format!("missing left operand for {op}")))?;
                let merged = apply(*op, &left.resolve(index), &right.resolve(index));
                stack.push(StackItem::Resolved(merged));
            }
            Token::LParen | Token::RParen => return Err(Error::Syntax("parenthesis in postfix expression".into())),
        }
    }
    match (stack.pop(), stack.is_empty()) {
        (None, _) => Ok(Vec::new()),
        (Some(item), true) => Ok(item.resolve(index)),
        (Some(_), false) => Err(Error::Syntax("operands without an operator between them".into())),
    }
}

/// Replace wildcards with their disjunction and normalize plain operands.
fn process_operands(index: &Index, normalizer: &TextNormalizer, tokens: Vec<Token>) -> Result<Vec<Token>> {
    let mut processed = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Operand(t) if t.contains(WILDCARD) => {
                let expanded = index.expand_wildcard(&t.to_lowercase())?;
                processed.extend(tokenize_query(&expanded)?);
            }
            Token::Operand(t) => {
                let term = normalizer.first_term(&t, index.config());
                // stop-word-only operands match nothing
                let term = if term.is_empty() { NO_MATCH_TERM.to_string() } else { term };
                processed.push(Token::Operand(term));
            }
            other => processed.push(other),
        }
    }
    Ok(processed)
}

/// Replace unmatched operands by their closest vocabulary term, most
/// frequent corrections first, at most `limit` of them.
fn correct_operands(index: &Index, postfix: &mut [Token], limit: usize) -> SpellingCorrection {
    let mut candidates: Vec<(usize, String, &str)> = Vec::new();
    for (i, token) in postfix.iter().enumerate() {
        if let Token::Operand(term) = token {
            if term == NO_MATCH_TERM || index.contains(term) {
                continue;
            }
            if let Some(closest) = get_closest_term(term, index.terms()) {
                candidates.push((i, term.clone(), closest));
            }
        }
    }
    candidates.sort_by(|a, b| index.total_term_frequency(b.2).cmp(&index.total_term_frequency(a.2)));

    let mut correction = SpellingCorrection::new();
    for (i, original, closest) in candidates.into_iter().take(limit) {
        tracing::debug!(%original, corrected = closest, "spelling correction");
        postfix[i] = Token::Operand(closest.to_string());
        correction.insert(original, closest);
    }
    correction
}

/// Run a Boolean query. Every returned document scores 1.0.
pub fn query(
    index: &Index,
    normalizer: &TextNormalizer,
    raw_query: &str,
    settings: &RetrievalSettings,
) -> Result<SearchResult> {
    let tokens = process_operands(index, normalizer, tokenize_query(raw_query)?)?;
    let mut postfix = infix_to_postfix(&tokens)?;
    let correction = correct_operands(index, &mut postfix, settings.correction_limit);

    let rows = match postfix.as_slice() {
        [Token::Operand(term)] => index.get(term),
        _ => evaluate_postfix(index, &postfix)?,
    };

    let doc_ids: Vec<String> = rows.iter().filter_map(|&r| index.doc_id(r).map(str::to_string)).collect();
    let scores = vec![1.0; doc_ids.len()];
    Ok(SearchResult::new(doc_ids, correction, scores))
}
