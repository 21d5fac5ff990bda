use proptest::prelude::*;
use quarry_core::boolean::{and_merge, and_not_merge, evaluate_postfix, infix_to_postfix, or_merge, tokenize_query, Operator};
use quarry_core::{BuildOptions, Corpus, Document, Index, IndexConfiguration, IndexKey, TermCounting, TextNormalizer};
use std::collections::BTreeSet;

const WORDS: [&str; 5] = ["alpha", "bravo", "charlie", "delta", "echo"];
const OPERATORS: [Operator; 3] = [Operator::Or, Operator::And, Operator::AndNot];

fn sorted_ids() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..200, 0..60).prop_map(|mut v| {
        v.sort_unstable();
        v.dedup();
        v
    })
}

fn is_ascending(v: &[u32]) -> bool {
    v.windows(2).all(|w| w[0] < w[1])
}

fn build_index(docs: &[Vec<usize>]) -> Index {
    let corpus = Corpus::new(
        docs.iter()
            .enumerate()
            .map(|(i, words)| {
                let text: Vec<&str> = words.iter().map(|&w| WORDS[w]).collect();
                Document::new(format!("d{i}"), "", text.join(" "))
            })
            .collect(),
    );
    let options = BuildOptions { term_counting: TermCounting::Token, ..BuildOptions::default() };
    let key = IndexKey::new(0, IndexConfiguration::new(false, false, false));
    Index::build(&corpus, key, &TextNormalizer::new(), options).unwrap()
}

fn run(index: &Index, raw: &str) -> Vec<u32> {
    let postfix = infix_to_postfix(&tokenize_query(raw).unwrap()).unwrap();
    evaluate_postfix(index, &postfix).unwrap()
}

/// Infix query over `operands` joined by `ops`, with operands `i..=j`
/// optionally grouped in parentheses.
fn render(operands: &[usize], ops: &[Operator], group: Option<(usize, usize)>) -> String {
    let mut parts = Vec::new();
    for (k, &w) in operands.iter().enumerate() {
        if k > 0 {
            parts.push(ops[k - 1].to_string());
        }
        if group.map_or(false, |(i, _)| i == k) {
            parts.push("(".to_string());
        }
        parts.push(WORDS[w].to_string());
        if group.map_or(false, |(_, j)| j == k) {
            parts.push(")".to_string());
        }
    }
    parts.join(" ")
}

/// Whether grouping operands `i..=j` matches the grouping precedence already implies.
fn grouping_is_redundant(ops: &[Operator], i: usize, j: usize) -> bool {
    let inner = ops[i..j].iter().map(Operator::precedence).min().unwrap_or(u8::MAX);
    let left_ok = i == 0 || ops[i - 1].precedence() < inner;
    let right_ok = j == ops.len() || ops[j].precedence() <= inner;
    left_ok && right_ok
}

proptest! {
    #[test]
    fn and_merge_is_sorted_intersection(l1 in sorted_ids(), l2 in sorted_ids()) {
        let got = and_merge(&l1, &l2);
        let a: BTreeSet<u32> = l1.iter().copied().collect();
        let b: BTreeSet<u32> = l2.iter().copied().collect();
        let expected: Vec<u32> = a.intersection(&b).copied().collect();
        prop_assert!(is_ascending(&got));
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn and_not_merge_is_sorted_difference(l1 in sorted_ids(), l2 in sorted_ids()) {
        let got = and_not_merge(&l1, &l2);
        let a: BTreeSet<u32> = l1.iter().copied().collect();
        let b: BTreeSet<u32> = l2.iter().copied().collect();
        let expected: Vec<u32> = a.difference(&b).copied().collect();
        prop_assert!(is_ascending(&got));
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn or_merge_is_union_with_left_prefix(l1 in sorted_ids(), l2 in sorted_ids()) {
        let got = or_merge(&l1, &l2);
        prop_assert_eq!(&got[..l1.len()], &l1[..]);
        let as_set: BTreeSet<u32> = got.iter().copied().collect();
        prop_assert_eq!(as_set.len(), got.len());
        let expected: BTreeSet<u32> = l1.iter().chain(l2.iter()).copied().collect();
        prop_assert_eq!(as_set, expected);
    }

    #[test]
    fn redundant_grouping_keeps_results(
        docs in prop::collection::vec(prop::collection::vec(0usize..WORDS.len(), 0..4), 1..8),
        operands in prop::collection::vec(0usize..WORDS.len(), 1..6),
        op_choices in prop::collection::vec(0usize..OPERATORS.len(), 5),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let index = build_index(&docs);
        let ops: Vec<Operator> = op_choices[..operands.len() - 1].iter().map(|&o| OPERATORS[o]).collect();
        let plain = run(&index, &render(&operands, &ops, None));
        prop_assert!(is_ascending(&plain));
        prop_assert!(plain.iter().all(|&d| (d as usize) < docs.len()));

        let (x, y) = (a.index(operands.len()), b.index(operands.len()));
        let (i, j) = (x.min(y), x.max(y));
        if grouping_is_redundant(&ops, i, j) {
            let grouped = render(&operands, &ops, Some((i, j)));
            prop_assert_eq!(run(&index, &grouped), plain.clone(), "{}", grouped);
        }
        // wrapping the whole query or a single operand is always redundant
        prop_assert_eq!(run(&index, &render(&operands, &ops, Some((0, operands.len() - 1)))), plain.clone());
        prop_assert_eq!(run(&index, &render(&operands, &ops, Some((i, i)))), plain);
    }
}
