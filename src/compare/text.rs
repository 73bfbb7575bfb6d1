//! Text comparator: word-and-punctuation tokenization, LCS diff,
//! similarity scoring, and a character-level edit distance used for
//! substitution detection.

use serde::{Deserialize, Serialize};

use crate::types::report::{PageTextResult, TextComparison};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Equal,
    Insert,
    Delete,
}

/// One merged run of the edit script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRun {
    pub kind: DiffKind,
    pub text: String,
}

/// Full diff of one text pair
#[derive(Debug, Clone, PartialEq)]
pub struct TextDiff {
    pub runs: Vec<DiffRun>,
    pub lcs_len: usize,
    pub tokens_a: usize,
    pub tokens_b: usize,
}

impl TextDiff {
    /// LCS length over the longer token count; 1.0 for two empty strings,
    /// 0.0 when exactly one side is empty.
    pub fn similarity(&self) -> f64 {
        if self.tokens_a == 0 && self.tokens_b == 0 {
            return 1.0;
        }
        if self.tokens_a == 0 || self.tokens_b == 0 {
            return 0.0;
        }
        self.lcs_len as f64 / self.tokens_a.max(self.tokens_b) as f64
    }

    pub fn inserted_tokens(&self) -> usize {
        self.run_tokens(DiffKind::Insert)
    }

    pub fn deleted_tokens(&self) -> usize {
        self.run_tokens(DiffKind::Delete)
    }

    fn run_tokens(&self, kind: DiffKind) -> usize {
        self.runs
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| tokenize(&r.text).len())
            .sum()
    }
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !c.is_ascii_punctuation()
}

/// Runs of word characters interleaved with individual whitespace and
/// punctuation characters.
pub fn tokenize(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;
    for (idx, c) in input.char_indices() {
        if is_word_char(c) {
            if word_start.is_none() {
                word_start = Some(idx);
            }
        } else {
            if let Some(start) = word_start.take() {
                tokens.push(&input[start..idx]);
            }
            tokens.push(&input[idx..idx + c.len_utf8()]);
        }
    }
    if let Some(start) = word_start {
        tokens.push(&input[start..]);
    }
    tokens
}

/// LCS diff over token sequences.
///
/// Uses an O(n·m) suffix table and a forward walk; when the table gives
/// equal values the walk prefers insertion over deletion. Adjacent runs of
/// the same kind are merged.
pub fn diff(a: &str, b: &str) -> TextDiff {
    let ta = tokenize(a);
    let tb = tokenize(b);
    let (n, m) = (ta.len(), tb.len());

    // dp[i][j] = LCS length of ta[i..] and tb[j..]
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if ta[i] == tb[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i][j + 1].max(dp[i + 1][j])
            };
        }
    }

    let mut runs: Vec<DiffRun> = Vec::new();
    let mut push = |runs: &mut Vec<DiffRun>, kind: DiffKind, text: &str| {
        if let Some(last) = runs.last_mut() {
            if last.kind == kind {
                last.text.push_str(text);
                return;
            }
        }
        runs.push(DiffRun {
            kind,
            text: text.to_string(),
        });
    };

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if ta[i] == tb[j] {
            push(&mut runs, DiffKind::Equal, ta[i]);
            i += 1;
            j += 1;
        } else if dp[i][j + 1] >= dp[i + 1][j] {
            push(&mut runs, DiffKind::Insert, tb[j]);
            j += 1;
        } else {
            push(&mut runs, DiffKind::Delete, ta[i]);
            i += 1;
        }
    }
    while j < m {
        push(&mut runs, DiffKind::Insert, tb[j]);
        j += 1;
    }
    while i < n {
        push(&mut runs, DiffKind::Delete, ta[i]);
        i += 1;
    }

    TextDiff {
        runs,
        lcs_len: dp[0][0] as usize,
        tokens_a: n,
        tokens_b: m,
    }
}

/// Convenience wrapper for a single similarity score
pub fn similarity(a: &str, b: &str) -> f64 {
    diff(a, b).similarity()
}

/// Page-by-page comparison. Document similarity is weighted by the longer
/// page length and normalized, not a plain average; missing pages compare
/// against the empty string.
pub fn compare_pages(pages_a: &[String], pages_b: &[String]) -> TextComparison {
    let page_count = pages_a.len().max(pages_b.len());
    let mut pages = Vec::with_capacity(page_count);
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for page in 0..page_count {
        let a = pages_a.get(page).map(String::as_str).unwrap_or("");
        let b = pages_b.get(page).map(String::as_str).unwrap_or("");
        let d = diff(a, b);
        let sim = d.similarity();
        let weight = a.len().max(b.len()) as f64;
        weighted_sum += sim * weight;
        weight_total += weight;
        pages.push(PageTextResult {
            page,
            similarity: sim,
            inserted_tokens: d.inserted_tokens(),
            deleted_tokens: d.deleted_tokens(),
        });
    }

    let document_similarity = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        1.0
    };

    TextComparison {
        pages,
        document_similarity,
    }
}

/// Classic character-level Levenshtein distance
pub fn levenshtein(a: &str, b: &str) -> usize {
    let ca: Vec<char> = a.chars().collect();
    let cb: Vec<char> = b.chars().collect();
    if ca.is_empty() {
        return cb.len();
    }
    if cb.is_empty() {
        return ca.len();
    }

    let mut prev: Vec<usize> = (0..=cb.len()).collect();
    let mut curr = vec![0usize; cb.len() + 1];
    for (i, &x) in ca.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &y) in cb.iter().enumerate() {
            let cost = usize::from(x != y);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[cb.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_round_trips() {
        let input = "The cat, sat -- twice.\n";
        let tokens = tokenize(input);
        assert_eq!(tokens.concat(), input);
    }

    #[test]
    fn diff_of_identical_text_is_one_equal_run() {
        let d = diff("same text here.", "same text here.");
        assert_eq!(d.runs.len(), 1);
        assert_eq!(d.runs[0].kind, DiffKind::Equal);
        assert!((d.similarity() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_insert_run_with_three_quarters_similarity() {
        let d = diff("The cat sat.", "The big cat sat.");
        let inserts: Vec<&DiffRun> = d
            .runs
            .iter()
            .filter(|r| r.kind == DiffKind::Insert)
            .collect();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].text, "big ");
        assert!((d.similarity() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let cases = [
            ("", ""),
            ("a", ""),
            ("", "a"),
            ("alpha beta", "beta gamma"),
            ("x y z", "x q z"),
        ];
        for (a, b) in cases {
            let s1 = similarity(a, b);
            let s2 = similarity(b, a);
            assert!((s1 - s2).abs() < 1e-12, "asymmetric for {:?}/{:?}", a, b);
            assert!((0.0..=1.0).contains(&s1));
        }
    }

    #[test]
    fn empty_edge_cases() {
        assert!((similarity("", "") - 1.0).abs() < 1e-12);
        assert_eq!(similarity("words", ""), 0.0);
        assert_eq!(similarity("", "words"), 0.0);
    }

    #[test]
    fn document_similarity_weights_by_page_length() {
        // Page 0 identical and long, page 1 fully different but short:
        // result must exceed the plain average of 0.5
        let a = vec!["the quick brown fox jumps over the lazy dog".to_string(), "abc".to_string()];
        let b = vec!["the quick brown fox jumps over the lazy dog".to_string(), "xyz".to_string()];
        let cmp = compare_pages(&a, &b);
        assert!(cmp.document_similarity > 0.5);
        assert_eq!(cmp.pages.len(), 2);
        assert!((cmp.pages[0].similarity - 1.0).abs() < 1e-12);
        assert_eq!(cmp.pages[1].similarity, 0.0);
    }

    #[test]
    fn page_count_mismatch_compares_against_empty() {
        let a = vec!["text".to_string()];
        let b: Vec<String> = vec![];
        let cmp = compare_pages(&a, &b);
        assert_eq!(cmp.pages.len(), 1);
        assert_eq!(cmp.pages[0].similarity, 0.0);
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }
}
