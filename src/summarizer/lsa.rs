//! Extractive summarization by latent semantic analysis.
//!
//! The text is split into sentences, every sentence is segmented into words
//! with jieba (Chinese has no spaces between words, so term weighting is
//! meaningless without segmentation), and a term-by-sentence matrix is
//! decomposed with an SVD. Each sentence is scored by the length of its
//! vector in the reduced concept space:
//!
//! ```text
//! score(j) = sqrt( Σ_i  σ_i² · V_ij² )   over the top `dimensions` singular values
//! ```
//!
//! The highest-scoring sentences are emitted in score order (ties keep
//! document order), not in document order.

use crate::models::{Summary, SummaryMethod, SummaryResult};
use crate::utils::is_cjk;
use jieba_rs::Jieba;
use nalgebra::DMatrix;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

/// Term frequencies are smoothed as `0.4 + 0.6 * tf / max_tf`.
const SMOOTHING: f64 = 0.4;
const MIN_DIMENSIONS: usize = 3;
/// Share of singular values kept when scoring sentences.
const REDUCTION_RATIO: f64 = 1.0;

pub struct LsaSummarizer {
    jieba: Jieba,
}

impl LsaSummarizer {
    /// Load the segmentation dictionary. This is expensive; build once and share.
    pub fn new() -> Self {
        Self { jieba: Jieba::new() }
    }

    /// Summarize `text` into at most `sentence_budget` sentences.
    pub fn summarize_text(&self, text: &str, sentence_budget: usize) -> Summary {
        if text.trim().is_empty() {
            return Summary::NoContent;
        }
        match catch_unwind(AssertUnwindSafe(|| self.select_sentences(text, sentence_budget))) {
            Ok(Some(text)) => Summary::Generated(SummaryResult {
                text,
                method: SummaryMethod::Extractive,
                language: None,
            }),
            Ok(None) => Summary::NoContent,
            Err(_) => {
                warn!("Extractive summarizer panicked");
                Summary::Failed {
                    reason: "extractive summarizer crashed on this input".to_string(),
                }
            }
        }
    }

    /// `None` when the text holds no sentence with a letter or digit.
    fn select_sentences(&self, text: &str, sentence_budget: usize) -> Option<String> {
        let sentences = split_sentences(text);
        let budget = sentence_budget.max(1);
        if sentences.is_empty() {
            return None;
        }

        let tokens: Vec<Vec<String>> = sentences.iter().map(|s| self.tokenize(s)).collect();
        let chosen = match rank_sentences(&tokens, REDUCTION_RATIO) {
            Some(ranks) => top_indices(&ranks, budget),
            None => (0..sentences.len().min(budget)).collect(),
        };
        debug!(sentences = sentences.len(), chosen = ?chosen, "Ranked sentences");

        Some(join_sentences(chosen.iter().map(|&i| sentences[i].as_str())))
    }

    fn tokenize(&self, sentence: &str) -> Vec<String> {
        self.jieba
            .cut(sentence, true)
            .into_iter()
            .map(str::trim)
            .filter(|w| w.chars().any(char::is_alphanumeric))
            .map(str::to_lowercase)
            .collect()
    }
}

impl Default for LsaSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Split text into sentences.
///
/// `。！？` always end a sentence; `.!?` only when followed by whitespace or
/// the end of the text, so decimals and abbreviations inside words survive.
/// Closing quotes and brackets stay with their sentence. Line breaks end a
/// sentence too.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' || c == '\r' {
            push_sentence(&mut sentences, &mut current);
            i += 1;
            continue;
        }
        current.push(c);

        let terminal = match c {
            '。' | '！' | '？' => true,
            '.' | '!' | '?' => chars.get(i + 1).is_none_or(|n| n.is_whitespace() || is_closer(*n)),
            _ => false,
        };
        if terminal {
            while let Some(&next) = chars.get(i + 1) {
                if !is_closer(next) {
                    break;
                }
                current.push(next);
                i += 1;
            }
            push_sentence(&mut sentences, &mut current);
        }
        i += 1;
    }
    push_sentence(&mut sentences, &mut current);
    sentences
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | '」' | '』' | '”' | '’' | '）')
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let sentence = current.trim();
    if sentence.chars().any(char::is_alphanumeric) {
        sentences.push(sentence.to_string());
    }
    current.clear();
}

/// Score every sentence; `None` when there are no terms to rank by.
fn rank_sentences(tokens: &[Vec<String>], reduction_ratio: f64) -> Option<Vec<f64>> {
    let mut dictionary: HashMap<&str, usize> = HashMap::new();
    for word in tokens.iter().flatten() {
        let next = dictionary.len();
        dictionary.entry(word.as_str()).or_insert(next);
    }
    if dictionary.is_empty() {
        return None;
    }

    let rows = dictionary.len();
    let cols = tokens.len();
    let mut matrix = DMatrix::<f64>::zeros(rows, cols);
    for (col, words) in tokens.iter().enumerate() {
        for word in words {
            matrix[(dictionary[word.as_str()], col)] += 1.0;
        }
    }

    for col in 0..cols {
        let max = matrix.column(col).max();
        if max > 0.0 {
            for row in 0..rows {
                matrix[(row, col)] = SMOOTHING + (1.0 - SMOOTHING) * matrix[(row, col)] / max;
            }
        }
    }

    let svd = matrix.svd(false, true);
    let v_t = svd.v_t?;
    let sigma = svd.singular_values;

    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]));
    let dimensions = MIN_DIMENSIONS.max((sigma.len() as f64 * reduction_ratio) as usize);
    let mut powered = vec![0.0; sigma.len()];
    for &i in order.iter().take(dimensions) {
        powered[i] = sigma[i] * sigma[i];
    }

    let ranks = (0..cols)
        .map(|j| {
            (0..sigma.len())
                .map(|i| powered[i] * v_t[(i, j)] * v_t[(i, j)])
                .sum::<f64>()
                .sqrt()
        })
        .collect();
    Some(ranks)
}

/// Indices of the `budget` best ranks, best first; ties keep document order.
fn top_indices(ranks: &[f64], budget: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..ranks.len()).collect();
    indices.sort_by(|&a, &b| ranks[b].total_cmp(&ranks[a]).then(a.cmp(&b)));
    indices.truncate(budget);
    indices
}

/// Concatenate sentences, making sure each one ends with terminal punctuation.
///
/// CJK sentences are joined without a separator and get `。` when they lack
/// punctuation; other sentences are separated by a space and get `.`.
pub fn join_sentences<'a>(sentences: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for sentence in sentences {
        let cjk = sentence.chars().any(is_cjk);
        let ends_terminal = sentence
            .trim_end_matches(is_closer)
            .ends_with(['.', '!', '?', '。', '！', '？']);

        if !out.is_empty() && !out.ends_with(|c: char| is_cjk(c) && !c.is_alphanumeric()) {
            out.push(' ');
        }
        out.push_str(sentence);
        if !ends_terminal {
            out.push(if cjk { '。' } else { '.' });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGLISH: &str = "ExampleCorp reported record revenue in the third quarter. \
        Revenue growth came from cloud services and cloud storage. \
        The weather in the city was mild on Tuesday. \
        Analysts expect cloud revenue to keep growing next quarter. \
        ExampleCorp shares rose 5% after the revenue report.";

    const CHINESE: &str = "台積電今天舉行法說會，公布第三季財報。\
        第三季營收創下歷史新高，毛利率優於預期。\
        台積電表示人工智慧需求強勁，將持續擴大先進製程產能。\
        今天台北天氣晴朗。\
        法人預期台積電明年營收將持續成長。";

    fn count_sentences(summary: &str) -> usize {
        split_sentences(summary).len()
    }

    #[test]
    fn test_split_sentences_english() {
        let sentences = split_sentences("Shares rose 3.5% today. Is that good? Yes!\nNew line");
        assert_eq!(sentences, ["Shares rose 3.5% today.", "Is that good?", "Yes!", "New line"]);
    }

    #[test]
    fn test_split_sentences_chinese_with_quotes() {
        let sentences = split_sentences("他說：「營收成長。」市場反應熱烈！股價上漲");
        assert_eq!(sentences, ["他說：「營收成長。」", "市場反應熱烈！", "股價上漲"]);
    }

    #[test]
    fn test_split_sentences_skips_punctuation_only() {
        assert!(split_sentences("... !!! 。。。").is_empty());
    }

    #[test]
    fn test_empty_input_is_no_content() {
        let summarizer = LsaSummarizer::new();
        assert_eq!(summarizer.summarize_text("", 3), Summary::NoContent);
        assert_eq!(summarizer.summarize_text("   \n ", 3), Summary::NoContent);
    }

    #[test]
    fn test_english_summary_respects_budget() {
        let summarizer = LsaSummarizer::new();
        let Summary::Generated(result) = summarizer.summarize_text(ENGLISH, 3) else {
            panic!("expected a generated summary");
        };
        assert_eq!(result.method, SummaryMethod::Extractive);
        assert_eq!(count_sentences(&result.text), 3);
        assert!(!result.text.contains("weather"));
    }

    #[test]
    fn test_chinese_summary_respects_budget() {
        let summarizer = LsaSummarizer::new();
        let Summary::Generated(result) = summarizer.summarize_text(CHINESE, 2) else {
            panic!("expected a generated summary");
        };
        assert_eq!(count_sentences(&result.text), 2);
        assert!(result.text.ends_with('。'));
        assert!(!result.text.contains(' '));
    }

    #[test]
    fn test_short_input_keeps_every_sentence() {
        let summarizer = LsaSummarizer::new();
        let Summary::Generated(result) = summarizer.summarize_text("Only one sentence here", 3)
        else {
            panic!("expected a generated summary");
        };
        assert_eq!(result.text, "Only one sentence here.");
    }

    #[test]
    fn test_punctuation_only_is_no_content() {
        let summarizer = LsaSummarizer::new();
        assert_eq!(summarizer.summarize_text("!!! 。", 3), Summary::NoContent);
    }

    #[test]
    fn test_non_empty_input_never_yields_empty_summary() {
        let summarizer = LsaSummarizer::new();
        for text in ["a", "!!!", "123", "台", "x. y. z.", "。"] {
            let summary = summarizer.summarize_text(text, 3);
            assert!(!summary.display_text().is_empty(), "empty summary for {text:?}");
        }
    }

    #[test]
    fn test_top_indices_orders_by_rank_then_position() {
        let ranks = [0.5, 0.9, 0.5, 0.1];
        assert_eq!(top_indices(&ranks, 3), [1, 0, 2]);
    }

    #[test]
    fn test_rank_prefers_central_sentences() {
        let tokens = vec![
            vec!["cloud".to_string(), "revenue".to_string(), "growth".to_string()],
            vec!["cloud".to_string(), "revenue".to_string()],
            vec!["weather".to_string()],
        ];
        let ranks = rank_sentences(&tokens, 1.0).unwrap();
        assert!(ranks[0] > ranks[2]);
        assert!(ranks[1] > ranks[2]);
    }

    #[test]
    fn test_join_sentences_adds_terminal_punctuation() {
        let joined = join_sentences(["營收創新高", "Shares rose", "Done."].into_iter());
        assert_eq!(joined, "營收創新高。Shares rose. Done.");
    }
}
