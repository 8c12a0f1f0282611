use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use sprs::{CsMat, TriMat};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token regex"));

/// Lowercased word tokens of at least two characters.
pub fn tokenize(doc: &str) -> Vec<String> {
    let lowered = doc.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|token| token.as_str().to_string())
        .collect()
}

/// Term-frequency times smoothed inverse document frequency, L2-normalised per row.
#[derive(Debug, Clone, PartialEq)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn the vocabulary and IDF weights; `None` when no document has a token.
    pub fn fit<S: AsRef<str>>(docs: &[S]) -> Option<Self> {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for doc in docs {
            let mut tokens = tokenize(doc.as_ref());
            tokens.sort_unstable();
            tokens.dedup();
            for token in tokens {
                *document_frequency.entry(token).or_default() += 1;
            }
        }
        if document_frequency.is_empty() {
            return None;
        }
        let n_docs = docs.len() as f64;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (idx, (token, df)) in document_frequency.into_iter().enumerate() {
            idf.push(((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(token, idx);
        }
        Some(Self { vocabulary, idf })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    /// Sparse `docs x vocabulary` matrix; out-of-vocabulary tokens are dropped.
    pub fn transform<S: AsRef<str>>(&self, docs: &[S]) -> CsMat<f64> {
        let mut triplets = TriMat::new((docs.len(), self.vocabulary_len()));
        for (row, doc) in docs.iter().enumerate() {
            let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
            for token in tokenize(doc.as_ref()) {
                if let Some(&col) = self.vocabulary.get(&token) {
                    *counts.entry(col).or_default() += 1.0;
                }
            }
            let weighted: Vec<(usize, f64)> = counts
                .into_iter()
                .map(|(col, count)| (col, count * self.idf[col]))
                .collect();
            let norm = weighted.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm == 0.0 {
                continue;
            }
            for (col, value) in weighted {
                triplets.add_triplet(row, col, value / norm);
            }
        }
        triplets.to_csr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_skip_single_characters() {
        assert_eq!(tokenize("O'Brien a Li"), vec!["brien", "li"]);
        assert_eq!(tokenize("15674932OkwuFranceMale166777.0"), vec!["15674932okwufrancemale166777"]);
    }

    #[test]
    fn smooth_idf_and_l2_rows() {
        let docs = ["Smith", "smith Jones", "a"];
        let vectorizer = TfidfVectorizer::fit(&docs).unwrap();
        assert_eq!(vectorizer.vocabulary_len(), 2);
        let matrix = vectorizer.transform(&docs);
        assert_eq!(matrix.rows(), 3);
        // Row 0 only has "smith" (column 1) and normalises to 1.
        assert_eq!(matrix.get(0, 1).copied(), Some(1.0));
        let jones_idf = (4.0f64 / 2.0).ln() + 1.0;
        let smith_idf = (4.0f64 / 3.0).ln() + 1.0;
        let norm = (jones_idf * jones_idf + smith_idf * smith_idf).sqrt();
        let jones = matrix.get(1, 0).copied().unwrap();
        assert!((jones - jones_idf / norm).abs() < 1e-12);
        assert_eq!(matrix.outer_view(2).unwrap().nnz(), 0);
    }

    #[test]
    fn empty_vocabulary_is_reported() {
        assert!(TfidfVectorizer::fit(&["a", "b c"]).is_none());
    }
}
