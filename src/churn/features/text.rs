//! Text embeddings: TF-IDF followed by a 3-component truncated SVD per column.

mod svd;
mod tfidf;

use ndarray::{Array2, s};

use super::FeatureError;

pub use svd::TruncatedSvd;
pub use tfidf::{TfidfVectorizer, tokenize};

/// Text columns embedded, in output order.
pub const TEXT_COLUMNS: [&str; 2] = ["Surname", "SurGeoGendSal"];
pub const COMPONENTS_PER_COLUMN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct TextEmbedder {
    columns: Vec<(TfidfVectorizer, TruncatedSvd)>,
}

impl TextEmbedder {
    pub fn fit(columns: [&[String]; 2], seed: u64) -> Result<Self, FeatureError> {
        let columns = TEXT_COLUMNS
            .iter()
            .zip(columns)
            .map(|(&name, docs)| {
                let vectorizer = TfidfVectorizer::fit(docs).ok_or_else(|| {
                    FeatureError::EmptyVocabulary {
                        column: name.to_string(),
                    }
                })?;
                let svd = TruncatedSvd::fit(&vectorizer.transform(docs), COMPONENTS_PER_COLUMN, seed);
                Ok((vectorizer, svd))
            })
            .collect::<Result<Vec<_>, FeatureError>>()?;
        Ok(Self { columns })
    }

    /// `TextEmbedding0..` names for every produced column.
    pub fn column_names() -> Vec<String> {
        (0..TEXT_COLUMNS.len() * COMPONENTS_PER_COLUMN)
            .map(|idx| format!("TextEmbedding{idx}"))
            .collect()
    }

    /// `rows x 6` embedding; rows with only unknown tokens embed to zeros.
    pub fn transform(&self, columns: [&[String]; 2]) -> Array2<f64> {
        let n_rows = columns[0].len();
        let mut out = Array2::zeros((n_rows, TEXT_COLUMNS.len() * COMPONENTS_PER_COLUMN));
        for (idx, ((vectorizer, svd), docs)) in self.columns.iter().zip(columns).enumerate() {
            let start = idx * COMPONENTS_PER_COLUMN;
            let projected = svd.transform(&vectorizer.transform(docs));
            out.slice_mut(s![.., start..start + COMPONENTS_PER_COLUMN])
                .assign(&projected);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn always_six_columns() {
        let surnames = docs(&["Smith", "Jones", "Smith"]);
        let combined = docs(&["1SmithFrance", "2JonesSpain", "3SmithFrance"]);
        let embedder = TextEmbedder::fit([surnames.as_slice(), combined.as_slice()], 503).unwrap();
        let unseen = docs(&["Zed"]);
        let unseen_combined = docs(&["9ZedItaly"]);
        let embedded = embedder.transform([unseen.as_slice(), unseen_combined.as_slice()]);
        assert_eq!(embedded.dim(), (1, 6));
        assert!(embedded.iter().all(|&v| v == 0.0));
        assert_eq!(TextEmbedder::column_names()[5], "TextEmbedding5");
    }

    #[test]
    fn empty_vocabulary_names_the_column() {
        let surnames = docs(&["Li"]);
        let combined = docs(&["!"]);
        let err = TextEmbedder::fit([surnames.as_slice(), combined.as_slice()], 1).unwrap_err();
        assert!(matches!(err, FeatureError::EmptyVocabulary { column } if column == "SurGeoGendSal"));
    }
}
