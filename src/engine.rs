//! The top-level engine: documents, similarity scores and containment.
//!
//! [`Morph`] owns the loaded languages; [`MorphDoc`] pairs a normalized
//! text with (optionally) its searchable index. The similarity score
//! between two texts is a length-normalized coverage ratio: every
//! space-separated word of the search text is run as a phrase query
//! against the document, the byte lengths of the matched renditions are
//! summed and divided by the document's length. Identical texts in
//! different inflections score 1.0; unrelated texts approach 0.

use std::path::Path;

use crate::document::Document;
use crate::error::Result;
use crate::intersect::find_multi_intersection;
use crate::multilang::MultiMorphology;
use crate::text::normalize;
use crate::tokenizer::Tokenizer;

/// Per-language word-description cache capacity.
pub const DESCRIPTION_CACHE_SIZE: usize = 150;

/// A text prepared for intersection queries.
pub struct MorphDoc {
    /// Byte length of the text as the caller supplied it; the score
    /// denominators use this, not the normalized length.
    original_len: usize,
    text: String,
    index: Option<Document>,
}

impl MorphDoc {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// The searchable blob, when this document was built with one.
    pub fn index(&self) -> Option<&Document> {
        self.index.as_ref()
    }
}

/// The multilingual morphology engine.
pub struct Morph {
    multi: MultiMorphology,
}

impl Morph {
    /// Load every language dictionary under `dictionary_root`.
    pub fn new(dictionary_root: &Path) -> Result<Self> {
        Self::with_cache_size(dictionary_root, DESCRIPTION_CACHE_SIZE)
    }

    pub fn with_cache_size(dictionary_root: &Path, cache_size: usize) -> Result<Self> {
        Ok(Self {
            multi: MultiMorphology::load(dictionary_root, cache_size)?,
        })
    }

    pub fn multi(&self) -> &MultiMorphology {
        &self.multi
    }

    /// Normalize `text` and build its searchable index.
    pub fn document(&self, text: &str) -> MorphDoc {
        let normalized = normalize(text);
        let index = Document::from_text(&self.multi, &normalized, 0);
        MorphDoc {
            original_len: text.len(),
            text: normalized,
            index: Some(index),
        }
    }

    /// Index `text` as-is, skipping normalization. For callers that
    /// already lowercased the text themselves.
    pub fn document_raw(&self, text: &str) -> MorphDoc {
        MorphDoc {
            original_len: text.len(),
            text: text.to_string(),
            index: Some(Document::from_text(&self.multi, text, 0)),
        }
    }

    /// Normalize `text` without indexing it — the cheap shape for the
    /// search side of an intersection.
    pub fn search_text(&self, text: &str) -> MorphDoc {
        MorphDoc {
            original_len: text.len(),
            text: normalize(text),
            index: None,
        }
    }

    /// Split `text` at any of the `delimiters` characters and index every
    /// non-empty piece as its own document. Useful for scoring a batch of
    /// phrases against the same queries.
    pub fn document_array(&self, text: &str, delimiters: &[char]) -> Vec<MorphDoc> {
        text.split(|c: char| delimiters.contains(&c))
            .filter(|piece| !piece.is_empty())
            .map(|piece| self.document(piece))
            .collect()
    }

    /// Run multi-phrase queries (one per line, `lang|` and `!` prefixes
    /// honored) against an indexed document. Returns the matched original
    /// renditions, sorted and newline-joined with a trailing newline;
    /// empty string when nothing matched or the document has no index.
    pub fn find_matches(&self, document: &MorphDoc, phrase_lines: &str) -> String {
        match &document.index {
            Some(index) => find_multi_intersection(index, &self.multi, phrase_lines),
            None => String::new(),
        }
    }

    /// Sum of matched-rendition byte lengths for every space-separated
    /// word of the search text.
    fn match_coverage(&self, document: &MorphDoc, search: &MorphDoc) -> usize {
        let Some(index) = &document.index else {
            return 0;
        };
        search
            .text
            .split(' ')
            .filter(|token| !token.is_empty())
            .map(|token| find_multi_intersection(index, &self.multi, token).len())
            .sum()
    }

    /// Similarity of `search` to `document`, with the length guard: a
    /// search text longer than the document scores 0.
    pub fn intersect(&self, document: &MorphDoc, search: &MorphDoc) -> f64 {
        if search.original_len > document.original_len {
            return 0.0;
        }
        self.coverage_ratio(document, search)
    }

    /// Similarity without the length guard: the coverage ratio is
    /// reported (clamped to 1.0) even for oversized search texts.
    pub fn intersect_unguarded(&self, document: &MorphDoc, search: &MorphDoc) -> f64 {
        self.coverage_ratio(document, search)
    }

    fn coverage_ratio(&self, document: &MorphDoc, search: &MorphDoc) -> f64 {
        let accumulated = self.match_coverage(document, search);
        if accumulated >= document.original_len {
            1.0
        } else {
            accumulated as f64 / document.original_len as f64
        }
    }

    /// Build both documents and score `search` against `doc_text`.
    pub fn str_intersect_str(&self, doc_text: &str, search: &str) -> f64 {
        let document = self.document(doc_text);
        let search = self.search_text(search);
        self.intersect(&document, &search)
    }

    pub fn str_intersect_str_unguarded(&self, doc_text: &str, search: &str) -> f64 {
        let document = self.document(doc_text);
        let search = self.search_text(search);
        self.intersect_unguarded(&document, &search)
    }

    /// Does the search text occur in the document (in any inflection)?
    /// One match suffices.
    pub fn doc_contains(&self, document: &MorphDoc, search: &MorphDoc) -> bool {
        match &document.index {
            Some(index) => !find_multi_intersection(index, &self.multi, &search.text).is_empty(),
            None => false,
        }
    }

    pub fn str_contains(&self, doc_text: &str, search: &str) -> bool {
        let document = self.document(doc_text);
        let search = self.search_text(search);
        self.doc_contains(&document, &search)
    }

    /// Rewrite `text` to its normal form: the first lemma of every word,
    /// joined with single spaces in input order.
    pub fn normalize_form(&self, text: &str) -> String {
        let normalized = normalize(text);
        let mut suggested = None;
        let mut lemmas: Vec<String> = Vec::new();
        for token in Tokenizer::new(&normalized) {
            let (description, detected) =
                self.multi
                    .word_description(suggested, Some(&token.wide), token.text);
            if detected.is_some() && detected != suggested {
                suggested = detected;
            }
            if let Some(first) = description.split('.').find(|part| !part.is_empty()) {
                lemmas.push(first.to_string());
            }
        }
        lemmas.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multilang::tests::toy_multi;

    fn engine() -> Morph {
        Morph {
            multi: toy_multi(),
        }
    }

    #[test]
    fn one_word_case_change_scores_full() {
        let morph = engine();
        assert_eq!(morph.str_intersect_str("Стали ", "Сталь "), 1.0);
    }

    #[test]
    fn inflected_query_scores_positive() {
        let morph = engine();
        let score = morph.str_intersect_str("роли стали", "роль сталь");
        assert!(score > 0.0, "{score}");
        assert!(score <= 1.0);
    }

    #[test]
    fn unrelated_texts_score_low() {
        let morph = engine();
        let score = morph.str_intersect_str("роли стали", "паровоз гудит");
        assert_eq!(score, 0.0);
    }

    #[test]
    fn word_order_matters() {
        let morph = engine();
        let forward = morph.str_intersect_str("роли стали", "роли стали");
        let backward = morph.str_intersect_str("стали роли", "роли стали");
        assert_eq!(forward, 1.0);
        // Each single word still matches, so the score is positive but
        // the phrase as a whole is not rewarded more than its words.
        assert!(backward > 0.0);
        assert!(backward <= forward);
    }

    #[test]
    fn length_guard_zeroes_oversized_search() {
        let morph = engine();
        let guarded = morph.str_intersect_str("стали", "стали стали стали");
        assert_eq!(guarded, 0.0);
        let unguarded = morph.str_intersect_str_unguarded("стали", "стали стали стали");
        assert!(unguarded > 0.0);
        assert!(unguarded <= 1.0);
    }

    #[test]
    fn scores_stay_in_bounds() {
        let morph = engine();
        for (doc, search) in [
            ("стали", "сталь"),
            ("роли стали cats", "роль"),
            ("", "сталь"),
            ("стали", ""),
        ] {
            let score = morph.str_intersect_str(doc, search);
            assert!((0.0..=1.0).contains(&score), "{doc:?}/{search:?}: {score}");
            let score = morph.str_intersect_str_unguarded(doc, search);
            assert!((0.0..=1.0).contains(&score), "{doc:?}/{search:?}: {score}");
        }
    }

    #[test]
    fn containment_checks_first_match() {
        let morph = engine();
        assert!(morph.str_contains("купим стали недорого", "сталь"));
        assert!(!morph.str_contains("купим стали недорого", "паровоз"));
    }

    #[test]
    fn normalize_form_takes_first_lemmas() {
        let morph = engine();
        assert_eq!(
            morph.normalize_form("Роли, стали и cats!"),
            "роль сталь и cat"
        );
    }

    #[test]
    fn document_array_splits_and_indexes() {
        let morph = engine();
        let docs = morph.document_array("роли стали.cats;;стали", &['.', ';']);
        assert_eq!(docs.len(), 3);
        assert!(docs.iter().all(|d| d.index().is_some()));
        assert_eq!(docs[1].text(), "cats");
        let search = morph.search_text("сталь");
        assert_eq!(morph.intersect_unguarded(&docs[2], &search), 1.0);
    }

    #[test]
    fn search_text_has_no_index() {
        let morph = engine();
        let search = morph.search_text("Стали");
        assert!(search.index().is_none());
        assert_eq!(search.text(), "стали");
        assert_eq!(search.original_len(), "Стали".len());
        let document = morph.document("Стали");
        assert!(document.index().is_some());
        assert_eq!(morph.find_matches(&search, "сталь"), "");
    }
}
