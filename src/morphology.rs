//! One language's complete analysis kit: rule base, compact automaton and
//! the word-description cache, loaded together from a dictionary
//! directory (`morphs.mrd` + `gramtab.tab` + `automat.save`).
//!
//! The rule base and automaton are immutable after load and can be shared
//! freely; the description cache is the only mutable state and sits
//! behind a mutex. Parallel indexing wants one `Morphology` per thread —
//! the lock exists for the callers that cannot afford copies.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing::info;

use crate::analyzer::{
    analyze_word, build_analysis_automaton, generate_all_words, prepare_words_for_automaton,
    WordForm,
};
use crate::cache::{CachedDescription, DescriptionCache};
use crate::compact::CompactAutomaton;
use crate::error::{MorphError, Result};
use crate::rulebase::{
    MorphologyBase, AUTOMATON_FILE_NAME, GRAMTAB_FILE_NAME, MRD_FILE_NAME,
};
use crate::text::{is_garbage_word, reversed, DESCRIPTION_TERMINATOR};

/// Result of building a word description: the rewritten form (when one
/// was produced) plus the garbage verdict for the word.
#[derive(Debug, PartialEq, Eq)]
pub struct DescriptionOutcome {
    pub text: Option<String>,
    pub is_garbage: bool,
}

pub struct Morphology {
    base: MorphologyBase,
    automaton: CompactAutomaton,
    cache: Mutex<DescriptionCache>,
}

impl Morphology {
    /// Load a language from its dictionary directory. The automaton file
    /// must already exist; discovery-level code regenerates it first when
    /// it can (see [`crate::multilang`]).
    pub fn load(dictionary_dir: &Path, cache_size: usize) -> Result<Self> {
        let base = MorphologyBase::from_files(
            &dictionary_dir.join(MRD_FILE_NAME),
            &dictionary_dir.join(GRAMTAB_FILE_NAME),
            false,
        )?;
        let automaton = CompactAutomaton::load_file(&dictionary_dir.join(AUTOMATON_FILE_NAME))
            .map_err(automaton_error)?;
        Ok(Self::from_parts(base, automaton, cache_size))
    }

    /// Assemble a morphology from already-loaded pieces.
    pub fn from_parts(
        base: MorphologyBase,
        automaton: CompactAutomaton,
        cache_size: usize,
    ) -> Self {
        Self {
            base,
            automaton,
            cache: Mutex::new(DescriptionCache::new(cache_size)),
        }
    }

    pub fn base(&self) -> &MorphologyBase {
        &self.base
    }

    /// All lemmas of `word`, best-supported first.
    pub fn word_lemmas(&self, word: &[char]) -> Vec<WordForm> {
        analyze_word(word, &self.automaton, &self.base, true, false)
    }

    /// Every derivable form of `word`.
    pub fn word_forms(&self, word: &[char]) -> Vec<WordForm> {
        analyze_word(word, &self.automaton, &self.base, false, false)
    }

    /// Length of the trailing part of `word` this language's automaton
    /// recognizes without prediction. The language-detection signal.
    pub fn known_part_of_word(&self, word: &[char]) -> usize {
        self.automaton.known_prefix_length(&reversed(word))
    }

    /// Build (or fetch) the description of one word: every lemma differing
    /// from the surface form, then the surface form, each terminated:
    /// `стать.сталь.стали.`.
    ///
    /// Garbage words yield just `word.` and are never cached. A word with
    /// no lemmas is an *imitation* — cached, flagged, surface form only.
    /// `dont_imitate` probes whether this language knows the word: garbage,
    /// imitations and even cache hits report `None` there, pushing the
    /// caller onto its language-fallback path.
    pub fn word_description(
        &self,
        word: Option<&[char]>,
        word_utf8: &str,
        dont_imitate: bool,
    ) -> DescriptionOutcome {
        if let Some(cached) = self
            .cache
            .lock()
            .expect("description cache poisoned")
            .get(word_utf8.as_bytes())
        {
            return if dont_imitate {
                // Garbage is never cached, so a hit means "known"; the
                // fallback path will re-serve it.
                DescriptionOutcome {
                    text: None,
                    is_garbage: false,
                }
            } else {
                DescriptionOutcome {
                    text: Some(cached.text.clone()),
                    is_garbage: false,
                }
            };
        }

        let converted;
        let wide: &[char] = match word {
            Some(wide) => wide,
            None => {
                converted = word_utf8.chars().collect::<Vec<char>>();
                &converted
            }
        };

        if is_garbage_word(wide) {
            return DescriptionOutcome {
                text: (!dont_imitate).then(|| terminated(word_utf8)),
                is_garbage: true,
            };
        }

        let lemmas = self.word_lemmas(wide);
        let imitation = lemmas.is_empty();
        if imitation && dont_imitate {
            return DescriptionOutcome {
                text: None,
                is_garbage: false,
            };
        }

        let surface: String = wide.iter().collect();
        let mut description = String::new();
        for lemma in &lemmas {
            if lemma.word != surface {
                description.push_str(&lemma.word);
                description.push(DESCRIPTION_TERMINATOR as char);
            }
        }
        description.push_str(word_utf8);
        description.push(DESCRIPTION_TERMINATOR as char);

        self.cache
            .lock()
            .expect("description cache poisoned")
            .insert(
                word_utf8.as_bytes().to_vec(),
                CachedDescription {
                    text: description.clone(),
                    imitation,
                },
            );
        DescriptionOutcome {
            text: Some(description),
            is_garbage: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn cached_descriptions(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

/// `word.` — the description of a word that contributes no lemmas.
pub(crate) fn terminated(word_utf8: &str) -> String {
    let mut text = String::with_capacity(word_utf8.len() + 1);
    text.push_str(word_utf8);
    text.push(DESCRIPTION_TERMINATOR as char);
    text
}

fn automaton_error(error: io::Error) -> MorphError {
    if error.kind() == io::ErrorKind::InvalidData {
        MorphError::MalformedAutomaton(error.to_string())
    } else {
        MorphError::Io(error)
    }
}

/// Regenerate the analysis automaton of one dictionary directory from its
/// rule base and save it as `automat.save`. Returns the state count.
pub fn build_automaton_file(dictionary_dir: &Path) -> Result<u32> {
    let base = MorphologyBase::from_files(
        &dictionary_dir.join(MRD_FILE_NAME),
        &dictionary_dir.join(GRAMTAB_FILE_NAME),
        true,
    )?;
    let mut words = generate_all_words(&base, 0);
    prepare_words_for_automaton(&mut words);
    info!(forms = words.len(), "building analysis automaton");
    let automaton = build_analysis_automaton(&words);
    let output = dictionary_dir.join(AUTOMATON_FILE_NAME);
    let mut writer = BufWriter::new(File::create(&output)?);
    let states = automaton.save(&mut writer)?;
    writer.flush()?;
    info!(states, path = %output.display(), "analysis automaton saved");
    Ok(states)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rulebase::tests::base_from;

    const GRAMTAB: &str = "\
Са Са С им,ед
Св Св С рд,мн
";

    const MRD: &str = "\
2
ь*Са%и*Св
*Са%ы*Св
0
0
1
супер
3
стал 0 0 - Са -
стол 1 0 - Са -
сталь 1 0 - Са -
";

    fn wide(word: &str) -> Vec<char> {
        word.chars().collect()
    }

    pub(crate) fn morphology_from(gramtab: &str, mrd: &str, cache_size: usize) -> Morphology {
        let trainer = base_from(gramtab, mrd, true);
        let mut words = generate_all_words(&trainer, 0);
        prepare_words_for_automaton(&mut words);
        let automaton = build_analysis_automaton(&words);
        let mut bytes = Vec::new();
        automaton.save(&mut bytes).unwrap();
        let compact = CompactAutomaton::load(&mut bytes.as_slice()).unwrap();
        Morphology::from_parts(base_from(gramtab, mrd, false), compact, cache_size)
    }

    fn fixture() -> Morphology {
        morphology_from(GRAMTAB, MRD, 16)
    }

    #[test]
    fn description_ends_with_surface_form() {
        let morphology = fixture();
        let outcome = morphology.word_description(Some(&wide("стали")), "стали", false);
        let text = outcome.text.unwrap();
        assert!(text.ends_with("стали."), "{text}");
        assert_eq!(text, "сталь.стали.");
        assert!(!outcome.is_garbage);
    }

    #[test]
    fn surface_equal_lemma_is_not_duplicated() {
        let morphology = fixture();
        let outcome = morphology.word_description(Some(&wide("сталь")), "сталь", false);
        assert_eq!(outcome.text.unwrap(), "сталь.");
    }

    #[test]
    fn garbage_words_are_not_cached() {
        let morphology = fixture();
        let outcome = morphology.word_description(Some(&wide("ст@ль")), "ст@ль", false);
        assert!(outcome.is_garbage);
        assert_eq!(outcome.text.unwrap(), "ст@ль.");
        assert_eq!(morphology.cached_descriptions(), 0);
    }

    #[test]
    fn unknown_word_is_an_imitation() {
        let morphology = fixture();
        let outcome = morphology.word_description(Some(&wide("хвост")), "хвост", false);
        assert_eq!(outcome.text.unwrap(), "хвост.");
        assert_eq!(morphology.cached_descriptions(), 1);
    }

    #[test]
    fn dont_imitate_reports_unknown_words() {
        let morphology = fixture();
        let unknown = morphology.word_description(Some(&wide("хвост")), "хвост", true);
        assert_eq!(unknown.text, None);
        assert!(!unknown.is_garbage);
        let garbage = morphology.word_description(Some(&wide("х-8")), "х-8", true);
        assert_eq!(garbage.text, None);
        assert!(garbage.is_garbage);
        // A known word still comes through.
        let known = morphology.word_description(Some(&wide("стали")), "стали", true);
        assert!(known.text.is_some());
    }

    #[test]
    fn cache_hit_with_dont_imitate_defers_to_fallback() {
        let morphology = fixture();
        morphology.word_description(Some(&wide("стали")), "стали", false);
        let probed = morphology.word_description(Some(&wide("стали")), "стали", true);
        assert_eq!(probed.text, None);
        assert!(!probed.is_garbage);
    }

    #[test]
    fn second_lookup_is_served_from_cache() {
        let morphology = fixture();
        let first = morphology.word_description(None, "стали", false);
        assert_eq!(morphology.cached_descriptions(), 1);
        let second = morphology.word_description(None, "стали", false);
        assert_eq!(first.text, second.text);
        assert_eq!(morphology.cached_descriptions(), 1);
    }

    #[test]
    fn known_part_measures_recognized_tail() {
        let morphology = fixture();
        assert_eq!(morphology.known_part_of_word(&wide("стали")), 5);
        // The tail "стали" of "устали" is recognized, the head is not.
        assert_eq!(morphology.known_part_of_word(&wide("устали")), 5);
        assert_eq!(morphology.known_part_of_word(&wide("хвост")), 0);
    }

    #[test]
    fn lemmas_and_forms_are_exposed() {
        let morphology = fixture();
        let lemmas = morphology.word_lemmas(&wide("стали"));
        assert!(lemmas.iter().any(|f| f.word == "сталь"));
        let forms = morphology.word_forms(&wide("стали"));
        assert!(forms.iter().any(|f| f.word == "стали"));
    }
}
