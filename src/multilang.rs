//! Morphological analysis across several languages at once.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ MultiMorphology                               │
//! │                                               │
//! │  ┌──────────────────┐  ┌──────────────────┐   │
//! │  │ Dictionary "ru"  │  │ Dictionary "en"  │   │
//! │  │ ┌──────────────┐ │  │ ┌──────────────┐ │   │
//! │  │ │ Morphology   │ │  │ │ Morphology   │ │   │
//! │  │ │ (rule base + │ │  │ │ (rule base + │ │   │
//! │  │ │  automaton)  │ │  │ │  automaton)  │ │   │
//! │  │ └──────────────┘ │  │ └──────────────┘ │   │
//! │  └──────────────────┘  └──────────────────┘   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! A dictionary root holds one subdirectory per language, named by an
//! optional numeric load-order prefix plus the language code (`01ru`,
//! `02en`, `de`). Each must contain `morphs.mrd` and `gramtab.tab`; the
//! `automat.save` file is regenerated on the spot when missing and the
//! directory is writable.
//!
//! Callers never have to name a language: each word is offered to every
//! automaton and the one recognizing the longest trailing part wins. An
//! explicit language can still be forced when a phrase is spelled
//! identically in related languages but lemmatizes differently.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::analyzer::WordForm;
use crate::error::{MorphError, Result};
use crate::morphology::{build_automaton_file, Morphology};
use crate::rulebase::AUTOMATON_FILE_NAME;
use crate::text::is_garbage_word;

/// One loaded language dictionary.
pub struct Dictionary {
    name: String,
    path: PathBuf,
    morphology: Morphology,
}

impl Dictionary {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn morphology(&self) -> &Morphology {
        &self.morphology
    }
}

/// The ordered set of loaded languages. Index 0 — the first in directory
/// order — is the main language every fallback lands on.
pub struct MultiMorphology {
    languages: Vec<Dictionary>,
}

/// Strip the numeric order prefix off a dictionary folder name:
/// `"01ru"` → `"ru"`. `None` when the name does not follow the
/// digits-then-letters shape.
pub fn extract_dictionary_name(folder_name: &str) -> Option<String> {
    let name = folder_name.trim_start_matches(|c: char| c.is_ascii_digit());
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(name.to_string())
}

impl MultiMorphology {
    /// Load every dictionary under `root`, in byte-wise folder-name order
    /// (the numeric prefixes exist to pin that order). Folders that do not
    /// parse as dictionary names are ignored; folders that fail to load
    /// are logged and skipped. At least one dictionary must survive.
    pub fn load(root: &Path, description_cache_size: usize) -> Result<Self> {
        let mut folders: Vec<(String, String)> = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let folder = entry.file_name().to_string_lossy().into_owned();
            if let Some(name) = extract_dictionary_name(&folder) {
                folders.push((folder, name));
            }
        }
        folders.sort();

        let mut languages = Vec::new();
        for (folder, name) in folders {
            let path = root.join(&folder);
            match load_dictionary(&path, description_cache_size) {
                Ok(morphology) => {
                    info!(language = %name, path = %path.display(), "dictionary loaded");
                    languages.push(Dictionary {
                        name,
                        path,
                        morphology,
                    });
                }
                Err(error) => {
                    warn!(language = %name, path = %path.display(), %error,
                          "skipping dictionary");
                }
            }
        }
        if languages.is_empty() {
            return Err(MorphError::NoDictionaries(root.to_path_buf()));
        }
        Ok(Self { languages })
    }

    pub(crate) fn from_dictionaries(languages: Vec<Dictionary>) -> Result<Self> {
        if languages.is_empty() {
            return Err(MorphError::NoDictionaries(PathBuf::new()));
        }
        Ok(Self { languages })
    }

    pub fn languages(&self) -> impl Iterator<Item = &Dictionary> {
        self.languages.iter()
    }

    pub fn language(&self, index: usize) -> &Dictionary {
        &self.languages[index]
    }

    /// Find a language whose name starts with `name` ("ru" matches a
    /// dictionary called "ru"; so does just "r"). Used by the `ru|`
    /// phrase prefix.
    pub fn dictionary_by_prefix(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.languages
            .iter()
            .position(|d| d.name.as_bytes().starts_with(name.as_bytes()))
    }

    /// Detect the language of `word`: the automaton recognizing the
    /// longest trailing run wins, a full-word match immediately. `None`
    /// for garbage or when no automaton recognizes anything.
    pub fn detect_language(&self, word: &[char]) -> Option<usize> {
        if is_garbage_word(word) {
            return None;
        }
        let mut best = None;
        let mut max_known = 0;
        for (index, dictionary) in self.languages.iter().enumerate() {
            let known = dictionary.morphology.known_part_of_word(word);
            if known == word.len() {
                return Some(index);
            }
            if known > max_known {
                max_known = known;
                best = Some(index);
            }
        }
        best
    }

    /// Analyze `word` with language fallback: try the suggested language,
    /// on empty results re-detect, and as the last resort use the main
    /// language. Returns the forms plus the language that actually
    /// produced them (`None` when no language did).
    pub fn word_forms(
        &self,
        suggested: Option<usize>,
        word: &[char],
    ) -> (Vec<WordForm>, Option<usize>) {
        if let Some(language) = suggested {
            let forms = self.languages[language].morphology.word_forms(word);
            if !forms.is_empty() {
                return (forms, Some(language));
            }
        }
        let mut detected = self.detect_language(word);
        let forms = self.languages[detected.unwrap_or(0)]
            .morphology
            .word_forms(word);
        if forms.is_empty() {
            detected = None;
        }
        (forms, detected)
    }

    /// Build a word description with language fallback, mirroring
    /// [`Morphology::word_description`] but choosing the language itself.
    ///
    /// With a suggested language the word is first probed there without
    /// imitation; a miss falls back to detection and, failing that, the
    /// main language with imitation allowed — so a description is always
    /// produced. The returned language is the one whose dictionary
    /// actually knew the word, `None` for garbage and imitations.
    pub fn word_description(
        &self,
        suggested: Option<usize>,
        word: Option<&[char]>,
        word_utf8: &str,
    ) -> (String, Option<usize>) {
        let converted;
        let wide: &[char] = match word {
            Some(wide) => wide,
            None => {
                converted = word_utf8.chars().collect::<Vec<char>>();
                &converted
            }
        };

        if let Some(language) = suggested {
            let probe =
                self.languages[language]
                    .morphology
                    .word_description(Some(wide), word_utf8, true);
            if let Some(text) = probe.text {
                return (text, Some(language));
            }
            let mut detected = if probe.is_garbage {
                None
            } else {
                self.detect_language(wide)
            };
            let fallback = detected.unwrap_or(0);
            let outcome =
                self.languages[fallback]
                    .morphology
                    .word_description(Some(wide), word_utf8, false);
            if outcome.is_garbage || detected == Some(language) {
                // The suggested language was probed and failed; detection
                // agreeing with it means the word is formally unknown.
                detected = None;
            }
            let text = outcome
                .text
                .unwrap_or_else(|| crate::morphology::terminated(word_utf8));
            return (text, detected);
        }

        let mut detected = self.detect_language(wide);
        let outcome = self.languages[detected.unwrap_or(0)].morphology.word_description(
            Some(wide),
            word_utf8,
            false,
        );
        if outcome.is_garbage {
            detected = None;
        }
        let text = outcome
            .text
            .unwrap_or_else(|| crate::morphology::terminated(word_utf8));
        (text, detected)
    }
}

fn load_dictionary(path: &Path, description_cache_size: usize) -> Result<Morphology> {
    if !path.join(AUTOMATON_FILE_NAME).exists() {
        info!(path = %path.display(), "automaton file missing, generating");
        build_automaton_file(path)?;
    }
    Morphology::load(path, description_cache_size)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::morphology::tests::morphology_from;

    pub(crate) const GRAMTAB: &str = "Са Са С им\nСв Св С рд\n";

    // "Russian-like" toy language: paradigm <stem>ь / <stem>и.
    pub(crate) const MRD_RU: &str = "\
1
ь*Са%и*Св
0
0
1
супер
2
стал 0 0 - Са -
рол 0 0 - Са -
";

    // "English-like" toy language over Latin stems: <stem> / <stem>s.
    pub(crate) const MRD_EN: &str = "\
1
*Са%s*Св
0
0
1
un
2
cat 0 0 - Са -
news 0 0 - Са -
";

    fn wide(word: &str) -> Vec<char> {
        word.chars().collect()
    }

    /// Two-language fixture shared with the document and intersection
    /// tests.
    pub(crate) fn toy_multi() -> MultiMorphology {
        let ru = Dictionary {
            name: "ru".to_string(),
            path: PathBuf::from("01ru"),
            morphology: morphology_from(GRAMTAB, MRD_RU, 16),
        };
        let en = Dictionary {
            name: "en".to_string(),
            path: PathBuf::from("02en"),
            morphology: morphology_from(GRAMTAB, MRD_EN, 16),
        };
        MultiMorphology::from_dictionaries(vec![ru, en]).unwrap()
    }

    fn multi() -> MultiMorphology {
        toy_multi()
    }

    #[test]
    fn folder_names_parse_to_languages() {
        assert_eq!(extract_dictionary_name("01ru").as_deref(), Some("ru"));
        assert_eq!(extract_dictionary_name("ru").as_deref(), Some("ru"));
        assert_eq!(extract_dictionary_name("2en").as_deref(), Some("en"));
        assert_eq!(extract_dictionary_name("01"), None);
        assert_eq!(extract_dictionary_name("ru.bak"), None);
        assert_eq!(extract_dictionary_name(""), None);
        assert_eq!(extract_dictionary_name("ru2"), None);
    }

    #[test]
    fn detects_language_by_longest_known_tail() {
        let multi = multi();
        assert_eq!(multi.detect_language(&wide("стали")), Some(0));
        assert_eq!(multi.detect_language(&wide("cats")), Some(1));
        // Garbage never detects.
        assert_eq!(multi.detect_language(&wide("ca7s")), None);
        // Nothing recognized at all.
        assert_eq!(multi.detect_language(&wide("щщщ")), None);
    }

    #[test]
    fn dictionary_prefix_lookup() {
        let multi = multi();
        assert_eq!(multi.dictionary_by_prefix("ru"), Some(0));
        assert_eq!(multi.dictionary_by_prefix("en"), Some(1));
        assert_eq!(multi.dictionary_by_prefix("r"), Some(0));
        assert_eq!(multi.dictionary_by_prefix("de"), None);
        assert_eq!(multi.dictionary_by_prefix(""), None);
    }

    #[test]
    fn description_detects_language_automatically() {
        let multi = multi();
        let (text, language) = multi.word_description(None, None, "стали");
        assert_eq!(text, "сталь.стали.");
        assert_eq!(language, Some(0));
        let (text, language) = multi.word_description(None, None, "cats");
        assert_eq!(text, "cat.cats.");
        assert_eq!(language, Some(1));
    }

    #[test]
    fn suggested_language_sticks_when_it_knows_the_word() {
        let multi = multi();
        let (text, language) = multi.word_description(Some(1), None, "cats");
        assert_eq!(text, "cat.cats.");
        assert_eq!(language, Some(1));
    }

    #[test]
    fn wrong_suggestion_falls_back_to_detection() {
        let multi = multi();
        let (text, language) = multi.word_description(Some(1), None, "стали");
        assert_eq!(text, "сталь.стали.");
        assert_eq!(language, Some(0));
    }

    #[test]
    fn unknown_word_is_language_less() {
        let multi = multi();
        let (text, language) = multi.word_description(None, None, "xyzzy");
        assert_eq!(text, "xyzzy.");
        assert_eq!(language, None);
        let (text, language) = multi.word_description(Some(0), None, "досках");
        assert_eq!(text, "досках.");
        assert_eq!(language, None);
    }

    #[test]
    fn garbage_goes_through_verbatim() {
        let multi = multi();
        let (text, language) = multi.word_description(None, None, "v2.0");
        assert_eq!(text, "v2.0.");
        assert_eq!(language, None);
    }

    #[test]
    fn forms_fall_back_across_languages() {
        let multi = multi();
        let (forms, language) = multi.word_forms(Some(0), &wide("cats"));
        assert_eq!(language, Some(1));
        assert!(forms.iter().any(|f| f.word == "cat"));
        let (forms, language) = multi.word_forms(None, &wide("никак"));
        assert!(forms.is_empty());
        assert_eq!(language, None);
    }
}
