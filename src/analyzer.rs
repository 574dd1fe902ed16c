//! Morphological analysis of single words.
//!
//! The analysis automaton stores every known word form *reversed*,
//! followed by the `|` delimiter and a base-36 annotation packing
//! `(flex_model, flexion_len, base_len)` into one integer. Analyzing a
//! word means walking its reversed characters through the automaton,
//! decoding the annotations found behind `|`, and re-generating the
//! paradigm of every referenced flex model around the word's own stem.
//!
//! When the automaton does not know the full word, two recovery paths
//! exist:
//!
//! - **Known prefixes**: "суперстол" fails the walk but "стол" is known
//!   and "супер" decomposes into dictionary prefixes, so the output is
//!   upgraded to an exact analysis covering the whole word.
//! - **Prediction**: at least [`MIN_MATCH_FOR_PREDICTION`] trailing
//!   characters matched, so the paradigms reachable from the stop state
//!   are applied to the unknown stem, producing plausible forms for
//!   out-of-vocabulary words.

use crate::automaton::{Automaton, MorphAutomaton, ANNOTATION_DELIMITER};
use crate::rulebase::MorphologyBase;
use crate::text::{from_base36, reversed, to_base36};

/// Minimum matched reverse-prefix length before prediction kicks in.
pub const MIN_MATCH_FOR_PREDICTION: usize = 4;
/// Minimum stem length a prediction may assume.
pub const MIN_BASE_LENGTH: usize = 3;

/// One analyzed form of a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordForm {
    pub word: String,
    /// Length of `word` in characters.
    pub word_chars: usize,
    pub flex_model_no: u16,
    pub flexion_size: u8,
    pub base_size: u8,
    /// Index into the rule base's grammar table.
    pub grammar: Option<usize>,
    /// How many distinct automaton outputs produced this form; doubles as
    /// the ranking key.
    pub frequency: u32,
}

/// Pack a morphology annotation into its base-36 automaton spelling.
///
/// Flex model counts stay below 2¹⁶ and flexions/stems below 256
/// characters in every known dictionary, so the triple fits a `u32`.
pub fn encode_annotation(flex_model_no: u16, flexion_size: u8, base_size: u8) -> String {
    let code = (u32::from(flex_model_no) << 16)
        | (u32::from(flexion_size) << 8)
        | u32::from(base_size);
    to_base36(code)
}

/// Decode a base-36 annotation back into `(flex_model, flexion, base)`.
pub fn decode_annotation(annotation: &str) -> Option<(u16, u8, u8)> {
    let code = from_base36(annotation)?;
    Some(((code >> 16) as u16, (code >> 8) as u8, code as u8))
}

/// One decoded automaton output.
#[derive(Debug, Clone)]
struct AutomatOutput {
    /// Characters emitted before the delimiter: the still-unread tail of
    /// some stored reversed form. Empty when the walk stopped exactly at
    /// the annotation.
    tail_len: usize,
    annotation: String,
    /// Matched reverse-prefix length reported by the automaton.
    automat_prefix: usize,
    /// Filled by the productive-output filter on upgrade.
    known_prefix: usize,
    is_prediction: bool,
}

impl AutomatOutput {
    fn decode(is_prediction: bool, matched: usize, labels: &[char]) -> Option<Self> {
        let delimiter = labels.iter().position(|&c| c == ANNOTATION_DELIMITER)?;
        Some(Self {
            tail_len: delimiter,
            annotation: labels[delimiter + 1..].iter().collect(),
            automat_prefix: matched,
            known_prefix: 0,
            is_prediction,
        })
    }
}

/// Generate the full training word list: every lemma expanded through its
/// flex model, reversed, delimited and annotated. `max_count > 0` caps
/// the output (testing hook).
///
/// Requires a rule base loaded with its lemma section.
pub fn generate_all_words(base: &MorphologyBase, max_count: usize) -> Vec<String> {
    let lemmas = base
        .lemmas
        .as_ref()
        .expect("automaton training requires the lemma section");
    let mut words = Vec::new();
    for lemma in lemmas {
        let model = &base.flex_models[lemma.flex_model_no];
        let stem = lemma.base.as_deref().unwrap_or("");
        let stem_chars = stem.chars().count();
        for variance in model {
            let mut form = String::new();
            if let Some(prefix) = &variance.prefix {
                form.push_str(prefix);
            }
            form.push_str(stem);
            if let Some(flexion) = &variance.flexion {
                form.push_str(flexion);
            }
            let wide: Vec<char> = form.chars().collect();
            let mut entry: String = reversed(&wide).into_iter().collect();
            entry.push(ANNOTATION_DELIMITER);
            entry.push_str(&encode_annotation(
                lemma.flex_model_no as u16,
                variance.flexion_chars() as u8,
                stem_chars as u8,
            ));
            words.push(entry);
            if max_count > 0 && words.len() >= max_count {
                return words;
            }
        }
    }
    words
}

/// Sort (and deduplicate) training words into the strictly increasing
/// order the incremental construction requires.
pub fn prepare_words_for_automaton(words: &mut Vec<String>) {
    words.sort_unstable();
    words.dedup();
}

/// Build the analysis automaton from prepared training words.
pub fn build_analysis_automaton(words: &[String]) -> Automaton {
    let mut automaton = Automaton::new();
    for word in words {
        let wide: Vec<char> = word.chars().collect();
        automaton.add_word(&wide);
    }
    automaton.finish();
    automaton
}

/// Check whether `head` decomposes into one or more known prefixes
/// ("суперультрамега" passes when both pieces are known). Mirrors the
/// dictionary's recursive scan: the first shorter matching prefix commits
/// the decomposition of the remainder.
pub fn has_known_prefix(head: &[char], prefixes: &[Vec<char>]) -> bool {
    for prefix in prefixes {
        if prefix.len() == head.len() {
            if prefix.as_slice() == head {
                return true;
            }
        } else if prefix.len() < head.len() && head[..prefix.len()] == prefix[..] {
            return has_known_prefix(&head[prefix.len()..], prefixes);
        }
    }
    false
}

/// Upgrade prediction outputs whose unmatched head is entirely made of
/// known prefixes, then — once any upgrade happened — drop the remaining
/// prediction outputs: an exact reading beats guessed paradigms.
fn filter_productive_outputs(
    outputs: &mut Vec<AutomatOutput>,
    word: &[char],
    base: &MorphologyBase,
) {
    let mut upgraded = false;
    for output in outputs.iter_mut() {
        if output.is_prediction && output.tail_len == 0 {
            let head_len = word.len() - output.automat_prefix;
            if has_known_prefix(&word[..head_len], &base.all_prefixes) {
                output.is_prediction = false;
                output.known_prefix = head_len;
                upgraded = true;
            }
        }
    }
    if upgraded {
        outputs.retain(|output| !output.is_prediction);
    }
}

/// Expand one flex model around a stem carved out of `word`.
///
/// The stem is `word[len - flexion_size - base_size .. len - flexion_size]`;
/// each variance contributes `prefix ++ stem ++ flexion`. `only_lemma`
/// keeps just variance 0.
pub fn all_word_variations(
    word: &[char],
    only_lemma: bool,
    flexion_size: usize,
    base_size: usize,
    flex_model_no: u16,
    base: &MorphologyBase,
) -> Vec<WordForm> {
    let model = match base.flex_models.get(flex_model_no as usize) {
        Some(model) if !model.is_empty() => model,
        _ => return Vec::new(),
    };
    let Some(start) = word.len().checked_sub(flexion_size + base_size) else {
        return Vec::new();
    };
    let stem: String = word[start..start + base_size].iter().collect();
    let count = if only_lemma { 1 } else { model.len() };
    let mut forms = Vec::with_capacity(count);
    for variance in &model[..count] {
        let mut text = String::new();
        let mut chars = base_size;
        if let Some(prefix) = &variance.prefix {
            text.push_str(prefix);
            chars += prefix.chars().count();
        }
        text.push_str(&stem);
        if let Some(flexion) = &variance.flexion {
            text.push_str(flexion);
            chars += variance.flexion_chars();
        }
        forms.push(WordForm {
            word: text,
            word_chars: chars,
            flex_model_no,
            flexion_size: variance.flexion_chars() as u8,
            base_size: base_size as u8,
            grammar: variance.grammar,
            frequency: 0,
        });
    }
    forms
}

fn merge_unique(result: &mut Vec<WordForm>, variations: Vec<WordForm>, distinct_ancodes: bool) {
    for variation in variations {
        let existing = result.iter_mut().find(|form| {
            form.word == variation.word
                && (!distinct_ancodes || form.grammar == variation.grammar)
        });
        match existing {
            Some(form) => form.frequency += 1,
            None => result.push(variation),
        }
    }
}

/// Analyze one (lowercased) word against an automaton and its rule base.
///
/// Returns all derivable forms, or with `only_lemmas` just the lemma of
/// every candidate paradigm. `distinct_ancodes` keeps forms apart when
/// they differ only in grammar. Results are sorted by descending
/// frequency, so the best-supported reading comes first.
pub fn analyze_word<A: MorphAutomaton + ?Sized>(
    word: &[char],
    automaton: &A,
    base: &MorphologyBase,
    only_lemmas: bool,
    distinct_ancodes: bool,
) -> Vec<WordForm> {
    let reversed_word = reversed(word);
    let mut outputs: Vec<AutomatOutput> = Vec::new();
    automaton.enumerate_outputs(
        &reversed_word,
        MIN_MATCH_FOR_PREDICTION,
        &mut |is_prediction, matched, labels| {
            if let Some(output) = AutomatOutput::decode(is_prediction, matched, labels) {
                outputs.push(output);
            }
        },
    );
    filter_productive_outputs(&mut outputs, word, base);

    let mut checked_models: Vec<u16> = Vec::with_capacity(outputs.len());
    let mut result: Vec<WordForm> = Vec::new();
    for output in &outputs {
        let Some((flex_model_no, flexion_size, base_size)) = decode_annotation(&output.annotation)
        else {
            continue;
        };
        if checked_models.contains(&flex_model_no) {
            continue;
        }
        checked_models.push(flex_model_no);
        if output.is_prediction {
            let Some(base_part) = word.len().checked_sub(flexion_size as usize) else {
                continue;
            };
            if base_part >= MIN_BASE_LENGTH {
                let variations = all_word_variations(
                    word,
                    only_lemmas,
                    flexion_size as usize,
                    base_part,
                    flex_model_no,
                    base,
                );
                merge_unique(&mut result, variations, distinct_ancodes);
            }
        } else {
            let variations = all_word_variations(
                word,
                only_lemmas,
                flexion_size as usize,
                output.known_prefix + base_size as usize,
                flex_model_no,
                base,
            );
            merge_unique(&mut result, variations, distinct_ancodes);
        }
    }
    if result.len() > 1 {
        result.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rulebase::tests::base_from;

    const GRAMTAB: &str = "\
Са Са С им,ед
Св Св С рд,мн
";

    // Model 0: lemma "<stem>ь", second form "<stem>и".
    // Model 1: zero-flexion lemma, plural "<stem>ы".
    const MRD: &str = "\
2
ь*Са%и*Св
*Са%ы*Св
0
0
1
супер, ультра
3
стал 0 0 - Са -
стол 1 0 - Са -
сталь 1 0 - Са -
";

    fn wide(word: &str) -> Vec<char> {
        word.chars().collect()
    }

    fn automaton_and_base() -> (Automaton, MorphologyBase) {
        let base = base_from(GRAMTAB, MRD, true);
        let mut words = generate_all_words(&base, 0);
        prepare_words_for_automaton(&mut words);
        (build_analysis_automaton(&words), base)
    }

    #[test]
    fn annotation_round_trip() {
        for (model, flexion, stem) in [(0u16, 0u8, 0u8), (1, 2, 4), (2600, 255, 255)] {
            let annotation = encode_annotation(model, flexion, stem);
            assert_eq!(decode_annotation(&annotation), Some((model, flexion, stem)));
        }
    }

    #[test]
    fn generates_reversed_annotated_forms() {
        let base = base_from(GRAMTAB, MRD, true);
        let words = generate_all_words(&base, 0);
        // 3 lemmas × 2 variances.
        assert_eq!(words.len(), 6);
        let expected = format!("ьлатс|{}", encode_annotation(0, 1, 4));
        assert!(words.contains(&expected), "{words:?}");
        // Zero-flexion lemma of model 1.
        let expected = format!("лотс|{}", encode_annotation(1, 0, 4));
        assert!(words.contains(&expected), "{words:?}");
    }

    #[test]
    fn max_count_caps_generation() {
        let base = base_from(GRAMTAB, MRD, true);
        assert_eq!(generate_all_words(&base, 3).len(), 3);
    }

    #[test]
    fn lemmatizes_known_inflected_form() {
        let (automaton, base) = automaton_and_base();
        let lemmas = analyze_word(&wide("стали"), &automaton, &base, true, false);
        let words: Vec<&str> = lemmas.iter().map(|f| f.word.as_str()).collect();
        // "стали" reads as a form of "сталь" (model 0) and as the plural
        // of "сталь" itself (model 1, stem "стали" is unknown, so only
        // model 0 applies exactly).
        assert!(words.contains(&"сталь"), "{words:?}");
    }

    #[test]
    fn returns_all_forms_without_only_lemmas() {
        let (automaton, base) = automaton_and_base();
        let forms = analyze_word(&wide("стали"), &automaton, &base, false, false);
        let words: Vec<&str> = forms.iter().map(|f| f.word.as_str()).collect();
        assert!(words.contains(&"сталь"));
        assert!(words.contains(&"стали"));
    }

    #[test]
    fn duplicate_forms_bump_frequency_and_rank_first() {
        // "сталь" is produced both by model 0 (stem "стал" + "ь") and by
        // model 1 (lemma of stem "сталь"), so its frequency outranks the
        // forms produced once.
        let (automaton, base) = automaton_and_base();
        let forms = analyze_word(&wide("сталь"), &automaton, &base, false, false);
        assert!(forms.len() > 1);
        assert_eq!(forms[0].word, "сталь");
        assert!(forms[0].frequency > forms[1].frequency);
    }

    #[test]
    fn unknown_word_gets_predicted_paradigm() {
        let (automaton, base) = automaton_and_base();
        // "устали" is unknown; its tail "стали" is, so prediction applies
        // model 0 around the extended stem.
        let lemmas = analyze_word(&wide("устали"), &automaton, &base, true, false);
        let words: Vec<&str> = lemmas.iter().map(|f| f.word.as_str()).collect();
        assert!(words.contains(&"усталь"), "{words:?}");
    }

    #[test]
    fn too_short_match_predicts_nothing() {
        let (automaton, base) = automaton_and_base();
        let forms = analyze_word(&wide("про"), &automaton, &base, false, false);
        assert!(forms.is_empty());
    }

    #[test]
    fn known_prefix_upgrades_to_exact_analysis() {
        let (automaton, base) = automaton_and_base();
        let lemmas = analyze_word(&wide("суперстали"), &automaton, &base, true, false);
        let words: Vec<&str> = lemmas.iter().map(|f| f.word.as_str()).collect();
        assert!(words.contains(&"суперсталь"), "{words:?}");
    }

    #[test]
    fn compound_known_prefixes_decompose() {
        let prefixes: Vec<Vec<char>> = ["супер", "ультра"]
            .iter()
            .map(|p| p.chars().collect())
            .collect();
        assert!(has_known_prefix(&wide("супер"), &prefixes));
        assert!(has_known_prefix(&wide("суперультра"), &prefixes));
        assert!(has_known_prefix(&wide("ультрасупер"), &prefixes));
        assert!(!has_known_prefix(&wide("гипер"), &prefixes));
        assert!(!has_known_prefix(&wide("суперги"), &prefixes));
    }

    #[test]
    fn variations_slice_the_stem_by_characters() {
        let base = base_from(GRAMTAB, MRD, true);
        let forms = all_word_variations(&wide("стали"), false, 1, 4, 0, &base);
        let words: Vec<&str> = forms.iter().map(|f| f.word.as_str()).collect();
        assert_eq!(words, ["сталь", "стали"]);
        assert_eq!(forms[0].base_size, 4);
        assert_eq!(forms[0].flexion_size, 1);
        // Oversized split asks for more characters than the word has.
        assert!(all_word_variations(&wide("ст"), false, 1, 4, 0, &base).is_empty());
    }
}
