//! The phrase intersection engine.
//!
//! Finds every occurrence of a phrase inside a document where each query
//! word may stand in any inflected form of its lemma, with word order
//! preserved. For the rewritten text "гриб.стать.сталь.стали.растить…"
//! and the phrase "грибы стали расти", the word after "грибы" must fall
//! inside the range right after the one "гриб" matched — matching chains
//! through adjacent [`WordRange`]s:
//!
//! 1. Every lemma of the first query word is searched (bracketed in
//!    terminators, so only whole components match); each hit yields the
//!    containing range and arms its successor range as "expected next".
//! 2. Every following query word must hit inside an armed range; each
//!    such hit arms that range's successor in turn.
//! 3. Survivors after the last word are walked back over their matched
//!    ranges and the original surface forms are joined into the result.
//!
//! Multi-phrase queries take one phrase per line, each optionally
//! prefixed by a language override (`en|oldest news`) and/or the
//! exact-match flag (`!продажа квартиры`).

use crate::document::Document;
use crate::multilang::MultiMorphology;
use crate::stringset::StringSet;
use crate::text::DESCRIPTION_TERMINATOR;
use crate::tokenizer::Tokenizer;

/// Separates the language override from the phrase: `ru|фраза`.
pub const LANGUAGE_SPLITTER: char = '|';
/// Marks a phrase as requiring the exact surface form: `!фраза`.
pub const EXACT_FLAG: char = '!';

/// Does `position` fall inside one of the `allowed` ranges?
/// Indices one past the ranges array (armed by a match on the last word
/// of the document) are skipped, never dereferenced.
fn position_in_allowed(document: &Document, position: i32, allowed: &[usize]) -> Option<usize> {
    let ranges_count = document.ranges_count();
    allowed.iter().copied().find(|&index| {
        index < ranges_count && {
            let range = document.range(index);
            position >= range.start_position && position < range.end_position
        }
    })
}

/// Search every component of one word description and arm the successor
/// range of every accepted hit.
fn find_lemmas_in_document(
    document: &Document,
    description: &str,
    allowed_ranges: &mut Vec<usize>,
    armed_ranges: &mut Vec<usize>,
) {
    let is_first_token = allowed_ranges.is_empty();
    let bytes = description.as_bytes();
    let mut cursor = 0usize;
    let mut first_component = true;
    let mut bracketed: Vec<u8>;
    while cursor + 1 < bytes.len() {
        let Some(offset) = bytes[cursor + 1..]
            .iter()
            .position(|&b| b == DESCRIPTION_TERMINATOR)
        else {
            break;
        };
        let next_terminator = cursor + 1 + offset;
        // The first component needs its opening terminator added by hand;
        // later components inherit it from the one closing their
        // predecessor.
        let sample: &[u8] = if first_component {
            bracketed = Vec::with_capacity(next_terminator + 2);
            bracketed.push(DESCRIPTION_TERMINATOR);
            bracketed.extend_from_slice(&bytes[..=next_terminator]);
            &bracketed
        } else {
            &bytes[cursor..=next_terminator]
        };
        if let Some((lo, hi)) = document.find_suffix_range(sample) {
            for sa_index in lo..=hi {
                let position = document.suffix_at(sa_index) as i32;
                if is_first_token {
                    if let Some(range_index) = document.find_word_range(position) {
                        allowed_ranges.push(range_index);
                        armed_ranges.push(range_index + 1);
                    }
                } else if let Some(range_index) =
                    position_in_allowed(document, position, allowed_ranges)
                {
                    armed_ranges.push(range_index + 1);
                }
            }
        }
        first_component = false;
        cursor = next_terminator;
    }
}

/// Find all occurrences of `phrase` in `document`, inserting each matched
/// original-form rendition into `results`. `exact` restricts every word
/// to its surface form; `suggested` seeds the language used for
/// lemmatizing the query words (it then sticks to whatever detection
/// finds, like the document builder).
pub fn find_intersection(
    document: &Document,
    multi: &MultiMorphology,
    suggested: Option<usize>,
    phrase: &str,
    exact: bool,
    results: &mut StringSet,
) {
    let mut suggested = suggested;
    let mut allowed_ranges: Vec<usize> = Vec::new();
    let mut armed_ranges: Vec<usize> = Vec::new();
    let mut tokens_count = 0usize;

    for token in Tokenizer::new(phrase) {
        if tokens_count > 0 && allowed_ranges.is_empty() {
            break;
        }
        armed_ranges.clear();
        let (description, detected) = multi.word_description(suggested, Some(&token.wide), token.text);
        if detected.is_some() && detected != suggested {
            suggested = detected;
        }
        let searched = if exact {
            // Keep only the trailing "word." component.
            &description[description.len() - token.text.len() - 1..]
        } else {
            description.as_str()
        };
        find_lemmas_in_document(document, searched, &mut allowed_ranges, &mut armed_ranges);
        std::mem::swap(&mut allowed_ranges, &mut armed_ranges);
        tokens_count += 1;
    }

    if tokens_count == 0 {
        return;
    }
    let text = document.text();
    for &successor in &allowed_ranges {
        let Some(first_range) = successor.checked_sub(tokens_count) else {
            continue;
        };
        let mut line = Vec::new();
        for k in 0..tokens_count {
            let range = document.range(first_range + k);
            line.extend_from_slice(
                &text[range.original_start as usize + 1..range.end_position as usize],
            );
            if k + 1 < tokens_count {
                line.push(b' ');
            }
        }
        results.insert(String::from_utf8_lossy(&line).into_owned());
    }
}

/// Split the service prefixes off one query line: optional `lang|`
/// override (unknown languages fall back to auto-detection) and the `!`
/// exact flag.
fn parse_phrase<'a>(line: &'a str, multi: &MultiMorphology) -> (&'a str, Option<usize>, bool) {
    let (language, rest) = match line.find(LANGUAGE_SPLITTER) {
        Some(at) => (multi.dictionary_by_prefix(&line[..at]), &line[at + 1..]),
        None => (None, line),
    };
    match rest.strip_prefix(EXACT_FLAG) {
        Some(rest) => (rest, language, true),
        None => (rest, language, false),
    }
}

/// Run one phrase per input line and merge every match into a single
/// sorted, deduplicated, newline-joined string (with a trailing newline;
/// empty when nothing matched).
pub fn find_multi_intersection(
    document: &Document,
    multi: &MultiMorphology,
    phrase_lines: &str,
) -> String {
    let mut results = StringSet::new();
    for line in phrase_lines.split('\n') {
        let line = crate::text::strip_line(line);
        let (phrase, language, exact) = parse_phrase(line, multi);
        if phrase.is_empty() {
            continue;
        }
        find_intersection(document, multi, language, phrase, exact, &mut results);
    }
    results.join("\n", true)
}
