//! Compact, read-only form of the analysis automaton.
//!
//! The build form ([`crate::automaton::Automaton`]) spends memory on
//! minimization bookkeeping it never needs again; this loader re-reads an
//! `automat.save` file into flat arrays instead: one record per state and
//! one shared transition table, each state owning a label-sorted span of
//! it. Transition lookup is a binary search inside the span. The compact
//! form cannot be modified or saved — it exists only to answer
//! prefix-walk and output-enumeration queries during analysis.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::automaton::{
    read_state_block, read_u32, invalid_data, MorphAutomaton, Transition, ANNOTATION_DELIMITER,
    MAX_OUTPUT_LEN,
};

#[derive(Debug, Clone, Copy)]
struct StateRecord {
    is_final: bool,
    /// Span of this state's transitions in the shared table.
    first: u32,
    count: u32,
}

#[derive(Debug)]
pub struct CompactAutomaton {
    states: Vec<StateRecord>,
    transitions: Vec<Transition>,
}

impl CompactAutomaton {
    /// Load from an `automat.save` file.
    pub fn load_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::load(&mut BufReader::new(file))
    }

    /// Load from any reader, streaming one state block at a time.
    pub fn load<R: Read>(reader: &mut R) -> io::Result<Self> {
        let states_count = read_u32(reader)?;
        if states_count == 0 {
            return Err(invalid_data("automaton with no states".to_string()));
        }
        let mut states = Vec::with_capacity(states_count as usize);
        let mut transitions = Vec::new();
        for expected_id in 0..states_count {
            let mut block = read_state_block(reader)?;
            if block.id != expected_id {
                return Err(invalid_data(format!(
                    "state block {expected_id} carries id {}",
                    block.id
                )));
            }
            block.transitions.sort_unstable_by_key(|t| t.label);
            for transition in &block.transitions {
                if transition.target >= states_count {
                    return Err(invalid_data(format!(
                        "state {expected_id}: transition target {} out of range",
                        transition.target
                    )));
                }
            }
            states.push(StateRecord {
                is_final: block.is_final,
                first: transitions.len() as u32,
                count: block.transitions.len() as u32,
            });
            transitions.extend_from_slice(&block.transitions);
        }
        Ok(Self {
            states,
            transitions,
        })
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    fn span(&self, state: u32) -> &[Transition] {
        let record = self.states[state as usize];
        &self.transitions[record.first as usize..(record.first + record.count) as usize]
    }

    /// Binary search for the transition labeled `label`.
    fn find_transition(&self, state: u32, label: char) -> Option<u32> {
        let span = self.span(state);
        span.binary_search_by_key(&label, |t| t.label)
            .ok()
            .map(|at| span[at].target)
    }

    fn walk_prefix(&self, word: &[char]) -> (usize, u32) {
        let mut state = 0u32;
        let mut matched = 0;
        for &label in word {
            match self.find_transition(state, label) {
                Some(target) => {
                    state = target;
                    matched += 1;
                }
                None => break,
            }
        }
        (matched, state)
    }

    /// How many leading characters of `word` (already reversed by the
    /// caller) the automaton recognizes. Equal to `word.len()` when the
    /// whole word is known. Drives per-word language detection.
    pub fn known_prefix_length(&self, word: &[char]) -> usize {
        self.walk_prefix(word).0
    }

    /// Transition labels of every state are strictly sorted; used by
    /// integrity tests.
    #[cfg(test)]
    fn spans_sorted(&self) -> bool {
        (0..self.states.len() as u32)
            .all(|id| self.span(id).windows(2).all(|w| w[0].label < w[1].label))
    }

    fn collect_outputs(
        &self,
        state: u32,
        is_prediction: bool,
        prefix_len: usize,
        buffer: &mut Vec<char>,
        sink: &mut dyn FnMut(bool, usize, &[char]),
    ) {
        if self.states[state as usize].is_final {
            sink(is_prediction, prefix_len, buffer);
            if !is_prediction {
                return;
            }
        }
        if buffer.len() + 1 >= MAX_OUTPUT_LEN {
            return;
        }
        if buffer.is_empty() && !is_prediction {
            if let Some(target) = self.find_transition(state, ANNOTATION_DELIMITER) {
                buffer.push(ANNOTATION_DELIMITER);
                self.collect_outputs(target, is_prediction, prefix_len, buffer, sink);
                buffer.pop();
            }
        } else {
            let record = self.states[state as usize];
            for at in record.first..record.first + record.count {
                let transition = self.transitions[at as usize];
                buffer.push(transition.label);
                self.collect_outputs(transition.target, is_prediction, prefix_len, buffer, sink);
                buffer.pop();
            }
        }
    }
}

impl MorphAutomaton for CompactAutomaton {
    fn prefix_length(&self, word: &[char]) -> usize {
        self.walk_prefix(word).0
    }

    fn enumerate_outputs(
        &self,
        word: &[char],
        min_prediction_prefix: usize,
        sink: &mut dyn FnMut(bool, usize, &[char]),
    ) {
        let (matched, last_state) = self.walk_prefix(word);
        let mut buffer = Vec::new();
        if matched == word.len()
            && self.find_transition(last_state, ANNOTATION_DELIMITER).is_some()
        {
            self.collect_outputs(last_state, false, matched, &mut buffer, sink);
        } else if matched >= min_prediction_prefix {
            self.collect_outputs(last_state, true, matched, &mut buffer, sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::Automaton;
    use proptest::prelude::*;

    fn wide(word: &str) -> Vec<char> {
        word.chars().collect()
    }

    fn compact_from(words: &[&str]) -> (Automaton, CompactAutomaton) {
        let mut sorted: Vec<&str> = words.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut full = Automaton::new();
        for word in &sorted {
            full.add_word(&wide(word));
        }
        full.finish();
        let mut bytes = Vec::new();
        full.save(&mut bytes).unwrap();
        let compact = CompactAutomaton::load(&mut bytes.as_slice()).unwrap();
        (full, compact)
    }

    #[test]
    fn transitions_sorted_for_binary_search() {
        let (_, compact) = compact_from(&["zeta", "alpha", "mu", "zz", "ab"]);
        assert!(compact.spans_sorted());
    }

    #[test]
    fn accepts_same_language_as_build_form() {
        let words = ["стол|A1", "столы|A2", "стул|B1", "сталь|C0"];
        let (full, compact) = compact_from(&words);
        assert_eq!(full.state_count(), compact.state_count());
        for probe in ["стол", "столы", "стул", "сталь", "ст", "шкаф"] {
            let probe = wide(probe);
            assert_eq!(
                full.prefix_length(&probe),
                compact.prefix_length(&probe),
                "prefix walk diverged"
            );
        }
    }

    #[test]
    fn output_enumeration_matches_build_form() {
        let words = ["ьлотс|10", "ылотс|11", "тс|FF"];
        let (full, compact) = compact_from(&words);
        for probe in ["ьлотс", "тс", "лотс", "ылотс"] {
            let probe = wide(probe);
            let mut from_full = Vec::new();
            full.enumerate_outputs(&probe, 4, &mut |p, m, labels| {
                from_full.push((p, m, labels.iter().collect::<String>()));
            });
            let mut from_compact = Vec::new();
            compact.enumerate_outputs(&probe, 4, &mut |p, m, labels| {
                from_compact.push((p, m, labels.iter().collect::<String>()));
            });
            from_full.sort();
            from_compact.sort();
            assert_eq!(from_full, from_compact);
        }
    }

    #[test]
    fn known_prefix_length_reports_partial_matches() {
        let (_, compact) = compact_from(&["налим|00"]);
        assert_eq!(compact.known_prefix_length(&wide("налим")), 5);
        assert_eq!(compact.known_prefix_length(&wide("нал")), 3);
        assert_eq!(compact.known_prefix_length(&wide("хвост")), 0);
    }

    #[test]
    fn garbage_file_is_rejected() {
        let bytes = [7u8, 0, 0, 0, 1, 2, 3];
        assert!(CompactAutomaton::load(&mut bytes.as_ref()).is_err());
    }

    proptest! {
        /// Loading the saved automaton accepts the same language.
        #[test]
        fn equivalent_to_build_form(words in proptest::collection::btree_set("[a-c]{1,6}", 1..20)) {
            let mut full = Automaton::new();
            for word in &words {
                full.add_word(&wide(word));
            }
            full.finish();
            let mut bytes = Vec::new();
            full.save(&mut bytes).unwrap();
            let compact = CompactAutomaton::load(&mut bytes.as_slice()).unwrap();
            prop_assert!(compact.spans_sorted());
            for probe in words.iter().map(String::as_str).chain(["", "a", "cb", "abcabc"]) {
                let probe = wide(probe);
                prop_assert_eq!(full.prefix_length(&probe), compact.prefix_length(&probe));
            }
        }
    }
}
