//! Incremental construction of a minimal acyclic DFA over wide-character
//! labels.
//!
//! Words are inserted in strictly increasing lexicographic order and the
//! automaton is minimized on line: after each insertion the subtree that
//! can no longer grow is folded into the registry of equivalence classes,
//! so the full trie never materializes. The accepted language after
//! [`Automaton::finish`] is exactly the inserted word set.
//!
//! States live in an arena indexed by `u32` id; the registry maps a
//! state's *signature* — its final flag plus the label-sorted list of
//! `(label, target)` pairs — to the registered state carrying it. Two
//! states are equivalent iff their signatures are byte-equal.
//!
//! # On-disk format (`automat.save`)
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ states_count: u32                              │
//! ├────────────────────────────────────────────────┤
//! │ per state (block i holds the state with id i): │
//! │   block_size: u64  (= 9 + 8 * transitions)     │
//! │   id: u32                                      │
//! │   final: u8                                    │
//! │   transitions_count: u32                       │
//! │   transitions: (label: u32, target: u32) × n   │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! All integers little-endian; state 0 is the initial state. A short read
//! anywhere aborts loading.
//!
//! # References
//!
//! - Daciuk, Mihov, Watson, Watson (2000): "Incremental Construction of
//!   Minimal Acyclic Finite-State Automata", Computational Linguistics 26(1)

use std::io::{self, Read, Write};

use ahash::AHashMap;

/// Label separating the reversed stem from the encoded morphology
/// annotation in analyzer automata.
pub const ANNOTATION_DELIMITER: char = '|';

/// Hard cap on one enumerated output (labels), matching the on-disk
/// dictionaries this format was designed for.
pub const MAX_OUTPUT_LEN: usize = 255;

/// A single labeled edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub label: char,
    pub target: u32,
}

/// The capability both automaton forms share: walking a prefix and
/// enumerating accepted continuations, with prediction fallback.
///
/// The sink receives `(is_prediction, matched_prefix_len, labels)` for
/// every accepted output.
pub trait MorphAutomaton {
    /// Length of the longest prefix of `word` readable from the initial
    /// state.
    fn prefix_length(&self, word: &[char]) -> usize;

    /// Enumerate outputs for `word`. When the whole word is matched and an
    /// annotation edge follows, only the annotation subtree is emitted
    /// (non-prediction). Otherwise, when at least `min_prediction_prefix`
    /// characters matched, everything reachable from the stop state is
    /// emitted as prediction. Shorter matches emit nothing.
    fn enumerate_outputs(
        &self,
        word: &[char],
        min_prediction_prefix: usize,
        sink: &mut dyn FnMut(bool, usize, &[char]),
    );
}

#[derive(Debug, Default)]
struct StateNode {
    transitions: Vec<Transition>,
    is_final: bool,
    registered: bool,
    alive: bool,
}

/// Build-form automaton. See the module docs for the construction
/// contract; violating the insertion order yields a non-minimal automaton
/// with an undefined accepted language.
#[derive(Debug)]
pub struct Automaton {
    states: Vec<StateNode>,
    free: Vec<u32>,
    registry: Option<AHashMap<Box<[u8]>, u32>>,
    last_word: Vec<char>,
    finished: bool,
}

impl Default for Automaton {
    fn default() -> Self {
        Self::new()
    }
}

impl Automaton {
    pub fn new() -> Self {
        let initial = StateNode {
            alive: true,
            ..StateNode::default()
        };
        Self {
            states: vec![initial],
            free: Vec::new(),
            registry: Some(AHashMap::new()),
            last_word: Vec::new(),
            finished: false,
        }
    }

    fn node(&self, id: u32) -> &StateNode {
        &self.states[id as usize]
    }

    fn node_mut(&mut self, id: u32) -> &mut StateNode {
        &mut self.states[id as usize]
    }

    fn alloc_state(&mut self) -> u32 {
        if let Some(id) = self.free.pop() {
            self.states[id as usize].alive = true;
            id
        } else {
            self.states.push(StateNode {
                alive: true,
                ..StateNode::default()
            });
            (self.states.len() - 1) as u32
        }
    }

    fn find_transition(&self, state: u32, label: char) -> Option<u32> {
        self.node(state)
            .transitions
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.target)
    }

    /// Walk the longest existing path matching a prefix of `word`.
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

    /// Byte signature identifying a state's equivalence class.
    fn signature(&self, state: u32) -> Vec<u8> {
        let node = self.node(state);
        let mut descriptors: Vec<(u32, u32)> = node
            .transitions
            .iter()
            .map(|t| (t.label as u32, t.target))
            .collect();
        descriptors.sort_unstable_by_key(|&(label, _)| label);
        let mut key = Vec::with_capacity(1 + descriptors.len() * 8);
        key.push(u8::from(node.is_final));
        for (label, target) in descriptors {
            key.extend_from_slice(&label.to_le_bytes());
            key.extend_from_slice(&target.to_le_bytes());
        }
        key
    }

    fn registry_mut(&mut self) -> &mut AHashMap<Box<[u8]>, u32> {
        self.registry
            .as_mut()
            .expect("registry dropped after finish")
    }

    /// Move a registered state whose signature just changed to its new
    /// class, keeping it registered.
    fn re_register(&mut self, state: u32, old_signature: &[u8]) {
        let registry = self.registry_mut();
        if registry.get(old_signature) == Some(&state) {
            registry.remove(old_signature);
        }
        let new_signature = self.signature(state).into_boxed_slice();
        self.registry_mut().entry(new_signature).or_insert(state);
    }

    fn last_child(&self, state: u32) -> u32 {
        self.node(state)
            .transitions
            .last()
            .expect("replace_or_register on a childless state")
            .target
    }

    fn set_last_child(&mut self, state: u32, child: u32) {
        self.node_mut(state)
            .transitions
            .last_mut()
            .expect("replace_or_register on a childless state")
            .target = child;
    }

    /// Free the subtree below `state`, stopping at registered (shared)
    /// states. Slots return to the free list for reuse.
    fn delete_branch(&mut self, state: u32) {
        if self.node(state).registered {
            return;
        }
        let targets: Vec<u32> = self.node(state).transitions.iter().map(|t| t.target).collect();
        for target in targets {
            self.delete_branch(target);
        }
        let node = self.node_mut(state);
        node.alive = false;
        node.is_final = false;
        node.transitions.clear();
        self.free.push(state);
    }

    /// The minimization core: fold the most recently extended subtree of
    /// `state` into the registry, replacing it with an equivalent
    /// registered state when one exists.
    fn replace_or_register(&mut self, state: u32) {
        let child = self.last_child(state);
        if self.node(child).registered {
            return;
        }
        if !self.node(child).transitions.is_empty() {
            self.replace_or_register(child);
        }
        let child_signature = self.signature(child);
        if let Some(&equivalent) = self.registry_mut().get(child_signature.as_slice()) {
            let old_signature = self
                .node(state)
                .registered
                .then(|| self.signature(state));
            self.delete_branch(child);
            self.set_last_child(state, equivalent);
            if let Some(old) = old_signature {
                self.re_register(state, &old);
            }
        } else {
            self.registry_mut()
                .insert(child_signature.into_boxed_slice(), child);
            self.node_mut(child).registered = true;
        }
    }

    /// Append a fresh chain of states for `suffix` below `state`, marking
    /// the end final.
    fn add_suffix(&mut self, state: u32, suffix: &[char]) {
        let forked = state;
        let forked_signature = self
            .node(forked)
            .registered
            .then(|| self.signature(forked));
        let mut state = state;
        for &label in suffix {
            let next = self.alloc_state();
            self.node_mut(state).transitions.push(Transition {
                label,
                target: next,
            });
            state = next;
        }
        self.node_mut(state).is_final = true;
        if let Some(old) = forked_signature {
            self.re_register(forked, &old);
        }
    }

    /// Insert one word. Words must arrive in strictly increasing
    /// lexicographic order (by Unicode scalar value) and only before
    /// [`Automaton::finish`].
    pub fn add_word(&mut self, word: &[char]) {
        debug_assert!(!self.finished, "add_word after finish");
        debug_assert!(
            self.last_word.as_slice() < word,
            "words must be added in strictly increasing order"
        );
        let (prefix_len, last_state) = self.walk_prefix(word);
        if !self.node(last_state).transitions.is_empty() {
            self.replace_or_register(last_state);
        }
        self.add_suffix(last_state, &word[prefix_len..]);
        self.last_word.clear();
        self.last_word.extend_from_slice(word);
    }

    /// Complete the construction: fold the remaining suffix chain and drop
    /// the registry. No insertions are valid afterwards.
    pub fn finish(&mut self) {
        if !self.finished {
            if !self.node(0).transitions.is_empty() {
                self.replace_or_register(0);
            }
            self.registry = None;
            self.finished = true;
        }
    }

    /// True when the automaton accepts `word` exactly.
    pub fn accepts(&self, word: &[char]) -> bool {
        let (matched, state) = self.walk_prefix(word);
        matched == word.len() && self.node(state).is_final
    }

    /// Number of live states.
    pub fn state_count(&self) -> usize {
        self.states.iter().filter(|s| s.alive).count()
    }

    /// Signatures of all live states; minimality means no duplicates.
    #[cfg(test)]
    fn live_signatures(&self) -> Vec<Vec<u8>> {
        (0..self.states.len() as u32)
            .filter(|&id| self.node(id).alive)
            .map(|id| self.signature(id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Write the automaton. States are renumbered to contiguous ids with
    /// the initial state at 0; block `i` carries id `i` so the loader can
    /// wire transitions by index. Returns the states count.
    pub fn save<W: Write>(&self, writer: &mut W) -> io::Result<u32> {
        let order: Vec<u32> = std::iter::once(0u32)
            .chain(
                (1..self.states.len() as u32).filter(|&id| self.node(id).alive),
            )
            .collect();
        let mut renumbered = vec![u32::MAX; self.states.len()];
        for (new_id, &old_id) in order.iter().enumerate() {
            renumbered[old_id as usize] = new_id as u32;
        }
        writer.write_all(&(order.len() as u32).to_le_bytes())?;
        for &old_id in &order {
            let node = self.node(old_id);
            let count = node.transitions.len() as u32;
            let block_size: u64 = 4 + 1 + 4 + 8 * u64::from(count);
            writer.write_all(&block_size.to_le_bytes())?;
            writer.write_all(&renumbered[old_id as usize].to_le_bytes())?;
            writer.write_all(&[u8::from(node.is_final)])?;
            writer.write_all(&count.to_le_bytes())?;
            for transition in &node.transitions {
                writer.write_all(&(transition.label as u32).to_le_bytes())?;
                writer.write_all(&renumbered[transition.target as usize].to_le_bytes())?;
            }
        }
        Ok(order.len() as u32)
    }

    /// Load a previously saved automaton in build form (used by tooling
    /// and round-trip tests; the runtime path loads the compact form).
    pub fn load<R: Read>(reader: &mut R) -> io::Result<Self> {
        let states_count = read_u32(reader)?;
        let mut states = Vec::with_capacity(states_count as usize);
        for expected_id in 0..states_count {
            let block = read_state_block(reader)?;
            if block.id != expected_id {
                return Err(invalid_data(format!(
                    "state block {expected_id} carries id {}",
                    block.id
                )));
            }
            for transition in &block.transitions {
                if transition.target >= states_count {
                    return Err(invalid_data(format!(
                        "transition target {} out of range", transition.target
                    )));
                }
            }
            states.push(StateNode {
                transitions: block.transitions,
                is_final: block.is_final,
                registered: false,
                alive: true,
            });
        }
        if states.is_empty() {
            return Err(invalid_data("automaton with no states".to_string()));
        }
        Ok(Self {
            states,
            free: Vec::new(),
            registry: None,
            last_word: Vec::new(),
            finished: true,
        })
    }

    fn collect_outputs(
        &self,
        state: u32,
        is_prediction: bool,
        prefix_len: usize,
        buffer: &mut Vec<char>,
        sink: &mut dyn FnMut(bool, usize, &[char]),
    ) {
        if self.node(state).is_final {
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
            for transition in &self.node(state).transitions {
                buffer.push(transition.label);
                self.collect_outputs(transition.target, is_prediction, prefix_len, buffer, sink);
                buffer.pop();
            }
        }
    }
}

impl MorphAutomaton for Automaton {
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

// ----------------------------------------------------------------------
// Shared wire helpers (also used by the compact loader)
// ----------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct RawStateBlock {
    pub id: u32,
    pub is_final: bool,
    pub transitions: Vec<Transition>,
}

pub(crate) fn invalid_data(reason: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason)
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read one serialized state block, validating the declared size against
/// the transition count.
pub(crate) fn read_state_block<R: Read>(reader: &mut R) -> io::Result<RawStateBlock> {
    let block_size = read_u64(reader)?;
    let id = read_u32(reader)?;
    let mut flag = [0u8; 1];
    reader.read_exact(&mut flag)?;
    let transitions_count = read_u32(reader)?;
    let expected = 4 + 1 + 4 + 8 * u64::from(transitions_count);
    if block_size != expected {
        return Err(invalid_data(format!(
            "state {id}: block size {block_size} does not match {transitions_count} transitions"
        )));
    }
    let mut transitions = Vec::with_capacity(transitions_count as usize);
    for _ in 0..transitions_count {
        let label = read_u32(reader)?;
        let target = read_u32(reader)?;
        let label = char::from_u32(label)
            .ok_or_else(|| invalid_data(format!("state {id}: label {label:#x} is not a scalar")))?;
        transitions.push(Transition { label, target });
    }
    Ok(RawStateBlock {
        id,
        is_final: flag[0] != 0,
        transitions,
    })
}
