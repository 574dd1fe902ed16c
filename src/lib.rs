//! Inflection-aware phrase search.
//!
//! Given a document and a query phrase, this crate finds every occurrence
//! of the phrase where each query word may appear in any inflected form
//! of its lemma, and reports either the matched renditions or a
//! percentage-style similarity score. Morphology comes from precompiled
//! dictionaries (`morphs.mrd` + `gramtab.tab`) compiled into a minimal
//! acyclic DFA; documents are indexed with a suffix array over a
//! lemma-augmented rewrite of their text.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────┐    ┌──────────────┐
//! │ automaton.rs │───▶│  compact.rs   │───▶│ analyzer.rs  │
//! │ (build MADFA,│    │ (read-only    │    │ (lemmatize,  │
//! │  save/load)  │    │  automaton)   │    │  predict)    │
//! └──────────────┘    └───────────────┘    └──────┬───────┘
//!        ▲                                        │
//! ┌──────┴───────┐    ┌───────────────┐    ┌──────▼───────┐
//! │ rulebase.rs  │    │ multilang.rs  │◀───│morphology.rs │
//! │ (morphs.mrd, │───▶│ (discovery,   │    │ (per-language│
//! │ gramtab.tab) │    │  detection)   │    │ kit + cache) │
//! └──────────────┘    └──────┬────────┘    └──────────────┘
//!                            │
//! ┌──────────────┐    ┌──────▼────────┐    ┌──────────────┐
//! │  suffix.rs   │───▶│ document.rs   │───▶│ intersect.rs │
//! │ (DC3, search)│    │ (text rewrite,│    │ (phrase      │
//! └──────────────┘    │  blob)        │    │  chaining)   │
//!                     └───────────────┘    └──────┬───────┘
//!                                                 │
//!                                          ┌──────▼───────┐
//!                                          │  engine.rs   │
//!                                          │ (Morph, docs,│
//!                                          │  scores)     │
//!                                          └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use morphex::Morph;
//!
//! let morph = Morph::new(Path::new("/usr/share/morphex/dicts"))?;
//! let doc = morph.document("продам квартиру в центре");
//!
//! // Inflection-independent phrase lookup:
//! let matches = morph.find_matches(&doc, "продажа квартиры");
//!
//! // Percentage-style similarity:
//! let score = morph.str_intersect_str("россии президенту путину ", "россии президент путин ");
//! assert!(score >= 0.0);
//! # Ok::<(), morphex::MorphError>(())
//! ```
//!
//! Dictionaries live one directory per language under a common root
//! (`01ru`, `02en`, …); the compiled automaton (`automat.save`) is
//! regenerated on first load when missing.

pub mod analyzer;
pub mod automaton;
pub mod cache;
pub mod compact;
pub mod document;
mod engine;
mod error;
pub mod intersect;
pub mod morphology;
pub mod multilang;
pub mod rulebase;
pub mod stringset;
pub mod suffix;
pub mod text;
pub mod tokenizer;

// Re-exports for the public API surface
pub use analyzer::{analyze_word, WordForm};
pub use automaton::{Automaton, MorphAutomaton};
pub use compact::CompactAutomaton;
pub use document::{Document, WordRange};
pub use engine::{Morph, MorphDoc, DESCRIPTION_CACHE_SIZE};
pub use error::{MorphError, Result};
pub use morphology::{build_automaton_file, Morphology};
pub use multilang::{Dictionary, MultiMorphology};
pub use suffix::{build_suffix_array, find_with_suffix_array};
pub use tokenizer::{tokenize, Token, Tokenizer};
