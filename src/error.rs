//! Error types for dictionary loading and index construction.
//!
//! The search path itself never fails: a phrase that cannot be resolved
//! simply produces no matches. Errors only arise while loading rule bases
//! and automaton files from disk, or when a dictionary root turns out to
//! contain no usable dictionaries at all.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading dictionaries and building indexes.
#[derive(Debug, Error)]
pub enum MorphError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A `morphs.mrd` or `gramtab.tab` file violated the line format:
    /// a section ran out mid-parse, a field was missing, or a model
    /// reference pointed past the loaded tables.
    #[error("malformed dictionary file {path}: {reason}")]
    MalformedDictionary { path: PathBuf, reason: String },

    /// An `automat.save` file was truncated or structurally invalid.
    /// Partial state is discarded; the dictionary is reported as not loaded.
    #[error("malformed automaton file: {0}")]
    MalformedAutomaton(String),

    /// A persisted document blob failed its header sanity checks.
    #[error("malformed document blob: {0}")]
    MalformedDocument(String),

    /// The dictionary root existed but no subdirectory could be loaded.
    #[error("no loadable dictionaries under {0}")]
    NoDictionaries(PathBuf),
}

pub type Result<T> = std::result::Result<T, MorphError>;
