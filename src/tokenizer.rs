//! Word tokenizer over UTF-8 text.
//!
//! A token is a run of alphanumeric characters of any script. The
//! separators `-`, `'`, `` ` `` and `_` are allowed *inside* a token when
//! flanked by alphanumerics on both sides, so "don't", "как-нибудь" and
//! "foo_bar" come out whole, while a trailing or doubled separator ends
//! the token before it:
//!
//! ```text
//! "a--b"   → ["a", "b"]
//! "ab-cd"  → ["ab-cd"]
//! "abc- x" → ["abc", "x"]
//! ```
//!
//! Every token carries its byte span in the source text and a "wide"
//! `Vec<char>` form for the analyzer, which works in scalar positions.

use std::str::CharIndices;

use crate::text::EXTRA_WORD_CHARS;

/// One word token: borrowed text, byte span (`end` exclusive), wide form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    pub wide: Vec<char>,
}

pub struct Tokenizer<'a> {
    source: &'a str,
    chars: CharIndices<'a>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
        }
    }
}

fn is_extra(c: char) -> bool {
    EXTRA_WORD_CHARS.contains(&c)
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        // Skip to the first alphanumeric character.
        let (start, first) = loop {
            let (at, c) = self.chars.next()?;
            if c.is_alphanumeric() {
                break (at, c);
            }
        };

        let mut wide = vec![first];
        let mut end = start + first.len_utf8();
        loop {
            // Peek without consuming: a separator only stays in the token
            // when an alphanumeric follows it.
            let mut ahead = self.chars.clone();
            match ahead.next() {
                Some((at, c)) if c.is_alphanumeric() => {
                    self.chars = ahead;
                    wide.push(c);
                    end = at + c.len_utf8();
                }
                Some((_, c)) if is_extra(c) => {
                    match ahead.clone().next() {
                        Some((at2, c2)) if c2.is_alphanumeric() => {
                            ahead.next();
                            self.chars = ahead;
                            wide.push(c);
                            wide.push(c2);
                            end = at2 + c2.len_utf8();
                        }
                        // Separator not followed by a letter: the token
                        // ends here and scanning resumes at the separator.
                        _ => break,
                    }
                }
                _ => break,
            }
        }

        Some(Token {
            text: &self.source[start..end],
            start,
            end,
            wide,
        })
    }
}

/// Convenience wrapper collecting all tokens of `text`.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    Tokenizer::new(text).collect()
}
