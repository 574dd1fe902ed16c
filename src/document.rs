//! The searchable document: rewritten text, suffix array and word ranges
//! packed into one contiguous, pointer-free blob.
//!
//! Every word of the source text is lemmatized and replaced by its
//! description — all lemmas plus the original form, each closed by the
//! `.` terminator ("стать.сталь.стали."). Searching that rewritten text
//! through its suffix array finds a phrase no matter which inflected
//! form the document used. A parallel array of [`WordRange`] records
//! remembers which slice of the rewritten text belongs to which source
//! word, so matches can be mapped back to original forms and word order
//! can be enforced across ranges.
//!
//! # Blob layout
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ DocumentHeader (56 bytes)                     │
//! │   flags: u16, pad: [u8; 6], created: i64      │
//! │   size: u64, text_length: u64                 │
//! │   text_offset: u64, ranges_offset: u64        │
//! │   ranges_count: u64                           │
//! ├───────────────────────────────────────────────┤
//! │ suffix array: i32 × text_length               │
//! ├───────────────────────────────────────────────┤
//! │ rewritten text: u8 × (text_length + 1), NUL   │
//! ├───────────────────────────────────────────────┤
//! │ word ranges: 4 × i32 × ranges_count           │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Little-endian, no interior pointers: the blob can be written to disk,
//! shipped and reloaded bit-exactly ([`Document::from_bytes`]).

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::MorphError;
use crate::multilang::MultiMorphology;
use crate::suffix::{build_suffix_array, compare_at};
use crate::text::DESCRIPTION_TERMINATOR;
use crate::tokenizer::Tokenizer;

const HEADER_SIZE: usize = 56;
const RANGE_SIZE: usize = 16;

/// The span of one source word inside the rewritten text.
///
/// `start_position` points at the terminator opening the word's region
/// (byte 0 for the first word, which owns the prepended terminator);
/// `end_position` at the region's closing terminator, which doubles as
/// the next word's start; `original_start` at the terminator preceding
/// the original surface form, so `text[original_start + 1 ..
/// end_position]` is the form as it appeared in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRange {
    pub word_index: i32,
    pub start_position: i32,
    pub end_position: i32,
    pub original_start: i32,
}

/// A built (or reloaded) document blob.
pub struct Document {
    data: Vec<u8>,
}

impl Document {
    /// Index `text`. The text is expected pre-normalized (lowercased);
    /// [`crate::engine::Morph`] handles that.
    pub fn from_text(multi: &MultiMorphology, text: &str, flags: u16) -> Self {
        let (rewritten, ranges) = build_text_with_ranges(multi, text);
        let suffix_array = build_suffix_array(rewritten.as_bytes());

        let text_length = rewritten.len();
        let text_offset = HEADER_SIZE + 4 * text_length;
        let ranges_offset = text_offset + text_length + 1;
        let size = ranges_offset + RANGE_SIZE * ranges.len();

        let mut data = Vec::with_capacity(size);
        data.extend_from_slice(&flags.to_le_bytes());
        data.extend_from_slice(&[0u8; 6]);
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64);
        data.extend_from_slice(&created.to_le_bytes());
        data.extend_from_slice(&(size as u64).to_le_bytes());
        data.extend_from_slice(&(text_length as u64).to_le_bytes());
        data.extend_from_slice(&(text_offset as u64).to_le_bytes());
        data.extend_from_slice(&(ranges_offset as u64).to_le_bytes());
        data.extend_from_slice(&(ranges.len() as u64).to_le_bytes());
        for position in &suffix_array {
            data.extend_from_slice(&position.to_le_bytes());
        }
        data.extend_from_slice(rewritten.as_bytes());
        data.push(0);
        for range in &ranges {
            data.extend_from_slice(&range.word_index.to_le_bytes());
            data.extend_from_slice(&range.start_position.to_le_bytes());
            data.extend_from_slice(&range.end_position.to_le_bytes());
            data.extend_from_slice(&range.original_start.to_le_bytes());
        }
        debug_assert_eq!(data.len(), size);
        Self { data }
    }

    /// Reload a previously packed blob, validating the header against the
    /// byte count before any accessor trusts it.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, MorphError> {
        if data.len() < HEADER_SIZE {
            return Err(MorphError::MalformedDocument(format!(
                "{} bytes is shorter than the header",
                data.len()
            )));
        }
        let document = Self { data };
        let text_length = document.text_length();
        let ranges_count = document.ranges_count();
        if text_length > document.data.len() || ranges_count > document.data.len() {
            return Err(MorphError::MalformedDocument(
                "declared lengths exceed the blob".to_string(),
            ));
        }
        let expected_text_offset = HEADER_SIZE + 4 * text_length;
        let expected_ranges_offset = expected_text_offset + text_length + 1;
        let expected_size = expected_ranges_offset + RANGE_SIZE * document.ranges_count();
        if document.size() != document.data.len()
            || document.size() != expected_size
            || document.text_offset() != expected_text_offset
            || document.ranges_offset() != expected_ranges_offset
        {
            return Err(MorphError::MalformedDocument(
                "header offsets disagree with blob size".to_string(),
            ));
        }
        Ok(document)
    }

    /// The raw blob, suitable for persisting.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn u64_at(&self, offset: usize) -> usize {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.data[offset..offset + 8]);
        u64::from_le_bytes(buf) as usize
    }

    pub fn flags(&self) -> u16 {
        u16::from_le_bytes([self.data[0], self.data[1]])
    }

    /// Creation timestamp, seconds since the Unix epoch.
    pub fn created(&self) -> i64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.data[8..16]);
        i64::from_le_bytes(buf)
    }

    pub fn size(&self) -> usize {
        self.u64_at(16)
    }

    pub fn text_length(&self) -> usize {
        self.u64_at(24)
    }

    fn text_offset(&self) -> usize {
        self.u64_at(32)
    }

    fn ranges_offset(&self) -> usize {
        self.u64_at(40)
    }

    pub fn ranges_count(&self) -> usize {
        self.u64_at(48)
    }

    /// The rewritten text, without the trailing NUL.
    pub fn text(&self) -> &[u8] {
        let offset = self.text_offset();
        &self.data[offset..offset + self.text_length()]
    }

    /// Suffix array entry `index`: a start position in the rewritten text.
    pub fn suffix_at(&self, index: usize) -> usize {
        let offset = HEADER_SIZE + 4 * index;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.data[offset..offset + 4]);
        i32::from_le_bytes(buf) as usize
    }

    pub fn range(&self, index: usize) -> WordRange {
        let offset = self.ranges_offset() + RANGE_SIZE * index;
        let field = |at: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&self.data[at..at + 4]);
            i32::from_le_bytes(buf)
        };
        WordRange {
            word_index: field(offset),
            start_position: field(offset + 4),
            end_position: field(offset + 8),
            original_start: field(offset + 12),
        }
    }

    /// Binary search for the range containing `position`
    /// (`start_position ≤ position < end_position`).
    pub fn find_word_range(&self, position: i32) -> Option<usize> {
        let mut left = 0usize;
        let mut right = self.ranges_count().checked_sub(1)?;
        while left <= right {
            let mid = left + (right - left) / 2;
            let range = self.range(mid);
            if position < range.start_position {
                right = mid.checked_sub(1)?;
            } else if position >= range.end_position {
                left = mid + 1;
            } else {
                return Some(mid);
            }
        }
        None
    }

    /// All suffix-array entries whose suffixes start with `sample`, as an
    /// inclusive index range into the suffix array.
    pub fn find_suffix_range(&self, sample: &[u8]) -> Option<(usize, usize)> {
        let text = self.text();
        let count = self.text_length();
        if count == 0 || sample.is_empty() {
            return None;
        }
        let mut left = 0usize;
        let mut right = count - 1;
        loop {
            let mid = left + (right - left) / 2;
            match compare_at(text, self.suffix_at(mid), sample) {
                Ordering::Equal => {
                    let mut lo = mid;
                    let mut hi = mid;
                    while lo > 0 && compare_at(text, self.suffix_at(lo - 1), sample) == Ordering::Equal
                    {
                        lo -= 1;
                    }
                    while hi + 1 < count
                        && compare_at(text, self.suffix_at(hi + 1), sample) == Ordering::Equal
                    {
                        hi += 1;
                    }
                    return Some((lo, hi));
                }
                Ordering::Less => {
                    if mid == 0 {
                        return None;
                    }
                    right = mid - 1;
                }
                Ordering::Greater => left = mid + 1,
            }
            if left > right {
                return None;
            }
        }
    }
}

/// Rewrite `text` into its lemma-augmented form, recording one
/// [`WordRange`] per token. The first description gets a terminator
/// prepended so every word's region both begins and ends at one — the
/// invariant phrase-boundary matching relies on.
fn build_text_with_ranges(multi: &MultiMorphology, text: &str) -> (String, Vec<WordRange>) {
    let mut rewritten = String::new();
    let mut ranges: Vec<WordRange> = Vec::new();
    let mut suggested: Option<usize> = None;
    let mut cursor: i32 = 0;

    for (word_index, token) in Tokenizer::new(text).enumerate() {
        let (description, detected) =
            multi.word_description(suggested, Some(&token.wide), token.text);
        if detected.is_some() && detected != suggested {
            suggested = detected;
        }
        let mut description_len = description.len() as i32;
        let start_position;
        if word_index == 0 {
            rewritten.push(DESCRIPTION_TERMINATOR as char);
            description_len += 1;
            start_position = cursor;
        } else {
            start_position = cursor - 1;
        }
        rewritten.push_str(&description);
        let end_position = cursor + description_len - 1;
        ranges.push(WordRange {
            word_index: word_index as i32,
            start_position,
            end_position,
            original_start: end_position - token.text.len() as i32 - 1,
        });
        cursor += description_len;
    }
    (rewritten, ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multilang::tests::toy_multi;

    fn build(text: &str) -> Document {
        Document::from_text(&toy_multi(), text, 0)
    }

    #[test]
    fn rewritten_text_interleaves_lemmas_and_originals() {
        let document = build("сталь стали cats");
        let text = String::from_utf8(document.text().to_vec()).unwrap();
        assert_eq!(text, ".сталь.сталь.стали.cat.cats.");
    }

    #[test]
    fn ranges_frame_every_word_with_terminators() {
        let document = build("сталь стали cats");
        let text = document.text();
        assert_eq!(document.ranges_count(), 3);
        for index in 0..document.ranges_count() {
            let range = document.range(index);
            assert_eq!(range.word_index as usize, index);
            // Regions start and end on a terminator.
            assert_eq!(text[range.start_position as usize], DESCRIPTION_TERMINATOR);
            assert_eq!(text[range.end_position as usize], DESCRIPTION_TERMINATOR);
            assert_eq!(text[range.original_start as usize], DESCRIPTION_TERMINATOR);
        }
        // Adjacent regions share their boundary terminator.
        let first = document.range(0);
        let second = document.range(1);
        assert_eq!(second.start_position, first.end_position);
    }

    #[test]
    fn original_forms_are_recoverable() {
        let document = build("сталь стали cats");
        let text = document.text();
        let originals: Vec<String> = (0..document.ranges_count())
            .map(|index| {
                let range = document.range(index);
                String::from_utf8(
                    text[range.original_start as usize + 1..range.end_position as usize].to_vec(),
                )
                .unwrap()
            })
            .collect();
        assert_eq!(originals, ["сталь", "стали", "cats"]);
    }

    #[test]
    fn find_word_range_by_position() {
        let document = build("сталь стали cats");
        let first = document.range(0);
        let last = document.range(2);
        assert_eq!(document.find_word_range(first.start_position), Some(0));
        assert_eq!(document.find_word_range(first.end_position), Some(1));
        assert_eq!(document.find_word_range(last.end_position - 1), Some(2));
        // The final terminator belongs to no range.
        assert_eq!(document.find_word_range(last.end_position), None);
        assert_eq!(document.find_word_range(-1), None);
    }

    #[test]
    fn suffix_search_respects_word_boundaries() {
        let document = build("сталь стали cats");
        // ".сталь." occurs twice: the first word and the lemma component
        // of the second.
        let (lo, hi) = document.find_suffix_range(".сталь.".as_bytes()).unwrap();
        assert_eq!(hi - lo + 1, 2);
        // "стали" as a bare sample also matches, bracketed it matches once.
        let (lo, hi) = document.find_suffix_range(".стали.".as_bytes()).unwrap();
        assert_eq!(hi - lo + 1, 1);
        assert!(document.find_suffix_range(".сталей.".as_bytes()).is_none());
    }

    #[test]
    fn blob_round_trips_bit_exactly() {
        let document = build("сталь стали cats");
        let bytes = document.as_bytes().to_vec();
        let reloaded = Document::from_bytes(bytes.clone()).unwrap();
        assert_eq!(reloaded.as_bytes(), bytes.as_slice());
        assert_eq!(reloaded.text_length(), document.text_length());
        assert_eq!(reloaded.ranges_count(), document.ranges_count());
        assert_eq!(reloaded.range(1), document.range(1));
        assert_eq!(reloaded.flags(), 0);
        assert!(reloaded.created() > 0);
    }

    #[test]
    fn corrupted_blob_is_rejected() {
        let document = build("сталь");
        let mut bytes = document.as_bytes().to_vec();
        bytes.truncate(bytes.len() - 1);
        assert!(Document::from_bytes(bytes).is_err());
        assert!(Document::from_bytes(vec![0u8; 10]).is_err());
    }

    #[test]
    fn empty_text_builds_an_empty_document() {
        let document = build("");
        assert_eq!(document.ranges_count(), 0);
        assert_eq!(document.text_length(), 0);
        assert!(document.find_suffix_range(b".x.").is_none());
        assert_eq!(document.find_word_range(0), None);
        let reloaded = Document::from_bytes(document.as_bytes().to_vec()).unwrap();
        assert_eq!(reloaded.text_length(), 0);
    }
}
