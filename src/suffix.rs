//! DC3: linear-time suffix array construction by difference covers.
//!
//! # Algorithm Overview
//!
//! ```text
//! Input: ".стать.стали." (as positive integer symbols + 3 zero sentinels)
//!
//! Step 1: Take the suffixes starting at positions i mod 3 ∈ {1, 2}
//!         and radix-sort their leading character triples (two passes).
//!
//! Step 2: Name the triples by rank. If names collide, recurse on the
//!         sequence of names (a problem of 2/3 the size).
//!
//! Step 3: Sort the mod-0 suffixes by (first char, rank of the rest),
//!         one more radix pass.
//!
//! Step 4: Merge the two sorted groups; a pair/triple comparison against
//!         the precomputed ranks decides each step in O(1).
//! ```
//!
//! # Complexity
//!
//! - Time: O(n)
//! - Space: O(n)
//!
//! # References
//!
//! - Kärkkäinen, Sanders (2003): "Simple Linear Work Suffix Array
//!   Construction", <https://doi.org/10.1007/3-540-45061-0_73>
//!
//! The recursion mirrors the authors' reference implementation closely;
//! positions and names are kept as `usize` internally and the public
//! result is the `i32` array the document blob stores.

use std::cmp::Ordering;

/// Lexicographic order for (char, rank) pairs.
fn leq_pairs(a1: usize, a2: usize, b1: usize, b2: usize) -> bool {
    a1 < b1 || (a1 == b1 && a2 <= b2)
}

/// Lexicographic order for (char, char, rank) triples.
fn leq_triples(a1: usize, a2: usize, a3: usize, b1: usize, b2: usize, b3: usize) -> bool {
    a1 < b1 || (a1 == b1 && leq_pairs(a2, a3, b2, b3))
}

/// Stable counting sort of `source[..count]` by `keys[item]`.
/// `alphabet` bounds the key values (inclusive).
fn radix_pass(source: &[usize], target: &mut [usize], keys: &[usize], count: usize, alphabet: usize) {
    let mut counters = vec![0usize; alphabet + 1];
    for &item in &source[..count] {
        counters[keys[item]] += 1;
    }
    let mut sum = 0;
    for counter in counters.iter_mut() {
        let here = *counter;
        *counter = sum;
        sum += here;
    }
    for &item in &source[..count] {
        target[counters[keys[item]]] = item;
        counters[keys[item]] += 1;
    }
}

/// Core recursion. `s` must hold `n >= 2` positive symbols bounded by
/// `alphabet`, followed by three zero sentinels. Fills `sa[..n]` with the
/// suffix start positions in lexicographic order.
fn skew(s: &[usize], n: usize, alphabet: usize, sa: &mut [usize]) {
    let n0 = (n + 2) / 3;
    let n1 = (n + 1) / 3;
    let n2 = n / 3;
    let n02 = n0 + n2;

    let mut s12 = vec![0usize; n02 + 3];
    let mut sa12 = vec![0usize; n02 + 3];
    let mut s0 = vec![0usize; n0];
    let mut sa0 = vec![0usize; n0];

    // Positions of the mod-1 and mod-2 suffixes; "+ (n0 - n1)" appends a
    // dummy mod-1 suffix when n % 3 == 1.
    let mut j = 0;
    for i in 0..n + (n0 - n1) {
        if i % 3 != 0 {
            s12[j] = i;
            j += 1;
        }
    }

    // LSB radix sort of the character triples at those positions.
    radix_pass(&s12, &mut sa12, &s[2..], n02, alphabet);
    radix_pass(&sa12, &mut s12, &s[1..], n02, alphabet);
    radix_pass(&s12, &mut sa12, s, n02, alphabet);

    // Name the triples by rank.
    let mut name = 0;
    let mut last = [usize::MAX; 3];
    for i in 0..n02 {
        let pos = sa12[i];
        if s[pos] != last[0] || s[pos + 1] != last[1] || s[pos + 2] != last[2] {
            name += 1;
            last = [s[pos], s[pos + 1], s[pos + 2]];
        }
        if pos % 3 == 1 {
            s12[pos / 3] = name; // left half
        } else {
            s12[pos / 3 + n0] = name; // right half
        }
    }

    if name < n02 {
        // Names collide: recurse on the rank sequence.
        skew(&s12, n02, name, &mut sa12);
        for i in 0..n02 {
            s12[sa12[i]] = i + 1;
        }
    } else {
        // Names are unique: the rank sequence is its own suffix array.
        for i in 0..n02 {
            sa12[s12[i] - 1] = i;
        }
    }

    // Sort the mod-0 suffixes by (first char, rank of the following mod-1
    // suffix), exploiting the order of sa12.
    let mut j = 0;
    for i in 0..n02 {
        if sa12[i] < n0 {
            s0[j] = 3 * sa12[i];
            j += 1;
        }
    }
    radix_pass(&s0, &mut sa0, s, n0, alphabet);

    // Merge.
    let position_of = |sa12: &[usize], t: usize| {
        if sa12[t] < n0 {
            sa12[t] * 3 + 1
        } else {
            (sa12[t] - n0) * 3 + 2
        }
    };
    let mut p = 0;
    let mut t = n0 - n1;
    let mut k = 0;
    while k < n {
        let i = position_of(&sa12, t);
        let j = sa0[p];
        let from_12 = if sa12[t] < n0 {
            leq_pairs(s[i], s12[sa12[t] + n0], s[j], s12[j / 3])
        } else {
            leq_triples(
                s[i],
                s[i + 1],
                s12[sa12[t] - n0 + 1],
                s[j],
                s[j + 1],
                s12[j / 3 + n0],
            )
        };
        if from_12 {
            sa[k] = i;
            t += 1;
            k += 1;
            if t == n02 {
                while p < n0 {
                    sa[k] = sa0[p];
                    p += 1;
                    k += 1;
                }
                break;
            }
        } else {
            sa[k] = j;
            p += 1;
            k += 1;
            if p == n0 {
                while t < n02 {
                    sa[k] = position_of(&sa12, t);
                    t += 1;
                    k += 1;
                }
                break;
            }
        }
    }
}

/// Build the suffix array of `text`.
///
/// Every byte becomes one positive symbol; the result lists suffix start
/// positions in lexicographic order and has exactly `text.len()` entries.
pub fn build_suffix_array(text: &[u8]) -> Vec<i32> {
    let n = text.len();
    if n < 2 {
        return if n == 1 { vec![0] } else { Vec::new() };
    }
    let mut symbols: Vec<usize> = Vec::with_capacity(n + 3);
    symbols.extend(text.iter().map(|&b| b as usize));
    symbols.extend([0, 0, 0]);
    let mut sa = vec![0usize; n];
    skew(&symbols, n, u8::MAX as usize + 1, &mut sa);
    sa.into_iter().map(|p| p as i32).collect()
}

/// Compare `sample` against the suffix of `text` starting at `pos`,
/// over at most `sample.len()` bytes. Past-the-end text bytes compare as
/// zero, matching `strncmp` against the blob's NUL-terminated text.
pub(crate) fn compare_at(text: &[u8], pos: usize, sample: &[u8]) -> Ordering {
    for (i, &sample_byte) in sample.iter().enumerate() {
        let text_byte = text.get(pos + i).copied().unwrap_or(0);
        match sample_byte.cmp(&text_byte) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// Find every occurrence of `sample` in `text` through its suffix array.
///
/// Returns the inclusive range of suffix-array indices whose positions
/// start with `sample`: binary search for one hit, then widen to both
/// sides. `None` when the sample does not occur.
pub fn find_with_suffix_array(sample: &[u8], text: &[u8], sa: &[i32]) -> Option<(usize, usize)> {
    if sa.is_empty() || sample.is_empty() {
        return None;
    }
    let mut left = 0usize;
    let mut right = sa.len() - 1;
    loop {
        let mid = left + (right - left) / 2;
        match compare_at(text, sa[mid] as usize, sample) {
            Ordering::Equal => {
                let mut lo = mid;
                let mut hi = mid;
                while lo > 0 && compare_at(text, sa[lo - 1] as usize, sample) == Ordering::Equal {
                    lo -= 1;
                }
                while hi + 1 < sa.len()
                    && compare_at(text, sa[hi + 1] as usize, sample) == Ordering::Equal
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
            Ordering::Greater => {
                left = mid + 1;
            }
        }
        if left > right {
            return None;
        }
    }
}
