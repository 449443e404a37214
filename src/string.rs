//! C5 — String: a spine of UTF-8 byte fragments, indexed by codepoint.
//!
//! Fragment layout: codepoint count + byte count + inline bytes, a soft
//! 16-byte fragment limit with an 8-byte merge threshold, and
//! `find`/`replace_all` non-overlapping, advance-past-match semantics.

use std::fmt;

use arrayvec::ArrayVec;

use crate::spine::{self, Fragment, Spine};

const SOFT_LIMIT: usize = 16;
const MERGE_THRESHOLD: usize = 8;

#[derive(Clone)]
pub(crate) struct StrFrag {
    bytes: ArrayVec<u8, SOFT_LIMIT>,
    codepoints: u8,
}

impl Fragment for StrFrag {
    fn frag_len(&self) -> usize {
        self.codepoints as usize
    }
}

impl StrFrag {
    fn from_str(s: &str) -> Self {
        assert!(s.len() <= SOFT_LIMIT, "fragment exceeds the 16-byte soft limit");
        let mut bytes = ArrayVec::new();
        bytes.try_extend_from_slice(s.as_bytes()).expect("checked above");
        StrFrag {
            bytes,
            codepoints: s.chars().count() as u8,
        }
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).expect("StrFrag invariant: always valid UTF-8")
    }

    fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Appends `c` in place if it still fits under the soft limit.
    fn try_push_char(&mut self, c: char) -> bool {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        if self.bytes.len() + encoded.len() > SOFT_LIMIT {
            return false;
        }
        self.bytes.try_extend_from_slice(encoded.as_bytes()).expect("checked above");
        self.codepoints += 1;
        true
    }

    fn split_at_codepoint(&self, i: usize) -> (StrFrag, StrFrag) {
        let s = self.as_str();
        let byte_idx = s.char_indices().nth(i).map(|(b, _)| b).unwrap_or(s.len());
        (StrFrag::from_str(&s[..byte_idx]), StrFrag::from_str(&s[byte_idx..]))
    }
}

fn chunk(s: &str) -> Vec<StrFrag> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < s.len() {
        let mut end = (start + SOFT_LIMIT).min(s.len());
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        out.push(StrFrag::from_str(&s[start..end]));
        start = end;
    }
    out
}

/// A persistent, codepoint-indexed UTF-8 string.
#[derive(Clone, Default)]
pub struct Text {
    spine: Spine<StrFrag>,
}

impl Text {
    /// `empty()`.
    pub fn empty() -> Self {
        Text { spine: spine::empty() }
    }

    /// `from_cstring(s)`.
    pub fn from_cstring(s: &str) -> Self {
        let mut sp = spine::empty();
        for frag in chunk(s) {
            sp = spine::push_back(&sp, frag);
        }
        Text { spine: sp }
    }

    /// `from_char(c)`.
    pub fn from_char(c: char) -> Self {
        let mut buf = [0u8; 4];
        Text {
            spine: spine::push_back(&spine::empty(), StrFrag::from_str(c.encode_utf8(&mut buf))),
        }
    }

    /// `size(s)`: codepoint count, O(1).
    pub fn len_chars(&self) -> usize {
        spine::length(&self.spine)
    }

    pub fn is_empty(&self) -> bool {
        spine::is_empty(&self.spine)
    }

    /// Byte length; not cached (only codepoint count is), so O(fragments).
    pub fn len_bytes(&self) -> usize {
        spine::fold_l(&self.spine, 0, |acc, f| acc + f.byte_len())
    }

    /// `append_char(s, c)`: merges into the back fragment when it still
    /// fits under the soft limit, else pushes a new one.
    pub fn append_char(&self, c: char) -> Self {
        if spine::is_empty(&self.spine) {
            return Text::from_char(c);
        }
        let back = spine::peek_back(&self.spine);
        let mut merged = back.clone();
        if merged.try_push_char(c) {
            Text { spine: spine::replace_back(&self.spine, merged) }
        } else {
            let mut buf = [0u8; 4];
            Text {
                spine: spine::push_back(&self.spine, StrFrag::from_str(c.encode_utf8(&mut buf))),
            }
        }
    }

    /// `append_cstring(s, t)`: merges `t` into the back fragment when the
    /// back fragment has at least `MERGE_THRESHOLD` bytes of spare room
    /// and `t` fits entirely; otherwise appends `t`'s own fragment chain.
    pub fn append_cstring(&self, t: &str) -> Self {
        if t.is_empty() {
            return self.clone();
        }
        if !spine::is_empty(&self.spine) {
            let back = spine::peek_back(&self.spine);
            let spare = SOFT_LIMIT - back.byte_len();
            if spare >= MERGE_THRESHOLD && t.len() <= spare {
                let mut merged = back.clone();
                for c in t.chars() {
                    let ok = merged.try_push_char(c);
                    debug_assert!(ok, "fit check above guarantees this merge succeeds");
                }
                return Text { spine: spine::replace_back(&self.spine, merged) };
            }
        }
        self.append_string(&Text::from_cstring(t))
    }

    /// `append_string(s, t)`: spine concatenation, O(log min(|s|,|t|)).
    pub fn append_string(&self, other: &Text) -> Self {
        Text { spine: spine::append(&self.spine, &other.spine) }
    }

    /// `lookup(s, i)`.
    pub fn lookup(&self, i: usize) -> char {
        let (frag, offset) = spine::lookup(&self.spine, i);
        frag.as_str().chars().nth(offset).expect("lookup: offset within fragment bounds")
    }

    /// `split(s, i) -> (left, right)`, `i` codepoints in `left`.
    pub fn split(&self, i: usize) -> (Text, Text) {
        if i == 0 {
            return (Text::empty(), self.clone());
        }
        if i == self.len_chars() {
            return (self.clone(), Text::empty());
        }
        let (left_spine, frag, offset, right_spine) = spine::split(&self.spine, i);
        let (frag_l, frag_r) = frag.split_at_codepoint(offset);
        let left = if frag_l.frag_len() > 0 {
            spine::push_back(&left_spine, frag_l)
        } else {
            left_spine
        };
        let right = if frag_r.frag_len() > 0 {
            spine::push_front(&right_spine, frag_r)
        } else {
            right_spine
        };
        (Text { spine: left }, Text { spine: right })
    }

    /// `left(s, i)`: the first `i` codepoints.
    pub fn left(&self, i: usize) -> Text {
        self.split(i).0
    }

    /// `right(s, i)`: everything from codepoint `i` onward.
    pub fn right(&self, i: usize) -> Text {
        self.split(i).1
    }

    /// `between(s, i, j)`: codepoints `[i, j)`.
    pub fn between(&self, i: usize, j: usize) -> Text {
        assert!(i <= j && j <= self.len_chars(), "between: index out of range");
        self.right(i).left(j - i)
    }

    /// `insert(s, i, t)`.
    pub fn insert(&self, i: usize, t: &Text) -> Text {
        let (left, right) = self.split(i);
        left.append_string(t).append_string(&right)
    }

    /// `delete(s, i, j)`: removes codepoints `[i, j)`.
    pub fn delete(&self, i: usize, j: usize) -> Text {
        assert!(i <= j && j <= self.len_chars(), "delete: index out of range");
        let (left, _) = self.split(i);
        let (_, right) = self.split(j);
        left.append_string(&right)
    }

    fn materialize(&self) -> String {
        let mut out = String::with_capacity(self.len_bytes());
        for frag in self.spine.iter() {
            out.push_str(frag.as_str());
        }
        out
    }

    /// `find(s, c)`: index of the first occurrence of `c`, codepoint scan.
    pub fn find_char(&self, c: char) -> Option<usize> {
        self.materialize().chars().position(|x| x == c)
    }

    /// `find(s, t, pos)`: naive substring search starting at codepoint `pos`.
    pub fn find_str(&self, needle: &str, pos: usize) -> Option<usize> {
        if needle.is_empty() {
            return Some(pos);
        }
        let chars: Vec<char> = self.materialize().chars().collect();
        let needle: Vec<char> = needle.chars().collect();
        if pos > chars.len() {
            return None;
        }
        (pos..=chars.len().saturating_sub(needle.len()))
            .find(|&i| chars[i..].starts_with(needle.as_slice()))
    }

    /// `replace(s, t, r)`: replaces only the first occurrence of `t`.
    pub fn replace(&self, needle: &str, replacement: &str) -> Text {
        match self.find_str(needle, 0) {
            None => self.clone(),
            Some(i) => {
                let before = self.left(i);
                let after = self.right(i + needle.chars().count());
                before.append_cstring(replacement).append_string(&after)
            }
        }
    }

    /// `replace_all(s, t, r)`: every non-overlapping occurrence of `t`,
    /// advancing past each replacement before continuing the scan.
    pub fn replace_all(&self, needle: &str, replacement: &str) -> Text {
        if needle.is_empty() {
            return self.clone();
        }
        let mut out = Text::empty();
        let mut pos = 0usize;
        loop {
            match self.find_str(needle, pos) {
                None => {
                    out = out.append_string(&self.right(pos));
                    break;
                }
                Some(i) => {
                    out = out.append_string(&self.between(pos, i));
                    out = out.append_cstring(replacement);
                    pos = i + needle.chars().count();
                }
            }
        }
        out
    }

    /// `compare(s, t)`: paired fragment traversal via the spine's
    /// `frag_cmp_at` seam, comparing codepoint by codepoint.
    pub fn compare(&self, other: &Text) -> std::cmp::Ordering {
        spine::compare(&self.spine, &other.spine, |a, ia, b, ib| {
            a.as_str().chars().nth(ia).cmp(&b.as_str().chars().nth(ib))
        })
    }

    /// `verify(s)`.
    pub fn verify(&self) -> bool {
        spine::verify(&self.spine)
            && self.spine.iter().all(|f| std::str::from_utf8(&f.bytes).is_ok() && f.frag_len() >= 1)
    }

    /// `show(s)`: escapes control characters as `\xNN`, other common
    /// non-printables with the standard C-style escapes, quotes the whole.
    pub fn show(&self) -> String {
        let mut out = String::from("\"");
        for c in self.materialize().chars() {
            match c {
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                c if (c as u32) < 0x20 || (c as u32) == 0x7f => {
                    out.push_str(&format!("\\x{:02x}", c as u32));
                }
                c => out.push(c),
            }
        }
        out.push('"');
        out
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.show())
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.materialize())
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == std::cmp::Ordering::Equal
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::from_cstring(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_cstring_round_trips_through_materialize() {
        let s = "hello, world! this text is longer than one sixteen byte fragment";
        let t = Text::from_cstring(s);
        assert!(t.verify());
        assert_eq!(t.materialize(), s);
        assert_eq!(t.len_chars(), s.chars().count());
    }

    #[test]
    fn append_char_merges_until_soft_limit() {
        let mut t = Text::empty();
        for c in "short".chars() {
            t = t.append_char(c);
        }
        assert_eq!(t.materialize(), "short");
        assert!(t.verify());
    }

    #[test]
    fn split_left_right_compose_back_to_original() {
        let t = Text::from_cstring("the quick brown fox jumps over the lazy dog");
        for i in 0..=t.len_chars() {
            let (l, r) = t.split(i);
            assert_eq!(format!("{l}{r}"), t.materialize());
        }
    }

    #[test]
    fn find_and_replace_first_occurrence() {
        let t = Text::from_cstring("ababab");
        assert_eq!(t.find_str("ab", 0), Some(0));
        assert_eq!(t.find_str("ab", 1), Some(2));
        let r = t.replace("ab", "X");
        assert_eq!(r.materialize(), "Xabab");
    }

    #[test]
    fn replace_all_is_non_overlapping() {
        let t = Text::from_cstring("aaaa");
        let r = t.replace_all("aa", "b");
        assert_eq!(r.materialize(), "bb");
    }

    #[test]
    fn show_escapes_control_characters() {
        let t = Text::from_cstring("a\nb\tc");
        assert_eq!(t.show(), "\"a\\nb\\tc\"");
    }

    #[test]
    fn unicode_codepoints_indexed_correctly() {
        let t = Text::from_cstring("a\u{00e9}\u{4e2d}b");
        assert_eq!(t.len_chars(), 4);
        assert_eq!(t.lookup(1), '\u{00e9}');
        assert_eq!(t.lookup(2), '\u{4e2d}');
    }

    proptest! {
        #[test]
        fn insert_then_delete_is_identity(s: String, i in 0usize..50, ins: String) {
            let t = Text::from_cstring(&s);
            let i = i.min(t.len_chars());
            let inserted = t.insert(i, &Text::from_cstring(&ins));
            let removed = inserted.delete(i, i + ins.chars().count());
            prop_assert_eq!(removed.materialize(), t.materialize());
        }
    }
}
