//! Rope-backed text storage for the in-memory editing surface.
//!
//! Offsets are in Unicode scalar values (chars), not bytes or UTF-16. Edits
//! with out-of-range offsets are clamped rather than panicking, since they
//! come straight from surface events.

use std::fmt;
use std::ops::Range;

#[derive(Clone, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Insert at `char_offset`, clamped to the end of the text. Returns the
    /// offset just past the inserted text.
    pub fn insert(&mut self, char_offset: usize, text: &str) -> usize {
        let at = char_offset.min(self.len_chars());
        self.rope.insert(at, text);
        at + text.chars().count()
    }

    /// Delete a char range, clamped to the text.
    pub fn delete(&mut self, char_range: Range<usize>) {
        let len = self.len_chars();
        let range = char_range.start.min(len)..char_range.end.min(len);
        if !range.is_empty() {
            self.rope.remove(range);
        }
    }

    /// Replace a char range, returning the offset just past the new text.
    pub fn replace(&mut self, char_range: Range<usize>, text: &str) -> usize {
        let start = char_range.start;
        self.delete(char_range);
        self.insert(start, text)
    }

    /// Replace the whole text.
    pub fn set(&mut self, text: &str) {
        if self.rope != text {
            self.rope = ropey::Rope::from_str(text);
        }
    }
}

impl fmt::Display for EditorRope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl fmt::Debug for EditorRope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorRope")
            .field("len_chars", &self.len_chars())
            .finish()
    }
}

impl From<&str> for EditorRope {
    fn from(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_delete() {
        let mut rope = EditorRope::from("hello world");
        assert_eq!(rope.len_chars(), 11);

        assert_eq!(rope.insert(5, " beautiful"), 15);
        assert_eq!(rope.to_string(), "hello beautiful world");

        rope.delete(5..15);
        assert_eq!(rope.to_string(), "hello world");
    }

    #[test]
    fn out_of_range_edits_are_clamped() {
        let mut rope = EditorRope::from("abc");
        assert_eq!(rope.insert(99, "d"), 4);
        assert_eq!(rope.to_string(), "abcd");
        rope.delete(2..99);
        assert_eq!(rope.to_string(), "ab");
        rope.delete(7..9);
        assert_eq!(rope.to_string(), "ab");
    }

    #[test]
    fn replace_counts_chars_not_bytes() {
        let mut rope = EditorRope::from("x = a");
        assert_eq!(rope.replace(4..5, "\u{3b1}\u{b2}"), 6);
        assert_eq!(rope.to_string(), "x = \u{3b1}\u{b2}");
        assert_eq!(rope.len_chars(), 6);
    }
}
