//! Whitespace-delimited token scanner for scenario scripts
//!
//! The format has no comments and no quoting: a token is any maximal
//! run of non-whitespace bytes. One token of pushback lets the parser
//! peek across item boundaries.

pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    pushback: Option<&'a str>,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            pushback: None,
        }
    }

    /// Next token, or `None` at end of input
    pub fn next_token(&mut self) -> Option<&'a str> {
        if let Some(tok) = self.pushback.take() {
            return Some(tok);
        }
        let bytes = self.src.as_bytes();
        let mut i = self.pos;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            self.pos = i;
            return None;
        }
        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        self.pos = i;
        // Splits happen at ASCII bytes only, so slices stay on char
        // boundaries even for non-ASCII token content
        Some(&self.src[start..i])
    }

    /// Return a token so the next `next_token` call yields it again
    pub fn push_back(&mut self, token: &'a str) {
        debug_assert!(self.pushback.is_none(), "single-token pushback");
        self.pushback = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_any_whitespace() {
        let mut s = Scanner::new("  alpha\tbeta\n\n gamma ");
        assert_eq!(s.next_token(), Some("alpha"));
        assert_eq!(s.next_token(), Some("beta"));
        assert_eq!(s.next_token(), Some("gamma"));
        assert_eq!(s.next_token(), None);
        assert_eq!(s.next_token(), None);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(Scanner::new("").next_token(), None);
        assert_eq!(Scanner::new(" \n\t ").next_token(), None);
    }

    #[test]
    fn pushback_replays_one_token() {
        let mut s = Scanner::new("one two");
        let t = s.next_token().unwrap();
        s.push_back(t);
        assert_eq!(s.next_token(), Some("one"));
        assert_eq!(s.next_token(), Some("two"));
    }
}
