//! Delimiter-driven token scanner over a borrowed byte range.

/// Maximum number of delimiters one phase may register.
pub const MAX_DELIMITERS: usize = 8;
/// Shared backing storage for all registered delimiter bytes.
pub const DELIMITER_STORAGE: usize = 16;

/// Zero-copy tokenizer driven by a replaceable set of boundary byte strings.
///
/// The scanner walks a borrowed byte range and never allocates: every token it
/// produces is a subslice of the input, and the active delimiter set is packed
/// into a fixed-size backing array owned by the lexer itself.
///
/// Delimiters are tested in registration order at every candidate position and
/// the first match wins, so compound boundaries must be registered before
/// their prefixes (`"\r\n"` before `"\r"` and `"\n"`) to take priority.
///
/// The lexer is `Clone`; cloning snapshots the cursor, which is how callers
/// peek ahead without consuming (the parser's blank-line test).
///
/// # Examples
/// ```
/// use ember_web::Lexer;
///
/// const DELIMS: &[&[u8]] = &[b" ", b"\t"];
///
/// let mut lexer = Lexer::new(b"one  two\tthree");
/// lexer.set_delimiters(DELIMS);
///
/// assert_eq!(lexer.next(true), b"one");
/// assert_eq!(lexer.next(true), b"two");
/// assert_eq!(lexer.next(true), b"three");
/// assert!(lexer.end_of_stream());
/// ```
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    stream: &'a [u8],
    initial_len: usize,

    // Registered delimiters, packed back to back into `data` and addressed
    // through `spans` as (offset, length) pairs.
    data: [u8; DELIMITER_STORAGE],
    spans: [(u8, u8); MAX_DELIMITERS],
    count: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a scanner over `stream` with an empty delimiter set.
    #[inline]
    pub fn new(stream: &'a [u8]) -> Self {
        Self {
            stream,
            initial_len: stream.len(),
            data: [0; DELIMITER_STORAGE],
            spans: [(0, 0); MAX_DELIMITERS],
            count: 0,
        }
    }

    /// Replaces the active delimiter set for the next tokenizing phase.
    ///
    /// # Panics
    ///
    /// Panics when the set exceeds [`MAX_DELIMITERS`], when the combined byte
    /// length exceeds [`DELIMITER_STORAGE`], or when a delimiter is empty.
    /// These are call-site bugs, not runtime conditions.
    pub fn set_delimiters(&mut self, delimiters: &[&[u8]]) {
        assert!(
            delimiters.len() <= MAX_DELIMITERS,
            "too many delimiters: {} > {}",
            delimiters.len(),
            MAX_DELIMITERS
        );

        self.count = 0;
        let mut used = 0;

        for delimiter in delimiters {
            assert!(!delimiter.is_empty(), "empty delimiter");
            assert!(
                used + delimiter.len() <= DELIMITER_STORAGE,
                "delimiters exceed {} bytes of backing storage",
                DELIMITER_STORAGE
            );

            self.data[used..used + delimiter.len()].copy_from_slice(delimiter);
            self.spans[self.count] = (used as u8, delimiter.len() as u8);

            used += delimiter.len();
            self.count += 1;
        }
    }

    /// Returns the next token, advancing past it and its boundary.
    ///
    /// Scans forward until a registered delimiter matches and returns the
    /// preceding bytes (empty when a delimiter matches immediately). With
    /// `compress`, the cursor also skips every consecutive delimiter that
    /// follows the match; otherwise it advances past exactly one occurrence,
    /// which preserves boundary width for blank-line detection. When the
    /// stream ends before any delimiter matches, the remaining bytes are the
    /// final token.
    pub fn next(&mut self, compress: bool) -> &'a [u8] {
        let mut word = 0;

        while word < self.stream.len() {
            let delim_len = self.delimiter_at(word);

            if delim_len == 0 {
                word += 1;
                continue;
            }

            let token = &self.stream[..word];
            let stride = word
                + if compress {
                    self.consume_delimiters(word)
                } else {
                    delim_len
                };

            self.stream = &self.stream[stride..];
            return token;
        }

        // Reached end of stream: lenient truncation.
        let token = self.stream;
        self.stream = &self.stream[self.stream.len()..];
        token
    }

    /// Skips any delimiters located directly at the cursor without producing
    /// a token. Returns how many bytes were skipped.
    #[inline]
    pub fn compress(&mut self) -> usize {
        let stride = self.consume_delimiters(0);
        self.stream = &self.stream[stride..];
        stride
    }

    /// The unconsumed suffix of the stream.
    #[inline(always)]
    pub fn remaining(&self) -> &'a [u8] {
        self.stream
    }

    /// Bytes consumed since construction.
    #[inline(always)]
    pub fn consumption(&self) -> usize {
        self.initial_len - self.stream.len()
    }

    /// True once no bytes remain; stays true from then on.
    #[inline(always)]
    pub fn end_of_stream(&self) -> bool {
        self.stream.is_empty()
    }

    /// Length of the first registered delimiter matching at `pos`, or 0.
    #[inline]
    fn delimiter_at(&self, pos: usize) -> usize {
        for i in 0..self.count {
            let (offset, len) = self.spans[i];
            let (offset, len) = (offset as usize, len as usize);

            if pos + len <= self.stream.len()
                && self.stream[pos..pos + len] == self.data[offset..offset + len]
            {
                return len;
            }
        }

        0
    }

    /// Length of the run of consecutive delimiters starting at `from`.
    #[inline]
    fn consume_delimiters(&self, from: usize) -> usize {
        let mut stride = 0;

        loop {
            let delim_len = self.delimiter_at(from + stride);
            if delim_len == 0 {
                return stride;
            }
            stride += delim_len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPACES: &[&[u8]] = &[b" ", b"\t"];
    const LINES: &[&[u8]] = &[b"\r\n", b"\r", b"\n"];

    #[test]
    fn empty_token_on_immediate_delimiter() {
        let mut lexer = Lexer::new(b" x");
        lexer.set_delimiters(SPACES);

        assert_eq!(lexer.next(false), b"");
        assert_eq!(lexer.next(false), b"x");
    }

    #[test]
    fn compound_delimiter_registered_first_wins() {
        let mut lexer = Lexer::new(b"a\r\nb");
        lexer.set_delimiters(LINES);

        assert_eq!(lexer.next(false), b"a");
        // "\r\n" matched as one boundary, not "\r" then "\n".
        assert_eq!(lexer.remaining(), b"b");
    }

    #[test]
    fn prefix_registered_first_shadows_compound() {
        const BAD_ORDER: &[&[u8]] = &[b"\r", b"\r\n", b"\n"];

        let mut lexer = Lexer::new(b"a\r\nb");
        lexer.set_delimiters(BAD_ORDER);

        assert_eq!(lexer.next(false), b"a");
        // Lone "\r" won, leaving the "\n" in the stream.
        assert_eq!(lexer.remaining(), b"\nb");
    }

    #[test]
    fn compress_skips_delimiter_runs() {
        let mut lexer = Lexer::new(b"a  \t b");
        lexer.set_delimiters(SPACES);

        assert_eq!(lexer.next(true), b"a");
        assert_eq!(lexer.remaining(), b"b");
    }

    #[test]
    fn non_compressing_consumes_exactly_one_occurrence() {
        let mut lexer = Lexer::new(b"a\n\n\nb");
        lexer.set_delimiters(LINES);

        assert_eq!(lexer.next(false), b"a");
        assert_eq!(lexer.remaining(), b"\n\nb");
        assert_eq!(lexer.next(false), b"");
        assert_eq!(lexer.remaining(), b"\nb");
    }

    #[test]
    fn lenient_tail_token() {
        let mut lexer = Lexer::new(b"unterminated");
        lexer.set_delimiters(SPACES);

        assert_eq!(lexer.next(true), b"unterminated");
        assert!(lexer.end_of_stream());
        assert_eq!(lexer.next(true), b"");
    }

    #[test]
    fn leading_compress_reports_stride() {
        let mut lexer = Lexer::new(b"\r\n\nx");
        lexer.set_delimiters(LINES);

        assert_eq!(lexer.compress(), 3);
        assert_eq!(lexer.compress(), 0);
        assert_eq!(lexer.remaining(), b"x");
        assert_eq!(lexer.consumption(), 3);
    }

    #[test]
    fn consumption_tracks_all_strides() {
        let mut lexer = Lexer::new(b"ab cd  ef");
        lexer.set_delimiters(SPACES);

        assert_eq!(lexer.consumption(), 0);
        lexer.next(true);
        assert_eq!(lexer.consumption(), 3);
        lexer.next(true);
        assert_eq!(lexer.consumption(), 7);
        lexer.next(true);
        assert_eq!(lexer.consumption(), 9);
    }

    #[test]
    fn end_of_stream_iff_nothing_remains() {
        let mut lexer = Lexer::new(b"a b");
        lexer.set_delimiters(SPACES);

        while !lexer.end_of_stream() {
            assert!(!lexer.remaining().is_empty());
            lexer.next(true);
        }

        assert!(lexer.remaining().is_empty());
        lexer.next(true);
        assert!(lexer.end_of_stream());
    }

    #[test]
    fn delimiter_set_is_replaceable_between_phases() {
        let mut lexer = Lexer::new(b"key:value\r\nrest");

        const KEY: &[&[u8]] = &[b":"];
        lexer.set_delimiters(KEY);
        assert_eq!(lexer.next(true), b"key");

        lexer.set_delimiters(LINES);
        assert_eq!(lexer.next(false), b"value");
        assert_eq!(lexer.remaining(), b"rest");
    }

    #[test]
    fn partial_compound_at_stream_end_falls_back() {
        let mut lexer = Lexer::new(b"a\r");
        lexer.set_delimiters(LINES);

        // "\r\n" cannot match with one byte left, the lone "\r" does.
        assert_eq!(lexer.next(false), b"a");
        assert!(lexer.end_of_stream());
    }

    // Reconstruction property: tokens plus consumed boundary runs rebuild the
    // input byte for byte.
    fn reconstructs(input: &[u8], delimiters: &[&[u8]]) {
        let mut lexer = Lexer::new(input);
        lexer.set_delimiters(delimiters);

        let mut rebuilt = Vec::new();

        while !lexer.end_of_stream() {
            let before = lexer.consumption();
            let token = lexer.next(true);
            let after = lexer.consumption();

            rebuilt.extend_from_slice(token);
            rebuilt.extend_from_slice(&input[before + token.len()..after]);
        }

        assert_eq!(rebuilt, input);
    }

    #[test]
    fn reconstruction_loses_no_bytes() {
        reconstructs(b"GET /path HTTP/1.1", &[b" "]);
        reconstructs(b"  leading and trailing  ", SPACES);
        reconstructs(b"a\r\nb\rc\nd\r\n\r\n", LINES);
        reconstructs(b"Session=abcd1234; User=Yam", &[b"=", b";", b" "]);
        reconstructs(b"no delimiters here", &[b"|"]);
        reconstructs(b"", SPACES);
    }

    #[test]
    #[should_panic(expected = "too many delimiters")]
    fn rejects_oversized_delimiter_count() {
        let mut lexer = Lexer::new(b"");
        lexer.set_delimiters(&[
            b"a", b"b", b"c", b"d", b"e", b"f", b"g", b"h", b"i",
        ]);
    }

    #[test]
    #[should_panic(expected = "backing storage")]
    fn rejects_oversized_delimiter_bytes() {
        let mut lexer = Lexer::new(b"");
        lexer.set_delimiters(&[b"0123456789", b"0123456"]);
    }

    #[test]
    #[should_panic(expected = "empty delimiter")]
    fn rejects_empty_delimiter() {
        let mut lexer = Lexer::new(b"");
        lexer.set_delimiters(&[b" ", b""]);
    }

    #[test]
    fn repacking_resets_storage() {
        let mut lexer = Lexer::new(b"a|b");
        lexer.set_delimiters(&[b"0123456789", b"012345"]);
        // A full table from the previous phase must not leak into this one.
        lexer.set_delimiters(&[b"|"]);

        assert_eq!(lexer.next(true), b"a");
        assert_eq!(lexer.next(true), b"b");
    }

    #[test]
    fn cloned_lexer_peeks_without_consuming() {
        let mut lexer = Lexer::new(b"\r\nbody");
        lexer.set_delimiters(LINES);

        let mut peek = lexer.clone();
        assert_eq!(peek.next(false), b"");

        // The original cursor did not move.
        assert_eq!(lexer.remaining(), b"\r\nbody");
        assert_eq!(lexer.consumption(), 0);
    }
}
