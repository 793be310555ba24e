//! Locates successive whitespace-delimited JSON blobs in a byte slice,
//! tracking line numbers as it goes. Operates directly on the bytes
//! backing the memory map; returned spans borrow from `input` and must
//! not outlive it.

use crate::error::{IllegalDelimiterSnafu, Result, UnterminatedBlobSnafu};

/// A located blob: its byte span within the mapped input and the line
/// number its opening brace was found on.
pub struct Blob<'a> {
    pub bytes: &'a [u8],
    pub line: u64,
}

/// Cursor over the mapped input, handing out one blob at a time.
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
    line: u64,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Scanner {
            input,
            pos: 0,
            line: 1,
        }
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns the next blob, or `None` at end of input.
    pub fn next_blob(&mut self) -> Result<Option<Blob<'a>>> {
        let start = self.skip_to_brace()?;

        let Some(start) = start else {
            return Ok(None);
        };

        let blob_line = self.line;
        let end = self.scan_to_close(start)?;
        let bytes = &self.input[start..end];
        self.pos = end;

        Ok(Some(Blob {
            bytes,
            line: blob_line,
        }))
    }

    /// Skips whitespace (counting newlines) until the next `{`. Returns
    /// `Ok(None)` if end of input is reached without finding one, and
    /// errors on any other non-whitespace byte.
    fn skip_to_brace(&mut self) -> Result<Option<usize>> {
        while self.pos < self.input.len() {
            let c = self.input[self.pos];

            if c == b'\n' {
                self.line += 1;
                self.pos += 1;
                continue;
            }

            if c.is_ascii_whitespace() {
                self.pos += 1;
                continue;
            }

            if c == b'{' {
                return Ok(Some(self.pos));
            }

            return IllegalDelimiterSnafu {
                line: self.line,
                found: c as char,
            }
            .fail();
        }

        Ok(None)
    }

    /// Given the index of an opening `{`, returns the index one past
    /// the matching closing `}`, tracking nesting depth and string
    /// state (including escapes) and counting lines within strings.
    fn scan_to_close(&mut self, start: usize) -> Result<usize> {
        debug_assert_eq!(self.input[start], b'{');

        let blob_start_line = self.line;
        let mut depth: i64 = 1;
        let mut in_string = false;
        let mut escaped = false;
        let mut i = start + 1;

        while i < self.input.len() {
            let c = self.input[i];
            i += 1;

            if c == b'\n' {
                self.line += 1;
            }

            if escaped {
                escaped = false;
                continue;
            }

            match c {
                b'"' => in_string = !in_string,
                b'\\' if in_string => escaped = true,
                b'{' if !in_string => depth += 1,
                b'}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }

        UnterminatedBlobSnafu {
            line: blob_start_line,
        }
        .fail()
    }
}
