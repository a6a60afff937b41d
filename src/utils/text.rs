// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Read-time projection of captured output.
//!
//! Buffers are never altered at storage time; trimming and tail selection
//! happen here, on a copy, every time a caller asks.

/// Last `n` lines of `text`. `n == 0` returns the input unchanged.
pub fn tail_lines(text: &str, n: usize) -> &str {
    if n == 0 {
        return text;
    }
    // A single trailing newline terminates the last line rather than
    // starting an empty one.
    let body = text.strip_suffix('\n').unwrap_or(text);
    let body = body.strip_suffix('\r').unwrap_or(body);
    let mut seen = 0;
    for (idx, byte) in body.bytes().enumerate().rev() {
        if byte == b'\n' {
            seen += 1;
            if seen == n {
                return &body[idx + 1..];
            }
        }
    }
    body
}

/// Decode a raw buffer, apply the tail, trim surrounding whitespace.
pub fn project(raw: &[u8], tail: usize) -> String {
    let decoded = String::from_utf8_lossy(raw);
    tail_lines(&decoded, tail).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_tail_keeps_everything() {
        assert_eq!(project(b"  a\nb\nc\n\n", 0), "a\nb\nc");
    }

    #[test]
    fn test_tail_counts_lines_not_newlines() {
        assert_eq!(tail_lines("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail_lines("a\nb\nc", 2), "b\nc");
        assert_eq!(tail_lines("a\nb\nc", 1), "c");
    }

    #[test]
    fn test_tail_larger_than_buffer() {
        assert_eq!(tail_lines("a\nb", 10), "a\nb");
        assert_eq!(tail_lines("", 3), "");
    }

    #[test]
    fn test_crlf_output() {
        assert_eq!(project(b"one\r\ntwo\r\nthree\r\n", 2), "two\r\nthree");
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_dropped() {
        let out = project(b"ok \xff\xfe done", 0);
        assert!(out.starts_with("ok "));
        assert!(out.ends_with(" done"));
        assert!(out.contains('\u{FFFD}'));
    }
}
