use crate::error::PatternError;

/// How a pattern argument is turned into bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternMode {
    /// UTF-8 text with `\n`, `\r`, `\t`, `\0`, `\\` and `\xNN` escapes
    #[default]
    Escaped,
    /// UTF-8 text taken byte for byte
    Literal,
    /// Hex digits, optionally `0x`-prefixed and separated by whitespace
    Hex,
}

/// Parse a user-supplied pattern into the bytes to search for
pub fn parse_pattern(input: &str, mode: PatternMode) -> Result<Vec<u8>, PatternError> {
    let bytes = match mode {
        PatternMode::Literal => input.as_bytes().to_vec(),
        PatternMode::Escaped => PatternParser::new(input).parse_escaped()?,
        PatternMode::Hex => parse_hex(input)?,
    };

    if bytes.is_empty() {
        return Err(PatternError::Empty);
    }
    Ok(bytes)
}

/// Decode a hex string such as `"de ad be ef"`, `"0xDEADBEEF"` or `"0x4d 0x5a"`
///
/// Each whitespace-separated token may carry its own `0x`/`0X` prefix.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, PatternError> {
    let mut digits: Vec<(usize, char)> = Vec::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    let mut token_start = true;

    while let Some((pos, c)) = chars.next() {
        if c.is_whitespace() {
            token_start = true;
            continue;
        }
        if token_start && c == '0' && matches!(chars.peek(), Some((_, 'x' | 'X'))) {
            chars.next();
            token_start = false;
            continue;
        }
        token_start = false;
        digits.push((pos, c));
    }

    if digits.len() % 2 != 0 {
        return Err(PatternError::OddHexLength(digits.len()));
    }

    let nibble = |(position, digit): (usize, char)| {
        digit
            .to_digit(16)
            .map(|d| d as u8)
            .ok_or(PatternError::InvalidHexDigit { digit, position })
    };

    digits
        .chunks_exact(2)
        .map(|pair| Ok((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

/// Escape-aware pattern parser
struct PatternParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> PatternParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_escaped(&mut self) -> Result<Vec<u8>, PatternError> {
        let mut out = Vec::with_capacity(self.input.len());

        while let Some(ch) = self.peek_char() {
            if ch != '\\' {
                let start = self.pos;
                self.advance();
                out.extend_from_slice(&self.input.as_bytes()[start..self.pos]);
                continue;
            }

            let start = self.pos;
            self.advance();
            let byte = match self.peek_char() {
                Some('n') => b'\n',
                Some('r') => b'\r',
                Some('t') => b'\t',
                Some('0') => 0,
                Some('\\') => b'\\',
                Some('x') => {
                    self.advance();
                    let hex = self.remaining().get(..2).unwrap_or("");
                    match u8::from_str_radix(hex, 16) {
                        Ok(b) if hex.len() == 2 && hex.bytes().all(|c| c.is_ascii_hexdigit()) => {
                            self.pos += 2;
                            out.push(b);
                            continue;
                        }
                        _ => return Err(self.invalid_escape(start)),
                    }
                }
                _ => return Err(self.invalid_escape(start)),
            };
            self.advance();
            out.push(byte);
        }

        Ok(out)
    }

    fn invalid_escape(&self, start: usize) -> PatternError {
        let sequence: String = self.input[start..].chars().take(4).collect();
        PatternError::InvalidEscape {
            sequence,
            position: start,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        assert_eq!(parse_pattern("abc", PatternMode::Literal).unwrap(), b"abc");
        assert_eq!(parse_pattern("a\\n", PatternMode::Literal).unwrap(), b"a\\n");
        assert_eq!(
            parse_pattern("é", PatternMode::Literal).unwrap(),
            vec![0xc3, 0xa9]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            parse_pattern("MZ\\x90\\x00", PatternMode::Escaped).unwrap(),
            vec![b'M', b'Z', 0x90, 0x00]
        );
        assert_eq!(
            parse_pattern("a\\tb\\n\\r\\0\\\\", PatternMode::Escaped).unwrap(),
            b"a\tb\n\r\0\\"
        );
        assert_eq!(
            parse_pattern("héllo", PatternMode::Escaped).unwrap(),
            "héllo".as_bytes()
        );
    }

    #[test]
    fn test_bad_escapes() {
        assert_eq!(
            parse_pattern("ab\\q", PatternMode::Escaped),
            Err(PatternError::InvalidEscape {
                sequence: "\\q".to_string(),
                position: 2
            })
        );
        assert!(matches!(
            parse_pattern("\\x4", PatternMode::Escaped),
            Err(PatternError::InvalidEscape { position: 0, .. })
        ));
        assert!(matches!(
            parse_pattern("\\xzz", PatternMode::Escaped),
            Err(PatternError::InvalidEscape { .. })
        ));
        assert!(matches!(
            parse_pattern("trailing\\", PatternMode::Escaped),
            Err(PatternError::InvalidEscape { position: 8, .. })
        ));
    }

    #[test]
    fn test_hex() {
        assert_eq!(
            parse_pattern("deadBEEF", PatternMode::Hex).unwrap(),
            vec![0xde, 0xad, 0xbe, 0xef]
        );
        assert_eq!(
            parse_pattern("0x4d 5a\t90 00", PatternMode::Hex).unwrap(),
            vec![0x4d, 0x5a, 0x90, 0x00]
        );
    }

    #[test]
    fn test_hex_prefix_per_token() {
        assert_eq!(
            parse_pattern("0x4d 0x5a", PatternMode::Hex).unwrap(),
            vec![0x4d, 0x5a]
        );
        assert_eq!(
            parse_pattern("  0X90\t0x00 ff", PatternMode::Hex).unwrap(),
            vec![0x90, 0x00, 0xff]
        );
        // a prefix only counts at the start of a token
        assert_eq!(
            parse_pattern("4d0x5a", PatternMode::Hex),
            Err(PatternError::InvalidHexDigit {
                digit: 'x',
                position: 3
            })
        );
    }

    #[test]
    fn test_hex_errors() {
        assert_eq!(
            parse_pattern("abc", PatternMode::Hex),
            Err(PatternError::OddHexLength(3))
        );
        assert_eq!(
            parse_pattern(" 0x4d 0xzz", PatternMode::Hex),
            Err(PatternError::InvalidHexDigit {
                digit: 'z',
                position: 8
            })
        );
        assert_eq!(
            parse_pattern("0xag", PatternMode::Hex),
            Err(PatternError::InvalidHexDigit {
                digit: 'g',
                position: 3
            })
        );
    }

    #[test]
    fn test_empty_pattern() {
        assert_eq!(parse_pattern("", PatternMode::Literal), Err(PatternError::Empty));
        assert_eq!(parse_pattern("", PatternMode::Escaped), Err(PatternError::Empty));
        assert_eq!(parse_pattern("0x", PatternMode::Hex), Err(PatternError::Empty));
        assert_eq!(parse_pattern("   ", PatternMode::Hex), Err(PatternError::Empty));
    }
}
