//! Call-site extraction from Go-like source text.
//!
//! Finds selector calls `<pkg>.<call_name>(<literal>, …)` and returns the raw
//! inner text of each literal argument. Comments, string, raw-string and rune
//! literals elsewhere in the file are skipped so that calls mentioned inside
//! them are not picked up.

/// A call whose first argument is not a single string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonLiteralArg {
    /// 1-based line of the call.
    pub line: usize,
    /// The offending argument text, trimmed.
    pub found: String,
}

/// Extract every identifier passed to `<pkg>.<call_name>(…)` in `source`,
/// in order of appearance (duplicates included).
pub fn extract_ids(source: &str, call_name: &str) -> Result<Vec<String>, NonLiteralArg> {
    let mut cursor = Cursor::new(source);
    let mut ids = Vec::new();

    while let Some(b) = cursor.peek() {
        match b {
            b'/' if cursor.peek_at(1) == Some(b'/') => cursor.skip_line_comment(),
            b'/' if cursor.peek_at(1) == Some(b'*') => cursor.skip_block_comment(),
            b'"' | b'\'' => {
                cursor.quoted(b);
            }
            b'`' => {
                cursor.raw();
            }
            b if is_ident_byte(b) => {
                let start = cursor.pos;
                let ident = cursor.ident();
                if ident == call_name.as_bytes() && cursor.preceded_by_dot(start) {
                    if let Some(id) = cursor.call_argument()? {
                        ids.push(id);
                    }
                }
            }
            _ => cursor.bump(),
        }
    }

    Ok(ids)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

struct Cursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        if self.peek() == Some(b'\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.bump();
        }
    }

    fn skip_line_comment(&mut self) {
        while !matches!(self.peek(), None | Some(b'\n')) {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while let Some(b) = self.peek() {
            if b == b'*' && self.peek_at(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            self.bump();
        }
    }

    /// Consume a `"…"` or `'…'` literal; returns its raw inner text when closed
    /// on the same line.
    fn quoted(&mut self, quote: u8) -> Option<&'a str> {
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'\n' => return None,
                b if b == quote => {
                    let src = self.src;
                    let inner = &src[start..self.pos];
                    self.pos += 1;
                    return Some(inner);
                }
                _ => self.pos += 1,
            }
        }
        None
    }

    /// Consume a `` `…` `` raw literal, which may span lines.
    fn raw(&mut self) -> Option<&'a str> {
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'`' {
                let src = self.src;
                let inner = &src[start..self.pos];
                self.pos += 1;
                return Some(inner);
            }
            self.bump();
        }
        None
    }

    fn ident(&mut self) -> &'a [u8] {
        let bytes = self.bytes;
        let start = self.pos;
        while self.peek().is_some_and(is_ident_byte) {
            self.pos += 1;
        }
        &bytes[start..self.pos]
    }

    fn preceded_by_dot(&self, start: usize) -> bool {
        self.bytes[..start]
            .iter()
            .rev()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'.')
    }

    /// After the call name: parse `( <literal> [, …] )`.
    ///
    /// `Ok(None)` when the name is not followed by `(` (a method value, not a call).
    fn call_argument(&mut self) -> Result<Option<String>, NonLiteralArg> {
        let line = self.line;
        self.skip_whitespace();
        if self.peek() != Some(b'(') {
            return Ok(None);
        }
        self.pos += 1;
        self.skip_whitespace();

        let arg_start = self.pos;
        let literal = match self.peek() {
            Some(b'"') => self.quoted(b'"'),
            Some(b'`') => self.raw(),
            _ => None,
        };

        if let Some(id) = literal {
            self.skip_whitespace();
            if matches!(self.peek(), Some(b',' | b')')) {
                return Ok(Some(id.to_string()));
            }
        }

        Err(NonLiteralArg {
            line,
            found: self.argument_text(arg_start),
        })
    }

    fn argument_text(&self, start: usize) -> String {
        let rest = &self.src[start..];
        let end = rest
            .find(|c| matches!(c, ',' | ')' | '\n'))
            .unwrap_or(rest.len());
        rest[..end].trim().to_string()
    }
}
