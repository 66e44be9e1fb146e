//! Command Line Tokenizer
//!
//! Splits one raw command line into string tokens.
//!
//! ## How the Tokenizer Works
//!
//! The tokenizer is a two-state machine:
//!
//! ```text
//!            '"'                       '"'
//!   ┌─────────────────┐      ┌──────────────────┐
//!   │                 ▼      │                  ▼
//! Outside          InsideQuote             Outside
//!   │ whitespace: end token │ '\': next char is literal
//!   │ other: append         │ other: append (incl. whitespace)
//! ```
//!
//! Quote characters are kept in the raw token text while scanning. Once a
//! token is complete:
//! - if it both starts and ends with a quote, the outer quotes are stripped
//!   and `\"` / `\\` are unescaped (`"a b"` → `a b`);
//! - if the line ended inside a quote that opened the token, the span runs
//!   to end of line and the leading quote is stripped (`"a b` → `a b`);
//! - otherwise the token is kept verbatim, so a JSON literal such as
//!   `{"x":1}` survives untouched.

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InsideQuote,
}

const QUOTE: char = '"';
const ESCAPE: char = '\\';

/// A reusable line tokenizer.
///
/// # Example
///
/// ```
/// use kvadmin::protocol::Tokenizer;
///
/// let tokens = Tokenizer::new().tokenize(r#"add "a b" c {"x":1}"#);
/// assert_eq!(tokens, vec!["add", "a b", "c", r#"{"x":1}"#]);
/// ```
#[derive(Debug)]
pub struct Tokenizer {
    state: State,
    /// Raw text of the token being built, quotes included
    current: String,
    /// Whether `current` holds a token (distinguishes `""` from no token)
    in_token: bool,
    /// Set when the last consumed character closed a quote
    closed_at_end: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    /// Creates a new tokenizer.
    pub fn new() -> Self {
        Self {
            state: State::Outside,
            current: String::new(),
            in_token: false,
            closed_at_end: false,
        }
    }

    /// Splits a line into tokens.
    ///
    /// An empty or whitespace-only line yields no tokens.
    pub fn tokenize(&mut self, line: &str) -> Vec<String> {
        self.reset();
        let mut tokens = Vec::new();
        let mut chars = line.chars();

        while let Some(c) = chars.next() {
            match self.state {
                State::Outside => {
                    if c.is_whitespace() {
                        if self.in_token {
                            tokens.push(self.finish_token());
                        }
                        continue;
                    }
                    self.in_token = true;
                    self.current.push(c);
                    self.closed_at_end = false;
                    if c == QUOTE {
                        self.state = State::InsideQuote;
                    }
                }
                State::InsideQuote => {
                    self.current.push(c);
                    if c == ESCAPE {
                        if let Some(next) = chars.next() {
                            self.current.push(next);
                        }
                    } else if c == QUOTE {
                        self.state = State::Outside;
                        self.closed_at_end = true;
                    }
                }
            }
        }

        if self.in_token {
            tokens.push(self.finish_token());
        }

        tokens
    }

    fn reset(&mut self) {
        self.state = State::Outside;
        self.current.clear();
        self.in_token = false;
        self.closed_at_end = false;
    }

    /// Completes the current token, applying the quote-stripping rules.
    fn finish_token(&mut self) -> String {
        let raw = std::mem::take(&mut self.current);
        let unterminated = self.state == State::InsideQuote;
        let closed_at_end = self.closed_at_end;

        self.state = State::Outside;
        self.in_token = false;
        self.closed_at_end = false;

        if !raw.starts_with(QUOTE) {
            return raw;
        }

        if unterminated {
            unescape(&raw[1..])
        } else if closed_at_end && raw.len() >= 2 {
            unescape(&raw[1..raw.len() - 1])
        } else {
            raw
        }
    }
}

/// Resolves `\"` and `\\` inside a stripped quoted span.
///
/// Any other backslash sequence is left as written.
fn unescape(span: &str) -> String {
    let mut out = String::with_capacity(span.len());
    let mut chars = span.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ESCAPE {
            match chars.peek() {
                Some(&next) if next == QUOTE || next == ESCAPE => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Convenience function to tokenize a single line.
pub fn tokenize(line: &str) -> Vec<String> {
    Tokenizer::new().tokenize(line)
}

/// Joins already-split arguments into one line that tokenizes back to them.
///
/// Arguments without whitespace or quotes are written verbatim; the rest are
/// wrapped in quotes with `"` and `\` escaped.
pub fn join_tokens<S: AsRef<str>>(args: &[S]) -> String {
    let mut line = String::new();

    for (i, arg) in args.iter().enumerate() {
        let arg = arg.as_ref();
        if i > 0 {
            line.push(' ');
        }

        if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == QUOTE) {
            line.push_str(arg);
            continue;
        }

        line.push(QUOTE);
        for c in arg.chars() {
            if c == QUOTE || c == ESCAPE {
                line.push(ESCAPE);
            }
            line.push(c);
        }
        line.push(QUOTE);
    }

    line
}
