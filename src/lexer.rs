//! Splitting of raw command lines into argument words.
//!
//! The only quoting supported is the single quote: everything between a pair of
//! `'` characters is taken literally, whitespace included. Quote characters are
//! never part of the resulting words, and a quote left open at the end of the
//! line is silently closed. There are no escapes and double quotes are ordinary
//! characters.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Unquoted,
    SingleQuoted,
}

struct LexingFSM<'a> {
    input: std::str::Chars<'a>,
    state: LexingState,
    buffer: String,
    out: Vec<String>,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str) -> Self {
        LexingFSM {
            input: line.chars(),
            state: LexingState::Unquoted,
            buffer: String::new(),
            out: Vec::new(),
        }
    }

    /// Runs the machine over the whole input and returns the words in order.
    fn make_tokens(mut self) -> Vec<String> {
        while let Some(ch) = self.input.next() {
            match self.state {
                LexingState::Unquoted => self.handle_unquoted(ch),
                LexingState::SingleQuoted => self.handle_single_quote(ch),
            }
        }

        // An unterminated quote keeps whatever it collected.
        self.flush();
        self.out
    }

    fn handle_unquoted(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::SingleQuoted,
            c if c.is_whitespace() => self.flush(),
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::Unquoted,
            c => self.buffer.push(c),
        }
    }

    /// Emits the pending word. Empty words are never produced, so `''` on its
    /// own contributes nothing.
    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.out.push(std::mem::take(&mut self.buffer));
        }
    }
}

/// Split a command line into words.
///
/// ```
/// use minish::lexer::split_into_tokens;
/// assert_eq!(split_into_tokens("echo 'a b' c"), ["echo", "a b", "c"]);
/// ```
pub fn split_into_tokens(line: &str) -> Vec<String> {
    LexingFSM::new(line).make_tokens()
}
