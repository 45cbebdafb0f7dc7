//! Normalizes raw child output into plain text.

use vte::{Params, Parser, Perform};

/// Converts raw Vivado output bytes into plain UTF-8 text.
///
/// Vivado is normally run through pipes and prints plain text, but the
/// Windows `vivado.bat` wrapper emits CRLF line endings and some TCL
/// packages colorize their messages. Both would defeat marker search and
/// line filtering.
pub struct OutputSanitizer;

impl OutputSanitizer {
    /// Strip escape sequences and carriage returns from raw bytes.
    pub fn to_text(input: &[u8]) -> String {
        let mut extractor = PlainText::default();
        let mut parser = Parser::new();

        parser.advance(&mut extractor, input);

        extractor.finish()
    }

    /// Same as [`to_text`](Self::to_text), for already-decoded text.
    pub fn to_text_str(input: &str) -> String {
        Self::to_text(input.as_bytes())
    }
}

/// Incremental form of [`OutputSanitizer`] for chunked reads.
///
/// The parser state survives between chunks, so multi-byte characters and
/// escape sequences split across reads decode correctly.
pub struct TextAccumulator {
    parser: Parser,
    text: PlainText,
}

impl TextAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            text: PlainText::default(),
        }
    }

    /// Feed one chunk of raw bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.parser.advance(&mut self.text, chunk);
    }

    /// Text decoded so far.
    pub fn as_str(&self) -> &str {
        &self.text.text
    }

    /// Consume the accumulator, returning the decoded text.
    pub fn into_text(self) -> String {
        self.text.finish()
    }
}

impl Default for TextAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct PlainText {
    text: String,
}

impl PlainText {
    fn finish(self) -> String {
        self.text
    }
}

impl Perform for PlainText {
    fn print(&mut self, c: char) {
        self.text.push(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => self.text.push('\n'),
            b'\t' => self.text.push('\t'),
            // \r only ever precedes \n or redraws a line; drop it.
            _ => {}
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
