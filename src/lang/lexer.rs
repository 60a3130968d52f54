//! Default comment-block extractor.
//!
//! Adjacent single-line comments sharing a prefix merge into one block keyed
//! by the first line. Multi-line comments always form their own block, even
//! when two of them touch. String literals are skipped.

use std::path::Path;

use tracing::trace;

use crate::lang::{BlockRule, Language};
use crate::locale::MessageKey;
use crate::message::ErrorRecord;
use crate::traits::{BlockExtractor, BlockMap, ExtractOutcome};

/// [`BlockExtractor`] driven by a language's [`BlockRule`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentLexer;

impl BlockExtractor for CommentLexer {
    fn extract(&self, path: &Path, data: &[u8], language: &Language) -> ExtractOutcome {
        let mut scan = Scan::new(data);
        let mut outcome = ExtractOutcome::default();

        if let Err(line) = scan.run(&language.rules) {
            outcome.errors.push(ErrorRecord::new(
                path.display().to_string(),
                "",
                line,
                MessageKey::NotFoundEndFlag,
            ));
        }
        scan.flush();

        trace!(path = %path.display(), blocks = scan.blocks.len(), "Lexed file");
        outcome.blocks = scan.blocks;
        outcome
    }
}

/// Run of single-line comments being merged.
struct LineGroup {
    prefix: &'static str,
    first: usize,
    last: usize,
    data: Vec<u8>,
}

struct Scan<'a> {
    data: &'a [u8],
    pos: usize,
    line: usize,
    group: Option<LineGroup>,
    blocks: BlockMap,
}

impl<'a> Scan<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            line: 1,
            group: None,
            blocks: BlockMap::new(),
        }
    }

    /// Scans to the end of input. On an unterminated construct, returns the
    /// line it started on.
    fn run(&mut self, rules: &[BlockRule]) -> Result<(), usize> {
        let data = self.data;
        while self.pos < data.len() {
            let rest = &data[self.pos..];
            let matched = rules.iter().find(|rule| rest.starts_with(opener(rule)));

            match matched {
                Some(BlockRule::String { delimiter, escape }) => {
                    self.flush();
                    self.skip_string(delimiter.as_bytes(), *escape)?;
                }
                Some(BlockRule::Char { quote, escape }) => {
                    self.flush();
                    self.char_literal(quote.as_bytes(), *escape);
                }
                Some(BlockRule::Line { prefix }) => self.line_comment(*prefix),
                Some(BlockRule::Block { begin, end }) => {
                    self.flush();
                    self.block_comment(begin.as_bytes(), end.as_bytes())?;
                }
                None => {
                    match rest[0] {
                        b'\n' => self.line += 1,
                        b' ' | b'\t' | b'\r' | 0x0b | 0x0c => {}
                        _ => self.flush(),
                    }
                    self.pos += 1;
                }
            }
        }
        Ok(())
    }

    fn skip_string(&mut self, delimiter: &[u8], escape: Option<char>) -> Result<(), usize> {
        let start = self.line;
        let escape = escape.and_then(|c| u8::try_from(c).ok());
        let data = self.data;
        self.pos += delimiter.len();

        while self.pos < data.len() {
            let rest = &data[self.pos..];
            if rest.starts_with(delimiter) {
                self.pos += delimiter.len();
                return Ok(());
            }
            if Some(rest[0]) == escape {
                self.pos += 1;
                if data.get(self.pos) == Some(&b'\n') {
                    self.line += 1;
                }
            } else if rest[0] == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
        Err(start)
    }

    /// Skips a character literal, or just the quote when no literal closes
    /// on the same line.
    fn char_literal(&mut self, quote: &[u8], escape: Option<char>) {
        let data = self.data;
        let escape = escape.and_then(|c| u8::try_from(c).ok());
        let start = self.pos + quote.len();
        let closes_at = |i: usize| data.get(i..).is_some_and(|rest| rest.starts_with(quote));

        let close = match data.get(start) {
            Some(&b) if Some(b) == escape => {
                let mut i = start + 2;
                while i < data.len() && data[i] != b'\n' && !closes_at(i) {
                    i += 1;
                }
                Some(i).filter(|&i| closes_at(i))
            }
            Some(&b) if b != b'\n' => Some(start + utf8_len(b)).filter(|&i| closes_at(i)),
            _ => None,
        };

        self.pos = close.unwrap_or(self.pos) + quote.len();
    }

    fn line_comment(&mut self, prefix: &'static str) {
        let data = self.data;
        let body_start = self.pos + prefix.len();
        let body_end = data[body_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |i| body_start + i);
        let body = trim_cr(&data[body_start..body_end]);

        match &mut self.group {
            Some(group) if group.prefix == prefix && group.last + 1 == self.line => {
                group.data.push(b'\n');
                group.data.extend_from_slice(body);
                group.last = self.line;
            }
            _ => {
                self.flush();
                self.group = Some(LineGroup {
                    prefix,
                    first: self.line,
                    last: self.line,
                    data: body.to_vec(),
                });
            }
        }
        // The newline itself is consumed by the main loop.
        self.pos = body_end;
    }

    fn block_comment(&mut self, begin: &[u8], end: &[u8]) -> Result<(), usize> {
        let data = self.data;
        let start = self.line;
        let body_start = self.pos + begin.len();
        let body_len = data[body_start..]
            .windows(end.len())
            .position(|w| w == end)
            .ok_or(start)?;
        let body = &data[body_start..body_start + body_len];

        self.line += body.iter().filter(|&&b| b == b'\n').count();
        self.line += begin.iter().chain(end).filter(|&&b| b == b'\n').count();
        self.pos = body_start + body_len + end.len();
        self.insert(start, body.to_vec());
        Ok(())
    }

    fn flush(&mut self) {
        if let Some(group) = self.group.take() {
            self.insert(group.first, group.data);
        }
    }

    fn insert(&mut self, line: usize, data: Vec<u8>) {
        match self.blocks.get_mut(&line) {
            Some(existing) => {
                existing.push(b'\n');
                existing.extend_from_slice(&data);
            }
            None => {
                self.blocks.insert(line, data);
            }
        }
    }
}

fn opener(rule: &BlockRule) -> &[u8] {
    match rule {
        BlockRule::String { delimiter, .. } => delimiter.as_bytes(),
        BlockRule::Char { quote, .. } => quote.as_bytes(),
        BlockRule::Line { prefix } => prefix.as_bytes(),
        BlockRule::Block { begin, .. } => begin.as_bytes(),
    }
}

fn utf8_len(lead: u8) -> usize {
    match lead.leading_ones() {
        n @ 2..=4 => n as usize,
        _ => 1,
    }
}

fn trim_cr(body: &[u8]) -> &[u8] {
    body.strip_suffix(b"\r").unwrap_or(body)
}
