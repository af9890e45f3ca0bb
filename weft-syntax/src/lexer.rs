use crate::types::{Event, TagId, TagResolver};
use std::fmt;

/// Producer-side failures. These are reported out-of-band from validation:
/// a lexer error means the event stream itself is broken, not that a
/// well-formed document failed its blueprint.
#[derive(Debug)]
pub enum LexError {
    UnknownTag {
        name: String,
        span: codemap::Span,
    },
    EmptyElementName {
        span: codemap::Span,
    },
    /// A `}` with no element open.
    UnbalancedClose {
        span: codemap::Span,
    },
    /// Input ended while elements were still open; the span points at the
    /// innermost unclosed `{`.
    UnterminatedElement {
        span: codemap::Span,
    },
}

impl LexError {
    pub fn span(&self) -> codemap::Span {
        match self {
            LexError::UnknownTag { span, .. }
            | LexError::EmptyElementName { span }
            | LexError::UnbalancedClose { span }
            | LexError::UnterminatedElement { span } => *span,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnknownTag { name, .. } => write!(f, "unknown tag name {:?}", name),
            LexError::EmptyElementName { .. } => f.write_str("element name is empty"),
            LexError::UnbalancedClose { .. } => f.write_str("'}' with no open element"),
            LexError::UnterminatedElement { .. } => f.write_str("element is never closed"),
        }
    }
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && c != '{' && c != '}'
}

/// Streaming lexer for weft documents.
///
/// `{name` opens an element, `}` closes the innermost one, whitespace runs
/// become whitespace events and every other run of characters is a word.
/// The whitespace run immediately after an element name is the
/// name/content separator and produces no event. Tag names pass through
/// the [`TagResolver`] seam, which is the single point where text becomes
/// a canonical [`TagId`].
///
/// Iteration stops after the first error.
pub struct Lexer<'a, R: TagResolver> {
    src: &'a str,
    base: codemap::Span,
    offset: usize,
    open: Vec<(TagId, usize)>,
    resolver: &'a mut R,
    failed: bool,
}

impl<'a, R: TagResolver> Lexer<'a, R> {
    pub fn new(file: &'a codemap::File, resolver: &'a mut R) -> Lexer<'a, R> {
        Lexer {
            src: file.source(),
            base: file.span,
            offset: 0,
            open: Vec::new(),
            resolver,
            failed: false,
        }
    }

    fn span(&self, start: usize, end: usize) -> codemap::Span {
        self.base.subspan(start as u64, end as u64)
    }

    fn fail(&mut self, err: LexError) -> Option<Result<Event, LexError>> {
        self.failed = true;
        Some(Err(err))
    }

    /// Length of the run starting at `self.offset` whose chars satisfy `pred`.
    fn run(&self, pred: fn(char) -> bool) -> usize {
        self.src[self.offset..]
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map(|(i, _)| i)
            .unwrap_or_else(|| self.src.len() - self.offset)
    }
}

impl<'a, R: TagResolver> Iterator for Lexer<'a, R> {
    type Item = Result<Event, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let start = self.offset;
        let mut chars = self.src[start..].chars();
        let c = match chars.next() {
            Some(c) => c,
            None => {
                // end of input: every element must have been closed
                return match self.open.pop() {
                    Some((_, at)) => {
                        let span = self.span(at, at + 1);
                        self.fail(LexError::UnterminatedElement { span })
                    }
                    None => None,
                };
            }
        };
        if c == '{' {
            self.offset += 1;
            let len = self.run(is_name_char);
            if len == 0 {
                let span = self.span(start, start + 1);
                return self.fail(LexError::EmptyElementName { span });
            }
            let name = &self.src[self.offset..self.offset + len];
            self.offset += len;
            let span = self.span(start, self.offset);
            // the separator between name and content is not content
            self.offset += self.run(char::is_whitespace);
            match self.resolver.resolve_tag(name) {
                Some(tag) => {
                    self.open.push((tag, start));
                    Some(Ok(Event::open(tag, span)))
                }
                None => self.fail(LexError::UnknownTag {
                    name: name.to_string(),
                    span,
                }),
            }
        } else if c == '}' {
            self.offset += 1;
            let span = self.span(start, self.offset);
            match self.open.pop() {
                Some((tag, _)) => Some(Ok(Event::close(tag, span))),
                None => self.fail(LexError::UnbalancedClose { span }),
            }
        } else if c.is_whitespace() {
            let len = self.run(char::is_whitespace);
            let text = &self.src[start..start + len];
            self.offset += len;
            Some(Ok(Event::space(text, self.span(start, self.offset))))
        } else {
            let len = self.run(is_name_char);
            let text = &self.src[start..start + len];
            self.offset += len;
            Some(Ok(Event::word(text, self.span(start, self.offset))))
        }
    }
}
