use std::fmt;
use std::rc::Rc;

/// Canonical numeric identifier for an element tag.
///
/// All structural comparison in the validator happens on `TagId` values;
/// textual tag names are resolved to ids exactly once, at the lexer boundary.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone, Debug)]
pub struct TagId(pub u32);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resolution of a textual tag name to its canonical id.
///
/// The lexer is generic over this seam so that callers choose the policy for
/// unknown names: a plain alias table rejects them, an interning wrapper
/// assigns fresh ids.
pub trait TagResolver {
    fn resolve_tag(&mut self, name: &str) -> Option<TagId>;
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum EventKind {
    Open(TagId),
    Close(TagId),
    Word(String),
    Space(String),
}

/// One parsed unit of a document. Created once by the producer, immutable and
/// shared as `Rc<Event>` thereafter.
#[derive(Clone, Debug)]
pub struct Event {
    kind: EventKind,
    span: codemap::Span,
}

impl Event {
    pub fn open(tag: TagId, span: codemap::Span) -> Event {
        Event {
            kind: EventKind::Open(tag),
            span,
        }
    }
    pub fn close(tag: TagId, span: codemap::Span) -> Event {
        Event {
            kind: EventKind::Close(tag),
            span,
        }
    }
    pub fn word<S: Into<String>>(text: S, span: codemap::Span) -> Event {
        Event {
            kind: EventKind::Word(text.into()),
            span,
        }
    }
    pub fn space<S: Into<String>>(text: S, span: codemap::Span) -> Event {
        Event {
            kind: EventKind::Space(text.into()),
            span,
        }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn span(&self) -> codemap::Span {
        self.span
    }

    /// The tag for element events, absent for word/whitespace.
    pub fn tag(&self) -> Option<TagId> {
        match self.kind {
            EventKind::Open(tag) | EventKind::Close(tag) => Some(tag),
            EventKind::Word(_) | EventKind::Space(_) => None,
        }
    }

    /// The raw text for word/whitespace events, absent for element events.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Word(text) | EventKind::Space(text) => Some(text),
            EventKind::Open(_) | EventKind::Close(_) => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self.kind {
            EventKind::Open(_) => "element-start",
            EventKind::Close(_) => "element-end",
            EventKind::Word(_) => "word",
            EventKind::Space(_) => "whitespace",
        }
    }
}

/// The chain of currently-open ancestor elements, outermost first.
///
/// Append-only while elements open; an entry is popped only by the matching
/// element-end. `get(i)` is always a structural ancestor of `get(i + 1)`.
#[derive(Clone, Debug, Default)]
pub struct Path {
    events: Vec<Rc<Event>>,
}

impl Path {
    pub fn new() -> Path {
        Path { events: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&Rc<Event>> {
        self.events.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rc<Event>> {
        self.events.iter()
    }

    /// Push an element-start event. Panics on any other kind: the caller owns
    /// the event-dispatch order and pushing a non-open event is a bug there.
    pub fn push_open(&mut self, event: Rc<Event>) {
        match event.kind() {
            EventKind::Open(_) => self.events.push(event),
            _ => panic!("only element-start events may be pushed onto a path"),
        }
    }

    /// Pop the innermost open element if it carries `tag`; an unmatched close
    /// leaves the path untouched and returns `None`.
    pub fn pop_close(&mut self, tag: TagId) -> Option<Rc<Event>> {
        match self.events.last() {
            Some(event) if event.tag() == Some(tag) => self.events.pop(),
            _ => None,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.events.is_empty() {
            return f.write_str("/");
        }
        for event in &self.events {
            match event.tag() {
                Some(tag) => write!(f, "/{}", tag)?,
                None => f.write_str("/?")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> codemap::Span {
        let mut map = codemap::CodeMap::new();
        let file = map.add_file("test.wml".to_string(), "{a}".to_string());
        file.span
    }

    #[test]
    fn event_accessors() {
        let open = Event::open(TagId(3), span());
        assert_eq!(open.tag(), Some(TagId(3)));
        assert_eq!(open.text(), None);
        assert_eq!(open.describe(), "element-start");

        let word = Event::word("hi", span());
        assert_eq!(word.tag(), None);
        assert_eq!(word.text(), Some("hi"));
    }

    #[test]
    fn path_pops_only_matching_close() {
        let mut path = Path::new();
        path.push_open(Rc::new(Event::open(TagId(1), span())));
        path.push_open(Rc::new(Event::open(TagId(2), span())));
        assert_eq!(path.depth(), 2);

        assert!(path.pop_close(TagId(1)).is_none());
        assert_eq!(path.depth(), 2);

        assert!(path.pop_close(TagId(2)).is_some());
        assert!(path.pop_close(TagId(1)).is_some());
        assert!(path.is_empty());
    }

    #[test]
    fn path_display() {
        let mut path = Path::new();
        assert_eq!(path.to_string(), "/");
        path.push_open(Rc::new(Event::open(TagId(1), span())));
        path.push_open(Rc::new(Event::open(TagId(7), span())));
        assert_eq!(path.to_string(), "/#1/#7");
    }

    #[test]
    #[should_panic(expected = "element-start")]
    fn path_rejects_non_open() {
        let mut path = Path::new();
        path.push_open(Rc::new(Event::word("w", span())));
    }
}
