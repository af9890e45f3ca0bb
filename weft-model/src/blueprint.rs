//! The declarative structural pattern a document must satisfy, and the
//! severity/action vocabulary attached to matches.

use crate::predicate::Predicate;
use std::fmt;
use weft_syntax::TagId;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Verbose,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
            Severity::Verbose => "verbose",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic action attached to a blueprint position: emit this diagnostic
/// when the position is matched.
#[derive(Clone, PartialEq, Debug)]
pub struct Report {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

/// A tree of structural combinators. Leaves test single events; composites
/// are sequence, choice and repetition.
#[derive(Clone, PartialEq, Debug)]
pub enum Blueprint {
    /// Match the parts one after another.
    Sequence(Vec<Blueprint>),
    /// Match any one branch.
    Choice(Vec<Blueprint>),
    /// Match the body zero or more times.
    Repeat(Box<Blueprint>),
    /// An element whose tag satisfies the predicate. `None` content places
    /// no constraint on what the element contains; `Some` content must be
    /// matched exactly.
    Element(Predicate<TagId>, Option<Box<Blueprint>>),
    /// A single word event whose text satisfies the predicate.
    Word(Predicate<String>),
    /// A single whitespace event.
    Space,
    /// Match nothing; the vacuous pattern.
    Empty,
    /// The body, with a report emitted when it is matched.
    Flagged(Report, Box<Blueprint>),
}

impl Blueprint {
    /// `b?`: the body or nothing.
    pub fn optional(body: Blueprint) -> Blueprint {
        Blueprint::Choice(vec![body, Blueprint::Empty])
    }

    /// `b+`: the body at least once.
    pub fn one_or_more(body: Blueprint) -> Blueprint {
        Blueprint::Sequence(vec![body.clone(), Blueprint::Repeat(Box::new(body))])
    }

    /// An element with this exact tag and unconstrained content.
    pub fn element(tag: TagId) -> Blueprint {
        Blueprint::Element(Predicate::Only(tag), None)
    }

    /// Whether the pattern can match the empty event sequence.
    pub fn is_nullable(&self) -> bool {
        match self {
            Blueprint::Sequence(parts) => parts.iter().all(Blueprint::is_nullable),
            Blueprint::Choice(branches) => branches.iter().any(Blueprint::is_nullable),
            Blueprint::Repeat(_) | Blueprint::Empty => true,
            Blueprint::Element(_, _) | Blueprint::Word(_) | Blueprint::Space => false,
            Blueprint::Flagged(_, body) => body.is_nullable(),
        }
    }
}
