//! Structural sanity checking for blueprints.
//!
//! A blueprint must satisfy a small set of well-formedness rules before it
//! can be compiled into a query graph. This module implements those checks
//! as a pre-compilation pass over the combinator tree.

use crate::blueprint::Blueprint;
use crate::predicate::Predicate;
use std::fmt;

/// Element nesting deeper than this cannot be expressed in transition
/// levels and is rejected up front.
pub const MAX_ELEMENT_DEPTH: usize = 4096;

#[derive(Debug, PartialEq, Eq)]
pub enum BlueprintError {
    /// A `Choice` with no branches can never match.
    EmptyChoice,
    /// A `Sequence` with no parts; write `Empty` instead.
    EmptySequence,
    /// An `Any` predicate over the empty set can never admit a value.
    EmptyValueSet { place: &'static str },
    /// A `Repeat` whose body can match nothing would iterate without
    /// consuming events.
    VacuousRepeat,
    /// Elements nested beyond [`MAX_ELEMENT_DEPTH`].
    TooDeep { depth: usize },
}

impl fmt::Display for BlueprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlueprintError::EmptyChoice => f.write_str("choice with no branches"),
            BlueprintError::EmptySequence => f.write_str("sequence with no parts"),
            BlueprintError::EmptyValueSet { place } => {
                write!(f, "{} predicate admits the empty set of values", place)
            }
            BlueprintError::VacuousRepeat => {
                f.write_str("repetition body can match without consuming an event")
            }
            BlueprintError::TooDeep { depth } => {
                write!(f, "elements nested {} deep (limit {})", depth, MAX_ELEMENT_DEPTH)
            }
        }
    }
}

/// Check all structural rules on a blueprint tree.
///
/// Called before graph construction, on programmatic blueprints as well as
/// parsed ones.
pub fn check_blueprint(blueprint: &Blueprint) -> Result<(), BlueprintError> {
    check_node(blueprint, 0)
}

fn check_node(blueprint: &Blueprint, depth: usize) -> Result<(), BlueprintError> {
    match blueprint {
        Blueprint::Sequence(parts) => {
            if parts.is_empty() {
                return Err(BlueprintError::EmptySequence);
            }
            for part in parts {
                check_node(part, depth)?;
            }
            Ok(())
        }

        Blueprint::Choice(branches) => {
            if branches.is_empty() {
                return Err(BlueprintError::EmptyChoice);
            }
            for branch in branches {
                check_node(branch, depth)?;
            }
            Ok(())
        }

        Blueprint::Repeat(body) => {
            if body.is_nullable() {
                return Err(BlueprintError::VacuousRepeat);
            }
            check_node(body, depth)
        }

        Blueprint::Element(tag, content) => {
            if depth + 1 > MAX_ELEMENT_DEPTH {
                return Err(BlueprintError::TooDeep { depth: depth + 1 });
            }
            check_value_set(tag, "tag")?;
            match content {
                Some(inner) => check_node(inner, depth + 1),
                None => Ok(()),
            }
        }

        Blueprint::Word(text) => check_value_set(text, "word"),

        Blueprint::Space | Blueprint::Empty => Ok(()),

        Blueprint::Flagged(_, body) => check_node(body, depth),
    }
}

fn check_value_set<T>(predicate: &Predicate<T>, place: &'static str) -> Result<(), BlueprintError> {
    match predicate {
        Predicate::Any(set) if set.is_empty() => Err(BlueprintError::EmptyValueSet { place }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_syntax::TagId;

    #[test]
    fn plain_blueprints_pass() {
        let bp = Blueprint::Sequence(vec![
            Blueprint::element(TagId(1)),
            Blueprint::Repeat(Box::new(Blueprint::Word(Predicate::Anything))),
        ]);
        assert_eq!(check_blueprint(&bp), Ok(()));
        assert_eq!(check_blueprint(&Blueprint::Empty), Ok(()));
    }

    #[test]
    fn empty_composites_are_rejected() {
        assert_eq!(
            check_blueprint(&Blueprint::Choice(vec![])),
            Err(BlueprintError::EmptyChoice)
        );
        assert_eq!(
            check_blueprint(&Blueprint::Sequence(vec![])),
            Err(BlueprintError::EmptySequence)
        );
    }

    #[test]
    fn vacuous_repetition_is_rejected() {
        assert_eq!(
            check_blueprint(&Blueprint::Repeat(Box::new(Blueprint::Empty))),
            Err(BlueprintError::VacuousRepeat)
        );
        let nested = Blueprint::Repeat(Box::new(Blueprint::optional(Blueprint::Space)));
        assert_eq!(check_blueprint(&nested), Err(BlueprintError::VacuousRepeat));
        // a consuming body is fine
        let ok = Blueprint::Repeat(Box::new(Blueprint::Space));
        assert_eq!(check_blueprint(&ok), Ok(()));
    }

    #[test]
    fn empty_value_sets_are_rejected() {
        assert_eq!(
            check_blueprint(&Blueprint::Word(Predicate::Any(vec![]))),
            Err(BlueprintError::EmptyValueSet { place: "word" })
        );
        assert_eq!(
            check_blueprint(&Blueprint::Element(Predicate::Any(vec![]), None)),
            Err(BlueprintError::EmptyValueSet { place: "tag" })
        );
    }

    #[test]
    fn rules_apply_inside_element_content() {
        let bp = Blueprint::Element(
            Predicate::Only(TagId(1)),
            Some(Box::new(Blueprint::Repeat(Box::new(Blueprint::Empty)))),
        );
        assert_eq!(check_blueprint(&bp), Err(BlueprintError::VacuousRepeat));
    }
}
