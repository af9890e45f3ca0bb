//! Predicates: the closed set of value tests used as transition guards.

use regex::Regex;
use std::fmt;

/// A pure boolean test over a value, fixed at construction.
///
/// `Anything` is a unit variant and therefore a process-wide constant; share
/// it freely by value.
#[derive(Clone, Debug)]
pub enum Predicate<T> {
    /// Accept exactly this value.
    Only(T),
    /// Accept any member of the set.
    Any(Vec<T>),
    /// Accept everything.
    Anything,
    /// Accept values whose rendering matches the expression.
    Match(Regex),
}

impl<T: PartialEq + fmt::Display> Predicate<T> {
    /// Pure: no side effects, safe to call concurrently.
    pub fn validate(&self, value: &T) -> bool {
        match self {
            Predicate::Only(only) => only == value,
            Predicate::Any(set) => set.contains(value),
            Predicate::Anything => true,
            Predicate::Match(re) => re.is_match(&value.to_string()),
        }
    }
}

impl<T: PartialEq> Predicate<T> {
    /// Conservative: `true` whenever both predicates could admit a common
    /// value. `Match` is assumed to overlap everything, since regular
    /// expression intersection is not decided here.
    pub fn overlaps(&self, other: &Predicate<T>) -> bool {
        use Predicate::*;
        match (self, other) {
            (Anything, _) | (_, Anything) => true,
            (Match(_), _) | (_, Match(_)) => true,
            (Only(a), Only(b)) => a == b,
            (Only(a), Any(set)) | (Any(set), Only(a)) => set.contains(a),
            (Any(a), Any(b)) => a.iter().any(|x| b.contains(x)),
        }
    }
}

impl<T: PartialEq> PartialEq for Predicate<T> {
    fn eq(&self, other: &Predicate<T>) -> bool {
        use Predicate::*;
        match (self, other) {
            (Only(a), Only(b)) => a == b,
            (Any(a), Any(b)) => a == b,
            (Anything, Anything) => true,
            (Match(a), Match(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Only(only) => write!(f, "$only({})", only),
            Predicate::Any(set) => {
                f.write_str("$any(")?;
                for (i, value) in set.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str(")")
            }
            Predicate::Anything => f.write_str("$anything"),
            Predicate::Match(re) => write!(f, "$match({})", re.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_accepts_exactly_one_value() {
        let p = Predicate::Only(5);
        assert!(p.validate(&5));
        assert!(!p.validate(&6));
    }

    #[test]
    fn any_accepts_members_of_the_set() {
        let p = Predicate::Any(vec![1, 2, 3]);
        assert!(p.validate(&2));
        assert!(!p.validate(&9));
    }

    #[test]
    fn anything_accepts_everything() {
        let p: Predicate<u32> = Predicate::Anything;
        for x in [0, 1, 42, u32::MAX] {
            assert!(p.validate(&x));
        }
    }

    #[test]
    fn match_tests_the_rendering() {
        let p = Predicate::Match(Regex::new("ab+").unwrap());
        assert!(p.validate(&"abb".to_string()));
        assert!(!p.validate(&"ac".to_string()));
    }

    #[test]
    fn display_is_deterministic() {
        assert_eq!(Predicate::Only(5).to_string(), "$only(5)");
        assert_eq!(Predicate::Any(vec![1, 2, 3]).to_string(), "$any(1, 2, 3)");
        assert_eq!(Predicate::<u32>::Anything.to_string(), "$anything");
        assert_eq!(
            Predicate::<String>::Match(Regex::new("ab+").unwrap()).to_string(),
            "$match(ab+)"
        );
    }

    #[test]
    fn overlap_is_conservative() {
        assert!(Predicate::Only(1).overlaps(&Predicate::Anything));
        assert!(Predicate::Only(1).overlaps(&Predicate::Only(1)));
        assert!(!Predicate::Only(1).overlaps(&Predicate::Only(2)));
        assert!(Predicate::Only(2).overlaps(&Predicate::Any(vec![1, 2])));
        assert!(!Predicate::Any(vec![1, 2]).overlaps(&Predicate::Any(vec![3])));
        // regex overlap is not decided, so it is assumed
        let re = Predicate::<String>::Match(Regex::new("x").unwrap());
        assert!(re.overlaps(&Predicate::Only("y".to_string())));
    }
}
