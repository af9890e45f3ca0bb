//! Alias table: textual tag names resolved to canonical [`TagId`]s through a
//! symbol trie keyed by character codes.

use crate::trie::Trie;
use std::collections::HashMap;
use std::fmt;
use weft_syntax::{TagId, TagResolver};

/// What `declare` does when an alias is already mapped to a different id.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RedeclarePolicy {
    /// The new mapping replaces the old one.
    LastWins,
    /// Conflicting redeclaration is an error.
    Forbid,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AliasError {
    Conflict {
        alias: String,
        existing: TagId,
        attempted: TagId,
    },
}

impl fmt::Display for AliasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasError::Conflict {
                alias,
                existing,
                attempted,
            } => write!(
                f,
                "alias {:?} already declared as {}, cannot redeclare as {}",
                alias, existing, attempted
            ),
        }
    }
}

/// Maps alias strings to canonical tag identifiers.
///
/// `resolve` is the hot path (called once per element the lexer sees);
/// `declare` happens during bootstrap, before or interleaved with lexing.
pub struct AliasTable {
    root: Trie<TagId>,
    names: HashMap<TagId, String>,
    policy: RedeclarePolicy,
    next_id: u32,
}

impl Default for AliasTable {
    fn default() -> AliasTable {
        AliasTable::new()
    }
}

impl AliasTable {
    pub fn new() -> AliasTable {
        AliasTable::with_policy(RedeclarePolicy::LastWins)
    }

    pub fn with_policy(policy: RedeclarePolicy) -> AliasTable {
        AliasTable {
            root: Trie::new(),
            names: HashMap::new(),
            policy,
            next_id: 0,
        }
    }

    fn key(alias: &str) -> Vec<u32> {
        alias.chars().map(|c| c as u32).collect()
    }

    /// Map `alias` to `tag`. Returns the displaced id when the alias was
    /// already mapped, subject to the table's [`RedeclarePolicy`].
    pub fn declare(&mut self, alias: &str, tag: TagId) -> Result<Option<TagId>, AliasError> {
        let key = Self::key(alias);
        if self.policy == RedeclarePolicy::Forbid {
            if let Some(&existing) = self.root.resolve(&key) {
                if existing != tag {
                    return Err(AliasError::Conflict {
                        alias: alias.to_string(),
                        existing,
                        attempted: tag,
                    });
                }
            }
        }
        self.names.insert(tag, alias.to_string());
        self.next_id = self.next_id.max(tag.0.saturating_add(1));
        Ok(self.root.declare(&key, tag))
    }

    /// The id mapped to `alias`, or absent. Absence is not an error of this
    /// table; the caller decides whether an unknown name is fatal.
    pub fn resolve(&self, alias: &str) -> Option<TagId> {
        self.root.resolve(&Self::key(alias)).copied()
    }

    /// Resolve `alias`, declaring it with the next fresh id when unknown.
    pub fn intern(&mut self, alias: &str) -> TagId {
        if let Some(tag) = self.resolve(alias) {
            return tag;
        }
        let tag = TagId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.root.declare(&Self::key(alias), tag);
        self.names.insert(tag, alias.to_string());
        tag
    }

    /// Remove the mapping for `alias`, returning the id it carried.
    pub fn undeclare(&mut self, alias: &str) -> Option<TagId> {
        let tag = self.root.delete(&Self::key(alias))?;
        if self.names.get(&tag).map(String::as_str) == Some(alias) {
            self.names.remove(&tag);
        }
        Some(tag)
    }

    /// The alias most recently declared for `tag`, for human-readable output.
    pub fn name_of(&self, tag: TagId) -> Option<&str> {
        self.names.get(&tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl TagResolver for AliasTable {
    /// Strict resolution: unknown names stay unknown.
    fn resolve_tag(&mut self, name: &str) -> Option<TagId> {
        self.resolve(name)
    }
}

/// Resolver wrapper that assigns fresh ids to unknown names instead of
/// rejecting them.
pub struct Interning<'a>(pub &'a mut AliasTable);

impl<'a> TagResolver for Interning<'a> {
    fn resolve_tag(&mut self, name: &str) -> Option<TagId> {
        Some(self.0.intern(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn declare_then_resolve() {
        let mut table = AliasTable::new();
        table.declare("para", TagId(1)).unwrap();
        table.declare("p", TagId(1)).unwrap();
        table.declare("doc", TagId(2)).unwrap();
        assert_eq!(table.resolve("para"), Some(TagId(1)));
        assert_eq!(table.resolve("p"), Some(TagId(1)));
        assert_eq!(table.resolve("doc"), Some(TagId(2)));
        assert_eq!(table.resolve("par"), None);
        assert_eq!(table.resolve("paragraph"), None);
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut table = AliasTable::new();
        table.declare("doc", TagId(7)).unwrap();
        assert_eq!(table.resolve("doc"), table.resolve("doc"));
    }

    #[test]
    fn last_wins_overwrites() {
        let mut table = AliasTable::new();
        table.declare("x", TagId(1)).unwrap();
        assert_eq!(table.declare("x", TagId(2)), Ok(Some(TagId(1))));
        assert_eq!(table.resolve("x"), Some(TagId(2)));
    }

    #[test]
    fn forbid_rejects_conflicts() {
        let mut table = AliasTable::with_policy(RedeclarePolicy::Forbid);
        table.declare("x", TagId(1)).unwrap();
        // re-declaring the same mapping is not a conflict
        assert_eq!(table.declare("x", TagId(1)), Ok(Some(TagId(1))));
        assert_matches!(
            table.declare("x", TagId(2)),
            Err(AliasError::Conflict {
                existing: TagId(1),
                attempted: TagId(2),
                ..
            })
        );
        assert_eq!(table.resolve("x"), Some(TagId(1)));
    }

    #[test]
    fn intern_assigns_fresh_ids_past_declarations() {
        let mut table = AliasTable::new();
        table.declare("a", TagId(10)).unwrap();
        let b = table.intern("b");
        assert!(b.0 > 10);
        assert_eq!(table.intern("b"), b);
        assert_eq!(table.intern("a"), TagId(10));
    }

    #[test]
    fn undeclare_removes_only_its_alias() {
        let mut table = AliasTable::new();
        table.declare("para", TagId(1)).unwrap();
        table.declare("part", TagId(2)).unwrap();
        assert_eq!(table.undeclare("para"), Some(TagId(1)));
        assert_eq!(table.resolve("para"), None);
        assert_eq!(table.resolve("part"), Some(TagId(2)));
        assert_eq!(table.undeclare("para"), None);
    }

    #[test]
    fn name_of_reverse_lookup() {
        let mut table = AliasTable::new();
        table.declare("doc", TagId(3)).unwrap();
        assert_eq!(table.name_of(TagId(3)), Some("doc"));
        assert_eq!(table.name_of(TagId(4)), None);
    }
}
