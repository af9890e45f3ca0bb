//! The declarative layer of the weft toolchain: the alias trie that maps tag
//! names to canonical ids, the predicate library used as transition guards,
//! the blueprint combinator tree, its structural checks, and the compact
//! textual blueprint syntax.

pub mod alias;
pub mod blueprint;
pub mod checks;
pub mod compact;
pub mod predicate;
pub mod trie;

pub use alias::{AliasError, AliasTable, Interning, RedeclarePolicy};
pub use blueprint::{Blueprint, Report, Severity};
pub use checks::{check_blueprint, BlueprintError};
pub use compact::{BlueprintCompiler, BlueprintSourceError};
pub use predicate::Predicate;
pub use trie::Trie;
