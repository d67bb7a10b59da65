use std::collections::HashMap;

use crate::model::UserType;

/// A name registered more than once.
///
/// Unless [`Compiler::strict_names`](crate::Compiler::strict_names) is set, the later declaration
/// replaces the earlier one and the conflict is recorded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The fully-qualified name.
    pub name: String,
    /// The declaration that was registered first, possibly in an imported file.
    pub previous: UserType,
    /// The declaration that replaced it.
    pub current: UserType,
}

/// Maps the fully-qualified names declared in one file to their declarations.
#[derive(Debug, Default)]
pub(crate) struct SymbolTable {
    names: HashMap<String, UserType>,
    conflicts: Vec<Conflict>,
}

impl SymbolTable {
    pub fn get(&self, name: &str) -> Option<UserType> {
        self.names.get(name).copied()
    }

    pub fn insert(&mut self, name: String, ty: UserType) {
        self.names.insert(name, ty);
    }

    pub fn add_conflict(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }
}
