// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-scoped pseudonym assignment.

use std::collections::{BTreeMap, HashMap};

use crate::entity::EntityKind;

/// Pseudonym to original name.
pub type MacroMap = BTreeMap<String, String>;

/// Both directions of the session mapping plus one counter per entity kind.
///
/// A name keeps its pseudonym for the life of the session. Counters only grow
/// until [`MacroSession::clear`].
#[derive(Debug, Default)]
pub struct MacroSession {
    forward: MacroMap,
    reverse: HashMap<String, String>,
    persons: u32,
    organizations: u32,
}

impl MacroSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pseudonym for `name`, issuing the next one for `kind` if unseen.
    ///
    /// Lookup is by exact name, so the kind of an already-seen name is ignored.
    pub fn assign(&mut self, name: &str, kind: EntityKind) -> String {
        if let Some(existing) = self.reverse.get(name) {
            return existing.clone();
        }

        let counter = match kind {
            EntityKind::Person => &mut self.persons,
            EntityKind::Organization => &mut self.organizations,
        };
        *counter += 1;
        let token = format!("{}_{}", kind.macro_prefix(), counter);

        self.forward.insert(token.clone(), name.to_string());
        self.reverse.insert(name.to_string(), token.clone());
        token
    }

    /// Empty both directions and reset the counters.
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.persons = 0;
        self.organizations = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn forward(&self) -> &MacroMap {
        &self.forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_partitioned_by_kind() {
        let mut session = MacroSession::new();
        assert_eq!(session.assign("John Smith", EntityKind::Person), "PERSON_1");
        assert_eq!(session.assign("Acme", EntityKind::Organization), "ORG_1");
        assert_eq!(session.assign("Jane Doe", EntityKind::Person), "PERSON_2");
        assert_eq!(session.forward().len(), 3);
    }

    #[test]
    fn seen_name_keeps_its_token() {
        let mut session = MacroSession::new();
        let first = session.assign("John Smith", EntityKind::Person);
        assert_eq!(session.assign("John Smith", EntityKind::Person), first);
        assert_eq!(session.assign("Jane Doe", EntityKind::Person), "PERSON_2");
    }

    #[test]
    fn clear_restarts_numbering() {
        let mut session = MacroSession::new();
        session.assign("John Smith", EntityKind::Person);
        session.assign("Jane Doe", EntityKind::Person);
        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.assign("Jane Doe", EntityKind::Person), "PERSON_1");
    }
}
