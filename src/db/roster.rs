// SPDX-License-Identifier: MIT

//! Member roster repository.
//!
//! The roster is injected behind a trait so handlers never touch global
//! state and a database-backed implementation can replace the in-memory
//! one without changing any route code.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::models::Member;

/// List/insert contract for the member roster.
pub trait MemberRepository: Send + Sync {
    fn list(&self) -> Vec<Member>;
    fn find(&self, id: u32) -> Option<Member>;
    fn insert(&self, name: String, email: String, calendar_id: String) -> Member;
}

/// In-memory roster. Contents are lost on restart.
pub struct InMemoryRoster {
    members: RwLock<Vec<Member>>,
    next_id: AtomicU32,
}

impl InMemoryRoster {
    /// Empty roster.
    pub fn new() -> Self {
        Self {
            members: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Roster seeded with the team members whose calendars this deployment
    /// exposes.
    pub fn with_seed_members() -> Self {
        let roster = Self::new();
        for (name, email) in [
            ("Asha Patel", "asha.patel@example.com"),
            ("Diego Ruiz", "diego.ruiz@example.com"),
            ("Mei Chen", "mei.chen@example.com"),
            ("Tomasz Kowalski", "tomasz.kowalski@example.com"),
            ("Lena Fischer", "lena.fischer@example.com"),
        ] {
            roster.insert(name.to_string(), email.to_string(), email.to_string());
        }
        roster
    }
}

impl Default for InMemoryRoster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberRepository for InMemoryRoster {
    fn list(&self) -> Vec<Member> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn find(&self, id: u32) -> Option<Member> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    fn insert(&self, name: String, email: String, calendar_id: String) -> Member {
        // Ids stay strictly increasing even if removals are ever added.
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let member = Member {
            id,
            name,
            email,
            calendar_id,
        };

        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(member.clone());

        member
    }
}
