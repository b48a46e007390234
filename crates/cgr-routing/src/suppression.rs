//! Suppression state shared by the searches of one enumeration run
//!
//! Enumeration strategies steer repeated searches by hiding contacts. A
//! contact can be hidden everywhere, or only as the successor of one specific
//! vertex (the next-hop suppression used by k-best spur searches).

use std::collections::{HashMap, HashSet};

use cgr_core::ContactId;

use crate::search::Vertex;

/// Contacts excluded from the searches of one enumeration run
#[derive(Debug, Clone, Default)]
pub struct Suppression {
    contacts: HashSet<ContactId>,
    next_hops: HashMap<Vertex, HashSet<ContactId>>,
}

impl Suppression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude a contact from every search
    pub fn suppress(&mut self, contact: ContactId) {
        self.contacts.insert(contact);
    }

    /// Make a globally suppressed contact available again
    pub fn release(&mut self, contact: ContactId) {
        self.contacts.remove(&contact);
    }

    /// Release every globally suppressed contact matching `predicate`
    pub fn release_where(&mut self, mut predicate: impl FnMut(ContactId) -> bool) {
        self.contacts.retain(|id| !predicate(*id));
    }

    pub fn is_suppressed(&self, contact: ContactId) -> bool {
        self.contacts.contains(&contact)
    }

    /// Exclude `contact` only when reached directly from `from`
    pub fn suppress_next_hop(&mut self, from: Vertex, contact: ContactId) {
        self.next_hops.entry(from).or_default().insert(contact);
    }

    pub fn is_next_hop_suppressed(&self, from: Vertex, contact: ContactId) -> bool {
        self.next_hops
            .get(&from)
            .is_some_and(|hops| hops.contains(&contact))
    }

    /// Number of globally suppressed contacts
    pub fn suppressed_count(&self) -> usize {
        self.contacts.len()
    }

    /// Drop every suppression
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.next_hops.clear();
    }
}
