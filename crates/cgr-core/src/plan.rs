//! Contact plan - the arena that owns every contact of the schedule
//!
//! Contacts are addressed by [`ContactId`], their position in the plan. Ids are
//! stable for the lifetime of the plan since contacts are never removed.

use std::collections::{BTreeSet, HashMap};
use std::ops::Index;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::contact::{Contact, ContactId, NodeId, Priority, Time, Volume};
use crate::error::{PlanError, PlanResult};

/// The complete known schedule, treated as a time-expanded routing graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Contact>", into = "Vec<Contact>")]
pub struct ContactPlan {
    contacts: Vec<Contact>,
    /// Contacts grouped by transmitting node, in plan order
    departures: HashMap<NodeId, Vec<ContactId>>,
}

impl ContactPlan {
    /// Create an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan from contacts, validating each one
    pub fn from_contacts(contacts: impl IntoIterator<Item = Contact>) -> PlanResult<Self> {
        let mut plan = Self::new();
        for contact in contacts {
            plan.push(contact)?;
        }
        Ok(plan)
    }

    /// Add a contact and return its id
    pub fn push(&mut self, contact: Contact) -> PlanResult<ContactId> {
        contact.validate()?;
        let id = ContactId(self.contacts.len());
        self.departures.entry(contact.frm).or_default().push(id);
        self.contacts.push(contact);
        Ok(id)
    }

    /// Generate a random plan for tests and benchmarks
    ///
    /// Contacts start in [0, 999], last 1 to 100 time units and connect two
    /// distinct nodes in [1, max_nodes] with unit rate and unit light time.
    ///
    /// # Panics
    ///
    /// Panics if `max_nodes < 2`, since no contact could have distinct endpoints.
    pub fn random<R: Rng + ?Sized>(max_contacts: usize, max_nodes: NodeId, rng: &mut R) -> Self {
        assert!(max_nodes >= 2, "a random plan needs at least two nodes");

        let mut plan = Self::new();
        for _ in 0..max_contacts {
            let start: Time = rng.random_range(0..=999);
            let duration: Time = rng.random_range(1..=100);
            let frm = rng.random_range(1..=max_nodes);
            let mut to = rng.random_range(1..=max_nodes);
            while to == frm {
                to = rng.random_range(1..=max_nodes);
            }
            let contact = Contact::new(frm, to, start, start + duration, 1).with_owlt(1);
            let id = ContactId(plan.contacts.len());
            plan.departures.entry(frm).or_default().push(id);
            plan.contacts.push(contact);
        }
        plan
    }

    /// Number of contacts
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether the plan has no contacts
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Look up a contact
    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.get(id.index())
    }

    /// All contacts with their ids, in plan order
    pub fn iter(&self) -> impl Iterator<Item = (ContactId, &Contact)> {
        self.contacts
            .iter()
            .enumerate()
            .map(|(index, contact)| (ContactId(index), contact))
    }

    /// All contact ids, in plan order
    pub fn ids(&self) -> impl Iterator<Item = ContactId> + use<> {
        (0..self.contacts.len()).map(ContactId)
    }

    /// Contacts transmitted by `node`, in plan order
    pub fn departing(&self, node: NodeId) -> &[ContactId] {
        self.departures.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every node that appears as either endpoint
    pub fn nodes(&self) -> BTreeSet<NodeId> {
        self.contacts
            .iter()
            .flat_map(|contact| [contact.frm, contact.to])
            .collect()
    }

    /// Whether `node` appears in any contact
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.departures.contains_key(&node) || self.contacts.iter().any(|c| c.to == node)
    }

    /// Contacts whose window is open at `time`
    pub fn active_at(&self, time: Time) -> impl Iterator<Item = (ContactId, &Contact)> {
        self.iter().filter(move |(_, contact)| contact.is_active_at(time))
    }

    /// Take `volume` out of one priority tier on every listed contact
    ///
    /// Every id is checked before any capacity changes, so an unknown id
    /// leaves the plan untouched.
    pub fn consume(
        &mut self,
        hops: impl IntoIterator<Item = ContactId>,
        priority: Priority,
        volume: Volume,
    ) -> PlanResult<()> {
        if volume < 0 {
            return Err(PlanError::NegativeVolume(volume));
        }
        let hops: Vec<ContactId> = hops.into_iter().collect();
        if let Some(unknown) = hops.iter().find(|id| id.index() >= self.contacts.len()) {
            return Err(PlanError::UnknownContact(*unknown));
        }
        for id in hops {
            self.contacts[id.index()].consume(priority, volume);
        }
        Ok(())
    }

    /// Restore every contact to its full volume
    pub fn reset_capacity(&mut self) {
        for contact in &mut self.contacts {
            contact.reset_capacity();
        }
    }
}

impl Index<ContactId> for ContactPlan {
    type Output = Contact;

    /// # Panics
    ///
    /// Panics if `id` was not issued by this plan.
    fn index(&self, id: ContactId) -> &Contact {
        &self.contacts[id.index()]
    }
}

impl TryFrom<Vec<Contact>> for ContactPlan {
    type Error = PlanError;

    fn try_from(contacts: Vec<Contact>) -> PlanResult<Self> {
        Self::from_contacts(contacts)
    }
}

impl From<ContactPlan> for Vec<Contact> {
    fn from(plan: ContactPlan) -> Self {
        plan.contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_plan() -> ContactPlan {
        ContactPlan::from_contacts([
            Contact::new(1, 2, 0, 100, 10),
            Contact::new(2, 3, 10, 100, 10),
            Contact::new(1, 3, 50, 60, 10),
        ])
        .unwrap()
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let plan = sample_plan();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[ContactId(1)].frm, 2);
        assert!(plan.get(ContactId(3)).is_none());
        assert_eq!(plan.ids().collect::<Vec<_>>().len(), 3);
    }

    #[test]
    fn test_departing_index() {
        let plan = sample_plan();
        assert_eq!(plan.departing(1), &[ContactId(0), ContactId(2)]);
        assert_eq!(plan.departing(2), &[ContactId(1)]);
        assert!(plan.departing(3).is_empty());
    }

    #[test]
    fn test_nodes_and_activity() {
        let plan = sample_plan();
        assert_eq!(plan.nodes().into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(plan.contains_node(3));
        assert!(!plan.contains_node(4));

        let active: Vec<ContactId> = plan.active_at(5).map(|(id, _)| id).collect();
        assert_eq!(active, vec![ContactId(0)]);
    }

    #[test]
    fn test_push_rejects_invalid_contact() {
        let mut plan = ContactPlan::new();
        let result = plan.push(Contact::new(1, 2, 10, 5, 1));
        assert!(matches!(result, Err(PlanError::InvalidWindow { .. })));
        assert!(plan.is_empty());
        assert!(plan.departing(1).is_empty());
    }

    #[test]
    fn test_consume_is_all_or_nothing() {
        let mut plan = sample_plan();
        let result = plan.consume([ContactId(0), ContactId(9)], Priority::Normal, 10);
        assert_eq!(result, Err(PlanError::UnknownContact(ContactId(9))));
        assert_eq!(plan[ContactId(0)].mav(Priority::Normal), 1000);

        plan.consume([ContactId(0), ContactId(1)], Priority::Normal, 10)
            .unwrap();
        assert_eq!(plan[ContactId(0)].mav(Priority::Normal), 990);
        assert_eq!(plan[ContactId(1)].mav(Priority::Normal), 890);
        assert_eq!(plan[ContactId(1)].mav(Priority::Bulk), 900);

        plan.reset_capacity();
        assert_eq!(plan[ContactId(1)].mav(Priority::Normal), 900);
    }

    #[test]
    fn test_consume_rejects_negative_volume() {
        let mut plan = sample_plan();
        plan.consume([ContactId(0)], Priority::Normal, 100).unwrap();

        let result = plan.consume([ContactId(0)], Priority::Normal, -500);
        assert_eq!(result, Err(PlanError::NegativeVolume(-500)));
        assert_eq!(plan[ContactId(0)].mav(Priority::Normal), 900);
        assert!(plan[ContactId(0)].mav(Priority::Normal) <= plan[ContactId(0)].volume());
    }

    #[test]
    fn test_deserialized_plan_starts_at_full_capacity() {
        let json = r#"[
            {"frm":1,"to":2,"start":0,"end":10,"rate":10,"volume":1,"mav":[900,900,900]},
            {"frm":2,"to":3,"start":5,"end":20,"rate":2,"owlt":1}
        ]"#;
        let plan: ContactPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[ContactId(0)].volume(), 100);
        assert_eq!(plan[ContactId(0)].mav(Priority::Expedited), 100);
        assert_eq!(plan.departing(2), &[ContactId(1)]);

        let invalid = r#"[{"frm":1,"to":1,"start":0,"end":10,"rate":10}]"#;
        assert!(serde_json::from_str::<ContactPlan>(invalid).is_err());
    }

    #[test]
    fn test_random_plan_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let plan = ContactPlan::random(200, 10, &mut rng);
        assert_eq!(plan.len(), 200);
        for (_, contact) in plan.iter() {
            assert!(contact.validate().is_ok());
            assert!((0..=999).contains(&contact.start));
            assert!((1..=100).contains(&(contact.end - contact.start)));
            assert!((1..=10).contains(&contact.frm));
            assert!((1..=10).contains(&contact.to));
            assert_eq!(contact.owlt, 1);
        }
    }

    #[test]
    fn test_random_plan_is_reproducible() {
        let a = ContactPlan::random(50, 5, &mut StdRng::seed_from_u64(42));
        let b = ContactPlan::random(50, 5, &mut StdRng::seed_from_u64(42));
        let a: Vec<Contact> = a.into();
        let b: Vec<Contact> = b.into();
        assert_eq!(a, b);
    }
}
