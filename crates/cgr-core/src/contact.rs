//! Contacts - scheduled, directed, capacity-limited transmission opportunities
//!
//! A [`Contact`] is one edge of the time-expanded routing graph. Its schedule
//! (`frm`, `to`, `start`, `end`, `rate`, `owlt`, `confidence`) is fixed once the
//! plan is loaded; the only mutable part is the per-priority available volume
//! (`mav`), which shrinks as bundles are committed to routes through it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

/// Node identifier (CBHE node number)
pub type NodeId = u64;

/// Time in plan units (seconds relative to the plan epoch)
pub type Time = i64;

/// Data volume in plan units (bytes)
pub type Volume = i64;

/// Sentinel for an unbounded contact end or an unreached arrival
pub const INFINITE_TIME: Time = Time::MAX;

/// Number of priority tiers tracked per contact
pub const PRIORITY_TIERS: usize = 3;

/// Bundle priority, indexing the per-tier available volume of a contact
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Priority {
    /// Bulk traffic
    Bulk,
    /// Normal traffic (default)
    #[default]
    Normal,
    /// Expedited traffic
    Expedited,
}

impl Priority {
    /// All tiers, lowest first
    pub const ALL: [Priority; PRIORITY_TIERS] =
        [Priority::Bulk, Priority::Normal, Priority::Expedited];

    /// Index of this priority in a contact's `mav` table
    pub fn tier(self) -> usize {
        match self {
            Priority::Bulk => 0,
            Priority::Normal => 1,
            Priority::Expedited => 2,
        }
    }

    /// Priority for a tier index
    pub fn from_tier(tier: usize) -> Option<Self> {
        Self::ALL.get(tier).copied()
    }
}

/// Index of a contact inside the plan that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContactId(pub usize);

impl ContactId {
    /// Position in the owning plan
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scheduled, unidirectional communication opportunity between two nodes
///
/// Only the schedule is serialized. Volume and available volume are derived
/// from it when a contact is loaded, so a loaded contact starts at full
/// capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ContactRecord", into = "ContactRecord")]
pub struct Contact {
    /// Transmitting node
    pub frm: NodeId,
    /// Receiving node
    pub to: NodeId,
    /// Start of the contact window
    pub start: Time,
    /// End of the contact window ([`INFINITE_TIME`] when unbounded)
    pub end: Time,
    /// Transmission rate in volume per time unit
    pub rate: Volume,
    /// One-way light time added to every transmission
    pub owlt: Time,
    /// Probability that the contact actually occurs
    pub confidence: f64,
    /// Total capacity, `rate * (end - start)`
    volume: Volume,
    /// Maximum available volume per priority tier
    mav: [Volume; PRIORITY_TIERS],
}

impl Contact {
    /// Create a contact with zero light time and full confidence
    pub fn new(frm: NodeId, to: NodeId, start: Time, end: Time, rate: Volume) -> Self {
        let volume = rate.saturating_mul(end.saturating_sub(start));
        Self {
            frm,
            to,
            start,
            end,
            rate,
            owlt: 0,
            confidence: 1.0,
            volume,
            mav: [volume; PRIORITY_TIERS],
        }
    }

    /// Set the one-way light time
    pub fn with_owlt(mut self, owlt: Time) -> Self {
        self.owlt = owlt;
        self
    }

    /// Set the occurrence confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Check the schedule is structurally usable
    pub fn validate(&self) -> PlanResult<()> {
        if self.start >= self.end {
            return Err(PlanError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        if self.rate <= 0 {
            return Err(PlanError::InvalidRate(self.rate));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(PlanError::InvalidConfidence(self.confidence));
        }
        if self.frm == self.to {
            return Err(PlanError::SelfLoop(self.frm));
        }
        Ok(())
    }

    /// Total capacity of the contact
    pub fn volume(&self) -> Volume {
        self.volume
    }

    /// Available volume for one priority tier
    pub fn mav(&self, priority: Priority) -> Volume {
        self.mav[priority.tier()]
    }

    /// Largest available volume across tiers
    pub fn max_mav(&self) -> Volume {
        self.mav.iter().copied().max().unwrap_or(0)
    }

    /// Smallest available volume across tiers
    pub fn min_mav(&self) -> Volume {
        self.mav.iter().copied().min().unwrap_or(0)
    }

    /// Whether any tier still has capacity left
    pub fn has_residual_volume(&self) -> bool {
        self.max_mav() > 0
    }

    /// Whether the window is open at `time` (both bounds inclusive)
    pub fn is_active_at(&self, time: Time) -> bool {
        self.start <= time && time <= self.end
    }

    /// Whether the contact ends strictly after `time`
    pub fn ends_after(&self, time: Time) -> bool {
        self.end > time
    }

    /// Take `amount` out of one tier's available volume
    ///
    /// Only the given tier is adjusted; the other tiers keep their values.
    /// Negative amounts are treated as zero, so a tier never grows back
    /// before [`Contact::reset_capacity`].
    pub fn consume(&mut self, priority: Priority, amount: Volume) {
        let tier = &mut self.mav[priority.tier()];
        *tier = tier.saturating_sub(amount.max(0)).max(0);
    }

    /// Restore every tier to the full contact volume
    pub fn reset_capacity(&mut self) {
        self.mav = [self.volume; PRIORITY_TIERS];
    }
}

/// Serialized form of a [`Contact`]: the schedule without capacity state
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContactRecord {
    frm: NodeId,
    to: NodeId,
    start: Time,
    end: Time,
    rate: Volume,
    #[serde(default)]
    owlt: Time,
    #[serde(default = "full_confidence")]
    confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl From<ContactRecord> for Contact {
    fn from(record: ContactRecord) -> Self {
        Contact::new(record.frm, record.to, record.start, record.end, record.rate)
            .with_owlt(record.owlt)
            .with_confidence(record.confidence)
    }
}

impl From<Contact> for ContactRecord {
    fn from(contact: Contact) -> Self {
        Self {
            frm: contact.frm,
            to: contact.to,
            start: contact.start,
            end: contact.end,
            rate: contact.rate,
            owlt: contact.owlt,
            confidence: contact.confidence,
        }
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let percent = if self.volume > 0 {
            100.0 * self.min_mav() as f64 / self.volume as f64
        } else {
            0.0
        };
        write!(f, "{}->{}({}-", self.frm, self.to, self.start)?;
        if self.end == INFINITE_TIME {
            write!(f, "inf")?;
        } else {
            write!(f, "{}", self.end)?;
        }
        write!(f, ",d{})[mav{:.0}%]", self.owlt, percent)
    }
}
