//! Action planning
//!
//! Pure diff between the desired address set and the records a hostname
//! currently holds. Nothing here performs I/O; the engine applies the plan.
//!
//! ## Ordering
//!
//! One entry per desired address in ascending order (Skip, Insert or
//! Update), followed by every Delete in ascending address order. Applying
//! the plan front to back therefore adds before it removes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::ReconcilePolicy;
use crate::record::{DnsRecord, PublicAddress};

/// Disposition of a plan entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    Skip,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skip => "Skip",
            Self::Insert => "Insert",
            Self::Update => "Update",
            Self::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// One entry of an [`ActionPlan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The record already points at a desired address
    Skip { record: DnsRecord },

    /// No record holds this desired address
    Insert { address: PublicAddress },

    /// Rewrite `record` (currently at `from`) to point at `to`
    ///
    /// `from == to` when only the TTL changes.
    Update {
        from: PublicAddress,
        to: PublicAddress,
        record: DnsRecord,
    },

    /// The record points at an address that is no longer desired
    Delete { record: DnsRecord },
}

impl Action {
    pub fn kind(&self) -> PlanKind {
        match self {
            Self::Skip { .. } => PlanKind::Skip,
            Self::Insert { .. } => PlanKind::Insert,
            Self::Update { .. } => PlanKind::Update,
            Self::Delete { .. } => PlanKind::Delete,
        }
    }

    /// The address the entry is about
    ///
    /// For an update this is the new address.
    pub fn address(&self) -> PublicAddress {
        match self {
            Self::Skip { record } | Self::Delete { record } => record.address,
            Self::Insert { address } => *address,
            Self::Update { to, .. } => *to,
        }
    }

    /// The existing record the entry acts on, if any
    pub fn record(&self) -> Option<&DnsRecord> {
        match self {
            Self::Skip { record } | Self::Update { record, .. } | Self::Delete { record } => {
                Some(record)
            }
            Self::Insert { .. } => None,
        }
    }

    /// Whether applying the entry calls the record store
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Skip { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update { from, to, .. } => write!(f, "Update({from} -> {to})"),
            other => write!(f, "{}({})", other.kind(), other.address()),
        }
    }
}

/// Ordered list of actions converging a hostname onto the desired set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPlan {
    actions: Vec<Action>,
}

impl ActionPlan {
    /// Compute the plan for `desired` against the `actual` listing
    ///
    /// When several records share an address, the one with the smallest id
    /// is kept and the others are deleted.
    pub fn build(
        desired: &BTreeSet<PublicAddress>,
        actual: &[DnsRecord],
        ttl: u32,
        policy: &ReconcilePolicy,
    ) -> Self {
        let mut by_address: BTreeMap<PublicAddress, Vec<&DnsRecord>> = BTreeMap::new();
        for record in actual {
            by_address.entry(record.address).or_default().push(record);
        }

        let mut matched: BTreeMap<PublicAddress, &DnsRecord> = BTreeMap::new();
        let mut stale: Vec<&DnsRecord> = Vec::new();
        let mut surplus: Vec<&DnsRecord> = Vec::new();

        for (address, mut records) in by_address {
            records.sort_by(|a, b| a.id.cmp(&b.id));
            if desired.contains(&address) {
                let mut records = records.into_iter();
                if let Some(first) = records.next() {
                    matched.insert(address, first);
                }
                surplus.extend(records);
            } else {
                stale.extend(records);
            }
        }

        let missing: Vec<PublicAddress> = desired
            .iter()
            .filter(|a| !matched.contains_key(*a))
            .copied()
            .collect();

        // Pair missing addresses with stale records, both ascending
        let mut reused: BTreeMap<PublicAddress, &DnsRecord> = BTreeMap::new();
        if policy.reuse_slot_on_single_change {
            let pairs = missing.iter().zip(stale.iter()).count();
            for (address, record) in missing.iter().zip(stale.drain(..pairs)) {
                reused.insert(*address, record);
            }
        }

        let mut actions = Vec::with_capacity(desired.len() + stale.len() + surplus.len());

        for address in desired {
            let action = if let Some(record) = matched.get(address) {
                if policy.reconcile_ttl && record.ttl != ttl {
                    Action::Update {
                        from: *address,
                        to: *address,
                        record: (*record).clone(),
                    }
                } else {
                    Action::Skip {
                        record: (*record).clone(),
                    }
                }
            } else if let Some(record) = reused.get(address) {
                Action::Update {
                    from: record.address,
                    to: *address,
                    record: (*record).clone(),
                }
            } else {
                Action::Insert { address: *address }
            };
            actions.push(action);
        }

        let mut doomed: Vec<&DnsRecord> = stale.into_iter().chain(surplus).collect();
        doomed.sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.id.cmp(&b.id)));
        actions.extend(doomed.into_iter().map(|record| Action::Delete {
            record: record.clone(),
        }));

        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of entries that call the record store
    pub fn mutation_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_mutation()).count()
    }

    /// True when applying the plan makes no remote call
    pub fn is_noop(&self) -> bool {
        self.mutation_count() == 0
    }

    /// Count of entries of the given kind
    pub fn count(&self, kind: PlanKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }
}

impl<'a> IntoIterator for &'a ActionPlan {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl fmt::Display for ActionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{action}")?;
        }
        f.write_str("]")
    }
}
