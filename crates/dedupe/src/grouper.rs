use crate::key::IdentityKey;
use core_types::{EventRecord, ResolutionPolicy};
use serde::Serialize;
use std::collections::HashMap;

/// A record together with its position in the input batch.
#[derive(Debug, Clone, Copy)]
pub struct GroupMember<'a> {
    pub index: usize,
    pub record: &'a EventRecord,
}

/// Records sharing one identity key, in encounter order. Never empty.
#[derive(Debug, Clone)]
pub struct DuplicateGroup<'a> {
    pub key: IdentityKey,
    pub members: Vec<GroupMember<'a>>,
}

impl DuplicateGroup<'_> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn has_duplicates(&self) -> bool {
        self.members.len() > 1
    }
}

/// Audit entry for one record that lost its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discard {
    pub index: usize,
    pub record_id: String,
    pub kept_index: usize,
    pub kept_id: String,
    pub policy: ResolutionPolicy,
    /// The losing record's value under the policy (bytes, filled fields or position).
    pub measure: u64,
    pub reason: String,
}

/// The verdict for one group: one kept record, every other member discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionOutcome {
    pub key: IdentityKey,
    pub kept_index: usize,
    pub kept_id: String,
    pub discarded: Vec<Discard>,
}

/// Counts for the dedupe report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupeSummary {
    pub groups_considered: usize,
    pub groups_deduped: usize,
    pub kept_count: usize,
    pub duplicate_count: usize,
}

impl DedupeSummary {
    pub fn from_outcomes(outcomes: &[ResolutionOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            acc.groups_considered += 1;
            acc.groups_deduped += usize::from(!o.discarded.is_empty());
            acc.kept_count += 1;
            acc.duplicate_count += o.discarded.len();
            acc
        })
    }
}

/// Batch indices of kept and discarded records, each sorted ascending.
pub fn partition(outcomes: &[ResolutionOutcome]) -> (Vec<usize>, Vec<usize>) {
    let mut kept: Vec<usize> = outcomes.iter().map(|o| o.kept_index).collect();
    let mut discarded: Vec<usize> = outcomes
        .iter()
        .flat_map(|o| o.discarded.iter().map(|d| d.index))
        .collect();
    kept.sort_unstable();
    discarded.sort_unstable();
    (kept, discarded)
}

/// Groups records by identity and picks one canonical record per group.
///
/// The grouper only classifies. It never mutates a record and never touches
/// the files behind them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateGrouper {
    /// When set, a record missing any key component is never merged.
    require_complete_key: bool,
}

impl DuplicateGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_require_complete_key(mut self, require: bool) -> Self {
        self.require_complete_key = require;
        self
    }

    /// Partitions `records` into groups in a single hashed pass.
    ///
    /// Groups are returned in order of their first member.
    pub fn group<'a>(&self, records: &'a [EventRecord]) -> Vec<DuplicateGroup<'a>> {
        let mut groups: Vec<DuplicateGroup<'a>> = Vec::new();
        let mut slots: HashMap<IdentityKey, usize> = HashMap::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let key = IdentityKey::of(record);
            let member = GroupMember { index, record };

            if self.require_complete_key && !key.is_complete() {
                groups.push(DuplicateGroup { key, members: vec![member] });
                continue;
            }

            match slots.get(&key) {
                Some(&slot) => groups[slot].members.push(member),
                None => {
                    slots.insert(key.clone(), groups.len());
                    groups.push(DuplicateGroup { key, members: vec![member] });
                }
            }
        }

        tracing::debug!(
            records = records.len(),
            groups = groups.len(),
            duplicated = groups.iter().filter(|g| g.has_duplicates()).count(),
            "Grouped records by identity."
        );
        groups
    }

    /// Picks the canonical record of every group.
    ///
    /// `size_of` is the caller's notion of size (for example the on-disk byte
    /// length). Ties always go to the earliest member.
    #[tracing::instrument(name = "resolve_duplicates", skip_all, fields(%policy, groups = groups.len()))]
    pub fn resolve<F>(
        &self,
        groups: &[DuplicateGroup<'_>],
        policy: ResolutionPolicy,
        size_of: F,
    ) -> Vec<ResolutionOutcome>
    where
        F: Fn(&EventRecord) -> u64,
    {
        let outcomes: Vec<ResolutionOutcome> = groups
            .iter()
            .filter(|g| !g.is_empty())
            .map(|g| resolve_group(g, policy, &size_of))
            .collect();

        let summary = DedupeSummary::from_outcomes(&outcomes);
        tracing::info!(
            groups_deduped = summary.groups_deduped,
            duplicates = summary.duplicate_count,
            "Duplicate resolution complete."
        );
        outcomes
    }
}

/// The ranking value of a member: a primary measure and a tie-breaker.
fn rank<F>(policy: ResolutionPolicy, position: usize, record: &EventRecord, size_of: &F) -> (u64, u64)
where
    F: Fn(&EventRecord) -> u64,
{
    match policy {
        ResolutionPolicy::KeepLargest => (size_of(record), 0),
        ResolutionPolicy::MostFilled => (record.filled_field_count() as u64, size_of(record)),
        ResolutionPolicy::KeepFirst | ResolutionPolicy::KeepLast => (position as u64, 0),
    }
}

fn unit(policy: ResolutionPolicy) -> &'static str {
    match policy {
        ResolutionPolicy::KeepLargest => "bytes",
        ResolutionPolicy::MostFilled => "filled fields",
        ResolutionPolicy::KeepFirst | ResolutionPolicy::KeepLast => "position",
    }
}

fn resolve_group<F>(group: &DuplicateGroup<'_>, policy: ResolutionPolicy, size_of: &F) -> ResolutionOutcome
where
    F: Fn(&EventRecord) -> u64,
{
    let ranks: Vec<(u64, u64)> = group
        .members
        .iter()
        .enumerate()
        .map(|(pos, m)| rank(policy, pos, m.record, size_of))
        .collect();

    let winner = match policy {
        ResolutionPolicy::KeepFirst => 0,
        ResolutionPolicy::KeepLast => group.members.len().saturating_sub(1),
        ResolutionPolicy::KeepLargest | ResolutionPolicy::MostFilled => {
            // strict comparison keeps the earliest member on ties
            let mut best = 0;
            for (pos, r) in ranks.iter().enumerate().skip(1) {
                if *r > ranks[best] {
                    best = pos;
                }
            }
            best
        }
    };

    let kept = group.members[winner];
    let kept_measure = ranks[winner].0;

    let discarded = group
        .members
        .iter()
        .enumerate()
        .filter(|&(pos, _)| pos != winner)
        .map(|(pos, m)| {
            let measure = ranks[pos].0;
            let reason = format!(
                "{policy}: {measure} {unit} vs {kept_measure} {unit} for kept record {kept}",
                unit = unit(policy),
                kept = kept.record.id(),
            );
            tracing::debug!(key = %group.key, discarded = m.record.id(), %reason, "Discarding duplicate.");
            Discard {
                index: m.index,
                record_id: m.record.id().to_string(),
                kept_index: kept.index,
                kept_id: kept.record.id().to_string(),
                policy,
                measure,
                reason,
            }
        })
        .collect();

    ResolutionOutcome {
        key: group.key.clone(),
        kept_index: kept.index,
        kept_id: kept.record.id().to_string(),
        discarded,
    }
}
