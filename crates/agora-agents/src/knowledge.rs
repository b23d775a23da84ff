//! The social knowledge graph: who knows about whom, and how.
//!
//! Agents learn about each other in two ways. Physical proximity produces a
//! direct discovery at depth 0. Word of mouth (`share_info`, `gossip`)
//! produces a referral one hop deeper than the referrer's own knowledge.
//!
//! Both paths go through [`KnowledgeGraph::upsert`], which merges into any
//! existing record for the `(observer, known)` pair:
//!
//! - referral metadata (type, referrer, depth) is replaced only when the new
//!   depth is strictly smaller, so the stored depth never grows;
//! - each shared-info field is replaced independently when the incoming
//!   value is present (field-level last-write-wins);
//! - `information_age` is always set to the incoming tick.

use std::collections::BTreeMap;

use agora_types::{AgentId, DiscoveryType, KnowledgeRecord, SharedInfo};

/// One knowledge write, before merging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnowledgeUpdate {
    /// Agent learning.
    pub observer: AgentId,
    /// Agent learned about.
    pub known: AgentId,
    /// Direct or referral.
    pub discovery_type: DiscoveryType,
    /// Referrer, for referrals.
    pub referred_by: Option<AgentId>,
    /// Depth of this chain.
    pub referral_depth: u32,
    /// Information carried.
    pub info: SharedInfo,
    /// Tick of the write.
    pub tick: u64,
}

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed; one was created.
    Inserted,
    /// A record existed and was merged into.
    Merged,
    /// The write was about the observer itself and was dropped.
    Ignored,
}

/// Knowledge records keyed by `(observer, known)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeGraph {
    records: BTreeMap<(AgentId, AgentId), KnowledgeRecord>,
}

impl KnowledgeGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `observer` met `known` in person.
    pub fn record_direct_discovery(
        &mut self,
        observer: AgentId,
        known: AgentId,
        info: SharedInfo,
        tick: u64,
    ) -> UpsertOutcome {
        self.upsert(KnowledgeUpdate {
            observer,
            known,
            discovery_type: DiscoveryType::Direct,
            referred_by: None,
            referral_depth: 0,
            info,
            tick,
        })
    }

    /// Record that `referrer`, who knows `known` at `referrer_depth`, told
    /// `observer` about them.
    pub fn record_referral(
        &mut self,
        observer: AgentId,
        known: AgentId,
        referrer: AgentId,
        referrer_depth: u32,
        info: SharedInfo,
        tick: u64,
    ) -> UpsertOutcome {
        self.upsert(KnowledgeUpdate {
            observer,
            known,
            discovery_type: DiscoveryType::Referral,
            referred_by: Some(referrer),
            referral_depth: referrer_depth.saturating_add(1),
            info,
            tick,
        })
    }

    /// Merge one write into the graph.
    pub fn upsert(&mut self, update: KnowledgeUpdate) -> UpsertOutcome {
        if update.observer == update.known {
            return UpsertOutcome::Ignored;
        }
        let key = (update.observer, update.known);
        let Some(existing) = self.records.get_mut(&key) else {
            self.records.insert(
                key,
                KnowledgeRecord {
                    observer: update.observer,
                    known: update.known,
                    discovery_type: update.discovery_type,
                    referred_by: update.referred_by,
                    referral_depth: update.referral_depth,
                    shared_info: update.info,
                    information_age: update.tick,
                },
            );
            return UpsertOutcome::Inserted;
        };

        if update.referral_depth < existing.referral_depth {
            existing.discovery_type = update.discovery_type;
            existing.referred_by = update.referred_by;
            existing.referral_depth = update.referral_depth;
        }
        merge_info(&mut existing.shared_info, update.info);
        existing.information_age = update.tick;
        UpsertOutcome::Merged
    }

    /// The record for a pair, if any.
    pub fn get(&self, observer: AgentId, known: AgentId) -> Option<&KnowledgeRecord> {
        self.records.get(&(observer, known))
    }

    /// Every record held by `observer`, ordered by known agent.
    pub fn known_by(&self, observer: AgentId) -> Vec<&KnowledgeRecord> {
        self.records
            .iter()
            .filter(|((holder, _), _)| *holder == observer)
            .map(|(_, record)| record)
            .collect()
    }

    /// Drop records not updated in the last `max_age` ticks, and records
    /// involving any agent in `departed`. Returns how many were removed.
    pub fn prune(&mut self, current_tick: u64, max_age: u64, departed: &[AgentId]) -> usize {
        let before = self.records.len();
        self.records.retain(|(observer, known), record| {
            current_tick.saturating_sub(record.information_age) <= max_age
                && !departed.contains(observer)
                && !departed.contains(known)
        });
        before.saturating_sub(self.records.len())
    }

    /// Every record.
    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeRecord> {
        self.records.values()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<KnowledgeRecord> for KnowledgeGraph {
    fn from_iter<I: IntoIterator<Item = KnowledgeRecord>>(iter: I) -> Self {
        Self {
            records: iter
                .into_iter()
                .map(|r| ((r.observer, r.known), r))
                .collect(),
        }
    }
}

/// Field-level last-write-wins.
fn merge_info(stored: &mut SharedInfo, incoming: SharedInfo) {
    if incoming.last_known_position.is_some() {
        stored.last_known_position = incoming.last_known_position;
    }
    if incoming.reputation.is_some() {
        stored.reputation = incoming.reputation;
    }
    if incoming.danger_level.is_some() {
        stored.danger_level = incoming.danger_level;
    }
    if incoming.trade_interest.is_some() {
        stored.trade_interest = incoming.trade_interest;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use agora_types::Position;

    use super::*;

    fn agent(n: u8) -> AgentId {
        AgentId::from_random_bytes([n; 16])
    }

    fn seen_at(x: i32, y: i32) -> SharedInfo {
        SharedInfo {
            last_known_position: Some(Position::new(x, y)),
            ..SharedInfo::default()
        }
    }

    #[test]
    fn direct_discovery_is_depth_zero() {
        let mut graph = KnowledgeGraph::new();
        let outcome = graph.record_direct_discovery(agent(1), agent(2), seen_at(1, 1), 10);
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let record = graph.get(agent(1), agent(2)).unwrap();
        assert_eq!(record.discovery_type, DiscoveryType::Direct);
        assert_eq!(record.referral_depth, 0);
        assert_eq!(record.referred_by, None);
        assert_eq!(record.information_age, 10);
    }

    #[test]
    fn repeated_direct_discovery_only_refreshes_age() {
        let mut graph = KnowledgeGraph::new();
        graph.record_direct_discovery(agent(1), agent(2), seen_at(4, 4), 10);
        let before = graph.get(agent(1), agent(2)).unwrap().clone();

        graph.record_direct_discovery(agent(1), agent(2), seen_at(4, 4), 15);
        let after = graph.get(agent(1), agent(2)).unwrap();

        assert_eq!(after.referral_depth, before.referral_depth);
        assert_eq!(after.discovery_type, before.discovery_type);
        assert_eq!(after.shared_info, before.shared_info);
        assert_eq!(after.information_age, 15);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn referral_is_one_hop_deeper_than_referrer() {
        let mut graph = KnowledgeGraph::new();
        graph.record_referral(agent(1), agent(3), agent(2), 0, SharedInfo::default(), 4);
        let record = graph.get(agent(1), agent(3)).unwrap();
        assert_eq!(record.discovery_type, DiscoveryType::Referral);
        assert_eq!(record.referral_depth, 1);
        assert_eq!(record.referred_by, Some(agent(2)));
    }

    #[test]
    fn deeper_referral_never_increases_depth() {
        let mut graph = KnowledgeGraph::new();
        graph.record_direct_discovery(agent(1), agent(3), SharedInfo::default(), 1);
        graph.record_referral(agent(1), agent(3), agent(2), 4, SharedInfo::default(), 2);

        let record = graph.get(agent(1), agent(3)).unwrap();
        assert_eq!(record.referral_depth, 0);
        assert_eq!(record.discovery_type, DiscoveryType::Direct);
        assert_eq!(record.referred_by, None);
        assert_eq!(record.information_age, 2);
    }

    #[test]
    fn shorter_chain_replaces_referral_metadata() {
        let mut graph = KnowledgeGraph::new();
        graph.record_referral(agent(1), agent(3), agent(2), 3, SharedInfo::default(), 1);
        graph.record_referral(agent(1), agent(3), agent(4), 0, SharedInfo::default(), 2);
        let record = graph.get(agent(1), agent(3)).unwrap();
        assert_eq!(record.referral_depth, 1);
        assert_eq!(record.referred_by, Some(agent(4)));

        graph.record_direct_discovery(agent(1), agent(3), SharedInfo::default(), 3);
        let record = graph.get(agent(1), agent(3)).unwrap();
        assert_eq!(record.referral_depth, 0);
        assert_eq!(record.discovery_type, DiscoveryType::Direct);
        assert_eq!(record.referred_by, None);
    }

    #[test]
    fn shared_info_merges_per_field() {
        let mut graph = KnowledgeGraph::new();
        graph.record_direct_discovery(agent(1), agent(2), seen_at(1, 1), 1);
        graph.record_referral(
            agent(1),
            agent(2),
            agent(3),
            2,
            SharedInfo {
                reputation: Some(-40.0),
                ..SharedInfo::default()
            },
            2,
        );

        let info = graph.get(agent(1), agent(2)).unwrap().shared_info;
        assert_eq!(info.last_known_position, Some(Position::new(1, 1)));
        assert_eq!(info.reputation, Some(-40.0));
        assert_eq!(info.danger_level, None);

        graph.record_direct_discovery(agent(1), agent(2), seen_at(2, 2), 3);
        let info = graph.get(agent(1), agent(2)).unwrap().shared_info;
        assert_eq!(info.last_known_position, Some(Position::new(2, 2)));
        assert_eq!(info.reputation, Some(-40.0));
    }

    #[test]
    fn self_knowledge_is_ignored() {
        let mut graph = KnowledgeGraph::new();
        let outcome = graph.record_direct_discovery(agent(1), agent(1), seen_at(0, 0), 1);
        assert_eq!(outcome, UpsertOutcome::Ignored);
        assert!(graph.is_empty());
    }

    #[test]
    fn prune_drops_stale_and_departed() {
        let mut graph = KnowledgeGraph::new();
        graph.record_direct_discovery(agent(1), agent(2), SharedInfo::default(), 1);
        graph.record_direct_discovery(agent(1), agent(3), SharedInfo::default(), 90);
        graph.record_direct_discovery(agent(4), agent(1), SharedInfo::default(), 95);

        let removed = graph.prune(100, 50, &[agent(4)]);
        assert_eq!(removed, 2);
        assert!(graph.get(agent(1), agent(3)).is_some());
        assert_eq!(graph.known_by(agent(1)).len(), 1);
    }
}
