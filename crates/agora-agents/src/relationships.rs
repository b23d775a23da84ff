//! Directed trust between agents.
//!
//! Trust runs from -100 (enemy) to 100 (confidant) and defaults to 0 for
//! strangers. It is asymmetric: A's trust in B says nothing about B's trust
//! in A.

use std::collections::BTreeMap;

use agora_types::{AgentId, Relationship};

/// Lowest trust value.
pub const TRUST_MIN: f64 = -100.0;

/// Highest trust value.
pub const TRUST_MAX: f64 = 100.0;

/// How believable a claim from someone is, given the listener's trust in
/// them: `clamp(0.5 + trust / 200, 0.1, 0.9)`.
pub fn credibility(trust: f64) -> f64 {
    (0.5 + trust / 200.0).clamp(0.1, 0.9)
}

/// Relationships keyed by `(from, to)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipGraph {
    edges: BTreeMap<(AgentId, AgentId), Relationship>,
}

impl RelationshipGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `from` holds toward `to`; 0 for strangers.
    pub fn trust(&self, from: AgentId, to: AgentId) -> f64 {
        self.edges.get(&(from, to)).map_or(0.0, |r| r.trust)
    }

    /// Shift trust by `amount`, clamped to `[-100, 100]`, and count the
    /// interaction. Returns the new trust.
    pub fn adjust(&mut self, from: AgentId, to: AgentId, amount: f64, tick: u64) -> f64 {
        if from == to {
            return 0.0;
        }
        let edge = self.edges.entry((from, to)).or_insert_with(|| Relationship {
            from,
            to,
            trust: 0.0,
            interactions: 0,
            last_interaction_tick: tick,
        });
        edge.trust = (edge.trust + amount).clamp(TRUST_MIN, TRUST_MAX);
        edge.interactions = edge.interactions.saturating_add(1);
        edge.last_interaction_tick = tick;
        edge.trust
    }

    /// Every relationship held by `from`.
    pub fn held_by(&self, from: AgentId) -> Vec<&Relationship> {
        self.edges
            .iter()
            .filter(|((holder, _), _)| *holder == from)
            .map(|(_, r)| r)
            .collect()
    }

    /// Remove every edge touching an agent in `departed`.
    pub fn forget(&mut self, departed: &[AgentId]) {
        self.edges
            .retain(|(from, to), _| !departed.contains(from) && !departed.contains(to));
    }

    /// Every relationship.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.edges.values()
    }
}

impl FromIterator<Relationship> for RelationshipGraph {
    fn from_iter<I: IntoIterator<Item = Relationship>>(iter: I) -> Self {
        Self {
            edges: iter.into_iter().map(|r| ((r.from, r.to), r)).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn agent(n: u8) -> AgentId {
        AgentId::from_random_bytes([n; 16])
    }

    #[test]
    fn credibility_is_clamped() {
        assert_eq!(credibility(0.0), 0.5);
        assert_eq!(credibility(40.0), 0.7);
        assert_eq!(credibility(100.0), 0.9);
        assert_eq!(credibility(-100.0), 0.1);
    }

    #[test]
    fn trust_is_directed_and_clamped() {
        let mut graph = RelationshipGraph::new();
        assert_eq!(graph.adjust(agent(1), agent(2), 70.0, 1), 70.0);
        assert_eq!(graph.adjust(agent(1), agent(2), 70.0, 2), 100.0);
        assert_eq!(graph.trust(agent(2), agent(1)), 0.0);
        assert_eq!(graph.adjust(agent(2), agent(1), -500.0, 3), -100.0);
        assert_eq!(graph.held_by(agent(1)).first().unwrap().interactions, 2);
    }

    #[test]
    fn self_trust_is_never_recorded() {
        let mut graph = RelationshipGraph::new();
        graph.adjust(agent(1), agent(1), 10.0, 1);
        assert_eq!(graph.iter().count(), 0);
    }
}
