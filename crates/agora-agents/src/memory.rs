//! Per-agent memory with bounded capacity.
//!
//! When an agent is over capacity, the least important memory goes first,
//! and among equally important ones the oldest.

use std::collections::BTreeMap;

use agora_types::{AgentId, Memory};

/// Memories grouped by owner, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    by_owner: BTreeMap<AgentId, Vec<Memory>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a memory, evicting until the owner holds at most `capacity`.
    pub fn record(&mut self, memory: Memory, capacity: usize) {
        let memories = self.by_owner.entry(memory.owner).or_default();
        memories.push(memory);
        while memories.len() > capacity.max(1) {
            let Some(victim) = eviction_candidate(memories) else {
                break;
            };
            memories.remove(victim);
        }
    }

    /// The `limit` most recent memories of `owner`, newest last.
    pub fn recent(&self, owner: AgentId, limit: usize) -> &[Memory] {
        let memories = self.by_owner.get(&owner).map_or(&[][..], Vec::as_slice);
        let skip = memories.len().saturating_sub(limit);
        memories.get(skip..).unwrap_or(&[])
    }

    /// Every memory of `owner`.
    pub fn of(&self, owner: AgentId) -> &[Memory] {
        self.by_owner.get(&owner).map_or(&[][..], Vec::as_slice)
    }

    /// Every memory in the store.
    pub fn iter(&self) -> impl Iterator<Item = &Memory> {
        self.by_owner.values().flatten()
    }
}

impl FromIterator<Memory> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Memory>>(iter: I) -> Self {
        let mut by_owner: BTreeMap<AgentId, Vec<Memory>> = BTreeMap::new();
        for memory in iter {
            by_owner.entry(memory.owner).or_default().push(memory);
        }
        for memories in by_owner.values_mut() {
            memories.sort_by_key(|m| m.tick);
        }
        Self { by_owner }
    }
}

/// Index of the least important memory, oldest on ties.
fn eviction_candidate(memories: &[Memory]) -> Option<usize> {
    memories
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.importance
                .total_cmp(&b.importance)
                .then(a.tick.cmp(&b.tick))
        })
        .map(|(index, _)| index)
}
