//! Location naming by usage consensus.
//!
//! Any agent may propose a name for the cell it stands on. Several names can
//! coexist for one cell; the consensus name is the one proposed most often.
//! When two names share the highest count, the one proposed first wins.

use std::collections::BTreeMap;

use agora_types::{AgentId, LocationName, Position};

use crate::error::WorldError;

/// Longest accepted name, in characters.
pub const MAX_NAME_CHARS: usize = 40;

/// Every name proposed for every cell, in proposal order per cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameRegistry {
    names: BTreeMap<Position, Vec<LocationName>>,
}

/// Trim a proposed name and check it is usable.
pub fn validate_name(raw: &str) -> Result<String, WorldError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(WorldError::InvalidName {
            reason: "name is empty".to_owned(),
        });
    }
    let chars = name.chars().count();
    if chars > MAX_NAME_CHARS {
        return Err(WorldError::InvalidName {
            reason: format!("name is {chars} characters, maximum is {MAX_NAME_CHARS}"),
        });
    }
    if name.chars().any(char::is_control) {
        return Err(WorldError::InvalidName {
            reason: "name contains control characters".to_owned(),
        });
    }
    Ok(name.to_owned())
}

impl NameRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a proposal. An existing `(position, name)` pair has its usage
    /// count incremented; a new pair is inserted with a count of 1.
    ///
    /// Returns the usage count after the proposal. The name is expected to
    /// have passed [`validate_name`].
    pub fn propose(&mut self, position: Position, name: &str, proposer: AgentId, tick: u64) -> u32 {
        let entries = self.names.entry(position).or_default();
        if let Some(existing) = entries.iter_mut().find(|n| n.name == name) {
            existing.usage_count = existing.usage_count.saturating_add(1);
            return existing.usage_count;
        }
        entries.push(LocationName {
            position,
            name: name.to_owned(),
            usage_count: 1,
            proposer,
            first_used_tick: tick,
        });
        1
    }

    /// The consensus name for a cell: highest usage count, first proposed on
    /// ties.
    pub fn consensus(&self, position: Position) -> Option<&LocationName> {
        let mut best: Option<&LocationName> = None;
        for candidate in self.names_at(position) {
            match best {
                Some(current) if candidate.usage_count <= current.usage_count => {}
                _ => best = Some(candidate),
            }
        }
        best
    }

    /// Every name proposed for a cell, in proposal order.
    pub fn names_at(&self, position: Position) -> &[LocationName] {
        self.names.get(&position).map_or(&[][..], Vec::as_slice)
    }

    /// Every proposal in the registry.
    pub fn iter(&self) -> impl Iterator<Item = &LocationName> {
        self.names.values().flatten()
    }

    /// Number of named cells.
    pub fn named_cells(&self) -> usize {
        self.names.len()
    }
}

impl FromIterator<LocationName> for NameRegistry {
    fn from_iter<I: IntoIterator<Item = LocationName>>(iter: I) -> Self {
        let mut names: BTreeMap<Position, Vec<LocationName>> = BTreeMap::new();
        for entry in iter {
            names.entry(entry.position).or_default().push(entry);
        }
        Self { names }
    }
}
