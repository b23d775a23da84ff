//! The run's single source of randomness.
//!
//! One [`RngService`] is seeded per simulation. Every consumer asks it for a
//! stream keyed by `(tick, agent, purpose)`, so the numbers an agent's action
//! draws do not depend on how many other agents drew before it, nor on the
//! order concurrent decision calls happened to finish in.

use agora_types::AgentId;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// What a stream is used for. Each purpose gets an independent stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RngStream {
    /// World generation at genesis or reset.
    Genesis,
    /// A baseline strategy choosing an action.
    Decision,
    /// The fallback strategy standing in for a failed decision.
    Fallback,
    /// The resolver settling an action.
    Resolution,
}

impl RngStream {
    const fn salt(self) -> u64 {
        match self {
            Self::Genesis => 0x9e37_79b9_7f4a_7c15,
            Self::Decision => 0xbf58_476d_1ce4_e5b9,
            Self::Fallback => 0x94d0_49bb_1331_11eb,
            Self::Resolution => 0x2545_f491_4f6c_dd1d,
        }
    }
}

/// Seeded factory of deterministic random streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngService {
    seed: u64,
}

impl RngService {
    /// A service for a run seeded with `seed`.
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The run seed.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The stream for one agent, one tick, one purpose.
    pub fn stream(&self, tick: u64, agent: AgentId, purpose: RngStream) -> StdRng {
        let (high, low) = agent.into_inner().as_u64_pair();
        let mut state = mix(self.seed ^ purpose.salt());
        state = mix(state ^ tick);
        state = mix(state ^ high);
        state = mix(state ^ low);
        StdRng::seed_from_u64(state)
    }

    /// A stream not tied to any agent, e.g. for laying out a fresh world.
    pub fn world_stream(&self, purpose: RngStream) -> StdRng {
        StdRng::seed_from_u64(mix(self.seed ^ purpose.salt()))
    }
}

/// `SplitMix64` finalizer.
const fn mix(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ z.wrapping_shr(30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ z.wrapping_shr(27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ z.wrapping_shr(31)
}
