//! The simulation context: everything a tick needs besides the world.
//!
//! One [`SimulationContext`] is built at startup and shared by the
//! scheduler, dispatch, and the control surface. It owns the decision
//! source registry, the fallback strategy, per-source counters, the API-key
//! store for external sources, the RNG service, and the action resolver.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use agora_agents::ActionResolver;
use agora_types::{Decision, Observation};
use serde::Serialize;
use tracing::info;

use crate::baseline::{BaselineSource, BaselineStrategy, StrategyKind};
use crate::config::SimulationConfig;
use crate::decision::DecisionSource;
use crate::rng::{RngService, RngStream};

/// Per-source decision counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounters {
    /// Decisions requested from the source.
    pub decisions: u64,
    /// Decisions replaced by the fallback, for any reason.
    pub fallbacks: u64,
    /// Fallbacks caused by a missed deadline.
    pub timeouts: u64,
    /// Fallbacks caused by any other failure.
    pub errors: u64,
}

/// Credentials for external decision sources, keyed by source name.
///
/// Keys are never printed; the [`fmt::Debug`] output only lists which
/// sources have one.
#[derive(Default)]
pub struct ApiKeyStore {
    keys: RwLock<BTreeMap<String, String>>,
}

/// Environment variable prefix for per-source API keys.
pub const API_KEY_ENV_PREFIX: &str = "AGORA_API_KEY_";

impl ApiKeyStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a key for each of `sources` from `AGORA_API_KEY_<SOURCE>`, with
    /// the source name upper-cased and dashes turned into underscores.
    pub fn from_env<'a>(sources: impl IntoIterator<Item = &'a str>) -> Self {
        let store = Self::new();
        for source in sources {
            let var = format!(
                "{API_KEY_ENV_PREFIX}{}",
                source.to_uppercase().replace('-', "_")
            );
            if let Ok(key) = std::env::var(&var)
                && !key.is_empty()
            {
                store.set(source, key);
            }
        }
        store
    }

    /// Store or replace the key for `source`.
    pub fn set(&self, source: &str, key: String) {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.to_owned(), key);
    }

    /// The key for `source`, if any.
    pub fn get(&self, source: &str) -> Option<String> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
    }

    /// Forget the key for `source`. Returns whether one was stored.
    pub fn remove(&self, source: &str) -> bool {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(source)
            .is_some()
    }
}

impl fmt::Debug for ApiKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ApiKeyStore")
            .field("sources", &keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Shared, explicitly passed simulation context.
pub struct SimulationContext {
    config: SimulationConfig,
    sources: RwLock<BTreeMap<String, Arc<dyn DecisionSource>>>,
    strategies: Vec<Arc<dyn BaselineStrategy>>,
    fallback: Arc<dyn BaselineStrategy>,
    counters: Mutex<BTreeMap<String, SourceCounters>>,
    api_keys: Arc<ApiKeyStore>,
    rng: RngService,
    resolver: ActionResolver,
}

impl fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationContext")
            .field("sources", &self.source_names())
            .field("fallback", &self.fallback.name())
            .field("seed", &self.rng.seed())
            .finish_non_exhaustive()
    }
}

impl SimulationContext {
    /// A context with the four baseline strategies registered as sources
    /// under their own names and the configured fallback.
    pub fn new(config: SimulationConfig) -> Self {
        let rng = RngService::new(config.world.seed);
        let mut sources: BTreeMap<String, Arc<dyn DecisionSource>> = BTreeMap::new();
        let mut strategies = Vec::new();
        for kind in StrategyKind::ALL {
            let strategy = kind.build(&config.actions);
            strategies.push(Arc::clone(&strategy));
            sources.insert(
                kind.as_str().to_owned(),
                Arc::new(BaselineSource::new(strategy, rng)),
            );
        }
        let fallback = config.dispatch.fallback.build(&config.actions);
        strategies.push(Arc::clone(&fallback));
        let resolver = ActionResolver::new(config.actions.clone());

        info!(
            seed = config.world.seed,
            fallback = config.dispatch.fallback.as_str(),
            "Simulation context created"
        );

        Self {
            config,
            sources: RwLock::new(sources),
            strategies,
            fallback,
            counters: Mutex::new(BTreeMap::new()),
            api_keys: Arc::new(ApiKeyStore::new()),
            rng,
            resolver,
        }
    }

    /// Replace the API-key store.
    #[must_use]
    pub fn with_api_keys(mut self, api_keys: Arc<ApiKeyStore>) -> Self {
        self.api_keys = api_keys;
        self
    }

    /// Register (or replace) a decision source under its own name.
    pub fn register_source(&self, source: Arc<dyn DecisionSource>) {
        let name = source.name().to_owned();
        info!(source = %name, "Decision source registered");
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, source);
    }

    /// The source registered under `name`.
    pub fn source(&self, name: &str) -> Option<Arc<dyn DecisionSource>> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of every registered source.
    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// The fallback strategy's decision for `observation`, drawn from the
    /// fallback stream so it does not disturb the decision stream.
    pub fn fallback_decision(&self, observation: &Observation) -> Decision {
        let mut rng = self.rng.stream(
            observation.tick,
            observation.self_state.id,
            RngStream::Fallback,
        );
        self.fallback.decide(observation, &mut rng)
    }

    /// Name of the fallback strategy.
    pub fn fallback_name(&self) -> &'static str {
        self.fallback.name()
    }

    /// Count one decision request to `source`, and its failure kind if the
    /// fallback replaced it.
    pub fn record_decision(&self, source: &str, failure: Option<&str>) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = counters.entry(source.to_owned()).or_default();
        entry.decisions = entry.decisions.saturating_add(1);
        match failure {
            None => {}
            Some("timeout") => {
                entry.fallbacks = entry.fallbacks.saturating_add(1);
                entry.timeouts = entry.timeouts.saturating_add(1);
            }
            Some(_) => {
                entry.fallbacks = entry.fallbacks.saturating_add(1);
                entry.errors = entry.errors.saturating_add(1);
            }
        }
    }

    /// A copy of every source's counters.
    pub fn counters(&self) -> BTreeMap<String, SourceCounters> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget learned strategy state and zero the counters, as on reset.
    pub fn reset_strategies(&self) {
        for strategy in &self.strategies {
            strategy.reset();
        }
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The simulation configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The API-key store.
    pub fn api_keys(&self) -> &Arc<ApiKeyStore> {
        &self.api_keys
    }

    /// The RNG service.
    pub const fn rng(&self) -> &RngService {
        &self.rng
    }

    /// The action resolver.
    pub const fn resolver(&self) -> &ActionResolver {
        &self.resolver
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agora_types::ActionParams;
    use futures::FutureExt;
    use futures::future::BoxFuture;

    use super::*;
    use crate::baseline::test_support::observation_at;
    use crate::decision::DecisionError;

    struct Fixed;

    impl DecisionSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn decide<'a>(
            &'a self,
            _observation: &'a Observation,
        ) -> BoxFuture<'a, Result<Decision, DecisionError>> {
            futures::future::ready(Ok(Decision::new(ActionParams::Sleep))).boxed()
        }
    }

    #[test]
    fn baselines_are_registered_by_name() {
        let ctx = SimulationContext::new(SimulationConfig::default());
        assert_eq!(
            ctx.source_names(),
            vec!["q_learning", "random", "rule_based", "sugarscape"]
        );
        assert_eq!(ctx.fallback_name(), "rule_based");
        assert!(ctx.source("nope").is_none());

        ctx.register_source(Arc::new(Fixed));
        assert_eq!(ctx.source("fixed").unwrap().name(), "fixed");
    }

    #[test]
    fn fallback_is_reproducible() {
        let mut config = SimulationConfig::default();
        config.dispatch.fallback = StrategyKind::Random;
        let ctx = SimulationContext::new(config);
        let obs = observation_at(3, 3);
        assert_eq!(ctx.fallback_decision(&obs), ctx.fallback_decision(&obs));
    }

    #[test]
    fn counters_split_timeouts_from_errors() {
        let ctx = SimulationContext::new(SimulationConfig::default());
        ctx.record_decision("llm", None);
        ctx.record_decision("llm", Some("timeout"));
        ctx.record_decision("llm", Some("malformed"));
        let counters = ctx.counters()["llm"];
        assert_eq!(counters.decisions, 3);
        assert_eq!(counters.fallbacks, 2);
        assert_eq!(counters.timeouts, 1);
        assert_eq!(counters.errors, 1);

        ctx.reset_strategies();
        assert!(ctx.counters().is_empty());
    }

    #[test]
    fn api_keys_are_redacted_in_debug() {
        let keys = ApiKeyStore::new();
        keys.set("llm", "sk-secret".to_owned());
        assert_eq!(keys.get("llm").as_deref(), Some("sk-secret"));
        let printed = format!("{keys:?}");
        assert!(printed.contains("llm"));
        assert!(!printed.contains("sk-secret"));
        assert!(keys.remove("llm"));
        assert!(keys.get("llm").is_none());
    }
}
