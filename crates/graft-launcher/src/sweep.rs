//! Hyperparameter sweep fan-out
//!
//! Reads the optional `hparams` sub-config (itself instantiable, typically
//! name → list-of-candidates), computes the Cartesian product of all
//! declared candidate lists and invokes the remaining stages once per
//! combination, strictly sequentially, with the combination merged back
//! under the `hparams` key. Without hyperparameters the inner stages run
//! exactly once, unchanged.
//!
//! The run scope is cleared after every inner invocation (the documented
//! branch-boundary reset), so sibling branches never observe each other's
//! singletons or memoized lazy results. Teardown is best-effort: it runs
//! whether the branch succeeded or not, and only then does the branch's
//! own error propagate.

use crate::error::LaunchError;
use crate::stage::{LaunchContext, Next, Stage};
use graft_config::{merge, ConfigMap, ConfigValue};
use graft_runtime::{Scope, Value};

/// Key holding the hyperparameter table, and receiving each combination
pub const HPARAMS_KEY: &str = "hparams";

/// The sweep stage
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepStage;

impl SweepStage {
    /// Instantiate the `hparams` node into name → candidates tables.
    ///
    /// `None` means "no sweep": the key is absent or instantiates to an
    /// empty table.
    fn candidates(
        &self,
        config: &ConfigValue,
        context: &LaunchContext,
    ) -> Result<Option<ConfigMap>, LaunchError> {
        let Some(node) = config.get(HPARAMS_KEY) else {
            return Ok(None);
        };
        // Candidate generators run in a throwaway scope: they are not part
        // of any branch.
        let scope = Scope::new();
        let value = context.engine().instantiate(node, &scope)?;
        let table = value
            .try_into_config()
            .map_err(|_| LaunchError::invalid_hparams("candidates must be configuration data"))?;
        match table {
            ConfigValue::Map(map) if map.is_empty() => Ok(None),
            ConfigValue::Map(map) => Ok(Some(map)),
            other => Err(LaunchError::invalid_hparams(format!(
                "expected a mapping of candidate lists, got {}",
                other.kind()
            ))),
        }
    }

    fn teardown(&self, context: &LaunchContext) {
        // Best-effort: must never mask the branch's primary error.
        context.scope().clear();
        tracing::debug!("cleared scope at sweep-branch boundary");
    }
}

impl Stage for SweepStage {
    fn name(&self) -> &'static str {
        "sweep"
    }

    fn launch(
        &self,
        config: &ConfigValue,
        command: &str,
        next: Next<'_>,
    ) -> Result<Value, LaunchError> {
        let Some(table) = self.candidates(config, next.context())? else {
            let result = next.launch(config, command);
            self.teardown(next.context());
            return result;
        };

        let combinations = cartesian_product(&table)?;
        if combinations.is_empty() {
            tracing::warn!("a hyperparameter has no candidates, nothing to launch");
            return Ok(Value::Null);
        }
        tracing::info!(branches = combinations.len(), "sweeping hyperparameters");

        let mut last = Value::Null;
        for combination in combinations {
            for (name, value) in &combination {
                tracing::info!("- {name}: {value}");
            }
            let overrides = {
                let mut map = ConfigMap::new();
                map.insert(HPARAMS_KEY.to_string(), ConfigValue::Map(combination));
                ConfigValue::Map(map)
            };
            let branch = merge(config, &overrides, true)?;

            let result = next.launch(&branch, command);
            self.teardown(next.context());
            last = result?;
        }
        Ok(last)
    }
}

/// Cartesian product of the candidate lists, later names varying fastest
fn cartesian_product(table: &ConfigMap) -> Result<Vec<ConfigMap>, LaunchError> {
    let mut combinations: Vec<ConfigMap> = vec![ConfigMap::new()];
    for (name, candidates) in table {
        let ConfigValue::Seq(candidates) = candidates else {
            return Err(LaunchError::invalid_hparams(format!(
                "hyperparameter '{name}' must be a sequence of candidates, got {}",
                candidates.kind()
            )));
        };
        let mut extended = Vec::with_capacity(combinations.len() * candidates.len());
        for base in &combinations {
            for candidate in candidates {
                let mut combination = base.clone();
                combination.insert(name.clone(), candidate.clone());
                extended.push(combination);
            }
        }
        combinations = extended;
    }
    Ok(combinations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Pipeline;
    use graft_runtime::{Instantiator, Registry};
    use std::sync::{Arc, Mutex};

    /// Terminal stage collecting every branch config it observes
    #[derive(Debug, Default)]
    struct Recording {
        seen: Mutex<Vec<ConfigValue>>,
    }

    impl Stage for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn launch(
            &self,
            config: &ConfigValue,
            _command: &str,
            next: Next<'_>,
        ) -> Result<Value, LaunchError> {
            self.seen.lock().unwrap().push(config.clone());
            // Bind a singleton so cross-branch leakage would be visible.
            next.context()
                .scope()
                .bind("branch_witness", Value::Int(1))?;
            Ok(Value::Null)
        }
    }

    fn pipeline_with(recorder: Arc<Recording>) -> Pipeline {
        let engine = Instantiator::new(Arc::new(Registry::with_builtins()));
        Pipeline::new(
            vec![Arc::new(SweepStage), recorder],
            LaunchContext::new(engine),
        )
    }

    fn tree(value: serde_json::Value) -> ConfigValue {
        ConfigValue::from(value)
    }

    #[test]
    fn no_hparams_launches_once_unchanged() {
        let recorder = Arc::new(Recording::default());
        let pipeline = pipeline_with(Arc::clone(&recorder));
        let config = tree(serde_json::json!({"x": 1}));
        pipeline.launch(&config, "").unwrap();
        assert_eq!(recorder.seen.lock().unwrap().as_slice(), &[config]);
    }

    #[test]
    fn cartesian_fan_out() {
        let recorder = Arc::new(Recording::default());
        let pipeline = pipeline_with(Arc::clone(&recorder));
        let config = tree(serde_json::json!({
            "hparams": {"a": [1, 2], "b": [10, 20]},
            "fixed": true
        }));
        pipeline.launch(&config, "").unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 4, "2 x 2 combinations");
        let picks: Vec<(i64, i64)> = seen
            .iter()
            .map(|branch| {
                let hp = branch.get(HPARAMS_KEY).unwrap();
                (
                    hp.get("a").and_then(ConfigValue::as_int).unwrap(),
                    hp.get("b").and_then(ConfigValue::as_int).unwrap(),
                )
            })
            .collect();
        assert_eq!(picks, vec![(1, 10), (1, 20), (2, 10), (2, 20)]);
        // Unrelated keys survive the merge.
        assert!(seen
            .iter()
            .all(|branch| branch.get("fixed") == Some(&ConfigValue::Bool(true))));
    }

    #[test]
    fn scope_cleared_between_branches() {
        // The recording stage binds the same singleton key in every branch:
        // without the boundary clear the second branch would conflict.
        let recorder = Arc::new(Recording::default());
        let pipeline = pipeline_with(Arc::clone(&recorder));
        let config = tree(serde_json::json!({"hparams": {"a": [1, 2]}}));
        pipeline.launch(&config, "").unwrap();
        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn non_sequence_candidates_rejected() {
        let recorder = Arc::new(Recording::default());
        let pipeline = pipeline_with(recorder);
        let result = pipeline.launch(&tree(serde_json::json!({"hparams": {"a": 3}})), "");
        assert!(matches!(result, Err(LaunchError::InvalidHparams { .. })));
    }

    #[test]
    fn empty_candidate_list_launches_nothing() {
        let recorder = Arc::new(Recording::default());
        let pipeline = pipeline_with(Arc::clone(&recorder));
        let result = pipeline
            .launch(&tree(serde_json::json!({"hparams": {"a": []}})), "")
            .unwrap();
        assert_eq!(result, Value::Null);
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn branch_error_propagates_after_teardown() {
        #[derive(Debug)]
        struct Failing;
        impl Stage for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }
            fn launch(
                &self,
                _config: &ConfigValue,
                _command: &str,
                next: Next<'_>,
            ) -> Result<Value, LaunchError> {
                next.context().scope().bind("leak", Value::Int(1))?;
                Err(LaunchError::invalid_hparams("branch failure"))
            }
        }

        let engine = Instantiator::new(Arc::new(Registry::with_builtins()));
        let context = LaunchContext::new(engine);
        let scope = Arc::clone(context.scope());
        let pipeline = Pipeline::new(vec![Arc::new(SweepStage), Arc::new(Failing)], context);
        let result = pipeline.launch(&tree(serde_json::json!({"hparams": {"a": [1]}})), "");
        assert!(result.is_err(), "primary error preserved");
        assert!(scope.is_empty(), "teardown ran despite the failure");
    }
}
