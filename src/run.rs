// Run orchestration: preflight, inventory, collection, environments, in
// that order. Only preflight and (in closed mode) the inventory fetch can
// abort a run; everything else ends up as an outcome in the report.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::api::Transport;
use crate::config::{FetchFailureMode, SyncConfig};
use crate::inventory::{fetch_inventory, Inventory};
use crate::sync::{sync_collection, sync_environments, Action, Kind, StepOutcome};

/// Progress hooks called while a run advances. Every method defaults to
/// doing nothing.
pub trait Reporter {
    fn fetch_started(&mut self) {}
    fn fetch_finished(&mut self, _inventory: &Inventory) {}
    fn section(&mut self, _kind: Kind) {}
    fn step(&mut self, _outcome: &StepOutcome) {}
}

impl Reporter for () {}

/// Every outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub collection: StepOutcome,
    pub environments: Vec<StepOutcome>,
}

impl SyncReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &StepOutcome> {
        std::iter::once(&self.collection).chain(self.environments.iter())
    }

    pub fn created(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                StepOutcome::Synced {
                    action: Action::Created,
                    ..
                }
            )
        })
    }

    pub fn updated(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                StepOutcome::Synced {
                    action: Action::Updated { .. },
                    ..
                }
            )
        })
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed { .. }))
    }

    /// True when every resource was synced.
    pub fn is_clean(&self) -> bool {
        self.skipped() == 0 && self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.outcomes().filter(|o| pred(o)).count()
    }
}

/// Sync everything `config` names from `dir` to the remote service.
pub fn run<T: Transport + ?Sized>(
    transport: &T,
    config: &SyncConfig,
    dir: &Path,
    mode: FetchFailureMode,
    reporter: &mut dyn Reporter,
) -> Result<SyncReport> {
    config.preflight(dir)?;

    reporter.fetch_started();
    let inventory = fetch_inventory(transport, mode).context("Failed to fetch existing items")?;
    reporter.fetch_finished(&inventory);

    reporter.section(Kind::Collection);
    let collection = sync_collection(transport, dir, &config.collection, &inventory);
    reporter.step(&collection);

    reporter.section(Kind::Environment);
    let environments = sync_environments(transport, dir, &config.environments, &inventory, |o| {
        reporter.step(o)
    });

    let report = SyncReport {
        collection,
        environments,
    };
    info!(
        created = report.created(),
        updated = report.updated(),
        skipped = report.skipped(),
        failed = report.failed(),
        "sync finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, Method};
    use crate::test_support::FakeTransport;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn workspace(config: &SyncConfig) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(&config.collection.file),
            json!({"info": {"name": "Local", "schema": "x"}, "item": []}).to_string(),
        )
        .unwrap();
        for env in &config.environments {
            std::fs::write(
                dir.path().join(&env.file),
                json!({"name": "local", "values": [{"key": "k", "value": "v", "enabled": true}]})
                    .to_string(),
            )
            .unwrap();
        }
        dir
    }

    fn full_inventory(config: &SyncConfig) -> (Value, Value) {
        let collections = json!({"collections": [{"uid": "col-1", "name": config.collection.name}]});
        let environments: Vec<Value> = config
            .environments
            .iter()
            .enumerate()
            .map(|(i, e)| json!({"uid": format!("env-{i}"), "name": e.name}))
            .collect();
        (collections, json!({ "environments": environments }))
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl Reporter for Recorder {
        fn fetch_started(&mut self) {
            self.0.push("fetch".into());
        }
        fn section(&mut self, kind: Kind) {
            self.0.push(format!("{kind:?}"));
        }
        fn step(&mut self, outcome: &StepOutcome) {
            self.0.push(outcome.name().to_string());
        }
    }

    #[test]
    fn empty_remote_creates_everything() {
        let config = SyncConfig::default();
        let dir = workspace(&config);
        let transport = FakeTransport::new();

        let report = run(&transport, &config, dir.path(), FetchFailureMode::Open, &mut ()).unwrap();

        assert_eq!(report.created(), 5);
        assert_eq!(report.updated(), 0);
        let writes = transport.writes();
        assert_eq!(writes.len(), 5);
        assert!(writes.iter().all(|c| c.method == Method::Post));
        assert_eq!(writes[0].path, "/collections");
        assert_eq!(writes[0].json()["collection"]["info"]["name"], "Syllaby API Collection");
        let env_names: Vec<_> = writes[1..]
            .iter()
            .map(|c| c.json()["environment"]["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            env_names,
            [
                "Syllaby Local Development",
                "Syllaby Development",
                "Syllaby Staging",
                "Syllaby Production"
            ]
        );
    }

    #[test]
    fn existing_remote_updates_everything() {
        let config = SyncConfig::default();
        let dir = workspace(&config);
        let (collections, environments) = full_inventory(&config);
        let transport = FakeTransport::new()
            .on_get("/collections", collections)
            .on_get("/environments", environments);

        let report = run(&transport, &config, dir.path(), FetchFailureMode::Open, &mut ()).unwrap();

        assert_eq!(report.updated(), 5);
        assert_eq!(report.created(), 0);
        let paths: Vec<_> = transport.writes().into_iter().map(|c| c.path).collect();
        assert_eq!(
            paths,
            [
                "/collections/col-1",
                "/environments/env-0",
                "/environments/env-1",
                "/environments/env-2",
                "/environments/env-3"
            ]
        );
        assert!(transport.writes().iter().all(|c| c.method == Method::Put));
    }

    #[test]
    fn missing_file_aborts_before_any_call() {
        let config = SyncConfig::default();
        let dir = workspace(&config);
        std::fs::remove_file(dir.path().join(&config.environments[2].file)).unwrap();
        let transport = FakeTransport::new();

        let err = run(&transport, &config, dir.path(), FetchFailureMode::Open, &mut ()).unwrap_err();

        assert!(err.to_string().contains("syllaby-staging-environment.json"));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn fetch_failure_open_falls_back_to_creates() {
        let config = SyncConfig::default();
        let dir = workspace(&config);
        let (collections, _) = full_inventory(&config);
        let transport = FakeTransport::new()
            .on_get("/collections", collections)
            .fail_get("/environments", || ApiError::Api {
                status: 500,
                message: "boom".into(),
            });

        let report = run(&transport, &config, dir.path(), FetchFailureMode::Open, &mut ()).unwrap();

        assert_eq!(report.created(), 5);
        assert!(transport.writes().iter().all(|c| c.method == Method::Post));
    }

    #[test]
    fn fetch_failure_closed_aborts_without_writes() {
        let config = SyncConfig::default();
        let dir = workspace(&config);
        let transport = FakeTransport::new().fail_get("/collections", || ApiError::Api {
            status: 401,
            message: "Invalid API Key".into(),
        });

        let err = run(&transport, &config, dir.path(), FetchFailureMode::Closed, &mut ()).unwrap_err();

        assert!(format!("{err:#}").contains("Invalid API Key"));
        assert!(transport.writes().is_empty());
    }

    #[test]
    fn partial_failures_still_complete_the_run() {
        let config = SyncConfig::default();
        let dir = workspace(&config);
        std::fs::write(dir.path().join(&config.environments[0].file), "{").unwrap();
        let transport = FakeTransport::new().fail_write("/collections", || ApiError::Parse {
            reason: "bad".into(),
        });

        let report = run(&transport, &config, dir.path(), FetchFailureMode::Open, &mut ()).unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.created(), 3);
        assert!(!report.is_clean());
    }

    #[test]
    fn second_run_only_updates() {
        let config = SyncConfig::default();
        let dir = workspace(&config);

        let first = FakeTransport::new();
        run(&first, &config, dir.path(), FetchFailureMode::Open, &mut ()).unwrap();

        // Feed what the first run created back in as the remote state.
        let created = first.writes();
        let collections = json!({"collections": [{
            "uid": "c-new",
            "name": created[0].json()["collection"]["info"]["name"]
        }]});
        let environments: Vec<Value> = created[1..]
            .iter()
            .enumerate()
            .map(|(i, c)| json!({"uid": format!("e-new-{i}"), "name": c.json()["environment"]["name"]}))
            .collect();
        let second = FakeTransport::new()
            .on_get("/collections", collections)
            .on_get("/environments", json!({ "environments": environments }));

        let report = run(&second, &config, dir.path(), FetchFailureMode::Open, &mut ()).unwrap();

        assert_eq!(report.created(), 0);
        assert_eq!(report.updated(), 5);
        assert!(report.is_clean());
    }

    #[test]
    fn reporter_sees_steps_in_order() {
        let config = SyncConfig::default();
        let dir = workspace(&config);
        let mut recorder = Recorder::default();

        run(&FakeTransport::new(), &config, dir.path(), FetchFailureMode::Open, &mut recorder).unwrap();

        assert_eq!(
            recorder.0,
            [
                "fetch",
                "Collection",
                "Syllaby API Collection",
                "Environment",
                "Syllaby Local Development",
                "Syllaby Development",
                "Syllaby Staging",
                "Syllaby Production"
            ]
        );
    }
}
