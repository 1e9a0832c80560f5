// Collection and environment synchronizers. Each resource is loaded from
// disk, matched by display name against the inventory, then created or
// updated with a single call. Failures are returned as outcomes instead
// of aborting the run.

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, Method, Transport};
use crate::config::Target;
use crate::inventory::{matching, Inventory, RemoteSummary};

/// A local definition file that could not be used.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected content in {}: {reason}", path.display())]
    Shape { path: PathBuf, reason: String },
}

/// The two kinds of remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Collection,
    Environment,
}

impl Kind {
    fn endpoint(self) -> &'static str {
        match self {
            Kind::Collection => "/collections",
            Kind::Environment => "/environments",
        }
    }

    /// Key wrapping the payload in request bodies.
    fn wrapper(self) -> &'static str {
        match self {
            Kind::Collection => "collection",
            Kind::Environment => "environment",
        }
    }
}

/// What was done remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated { uid: String },
}

/// Result of syncing one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Synced { kind: Kind, name: String, action: Action },
    /// The local file could not be loaded; nothing was sent.
    Skipped { kind: Kind, name: String, reason: String },
    /// The remote call failed.
    Failed { kind: Kind, name: String, reason: String },
}

impl StepOutcome {
    pub fn name(&self) -> &str {
        match self {
            StepOutcome::Synced { name, .. }
            | StepOutcome::Skipped { name, .. }
            | StepOutcome::Failed { name, .. } => name,
        }
    }
}

/// Create-or-update decision for one target name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Create,
    Update { uid: String },
}

impl Plan {
    /// No match creates, one match updates it. Several matches update the
    /// first in listing order; the rest are reported and left untouched.
    pub fn for_target(existing: &[RemoteSummary], name: &str) -> Plan {
        let matches = matching(existing, name);
        match matches.as_slice() {
            [] => Plan::Create,
            [first, rest @ ..] => {
                if !rest.is_empty() {
                    let others: Vec<&str> = rest.iter().map(|s| s.uid.as_str()).collect();
                    warn!(
                        name,
                        chosen = %first.uid,
                        ignored = ?others,
                        "several remote resources share this name; updating the first"
                    );
                }
                Plan::Update {
                    uid: first.uid.clone(),
                }
            }
        }
    }

    fn method(&self) -> Method {
        match self {
            Plan::Create => Method::Post,
            Plan::Update { .. } => Method::Put,
        }
    }

    fn path(&self, kind: Kind) -> String {
        match self {
            Plan::Create => kind.endpoint().to_string(),
            Plan::Update { uid } => format!("{}/{}", kind.endpoint(), uid),
        }
    }

    fn action(self) -> Action {
        match self {
            Plan::Create => Action::Created,
            Plan::Update { uid } => Action::Updated { uid },
        }
    }
}

fn load_json(path: &Path) -> Result<Value, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a collection file and rename it: `info.name` becomes `name`,
/// everything else is kept as is.
pub fn collection_payload(path: &Path, name: &str) -> Result<Value, LoadError> {
    let mut collection = load_json(path)?;
    let shape = |reason: &str| LoadError::Shape {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let info = collection
        .as_object_mut()
        .ok_or_else(|| shape("collection must be a JSON object"))?
        .entry("info")
        .or_insert_with(|| Value::Object(Map::new()));
    let info = info
        .as_object_mut()
        .ok_or_else(|| shape("`info` must be an object"))?;
    info.insert("name".into(), Value::String(name.to_string()));

    Ok(json!({ "collection": collection }))
}

/// Load an environment file and keep only its `values` under `name`.
pub fn environment_payload(path: &Path, name: &str) -> Result<Value, LoadError> {
    let mut env = load_json(path)?;
    let values = match env.get_mut("values").map(Value::take) {
        Some(values @ Value::Array(_)) => values,
        _ => {
            return Err(LoadError::Shape {
                path: path.to_path_buf(),
                reason: "environment needs a `values` array".into(),
            })
        }
    };

    Ok(json!({ "environment": { "name": name, "values": values } }))
}

fn push<T: Transport + ?Sized>(
    transport: &T,
    kind: Kind,
    plan: &Plan,
    payload: &Value,
) -> Result<Value, ApiError> {
    transport.request(plan.method(), &plan.path(kind), Some(&payload.to_string()))
}

fn sync_one<T: Transport + ?Sized>(
    transport: &T,
    kind: Kind,
    path: &Path,
    target: &Target,
    existing: &[RemoteSummary],
    load: fn(&Path, &str) -> Result<Value, LoadError>,
) -> StepOutcome {
    let name = target.name.clone();
    let payload = match load(path, &target.name) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(%name, "skipping: {e}");
            return StepOutcome::Skipped {
                kind,
                name,
                reason: e.to_string(),
            };
        }
    };

    let plan = Plan::for_target(existing, &target.name);
    debug!(%name, ?plan, "syncing {}", kind.wrapper());
    match push(transport, kind, &plan, &payload) {
        Ok(_) => {
            info!(%name, ?plan, "synced {}", kind.wrapper());
            StepOutcome::Synced {
                kind,
                name,
                action: plan.action(),
            }
        }
        Err(e) => {
            warn!(%name, "sync failed: {e}");
            StepOutcome::Failed {
                kind,
                name,
                reason: e.to_string(),
            }
        }
    }
}

/// Create or update the collection.
pub fn sync_collection<T: Transport + ?Sized>(
    transport: &T,
    dir: &Path,
    target: &Target,
    inventory: &Inventory,
) -> StepOutcome {
    sync_one(
        transport,
        Kind::Collection,
        &target.path_in(dir),
        target,
        &inventory.collections,
        collection_payload,
    )
}

/// Create or update each environment in order, one call at a time. A
/// failure on one entry does not stop the ones after it.
pub fn sync_environments<T: Transport + ?Sized>(
    transport: &T,
    dir: &Path,
    targets: &[Target],
    inventory: &Inventory,
    mut on_step: impl FnMut(&StepOutcome),
) -> Vec<StepOutcome> {
    targets
        .iter()
        .map(|target| {
            let outcome = sync_one(
                transport,
                Kind::Environment,
                &target.path_in(dir),
                target,
                &inventory.environments,
                environment_payload,
            );
            on_step(&outcome);
            outcome
        })
        .collect()
}
