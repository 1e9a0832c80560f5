// Remote inventory: the collections and environments that already exist,
// used only to decide between create and update.

use serde::Deserialize;
use serde_json::Value;
use std::thread;
use tracing::{debug, error, warn};

use crate::api::{ApiError, Method, Transport};
use crate::config::FetchFailureMode;

/// Identifier and display name of a remote resource. Other listing
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteSummary {
    pub uid: String,
    pub name: String,
}

impl RemoteSummary {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        RemoteSummary {
            uid: uid.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub collections: Vec<RemoteSummary>,
    pub environments: Vec<RemoteSummary>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.environments.is_empty()
    }
}

/// All entries whose name equals `name` exactly, in listing order.
pub fn matching<'a>(list: &'a [RemoteSummary], name: &str) -> Vec<&'a RemoteSummary> {
    list.iter().filter(|s| s.name == name).collect()
}

/// List remote collections and environments with two concurrent calls.
///
/// In [`FetchFailureMode::Open`] any failure is logged and an empty
/// inventory is returned, even when the other call succeeded. In
/// [`FetchFailureMode::Closed`] the first error is returned.
pub fn fetch_inventory<T: Transport + ?Sized>(
    transport: &T,
    mode: FetchFailureMode,
) -> Result<Inventory, ApiError> {
    let (collections, environments) = thread::scope(|s| {
        let collections = s.spawn(|| list(transport, "/collections", "collections"));
        let environments = list(transport, "/environments", "environments");
        (join(collections), environments)
    });

    match collections.and_then(|c| environments.map(|e| (c, e))) {
        Ok((collections, environments)) => {
            debug!(
                collections = collections.len(),
                environments = environments.len(),
                "fetched remote inventory"
            );
            Ok(Inventory {
                collections,
                environments,
            })
        }
        Err(e) => match mode {
            FetchFailureMode::Open => {
                error!("Failed to fetch existing items: {e}");
                Ok(Inventory::default())
            }
            FetchFailureMode::Closed => Err(e),
        },
    }
}

fn join(
    handle: thread::ScopedJoinHandle<'_, Result<Vec<RemoteSummary>, ApiError>>,
) -> Result<Vec<RemoteSummary>, ApiError> {
    match handle.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn list<T: Transport + ?Sized>(
    transport: &T,
    path: &str,
    field: &str,
) -> Result<Vec<RemoteSummary>, ApiError> {
    let response = transport.request(Method::Get, path, None)?;
    summaries(response, field)
}

/// Read `field` out of a listing response. A missing or null field is an
/// empty list. Entries without a string uid and name can never match a
/// target, so they are dropped with a warning and the rest are kept.
fn summaries(mut response: Value, field: &str) -> Result<Vec<RemoteSummary>, ApiError> {
    let items = match response.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ApiError::Parse {
                reason: format!("`{field}` listing is not an array"),
            })
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<RemoteSummary>(item) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(field, index = i, "ignoring malformed listing entry: {e}");
                None
            }
        })
        .collect())
}
