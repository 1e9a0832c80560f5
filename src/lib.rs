// Library root
// -----------
// Pushes a local Postman collection and a set of environment files to the
// Postman API, creating or updating each one by display name. The binary
// (`main.rs`) wires these modules together.
//
// Module responsibilities:
// - `api`: one-shot HTTP requests and their classified errors.
// - `config`: the file-to-name mapping, API key lookup, fetch failure mode.
// - `inventory`: listing what already exists remotely.
// - `sync`: create-or-update of the collection and each environment.
// - `run`: ordering of the steps and the final report.
// - `routes`: backend route coverage of the collection (`postman-routes`).
// - `ui`: terminal output.
pub mod api;
pub mod config;
pub mod inventory;
pub mod routes;
pub mod run;
pub mod sync;
pub mod ui;

#[cfg(test)]
mod test_support;
