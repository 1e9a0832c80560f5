// UI layer: human-readable progress on stdout. A spinner runs while the
// inventory is being listed; each synced resource gets one line.

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::inventory::Inventory;
use crate::routes::{categorize, Route, RouteReport};
use crate::run::{Reporter, SyncReport};
use crate::sync::{Action, Kind, StepOutcome};

/// Prints progress to the terminal.
#[derive(Default)]
pub struct Console {
    spinner: Option<ProgressBar>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn banner(&self) {
        println!("{}", "🚀 Syllaby Postman Sync".bold());
        println!("=======================");
    }

    /// Final summary plus the hint for what to do in Postman next.
    pub fn summary(&self, report: &SyncReport) {
        let counts = format!(
            "{} created, {} updated, {} skipped, {} failed",
            report.created(),
            report.updated(),
            report.skipped(),
            report.failed()
        );
        if report.is_clean() {
            println!("\n{} ({counts})", "✅ Sync complete!".green().bold());
        } else {
            println!("\n{} ({counts})", "⚠️  Sync finished with problems".yellow().bold());
        }
        println!("\n📌 Next steps:");
        println!("   1. Open Postman");
        println!("   2. Your collection and environments should be updated");
        println!("   3. Select the appropriate environment from the dropdown");
    }
}

impl Reporter for Console {
    fn fetch_started(&mut self) {
        println!("📋 Fetching existing items from Postman...");
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Listing collections and environments...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn fetch_finished(&mut self, inventory: &Inventory) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        println!("{}", inventory_line(inventory));
    }

    fn section(&mut self, kind: Kind) {
        match kind {
            Kind::Collection => println!("\n📤 Syncing collection..."),
            Kind::Environment => println!("\n📤 Syncing environments..."),
        }
    }

    fn step(&mut self, outcome: &StepOutcome) {
        println!("{}", step_line(outcome));
    }
}

fn inventory_line(inventory: &Inventory) -> String {
    if inventory.is_empty() {
        return "   Nothing found remotely; every item will be created".to_string();
    }
    format!(
        "   Found {} collection(s), {} environment(s)",
        inventory.collections.len(),
        inventory.environments.len()
    )
}

fn step_line(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Synced { kind, name, action } => {
            let verb = match action {
                Action::Created => "created".to_string(),
                Action::Updated { uid } => format!("updated {uid}"),
            };
            match kind {
                Kind::Collection => format!("   {} Collection synced: {name} ({verb})", "✅".green()),
                Kind::Environment => format!("   {} {name} ({verb})", "✅".green()),
            }
        }
        StepOutcome::Skipped { name, reason, .. } => {
            format!("   {} Skipped {name}: {reason}", "⚠️ ".yellow())
        }
        StepOutcome::Failed { kind, name, reason } => {
            let what = match kind {
                Kind::Collection => "collection".to_string(),
                Kind::Environment => name.clone(),
            };
            format!("   {} Failed to sync {what}: {reason}", "❌".red())
        }
    }
}

/// Usage hint printed when no API key could be found.
pub fn missing_credential() {
    eprintln!("{}", "❌ No API key provided!".red());
    eprintln!("\nUsage:");
    eprintln!("  POSTMAN_API_KEY=your-key postman-sync");
    eprintln!("  or");
    eprintln!("  postman-sync your-api-key");
    eprintln!("\nGet your API key from: https://web.postman.co/settings/me/api-keys");
}

/// Report an error that ended the run.
pub fn fatal(err: &anyhow::Error) {
    eprintln!("\n{} {err:#}", "❌ Sync failed:".red());
}

/// Print a route coverage report, grouped by first path segment.
pub fn route_report(report: &RouteReport) {
    println!("{}", "🔍 Analyzing backend routes vs Postman collection...".bold());
    println!("{}", "=".repeat(60));
    println!("📋 Backend routes found: {}", report.expected_total);
    println!("📋 Postman endpoints found: {}", report.documented_total);
    println!();
    println!("❌ Missing in Postman: {}", report.missing.len());
    println!("➕ Extra in Postman: {}", report.extra.len());

    if !report.missing.is_empty() {
        println!("\n{}", "🚨 MISSING ENDPOINTS IN POSTMAN COLLECTION:".red().bold());
        print!("{}", route_sections(&report.missing));
    }
    if !report.extra.is_empty() {
        println!("\n{}", "➕ EXTRA ENDPOINTS IN POSTMAN (not in backend):".yellow().bold());
        print!("{}", route_sections(&report.extra));
    }

    println!("\n📊 SUMMARY:");
    println!("   Total backend routes: {}", report.expected_total);
    println!("   Total Postman endpoints: {}", report.documented_total);
    println!("   Missing in Postman: {}", report.missing.len());
    println!("   Extra in Postman: {}", report.extra.len());
}

fn route_sections(routes: &std::collections::BTreeSet<Route>) -> String {
    let mut out = String::from("=".repeat(50));
    out.push('\n');
    for (category, routes) in categorize(routes) {
        out.push_str(&format!("\n📁 {}:\n", category.to_uppercase()));
        for route in routes {
            out.push_str(&format!("   {:<7} {}\n", route.method, route.path));
        }
    }
    out
}
