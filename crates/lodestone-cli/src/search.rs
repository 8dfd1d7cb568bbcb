use std::sync::Arc;

use lodestone_core::RepositoryManager;
use lodestone_registry::PackageRecord;
use miette::IntoDiagnostic;
use nu_ansi_term::Color::{Blue, Cyan, Green, LightRed, Magenta, Red};
use tabled::{
    builder::Builder,
    settings::{peaker::PriorityMax, themes::BorderCorrection, Panel, Style, Width},
};
use tracing::{debug, info};

use crate::utils::{blocking, json_output, term_width, Colored, Icons};

fn versions(record: &PackageRecord) -> String {
    record
        .mc_versions
        .as_ref()
        .map(|v| v.join(", "))
        .unwrap_or_default()
}

pub fn search_packages(
    manager: &RepositoryManager,
    query: &str,
    mc_version: Option<&str>,
    limit: Option<usize>,
) {
    debug!(query = query, mc_version = ?mc_version, limit = ?limit, "searching packages");

    let results = manager.search(query, mc_version);
    let total = results.len();
    let shown = limit.unwrap_or(total).min(total);

    for entry in results.iter().take(shown) {
        let package = &entry.record;
        info!(
            pkg_id = package.id,
            pkg_name = package.name,
            repo_id = entry.repository.id,
            author = package.author,
            description = package.description,
            mc_versions = versions(package),
            "{}#{}:{} | {} | {} - {}",
            Colored(Blue, &package.name),
            Colored(Cyan, &package.id),
            Colored(Green, &entry.repository.id),
            Colored(LightRed, &package.author),
            Colored(Magenta, versions(package)),
            package.description
        );
    }

    if json_output() {
        return;
    }

    if total == 0 && manager.list_enabled().iter().all(|e| e.listing.is_empty()) {
        info!(
            "No listings loaded. Run {} first",
            Colored(Green, "lodestone sync")
        );
        return;
    }

    let mut builder = Builder::new();
    builder.push_record([
        format!("{} Found", Icons::PACKAGE),
        format!(
            "{} (showing {})",
            Colored(Cyan, total),
            Colored(Green, shown)
        ),
    ]);

    let table = builder
        .build()
        .with(Panel::header("Search Results"))
        .with(Style::rounded())
        .with(BorderCorrection {})
        .to_string();

    info!("\n{table}");
}

pub async fn query_package(
    manager: Arc<RepositoryManager>,
    repo: String,
    package: String,
) -> miette::Result<()> {
    debug!(repo = repo, package = package, "querying package info");

    let record = blocking(move || manager.get_details(&repo, &package)).await?;

    if json_output() {
        let json = serde_json::to_string(&record).into_diagnostic()?;
        info!("{json}");
        return Ok(());
    }

    let mut builder = Builder::new();
    builder.push_record([
        format!("{} Name", Icons::PACKAGE),
        format!(
            "{}#{}",
            Colored(Blue, &record.name),
            Colored(Cyan, &record.id)
        ),
    ]);
    builder.push_record(["Author".to_string(), record.author.clone()]);
    builder.push_record(["Description".to_string(), record.description.clone()]);
    builder.push_record(["Game Versions".to_string(), versions(&record)]);
    builder.push_record([
        "Download".to_string(),
        match record.download_url.as_deref() {
            Some(url) => format!("{}", Colored(Blue, url)),
            None => format!("{}", Colored(Red, "not available")),
        },
    ]);
    if let Some(hash) = record.file_hash.as_deref() {
        builder.push_record(["SHA-256".to_string(), hash.to_string()]);
    }
    for (key, value) in &record.extra {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        builder.push_record([key.clone(), value]);
    }

    let table = builder
        .build()
        .with(Panel::header("Modpack Info"))
        .with(Style::rounded())
        .with(BorderCorrection {})
        .with(Width::wrap(term_width()).priority(PriorityMax::default()))
        .to_string();

    info!("\n{table}");
    Ok(())
}
