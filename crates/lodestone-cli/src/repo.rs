use std::sync::Arc;

use lodestone_core::RepositoryManager;
use lodestone_utils::time::now_secs;
use nu_ansi_term::Color::{Blue, Cyan, Green, Red, Yellow};
use tabled::{
    builder::Builder,
    settings::{peaker::PriorityMax, themes::BorderCorrection, Panel, Style, Width},
};
use tracing::{info, warn};

use crate::{
    cli::RepoAction,
    utils::{blocking, format_age, json_output, term_width, Colored, Icons},
};

pub async fn handle_repo(
    manager: Arc<RepositoryManager>,
    action: RepoAction,
) -> miette::Result<()> {
    match action {
        RepoAction::Add {
            name,
            url,
            id,
            token,
        } => add_repository(manager, name, url, id, token).await,
        RepoAction::Remove {
            id,
        } => {
            let removed = {
                let id = id.clone();
                blocking(move || manager.remove(&id)).await?
            };
            if removed {
                info!("Removed repository {}", Colored(Cyan, &id));
            } else {
                warn!("Repository '{}' is not registered", id);
            }
            Ok(())
        }
        RepoAction::List => {
            list_repositories(&manager);
            Ok(())
        }
        RepoAction::Enable {
            id,
        } => set_enabled(manager, id, true).await,
        RepoAction::Disable {
            id,
        } => set_enabled(manager, id, false).await,
        RepoAction::Token {
            id,
            token,
        } => {
            let cleared = token.as_deref().is_none_or(|t| t.trim().is_empty());
            {
                let id = id.clone();
                blocking(move || manager.set_auth_token(&id, token)).await?;
            }
            if cleared {
                info!("Cleared token of {}", Colored(Cyan, &id));
            } else {
                info!("Updated token of {}", Colored(Cyan, &id));
            }
            Ok(())
        }
    }
}

async fn add_repository(
    manager: Arc<RepositoryManager>,
    name: String,
    url: String,
    id: Option<String>,
    token: Option<String>,
) -> miette::Result<()> {
    let outcome =
        blocking(move || manager.register(id.as_deref(), &name, &url, token)).await?;

    info!(
        repo_id = outcome.id,
        synced = outcome.synced,
        "Added repository {}",
        Colored(Cyan, &outcome.id)
    );
    if !outcome.synced {
        warn!(
            "Initial sync of '{}' failed; run `lodestone sync {}` to retry",
            outcome.id, outcome.id
        );
    }
    Ok(())
}

async fn set_enabled(
    manager: Arc<RepositoryManager>,
    id: String,
    enabled: bool,
) -> miette::Result<()> {
    {
        let id = id.clone();
        blocking(move || manager.set_enabled(&id, enabled)).await?;
    }
    info!(
        "{} {}",
        if enabled { "Enabled" } else { "Disabled" },
        Colored(Cyan, &id)
    );
    Ok(())
}

fn list_repositories(manager: &RepositoryManager) {
    let now = now_secs();
    let stale_after = manager.settings().stale_after_secs;
    let entries = manager.list();

    for entry in &entries {
        let repo = &entry.repository;
        let state = if !repo.enabled {
            Colored(Yellow, Icons::DISABLED)
        } else if entry.needs_update(now, stale_after) {
            Colored(Red, Icons::WARNING)
        } else {
            Colored(Green, Icons::CHECK)
        };

        info!(
            repo_id = repo.id,
            repo_name = repo.name,
            url = repo.url,
            enabled = repo.enabled,
            authenticated = repo.bearer_token().is_some(),
            packages = entry.listing.len(),
            last_updated = entry.last_updated,
            "[{}] {} ({}) {} {} | {} packages | synced {}",
            state,
            Colored(Cyan, &repo.id),
            repo.name,
            Icons::ARROW,
            Colored(Blue, &repo.url),
            entry.listing.len(),
            format_age(entry.last_updated, now)
        );
    }

    if json_output() {
        return;
    }

    let enabled = entries.iter().filter(|e| e.repository.enabled).count();
    let stale = entries
        .iter()
        .filter(|e| e.repository.enabled && e.needs_update(now, stale_after))
        .count();

    let mut builder = Builder::new();
    builder.push_record([
        format!("{} Repositories", Icons::PACKAGE),
        format!("{}", Colored(Cyan, entries.len())),
    ]);
    builder.push_record([
        format!("{} Enabled", Icons::CHECK),
        format!("{}", Colored(Green, enabled)),
    ]);
    builder.push_record([
        format!("{} Stale", Icons::WARNING),
        format!("{}", Colored(Yellow, stale)),
    ]);

    let table = builder
        .build()
        .with(Panel::header("Repositories"))
        .with(Style::rounded())
        .with(BorderCorrection {})
        .with(Width::wrap(term_width()).priority(PriorityMax::default()))
        .to_string();

    info!("\n{table}");
}
