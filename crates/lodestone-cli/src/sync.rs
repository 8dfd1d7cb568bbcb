use std::{collections::HashMap, sync::Arc};

use lodestone_core::{LodestoneError, RepositoryManager};
use nu_ansi_term::Color::{Cyan, Green, Red};
use tracing::{info, warn};

use crate::{
    progress::create_spinner_job,
    utils::{blocking, Colored, Icons},
};

pub async fn sync_repositories(
    manager: Arc<RepositoryManager>,
    id: Option<String>,
    stale_only: bool,
) -> miette::Result<()> {
    let spinner = create_spinner_job("Syncing repositories");

    let outcomes: HashMap<String, bool> = {
        let manager = manager.clone();
        blocking(move || {
            Ok(match id {
                Some(id) => {
                    if manager.get(&id).is_none_or(|e| !e.repository.enabled) {
                        return Err(LodestoneError::RepositoryNotFound(id));
                    }
                    HashMap::from([(id.clone(), manager.sync_one(&id))])
                }
                None if stale_only => manager.sync_stale(),
                None => manager.sync_all(),
            })
        })
        .await?
    };

    spinner.finish_and_clear();

    if outcomes.is_empty() {
        info!("All repositories are up to date");
        return Ok(());
    }

    let ordered: Vec<(String, bool)> = manager
        .list()
        .into_iter()
        .filter_map(|e| {
            outcomes
                .get(&e.repository.id)
                .map(|ok| (e.repository.id, *ok))
        })
        .collect();

    let mut failed = 0;
    for (id, ok) in &ordered {
        let packages = manager.get(id).map(|e| e.listing.len()).unwrap_or_default();
        if *ok {
            info!(
                repo_id = id,
                synced = true,
                packages = packages,
                "{} {} ({} packages)",
                Colored(Green, Icons::CHECK),
                Colored(Cyan, id),
                packages
            );
        } else {
            failed += 1;
            warn!(
                repo_id = id,
                synced = false,
                "{} {} has no listing available",
                Colored(Red, Icons::CROSS),
                id
            );
        }
    }

    if failed > 0 {
        warn!(
            "{} of {} repositories could not be synced",
            failed,
            ordered.len()
        );
    }

    Ok(())
}
