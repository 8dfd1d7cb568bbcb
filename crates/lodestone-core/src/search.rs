use lodestone_registry::package::{MatchedPackage, RepositoryRef};

use crate::manager::RepositoryManager;

impl RepositoryManager {
    /// Searches the in-memory listings of all enabled repositories.
    ///
    /// `query` is matched case-insensitively against name, description and author after
    /// trimming; an empty query matches everything. A non-blank `mc_version` additionally
    /// requires the package to list exactly that version.
    ///
    /// Results follow registry order, then listing order. Nothing is synced and duplicates
    /// across repositories are kept.
    pub fn search(&self, query: &str, mc_version: Option<&str>) -> Vec<MatchedPackage> {
        let needle = query.trim().to_lowercase();
        let mc_version = mc_version.map(str::trim).filter(|v| !v.is_empty());

        let mut matches = Vec::new();
        for slot in self.slots().iter() {
            let (repository, listing) = {
                let entry = slot.read();
                if !entry.repository.enabled {
                    continue;
                }
                (
                    RepositoryRef {
                        id: entry.repository.id.clone(),
                        name: entry.repository.name.clone(),
                        url: entry.repository.url.clone(),
                    },
                    entry.listing.clone(),
                )
            };

            matches.extend(
                listing
                    .iter()
                    .filter(|record| record.matches_query(&needle))
                    .filter(|record| mc_version.is_none_or(|v| record.supports_version(v)))
                    .map(|record| MatchedPackage::new(record.clone(), repository.clone())),
            );
        }

        matches
    }
}
