//! Season address resolution.
//!
//! The source numbers episodes continuously across a season's main listing
//! page and its continuation pages ("sub-seasons"), and per-language counts
//! can differ because a dub lags the original release. Resolution walks the
//! pages in declared order, subtracting observed counts, until the canonical
//! episode number lands inside one of them.

use std::sync::Arc;

use tracing::debug;

use crate::clients::source::SourceClient;
use crate::models::season::{EpisodeAddress, SeasonDescriptor};
use crate::parser::source_page;

/// Probes how many playable episodes a physical listing page carries for a
/// given language. A probe failure reads as zero, which falls through to the
/// next sub-season or to "not found"; it never raises past the resolver.
#[async_trait::async_trait]
pub trait EpisodeCounter: Send + Sync {
    async fn episode_count(&self, slug: &str, path: &str, language: &str) -> usize;
}

/// Live probe against the source: fetch the page's episode script and count
/// entries across mirror arrays, taking the maximum (mirrors can be
/// incomplete in different places).
pub struct SourceEpisodeCounter {
    source: Arc<SourceClient>,
}

impl SourceEpisodeCounter {
    #[must_use]
    pub const fn new(source: Arc<SourceClient>) -> Self {
        Self { source }
    }
}

#[async_trait::async_trait]
impl EpisodeCounter for SourceEpisodeCounter {
    async fn episode_count(&self, slug: &str, path: &str, language: &str) -> usize {
        match self.source.episodes_script(slug, path, language).await {
            Ok(script) => source_page::max_episode_count(&script),
            Err(e) => {
                debug!(slug, path, language, error = %e, "Episode count probe failed");
                0
            }
        }
    }
}

pub struct SeasonAddressResolver {
    counter: Arc<dyn EpisodeCounter>,
}

impl SeasonAddressResolver {
    #[must_use]
    pub fn new(counter: Arc<dyn EpisodeCounter>) -> Self {
        Self { counter }
    }

    pub async fn resolve_count(&self, slug: &str, path: &str, language: &str) -> usize {
        self.counter.episode_count(slug, path, language).await
    }

    /// Translates a canonical episode number into the physical page and the
    /// 1-based position within it, for one language. `None` means the
    /// episode is beyond everything the source currently lists.
    pub async fn resolve_address(
        &self,
        slug: &str,
        descriptor: &SeasonDescriptor,
        episode: usize,
        language: &str,
    ) -> Option<EpisodeAddress> {
        if episode == 0 {
            return None;
        }

        let main_count = self
            .counter
            .episode_count(slug, &descriptor.path, language)
            .await;
        if episode <= main_count {
            return Some(EpisodeAddress {
                path: descriptor.path.clone(),
                position: episode,
                language: language.to_string(),
            });
        }

        let mut remaining = episode - main_count;
        for sub in &descriptor.sub_seasons {
            let sub_count = self.counter.episode_count(slug, &sub.path, language).await;
            if remaining <= sub_count {
                return Some(EpisodeAddress {
                    path: sub.path.clone(),
                    position: remaining,
                    language: language.to_string(),
                });
            }
            remaining -= sub_count;
        }

        debug!(slug, season = %descriptor.display_name, episode, language, "Episode beyond all listing pages");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::season::{SeasonKind, SubSeason};
    use std::collections::HashMap;

    struct FixedCounts(HashMap<String, usize>);

    #[async_trait::async_trait]
    impl EpisodeCounter for FixedCounts {
        async fn episode_count(&self, _slug: &str, path: &str, _language: &str) -> usize {
            self.0.get(path).copied().unwrap_or(0)
        }
    }

    fn descriptor_with_subs() -> SeasonDescriptor {
        let mut descriptor = SeasonDescriptor::new(SeasonKind::Ordinary(1), "Saison 1", "saison1");
        descriptor.sub_seasons = vec![
            SubSeason {
                path: "saison1-2".to_string(),
                languages: vec![],
            },
            SubSeason {
                path: "saison1-3".to_string(),
                languages: vec![],
            },
        ];
        descriptor
    }

    fn resolver(counts: &[(&str, usize)]) -> SeasonAddressResolver {
        let map = counts
            .iter()
            .map(|(path, count)| ((*path).to_string(), *count))
            .collect();
        SeasonAddressResolver::new(Arc::new(FixedCounts(map)))
    }

    #[tokio::test]
    async fn episodes_within_the_main_page_resolve_unchanged() {
        let descriptor = SeasonDescriptor::new(SeasonKind::Ordinary(1), "Saison 1", "saison1");
        let resolver = resolver(&[("saison1", 12)]);

        for episode in [1, 6, 12] {
            let address = resolver
                .resolve_address("demo", &descriptor, episode, "vostfr")
                .await
                .unwrap();
            assert_eq!(address.path, "saison1");
            assert_eq!(address.position, episode);
        }
    }

    #[tokio::test]
    async fn overflow_walks_sub_seasons_in_order() {
        // Main holds 12, sub-seasons hold 10 and 5.
        let descriptor = descriptor_with_subs();
        let resolver = resolver(&[("saison1", 12), ("saison1-2", 10), ("saison1-3", 5)]);

        let address = resolver
            .resolve_address("demo", &descriptor, 13, "vostfr")
            .await
            .unwrap();
        assert_eq!(address.path, "saison1-2");
        assert_eq!(address.position, 1);

        // First episode past the first sub-season.
        let address = resolver
            .resolve_address("demo", &descriptor, 23, "vostfr")
            .await
            .unwrap();
        assert_eq!(address.path, "saison1-3");
        assert_eq!(address.position, 1);

        let address = resolver
            .resolve_address("demo", &descriptor, 27, "vostfr")
            .await
            .unwrap();
        assert_eq!(address.path, "saison1-3");
        assert_eq!(address.position, 5);
    }

    #[tokio::test]
    async fn exhausting_every_page_is_not_found() {
        let descriptor = descriptor_with_subs();
        let resolver = resolver(&[("saison1", 12), ("saison1-2", 10), ("saison1-3", 5)]);

        assert!(
            resolver
                .resolve_address("demo", &descriptor, 28, "vostfr")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn failed_probe_reads_as_zero_and_falls_through() {
        // No count registered for the main page: a vf request lands in the
        // first sub-season immediately.
        let descriptor = descriptor_with_subs();
        let resolver = resolver(&[("saison1-2", 10)]);

        let address = resolver
            .resolve_address("demo", &descriptor, 3, "vf")
            .await
            .unwrap();
        assert_eq!(address.path, "saison1-2");
        assert_eq!(address.position, 3);
    }

    #[tokio::test]
    async fn episode_zero_never_resolves() {
        let descriptor = descriptor_with_subs();
        let resolver = resolver(&[("saison1", 12)]);

        assert!(
            resolver
                .resolve_address("demo", &descriptor, 0, "vostfr")
                .await
                .is_none()
        );
    }
}
