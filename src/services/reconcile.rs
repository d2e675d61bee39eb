//! Cross-catalog episode reconciliation.
//!
//! The foreign catalog splits and merges seasons differently from the
//! source, so per-episode enrichment (titles, overviews, stills) can only be
//! attached by aligning the two numbering schemes. Both sides are flattened
//! into chronologically ordered queues and zipped position-wise; a strict
//! count-equality gate disables enrichment entirely when the totals differ,
//! since a guessed partial mapping would put wrong titles on wrong episodes.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::episode::{ForeignEpisodeRecord, canonical_key};

/// Builds the `s{n}e{m}` -> foreign record map.
///
/// `season_counts` holds `(canonical_season_number, episode_count)` for the
/// ordinary seasons only; specials, films and side-stories never take part.
/// Absence of a key in the result means "no enrichment for that episode",
/// which is not an error.
#[must_use]
pub fn build_reconciliation_map(
    foreign_records: &[ForeignEpisodeRecord],
    season_counts: &[(u32, usize)],
    today: NaiveDate,
) -> HashMap<String, ForeignEpisodeRecord> {
    let mut foreign_queue: Vec<&ForeignEpisodeRecord> = foreign_records
        .iter()
        .filter(|r| r.season > 0)
        .filter(|r| r.air_date.is_some_and(|d| d <= today))
        .collect();
    foreign_queue.sort_by_key(|r| (r.season, r.episode));

    let mut ordered_counts: Vec<(u32, usize)> = season_counts
        .iter()
        .copied()
        .filter(|(season, _)| *season > 0)
        .collect();
    ordered_counts.sort_by_key(|(season, _)| *season);

    let local_queue: Vec<String> = ordered_counts
        .iter()
        .flat_map(|&(season, count)| {
            (1..=count).map(move |episode| canonical_key(season, episode as u32))
        })
        .collect();

    // Integrity gate: a 1:1 zip is only trustworthy when both sides agree
    // on the total.
    if foreign_queue.len() != local_queue.len() {
        return HashMap::new();
    }

    local_queue
        .into_iter()
        .zip(foreign_queue)
        .map(|(key, record)| (key, record.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(season: i32, episode: i32, air_date: Option<&str>) -> ForeignEpisodeRecord {
        ForeignEpisodeRecord {
            season,
            episode,
            air_date: air_date.map(|d| d.parse().unwrap()),
            title: Some(format!("S{season}E{episode}")),
            overview: None,
            still_path: None,
        }
    }

    fn today() -> NaiveDate {
        "2024-06-01".parse().unwrap()
    }

    #[test]
    fn equal_length_queues_zip_into_a_bijection() {
        let foreign = vec![
            record(1, 1, Some("2023-01-01")),
            record(1, 2, Some("2023-01-08")),
            record(2, 1, Some("2023-04-01")),
        ];
        // Source splits differently: one season of three episodes.
        let map = build_reconciliation_map(&foreign, &[(1, 3)], today());

        assert_eq!(map.len(), 3);
        assert_eq!(map["s1e1"].title.as_deref(), Some("S1E1"));
        assert_eq!(map["s1e2"].title.as_deref(), Some("S1E2"));
        assert_eq!(map["s1e3"].title.as_deref(), Some("S2E1"));
    }

    #[test]
    fn count_mismatch_disables_enrichment() {
        let foreign = vec![
            record(1, 1, Some("2023-01-01")),
            record(1, 2, Some("2023-01-08")),
        ];
        assert!(build_reconciliation_map(&foreign, &[(1, 3)], today()).is_empty());
        assert!(build_reconciliation_map(&foreign, &[(1, 1)], today()).is_empty());
    }

    #[test]
    fn future_and_undated_records_are_excluded() {
        let foreign = vec![
            record(1, 1, Some("2023-01-01")),
            record(1, 2, None),
            record(1, 3, Some("2099-01-01")),
        ];
        let map = build_reconciliation_map(&foreign, &[(1, 1)], today());
        assert_eq!(map.len(), 1);
        assert_eq!(map["s1e1"].title.as_deref(), Some("S1E1"));
    }

    #[test]
    fn catalog_specials_are_excluded() {
        let foreign = vec![
            record(0, 1, Some("2023-01-01")),
            record(1, 1, Some("2023-02-01")),
        ];
        let map = build_reconciliation_map(&foreign, &[(1, 1)], today());
        assert_eq!(map.len(), 1);
        assert_eq!(map["s1e1"].title.as_deref(), Some("S1E1"));
    }

    #[test]
    fn ordering_spans_season_boundaries_on_both_sides() {
        let foreign = vec![
            record(2, 1, Some("2023-04-01")),
            record(1, 1, Some("2023-01-01")),
            record(1, 2, Some("2023-01-08")),
        ];
        let map = build_reconciliation_map(&foreign, &[(2, 1), (1, 2)], today());

        // Local keys enumerate seasons in ascending order regardless of the
        // order counts were supplied in.
        assert_eq!(map["s1e1"].title.as_deref(), Some("S1E1"));
        assert_eq!(map["s1e2"].title.as_deref(), Some("S1E2"));
        assert_eq!(map["s2e1"].title.as_deref(), Some("S2E1"));
    }
}
