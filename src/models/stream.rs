use serde::{Deserialize, Serialize};

/// Where a candidate came from. Attributes of the first occurrence win
/// when the same URL shows up in both sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Dataset,
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamCandidate {
    pub url: String,
    pub language: String,
    pub source: StreamSource,
}

/// Maps a source language variant onto the user-facing language group:
/// `vf`, `vf1` and `vf2` are all "VF" mirrors of each other.
#[must_use]
pub fn language_group(variant: &str) -> String {
    match variant.to_ascii_lowercase().as_str() {
        "vostfr" => "VOSTFR".to_string(),
        "vf" | "vf1" | "vf2" => "VF".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

/// Whether a filter value names something the source can serve: "Tout" or
/// one of the language groups the published variants map onto.
#[must_use]
pub fn is_known_filter(filter: &str) -> bool {
    filter.eq_ignore_ascii_case("tout")
        || crate::constants::LANGUAGE_VARIANTS
            .iter()
            .any(|v| language_group(v).eq_ignore_ascii_case(filter))
}

/// Keep-only filter. `None` or "Tout" keeps everything.
#[must_use]
pub fn filter_by_language(
    candidates: Vec<StreamCandidate>,
    filter: Option<&str>,
) -> Vec<StreamCandidate> {
    let Some(filter) = filter else {
        return candidates;
    };
    if filter.eq_ignore_ascii_case("tout") {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| language_group(&c.language).eq_ignore_ascii_case(filter))
        .collect()
}

/// Stable sort by index into the user's comma-separated preference list.
/// Languages absent from the list sort last, keeping their relative order.
#[must_use]
pub fn order_by_language(
    mut candidates: Vec<StreamCandidate>,
    order: &str,
) -> Vec<StreamCandidate> {
    let preference: Vec<String> = order
        .split(',')
        .map(|l| l.trim().to_ascii_uppercase())
        .filter(|l| !l.is_empty())
        .collect();

    let rank = |candidate: &StreamCandidate| {
        let group = language_group(&candidate.language);
        preference
            .iter()
            .position(|p| *p == group)
            .unwrap_or(preference.len())
    };

    candidates.sort_by_key(rank);
    candidates
}

/// Deduplicates by URL, first occurrence wins.
#[must_use]
pub fn dedupe_by_url(candidates: Vec<StreamCandidate>) -> Vec<StreamCandidate> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, language: &str) -> StreamCandidate {
        StreamCandidate {
            url: url.to_string(),
            language: language.to_string(),
            source: StreamSource::Live,
        }
    }

    #[test]
    fn vf_variants_share_a_group() {
        assert_eq!(language_group("vf1"), "VF");
        assert_eq!(language_group("vf2"), "VF");
        assert_eq!(language_group("VF"), "VF");
        assert_eq!(language_group("vostfr"), "VOSTFR");
    }

    #[test]
    fn known_filters_are_groups_or_tout() {
        assert!(is_known_filter("VF"));
        assert!(is_known_filter("vostfr"));
        assert!(is_known_filter("Tout"));
        assert!(!is_known_filter("klingon"));
        assert!(!is_known_filter("vf1"));
    }

    #[test]
    fn filter_keeps_only_requested_group() {
        let out = filter_by_language(
            vec![
                candidate("a", "vostfr"),
                candidate("b", "vf1"),
                candidate("c", "vf"),
            ],
            Some("VF"),
        );
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| language_group(&c.language) == "VF"));
    }

    #[test]
    fn filter_tout_keeps_everything() {
        let out = filter_by_language(
            vec![candidate("a", "vostfr"), candidate("b", "vf")],
            Some("Tout"),
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn ordering_is_stable_and_unknown_sorts_last() {
        // Candidates in languages [B, A, C] with order "A,B" -> [A, B, C].
        let out = order_by_language(
            vec![
                candidate("b", "vf"),
                candidate("a", "vostfr"),
                candidate("c", "dub-es"),
            ],
            "VOSTFR,VF",
        );
        let urls: Vec<_> = out.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b", "c"]);
    }

    #[test]
    fn ordering_preserves_relative_order_among_ties() {
        let out = order_by_language(
            vec![
                candidate("first-vf", "vf"),
                candidate("second-vf", "vf1"),
                candidate("third-vf", "vf2"),
            ],
            "VF,VOSTFR",
        );
        let urls: Vec<_> = out.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["first-vf", "second-vf", "third-vf"]);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let out = dedupe_by_url(vec![
            candidate("https://h/x.m3u8", "vostfr"),
            candidate("https://h/y.mp4", "vf"),
            candidate("https://h/x.m3u8", "vf"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].language, "vostfr");
    }
}
