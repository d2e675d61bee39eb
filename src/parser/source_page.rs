//! Pure text extraction from the source's pages.
//!
//! The source renders its catalogue through inline JavaScript calls
//! (`panneauAnime`, `newSPF`, `cartePlanningAnime`) and per-season
//! `episodes.js` scripts holding parallel `var epsN = [...]` mirror arrays.
//! Everything here is regex over raw text; no I/O.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{LANGUAGE_VARIANTS, VIDEO_EXTENSIONS};
use crate::models::season::{SeasonDescriptor, SeasonKind, SubSeason};

static JS_COMMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));
static PANNEAU_ANIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"panneauAnime\("([^"]+)",\s*"([^"]+)"\)"#).expect("valid regex"));
static NEW_SPF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"newSPF\("([^"]+)"\)"#).expect("valid regex"));
static PLANNING_CARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"cartePlanningAnime\([^,]+,\s*"([^"]+)""#).expect("valid regex"));
static EPISODES_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"episodes\.js\?filever=\d+").expect("valid regex"));
static EPS_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var\s+eps\w*\s*=\s*\[([^\]]+)\]").expect("valid regex"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).expect("valid regex"));
static SEASON_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"saison(\d+)$").expect("valid regex"));
static SUB_SEASON_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"saison(\d+)-(\d+)").expect("valid regex"));
static SEASON_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:saison|season|saga|s)\s*(\d+)(?:-(\d+))?").expect("valid regex"));
static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]([^'"]*/[^'"]*\.(?:m3u8|mp4|mkv)[^'"]*)['"]"#).expect("valid regex")
});
static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<h4[^>]*id="titreOeuvre"[^>]*>(.*?)</h4>"#).expect("valid regex")
});
static COVER_IMG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img[^>]*id="(?:imgOeuvre|coverOeuvre)"[^>]*>"#).expect("valid regex")
});
static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="([^"]+)""#).expect("valid regex"));
static SYNOPSIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<h2[^>]*>[^<]*[Ss]ynopsis[^<]*</h2>\s*<p[^>]*>(.*?)</p>").expect("valid regex")
});
static GENRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<h2[^>]*>[^<]*[Gg]enres[^<]*</h2>\s*<a[^>]*>(.*?)</a>").expect("valid regex")
});
static SIBNET_PLAYER_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"player\.src\(\[\{src:\s*["']([^"']+)["']"#).expect("valid regex")
});

/// One `panneauAnime` call, before sub-season grouping.
struct SeasonEntry {
    number: u32,
    kind: SeasonKind,
    display_name: String,
    path: String,
    languages: Vec<String>,
    sub_path: Option<String>,
}

/// Parses the season panels of a catalogue page into grouped descriptors,
/// sorted by canonical number. Sub-season panels (`saison4-2`) fold into
/// their parent, keeping their declared order.
#[must_use]
pub fn parse_seasons(html: &str) -> Vec<SeasonDescriptor> {
    let clean = JS_COMMENTS.replace_all(html, "");

    let mut grouped: BTreeMap<u32, SeasonDescriptor> = BTreeMap::new();

    for capture in PANNEAU_ANIME.captures_iter(&clean) {
        let name = &capture[1];
        let url = &capture[2];
        // placeholder left in the site's template
        if name == "nom" && url == "url" {
            continue;
        }

        let Some(entry) = parse_season_entry(name, url) else {
            continue;
        };

        let descriptor = grouped.entry(entry.number).or_insert_with(|| {
            SeasonDescriptor::new(entry.kind, entry.display_name.clone(), entry.path.clone())
        });

        for language in &entry.languages {
            if !descriptor.languages.contains(language) {
                descriptor.languages.push(language.clone());
            }
        }

        if let Some(sub_path) = entry.sub_path
            && !descriptor.sub_seasons.iter().any(|s| s.path == sub_path)
        {
            descriptor.sub_seasons.push(SubSeason {
                path: sub_path,
                languages: entry.languages,
            });
        }
    }

    grouped.into_values().collect()
}

/// Classifies one season panel. The URL path is more reliable than the
/// display name, so it is consulted first.
fn parse_season_entry(name: &str, url: &str) -> Option<SeasonEntry> {
    let path_segment = url
        .trim_end_matches('/')
        .rsplit('/')
        .nth(1)
        .unwrap_or_else(|| url.trim_end_matches('/').rsplit('/').next().unwrap_or(""));
    let name_lower = name.to_lowercase();

    if let Some(capture) = SEASON_PATH.captures(path_segment) {
        let number: u32 = capture[1].parse().ok()?;
        return Some(SeasonEntry {
            number,
            kind: SeasonKind::Ordinary(number),
            display_name: format!("Saison {number}"),
            path: format!("saison{number}"),
            languages: languages_from_url(url),
            sub_path: None,
        });
    }

    if let Some(capture) = SUB_SEASON_PATH.captures(path_segment) {
        let number: u32 = capture[1].parse().ok()?;
        return Some(SeasonEntry {
            number,
            kind: SeasonKind::Ordinary(number),
            display_name: format!("Saison {number}"),
            path: format!("saison{number}"),
            languages: languages_from_url(url),
            sub_path: Some(path_segment.to_string()),
        });
    }

    if name_lower.contains("film") || path_segment.contains("film") {
        return Some(SeasonEntry {
            number: SeasonKind::Film.as_number(),
            kind: SeasonKind::Film,
            display_name: "Films".to_string(),
            path: "film".to_string(),
            languages: languages_from_url(url),
            sub_path: None,
        });
    }

    if ["oav", "ova", "spécial", "special"]
        .iter()
        .any(|term| name_lower.contains(term))
        || path_segment.contains("oav")
    {
        return Some(SeasonEntry {
            number: SeasonKind::Special.as_number(),
            kind: SeasonKind::Special,
            display_name: "Spéciaux".to_string(),
            path: "oav".to_string(),
            languages: languages_from_url(url),
            sub_path: None,
        });
    }

    if path_segment.contains("hs") || name_lower.contains("hors") {
        return Some(SeasonEntry {
            number: SeasonKind::SideStory.as_number(),
            kind: SeasonKind::SideStory,
            display_name: "Hors-série".to_string(),
            path: path_segment.to_string(),
            languages: languages_from_url(url),
            sub_path: None,
        });
    }

    if let Some(capture) = SEASON_NAME.captures(&name_lower) {
        let number: u32 = capture[1].parse().ok()?;
        let sub_path = capture
            .get(2)
            .map(|_| path_segment.to_string())
            .filter(|p| !p.is_empty());
        return Some(SeasonEntry {
            number,
            kind: SeasonKind::Ordinary(number),
            display_name: format!("Saison {number}"),
            path: format!("saison{number}"),
            languages: languages_from_url(url),
            sub_path,
        });
    }

    None
}

/// Language variants named in a season URL; an URL that names none is
/// assumed VOSTFR.
#[must_use]
pub fn languages_from_url(url: &str) -> Vec<String> {
    let mut languages: Vec<String> = LANGUAGE_VARIANTS
        .iter()
        .filter(|variant| {
            url.contains(&format!("/{variant}/")) || url.ends_with(&format!("/{variant}"))
        })
        .map(|variant| (*variant).to_string())
        .collect();
    if languages.is_empty() {
        languages.push("vostfr".to_string());
    }
    languages
}

/// The `episodes.js?filever=N` reference embedded in a season page.
#[must_use]
pub fn episodes_script_ref(html: &str) -> Option<&str> {
    EPISODES_SCRIPT.find(html).map(|m| m.as_str())
}

/// Every `var epsN = [...]` mirror array, as raw quoted entries.
#[must_use]
pub fn episode_arrays(js: &str) -> Vec<Vec<String>> {
    EPS_ARRAY
        .captures_iter(js)
        .map(|capture| {
            QUOTED
                .captures_iter(&capture[1])
                .map(|url| url[1].to_string())
                .collect()
        })
        .collect()
}

/// Authoritative episode count: mirrors can be incomplete in different
/// places, so the maximum count of valid player URLs across arrays wins.
#[must_use]
pub fn max_episode_count(js: &str) -> usize {
    episode_arrays(js)
        .iter()
        .map(|array| array.iter().filter(|url| is_valid_player_url(url)).count())
        .max()
        .unwrap_or(0)
}

/// The `position`-th (1-based) entry of each mirror array, keeping only
/// valid player links.
#[must_use]
pub fn player_links_at(js: &str, position: usize) -> Vec<String> {
    if position == 0 {
        return Vec::new();
    }
    episode_arrays(js)
        .into_iter()
        .filter_map(|array| array.into_iter().nth(position - 1))
        .filter(|url| is_valid_player_url(url))
        .collect()
}

/// Rejects same-site decoys and static assets the eps arrays sometimes
/// carry in place of a player link.
#[must_use]
pub fn is_valid_player_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() || !url.starts_with("http") {
        return false;
    }

    let lower = url.to_lowercase();
    const ASSET_EXTENSIONS: &[&str] = &[
        ".js", ".css", ".png", ".jpg", ".svg", ".woff", ".ico", ".gif", ".jpeg",
    ];
    if ASSET_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
        return false;
    }

    const DECOY_MARKERS: &[&str] = &["/assets/", "/templates/", "/static/", "/catalogue/", "#"];
    !DECOY_MARKERS.iter().any(|marker| url.contains(marker))
}

/// First media URL in a player page that lives on a different host than the
/// page itself and carries a video extension. One URL is enough; the page
/// usually repeats the same stream in several script branches.
#[must_use]
pub fn first_video_url(html: &str, page_host: &str) -> Option<String> {
    for capture in VIDEO_URL.captures_iter(html) {
        let url = &capture[1];
        let Some(host) = host_of(url) else {
            continue;
        };
        if host == page_host {
            continue;
        }
        if VIDEO_EXTENSIONS.iter().any(|ext| url.contains(ext)) || url.contains(".mkv") {
            return Some(url.to_string());
        }
    }
    None
}

#[must_use]
pub fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    Some(rest.split('/').next().unwrap_or(rest))
}

/// Slugs of every anime in the publication schedule page.
#[must_use]
pub fn schedule_slugs(html: &str) -> Vec<String> {
    let mut slugs: Vec<String> = PLANNING_CARD
        .captures_iter(html)
        .filter_map(|capture| {
            capture[1]
                .split('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    slugs.sort();
    slugs.dedup();
    slugs
}

/// Film titles from the film pseudo-season page, in listing order.
#[must_use]
pub fn film_titles(html: &str) -> Vec<String> {
    NEW_SPF
        .captures_iter(html)
        .map(|capture| capture[1].trim().to_string())
        .collect()
}

#[must_use]
pub fn parse_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .map(|capture| strip_tags(&capture[1]))
        .filter(|t| !t.is_empty())
}

#[must_use]
pub fn parse_cover_image(html: &str) -> Option<String> {
    let tag = COVER_IMG.find(html)?;
    IMG_SRC
        .captures(tag.as_str())
        .map(|capture| capture[1].to_string())
}

#[must_use]
pub fn parse_synopsis(html: &str) -> Option<String> {
    SYNOPSIS
        .captures(html)
        .map(|capture| strip_tags(&capture[1]))
        .filter(|s| !s.is_empty())
}

#[must_use]
pub fn parse_genres(html: &str) -> Vec<String> {
    let Some(capture) = GENRES.captures(html) else {
        return Vec::new();
    };
    strip_tags(&capture[1])
        .split([',', ';', '/', '-'])
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// The redirect target a sibnet player page embeds in its `player.src`
/// call. The actual media URL only appears in the HTTP redirect that
/// follows it.
#[must_use]
pub fn sibnet_player_src(html: &str) -> Option<String> {
    let src = SIBNET_PLAYER_SRC.captures(html)?[1].to_string();
    if src.starts_with('/') {
        Some(format!("https://video.sibnet.ru{src}"))
    } else {
        Some(src)
    }
}

fn strip_tags(fragment: &str) -> String {
    static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
    let text = TAG.replace_all(fragment, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEASONS_HTML: &str = r#"
        /* panneauAnime("nom", "url"); */
        panneauAnime("Saison 1", "/catalogue/demo/saison1/vostfr/");
        panneauAnime("Saison 1", "/catalogue/demo/saison1/vf/");
        panneauAnime("Saison 2", "/catalogue/demo/saison2/vostfr/");
        panneauAnime("Saison 2-2", "/catalogue/demo/saison2-2/vostfr/");
        panneauAnime("Film", "/catalogue/demo/film/vostfr/");
        panneauAnime("OAV", "/catalogue/demo/oav/vostfr/");
    "#;

    #[test]
    fn groups_panels_into_descriptors() {
        let seasons = parse_seasons(SEASONS_HTML);
        assert_eq!(seasons.len(), 4);

        let s1 = &seasons[1];
        assert_eq!(s1.kind, SeasonKind::Ordinary(1));
        assert_eq!(s1.path, "saison1");
        assert_eq!(s1.languages, vec!["vostfr", "vf"]);
        assert!(s1.sub_seasons.is_empty());

        let s2 = &seasons[2];
        assert_eq!(s2.kind, SeasonKind::Ordinary(2));
        assert_eq!(s2.sub_seasons.len(), 1);
        assert_eq!(s2.sub_seasons[0].path, "saison2-2");

        assert_eq!(seasons[0].kind, SeasonKind::Special);
        assert_eq!(seasons[3].kind, SeasonKind::Film);
    }

    #[test]
    fn commented_out_panels_are_ignored() {
        let html = r#"
            /* panneauAnime("Saison 99", "/catalogue/demo/saison99/vostfr/"); */
            panneauAnime("Saison 1", "/catalogue/demo/saison1/vostfr/");
        "#;
        let seasons = parse_seasons(html);
        assert_eq!(seasons.len(), 1);
        assert_eq!(seasons[0].kind, SeasonKind::Ordinary(1));
    }

    #[test]
    fn episode_arrays_and_count() {
        let js = r#"
            var eps1 = ['https://video.sibnet.ru/shell.php?videoid=1', 'https://video.sibnet.ru/shell.php?videoid=2'];
            var eps2 = ['https://vidmoly.to/embed-a.html', 'https://vidmoly.to/embed-b.html', 'https://vidmoly.to/embed-c.html'];
            var epsAS = ['not-a-url', 'https://demo.example/assets/x'];
        "#;
        assert_eq!(episode_arrays(js).len(), 3);
        assert_eq!(max_episode_count(js), 3);

        let players = player_links_at(js, 2);
        assert_eq!(
            players,
            vec![
                "https://video.sibnet.ru/shell.php?videoid=2",
                "https://vidmoly.to/embed-b.html",
            ]
        );
    }

    #[test]
    fn player_url_validity() {
        assert!(is_valid_player_url("https://vidmoly.to/embed-a.html"));
        assert!(!is_valid_player_url(""));
        assert!(!is_valid_player_url("/relative/path"));
        assert!(!is_valid_player_url("https://site/app.js"));
        assert!(!is_valid_player_url("https://site/assets/player"));
        assert!(!is_valid_player_url(
            "https://anime-sama.fr/catalogue/demo/"
        ));
        assert!(!is_valid_player_url("https://site/page#anchor"));
    }

    #[test]
    fn first_video_url_requires_foreign_host_and_extension() {
        let html = r#"
            <script>
            var decoy = "https://player.host/menu.css";
            var own = "https://player.host/self/video.m3u8";
            var real = "https://cdn.other/stream/video.m3u8?token=1";
            </script>
        "#;
        let url = first_video_url(html, "player.host").unwrap();
        assert_eq!(url, "https://cdn.other/stream/video.m3u8?token=1");

        assert!(first_video_url("<p>nothing</p>", "player.host").is_none());
    }

    #[test]
    fn schedule_and_films() {
        let html = r#"
            cartePlanningAnime("Demo", "demo/saison1/vostfr", "demo.png", "21h00", "");
            cartePlanningAnime("Other", "other-slug/saison2/vf", "o.png", "12h00", "");
            newSPF("Film 1 : Le Début");
            newSPF("Film 2");
        "#;
        assert_eq!(schedule_slugs(html), vec!["demo", "other-slug"]);
        assert_eq!(film_titles(html), vec!["Film 1 : Le Début", "Film 2"]);
    }

    #[test]
    fn catalogue_page_fields() {
        let html = r#"
            <h4 id="titreOeuvre">Demo Anime</h4>
            <img id="imgOeuvre" src="https://cdn/img.png">
            <h2>Synopsis</h2>
            <p>Une aventure <b>fantastique</b>.</p>
            <h2>Genres</h2>
            <a>Action, Aventure - Fantastique</a>
            episodes.js?filever=1234
        "#;
        assert_eq!(parse_title(html).as_deref(), Some("Demo Anime"));
        assert_eq!(
            parse_cover_image(html).as_deref(),
            Some("https://cdn/img.png")
        );
        assert_eq!(
            parse_synopsis(html).as_deref(),
            Some("Une aventure fantastique .")
        );
        assert_eq!(parse_genres(html), vec!["Action", "Aventure", "Fantastique"]);
        assert_eq!(episodes_script_ref(html), Some("episodes.js?filever=1234"));
    }

    #[test]
    fn sibnet_src_is_absolutized() {
        let html = r#"player.src([{src: "/v/abc123/video.mp4", type: "video/mp4"}])"#;
        assert_eq!(
            sibnet_player_src(html).as_deref(),
            Some("https://video.sibnet.ru/v/abc123/video.mp4")
        );
    }
}
