//! Translation of Discogs release documents into catalog terms. Lookup
//! references stay as names here; the importer resolves them to ids.

use crate::ports::discogs::{DiscogsArtist, DiscogsRelease, DiscogsTrack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTrack {
    pub title: String,
    pub position: Option<String>,
    pub length_secs: Option<i32>,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftMedium {
    pub name: String,
    pub tracks: Vec<DraftTrack>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUrls {
    pub cover_front: Option<String>,
    pub cover_back: Option<String>,
    pub thumbnail: Option<String>,
}

/// A Discogs release with everything the catalog keeps, before lookup
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDraft {
    pub discogs_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub artists: Vec<String>,
    pub genres: Vec<String>,
    pub label: Option<String>,
    pub label_number: Option<String>,
    pub country: Option<String>,
    pub format: Option<String>,
    pub upc: Option<String>,
    pub length_in_seconds: Option<i32>,
    pub media: Vec<DraftMedium>,
    pub images: ImageUrls,
    pub uri: Option<String>,
}

/// Drops the " (2)" suffix Discogs appends to disambiguate equal names.
pub fn clean_name(name: &str) -> String {
    let trimmed = name.trim();
    if let Some(open) = trimmed.rfind(" (") {
        let suffix = &trimmed[open + 2..];
        if let Some(number) = suffix.strip_suffix(')') {
            if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
                return trimmed[..open].trim_end().to_string();
            }
        }
    }
    trimmed.to_string()
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !name.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
        names.push(name);
    }
}

fn artist_names(artists: &[DiscogsArtist]) -> Vec<String> {
    let mut names = Vec::new();
    for artist in artists {
        push_unique(&mut names, clean_name(&artist.name));
    }
    names
}

/// Parses `m:ss` or `h:mm:ss`. Blank or malformed durations are unknown.
pub fn parse_duration(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parts = raw
        .split(':')
        .map(|part| part.trim().parse::<i32>().ok())
        .collect::<Option<Vec<_>>>()?;
    if parts.iter().any(|p| *p < 0) {
        return None;
    }
    match parts.as_slice() {
        [minutes, seconds] if *seconds < 60 => Some(minutes * 60 + seconds),
        [hours, minutes, seconds] if *minutes < 60 && *seconds < 60 => {
            Some(hours * 3600 + minutes * 60 + seconds)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediumKey {
    Disc(u32),
    /// Vinyl sides, two per record.
    Record(u32),
}

impl MediumKey {
    fn name(self) -> String {
        match self {
            MediumKey::Disc(n) => format!("Disc {n}"),
            MediumKey::Record(n) => format!("Record {n}"),
        }
    }
}

/// Works out which medium a track position belongs to: `1-3`, `CD2-1` and
/// `2.4` name a disc, `A1`/`B` name vinyl sides, plain numbers are disc 1.
fn medium_of(position: &str) -> MediumKey {
    let position = position.trim().to_ascii_uppercase();
    if let Some((disc, _)) = position.split_once(['-', '.']) {
        let digits: String = disc.chars().filter(char::is_ascii_digit).collect();
        if let Ok(n) = digits.parse::<u32>() {
            return MediumKey::Disc(n.max(1));
        }
    }
    match position.chars().next() {
        Some(side @ 'A'..='Z') => MediumKey::Record((side as u32 - 'A' as u32) / 2 + 1),
        _ => MediumKey::Disc(1),
    }
}

fn flatten(tracklist: &[DiscogsTrack]) -> Vec<&DiscogsTrack> {
    let mut tracks = Vec::new();
    for track in tracklist {
        match track.kind.as_str() {
            "heading" => {}
            "index" if !track.sub_tracks.is_empty() => tracks.extend(flatten(&track.sub_tracks)),
            _ => tracks.push(track),
        }
    }
    tracks
}

/// Groups the tracklist into media in order of first appearance.
pub fn media_from_tracklist(tracklist: &[DiscogsTrack]) -> Vec<DraftMedium> {
    let mut media: Vec<(MediumKey, DraftMedium)> = Vec::new();
    for track in flatten(tracklist) {
        let key = medium_of(&track.position);
        let draft = DraftTrack {
            title: track.title.trim().to_string(),
            position: Some(track.position.trim().to_string()).filter(|p| !p.is_empty()),
            length_secs: parse_duration(&track.duration),
            artists: artist_names(&track.artists),
        };
        match media.iter_mut().find(|(k, _)| *k == key) {
            Some((_, medium)) => medium.tracks.push(draft),
            None => media.push((
                key,
                DraftMedium {
                    name: key.name(),
                    tracks: vec![draft],
                },
            )),
        }
    }
    media.into_iter().map(|(_, medium)| medium).collect()
}

fn barcode(release: &DiscogsRelease) -> Option<String> {
    release
        .identifiers
        .iter()
        .filter(|id| id.kind.eq_ignore_ascii_case("barcode"))
        .map(|id| id.value.chars().filter(char::is_ascii_digit).collect::<String>())
        .find(|digits| !digits.is_empty())
}

fn image_urls(release: &DiscogsRelease) -> ImageUrls {
    let primary = release
        .images
        .iter()
        .find(|image| image.kind == "primary")
        .or_else(|| release.images.first());
    let back = release
        .images
        .iter()
        .find(|image| image.kind == "secondary" && Some(image.uri.as_str()) != primary.map(|p| p.uri.as_str()));
    ImageUrls {
        cover_front: primary.map(|image| image.uri.clone()),
        cover_back: back.map(|image| image.uri.clone()),
        thumbnail: primary.and_then(|image| image.uri150.clone()),
    }
}

pub fn draft_from(release: &DiscogsRelease) -> ReleaseDraft {
    let media = media_from_tracklist(&release.tracklist);
    let lengths: Vec<i32> = media
        .iter()
        .flat_map(|m| m.tracks.iter().filter_map(|t| t.length_secs))
        .collect();

    let mut genres = Vec::new();
    for genre in release.genres.iter().chain(&release.styles) {
        push_unique(&mut genres, genre.trim().to_string());
    }

    let label = release.labels.first();
    ReleaseDraft {
        discogs_id: release.id,
        title: release.title.trim().to_string(),
        year: release.year.filter(|y| *y > 0),
        artists: artist_names(&release.artists),
        genres,
        label: label.map(|l| clean_name(&l.name)).filter(|n| !n.is_empty()),
        label_number: label
            .and_then(|l| l.catno.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("none"))
            .map(str::to_string),
        country: release
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        format: release
            .formats
            .first()
            .map(|f| f.name.trim().to_string())
            .filter(|f| !f.is_empty()),
        upc: barcode(release),
        length_in_seconds: (!lengths.is_empty()).then(|| lengths.iter().sum()),
        media,
        images: image_urls(release),
        uri: release.uri.clone(),
    }
}
