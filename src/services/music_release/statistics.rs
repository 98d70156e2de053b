use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{PurchaseInfo, decode_ids, decode_json};
use crate::entities::music_release;
use crate::error::CatalogResult;

const RECENTLY_ADDED: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCount {
    pub year: i32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedCount {
    pub id: i64,
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedRelease {
    pub id: i64,
    pub title: String,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseStatistics {
    pub releases_with_price: u64,
    pub total_value: f64,
    pub average_price: Option<f64>,
    pub most_expensive: Option<PricedRelease>,
    pub least_expensive: Option<PricedRelease>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRelease {
    pub id: i64,
    pub title: String,
    pub date_added: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStatistics {
    pub total_releases: u64,
    pub live_releases: u64,
    pub distinct_artists: u64,
    pub releases_by_year: Vec<YearCount>,
    pub releases_by_format: Vec<NamedCount>,
    pub releases_by_country: Vec<NamedCount>,
    pub releases_by_genre: Vec<NamedCount>,
    pub purchases: PurchaseStatistics,
    pub recently_added: Vec<RecentRelease>,
}

/// Per-lookup counts keyed by id, before names are attached.
#[derive(Debug, Default)]
pub struct Tally {
    pub formats: HashMap<i64, u64>,
    pub countries: HashMap<i64, u64>,
    pub genres: HashMap<i64, u64>,
}

/// Names for the ids a [`Tally`] mentions.
#[derive(Debug, Default)]
pub struct LookupNames {
    pub formats: HashMap<i64, String>,
    pub countries: HashMap<i64, String>,
    pub genres: HashMap<i64, String>,
}

pub fn tally(releases: &[music_release::Model]) -> CatalogResult<Tally> {
    let mut tally = Tally::default();
    for release in releases {
        if let Some(id) = release.format_id {
            *tally.formats.entry(id).or_default() += 1;
        }
        if let Some(id) = release.country_id {
            *tally.countries.entry(id).or_default() += 1;
        }
        for id in decode_ids(&release.genres)? {
            *tally.genres.entry(id).or_default() += 1;
        }
    }
    Ok(tally)
}

fn named_counts(counts: &HashMap<i64, u64>, names: &HashMap<i64, String>) -> Vec<NamedCount> {
    let mut entries: Vec<NamedCount> = counts
        .iter()
        .filter_map(|(id, count)| {
            names.get(id).map(|name| NamedCount {
                id: *id,
                name: name.clone(),
                count: *count,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries
}

fn purchase_statistics(releases: &[music_release::Model]) -> CatalogResult<PurchaseStatistics> {
    let mut priced = Vec::new();
    for release in releases {
        let info: Option<PurchaseInfo> = decode_json(&release.purchase_info)?;
        if let Some(price) = info.and_then(|info| info.price) {
            priced.push(PricedRelease {
                id: release.id,
                title: release.title.clone(),
                price,
            });
        }
    }

    let total_value: f64 = priced.iter().map(|p| p.price).sum();
    let count = priced.len() as u64;
    let by_price = |a: &&PricedRelease, b: &&PricedRelease| a.price.total_cmp(&b.price);
    Ok(PurchaseStatistics {
        releases_with_price: count,
        total_value,
        average_price: (count > 0).then(|| total_value / count as f64),
        most_expensive: priced.iter().max_by(by_price).cloned(),
        least_expensive: priced.iter().min_by(by_price).cloned(),
    })
}

pub fn build(
    releases: &[music_release::Model],
    tally: &Tally,
    names: &LookupNames,
) -> CatalogResult<ReleaseStatistics> {
    let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
    let mut artists = HashSet::new();
    for release in releases {
        if let Some(year) = release.release_year {
            *by_year.entry(year).or_default() += 1;
        }
        artists.extend(decode_ids(&release.artists)?);
    }

    let mut recent: Vec<&music_release::Model> = releases.iter().collect();
    recent.sort_by(|a, b| b.date_added.cmp(&a.date_added).then(b.id.cmp(&a.id)));

    Ok(ReleaseStatistics {
        total_releases: releases.len() as u64,
        live_releases: releases.iter().filter(|r| r.live).count() as u64,
        distinct_artists: artists.len() as u64,
        releases_by_year: by_year
            .into_iter()
            .map(|(year, count)| YearCount { year, count })
            .collect(),
        releases_by_format: named_counts(&tally.formats, &names.formats),
        releases_by_country: named_counts(&tally.countries, &names.countries),
        releases_by_genre: named_counts(&tally.genres, &names.genres),
        purchases: purchase_statistics(releases)?,
        recently_added: recent
            .into_iter()
            .take(RECENTLY_ADDED)
            .map(|r| RecentRelease {
                id: r.id,
                title: r.title.clone(),
                date_added: r.date_added,
            })
            .collect(),
    })
}
