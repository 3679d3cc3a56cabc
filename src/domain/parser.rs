//! Raw upstream records to `RamenShop` entities.

use crate::domain::model::{RamenShop, ShopRecord};
use crate::utils::error::{HeatmapError, Result};

const NAME_TAG: &str = "name";
const LOCALIZED_NAME_TAG: &str = "name:ja";
const TYPE_TAG: &str = "ramen:type";
const DESCRIPTION_TAG: &str = "description";
const HOURS_TAG: &str = "opening_hours";

const ALWAYS_OPEN: &str = "24/7";
const CLOSED_KEYWORD: &str = "closed";

/// Checked in order; the first category with a matching keyword wins.
const TYPE_KEYWORDS: [(&str, &[&str]); 2] = [
    ("二郎系", &["二郎", "jiro"]),
    ("家系", &["家系", "iekei"]),
];

/// Converts one record. Fails only for records without usable coordinates,
/// which `PointSource` implementations filter out before this point.
pub fn parse(record: &ShopRecord) -> Result<RamenShop> {
    let location = record
        .location()
        .ok_or(HeatmapError::MalformedRecordError { id: record.id })?;

    Ok(RamenShop::new(
        record.id.to_string(),
        resolve_name(record),
        location,
        infer_type(record),
        infer_open_state(record),
    ))
}

/// Converts every usable record, silently dropping the rest.
pub fn parse_all(records: &[ShopRecord]) -> Vec<RamenShop> {
    let shops: Vec<RamenShop> = records
        .iter()
        .filter_map(|record| match parse(record) {
            Ok(shop) => Some(shop),
            Err(e) => {
                tracing::debug!("Skipping record: {}", e);
                None
            }
        })
        .collect();

    if shops.len() < records.len() {
        tracing::debug!(
            "Dropped {} of {} records without coordinates",
            records.len() - shops.len(),
            records.len()
        );
    }
    shops
}

fn non_empty_tag<'a>(record: &'a ShopRecord, key: &str) -> Option<&'a str> {
    record.tag(key).filter(|value| !value.is_empty())
}

fn resolve_name(record: &ShopRecord) -> String {
    non_empty_tag(record, NAME_TAG)
        .or_else(|| non_empty_tag(record, LOCALIZED_NAME_TAG))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Shop ID: {}", record.id))
}

fn infer_type(record: &ShopRecord) -> Option<String> {
    if let Some(explicit) = non_empty_tag(record, TYPE_TAG) {
        return Some(explicit.to_string());
    }

    let description = non_empty_tag(record, DESCRIPTION_TAG)?.to_lowercase();
    TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| description.contains(kw)))
        .map(|(category, _)| category.to_string())
}

/// Any schedule other than an explicit closure counts as open; the hours are
/// not evaluated against the current time.
fn infer_open_state(record: &ShopRecord) -> Option<bool> {
    let hours = non_empty_tag(record, HOURS_TAG)?;
    if hours == ALWAYS_OPEN {
        Some(true)
    } else if hours.contains(CLOSED_KEYWORD) {
        Some(false)
    } else {
        Some(true)
    }
}
