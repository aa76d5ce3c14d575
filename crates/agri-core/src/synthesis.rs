//! Department-level roll-up of commune reports.

use crate::models::{Feature, LayerKind};
use crate::nearest::{compare_distances, DistanceKeys};
use crate::report::CommuneReport;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Size of the priority parcel list.
pub const DEFAULT_TOP_N: usize = 50;

const COMMUNE_KEYS: [&str; 3] = ["code_com", "code_insee", "insee"];
const SECTION_KEYS: [&str; 2] = ["section", "cadastre_section"];
const NUMBER_KEYS: [&str; 2] = ["numero", "cadastre_numero"];
const PARCEL_ID_KEYS: [&str; 2] = ["ID_PARCEL", "id_parcel"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSynthesis {
    /// Number of commune reports reduced.
    pub generated_from: usize,
    /// Reports that contributed at least one parcel.
    pub communes_with_parcels: usize,
    /// Parcels before deduplication.
    pub total_parcels: usize,
    pub distinct_parcels: usize,
    pub distinct_establishments: usize,
    pub top_parcels: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ParcelKey {
    Cadastral {
        commune: String,
        section: String,
        number: String,
    },
    Source(String),
    Structural(String),
}

fn parcel_key(parcel: &Feature) -> ParcelKey {
    let commune = parcel.first_text(&COMMUNE_KEYS);
    let section = parcel.first_text(&SECTION_KEYS);
    let number = parcel.first_text(&NUMBER_KEYS);
    if let (Some(commune), Some(section), Some(number)) = (commune, section, number) {
        return ParcelKey::Cadastral {
            commune,
            section: section.to_ascii_uppercase(),
            number: normalize_plot_number(&number),
        };
    }
    if let Some(id) = parcel.first_text(&PARCEL_ID_KEYS).or_else(|| parcel.source_id()) {
        return ParcelKey::Source(id);
    }
    ParcelKey::Structural(parcel.structural_key())
}

fn establishment_key(establishment: &Feature) -> ParcelKey {
    match establishment.first_text(&["siret", "SIRET"]) {
        Some(siret) => ParcelKey::Source(siret),
        None => ParcelKey::Structural(establishment.structural_key()),
    }
}

/// Plot numbers are published both padded ("0042") and bare ("42").
fn normalize_plot_number(number: &str) -> String {
    let trimmed = number.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Reduce commune reports to department totals and a ranked parcel list.
///
/// Duplicated parcels collapse to one entry carrying the smallest grid
/// distance seen. Parcels are ranked by grid distance, closest first, those
/// without a distance last, ties in first-seen order. Pure and idempotent.
pub fn synthesize(reports: &[CommuneReport], top_n: usize) -> DepartmentSynthesis {
    let keys = DistanceKeys::for_synthesis();

    let mut total_parcels = 0;
    let mut communes_with_parcels = 0;
    let mut index: HashMap<ParcelKey, usize> = HashMap::new();
    let mut parcels: Vec<(Option<f64>, Feature)> = Vec::new();

    for report in reports {
        let rpg = report.features(LayerKind::Rpg);
        if !rpg.is_empty() {
            communes_with_parcels += 1;
        }
        total_parcels += rpg.len();

        for parcel in rpg {
            let distance = keys.min_valid(&parcel.properties);
            let key = parcel_key(parcel);
            match index.get(&key).copied() {
                Some(slot) => {
                    let current = parcels[slot].0;
                    if compare_distances(distance, current).is_lt() {
                        parcels[slot] = (distance, parcel.clone());
                    }
                }
                None => {
                    index.insert(key, parcels.len());
                    parcels.push((distance, parcel.clone()));
                }
            }
        }
    }

    let establishments: HashSet<ParcelKey> = reports
        .iter()
        .flat_map(|report| report.features(LayerKind::Livestock))
        .map(establishment_key)
        .collect();

    let distinct_parcels = parcels.len();
    parcels.sort_by(|(a, _), (b, _)| compare_distances(*a, *b));
    parcels.truncate(top_n);

    DepartmentSynthesis {
        generated_from: reports.len(),
        communes_with_parcels,
        total_parcels,
        distinct_parcels,
        distinct_establishments: establishments.len(),
        top_parcels: parcels.into_iter().map(|(_, parcel)| parcel).collect(),
    }
}
