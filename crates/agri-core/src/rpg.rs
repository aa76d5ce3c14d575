//! RPG (agricultural plot register) helpers.

use crate::filters::{AREA_HA_KEY, DISTANCE_BT_KEY, DISTANCE_HTA_KEY};
use crate::models::Feature;
use crate::nearest::closest_distance;
use crate::spatial::{centroid, geodesic_area_m2, round_cm};
use crate::text::fold_key;
use serde_json::{json, Value};

/// Property holding the declared crop code on RPG plots.
pub const CULTURE_CODE_KEY: &str = "CODE_CULTU";
/// Property the report builder writes the decoded crop label to.
pub const CULTURE_LABEL_KEY: &str = "culture";

const CULTURE_LABELS: &[(&str, &str)] = &[
    ("ARA", "Arachide"),
    ("AVH", "Avoine d'hiver"),
    ("AVP", "Avoine de printemps"),
    ("BDH", "Blé dur d'hiver"),
    ("BDP", "Blé dur de printemps"),
    ("BTH", "Blé tendre d'hiver"),
    ("BTP", "Blé tendre de printemps"),
    ("BVF", "Betterave fourragère"),
    ("CHV", "Chanvre"),
    ("CZH", "Colza d'hiver"),
    ("CZP", "Colza de printemps"),
    ("EPE", "Épeautre"),
    ("FEV", "Fève"),
    ("FVL", "Féverole semée avant le 31/05"),
    ("J5M", "Jachère de 5 ans ou moins"),
    ("J6P", "Jachère de 6 ans ou plus"),
    ("JNO", "Jachère noire"),
    ("LEC", "Lentille cultivée (non fourragère)"),
    ("LIF", "Lin fibres"),
    ("LIH", "Lin non textile d'hiver"),
    ("LUZ", "Luzerne"),
    ("MCR", "Mélange de céréales"),
    ("MID", "Maïs doux"),
    ("MIE", "Maïs ensilage"),
    ("MIS", "Maïs"),
    ("MLT", "Millet"),
    ("ORH", "Orge d'hiver"),
    ("ORP", "Orge de printemps"),
    ("PCH", "Pois chiche"),
    ("PHI", "Pois d'hiver"),
    ("PPH", "Prairie permanente"),
    ("PPR", "Pois de printemps semé avant le 31/05"),
    ("PRL", "Prairie en rotation longue"),
    ("PTR", "Autre prairie temporaire de 5 ans ou moins"),
    ("RIZ", "Riz"),
    ("SGH", "Seigle d'hiver"),
    ("SOG", "Sorgho"),
    ("SOJ", "Soja"),
    ("SRS", "Sarrasin"),
    ("TRN", "Tournesol"),
    ("TTH", "Triticale d'hiver"),
    ("VRC", "Vigne : raisins de cuve"),
];

/// Decode an RPG crop code into its label. Unknown codes yield `None`.
pub fn culture_label(code: &str) -> Option<&'static str> {
    let code = code.trim();
    CULTURE_LABELS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, label)| *label)
}

/// Best label for a plot: the decoded code, else the raw code.
pub fn feature_culture(feature: &Feature) -> Option<String> {
    if let Some(label) = feature.str_property(CULTURE_LABEL_KEY) {
        return Some(label.to_string());
    }
    let code = feature.str_property(CULTURE_CODE_KEY)?;
    Some(
        culture_label(code)
            .map(str::to_string)
            .unwrap_or_else(|| code.to_string()),
    )
}

/// Case- and accent-insensitive substring match on the plot's crop.
pub fn culture_matches(feature: &Feature, needle: &str) -> bool {
    let needle = fold_key(needle);
    if needle.is_empty() {
        return true;
    }
    let code_hit = feature
        .str_property(CULTURE_CODE_KEY)
        .map(|code| fold_key(code) == needle)
        .unwrap_or(false);
    code_hit
        || feature_culture(feature)
            .map(|label| fold_key(&label).contains(&needle))
            .unwrap_or(false)
}

/// Enrich a plot with area, centroid, crop label and grid distances.
///
/// Distances are measured from the plot centroid to the closest feature of
/// each substation layer and rounded to centimeters.
pub fn annotate_parcel(parcel: &Feature, bt: &[Feature], hta: &[Feature]) -> Feature {
    let mut annotated = parcel.clone();

    if let Some(area_m2) = annotated.geometry.as_ref().and_then(geodesic_area_m2) {
        let area_ha = (area_m2 / 10_000.0 * 1_000.0).round() / 1_000.0;
        annotated.set_property(AREA_HA_KEY, area_ha);
    }
    if let Some(label) = feature_culture(&annotated) {
        annotated.set_property(CULTURE_LABEL_KEY, label);
    }

    let centre = annotated.geometry.as_ref().and_then(centroid);
    if let Some((lat, lon)) = centre {
        annotated.set_property("coords", json!([lat, lon]));
        annotated.set_property(
            "lien_geoportail",
            format!("https://www.geoportail.gouv.fr/carte?c={lon},{lat}&z=18"),
        );
        for (key, substations) in [(DISTANCE_BT_KEY, bt), (DISTANCE_HTA_KEY, hta)] {
            let distance = closest_distance(substations, lat, lon).map(round_cm);
            annotated.set_property(key, distance.map(Value::from).unwrap_or(Value::Null));
        }
    }
    annotated
}
