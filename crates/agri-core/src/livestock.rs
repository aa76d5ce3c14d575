//! Livestock establishment records from the business register layer.

use crate::models::Feature;

fn text(feature: &Feature, keys: &[&str]) -> String {
    feature.first_text(keys).unwrap_or_default()
}

/// Replace raw register attributes with the fields shown in reports.
///
/// The `siret` attribute is kept so establishments can be deduplicated.
pub fn describe_establishment(raw: &Feature) -> Feature {
    let name = text(raw, &["nomUniteLe", "denominati"]);
    let first_name = text(raw, &["prenom1Uni", "prenomUsue"]);
    let company = text(raw, &["denominati"]);
    let activity = text(raw, &["activite_1"]);
    let city = text(raw, &["libelleCom"]);
    let street = [
        text(raw, &["numeroVoie"]),
        text(raw, &["typeVoieEt"]),
        text(raw, &["libelleVoi"]),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ");
    let town = [text(raw, &["codePostal"]), city.clone()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let address = [street, town]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let siret = text(raw, &["siret", "SIRET"]);

    let mut described = Feature::new(raw.geometry.clone(), Default::default());
    described.id = raw.id.clone();
    described.set_property("nom", name.clone());
    described.set_property("prenom", first_name);
    described.set_property("denomination", company.clone());
    described.set_property("activite", activity);
    described.set_property("adresse", address);

    let directory_query = format!("{name} {company}").trim().replace(' ', "+");
    let directory_link = if name.is_empty() {
        String::new()
    } else {
        format!(
            "https://www.pagesjaunes.fr/recherche/{}/{}",
            city.replace(' ', "+"),
            directory_query
        )
    };
    described.set_property("lien_annuaire", directory_link);

    if siret.is_empty() {
        described.set_property("lien_entreprise", "");
    } else {
        described.set_property(
            "lien_entreprise",
            format!("https://annuaire-entreprises.data.gouv.fr/etablissement/{siret}"),
        );
        described.set_property("siret", siret);
    }
    described
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_address_and_links() {
        let raw = Feature::from_properties(json!({
            "nomUniteLe": "DUPONT",
            "prenom1Uni": "Marie",
            "denominati": "GAEC DES PRES",
            "activite_1": "Élevage de vaches laitières",
            "numeroVoie": 12,
            "typeVoieEt": "RTE",
            "libelleVoi": "DE LA FERME",
            "codePostal": "19000",
            "libelleCom": "TULLE",
            "siret": "12345678900011"
        }));
        let described = describe_establishment(&raw);
        assert_eq!(described.str_property("adresse"), Some("12 RTE DE LA FERME, 19000 TULLE"));
        assert_eq!(
            described.str_property("lien_entreprise"),
            Some("https://annuaire-entreprises.data.gouv.fr/etablissement/12345678900011")
        );
        assert_eq!(described.str_property("siret"), Some("12345678900011"));
        assert!(described.property("nomUniteLe").is_none());
    }

    #[test]
    fn missing_fields_stay_blank() {
        let described = describe_establishment(&Feature::from_properties(json!({})));
        assert_eq!(described.str_property("adresse"), None);
        assert_eq!(described.str_property("lien_annuaire"), None);
        assert!(described.property("siret").is_none());
    }
}
