//! Compatible car type derivation

use std::collections::BTreeSet;

use crate::models::CarType;

/// Car types that already carry firmware for an ECU family
///
/// Returns the lowercase names of every catalog car type holding at least
/// one version of an ECU named `ecu_name` (any model number). Used to offer
/// compatibility choices for a new version; an empty set is a valid answer.
pub fn compute_compatible_car_types(ecu_name: &str, catalog: &[CarType]) -> BTreeSet<String> {
    catalog
        .iter()
        .filter(|car_type| {
            car_type
                .ecus
                .iter()
                .any(|ecu| ecu.name == ecu_name && !ecu.versions.is_empty())
        })
        .map(|car_type| car_type.name.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ecu, FirmwareVersion};

    fn car_type(name: &str, ecus: Vec<Ecu>) -> CarType {
        CarType {
            name: name.to_string(),
            model_number: format!("{}-M", name),
            manufactured_count: 0,
            car_ids: vec![],
            ecus,
        }
    }

    fn ecu_with_versions(name: &str, model: &str, versions: &[&str]) -> Ecu {
        Ecu {
            name: name.to_string(),
            model_number: model.to_string(),
            versions: versions
                .iter()
                .map(|v| FirmwareVersion {
                    version_number: v.to_string(),
                    compatible_car_types: vec![],
                    hex_file_path: format!("blob/{}", v),
                })
                .collect(),
        }
    }

    #[test]
    fn test_collects_car_types_with_versions_of_same_family() {
        let catalog = vec![
            car_type("Sedan", vec![ecu_with_versions("Engine", "E1", &["1.0"])]),
            car_type("Coupe", vec![ecu_with_versions("Engine", "E2", &["2.0"])]),
            car_type("Truck", vec![ecu_with_versions("Engine", "E1", &[])]),
            car_type("Van", vec![ecu_with_versions("Brakes", "B1", &["1.0"])]),
        ];

        let set = compute_compatible_car_types("Engine", &catalog);
        let names: Vec<&str> = set.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["coupe", "sedan"]);
    }

    #[test]
    fn test_unknown_ecu_yields_empty_set() {
        let catalog = vec![car_type(
            "Sedan",
            vec![ecu_with_versions("Engine", "E1", &["1.0"])],
        )];
        assert!(compute_compatible_car_types("Gateway", &catalog).is_empty());
        assert!(compute_compatible_car_types("Engine", &[]).is_empty());
    }
}
