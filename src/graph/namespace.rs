//! Namespace and name derivation
//!
//! Pure functions from (kind, declared element name) to namespace segment,
//! class name, and file stem. No I/O, no state: identical input always yields
//! identical output, independent of processing order.

use super::TypeKind;

/// Effective namespace segment for a type
pub fn namespace_for(kind: TypeKind, name: &str) -> &'static str {
    match kind {
        TypeKind::Primitive => "primitive",
        TypeKind::Enumeration => "valueset",
        TypeKind::Resource | TypeKind::Container => "resource",
        // Nested backbone elements carry dotted names
        TypeKind::Complex => {
            if name.contains('.') {
                "backbone"
            } else {
                "element"
            }
        }
    }
}

/// Generated class name for a declared element name.
///
/// The `Fhir` prefix keeps primitive value types ("string", "boolean") from
/// colliding with the standard library in generated code.
pub fn class_name_for(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    out.push_str("Fhir");
    for part in name.split(['.', '-']) {
        out.push_str(&to_pascal_case(part));
    }
    out
}

/// Generated file stem for a declared element name
pub fn file_stem_for(name: &str) -> String {
    to_snake_case(&name.replace(['.', '-'], "_"))
}

/// Convert to PascalCase
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;

    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Convert to snake_case
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c == '-' || c == ' ' {
            result.push('_');
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_ascii_lowercase();
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_for() {
        assert_eq!(namespace_for(TypeKind::Primitive, "string"), "primitive");
        assert_eq!(
            namespace_for(TypeKind::Enumeration, "AdministrativeGender-list"),
            "valueset"
        );
        assert_eq!(namespace_for(TypeKind::Resource, "Patient"), "resource");
        assert_eq!(
            namespace_for(TypeKind::Container, "ResourceContainer"),
            "resource"
        );
        assert_eq!(namespace_for(TypeKind::Complex, "HumanName"), "element");
        assert_eq!(
            namespace_for(TypeKind::Complex, "Observation.ReferenceRange"),
            "backbone"
        );
    }

    #[test]
    fn test_namespace_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(
                namespace_for(TypeKind::Complex, "Observation.ReferenceRange"),
                "backbone"
            );
        }
    }

    #[test]
    fn test_class_name_for() {
        assert_eq!(class_name_for("string"), "FhirString");
        assert_eq!(class_name_for("Patient"), "FhirPatient");
        assert_eq!(
            class_name_for("Observation.ReferenceRange"),
            "FhirObservationReferenceRange"
        );
        assert_eq!(
            class_name_for("AdministrativeGender-list"),
            "FhirAdministrativeGenderList"
        );
    }

    #[test]
    fn test_file_stem_for() {
        assert_eq!(file_stem_for("string"), "string");
        assert_eq!(file_stem_for("Patient"), "patient");
        assert_eq!(
            file_stem_for("Observation.ReferenceRange"),
            "observation_reference_range"
        );
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("HumanName"), "human_name");
        assert_eq!(to_snake_case("dateTime"), "date_time");
        assert_eq!(to_snake_case("API"), "api");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("human_name"), "HumanName");
        assert_eq!(to_pascal_case("value-set"), "ValueSet");
    }
}
