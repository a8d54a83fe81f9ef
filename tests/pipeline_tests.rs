//! Pipeline Integration Tests
//!
//! Drives the full ingest -> resolve -> emit pipeline over the XSD fixture
//! corpus and checks the properties that matter: determinism, referential
//! integrity, inheritance flattening, choice exclusivity, skip rules, and
//! the minimal two-document scenario.

use std::path::{Path, PathBuf};

use fhirgen::graph::{resolve, TypeKind};
use fhirgen::{ingest, Builder, BuildState, Config, MemoryWriter};

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config() -> Config {
    let mut config = Config::default();
    config.source.path = Some(fixtures_path());
    config.output.path = Some(PathBuf::from("generated"));
    config.tests.endpoint = Some("https://example.org/fhir".to_string());
    config
}

fn run_build(config: &Config) -> MemoryWriter {
    let mut writer = MemoryWriter::new();
    let mut builder = Builder::new(config, &mut writer).unwrap();
    builder.build().unwrap();
    assert_eq!(builder.state(), BuildState::Done);
    writer
}

// =============================================================================
// Graph Construction
// =============================================================================

#[test]
fn test_fixture_graph_resolves() {
    let config = fixture_config();
    let arena = ingest(&fixtures_path(), &config.source).unwrap();
    let graph = resolve(arena, &config.resolution.cycle_whitelist).unwrap();

    assert_eq!(graph.type_count(), 11);
    assert!(graph.contains("Patient"));
    assert!(graph.contains("Observation.ReferenceRange"));
    assert_eq!(graph.get("string").unwrap().kind, TypeKind::Primitive);
    assert_eq!(
        graph.get("AdministrativeGender-list").unwrap().kind,
        TypeKind::Enumeration
    );
    assert_eq!(graph.get("Patient").unwrap().kind, TypeKind::Resource);
}

#[test]
fn test_umbrella_document_contributes_nothing() {
    let config = fixture_config();
    let arena = ingest(&fixtures_path(), &config.source).unwrap();
    let graph = resolve(arena, &config.resolution.cycle_whitelist).unwrap();

    // fhir-all.xsd declares ShouldNotExist, but aggregate documents are
    // skipped wholesale
    assert!(!graph.contains("ShouldNotExist"));
}

#[test]
fn test_excluded_document_is_skipped() {
    let config = fixture_config();
    let arena = ingest(&fixtures_path(), &config.source).unwrap();
    let graph = resolve(arena, &config.resolution.cycle_whitelist).unwrap();

    assert!(!graph.contains("NamespaceOnly"));
}

#[test]
fn test_container_is_tagged_for_recursion() {
    let config = fixture_config();
    let arena = ingest(&fixtures_path(), &config.source).unwrap();
    let graph = resolve(arena, &config.resolution.cycle_whitelist).unwrap();

    assert!(graph.get("ResourceContainer").unwrap().recursive_container);
    assert!(!graph.get("Patient").unwrap().recursive_container);
}

#[test]
fn test_domain_resource_classification() {
    let config = fixture_config();
    let arena = ingest(&fixtures_path(), &config.source).unwrap();
    let graph = resolve(arena, &config.resolution.cycle_whitelist).unwrap();

    assert!(graph.is_domain_resource("Patient"));
    assert!(graph.is_domain_resource("Observation"));
    assert!(!graph.is_domain_resource("Resource"));
    assert!(!graph.is_domain_resource("HumanName"));
}

#[test]
fn test_missing_base_document_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("other.xsd"),
        "<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\"/>",
    )
    .unwrap();

    let config = Config::default();
    let err = ingest(dir.path(), &config.source).unwrap_err();
    assert!(err.to_string().contains("fhir-base.xsd"));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_output_is_byte_identical_across_runs() {
    let config = fixture_config();
    let first = run_build(&config);
    let second = run_build(&config);

    assert_eq!(first.files(), second.files());
    assert!(!first.is_empty());
}

#[test]
fn test_definition_is_memoized() {
    let config = fixture_config();
    let mut writer = MemoryWriter::new();
    let mut builder = Builder::new(&config, &mut writer).unwrap();

    let hash = builder.definition().unwrap().corpus_hash().to_string();
    assert_eq!(builder.state(), BuildState::DefinitionBuilt);

    // Second request returns the same frozen graph, not a re-run
    let hash_again = builder.definition().unwrap().corpus_hash().to_string();
    assert_eq!(hash, hash_again);
}

// =============================================================================
// Emitted Artifacts
// =============================================================================

#[test]
fn test_full_pipeline_emits_expected_artifacts() {
    let writer = run_build(&fixture_config());

    // Per-type classes
    assert!(writer.get("src/resource/patient.rs").is_some());
    assert!(writer.get("src/resource/observation.rs").is_some());
    assert!(writer.get("src/backbone/observation_reference_range.rs").is_some());
    assert!(writer.get("src/valueset/administrative_gender_list.rs").is_some());
    assert!(writer.get("src/element/human_name.rs").is_some());

    // Primitives are aliases, never standalone files
    assert!(writer.get("src/primitive/string.rs").is_none());
    assert!(writer
        .get_str("src/primitive/mod.rs")
        .unwrap()
        .contains("pub type FhirString = String;"));

    // Static artifacts
    for path in [
        "src/constants.rs",
        "src/type_map.rs",
        "src/fhir_type.rs",
        "src/contained_type.rs",
        "src/comment_container.rs",
        "src/validation.rs",
        "src/change_tracking.rs",
        "src/serialization.rs",
        "src/parser_config.rs",
        "src/parser.rs",
        "src/lib.rs",
        "src/resource/mod.rs",
    ] {
        assert!(writer.get(path).is_some(), "missing static artifact {}", path);
    }

    // Tests: unit scaffolding for every non-primitive type, integration for
    // domain resources only
    assert!(writer.get("tests/resource/patient.rs").is_some());
    assert!(writer.get("tests/integration/patient.rs").is_some());
    assert!(writer.get("tests/integration/observation.rs").is_some());
    assert!(writer.get("tests/integration/human_name.rs").is_none());
    assert!(writer.get("tests/integration/resource.rs").is_none());
}

#[test]
fn test_inheritance_flattening_in_patient() {
    let writer = run_build(&fixture_config());
    let patient = writer.get_str("src/resource/patient.rs").unwrap();

    // Inherited id plus local properties, each exactly once
    assert_eq!(patient.matches("pub fn get_id(").count(), 1);
    assert_eq!(patient.matches("pub fn get_name(").count(), 1);
    assert_eq!(patient.matches("pub fn get_gender(").count(), 1);
    assert!(patient.contains("inherited from `Resource`"));
}

#[test]
fn test_choice_exclusivity_in_observation() {
    let writer = run_build(&fixture_config());
    let observation = writer.get_str("src/resource/observation.rs").unwrap();

    // Serializer: if/else chain means only the first populated member wins
    let chain = "if let Some(v) = &self.value_string";
    let else_branch = "else if let Some(v) = &self.value_code";
    assert!(observation.contains(chain));
    assert!(observation.contains(else_branch));
    let chain_pos = observation.find(chain).unwrap();
    let else_pos = observation.find(else_branch).unwrap();
    assert!(chain_pos < else_pos, "declaration order must drive the chain");

    // Setters clear the rest of the group
    let setter_pos = observation.find("pub fn set_value_string(").unwrap();
    let clear = &observation[setter_pos..setter_pos + 200];
    assert!(clear.contains("self.value_code = None;"));
}

#[test]
fn test_required_fields_generate_validators() {
    let writer = run_build(&fixture_config());

    // status has minOccurs=1, so the generated validator asserts it
    let observation = writer.get_str("src/resource/observation.rs").unwrap();
    assert!(observation.contains("assert_required(self, \"status\""));

    // choice members are exclusive, never individually required
    assert!(!observation.contains("assert_required(self, \"valueString\""));

    let patient = writer.get_str("src/resource/patient.rs").unwrap();
    assert!(patient.contains("pub fn validate(&self) -> Vec<String>"));
}

#[test]
fn test_container_codec_delegates() {
    let writer = run_build(&fixture_config());
    let container = writer.get_str("src/resource/resource_container.rs").unwrap();

    assert!(container.contains("return format!(\"<Patient>{}</Patient>\", v.xml_serialize());"));
    assert!(container.contains("fn clear(&mut self)"));
}

#[test]
fn test_type_map_covers_graph() {
    let writer = run_build(&fixture_config());
    let type_map = writer.get_str("src/type_map.rs").unwrap();

    for name in [
        "Patient",
        "Observation",
        "ResourceContainer",
        "string",
        "AdministrativeGender-list",
    ] {
        assert!(type_map.contains(&format!("\"{}\"", name)), "missing {}", name);
    }
}

#[test]
fn test_skip_tests_suppresses_test_artifacts() {
    let mut config = fixture_config();
    config.tests.skip = true;
    let writer = run_build(&config);

    assert!(writer.paths().all(|p| !p.starts_with("tests")));
}

#[test]
fn test_xml_parse_options_are_passed_through() {
    let mut config = fixture_config();
    config.xml.parse_options = vec!["NOBLANKS".to_string()];
    let writer = run_build(&config);

    let patient = writer.get_str("src/resource/patient.rs").unwrap();
    assert!(patient.contains("pub const XML_PARSE_OPTIONS: &'static [&'static str] = &[\"NOBLANKS\"];"));
}

// =============================================================================
// Two-Document Scenario
// =============================================================================

#[test]
fn test_minimal_two_document_scenario() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("base.xsd"),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="http://hl7.org/fhir">
  <xs:complexType name="string">
    <xs:simpleContent>
      <xs:extension base="xs:string"/>
    </xs:simpleContent>
  </xs:complexType>
  <xs:complexType name="Resource">
    <xs:sequence>
      <xs:element name="id" type="string" minOccurs="0"/>
    </xs:sequence>
  </xs:complexType>
</xs:schema>"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("patient.xsd"),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="http://hl7.org/fhir">
  <xs:complexType name="Patient">
    <xs:complexContent>
      <xs:extension base="Resource">
        <xs:sequence>
          <xs:element name="name" type="string" minOccurs="0"/>
        </xs:sequence>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
</xs:schema>"#,
    )
    .unwrap();

    let mut config = Config::default();
    config.source.path = Some(dir.path().to_path_buf());
    config.source.base_document = "base.xsd".to_string();
    config.output.path = Some(PathBuf::from("generated"));
    config.tests.skip = true;

    let writer = run_build(&config);

    // Exactly two non-static class artifacts
    let class_files: Vec<String> = writer
        .paths()
        .filter(|p| {
            let s = p.display().to_string();
            s.starts_with("src/")
                && s.ends_with(".rs")
                && !s.ends_with("mod.rs")
                && p.components().count() == 3
        })
        .map(|p| p.display().to_string())
        .collect();
    assert_eq!(
        class_files,
        vec![
            "src/resource/patient.rs".to_string(),
            "src/resource/resource.rs".to_string()
        ]
    );

    // Type map carries both names
    let type_map = writer.get_str("src/type_map.rs").unwrap();
    assert!(type_map.contains("\"Resource\""));
    assert!(type_map.contains("\"Patient\""));

    // Patient exposes both its own and the inherited accessor
    let patient = writer.get_str("src/resource/patient.rs").unwrap();
    assert!(patient.contains("pub fn get_id("));
    assert!(patient.contains("pub fn get_name("));
}
