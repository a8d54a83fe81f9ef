//! Schema Ingestion
//!
//! Reads a directory of XSD documents and produces a [`StubArena`] of
//! unresolved type stubs. Umbrella documents (any `fhir-*` basename other
//! than the configured base document) and the fixed exclude list are skipped;
//! the base document must exist. Documents are processed in sorted path order
//! so the corpus hash is independent of filesystem enumeration order (the
//! stub set itself is order-independent by construction anyway: resolution
//! links nothing until every stub is registered).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::SourceConfig;
use crate::error::SchemaParseError;
use crate::graph::{Cardinality, MaxOccurs, TypeKind};

/// Valid declared element names: letters, digits, dots and dashes
fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9.\-]*$").unwrap())
}

/// An unresolved property reference
#[derive(Debug, Clone)]
pub struct PropertyStub {
    pub name: String,
    /// Raw type-name reference, not yet checked against the registry
    pub type_ref: String,
    pub cardinality: Cardinality,
    pub is_choice_member: bool,
    pub declaration_order: u32,
}

/// A type record before reference resolution
#[derive(Debug, Clone)]
pub struct TypeStub {
    pub name: String,
    pub kind: TypeKind,
    /// Declared base reference, if any; unresolved
    pub base_ref: Option<String>,
    pub properties: Vec<PropertyStub>,
    pub enum_values: Vec<String>,
    pub source_location: PathBuf,
}

/// The mutable, ingest-time stub set. Promoted to a frozen
/// [`crate::graph::TypeGraph`] by [`crate::graph::resolve`].
#[derive(Debug, Default)]
pub struct StubArena {
    pub(crate) stubs: Vec<TypeStub>,
    pub(crate) corpus_hash: String,
    pub(crate) document_count: usize,
}

impl StubArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stub: TypeStub) {
        self.stubs.push(stub);
    }

    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeStub> {
        self.stubs.iter()
    }

    pub fn corpus_hash(&self) -> &str {
        &self.corpus_hash
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }
}

/// Ingest every schema document under `schema_dir`.
pub fn ingest(schema_dir: &Path, config: &SourceConfig) -> Result<StubArena, SchemaParseError> {
    info!(
        dir = %schema_dir.display(),
        "creating in-memory representation of the schema corpus"
    );

    let base_path = schema_dir.join(&config.base_document);
    if !base_path.is_file() {
        return Err(SchemaParseError::MissingBaseDocument { path: base_path });
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(schema_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "xsd")
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();

    let mut arena = StubArena::new();
    let mut hasher = Sha256::new();

    for path in paths {
        let basename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        if basename != config.base_document && basename.starts_with("fhir-") {
            debug!(file = %path.display(), "skipping aggregate document");
            continue;
        }
        if config.exclude.iter().any(|e| e == &basename) {
            debug!(file = %path.display(), "skipping excluded document");
            continue;
        }

        let content =
            std::fs::read_to_string(&path).map_err(|source| SchemaParseError::Unreadable {
                path: path.clone(),
                source,
            })?;
        hasher.update(content.as_bytes());

        parse_document(&content, &path, &mut arena)?;
        arena.document_count += 1;
    }

    arena.corpus_hash = format!("{:x}", hasher.finalize());

    info!(
        types = arena.len(),
        documents = arena.document_count,
        "ingestion complete"
    );
    Ok(arena)
}

/// Parse one schema document into stubs
fn parse_document(
    content: &str,
    path: &Path,
    arena: &mut StubArena,
) -> Result<(), SchemaParseError> {
    debug!(file = %path.display(), "parsing type declarations");

    let doc = roxmltree::Document::parse(content).map_err(|e| SchemaParseError::Malformed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "schema" {
        return Err(SchemaParseError::UnexpectedRoot {
            path: path.to_path_buf(),
            found: root.tag_name().name().to_string(),
        });
    }

    for child in root.children().filter(|n| n.is_element()) {
        let tag = child.tag_name().name();
        if tag != "complexType" && tag != "simpleType" {
            continue;
        }

        let Some(name) = child.attribute("name") else {
            debug!(
                file = %path.display(),
                tag,
                "skipping unnamed schema element"
            );
            continue;
        };
        if !name_pattern().is_match(name) {
            debug!(file = %path.display(), name, "skipping invalidly named element");
            continue;
        }

        let stub = if tag == "complexType" {
            extract_complex_type(&child, name, path)
        } else {
            extract_simple_type(&child, name, path)
        };

        debug!(
            name = %stub.name,
            kind = %stub.kind,
            file = %path.display(),
            "located type declaration"
        );
        arena.push(stub);
    }

    Ok(())
}

fn extract_complex_type(node: &roxmltree::Node, name: &str, path: &Path) -> TypeStub {
    let base_ref = declared_base(node);
    let kind = classify_complex(name, base_ref.as_deref());

    let mut properties = Vec::new();
    let mut order: u32 = 0;

    for el in node.descendants().filter(|n| n.is_element()) {
        if el.tag_name().name() != "element" {
            continue;
        }
        let (Some(prop_name), Some(type_ref)) = (el.attribute("name"), el.attribute("type"))
        else {
            // ref= placeholders and anonymous scaffolding
            debug!(
                parent = name,
                file = %path.display(),
                "skipping property element without name/type"
            );
            continue;
        };
        if type_ref.contains(':') {
            // Foreign-namespace value attributes; intrinsic to the codec,
            // never part of the resolved graph
            debug!(
                parent = name,
                property = prop_name,
                type_ref,
                "skipping foreign-namespace property"
            );
            continue;
        }

        let is_choice_member = el
            .ancestors()
            .take_while(|a| a.id() != node.id())
            .any(|a| a.tag_name().name() == "choice");

        properties.push(PropertyStub {
            name: prop_name.to_string(),
            type_ref: type_ref.to_string(),
            cardinality: Cardinality {
                min: occurs_attr(el, "minOccurs").unwrap_or(1),
                max: max_occurs_attr(el),
            },
            is_choice_member,
            declaration_order: order,
        });
        order += 1;
    }

    TypeStub {
        name: name.to_string(),
        kind,
        base_ref,
        properties,
        enum_values: Vec::new(),
        source_location: path.to_path_buf(),
    }
}

fn extract_simple_type(node: &roxmltree::Node, name: &str, path: &Path) -> TypeStub {
    let enum_values: Vec<String> = node
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "enumeration")
        .filter_map(|n| n.attribute("value").map(String::from))
        .collect();

    let kind = classify_simple(name, !enum_values.is_empty());

    TypeStub {
        name: name.to_string(),
        kind,
        base_ref: declared_base(node),
        properties: Vec::new(),
        enum_values,
        source_location: path.to_path_buf(),
    }
}

/// Declared base reference from xs:extension / xs:restriction.
/// XML-Schema builtin bases (xs:*) root the chain and resolve to None.
fn declared_base(node: &roxmltree::Node) -> Option<String> {
    node.descendants()
        .filter(|n| n.is_element())
        .find(|n| matches!(n.tag_name().name(), "extension" | "restriction"))
        .and_then(|n| n.attribute("base"))
        .filter(|base| !base.contains(':'))
        .map(String::from)
}

fn classify_complex(name: &str, base: Option<&str>) -> TypeKind {
    if name == "ResourceContainer" {
        TypeKind::Container
    } else if name == "Resource"
        || name == "DomainResource"
        || matches!(base, Some("Resource") | Some("DomainResource"))
    {
        TypeKind::Resource
    } else if name.starts_with(|c: char| c.is_ascii_lowercase()) {
        // Primitive value types are lowercase in this grammar
        TypeKind::Primitive
    } else {
        TypeKind::Complex
    }
}

fn classify_simple(name: &str, has_enum: bool) -> TypeKind {
    if name.ends_with("-primitive") {
        TypeKind::Primitive
    } else if name.ends_with("-list") || has_enum {
        TypeKind::Enumeration
    } else {
        TypeKind::Primitive
    }
}

fn occurs_attr(el: roxmltree::Node, attr: &str) -> Option<u32> {
    el.attribute(attr).and_then(|v| v.parse().ok())
}

fn max_occurs_attr(el: roxmltree::Node) -> MaxOccurs {
    match el.attribute("maxOccurs") {
        Some("unbounded") => MaxOccurs::Unbounded,
        Some(v) => MaxOccurs::Bounded(v.parse().unwrap_or(1)),
        None => MaxOccurs::Bounded(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="http://hl7.org/fhir">
  <xs:complexType name="Element">
    <xs:sequence>
      <xs:element name="extension" type="Extension" minOccurs="0" maxOccurs="unbounded"/>
    </xs:sequence>
  </xs:complexType>
  <xs:complexType name="Period">
    <xs:complexContent>
      <xs:extension base="Element">
        <xs:sequence>
          <xs:element name="start" type="dateTime" minOccurs="0"/>
          <xs:element name="end" type="dateTime" minOccurs="0"/>
        </xs:sequence>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
  <xs:complexType name="string">
    <xs:simpleContent>
      <xs:extension base="xs:string"/>
    </xs:simpleContent>
  </xs:complexType>
  <xs:simpleType name="AdministrativeGender-list">
    <xs:restriction base="xs:string">
      <xs:enumeration value="male"/>
      <xs:enumeration value="female"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:complexType/>
</xs:schema>"#;

    fn parse_sample() -> StubArena {
        let mut arena = StubArena::new();
        parse_document(SAMPLE, Path::new("sample.xsd"), &mut arena).unwrap();
        arena
    }

    #[test]
    fn test_extracts_named_types_only() {
        let arena = parse_sample();
        // The unnamed trailing complexType is scaffolding and skipped
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn test_property_extraction_preserves_order() {
        let arena = parse_sample();
        let period = arena.iter().find(|s| s.name == "Period").unwrap();
        assert_eq!(period.base_ref.as_deref(), Some("Element"));
        let names: Vec<&str> = period.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["start", "end"]);
        assert_eq!(period.properties[0].declaration_order, 0);
        assert_eq!(period.properties[1].declaration_order, 1);
    }

    #[test]
    fn test_xsd_builtin_base_roots_the_chain() {
        let arena = parse_sample();
        let string_ty = arena.iter().find(|s| s.name == "string").unwrap();
        assert_eq!(string_ty.base_ref, None);
        assert_eq!(string_ty.kind, TypeKind::Primitive);
    }

    #[test]
    fn test_enumeration_values_captured() {
        let arena = parse_sample();
        let gender = arena
            .iter()
            .find(|s| s.name == "AdministrativeGender-list")
            .unwrap();
        assert_eq!(gender.kind, TypeKind::Enumeration);
        assert_eq!(gender.enum_values, vec!["male", "female"]);
    }

    #[test]
    fn test_unbounded_cardinality() {
        let arena = parse_sample();
        let element = arena.iter().find(|s| s.name == "Element").unwrap();
        assert_eq!(element.properties[0].cardinality.max, MaxOccurs::Unbounded);
        assert!(element.properties[0].cardinality.is_collection());
    }

    #[test]
    fn test_choice_membership() {
        let xsd = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="Observation">
    <xs:sequence>
      <xs:element name="status" type="code"/>
      <xs:choice>
        <xs:element name="valueQuantity" type="Quantity"/>
        <xs:element name="valueString" type="string"/>
      </xs:choice>
    </xs:sequence>
  </xs:complexType>
</xs:schema>"#;
        let mut arena = StubArena::new();
        parse_document(xsd, Path::new("obs.xsd"), &mut arena).unwrap();
        let obs = arena.iter().find(|s| s.name == "Observation").unwrap();
        assert!(!obs.properties[0].is_choice_member);
        assert!(obs.properties[1].is_choice_member);
        assert!(obs.properties[2].is_choice_member);
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let mut arena = StubArena::new();
        let err = parse_document("<xs:schema", Path::new("bad.xsd"), &mut arena).unwrap_err();
        assert!(matches!(err, SchemaParseError::Malformed { .. }));
    }

    #[test]
    fn test_wrong_root_is_fatal() {
        let mut arena = StubArena::new();
        let err = parse_document(
            "<html xmlns:xs=\"urn:x\"><p/></html>",
            Path::new("bad.xsd"),
            &mut arena,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaParseError::UnexpectedRoot { .. }));
    }

    #[test]
    fn test_classify_complex() {
        assert_eq!(classify_complex("Patient", Some("DomainResource")), TypeKind::Resource);
        assert_eq!(classify_complex("Resource", None), TypeKind::Resource);
        assert_eq!(classify_complex("ResourceContainer", None), TypeKind::Container);
        assert_eq!(classify_complex("HumanName", Some("Element")), TypeKind::Complex);
        assert_eq!(classify_complex("boolean", Some("Element")), TypeKind::Primitive);
    }
}
