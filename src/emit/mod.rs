//! Code Emission
//!
//! Renders artifacts from the frozen graph.
//!
//! Architecture:
//! - RenderContext: explicit, statically-declared input to every render call
//! - TemplateSet: render functions keyed by (TypeKind, ArtifactKind),
//!   validated at construction
//! - statics: cross-cutting artifacts computed from the whole graph
//!
//! The key constraint: render functions consume ONLY the RenderContext.
//! No ambient state, no mutable shared buffer, no raw XML.

pub mod class;
pub mod json;
pub mod statics;
pub mod testgen;
pub mod xml;

use std::collections::HashMap;

use crate::config::Config;
use crate::error::EmissionError;
use crate::graph::{Property, Type, TypeGraph, TypeKind};

// =============================================================================
// Artifact Kind
// =============================================================================

/// What to render for a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The class body (struct/enum definition plus accessors)
    Class,
    /// XML serializer/deserializer impl
    XmlCodec,
    /// JSON serializer impl
    JsonCodec,
    /// Unit-test scaffolding
    UnitTest,
    /// Endpoint round-trip test; domain resources only
    IntegrationTest,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactKind::Class => "class",
            ArtifactKind::XmlCodec => "xml-codec",
            ArtifactKind::JsonCodec => "json-codec",
            ArtifactKind::UnitTest => "unit-test",
            ArtifactKind::IntegrationTest => "integration-test",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Render Context
// =============================================================================

/// One entry in the flattened effective property list
#[derive(Debug, Clone)]
pub struct FlatProperty {
    pub property: Property,
    /// Name of the ancestor that declared this property, None for local ones
    pub inherited_from: Option<String>,
}

/// Everything a render function may reference, as named fields.
///
/// Built once per (type, artifact) render; templates never reach outside it.
pub struct RenderContext<'a> {
    pub ty: &'a Type,
    pub graph: &'a TypeGraph,
    /// Effective property list: every ancestor property plus local ones,
    /// exactly once each, overrides-by-name already applied
    pub properties: Vec<FlatProperty>,
    pub crate_name: &'a str,
    pub xml_parse_options: &'a [String],
    pub test_endpoint: Option<&'a str>,
}

impl<'a> RenderContext<'a> {
    pub fn new(ty: &'a Type, graph: &'a TypeGraph, config: &'a Config) -> Self {
        Self {
            ty,
            graph,
            properties: flatten_properties(ty, graph),
            crate_name: &config.output.crate_name,
            xml_parse_options: &config.xml.parse_options,
            test_endpoint: config.tests.endpoint.as_deref(),
        }
    }

    /// Choice-group members in declaration order
    pub fn choice_members(&self) -> impl Iterator<Item = &FlatProperty> {
        self.properties
            .iter()
            .filter(|p| p.property.is_choice_member)
    }
}

/// Compute the effective property list for a type.
///
/// Ancestor properties come first (root-most ancestor leading), local
/// properties follow. A property re-declared further down the chain wins and
/// takes its own declared position, so the inherited definition disappears
/// entirely.
pub fn flatten_properties(ty: &Type, graph: &TypeGraph) -> Vec<FlatProperty> {
    let mut chain = graph.base_chain(&ty.name);
    chain.reverse();

    let mut out: Vec<FlatProperty> = Vec::new();
    for ancestor in chain {
        merge_properties(&mut out, ancestor, Some(&ancestor.name));
    }
    merge_properties(&mut out, ty, None);
    out
}

fn merge_properties(out: &mut Vec<FlatProperty>, owner: &Type, inherited_from: Option<&str>) {
    let mut props: Vec<&Property> = owner.properties.iter().collect();
    props.sort_by_key(|p| p.declaration_order);

    for prop in props {
        out.retain(|existing| existing.property.name != prop.name);
        out.push(FlatProperty {
            property: prop.clone(),
            inherited_from: inherited_from.map(String::from),
        });
    }
}

// =============================================================================
// Field rendering helpers
// =============================================================================

/// Rust keywords that appear as FHIR property names
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "box", "const", "crate", "dyn", "else", "enum", "fn", "for", "if",
    "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "self",
    "static", "struct", "trait", "type", "use", "where", "while",
];

/// Generated field name for a property (snake_case, keyword-escaped)
pub fn field_name(property_name: &str) -> String {
    let snake = crate::graph::to_snake_case(property_name);
    if KEYWORDS.contains(&snake.as_str()) {
        format!("r#{}", snake)
    } else {
        snake
    }
}

/// Getter name; the `get_` prefix keeps keyword property names legal
/// without raw identifiers
pub fn accessor_name(property_name: &str) -> String {
    format!("get_{}", crate::graph::to_snake_case(property_name))
}

/// Absolute path of a referenced type inside the generated library.
///
/// Primitives are not generated as standalone classes; they are aliases in
/// the shared `primitive` module, so references point there.
pub fn type_path(graph: &TypeGraph, type_ref: &str) -> String {
    match graph.get(type_ref) {
        Some(target) if target.kind == TypeKind::Primitive => {
            format!("crate::primitive::{}", target.class_name)
        }
        Some(target) => format!(
            "crate::{}::{}::{}",
            target.namespace,
            crate::graph::file_stem_for(&target.name),
            target.class_name
        ),
        // Unreachable after resolution; kept total so render stays infallible
        None => type_ref.to_string(),
    }
}

/// Whether a property reference points at a primitive alias (serialized as
/// raw text rather than through a generated codec)
pub fn is_primitive_ref(graph: &TypeGraph, type_ref: &str) -> bool {
    graph
        .get(type_ref)
        .map(|t| t.kind == TypeKind::Primitive)
        .unwrap_or(false)
}

/// Full field type for a property.
///
/// Scalars are always `Option<T>` regardless of minOccurs; required-ness is
/// asserted by the generated validation trait, not the type system.
pub fn field_type(graph: &TypeGraph, prop: &Property) -> String {
    let inner = type_path(graph, &prop.type_ref);
    if prop.cardinality.is_collection() {
        format!("Vec<{}>", inner)
    } else {
        format!("Option<{}>", inner)
    }
}

// =============================================================================
// Template Set
// =============================================================================

type RenderFn = fn(&RenderContext) -> Result<String, EmissionError>;

/// Render functions keyed by (TypeKind, ArtifactKind).
///
/// The standard set registers every legal combination up front; asking for an
/// unregistered combination at runtime means the orchestrator is broken, and
/// surfaces as a fatal [`EmissionError::NoTemplate`].
pub struct TemplateSet {
    templates: HashMap<(TypeKind, ArtifactKind), RenderFn>,
}

impl TemplateSet {
    /// The standard registry. Primitives have no entries anywhere: they are
    /// re-exported as aliases by the static primitives module, never rendered
    /// per-type.
    pub fn standard() -> Self {
        let mut templates: HashMap<(TypeKind, ArtifactKind), RenderFn> = HashMap::new();

        let class_fns: [(TypeKind, RenderFn); 4] = [
            (TypeKind::Enumeration, class::emit_enumeration),
            (TypeKind::Complex, class::emit_struct),
            (TypeKind::Resource, class::emit_struct),
            (TypeKind::Container, class::emit_container),
        ];
        for (kind, f) in class_fns {
            templates.insert((kind, ArtifactKind::Class), f);
        }

        for kind in [TypeKind::Enumeration, TypeKind::Complex, TypeKind::Resource] {
            templates.insert((kind, ArtifactKind::XmlCodec), xml::emit_codec as RenderFn);
            templates.insert((kind, ArtifactKind::JsonCodec), json::emit_codec as RenderFn);
        }
        templates.insert(
            (TypeKind::Container, ArtifactKind::XmlCodec),
            xml::emit_container_codec as RenderFn,
        );
        templates.insert(
            (TypeKind::Container, ArtifactKind::JsonCodec),
            json::emit_container_codec as RenderFn,
        );

        for kind in [
            TypeKind::Enumeration,
            TypeKind::Complex,
            TypeKind::Resource,
            TypeKind::Container,
        ] {
            templates.insert((kind, ArtifactKind::UnitTest), testgen::emit_unit as RenderFn);
        }
        // Integration tests exist for resources only
        templates.insert(
            (TypeKind::Resource, ArtifactKind::IntegrationTest),
            testgen::emit_integration as RenderFn,
        );

        Self { templates }
    }

    pub fn select(
        &self,
        kind: TypeKind,
        artifact: ArtifactKind,
    ) -> Result<RenderFn, EmissionError> {
        self.templates
            .get(&(kind, artifact))
            .copied()
            .ok_or_else(|| EmissionError::NoTemplate {
                type_kind: kind.to_string(),
                artifact_kind: artifact.to_string(),
            })
    }

    /// Render one artifact for one type
    pub fn emit(
        &self,
        ty: &Type,
        artifact: ArtifactKind,
        graph: &TypeGraph,
        config: &Config,
    ) -> Result<String, EmissionError> {
        let render = self.select(ty.kind, artifact)?;
        let ctx = RenderContext::new(ty, graph, config);
        render(&ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{resolve, Cardinality, TypeKind};
    use crate::ingest::{PropertyStub, StubArena, TypeStub};
    use std::path::PathBuf;

    fn stub(name: &str, kind: TypeKind, base: Option<&str>, props: Vec<(&str, &str)>) -> TypeStub {
        TypeStub {
            name: name.to_string(),
            kind,
            base_ref: base.map(String::from),
            properties: props
                .into_iter()
                .enumerate()
                .map(|(i, (n, t))| PropertyStub {
                    name: n.to_string(),
                    type_ref: t.to_string(),
                    cardinality: Cardinality::optional(),
                    is_choice_member: false,
                    declaration_order: i as u32,
                })
                .collect(),
            enum_values: Vec::new(),
            source_location: PathBuf::from("test.xsd"),
        }
    }

    fn sample_graph() -> TypeGraph {
        let mut arena = StubArena::new();
        arena.push(stub("string", TypeKind::Primitive, None, vec![]));
        arena.push(stub(
            "Base",
            TypeKind::Complex,
            None,
            vec![("propX", "string"), ("shared", "string")],
        ));
        arena.push(stub(
            "Derived",
            TypeKind::Complex,
            Some("Base"),
            vec![("propY", "string"), ("shared", "string")],
        ));
        resolve(arena, &[]).unwrap()
    }

    #[test]
    fn test_flattening_exposes_ancestors_once() {
        let graph = sample_graph();
        let derived = graph.get("Derived").unwrap();
        let flat = flatten_properties(derived, &graph);

        let names: Vec<&str> = flat.iter().map(|p| p.property.name.as_str()).collect();
        // shared is overridden: the inherited copy disappears and the local
        // declaration keeps its own position
        assert_eq!(names, vec!["propX", "propY", "shared"]);
        assert!(flat[0].inherited_from.as_deref() == Some("Base"));
        assert!(flat[2].inherited_from.is_none());
    }

    #[test]
    fn test_unknown_combination_is_fatal() {
        let set = TemplateSet::standard();
        let err = set
            .select(TypeKind::Primitive, ArtifactKind::IntegrationTest)
            .unwrap_err();
        assert!(matches!(err, EmissionError::NoTemplate { .. }));
    }

    #[test]
    fn test_field_name_escapes_keywords() {
        assert_eq!(field_name("type"), "r#type");
        assert_eq!(field_name("use"), "r#use");
        assert_eq!(field_name("given"), "given");
        assert_eq!(field_name("birthDate"), "birth_date");
    }
}
