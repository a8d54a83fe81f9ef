//! Resolved Type Graph
//!
//! The frozen, read-only type system produced by resolution. Lookup indexes
//! are kept alongside a petgraph `DiGraph` of inheritance and property
//! reference edges (used by the cycle check and by `fhir-inspect`).
//!
//! A `TypeGraph` can only be obtained from [`resolve::resolve`]; there is no
//! mutation API. Everything downstream (emission, inspection) shares it
//! immutably, which is what makes output independent of any evaluation order.

pub mod namespace;
pub mod resolve;

pub use namespace::{class_name_for, file_stem_for, namespace_for, to_pascal_case, to_snake_case};
pub use resolve::resolve;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// Kind of a schema type, fixed at ingestion from the declared element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Value types (string, boolean, dateTime, ...)
    Primitive,
    /// General complex element types (HumanName, Period, ...)
    Complex,
    /// Value-set enumerations (`*-list` simple types)
    Enumeration,
    /// Top-level resources (Patient, Observation, ...)
    Resource,
    /// The generic resource wrapper; whitelisted self-reference
    Container,
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TypeKind::Primitive => "primitive",
            TypeKind::Complex => "complex",
            TypeKind::Enumeration => "enumeration",
            TypeKind::Resource => "resource",
            TypeKind::Container => "container",
        };
        write!(f, "{}", s)
    }
}

/// Upper bound of a property's cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

/// Property cardinality as declared in the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    pub max: MaxOccurs,
}

impl Cardinality {
    pub fn required() -> Self {
        Self {
            min: 1,
            max: MaxOccurs::Bounded(1),
        }
    }

    pub fn optional() -> Self {
        Self {
            min: 0,
            max: MaxOccurs::Bounded(1),
        }
    }

    /// Anything with an upper bound above one renders as a collection
    pub fn is_collection(&self) -> bool {
        match self.max {
            MaxOccurs::Unbounded => true,
            MaxOccurs::Bounded(n) => n > 1,
        }
    }

    pub fn is_required(&self) -> bool {
        self.min > 0
    }
}

/// A resolved property. `type_ref` is guaranteed to name a registered type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub type_ref: String,
    pub cardinality: Cardinality,
    pub is_choice_member: bool,
    /// Position within the declaring type, significant for output ordering
    pub declaration_order: u32,
}

/// A resolved schema type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Type {
    /// Declared FHIR element name (unique key, e.g. "Observation.ReferenceRange")
    pub name: String,
    pub kind: TypeKind,
    /// Effective namespace, a pure function of kind and name
    pub namespace: String,
    /// Generated class name (e.g. "FhirObservationReferenceRange")
    pub class_name: String,
    /// Resolved base type name, None for roots
    pub base_type: Option<String>,
    /// Declaration-ordered property list
    pub properties: Vec<Property>,
    /// Enumeration values, declaration-ordered (Enumeration kinds only)
    pub enum_values: Vec<String>,
    /// Tagged during the cycle check; the emitter generates recursive
    /// containment for these instead of flat inlining
    pub recursive_container: bool,
    /// Originating document, for diagnostics
    pub source_location: PathBuf,
}

impl Type {
    /// Sort key for deterministic emission: namespace, then class name
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.namespace, self.class_name)
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Kinds of edges in the reference graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    /// Inheritance (type -> base)
    Extends,
    /// Property type reference
    Property,
}

/// The frozen type graph. Read-only for the remainder of a run.
#[derive(Debug)]
pub struct TypeGraph {
    /// All types, keyed by FHIR element name
    pub(crate) types: BTreeMap<String, Type>,

    /// Inheritance + property reference edges
    pub(crate) refs: DiGraph<String, EdgeKind>,

    /// Node index lookup: name -> NodeIndex
    pub(crate) node_indices: HashMap<String, NodeIndex>,

    /// SHA-256 over every ingested document, folded in sorted path order
    pub(crate) corpus_hash: String,
}

impl TypeGraph {
    /// Get a type by FHIR element name
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn corpus_hash(&self) -> &str {
        &self.corpus_hash
    }

    /// All types in arbitrary (but stable) key order
    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }

    /// All types sorted by qualified name, the emission order
    pub fn types_sorted(&self) -> Vec<&Type> {
        let mut out: Vec<&Type> = self.types.values().collect();
        out.sort_by_key(|t| t.qualified_name());
        out
    }

    /// Walk the base chain from (exclusive) `name` to the root.
    ///
    /// Whitelisted self-references terminate the walk instead of looping.
    pub fn base_chain(&self, name: &str) -> Vec<&Type> {
        let mut chain = Vec::new();
        let mut current = self.get(name).and_then(|t| t.base_type.as_deref());
        while let Some(base_name) = current {
            if base_name == name || chain.iter().any(|t: &&Type| t.name == base_name) {
                break;
            }
            let Some(base) = self.get(base_name) else {
                break;
            };
            chain.push(base);
            current = base.base_type.as_deref();
        }
        chain
    }

    /// A resource whose base chain passes through DomainResource.
    /// Integration-test generation is restricted to these.
    pub fn is_domain_resource(&self, name: &str) -> bool {
        let Some(ty) = self.get(name) else {
            return false;
        };
        if ty.kind != TypeKind::Resource {
            return false;
        }
        self.base_chain(name).iter().any(|t| t.name == "DomainResource")
    }

    /// Immediate outgoing references (base + property types)
    pub fn refs_out(&self, name: &str) -> Vec<&str> {
        let Some(&node_idx) = self.node_indices.get(name) else {
            return Vec::new();
        };

        let mut out: Vec<&str> = self
            .refs
            .edges_directed(node_idx, Direction::Outgoing)
            .filter_map(|e| self.refs.node_weight(e.target()))
            .map(|s| s.as_str())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Immediate incoming references (dependents)
    pub fn refs_in(&self, name: &str) -> Vec<&str> {
        let Some(&node_idx) = self.node_indices.get(name) else {
            return Vec::new();
        };

        let mut out: Vec<&str> = self
            .refs
            .edges_directed(node_idx, Direction::Incoming)
            .filter_map(|e| self.refs.node_weight(e.source()))
            .map(|s| s.as_str())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Export the inheritance/reference graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph TypeGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push('\n');

        let color_map = [
            (TypeKind::Primitive, "#607D8B"),
            (TypeKind::Complex, "#00BCD4"),
            (TypeKind::Enumeration, "#FF5722"),
            (TypeKind::Resource, "#4CAF50"),
            (TypeKind::Container, "#9C27B0"),
        ];

        for ty in self.types.values() {
            let color = color_map
                .iter()
                .find(|(kind, _)| *kind == ty.kind)
                .map(|(_, color)| *color)
                .unwrap_or("#9E9E9E");

            let node_id = ty.name.replace(['.', '-'], "_");
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n",
                node_id, ty.name, color
            ));
        }

        output.push('\n');

        let mut edges: Vec<(String, String, EdgeKind)> = self
            .refs
            .edge_references()
            .filter_map(|edge| {
                let from = self.refs.node_weight(edge.source())?;
                let to = self.refs.node_weight(edge.target())?;
                Some((from.clone(), to.clone(), *edge.weight()))
            })
            .collect();
        edges.sort();
        edges.dedup();

        for (from, to, kind) in edges {
            let style = match kind {
                EdgeKind::Extends => " [style=bold]",
                EdgeKind::Property => "",
            };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\"{};\n",
                from.replace(['.', '-'], "_"),
                to.replace(['.', '-'], "_"),
                style
            ));
        }

        output.push_str("}\n");
        output
    }
}

