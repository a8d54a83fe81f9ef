//! Graph Resolution
//!
//! Promotes the ingest-time stub arena into the frozen [`TypeGraph`].
//! Three phases, deliberately order-independent:
//!
//! 1. Registration: every stub is inserted into the name index; duplicates
//!    are fatal. Nothing is linked until this phase completes, which is what
//!    makes the result independent of document-processing order.
//! 2. Linking: every base reference and property reference is checked
//!    against the completed index; dangling references are fatal.
//! 3. Cycle check: the inheritance relation must be acyclic except for
//!    whitelisted container types, which are tagged for recursive emission
//!    rather than rejected.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;
use tracing::{debug, info};

use super::namespace::{class_name_for, namespace_for};
use super::{EdgeKind, Property, Type, TypeGraph};
use crate::error::SchemaIntegrityError;
use crate::ingest::StubArena;

/// Resolve a stub arena into a frozen type graph.
pub fn resolve(
    arena: StubArena,
    whitelist: &[String],
) -> Result<TypeGraph, SchemaIntegrityError> {
    let corpus_hash = arena.corpus_hash.clone();

    // Phase 1: registration
    let mut types: BTreeMap<String, Type> = BTreeMap::new();
    for stub in arena.stubs {
        let namespace = namespace_for(stub.kind, &stub.name).to_string();
        if let Some(existing) = types.get(&stub.name) {
            return Err(SchemaIntegrityError::DuplicateType {
                namespace,
                name: stub.name.clone(),
                first: existing.source_location.clone(),
                second: stub.source_location,
            });
        }

        let class_name = class_name_for(&stub.name);
        types.insert(
            stub.name.clone(),
            Type {
                name: stub.name,
                kind: stub.kind,
                namespace,
                class_name,
                base_type: stub.base_ref,
                properties: stub
                    .properties
                    .into_iter()
                    .map(|p| Property {
                        name: p.name,
                        type_ref: p.type_ref,
                        cardinality: p.cardinality,
                        is_choice_member: p.is_choice_member,
                        declaration_order: p.declaration_order,
                    })
                    .collect(),
                enum_values: stub.enum_values,
                recursive_container: false,
                source_location: stub.source_location,
            },
        );
    }
    debug!(types = types.len(), "registration complete");

    // Phase 2: linking against the completed index
    for ty in types.values() {
        if let Some(base) = &ty.base_type {
            if !types.contains_key(base) {
                return Err(SchemaIntegrityError::UnresolvedBase {
                    referrer: ty.name.clone(),
                    missing: base.clone(),
                });
            }
        }
        for prop in &ty.properties {
            if !types.contains_key(&prop.type_ref) {
                return Err(SchemaIntegrityError::UnresolvedProperty {
                    referrer: ty.name.clone(),
                    property: prop.name.clone(),
                    missing: prop.type_ref.clone(),
                });
            }
        }
    }

    // Reference graph; nodes added in sorted key order so indices (and every
    // derived traversal) are stable across runs
    let mut refs: DiGraph<String, EdgeKind> = DiGraph::new();
    let mut node_indices = HashMap::with_capacity(types.len());
    for name in types.keys() {
        node_indices.insert(name.clone(), refs.add_node(name.clone()));
    }
    let mut inherit: DiGraph<String, ()> = DiGraph::new();
    let mut inherit_indices = HashMap::with_capacity(types.len());
    for name in types.keys() {
        inherit_indices.insert(name.clone(), inherit.add_node(name.clone()));
    }

    for ty in types.values() {
        let from = node_indices[&ty.name];
        if let Some(base) = &ty.base_type {
            refs.add_edge(from, node_indices[base], EdgeKind::Extends);
            inherit.add_edge(inherit_indices[&ty.name], inherit_indices[base], ());
        }
        for prop in &ty.properties {
            refs.add_edge(from, node_indices[&prop.type_ref], EdgeKind::Property);
        }
    }

    // Phase 3: inheritance cycle check
    let mut tagged: HashSet<String> = HashSet::new();
    for scc in kosaraju_scc(&inherit) {
        let cyclic = scc.len() > 1
            || scc
                .first()
                .map(|&idx| inherit.contains_edge(idx, idx))
                .unwrap_or(false);
        if !cyclic {
            continue;
        }

        let mut members: Vec<String> = scc
            .iter()
            .filter_map(|&idx| inherit.node_weight(idx).cloned())
            .collect();
        members.sort();

        if members.iter().all(|m| whitelist.contains(m)) {
            tagged.extend(members);
        } else {
            return Err(SchemaIntegrityError::InheritanceCycle { members });
        }
    }

    // Whitelisted containers that participate in any reference cycle get the
    // recursive-containment tag as well (the wrapper contains resources that
    // point back at it)
    for scc in kosaraju_scc(&refs) {
        let cyclic = scc.len() > 1
            || scc
                .first()
                .map(|&idx| refs.contains_edge(idx, idx))
                .unwrap_or(false);
        if !cyclic {
            continue;
        }
        for idx in scc {
            if let Some(name) = refs.node_weight(idx) {
                if whitelist.contains(name) {
                    tagged.insert(name.clone());
                }
            }
        }
    }

    for name in &tagged {
        if let Some(ty) = types.get_mut(name) {
            ty.recursive_container = true;
            debug!(name = %ty.name, "tagged for recursive containment");
        }
    }

    info!(
        types = types.len(),
        edges = refs.edge_count(),
        recursive = tagged.len(),
        "resolution complete, graph frozen"
    );

    Ok(TypeGraph {
        types,
        refs,
        node_indices,
        corpus_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Cardinality, TypeKind};
    use crate::ingest::{PropertyStub, TypeStub};
    use std::path::PathBuf;

    fn stub(name: &str, kind: TypeKind, base: Option<&str>) -> TypeStub {
        TypeStub {
            name: name.to_string(),
            kind,
            base_ref: base.map(String::from),
            properties: Vec::new(),
            enum_values: Vec::new(),
            source_location: PathBuf::from("test.xsd"),
        }
    }

    fn prop(name: &str, type_ref: &str, order: u32) -> PropertyStub {
        PropertyStub {
            name: name.to_string(),
            type_ref: type_ref.to_string(),
            cardinality: Cardinality::optional(),
            is_choice_member: false,
            declaration_order: order,
        }
    }

    fn whitelist() -> Vec<String> {
        vec!["ResourceContainer".to_string()]
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut arena = StubArena::new();
        arena.push(stub("Patient", TypeKind::Resource, None));
        arena.push(stub("Patient", TypeKind::Resource, None));

        let err = resolve(arena, &whitelist()).unwrap_err();
        assert!(matches!(
            err,
            SchemaIntegrityError::DuplicateType { name, .. } if name == "Patient"
        ));
    }

    #[test]
    fn test_dangling_base_fails() {
        let mut arena = StubArena::new();
        arena.push(stub("Patient", TypeKind::Resource, Some("DomainResource")));

        let err = resolve(arena, &whitelist()).unwrap_err();
        assert!(matches!(
            err,
            SchemaIntegrityError::UnresolvedBase { referrer, missing }
                if referrer == "Patient" && missing == "DomainResource"
        ));
    }

    #[test]
    fn test_dangling_property_fails_never_drops() {
        let mut arena = StubArena::new();
        let mut patient = stub("Patient", TypeKind::Resource, None);
        patient.properties.push(prop("name", "HumanName", 0));
        arena.push(patient);

        let err = resolve(arena, &whitelist()).unwrap_err();
        assert!(matches!(
            err,
            SchemaIntegrityError::UnresolvedProperty { property, missing, .. }
                if property == "name" && missing == "HumanName"
        ));
    }

    #[test]
    fn test_inheritance_cycle_fails() {
        let mut arena = StubArena::new();
        arena.push(stub("A", TypeKind::Complex, Some("B")));
        arena.push(stub("B", TypeKind::Complex, Some("C")));
        arena.push(stub("C", TypeKind::Complex, Some("A")));

        let err = resolve(arena, &whitelist()).unwrap_err();
        match err {
            SchemaIntegrityError::InheritanceCycle { members } => {
                assert_eq!(members, vec!["A", "B", "C"]);
            }
            other => panic!("expected InheritanceCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_whitelisted_container_is_tagged_not_rejected() {
        let mut arena = StubArena::new();
        let mut container = stub("ResourceContainer", TypeKind::Container, None);
        container.properties.push(prop("Patient", "Patient", 0));
        arena.push(container);
        let mut patient = stub("Patient", TypeKind::Resource, None);
        patient.properties.push(prop("contained", "ResourceContainer", 0));
        arena.push(patient);

        let graph = resolve(arena, &whitelist()).unwrap();
        assert!(graph.get("ResourceContainer").unwrap().recursive_container);
        assert!(!graph.get("Patient").unwrap().recursive_container);
    }

    #[test]
    fn test_resolution_is_order_independent() {
        let build = |reversed: bool| {
            let mut stubs = vec![
                stub("Element", TypeKind::Complex, None),
                stub("Period", TypeKind::Complex, Some("Element")),
                stub("Resource", TypeKind::Resource, None),
            ];
            if reversed {
                stubs.reverse();
            }
            let mut arena = StubArena::new();
            for s in stubs {
                arena.push(s);
            }
            resolve(arena, &whitelist()).unwrap()
        };

        let a = build(false);
        let b = build(true);

        let names_a: Vec<String> = a.types_sorted().iter().map(|t| t.qualified_name()).collect();
        let names_b: Vec<String> = b.types_sorted().iter().map(|t| t.qualified_name()).collect();
        assert_eq!(names_a, names_b);
        assert_eq!(a.to_dot(), b.to_dot());
    }

    #[test]
    fn test_base_chain_and_domain_resource() {
        let mut arena = StubArena::new();
        arena.push(stub("Resource", TypeKind::Resource, None));
        arena.push(stub("DomainResource", TypeKind::Resource, Some("Resource")));
        arena.push(stub("Patient", TypeKind::Resource, Some("DomainResource")));

        let graph = resolve(arena, &whitelist()).unwrap();
        let chain: Vec<&str> = graph
            .base_chain("Patient")
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(chain, vec!["DomainResource", "Resource"]);
        assert!(graph.is_domain_resource("Patient"));
        assert!(!graph.is_domain_resource("Resource"));
    }
}
