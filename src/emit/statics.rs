//! Cross-Cutting Artifact Emitters
//!
//! The fixed artifact set that depends on the entire resolved type set:
//! constants registry, type map, module index, marker traits, the comment
//! container pair, validation assertions, change tracking, serialization
//! helpers, and the response parser. All of it reads graph data only, never
//! generated files, so it can be rendered any time after the graph freezes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::graph::{file_stem_for, to_snake_case, Type, TypeGraph, TypeKind};

/// Render the full static artifact set, in a fixed deterministic order.
pub fn emit_all(graph: &TypeGraph, config: &Config) -> Vec<(PathBuf, String)> {
    vec![
        (PathBuf::from("src/constants.rs"), constants(graph)),
        (PathBuf::from("src/type_map.rs"), type_map(graph)),
        (
            PathBuf::from("src/primitive/mod.rs"),
            primitives_module(graph),
        ),
        (PathBuf::from("src/fhir_type.rs"), fhir_type_trait(graph)),
        (
            PathBuf::from("src/contained_type.rs"),
            contained_type_trait(graph),
        ),
        (
            PathBuf::from("src/comment_container.rs"),
            comment_container(),
        ),
        (PathBuf::from("src/validation.rs"), validation()),
        (PathBuf::from("src/change_tracking.rs"), change_tracking()),
        (PathBuf::from("src/serialization.rs"), serialization()),
        (
            PathBuf::from("src/parser_config.rs"),
            parser_config(config),
        ),
        (PathBuf::from("src/parser.rs"), parser()),
    ]
    .into_iter()
    .chain(module_index(graph))
    .collect()
}

fn header(what: &str) -> String {
    format!("//! {} - generated by fhirgen, DO NOT EDIT\n\n", what)
}

fn const_ident(ty: &Type) -> String {
    to_snake_case(&ty.class_name).to_uppercase()
}

/// Constants registry: corpus identity plus one name constant per type
fn constants(graph: &TypeGraph) -> String {
    let mut out = header("Constants registry");
    out.push_str(&format!(
        "pub const CORPUS_HASH: &str = \"{}\";\n",
        graph.corpus_hash()
    ));
    out.push_str(&format!(
        "pub const TYPE_COUNT: usize = {};\n\n",
        graph.type_count()
    ));
    for ty in graph.types_sorted() {
        out.push_str(&format!(
            "pub const TYPE_NAME_{}: &str = \"{}\";\n",
            const_ident(ty),
            ty.name
        ));
    }
    out
}

/// Type-name to implementation-path map
fn type_map(graph: &TypeGraph) -> String {
    let mut out = header("Type map");
    out.push_str("/// Resolve a FHIR type name to its generated class path.\n");
    out.push_str("pub fn class_path(fhir_name: &str) -> Option<&'static str> {\n");
    out.push_str("    match fhir_name {\n");
    for ty in graph.types_sorted() {
        out.push_str(&format!(
            "        \"{}\" => Some(\"{}\"),\n",
            ty.name,
            class_path_str(ty)
        ));
    }
    out.push_str("        _ => None,\n    }\n}\n\n");

    out.push_str("pub const ALL_TYPE_NAMES: &[&str] = &[\n");
    for ty in graph.types_sorted() {
        out.push_str(&format!("    \"{}\",\n", ty.name));
    }
    out.push_str("];\n");
    out
}

/// Primitive value types as aliases. Primitives never get standalone class
/// files; every reference in generated code points at these.
fn primitives_module(graph: &TypeGraph) -> String {
    let mut out = header("Primitive type aliases");
    for ty in graph.types_sorted() {
        if ty.kind == TypeKind::Primitive {
            out.push_str(&format!("/// FHIR primitive `{}`\n", ty.name));
            out.push_str(&format!("pub type {} = String;\n", ty.class_name));
        }
    }
    out
}

/// Core type-marker trait, implemented for every generated class.
/// Primitives are plain aliases and stay outside the trait.
fn fhir_type_trait(graph: &TypeGraph) -> String {
    let mut out = header("Core type marker");
    out.push_str("/// Implemented by every generated FHIR class.\n");
    out.push_str("pub trait FhirType {\n");
    out.push_str("    /// The FHIR name of this type as declared in the schema\n");
    out.push_str("    fn type_name(&self) -> &'static str;\n");
    out.push_str("}\n\n");
    for ty in graph.types_sorted() {
        if ty.kind == TypeKind::Primitive {
            continue;
        }
        out.push_str(&format!("impl FhirType for {} {{\n", class_path_str(ty)));
        out.push_str(&format!(
            "    fn type_name(&self) -> &'static str {{\n        \"{}\"\n    }}\n",
            ty.name
        ));
        out.push_str("}\n");
    }
    out
}

/// Marker for resources that may appear inside the resource container
fn contained_type_trait(graph: &TypeGraph) -> String {
    let mut out = header("Contained-resource marker");
    out.push_str("/// Marker for resources that can be carried as contained sub-resources.\n");
    out.push_str("pub trait ContainedType: crate::fhir_type::FhirType {}\n\n");
    for ty in graph.types_sorted() {
        if ty.kind == TypeKind::Resource {
            out.push_str(&format!(
                "impl ContainedType for {} {{}}\n",
                class_path_str(ty)
            ));
        }
    }
    out
}

/// The comment-container trait and its reusable storage half
fn comment_container() -> String {
    let mut out = header("Comment container");
    out.push_str("/// Types that carry schema-level comments.\n");
    out.push_str("pub trait CommentContainer {\n");
    out.push_str("    fn comments(&self) -> &[String];\n");
    out.push_str("    fn add_comment(&mut self, comment: impl Into<String>);\n");
    out.push_str("}\n\n");
    out.push_str("/// Storage half of the pair; embed and delegate.\n");
    out.push_str("#[derive(Debug, Clone, Default)]\n");
    out.push_str("pub struct CommentStore {\n    comments: Vec<String>,\n}\n\n");
    out.push_str("impl CommentStore {\n");
    out.push_str("    pub fn comments(&self) -> &[String] {\n        &self.comments\n    }\n\n");
    out.push_str("    pub fn add_comment(&mut self, comment: impl Into<String>) {\n");
    out.push_str("        self.comments.push(comment.into());\n    }\n");
    out.push_str("}\n");
    out
}

/// Validation assertions shared by all generated classes
fn validation() -> String {
    let mut out = header("Validation assertions");
    out.push_str("/// Field-level assertions used by generated validators.\n");
    out.push_str("pub trait ValidationAssertions {\n");
    out.push_str("    fn assert_required(&self, field: &str, populated: bool, errors: &mut Vec<String>) {\n");
    out.push_str("        if !populated {\n");
    out.push_str("            errors.push(format!(\"required field {} is not populated\", field));\n");
    out.push_str("        }\n    }\n\n");
    out.push_str("    fn assert_min_items(&self, field: &str, len: usize, min: usize, errors: &mut Vec<String>) {\n");
    out.push_str("        if len < min {\n");
    out.push_str(
        "            errors.push(format!(\"field {} has {} items, minimum is {}\", field, len, min));\n",
    );
    out.push_str("        }\n    }\n");
    out.push_str("}\n");
    out
}

/// Change tracking shared by all generated classes
fn change_tracking() -> String {
    let mut out = header("Change tracking");
    out.push_str("/// Mutation tracking for generated classes.\n");
    out.push_str("pub trait ChangeTracking {\n");
    out.push_str("    fn mark_changed(&mut self, field: &'static str);\n");
    out.push_str("    fn changed_fields(&self) -> &[&'static str];\n");
    out.push_str("    fn is_changed(&self) -> bool {\n");
    out.push_str("        !self.changed_fields().is_empty()\n    }\n");
    out.push_str("}\n\n");
    out.push_str("/// Default change log; embed and delegate.\n");
    out.push_str("#[derive(Debug, Clone, Default)]\n");
    out.push_str("pub struct ChangeLog {\n    changed: Vec<&'static str>,\n}\n\n");
    out.push_str("impl ChangeLog {\n");
    out.push_str("    pub fn mark(&mut self, field: &'static str) {\n");
    out.push_str("        if !self.changed.contains(&field) {\n");
    out.push_str("            self.changed.push(field);\n        }\n    }\n\n");
    out.push_str("    pub fn fields(&self) -> &[&'static str] {\n        &self.changed\n    }\n");
    out.push_str("}\n");
    out
}

/// Escaping helpers shared by every generated codec
fn serialization() -> String {
    let mut out = header("Serialization helpers");
    out.push_str("/// Escape text content for XML output.\n");
    out.push_str("pub fn xml_escape(s: &str) -> String {\n");
    out.push_str("    let mut out = String::with_capacity(s.len());\n");
    out.push_str("    for c in s.chars() {\n");
    out.push_str("        match c {\n");
    out.push_str("            '&' => out.push_str(\"&amp;\"),\n");
    out.push_str("            '<' => out.push_str(\"&lt;\"),\n");
    out.push_str("            '>' => out.push_str(\"&gt;\"),\n");
    out.push_str("            '\"' => out.push_str(\"&quot;\"),\n");
    out.push_str("            _ => out.push(c),\n");
    out.push_str("        }\n    }\n    out\n}\n\n");
    out.push_str("/// Quote and escape a string for JSON output.\n");
    out.push_str("pub fn json_string(s: &str) -> String {\n");
    out.push_str("    let mut out = String::with_capacity(s.len() + 2);\n");
    out.push_str("    out.push('\"');\n");
    out.push_str("    for c in s.chars() {\n");
    out.push_str("        match c {\n");
    out.push_str("            '\"' => out.push_str(\"\\\\\\\"\"),\n");
    out.push_str("            '\\\\' => out.push_str(\"\\\\\\\\\"),\n");
    out.push_str("            '\\n' => out.push_str(\"\\\\n\"),\n");
    out.push_str("            '\\r' => out.push_str(\"\\\\r\"),\n");
    out.push_str("            '\\t' => out.push_str(\"\\\\t\"),\n");
    out.push_str("            c if (c as u32) < 0x20 => out.push_str(&format!(\"\\\\u{:04x}\", c as u32)),\n");
    out.push_str("            c => out.push(c),\n");
    out.push_str("        }\n    }\n");
    out.push_str("    out.push('\"');\n    out\n}\n");
    out
}

/// Response parser configuration object
fn parser_config(config: &Config) -> String {
    let opts = config
        .xml
        .parse_options
        .iter()
        .map(|o| format!("\"{}\"", o))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = header("Response parser configuration");
    out.push_str("/// Configuration consumed by the response parser.\n");
    out.push_str("#[derive(Debug, Clone)]\n");
    out.push_str("pub struct ResponseParserConfig {\n");
    out.push_str("    pub xml_parse_options: &'static [&'static str],\n");
    out.push_str("    pub permissive: bool,\n");
    out.push_str("}\n\n");
    out.push_str("impl Default for ResponseParserConfig {\n");
    out.push_str("    fn default() -> Self {\n");
    out.push_str("        Self {\n");
    out.push_str(&format!(
        "            xml_parse_options: &[{}],\n",
        opts
    ));
    out.push_str("            permissive: false,\n");
    out.push_str("        }\n    }\n}\n");
    out
}

/// Response parser entry point
fn parser() -> String {
    let mut out = header("Response parser");
    out.push_str("use crate::parser_config::ResponseParserConfig;\n\n");
    out.push_str("/// Entry point for turning server payloads into generated types.\n");
    out.push_str("#[derive(Debug, Default)]\n");
    out.push_str("pub struct ResponseParser {\n");
    out.push_str("    config: ResponseParserConfig,\n");
    out.push_str("}\n\n");
    out.push_str("impl ResponseParser {\n");
    out.push_str("    pub fn new(config: ResponseParserConfig) -> Self {\n");
    out.push_str("        Self { config }\n    }\n\n");
    out.push_str("    pub fn config(&self) -> &ResponseParserConfig {\n");
    out.push_str("        &self.config\n    }\n\n");
    out.push_str("    /// Sniff the FHIR type name of a payload: the JSON resourceType\n");
    out.push_str("    /// member or the XML root element.\n");
    out.push_str("    pub fn type_name_of(payload: &str) -> Option<&str> {\n");
    out.push_str("        let trimmed = payload.trim_start();\n");
    out.push_str("        if trimmed.starts_with('{') {\n");
    out.push_str("            let key = \"\\\"resourceType\\\"\";\n");
    out.push_str("            let idx = trimmed.find(key)?;\n");
    out.push_str("            let rest = trimmed[idx + key.len()..].trim_start().strip_prefix(':')?;\n");
    out.push_str("            let rest = rest.trim_start().strip_prefix('\"')?;\n");
    out.push_str("            return rest.split('\"').next();\n");
    out.push_str("        }\n");
    out.push_str("        if let Some(rest) = trimmed.strip_prefix('<') {\n");
    out.push_str("            return rest.split(|c: char| c.is_whitespace() || c == '>' || c == '/').next();\n");
    out.push_str("        }\n");
    out.push_str("        None\n    }\n\n");
    out.push_str("    /// Whether a payload names a known generated type.\n");
    out.push_str("    pub fn can_parse(payload: &str) -> bool {\n");
    out.push_str("        Self::type_name_of(payload)\n");
    out.push_str("            .map(|n| crate::type_map::class_path(n).is_some())\n");
    out.push_str("            .unwrap_or(false)\n    }\n");
    out.push_str("}\n");
    out
}

/// The module index: the generated lib.rs plus one mod.rs per namespace.
/// This is the autoloading analog: it is what makes every generated class
/// reachable.
fn module_index(graph: &TypeGraph) -> Vec<(PathBuf, String)> {
    let mut by_namespace: BTreeMap<&str, Vec<&Type>> = BTreeMap::new();
    for ty in graph.types_sorted() {
        // The primitive namespace is the alias module, emitted separately
        if ty.kind == TypeKind::Primitive {
            continue;
        }
        by_namespace.entry(ty.namespace.as_str()).or_default().push(ty);
    }

    let mut out = Vec::new();

    let mut lib = header("Module index");
    for module in [
        "change_tracking",
        "comment_container",
        "constants",
        "contained_type",
        "fhir_type",
        "parser",
        "parser_config",
        "primitive",
        "serialization",
        "type_map",
        "validation",
    ] {
        lib.push_str(&format!("pub mod {};\n", module));
    }
    for ns in by_namespace.keys() {
        lib.push_str(&format!("pub mod {};\n", ns));
    }
    out.push((PathBuf::from("src/lib.rs"), lib));

    for (ns, types) in &by_namespace {
        let mut body = header("Namespace index");
        for ty in types {
            body.push_str(&format!("pub mod {};\n", file_stem_for(&ty.name)));
        }
        body.push('\n');
        for ty in types {
            body.push_str(&format!(
                "pub use {}::{};\n",
                file_stem_for(&ty.name),
                ty.class_name
            ));
        }
        out.push((PathBuf::from(format!("src/{}/mod.rs", ns)), body));
    }

    out
}

fn class_path_str(ty: &Type) -> String {
    if ty.kind == TypeKind::Primitive {
        return format!("crate::primitive::{}", ty.class_name);
    }
    format!(
        "crate::{}::{}::{}",
        ty.namespace,
        file_stem_for(&ty.name),
        ty.class_name
    )
}
