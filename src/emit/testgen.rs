//! Test Scaffolding Emitters
//!
//! Unit tests exist for every type; integration tests only for resources,
//! and only when an endpoint is configured (the builder enforces both).

use crate::error::EmissionError;
use crate::graph::{file_stem_for, to_snake_case, TypeKind};

use super::RenderContext;

pub fn emit_unit(ctx: &RenderContext) -> Result<String, EmissionError> {
    let path = format!(
        "{}::{}::{}::{}",
        ctx.crate_name,
        ctx.ty.namespace,
        file_stem_for(&ctx.ty.name),
        ctx.ty.class_name
    );
    let fn_stem = to_snake_case(&ctx.ty.name.replace(['.', '-'], "_"));

    let mut out = String::new();
    out.push_str(&format!("//! Unit tests for `{}`\n\n", ctx.ty.name));

    match ctx.ty.kind {
        TypeKind::Enumeration => {
            let first = ctx.ty.enum_values.first().ok_or_else(|| {
                EmissionError::RenderFailed {
                    type_name: ctx.ty.name.clone(),
                    artifact_kind: "unit-test".to_string(),
                    detail: "enumeration type carries no values after freeze".to_string(),
                }
            })?;
            out.push_str("#[test]\n");
            out.push_str(&format!("fn {}_code_round_trip() {{\n", fn_stem));
            out.push_str(&format!(
                "    let value = {}::from_code(\"{}\").unwrap();\n",
                path, first
            ));
            out.push_str(&format!("    assert_eq!(value.as_str(), \"{}\");\n", first));
            out.push_str(&format!("    assert!({}::from_code(\"no-such-code\").is_none());\n", path));
            out.push_str("}\n");
        }
        _ => {
            out.push_str("#[test]\n");
            out.push_str(&format!("fn {}_serializes_empty() {{\n", fn_stem));
            out.push_str(&format!("    let value = {}::new();\n", path));
            out.push_str("    let _ = value.xml_serialize();\n");
            out.push_str("    let _ = value.json_serialize();\n");
            out.push_str("}\n\n");
            out.push_str("#[test]\n");
            out.push_str(&format!("fn {}_type_name_constant() {{\n", fn_stem));
            out.push_str(&format!(
                "    assert_eq!({}::FHIR_TYPE_NAME, \"{}\");\n",
                path, ctx.ty.name
            ));
            out.push_str("}\n");
        }
    }

    Ok(out)
}

pub fn emit_integration(ctx: &RenderContext) -> Result<String, EmissionError> {
    let endpoint = ctx.test_endpoint.ok_or_else(|| EmissionError::RenderFailed {
        type_name: ctx.ty.name.clone(),
        artifact_kind: "integration-test".to_string(),
        detail: "integration tests require a configured endpoint".to_string(),
    })?;
    let fn_stem = to_snake_case(&ctx.ty.name.replace(['.', '-'], "_"));

    let mut out = String::new();
    out.push_str(&format!(
        "//! Integration tests for `{}` against {}\n\n",
        ctx.ty.name, endpoint
    ));
    out.push_str(&format!(
        "pub const ENDPOINT: &str = \"{}\";\n",
        endpoint
    ));
    out.push_str(&format!(
        "pub const SEARCH_URL: &str = \"{}/{}?_count=1\";\n\n",
        endpoint, ctx.ty.name
    ));
    out.push_str("#[test]\n");
    out.push_str("#[ignore = \"requires a live endpoint\"]\n");
    out.push_str(&format!("fn {}_endpoint_round_trip() {{\n", fn_stem));
    out.push_str("    // Fetch one instance from SEARCH_URL, parse it, re-serialize it, and\n");
    out.push_str("    // compare type names. Transport is left to the test harness.\n");
    out.push_str(&format!(
        "    assert!(SEARCH_URL.starts_with(\"{}\"));\n",
        endpoint
    ));
    out.push_str("}\n");

    Ok(out)
}
