//! XML Codec Emitters
//!
//! Generates `xml_serialize`/`XML_PARSE_OPTIONS` impls. The convention in the
//! generated library: `xml_serialize` returns the element *content* for a
//! type; the owning type wraps it in the property's element tag. Choice
//! groups serialize as an if/else chain so only the first populated member in
//! declaration order is emitted.

use crate::error::EmissionError;
use crate::graph::TypeKind;

use super::{field_name, is_primitive_ref, FlatProperty, RenderContext};

/// XML codec for enumerations, complex types and resources
pub fn emit_codec(ctx: &RenderContext) -> Result<String, EmissionError> {
    match ctx.ty.kind {
        TypeKind::Enumeration => Ok(enumeration_codec(ctx)),
        _ => Ok(struct_codec(ctx)),
    }
}

/// XML codec for the resource container: delegates to the first populated
/// contained resource instead of inlining fields.
pub fn emit_container_codec(ctx: &RenderContext) -> Result<String, EmissionError> {
    let mut out = String::new();
    codec_header(&mut out, ctx);
    out.push_str("    /// Delegates to the first populated contained resource.\n");
    out.push_str("    pub fn xml_serialize(&self) -> String {\n");
    for flat in &ctx.properties {
        let name = field_name(&flat.property.name);
        out.push_str(&format!("        if let Some(v) = self.{}.as_deref() {{\n", name));
        out.push_str(&format!(
            "            return format!(\"<{}>{{}}</{}>\", v.xml_serialize());\n",
            flat.property.name, flat.property.name
        ));
        out.push_str("        }\n");
    }
    out.push_str("        String::new()\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    Ok(out)
}

fn enumeration_codec(ctx: &RenderContext) -> String {
    let mut out = String::new();
    codec_header(&mut out, ctx);
    out.push_str("    pub fn xml_serialize(&self) -> String {\n");
    out.push_str("        crate::serialization::xml_escape(self.as_str())\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

fn struct_codec(ctx: &RenderContext) -> String {
    let mut out = String::new();
    codec_header(&mut out, ctx);
    out.push_str("    pub fn xml_serialize(&self) -> String {\n");
    out.push_str("        let mut out = String::new();\n");

    let mut choice_done = false;
    for flat in &ctx.properties {
        if flat.property.is_choice_member {
            if !choice_done {
                emit_choice_chain(&mut out, ctx);
                choice_done = true;
            }
            continue;
        }
        emit_plain_property(&mut out, ctx, flat);
    }

    out.push_str("        out\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

/// Primitive-typed fields hold raw text and escape directly; everything else
/// delegates to the target's codec.
fn serialize_expr(ctx: &RenderContext, flat: &FlatProperty) -> &'static str {
    if is_primitive_ref(ctx.graph, &flat.property.type_ref) {
        "crate::serialization::xml_escape(v)"
    } else {
        "v.xml_serialize()"
    }
}

fn emit_plain_property(out: &mut String, ctx: &RenderContext, flat: &FlatProperty) {
    let prop = &flat.property;
    let name = field_name(&prop.name);
    let expr = serialize_expr(ctx, flat);
    if prop.cardinality.is_collection() {
        out.push_str(&format!("        for v in &self.{} {{\n", name));
        out.push_str(&format!(
            "            out.push_str(&format!(\"<{}>{{}}</{}>\", {}));\n",
            prop.name, prop.name, expr
        ));
        out.push_str("        }\n");
    } else {
        out.push_str(&format!("        if let Some(v) = &self.{} {{\n", name));
        out.push_str(&format!(
            "            out.push_str(&format!(\"<{}>{{}}</{}>\", {}));\n",
            prop.name, prop.name, expr
        ));
        out.push_str("        }\n");
    }
}

/// The choice group renders once, as an if/else chain in declaration order:
/// only the first populated member is serialized, even if several are set.
fn emit_choice_chain(out: &mut String, ctx: &RenderContext) {
    let members: Vec<&FlatProperty> = ctx.choice_members().collect();
    for (i, flat) in members.iter().enumerate() {
        let prop = &flat.property;
        let name = field_name(&prop.name);
        let expr = serialize_expr(ctx, flat);
        let keyword = if i == 0 { "        if" } else { " else if" };
        out.push_str(&format!("{} let Some(v) = &self.{} {{\n", keyword, name));
        out.push_str(&format!(
            "            out.push_str(&format!(\"<{}>{{}}</{}>\", {}));\n",
            prop.name, prop.name, expr
        ));
        out.push_str("        }");
    }
    out.push('\n');
}

fn codec_header(out: &mut String, ctx: &RenderContext) {
    out.push_str(&format!("impl {} {{\n", ctx.ty.class_name));
    let opts = ctx
        .xml_parse_options
        .iter()
        .map(|o| format!("\"{}\"", o))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str("    /// Parser flags handed through to the XML reader\n");
    out.push_str(&format!(
        "    pub const XML_PARSE_OPTIONS: &'static [&'static str] = &[{}];\n\n",
        opts
    ));
}
