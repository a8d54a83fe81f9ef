//! JSON Codec Emitters
//!
//! Generates `json_serialize` impls. Same shape as the XML codec: struct
//! types build an object member list in declaration order, resources lead
//! with `resourceType`, and choice groups collapse to the first populated
//! member.

use crate::error::EmissionError;
use crate::graph::TypeKind;

use super::{field_name, is_primitive_ref, FlatProperty, RenderContext};

pub fn emit_codec(ctx: &RenderContext) -> Result<String, EmissionError> {
    match ctx.ty.kind {
        TypeKind::Enumeration => Ok(enumeration_codec(ctx)),
        _ => Ok(struct_codec(ctx)),
    }
}

pub fn emit_container_codec(ctx: &RenderContext) -> Result<String, EmissionError> {
    let mut out = String::new();
    out.push_str(&format!("impl {} {{\n", ctx.ty.class_name));
    out.push_str("    /// Delegates to the first populated contained resource.\n");
    out.push_str("    pub fn json_serialize(&self) -> String {\n");
    for flat in &ctx.properties {
        let name = field_name(&flat.property.name);
        out.push_str(&format!("        if let Some(v) = self.{}.as_deref() {{\n", name));
        out.push_str("            return v.json_serialize();\n");
        out.push_str("        }\n");
    }
    out.push_str("        \"null\".to_string()\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    Ok(out)
}

fn enumeration_codec(ctx: &RenderContext) -> String {
    let mut out = String::new();
    out.push_str(&format!("impl {} {{\n", ctx.ty.class_name));
    out.push_str("    pub fn json_serialize(&self) -> String {\n");
    out.push_str("        crate::serialization::json_string(self.as_str())\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

fn struct_codec(ctx: &RenderContext) -> String {
    let mut out = String::new();
    out.push_str(&format!("impl {} {{\n", ctx.ty.class_name));
    out.push_str("    pub fn json_serialize(&self) -> String {\n");
    out.push_str("        let mut members: Vec<String> = Vec::new();\n");

    if ctx.ty.kind == TypeKind::Resource {
        out.push_str(&format!(
            "        members.push(\"\\\"resourceType\\\":\\\"{}\\\"\".to_string());\n",
            ctx.ty.name
        ));
    }

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

    out.push_str("        format!(\"{{{}}}\", members.join(\",\"))\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

fn serialize_expr(ctx: &RenderContext, flat: &FlatProperty) -> &'static str {
    if is_primitive_ref(ctx.graph, &flat.property.type_ref) {
        "crate::serialization::json_string(v)"
    } else {
        "v.json_serialize()"
    }
}

fn emit_plain_property(out: &mut String, ctx: &RenderContext, flat: &FlatProperty) {
    let prop = &flat.property;
    let name = field_name(&prop.name);
    let expr = serialize_expr(ctx, flat);
    if prop.cardinality.is_collection() {
        out.push_str(&format!("        if !self.{}.is_empty() {{\n", name));
        out.push_str(&format!(
            "            let items: Vec<String> = self.{}.iter().map(|v| {}).collect();\n",
            name, expr
        ));
        out.push_str(&format!(
            "            members.push(format!(\"\\\"{}\\\":[{{}}]\", items.join(\",\")));\n",
            prop.name
        ));
        out.push_str("        }\n");
    } else {
        out.push_str(&format!("        if let Some(v) = &self.{} {{\n", name));
        out.push_str(&format!(
            "            members.push(format!(\"\\\"{}\\\":{{}}\", {}));\n",
            prop.name, expr
        ));
        out.push_str("        }\n");
    }
}

fn emit_choice_chain(out: &mut String, ctx: &RenderContext) {
    let members: Vec<&FlatProperty> = ctx.choice_members().collect();
    for (i, flat) in members.iter().enumerate() {
        let prop = &flat.property;
        let name = field_name(&prop.name);
        let expr = serialize_expr(ctx, flat);
        let keyword = if i == 0 { "        if" } else { " else if" };
        out.push_str(&format!("{} let Some(v) = &self.{} {{\n", keyword, name));
        out.push_str(&format!(
            "            members.push(format!(\"\\\"{}\\\":{{}}\", {}));\n",
            prop.name, expr
        ));
        out.push_str("        }");
    }
    out.push('\n');
}
