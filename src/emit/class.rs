//! Class-Body Emitters
//!
//! One render function per generated type kind (primitives are aliases, not
//! classes). Output is plain Rust source text; every value referenced comes
//! off the RenderContext.
//!
//! Every field is generated as `Option<T>`/`Vec<T>` regardless of declared
//! minOccurs; required-ness is enforced by the generated validation
//! assertions, not the type system, so partially-populated payloads can be
//! represented during parsing.

use crate::error::EmissionError;
use crate::graph::to_pascal_case;

use super::{accessor_name, field_name, field_type, FlatProperty, RenderContext};

/// Value-set enumerations: a fieldless enum over the declared codes.
pub fn emit_enumeration(ctx: &RenderContext) -> Result<String, EmissionError> {
    let class = &ctx.ty.class_name;
    if ctx.ty.enum_values.is_empty() {
        return Err(EmissionError::RenderFailed {
            type_name: ctx.ty.name.clone(),
            artifact_kind: "class".to_string(),
            detail: "enumeration type carries no values after freeze".to_string(),
        });
    }

    let mut out = String::new();
    out.push_str(&format!("/// FHIR value set `{}`\n", ctx.ty.name));
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]\n");
    out.push_str(&format!("pub enum {} {{\n", class));
    for (i, value) in ctx.ty.enum_values.iter().enumerate() {
        out.push_str(&format!("    /// `{}`\n", value));
        out.push_str(&format!("    {},\n", variant_name(value, i)));
    }
    out.push_str("}\n\n");

    out.push_str(&format!("impl {} {{\n", class));
    out.push_str(&format!(
        "    pub const FHIR_TYPE_NAME: &'static str = \"{}\";\n\n",
        ctx.ty.name
    ));

    out.push_str("    pub fn as_str(&self) -> &'static str {\n        match self {\n");
    for (i, value) in ctx.ty.enum_values.iter().enumerate() {
        out.push_str(&format!(
            "            Self::{} => \"{}\",\n",
            variant_name(value, i),
            value
        ));
    }
    out.push_str("        }\n    }\n\n");

    out.push_str("    pub fn from_code(code: &str) -> Option<Self> {\n        match code {\n");
    for (i, value) in ctx.ty.enum_values.iter().enumerate() {
        out.push_str(&format!(
            "            \"{}\" => Some(Self::{}),\n",
            value,
            variant_name(value, i)
        ));
    }
    out.push_str("            _ => None,\n        }\n    }\n");
    out.push_str("}\n");

    Ok(out)
}

/// Complex elements and resources: a struct over the flattened property list.
pub fn emit_struct(ctx: &RenderContext) -> Result<String, EmissionError> {
    let class = &ctx.ty.class_name;
    let mut out = String::new();

    out.push_str(&format!("/// FHIR {} `{}`\n", ctx.ty.kind, ctx.ty.name));
    if let Some(base) = &ctx.ty.base_type {
        out.push_str(&format!("///\n/// Extends `{}`; inherited properties are flattened below.\n", base));
    }
    out.push_str("#[derive(Debug, Clone, Default)]\n");
    out.push_str(&format!("pub struct {} {{\n", class));
    for flat in &ctx.properties {
        emit_field_decl(&mut out, ctx, flat);
    }
    out.push_str("}\n\n");

    out.push_str(&format!("impl {} {{\n", class));
    out.push_str(&format!(
        "    pub const FHIR_TYPE_NAME: &'static str = \"{}\";\n\n",
        ctx.ty.name
    ));
    out.push_str("    pub fn new() -> Self {\n        Self::default()\n    }\n");

    for flat in &ctx.properties {
        emit_accessors(&mut out, ctx, flat);
    }
    emit_validate(&mut out, ctx);
    out.push_str("}\n\n");

    out.push_str(&format!(
        "impl crate::validation::ValidationAssertions for {} {{}}\n",
        class
    ));

    Ok(out)
}

/// Cardinality checks live here, not in the type system: every scalar field
/// is an Option so partially-populated payloads stay representable.
fn emit_validate(out: &mut String, ctx: &RenderContext) {
    out.push_str("\n    /// Collects constraint violations; empty means valid.\n");
    out.push_str("    pub fn validate(&self) -> Vec<String> {\n");
    out.push_str("        let mut errors = Vec::new();\n");
    for flat in &ctx.properties {
        let prop = &flat.property;
        // Choice groups are exclusive, never individually required
        if prop.is_choice_member || !prop.cardinality.is_required() {
            continue;
        }
        let name = field_name(&prop.name);
        if prop.cardinality.is_collection() {
            out.push_str(&format!(
                "        crate::validation::ValidationAssertions::assert_min_items(self, \"{}\", self.{}.len(), {}, &mut errors);\n",
                prop.name, name, prop.cardinality.min
            ));
        } else {
            out.push_str(&format!(
                "        crate::validation::ValidationAssertions::assert_required(self, \"{}\", self.{}.is_some(), &mut errors);\n",
                prop.name, name
            ));
        }
    }
    out.push_str("        errors\n    }\n");
}

/// The whitelisted resource wrapper: one slot per containable resource,
/// mutually exclusive.
pub fn emit_container(ctx: &RenderContext) -> Result<String, EmissionError> {
    let class = &ctx.ty.class_name;
    let mut out = String::new();

    out.push_str(&format!("/// FHIR resource container `{}`\n", ctx.ty.name));
    out.push_str("///\n");
    out.push_str("/// Holds exactly one contained resource; setting any slot clears the\n");
    out.push_str("/// others.\n");
    out.push_str("#[derive(Debug, Clone, Default)]\n");
    out.push_str(&format!("pub struct {} {{\n", class));
    for flat in &ctx.properties {
        let name = field_name(&flat.property.name);
        let path = super::type_path(ctx.graph, &flat.property.type_ref);
        out.push_str(&format!("    {}: Option<Box<{}>>,\n", name, path));
    }
    out.push_str("}\n\n");

    out.push_str(&format!("impl {} {{\n", class));
    out.push_str(&format!(
        "    pub const FHIR_TYPE_NAME: &'static str = \"{}\";\n\n",
        ctx.ty.name
    ));
    out.push_str("    pub fn new() -> Self {\n        Self::default()\n    }\n");

    for flat in &ctx.properties {
        let name = field_name(&flat.property.name);
        let getter = accessor_name(&flat.property.name);
        let setter = format!("set_{}", crate::graph::to_snake_case(&flat.property.name));
        let path = super::type_path(ctx.graph, &flat.property.type_ref);

        out.push_str(&format!(
            "\n    pub fn {}(&self) -> Option<&{}> {{\n",
            getter, path
        ));
        out.push_str(&format!("        self.{}.as_deref()\n    }}\n", name));

        out.push_str(&format!(
            "\n    pub fn {}(&mut self, value: {}) -> &mut Self {{\n",
            setter, path
        ));
        out.push_str("        self.clear();\n");
        out.push_str(&format!(
            "        self.{} = Some(Box::new(value));\n        self\n    }}\n",
            name
        ));
    }

    out.push_str("\n    pub fn clear(&mut self) {\n");
    for flat in &ctx.properties {
        out.push_str(&format!(
            "        self.{} = None;\n",
            field_name(&flat.property.name)
        ));
    }
    out.push_str("    }\n");
    out.push_str("}\n");

    Ok(out)
}

fn emit_field_decl(out: &mut String, ctx: &RenderContext, flat: &FlatProperty) {
    let prop = &flat.property;
    match &flat.inherited_from {
        Some(owner) => out.push_str(&format!(
            "    /// `{}` (inherited from `{}`)\n",
            prop.name, owner
        )),
        None => out.push_str(&format!("    /// `{}`\n", prop.name)),
    }
    if prop.is_choice_member {
        out.push_str("    /// Choice member: at most one of the group may be populated.\n");
    }
    out.push_str(&format!(
        "    {}: {},\n",
        field_name(&prop.name),
        field_type(ctx.graph, prop)
    ));
}

fn emit_accessors(out: &mut String, ctx: &RenderContext, flat: &FlatProperty) {
    let prop = &flat.property;
    let name = field_name(&prop.name);
    let getter = accessor_name(&prop.name);
    let snake = crate::graph::to_snake_case(&prop.name);
    let path = super::type_path(ctx.graph, &prop.type_ref);

    if prop.cardinality.is_collection() {
        out.push_str(&format!(
            "\n    pub fn {}(&self) -> &[{}] {{\n        &self.{}\n    }}\n",
            getter, path, name
        ));
        out.push_str(&format!(
            "\n    pub fn add_{}(&mut self, value: {}) -> &mut Self {{\n",
            snake, path
        ));
        out.push_str(&format!(
            "        self.{}.push(value);\n        self\n    }}\n",
            name
        ));
        return;
    }

    out.push_str(&format!(
        "\n    pub fn {}(&self) -> Option<&{}> {{\n        self.{}.as_ref()\n    }}\n",
        getter, path, name
    ));

    out.push_str(&format!(
        "\n    pub fn set_{}(&mut self, value: {}) -> &mut Self {{\n",
        snake, path
    ));
    if prop.is_choice_member {
        // Mutual exclusion within the choice group
        for other in ctx.choice_members() {
            if other.property.name != prop.name {
                out.push_str(&format!(
                    "        self.{} = None;\n",
                    field_name(&other.property.name)
                ));
            }
        }
    }
    out.push_str(&format!(
        "        self.{} = Some(value);\n        self\n    }}\n",
        name
    ));
}

/// Variant name for an enumeration value; codes that carry no letters
/// (comparison operators and the like) fall back to an indexed name.
pub fn variant_name(value: &str, index: usize) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    let pascal = to_pascal_case(cleaned.trim());
    if pascal.is_empty() || pascal.starts_with(|c: char| c.is_ascii_digit()) {
        format!("Value{}", index)
    } else {
        pascal
    }
}
