//! JSON Schema → TypeScript type definition.
//!
//! Produces a compact, human-readable declaration for the model to follow.
//! Unknown constructs degrade to `any` rather than failing.

use serde_json::Value;

const INDENT: &str = "  ";

/// Render `schema` as `type {type_name} = ...`.
pub fn schema_to_typescript(schema: &Value, type_name: &str) -> String {
    let mut out = String::new();
    push_comment(&mut out, schema, "");
    out.push_str(&format!("type {} = {}", type_name, ts_type(schema, 0)));
    out
}

fn push_comment(out: &mut String, schema: &Value, indent: &str) {
    if let Some(description) = schema.get("description").and_then(Value::as_str) {
        for line in description.lines() {
            out.push_str(&format!("{indent}// {line}\n"));
        }
    }
}

fn ts_type(schema: &Value, depth: usize) -> String {
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        return values.iter().map(Value::to_string).collect::<Vec<_>>().join(" | ");
    }
    if let Some(value) = schema.get("const") {
        return value.to_string();
    }
    for (key, sep) in [("anyOf", " | "), ("oneOf", " | "), ("allOf", " & ")] {
        if let Some(variants) = schema.get(key).and_then(Value::as_array) {
            return variants
                .iter()
                .map(|v| ts_type(v, depth))
                .collect::<Vec<_>>()
                .join(sep);
        }
    }

    match schema.get("type") {
        Some(Value::String(t)) => primitive(t, schema, depth),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .map(|t| primitive(t, schema, depth))
            .collect::<Vec<_>>()
            .join(" | "),
        _ if schema.get("properties").is_some() => object_type(schema, depth),
        _ => "any".into(),
    }
}

fn primitive(t: &str, schema: &Value, depth: usize) -> String {
    match t {
        "string" => "string".into(),
        "number" | "integer" => "number".into(),
        "boolean" => "boolean".into(),
        "null" => "null".into(),
        "array" => match schema.get("items") {
            Some(items) => {
                let inner = ts_type(items, depth);
                if inner.contains(" | ") || inner.contains(" & ") {
                    format!("({inner})[]")
                } else {
                    format!("{inner}[]")
                }
            }
            None => "any[]".into(),
        },
        "object" => object_type(schema, depth),
        _ => "any".into(),
    }
}

fn object_type(schema: &Value, depth: usize) -> String {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return match schema.get("additionalProperties") {
            Some(extra) if extra.is_object() => {
                format!("Record<string, {}>", ts_type(extra, depth))
            }
            _ => "Record<string, any>".into(),
        };
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let indent = INDENT.repeat(depth + 1);
    let mut out = String::from("{\n");
    for (name, prop) in properties {
        push_comment(&mut out, prop, &indent);
        let optional = if required.contains(&name.as_str()) { "" } else { "?" };
        out.push_str(&format!(
            "{indent}{}{optional}: {},\n",
            property_name(name),
            ts_type(prop, depth + 1)
        ));
    }
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
    out
}

fn property_name(name: &str) -> String {
    let is_ident = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        name.to_string()
    } else {
        format!("{name:?}")
    }
}
