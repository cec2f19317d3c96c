//! JSON Schema rewriting for Gemini function declarations.
//!
//! Gemini accepts a small OpenAPI-flavoured subset of JSON Schema: uppercase `type`
//! tokens plus `properties`, `items`, `required`, `description` and `enum`. Tool
//! parameter schemas written for the Chat Completions API routinely use much more
//! (`$ref`, `anyOf`, `const`, string/number constraints, ...), so [`rewrite`] downgrades
//! them in a fixed sequence of phases:
//!
//! 0. [`limit_depth`]: nested structure below [`MAX_SCHEMA_DEPTH`] collapses to a generic object.
//! 1. [`extract_hints`]: unsupported keywords become human-readable hints in `description`.
//! 2. [`flatten_unions`]: `allOf` merge, `anyOf`/`oneOf` selection, `type` lists.
//! 3. [`strip_unsupported`]: unsupported keywords are removed at schema positions.
//! 4. [`prune_required`]: `required` only names existing properties.
//! 5. [`fill_empty_objects`]: property-less objects get a placeholder property.
//! 6. [`normalize`]: lowering into the typed [`Schema`] (uppercase types, array `items`).
//!
//! Every phase rebuilds the tree and never fails. The pipeline is idempotent:
//! rewriting the serialized output of [`rewrite`] yields the same [`Schema`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use serde_with::skip_serializing_none;

/// Nodes at this depth that still carry nested structure are truncated.
pub const MAX_SCHEMA_DEPTH: usize = 32;

/// Name of the synthetic property added to otherwise empty object schemas.
pub const PLACEHOLDER_PROPERTY: &str = "_placeholder";
const PLACEHOLDER_DESCRIPTION: &str = "Placeholder property. Always pass true.";

const MAX_ENUM_HINT_VALUES: usize = 10;
const NO_EXTRA_PROPERTIES_HINT: &str = "(no extra properties)";
const NULLABLE_HINT: &str = "(nullable)";
const TRUNCATED_HINT: &str = "(nested schema truncated)";

/// Constraint keywords preserved as `"<keyword>: <value>"` hints before removal.
const HINTED_CONSTRAINTS: &[&str] = &[
    "minLength",
    "maxLength",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "pattern",
    "format",
    "minItems",
    "maxItems",
    "uniqueItems",
    "minProperties",
    "maxProperties",
];

/// Keywords removed without a dedicated hint (or after one was recorded).
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    // metadata
    "$schema",
    "$id",
    "$anchor",
    "$comment",
    "title",
    "default",
    "examples",
    "deprecated",
    "readOnly",
    "writeOnly",
    "contentEncoding",
    "contentMediaType",
    "nullable",
    "strict",
    // references and definitions
    "$ref",
    "$defs",
    "definitions",
    "const",
    // object shape
    "additionalProperties",
    "patternProperties",
    "propertyNames",
    "unevaluatedProperties",
    "dependentRequired",
    "dependentSchemas",
    "dependencies",
    // conditionals
    "if",
    "then",
    "else",
    "not",
    // arrays
    "prefixItems",
    "unevaluatedItems",
    "contains",
    "minContains",
    "maxContains",
];

fn is_unsupported(keyword: &str) -> bool {
    UNSUPPORTED_KEYWORDS.contains(&keyword) || HINTED_CONSTRAINTS.contains(&keyword)
}

/// Type tokens accepted by Gemini.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    /// Case-insensitive parse of a JSON Schema type name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }
}

/// A schema in the dialect Gemini accepts. Anything else is unrepresentable.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default)]
    pub kind: Option<SchemaType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<String>>,
    #[serde(default)]
    pub properties: Option<BTreeMap<String, Schema>>,
    #[serde(default)]
    pub items: Option<Box<Schema>>,
    #[serde(default)]
    pub required: Option<Vec<String>>,
}

impl Schema {
    pub fn of(kind: SchemaType) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }
}

/// Rewrite an arbitrary JSON Schema fragment into the Gemini dialect.
///
/// Non-object input yields a plain `STRING` schema.
pub fn rewrite(schema: &Value) -> Schema {
    if !schema.is_object() {
        return Schema::of(SchemaType::String);
    }
    let tree = limit_depth(schema);
    let tree = extract_hints(&tree);
    let tree = flatten_unions(&tree);
    let tree = strip_unsupported(&tree);
    let tree = prune_required(&tree);
    let tree = fill_empty_objects(&tree);
    normalize(&tree)
}

/// [`rewrite`], returning JSON.
pub fn rewrite_value(schema: &Value) -> Value {
    serde_json::to_value(rewrite(schema)).unwrap_or_else(|_| json!({ "type": "STRING" }))
}

// ============================================================================
// Phase 0: depth guard
// ============================================================================

/// Replace container nodes at [`MAX_SCHEMA_DEPTH`] with a generic object.
///
/// Scalar leaves at the limit are kept. Containers are truncated even when empty, so
/// structure added by later phases (placeholders, default `items`) is never re-truncated
/// by a second pass.
pub fn limit_depth(schema: &Value) -> Value {
    limit_depth_at(schema, 0)
}

fn limit_depth_at(schema: &Value, depth: usize) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    if depth >= MAX_SCHEMA_DEPTH && is_container(map) {
        tracing::debug!(depth, "schema nesting too deep, truncating");
        let mut out = Map::new();
        out.insert("type".into(), json!("object"));
        out.insert(
            "description".into(),
            Value::String(append_hint(description_of(map), TRUNCATED_HINT)),
        );
        return Value::Object(out);
    }
    Value::Object(map_children(map, &|child| limit_depth_at(child, depth + 1)))
}

/// Anything a later phase could turn into an `OBJECT` or `ARRAY`, including
/// untyped nodes carrying an empty `properties` map or an `items` key.
fn is_container(map: &Map<String, Value>) -> bool {
    has_nested_structure(map)
        || map.contains_key("$ref")
        || map.contains_key("properties")
        || map.contains_key("items")
        || matches!(type_name(map).as_deref(), Some("object" | "array"))
}

fn has_nested_structure(map: &Map<String, Value>) -> bool {
    ["properties", "items", "allOf", "anyOf", "oneOf"]
        .iter()
        .any(|key| match map.get(*key) {
            Some(Value::Object(o)) => !o.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            _ => false,
        })
}

// ============================================================================
// Phase 1: hint extraction
// ============================================================================

/// Turn unsupported keywords into description hints.
///
/// `$ref` and `const` have structural equivalents and replace the node instead.
pub fn extract_hints(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    let mut node = map_children(map, &extract_hints);

    if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
        let name = reference.rsplit('/').next().unwrap_or(reference);
        let mut out = Map::new();
        out.insert("type".into(), json!("object"));
        out.insert(
            "description".into(),
            Value::String(append_hint(
                description_of(&node),
                &format!("(See: {name})"),
            )),
        );
        return Value::Object(out);
    }

    if let Some(value) = node.get("const") {
        let mut out = Map::new();
        out.insert("type".into(), json!("string"));
        out.insert("enum".into(), json!([display_value(value)]));
        if let Some(desc) = description_of(&node) {
            out.insert("description".into(), Value::String(desc.to_string()));
        }
        return Value::Object(out);
    }

    let mut hints: Vec<String> = Vec::new();
    if let Some(Value::Array(values)) = node.get("enum") {
        if !enum_is_native(&node, values) {
            hints.push(allowed_hint(values));
        }
    }
    if node.get("additionalProperties") == Some(&Value::Bool(false)) {
        hints.push(NO_EXTRA_PROPERTIES_HINT.to_string());
    }
    for keyword in HINTED_CONSTRAINTS {
        if let Some(value) = node.get(*keyword) {
            hints.push(format!("{keyword}: {}", display_value(value)));
        }
    }

    if !hints.is_empty() {
        let mut desc = description_of(&node).map(str::to_string);
        for hint in &hints {
            desc = Some(append_hint(desc.as_deref(), hint));
        }
        if let Some(desc) = desc {
            node.insert("description".into(), Value::String(desc));
        }
    }
    Value::Object(node)
}

/// A string enum on a string (or untyped) node survives as-is, so it needs no hint.
fn enum_is_native(node: &Map<String, Value>, values: &[Value]) -> bool {
    let string_typed = match type_name(node) {
        None => true,
        Some(t) => t == "string",
    };
    string_typed && values.iter().all(Value::is_string)
}

fn allowed_hint(values: &[Value]) -> String {
    let mut shown: Vec<String> = values
        .iter()
        .take(MAX_ENUM_HINT_VALUES)
        .map(display_value)
        .collect();
    if values.len() > MAX_ENUM_HINT_VALUES {
        shown.push("...".to_string());
    }
    format!("(Allowed: {})", shown.join(", "))
}

// ============================================================================
// Phase 2: structural flattening
// ============================================================================

/// Resolve `allOf`, `anyOf`/`oneOf` and list-valued `type` into single-shape nodes.
pub fn flatten_unions(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    let mut node = map_children(map, &flatten_unions);

    if let Some(Value::Array(branches)) = node.remove("allOf") {
        node = merge_all_of(node, &branches);
    }
    for key in ["anyOf", "oneOf"] {
        if let Some(Value::Array(branches)) = node.remove(key) {
            node = select_union_branch(node, &branches);
        }
    }
    if let Some(Value::Array(types)) = node.get("type").cloned() {
        node = flatten_type_list(node, &types);
    }
    if type_name(&node).as_deref() == Some("null") {
        node.insert("type".into(), json!("string"));
        add_hint(&mut node, NULLABLE_HINT);
    }
    Value::Object(node)
}

fn merge_all_of(mut node: Map<String, Value>, branches: &[Value]) -> Map<String, Value> {
    let mut properties = match node.remove("properties") {
        Some(Value::Object(props)) => props,
        _ => Map::new(),
    };
    let mut required: Vec<Value> = Vec::new();
    if let Some(Value::Array(list)) = node.remove("required") {
        push_unique(&mut required, list);
    }

    for branch in branches.iter().filter_map(Value::as_object) {
        if let Some(Value::Object(props)) = branch.get("properties") {
            for (name, prop) in props {
                properties.insert(name.clone(), prop.clone());
            }
        }
        if let Some(Value::Array(list)) = branch.get("required") {
            push_unique(&mut required, list.clone());
        }
        if type_name(&node).is_none() {
            if let Some(t) = branch.get("type").filter(|t| is_non_empty_type(t)) {
                node.insert("type".into(), t.clone());
            }
        }
        if description_of(&node).is_none() {
            if let Some(desc) = description_of(branch) {
                node.insert("description".into(), Value::String(desc.to_string()));
            }
        }
        if !node.contains_key("items") {
            if let Some(items) = branch.get("items") {
                node.insert("items".into(), items.clone());
            }
        }
    }

    if !properties.is_empty() {
        node.insert("properties".into(), Value::Object(properties));
    }
    if !required.is_empty() {
        node.insert("required".into(), Value::Array(required));
    }
    node
}

fn select_union_branch(mut node: Map<String, Value>, branches: &[Value]) -> Map<String, Value> {
    if branches.is_empty() {
        return node;
    }

    if let Some(values) = enum_only_values(branches) {
        node.remove("properties");
        node.remove("items");
        node.remove("required");
        node.insert("type".into(), json!("string"));
        node.insert(
            "enum".into(),
            Value::Array(values.into_iter().map(Value::String).collect()),
        );
        return node;
    }

    let mut chosen: Option<(&Map<String, Value>, u8)> = None;
    let mut types: Vec<String> = Vec::new();
    let mut nullable = false;
    for branch in branches.iter().filter_map(Value::as_object) {
        let score = branch_score(branch);
        if chosen.map_or(true, |(_, best)| score > best) {
            chosen = Some((branch, score));
        }
        match branch_type(branch) {
            Some(t) if t == "null" => nullable = true,
            Some(t) => {
                if !types.contains(&t) {
                    types.push(t);
                }
            }
            None => {}
        }
    }
    let Some((branch, _)) = chosen else {
        return node;
    };

    let parent_desc = description_of(&node).map(str::to_string);
    for (key, value) in branch {
        if key != "description" {
            node.insert(key.clone(), value.clone());
        }
    }
    let mut desc = combine_descriptions(parent_desc, description_of(branch));
    if types.len() > 1 {
        desc = Some(append_hint(
            desc.as_deref(),
            &format!("(Accepts: {})", types.join(" | ")),
        ));
    }
    if nullable {
        desc = Some(append_hint(desc.as_deref(), NULLABLE_HINT));
    }
    match desc {
        Some(desc) => {
            node.insert("description".into(), Value::String(desc));
        }
        None => {
            node.remove("description");
        }
    }
    node
}

/// All branches are flat constants/enums: collect their values, deduplicated, in order.
fn enum_only_values(branches: &[Value]) -> Option<Vec<String>> {
    let mut values: Vec<String> = Vec::new();
    for branch in branches {
        let branch = branch.as_object()?;
        if has_nested_structure(branch) {
            return None;
        }
        let list = match (branch.get("const"), branch.get("enum")) {
            (Some(value), _) => vec![display_value(value)],
            (None, Some(Value::Array(list))) => list.iter().map(display_value).collect(),
            _ => return None,
        };
        for value in list {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    Some(values)
}

fn branch_score(branch: &Map<String, Value>) -> u8 {
    let t = type_name(branch);
    if t.as_deref() == Some("object") || branch.contains_key("properties") {
        3
    } else if t.as_deref() == Some("array") || branch.contains_key("items") {
        2
    } else if matches!(t.as_deref(), Some(t) if t != "null") {
        1
    } else {
        0
    }
}

fn branch_type(branch: &Map<String, Value>) -> Option<String> {
    type_name(branch).or_else(|| {
        if branch.contains_key("properties") {
            Some("object".to_string())
        } else if branch.contains_key("items") {
            Some("array".to_string())
        } else {
            None
        }
    })
}

fn flatten_type_list(mut node: Map<String, Value>, types: &[Value]) -> Map<String, Value> {
    let mut non_null: Vec<String> = Vec::new();
    let mut nullable = false;
    for t in types.iter().filter_map(Value::as_str) {
        let t = t.to_ascii_lowercase();
        if t == "null" {
            nullable = true;
        } else if !non_null.contains(&t) {
            non_null.push(t);
        }
    }
    let first = non_null
        .first()
        .cloned()
        .unwrap_or_else(|| "string".to_string());
    node.insert("type".into(), Value::String(first));
    if nullable {
        add_hint(&mut node, NULLABLE_HINT);
    }
    if non_null.len() > 1 {
        add_hint(&mut node, &format!("(Accepts: {})", non_null.join(" | ")));
    }
    node
}

// ============================================================================
// Phase 3: keyword removal
// ============================================================================

/// Drop unsupported keywords at schema positions. Property names are never touched.
pub fn strip_unsupported(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    Value::Object(
        map_children(map, &strip_unsupported)
            .into_iter()
            .filter(|(key, _)| !is_unsupported(key))
            .collect(),
    )
}

// ============================================================================
// Phase 4: required cleanup
// ============================================================================

/// Keep only `required` entries naming an existing sibling property.
pub fn prune_required(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    let mut node = map_children(map, &prune_required);
    if let Some(required) = node.remove("required") {
        let kept = match (required, node.get("properties")) {
            (Value::Array(list), Some(Value::Object(props))) => {
                let mut kept: Vec<Value> = Vec::new();
                for name in list {
                    let known = name.as_str().is_some_and(|n| props.contains_key(n));
                    if known && !kept.contains(&name) {
                        kept.push(name);
                    }
                }
                kept
            }
            _ => Vec::new(),
        };
        if !kept.is_empty() {
            node.insert("required".into(), Value::Array(kept));
        }
    }
    Value::Object(node)
}

// ============================================================================
// Phase 5: empty-object placeholder
// ============================================================================

/// Give property-less object schemas a single required boolean placeholder.
pub fn fill_empty_objects(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    let mut node = map_children(map, &fill_empty_objects);
    let is_object = match type_name(&node) {
        Some(t) => t == "object",
        None => node.get("properties").is_some_and(Value::is_object),
    };
    let has_properties = node
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| !props.is_empty());
    if is_object && !has_properties {
        node.insert(
            "properties".into(),
            json!({
                PLACEHOLDER_PROPERTY: {
                    "type": "boolean",
                    "description": PLACEHOLDER_DESCRIPTION
                }
            }),
        );
        node.insert("required".into(), json!([PLACEHOLDER_PROPERTY]));
    }
    Value::Object(node)
}

// ============================================================================
// Phase 6: dialect normalization
// ============================================================================

/// Lower a cleaned tree into [`Schema`]: uppercase types, mandatory array `items`,
/// and only the accepted keyword set.
pub fn normalize(schema: &Value) -> Schema {
    let Value::Object(map) = schema else {
        return Schema::of(SchemaType::String);
    };

    let properties: Option<BTreeMap<String, Schema>> = match map.get("properties") {
        Some(Value::Object(props)) => Some(
            props
                .iter()
                .map(|(name, prop)| (name.clone(), normalize(prop)))
                .collect(),
        ),
        _ => None,
    };
    let items = match map.get("items") {
        Some(item @ Value::Object(_)) => Some(normalize(item)),
        Some(Value::Array(list)) => list.first().map(normalize),
        _ => None,
    };
    let enum_values: Option<Vec<String>> = match map.get("enum") {
        Some(Value::Array(values)) if !values.is_empty() => {
            Some(values.iter().map(display_value).collect())
        }
        _ => None,
    };

    let kind = map
        .get("type")
        .and_then(Value::as_str)
        .and_then(SchemaType::parse)
        .or_else(|| {
            if properties.is_some() {
                Some(SchemaType::Object)
            } else if items.is_some() {
                Some(SchemaType::Array)
            } else if enum_values.is_some() {
                Some(SchemaType::String)
            } else {
                None
            }
        });

    let mut out = Schema {
        kind,
        description: description_of(map).map(str::to_string),
        ..Default::default()
    };
    match kind {
        Some(SchemaType::Object) => {
            let properties = properties.filter(|p| !p.is_empty());
            if let (Some(Value::Array(list)), Some(props)) = (map.get("required"), &properties) {
                let required: Vec<String> = list
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|name| props.contains_key(*name))
                    .map(str::to_string)
                    .collect();
                if !required.is_empty() {
                    out.required = Some(required);
                }
            }
            out.properties = properties;
        }
        Some(SchemaType::Array) => {
            out.items = Some(Box::new(
                items.unwrap_or_else(|| Schema::of(SchemaType::String)),
            ));
        }
        Some(SchemaType::String) => out.enum_values = enum_values,
        _ => {}
    }
    out
}

// ============================================================================
// Helpers
// ============================================================================

/// Rebuild `map`, applying `f` to every nested schema position
/// (`properties` values, `items`, `allOf`/`anyOf`/`oneOf` branches).
fn map_children<F>(map: &Map<String, Value>, f: &F) -> Map<String, Value>
where
    F: Fn(&Value) -> Value,
{
    map.iter()
        .map(|(key, value)| {
            let rebuilt = match (key.as_str(), value) {
                ("properties", Value::Object(props)) => Value::Object(
                    props
                        .iter()
                        .map(|(name, prop)| (name.clone(), f(prop)))
                        .collect(),
                ),
                ("items", Value::Object(_)) => f(value),
                ("items" | "allOf" | "anyOf" | "oneOf", Value::Array(list)) => {
                    Value::Array(list.iter().map(f).collect())
                }
                _ => value.clone(),
            };
            (key.clone(), rebuilt)
        })
        .collect()
}

/// Lowercased scalar type, or the first non-null entry of a type list.
fn type_name(node: &Map<String, Value>) -> Option<String> {
    match node.get("type")? {
        Value::String(t) if !t.is_empty() => Some(t.to_ascii_lowercase()),
        Value::Array(list) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_ascii_lowercase)
            .find(|t| t != "null"),
        _ => None,
    }
}

fn is_non_empty_type(t: &Value) -> bool {
    match t {
        Value::String(s) => !s.is_empty(),
        Value::Array(list) => !list.is_empty(),
        _ => false,
    }
}

fn description_of(node: &Map<String, Value>) -> Option<&str> {
    node.get("description")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty())
}

/// Append `hint` unless the description already contains it.
fn append_hint(description: Option<&str>, hint: &str) -> String {
    match description {
        Some(desc) if desc.contains(hint) => desc.to_string(),
        Some(desc) if !desc.trim().is_empty() => format!("{desc} {hint}"),
        _ => hint.to_string(),
    }
}

fn add_hint(node: &mut Map<String, Value>, hint: &str) {
    let desc = append_hint(description_of(node), hint);
    node.insert("description".into(), Value::String(desc));
}

fn combine_descriptions(parent: Option<String>, branch: Option<&str>) -> Option<String> {
    match (parent, branch) {
        (Some(p), Some(b)) if p.contains(b) => Some(p),
        (Some(p), Some(b)) if b.contains(p.as_str()) => Some(b.to_string()),
        (Some(p), Some(b)) => Some(format!("{p} {b}")),
        (Some(p), None) => Some(p),
        (None, b) => b.map(str::to_string),
    }
}

/// Strings verbatim, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_unique(target: &mut Vec<Value>, values: Vec<Value>) {
    for value in values {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}
