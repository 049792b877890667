//! Builds scripted bulk upserts from resolved nodes.
//!
//! Every node becomes one upsert whose Painless script enforces monotonic
//! metadata writes: a replay carrying an older `METADATA_INDEXING_LAST_UPDATE`
//! turns into a no-op, anything newer overwrites every parameter onto the
//! document. The upsert body duplicates the parameters so first-time inserts
//! materialize all fields.

use serde_json::{json, Map, Value};
use tracing::debug;

use batch_indexer_shared::types::node::Node;
use batch_indexer_shared::{fields, noderef, qname};

use crate::errors::SearchIndexError;
use crate::types::ScriptedUpsert;

/// Build one scripted upsert per node, in input order.
pub fn build_bulk_upserts(
    nodes: &[Node],
    commit_time_ms: i64,
) -> Result<Vec<ScriptedUpsert>, SearchIndexError> {
    nodes
        .iter()
        .map(|node| build_upsert(node, commit_time_ms))
        .collect()
}

/// Build the scripted upsert for a single node.
pub fn build_upsert(node: &Node, commit_time_ms: i64) -> Result<ScriptedUpsert, SearchIndexError> {
    let id = noderef::extract_uuid(&node.node_ref).ok_or_else(|| {
        SearchIndexError::validation(format!("invalid node reference: {}", node.node_ref))
    })?;

    let fields_map = extract_fields(node, commit_time_ms);
    let script_source = build_merge_script(fields_map.keys().map(String::as_str));
    debug!(id, field_count = fields_map.len(), "Built upsert request");

    Ok(ScriptedUpsert {
        id: id.to_string(),
        script_source,
        fields: fields_map,
    })
}

/// Painless source of the last-writer-wins merge script over the given
/// (already encoded) field names. The script shape is a compatibility
/// contract; keep it stable.
pub fn build_merge_script<'a>(field_names: impl Iterator<Item = &'a str>) -> String {
    let mut source = format!(
        "if (ctx._source.{field} > params.{field}) {{ ctx.op = 'noop'}} else {{ ",
        field = fields::METADATA_INDEXING_LAST_UPDATE
    );
    for name in field_names {
        source.push_str("ctx._source['");
        source.push_str(name);
        source.push_str("'] = params['");
        source.push_str(name);
        source.push_str("']; ");
    }
    source.push('}');
    source
}

/// Extract the document fields for a node, keyed by encoded field name.
pub fn extract_fields(node: &Node, commit_time_ms: i64) -> Map<String, Value> {
    let mut output = Map::new();

    add_encoded(&mut output, fields::TYPE, json!(node.node_type));
    add_ancestry(node, &mut output);
    add_encoded(&mut output, fields::READER, json!(node.readers));
    add_encoded(
        &mut output,
        fields::METADATA_INDEXING_LAST_UPDATE,
        json!(commit_time_ms),
    );
    add_audit_properties(node, &mut output);
    add_name(node, &mut output);
    add_properties(node, &mut output);
    add_encoded(&mut output, fields::ASPECT, json!(node.aspects));
    add_tags(node, &mut output);
    add_content_info(node, &mut output);
    add_encoded(&mut output, fields::ALIVE, json!(true));

    output
}

fn add_ancestry(node: &Node, output: &mut Map<String, Value>) {
    if node.ancestors.is_empty() {
        return;
    }
    add_encoded(output, fields::PRIMARY_PARENT, json!(node.ancestors[0]));
    add_encoded(output, fields::PARENT, json!(node.ancestors));
}

fn add_audit_properties(node: &Node, output: &mut Map<String, Value>) {
    for key in [
        fields::USER_CREATOR,
        fields::USER_MODIFIER,
        fields::CREATION_DATE,
        fields::MODIFICATION_DATE,
    ] {
        if let Some(value) = node.properties.get(key) {
            add_encoded(output, key, value.clone());
        }
    }
}

/// The name field is written on every upsert, null when the property is
/// absent, so clearing a name overwrites the stored value.
fn add_name(node: &Node, output: &mut Map<String, Value>) {
    let name = node
        .properties
        .get(fields::NAME)
        .cloned()
        .unwrap_or(Value::Null);
    add_encoded(output, fields::NAME, name);
}

/// Copy every property except the content descriptor and its transformation
/// status, record the set of copied names under `PROPERTIES`, and resolve the
/// owner (`cm:owner`, falling back to `cm:modifier`).
fn add_properties(node: &Node, output: &mut Map<String, Value>) {
    let mut written: Vec<&str> = Vec::with_capacity(node.properties.len());

    for (key, value) in &node.properties {
        if key == fields::CONTENT_TR_STATUS || key == fields::CONTENT_ATTRIBUTE {
            continue;
        }
        add_encoded(output, key, value.clone());
        written.push(key);
    }
    written.sort_unstable();

    let owner = node
        .properties
        .get(fields::OWNER_PROPERTY)
        .or_else(|| node.properties.get(fields::USER_MODIFIER));
    if let Some(owner) = owner {
        add_encoded(output, fields::OWNER, owner.clone());
    }

    add_encoded(output, fields::PROPERTIES, json!(written));
}

fn add_tags(node: &Node, output: &mut Map<String, Value>) {
    let tags: Vec<&String> = node
        .name_paths
        .iter()
        .filter_map(|name_path| {
            let segments = &name_path.name_path;
            if segments.len() > 1 && segments[0] == fields::TAGS_PATH_ROOT {
                Some(&segments[1])
            } else {
                None
            }
        })
        .collect();
    add_encoded(output, fields::TAG, json!(tags));
}

fn add_content_info(node: &Node, output: &mut Map<String, Value>) {
    let Some(content) = node
        .properties
        .get(fields::CONTENT_ATTRIBUTE)
        .and_then(Value::as_object)
    else {
        return;
    };
    for (field, key) in [
        (fields::CONTENT_MIME_TYPE, "mimetype"),
        (fields::CONTENT_SIZE, "size"),
        (fields::CONTENT_ENCODING, "encoding"),
    ] {
        if let Some(value) = content.get(key) {
            add_encoded(output, field, value.clone());
        }
    }
}

/// Normalize a value and store it under the encoded form of `key`.
fn add_encoded(output: &mut Map<String, Value>, key: &str, value: Value) {
    output.insert(qname::encode(key), normalize(value));
}

/// Value normalization: multilingual text collapses to the first entry's
/// `value`, other arrays keep their shape with each element normalized, and
/// entity-reference maps flatten to their `id`.
fn normalize(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            if let Some(text) = flatten_locale_list(&items) {
                return Value::String(text);
            }
            Value::Array(items.into_iter().map(normalize_scalar).collect())
        }
        other => normalize_scalar(other),
    }
}

fn normalize_scalar(value: Value) -> Value {
    if let Value::Object(map) = &value {
        if let Some(id) = map.get("id") {
            return id.clone();
        }
    }
    value
}

/// A locale field is a list whose first element is a map holding a `locale`
/// key and either nothing else or exactly a `value`. It collapses to the first
/// entry's `value`, an empty string when absent.
fn flatten_locale_list(items: &[Value]) -> Option<String> {
    let first = items.first()?.as_object()?;
    let is_locale = first.contains_key("locale")
        && (first.len() == 1 || (first.len() == 2 && first.contains_key("value")));
    if !is_locale {
        return None;
    }
    Some(match first.get("value") {
        Some(Value::String(text)) => text.clone(),
        Some(value) if !value.is_null() => value.to_string(),
        _ => String::new(),
    })
}
