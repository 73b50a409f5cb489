//! Cross-entity references inside exported bodies
//!
//! Content items link to each other through objects of the form
//! `{"_meta": {"schema": ".../content-link"}, "id": "<item id>"}`; editions
//! point at their event through `eventId`.

use crate::api::EntityKind;
use crate::mapping::ContentMapping;
use serde_json::Value;

const LINK_SCHEMAS: [&str; 2] = ["content-link", "content-reference"];
const EVENT_FIELD: &str = "eventId";

fn is_link(object: &serde_json::Map<String, Value>) -> bool {
    object
        .get("_meta")
        .and_then(|meta| meta.get("schema"))
        .and_then(Value::as_str)
        .is_some_and(|schema| LINK_SCHEMAS.iter().any(|s| schema.ends_with(s)))
}

fn collect_links(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(object) => {
            if is_link(object) {
                if let Some(id) = object.get("id").and_then(Value::as_str) {
                    out.push(id.to_string());
                }
            }
            object.values().for_each(|v| collect_links(v, out));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_links(v, out)),
        _ => {}
    }
}

fn rewrite_links(value: &mut Value, mapping: &ContentMapping) {
    match value {
        Value::Object(object) => {
            if is_link(object) {
                let mapped = object
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|id| mapping.get(EntityKind::ContentItem, id))
                    .map(str::to_string);
                if let Some(dest) = mapped {
                    object.insert("id".to_string(), Value::String(dest));
                }
            }
            object.values_mut().for_each(|v| rewrite_links(v, mapping));
        }
        Value::Array(items) => items.iter_mut().for_each(|v| rewrite_links(v, mapping)),
        _ => {}
    }
}

/// Entities `body` depends on, as (kind, source id)
pub fn dependencies(kind: EntityKind, body: &Value) -> Vec<(EntityKind, String)> {
    match kind {
        EntityKind::ContentItem => {
            let mut links = Vec::new();
            collect_links(body, &mut links);
            links.sort();
            links.dedup();
            links
                .into_iter()
                .map(|id| (EntityKind::ContentItem, id))
                .collect()
        }
        EntityKind::Edition => body
            .get(EVENT_FIELD)
            .and_then(Value::as_str)
            .map(|id| vec![(EntityKind::Event, id.to_string())])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Copy of `body` with every mapped reference pointing at its destination id.
/// Unmapped references are left untouched.
pub fn rewrite(kind: EntityKind, body: &Value, mapping: &ContentMapping) -> Value {
    let mut body = body.clone();
    match kind {
        EntityKind::ContentItem => rewrite_links(&mut body, mapping),
        EntityKind::Edition => {
            let mapped = body
                .get(EVENT_FIELD)
                .and_then(Value::as_str)
                .and_then(|id| mapping.get(EntityKind::Event, id))
                .map(str::to_string);
            if let (Some(dest), Value::Object(object)) = (mapped, &mut body) {
                object.insert(EVENT_FIELD.to_string(), Value::String(dest));
            }
        }
        _ => {}
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LINK_SCHEMA: &str =
        "http://bigcontent.io/cms/schema/v1/core#/definitions/content-link";

    fn link(id: &str) -> Value {
        json!({"_meta": {"schema": LINK_SCHEMA}, "id": id})
    }

    #[test]
    fn test_collects_nested_links_once() {
        let body = json!({
            "hero": link("a"),
            "cards": [link("b"), {"inner": link("a")}],
            "title": "not a link",
            "id": "own-id"
        });

        assert_eq!(
            dependencies(EntityKind::ContentItem, &body),
            vec![
                (EntityKind::ContentItem, "a".to_string()),
                (EntityKind::ContentItem, "b".to_string())
            ]
        );
    }

    #[test]
    fn test_rewrite_only_touches_mapped_links() {
        let mut mapping = ContentMapping::new();
        mapping.register(EntityKind::ContentItem, "a", "dst-a");

        let body = json!({"hero": link("a"), "other": link("b"), "id": "a"});
        let rewritten = rewrite(EntityKind::ContentItem, &body, &mapping);

        assert_eq!(rewritten["hero"]["id"], "dst-a");
        assert_eq!(rewritten["other"]["id"], "b");
        assert_eq!(rewritten["id"], "a");
    }

    #[test]
    fn test_edition_depends_on_its_event() {
        let body = json!({"name": "Spring", "eventId": "ev-1"});
        assert_eq!(
            dependencies(EntityKind::Edition, &body),
            vec![(EntityKind::Event, "ev-1".to_string())]
        );

        let mut mapping = ContentMapping::new();
        mapping.register(EntityKind::Event, "ev-1", "ev-9");
        assert_eq!(rewrite(EntityKind::Edition, &body, &mapping)["eventId"], "ev-9");
    }
}
