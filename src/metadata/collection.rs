use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::decl::DeclarationId;
use super::tags::VALUE_FIELD;

/// A realized parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<MetadataValue>),
    Map(Vec<(String, MetadataValue)>),
    Metadata(Arc<MetadataInstance>),
}

impl MetadataValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Strings held by this value: the string itself, or every string of a
    /// list.
    #[must_use]
    pub fn strings(&self) -> Vec<&str> {
        match self {
            MetadataValue::Str(s) => vec![s.as_str()],
            MetadataValue::List(items) => items.iter().filter_map(MetadataValue::as_str).collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            MetadataValue::Null => Value::Null,
            MetadataValue::Bool(b) => Value::Bool(*b),
            MetadataValue::Int(i) => json!(i),
            MetadataValue::Float(f) => json!(f),
            MetadataValue::Str(s) => Value::String(s.clone()),
            MetadataValue::List(items) => {
                Value::Array(items.iter().map(MetadataValue::to_json).collect())
            }
            MetadataValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            MetadataValue::Metadata(inst) => inst.to_json(),
        }
    }
}

/// Where an instance was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceTarget {
    Declaration(DeclarationId),
    Nested,
}

/// One realized piece of metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataInstance {
    pub type_name: String,
    pub target: InstanceTarget,
    pub fields: BTreeMap<String, MetadataValue>,
}

impl MetadataInstance {
    /// The implicit `value` field.
    #[must_use]
    pub fn value(&self) -> Option<&MetadataValue> {
        self.fields.get(VALUE_FIELD)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&MetadataValue> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        json!({ "type": self.type_name, "fields": fields })
    }
}

/// All metadata found on one declaration, grouped by canonical type name in
/// discovery order.
///
/// Queries take canonical names; see
/// [`MetadataBuilder::resolve_name`](super::MetadataBuilder::resolve_name).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataCollection {
    entries: Vec<(String, Vec<Arc<MetadataInstance>>)>,
}

impl MetadataCollection {
    pub(crate) fn push(&mut self, instance: Arc<MetadataInstance>) {
        match self
            .entries
            .iter_mut()
            .find(|(name, _)| *name == instance.type_name)
        {
            Some((_, list)) => list.push(instance),
            None => self
                .entries
                .push((instance.type_name.clone(), vec![instance])),
        }
    }

    #[must_use]
    pub fn has(&self, type_name: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == type_name)
    }

    /// Last instance of `type_name`.
    #[must_use]
    pub fn latest(&self, type_name: &str) -> Option<&Arc<MetadataInstance>> {
        self.entries
            .iter()
            .find(|(name, _)| name == type_name)
            .and_then(|(_, list)| list.last())
    }

    /// The latest instance of every type present.
    #[must_use]
    pub fn all(&self) -> Vec<&Arc<MetadataInstance>> {
        self.entries
            .iter()
            .filter_map(|(_, list)| list.last())
            .collect()
    }

    /// Every instance, optionally only those of `type_name`.
    #[must_use]
    pub fn all_of_type(&self, type_name: Option<&str>) -> Vec<&Arc<MetadataInstance>> {
        self.entries
            .iter()
            .filter(|(name, _)| type_name.map_or(true, |t| t == name))
            .flat_map(|(_, list)| list.iter())
            .collect()
    }

    /// Canonical type names present, in discovery order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(ty: &str, value: &str) -> Arc<MetadataInstance> {
        let mut fields = BTreeMap::new();
        fields.insert(VALUE_FIELD.to_string(), MetadataValue::Str(value.to_string()));
        Arc::new(MetadataInstance {
            type_name: ty.to_string(),
            target: InstanceTarget::Nested,
            fields,
        })
    }

    #[test]
    fn grouping_and_queries() {
        let mut c = MetadataCollection::default();
        c.push(instance("A", "1"));
        c.push(instance("B", "2"));
        c.push(instance("A", "3"));

        assert!(c.has("A"));
        assert!(!c.has("C"));
        assert_eq!(c.latest("A").unwrap().value().unwrap().as_str(), Some("3"));
        assert!(c.latest("C").is_none());
        assert_eq!(c.all().len(), 2);
        assert_eq!(c.all_of_type(None).len(), 3);
        assert_eq!(c.all_of_type(Some("A")).len(), 2);
        assert_eq!(c.type_names().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn nested_values_render_as_json() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "tags".to_string(),
            MetadataValue::List(vec![MetadataValue::Int(1), MetadataValue::Null]),
        );
        fields.insert(
            VALUE_FIELD.to_string(),
            MetadataValue::Metadata(instance("Inner", "x")),
        );
        let outer = MetadataInstance {
            type_name: "Outer".to_string(),
            target: InstanceTarget::Nested,
            fields,
        };
        assert_eq!(
            outer.to_json(),
            json!({
                "type": "Outer",
                "fields": {
                    "tags": [1, null],
                    "value": {"type": "Inner", "fields": {"value": "x"}}
                }
            })
        );
    }
}
