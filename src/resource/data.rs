use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Local record of one managed resource: its id plus the attribute tree
/// handed over by the engine. The remote service stays the source of truth;
/// this is only a projection of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(skip)]
    is_new_resource: bool,
}

impl ResourceData {
    /// Record built from a configuration tree (no id yet).
    pub fn from_config(attributes: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            attributes,
            is_new_resource: false,
        }
    }

    /// Record holding only an id, as produced by a pass-through import.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Assign the id. An empty id means "remove from tracked state".
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn is_tracked(&self) -> bool {
        !self.id.is_empty()
    }

    /// True while the record is being created in the current operation.
    pub fn is_new_resource(&self) -> bool {
        self.is_new_resource
    }

    pub fn mark_new_resource(&mut self) {
        self.is_new_resource = true;
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Nested block list; absent or non-list values read as empty.
    pub fn get_list(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// State as the engine stores it: the attributes plus `id`.
    pub fn to_state(&self) -> Value {
        let mut state = self.attributes.clone();
        state.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(state)
    }
}
