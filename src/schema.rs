//! Declarative attribute schema for the virtual cluster resource.
//!
//! The schema mirrors what the hosting engine sees: every attribute has a
//! type, required/optional/computed flags, and singleton nested blocks are
//! lists with `max_items = 1`. [`Block::validate`] checks a configuration
//! tree against it and reports every violation with its attribute path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::types::CONTAINER_PROVIDER_TYPE_VALUES;

/// Allowed characters of a virtual cluster name.
pub const NAME_PATTERN: &str = r"[.\-_/#A-Za-z0-9]+";

static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{NAME_PATTERN}$")).expect("name pattern is a valid regex")
});

static VIRTUAL_CLUSTER_SCHEMA: LazyLock<Block> = LazyLock::new(build_virtual_cluster_schema);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    List,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Validator {
    StringMatch {
        pattern: &'static str,
        #[serde(skip)]
        regex: &'static LazyLock<Regex>,
    },
    StringInSlice {
        values: &'static [&'static str],
    },
}

impl Validator {
    pub fn check(&self, value: &str) -> Result<(), String> {
        match self {
            Validator::StringMatch { pattern, regex } => {
                if regex.is_match(value) {
                    Ok(())
                } else {
                    Err(format!("invalid value {value:?}, must match {pattern}"))
                }
            }
            Validator::StringInSlice { values } => {
                if values.iter().any(|allowed| *allowed == value) {
                    Ok(())
                } else {
                    Err(format!(
                        "expected one of [{}], got {value:?}",
                        values.join(", ")
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub force_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elem: Option<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate: Option<Validator>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Attribute {
    fn string() -> Self {
        Self {
            attr_type: AttributeType::String,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            max_items: None,
            elem: None,
            validate: None,
        }
    }

    pub fn computed_string() -> Self {
        Self {
            computed: true,
            ..Self::string()
        }
    }

    pub fn required_string() -> Self {
        Self {
            required: true,
            ..Self::string()
        }
    }

    pub fn optional_string() -> Self {
        Self {
            optional: true,
            ..Self::string()
        }
    }

    /// A required singleton nested block.
    pub fn required_block(elem: Block) -> Self {
        Self {
            attr_type: AttributeType::List,
            required: true,
            max_items: Some(1),
            elem: Some(elem),
            ..Self::string()
        }
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    fn validate_value(&self, path: &str, value: &Value, errors: &mut Vec<ValidationError>) {
        match self.attr_type {
            AttributeType::String => match value.as_str() {
                None => errors.push(ValidationError::new(path, "expected a string")),
                Some(s) => {
                    if let Some(Err(message)) = self.validate.as_ref().map(|v| v.check(s)) {
                        errors.push(ValidationError::new(path, message));
                    }
                }
            },
            AttributeType::List => {
                let Some(items) = value.as_array() else {
                    errors.push(ValidationError::new(path, "expected a list of blocks"));
                    return;
                };

                if self.required && items.is_empty() {
                    errors.push(ValidationError::new(path, "at least 1 block is required"));
                }
                if let Some(max) = self.max_items {
                    if items.len() > max {
                        errors.push(ValidationError::new(
                            path,
                            format!("at most {max} block(s) allowed, got {}", items.len()),
                        ));
                    }
                }

                let Some(elem) = &self.elem else { return };
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}.{i}");
                    match item.as_object() {
                        Some(block) => elem.validate_into(&item_path, block, errors),
                        None => errors.push(ValidationError::new(&item_path, "expected a block")),
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Block {
    pub attributes: BTreeMap<&'static str, Attribute>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    /// Validate a configuration tree, returning every violation found.
    pub fn validate(&self, config: &Map<String, Value>) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        self.validate_into("", config, &mut errors);
        errors
    }

    fn validate_into(&self, prefix: &str, config: &Map<String, Value>, errors: &mut Vec<ValidationError>) {
        for key in config.keys() {
            if !self.attributes.contains_key(key.as_str()) {
                errors.push(ValidationError::new(
                    &join_path(prefix, key),
                    "unsupported argument",
                ));
            }
        }

        for (name, attribute) in &self.attributes {
            let path = join_path(prefix, name);
            match config.get(*name).filter(|v| !v.is_null()) {
                None if attribute.required => {
                    errors.push(ValidationError::new(&path, "required attribute is missing"))
                }
                None => {}
                Some(_) if attribute.computed && !attribute.optional => errors.push(
                    ValidationError::new(&path, "value for computed-only attribute cannot be set"),
                ),
                Some(value) => attribute.validate_value(&path, value, errors),
            }
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Whether `name` is an acceptable virtual cluster name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

/// Attribute schema of the virtual cluster resource.
pub fn virtual_cluster_schema() -> &'static Block {
    &VIRTUAL_CLUSTER_SCHEMA
}

fn build_virtual_cluster_schema() -> Block {
    // info and eks_info are optional in the API, but it rejects requests without them
    let eks_info = Block::new().with_attribute("namespace", Attribute::optional_string().force_new());
    let info = Block::new().with_attribute("eks_info", Attribute::required_block(eks_info).force_new());
    let container_provider = Block::new()
        .with_attribute("id", Attribute::required_string().force_new())
        .with_attribute("info", Attribute::required_block(info).force_new())
        .with_attribute(
            "type",
            Attribute::required_string()
                .force_new()
                .with_validator(Validator::StringInSlice {
                    values: CONTAINER_PROVIDER_TYPE_VALUES,
                }),
        );

    Block::new()
        .with_attribute("arn", Attribute::computed_string())
        .with_attribute(
            "container_provider",
            Attribute::required_block(container_provider).force_new(),
        )
        .with_attribute("created_at", Attribute::computed_string())
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string()
                .force_new()
                .with_validator(Validator::StringMatch {
                    pattern: NAME_PATTERN,
                    regex: &NAME_REGEX,
                }),
        )
        .with_attribute("state", Attribute::computed_string())
}
