//! Resource Registry - Load resource class descriptors from JSON
//!
//! This module loads every resource kind exposed to scripts from embedded
//! JSON files and provides lookup functions for the binding layer.

use super::api::ApiResource;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/common.json"),
    include_str!("../resources/core.json"),
    include_str!("../resources/apps.json"),
];

/// How a field value is presented to scripts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    /// The JSON value as-is
    #[default]
    Raw,
    /// RFC3339 timestamp rendered as a short age (`3d4h`)
    Age,
}

/// Field accessor definition from JSON
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub json_path: String,
    /// Writable fields get a setter; writes only touch the local copy
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub format: FieldFormat,
}

/// Which class of a resource kind carries an action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionTarget {
    Collection,
    Item,
    #[default]
    Both,
}

impl ActionTarget {
    pub fn on_collection(self) -> bool {
        matches!(self, Self::Collection | Self::Both)
    }

    pub fn on_item(self) -> bool {
        matches!(self, Self::Item | Self::Both)
    }
}

/// Action definition from JSON.
///
/// An action delegates to another class: it allocates an instance of
/// `delegate`, seeds it from the caller and drives its `get` method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionDef {
    pub key: String,
    pub delegate: String,
    #[serde(default)]
    pub on: ActionTarget,
}

/// Resource class descriptor from JSON
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceClassDescriptor {
    /// Registry key, also the script global (`pods`)
    #[serde(default)]
    pub key: String,
    /// Collection class name (`Pods`)
    pub display_name: String,
    /// Server kind of list responses (`PodList`)
    pub collection_alias: String,
    /// Server kind of items, also the item class name (`Pod`)
    pub item_alias: String,
    pub api: ApiResource,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default = "default_updatable")]
    pub updatable: bool,
}

fn default_updatable() -> bool {
    true
}

impl ResourceClassDescriptor {
    /// Find a field accessor by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn collection_actions(&self) -> impl Iterator<Item = &ActionDef> {
        self.actions.iter().filter(|a| a.on.on_collection())
    }

    pub fn item_actions(&self) -> impl Iterator<Item = &ActionDef> {
        self.actions.iter().filter(|a| a.on.on_item())
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceConfig {
    /// Fields every kind exposes (name, labels, ...)
    #[serde(default)]
    pub common_fields: Vec<FieldDef>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceClassDescriptor>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig::default();

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.common_fields.extend(partial.common_fields);
            final_config.resources.extend(partial.resources);
        }

        let common = final_config.common_fields.clone();
        for (key, descriptor) in final_config.resources.iter_mut() {
            descriptor.key = key.clone();
            merge_common_fields(descriptor, &common);
        }

        final_config
    })
}

/// Prepend common fields the descriptor does not override
fn merge_common_fields(descriptor: &mut ResourceClassDescriptor, common: &[FieldDef]) {
    let mut fields: Vec<FieldDef> = common
        .iter()
        .filter(|c| descriptor.field(&c.name).is_none())
        .cloned()
        .collect();
    fields.append(&mut descriptor.fields);
    descriptor.fields = fields;
}

/// Get a resource descriptor by key
pub fn get_resource(key: &str) -> Option<&'static ResourceClassDescriptor> {
    get_registry().resources.get(key)
}

/// Get all resource keys, sorted
pub fn get_all_resource_keys() -> Vec<&'static str> {
    get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect()
}

/// All descriptors, sorted by key
pub fn all_descriptors() -> impl Iterator<Item = &'static ResourceClassDescriptor> {
    get_registry().resources.values()
}
