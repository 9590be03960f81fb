//! Resource binding generator
//!
//! One [`ResourceBinding`] per kind: a descriptor plus two callbacks
//! (fetch a list, project one item). From those it builds the kind's
//! collection class (`Pods`) and item class (`Pod`). Nothing here is
//! specific to a kind; per-kind behavior comes from the descriptor.

use super::bridge::{expect_int, expect_string, from_script, to_script};
use super::class::{Arity, CallContext, ClassDef};
use super::delegate;
use super::object::{CollectionVars, ItemOrigin, ItemVars, ScriptObject, Vars};
use crate::error::{BindingError, BindingResult};
use crate::resource::{
    assign_path, fetch_items, format_age, lookup_path, FieldDef, FieldFormat, ItemIdentity,
    ListOptions, ResourceApi, ResourceClassDescriptor,
};
use rhai::{Array, Dynamic, FnPtr, Map};
use serde_json::Value;
use std::rc::Rc;

/// `fetchList(scope, options)`
pub type FetchFn = Rc<
    dyn Fn(&dyn ResourceApi, &ResourceClassDescriptor, &str, &ListOptions) -> anyhow::Result<Vec<Value>>,
>;

/// `projectItem(collection, index)`
pub type ProjectFn =
    Rc<dyn Fn(&ResourceClassDescriptor, &CollectionVars, usize) -> BindingResult<ItemVars>>;

pub struct ResourceBinding {
    pub descriptor: &'static ResourceClassDescriptor,
    fetch: FetchFn,
    project: ProjectFn,
}

impl ResourceBinding {
    pub fn new(
        descriptor: &'static ResourceClassDescriptor,
        fetch: FetchFn,
        project: ProjectFn,
    ) -> Self {
        Self {
            descriptor,
            fetch,
            project,
        }
    }

    /// Binding that lists through the API and projects by index
    pub fn standard(descriptor: &'static ResourceClassDescriptor) -> Self {
        Self::new(
            descriptor,
            Rc::new(fetch_items),
            Rc::new(project_by_index),
        )
    }

    pub fn fetch(
        &self,
        api: &dyn ResourceApi,
        scope: &str,
        options: &ListOptions,
    ) -> BindingResult<Vec<Value>> {
        Ok((self.fetch)(api, self.descriptor, scope, options)?)
    }

    pub fn project(&self, collection: &CollectionVars, index: usize) -> BindingResult<ItemVars> {
        (self.project)(self.descriptor, collection, index)
    }

    fn collection_name(&self) -> &str {
        &self.descriptor.display_name
    }

    fn item_name(&self) -> &str {
        &self.descriptor.item_alias
    }

    /// Allocate a fresh item instance for `index`
    fn item_instance(
        &self,
        ctx: &CallContext<'_, '_>,
        collection: &CollectionVars,
        index: usize,
    ) -> BindingResult<ScriptObject> {
        let item = self.project(collection, index)?;
        ctx.runtime.instantiate(self.item_name(), Vars::Item(item))
    }

    /// Fetch and swap the receiver's contents; untouched on failure
    fn refresh(
        &self,
        ctx: &CallContext<'_, '_>,
        receiver: &ScriptObject,
        scope: String,
        options: &ListOptions,
    ) -> BindingResult<Dynamic> {
        let items = self.fetch(ctx.runtime.api(), &scope, options)?;
        tracing::debug!(
            "{} now holds {} items from {:?}",
            self.collection_name(),
            items.len(),
            scope
        );
        receiver.replace_vars(Vars::Collection(CollectionVars {
            scope: Some(scope),
            items,
        }));
        Ok(Dynamic::from(receiver.clone()))
    }

    /// Build the collection class (`Pods`)
    pub fn collection_class(self: &Rc<Self>) -> ClassDef {
        let mut class = ClassDef::new(self.collection_name());

        let this = self.clone();
        class.method("get", Arity::up_to(2), move |ctx, obj, args| {
            obj.with_collection("get", |_| Ok(()))?;
            let (scope, options) = parse_get_args(args)?;
            let scope = scope.unwrap_or_else(|| ctx.runtime.namespace());
            this.refresh(ctx, obj, scope, &options)
        });

        let this = self.clone();
        class.method("update", Arity::up_to(2), move |ctx, obj, args| {
            let previous = obj.with_collection("update", |c| Ok(c.scope.clone()))?;
            let (scope, options) = parse_get_args(args)?;
            let scope = scope
                .or(previous)
                .unwrap_or_else(|| ctx.runtime.namespace());
            this.refresh(ctx, obj, scope, &options)
        });

        let this = self.clone();
        class.method("each", Arity::exactly(1), move |ctx, obj, args| {
            let callback = args[0].clone().try_cast::<FnPtr>().ok_or_else(|| {
                BindingError::InvalidArgument(format!(
                    "{}.each expects a function, got {}",
                    this.collection_name(),
                    args[0].type_name()
                ))
            })?;
            let native = ctx.native.ok_or_else(|| {
                BindingError::InvalidArgument("each can only be called from a script".to_string())
            })?;

            // Iterate a snapshot; the callback may refresh the collection
            let collection = obj.collection("each")?;
            for index in 0..collection.items.len() {
                let item = this.item_instance(ctx, &collection, index)?;
                callback.call_within_context::<Dynamic>(native, (Dynamic::from(item),))?;
            }
            Ok(Dynamic::from(obj.clone()))
        });

        let this = self.clone();
        class.indexer(move |ctx, obj, key| {
            let item = obj.with_collection("[]", |collection| {
                let index = if key.is_string() {
                    let name = expect_string(key, "index")?;
                    collection
                        .items
                        .iter()
                        .position(|item| item_name(item) == Some(name.as_str()))
                        .ok_or_else(|| {
                            BindingError::NotFound(format!("{} \"{}\"", this.item_name(), name))
                        })?
                } else {
                    let index = expect_int(key, "index")?;
                    let length = collection.items.len();
                    if index < 0 || index as usize >= length {
                        return Err(BindingError::IndexOutOfRange {
                            class: this.collection_name().to_string(),
                            index,
                            length,
                        });
                    }
                    index as usize
                };
                this.project(collection, index)
            })?;
            ctx.runtime
                .instantiate(this.item_name(), Vars::Item(item))
                .map(Dynamic::from)
        });

        for name in ["length", "size", "count"] {
            class.property(name, move |_, obj| {
                let length = obj.with_collection(name, |c| Ok(c.items.len()))?;
                Ok(Dynamic::from(length as i64))
            });
        }

        let this = self.clone();
        class.method("to_a", Arity::NONE, move |ctx, obj, _| {
            let projected = obj.with_collection("to_a", |collection| {
                (0..collection.items.len())
                    .map(|index| this.project(collection, index))
                    .collect::<BindingResult<Vec<_>>>()
            })?;
            let mut items = Array::with_capacity(projected.len());
            for item in projected {
                let instance = ctx.runtime.instantiate(this.item_name(), Vars::Item(item))?;
                items.push(Dynamic::from(instance));
            }
            Ok(items.into())
        });

        class.property("names", |_, obj| {
            obj.with_collection("names", |collection| {
                let names: Array = collection
                    .items
                    .iter()
                    .filter_map(item_name)
                    .map(|name| Dynamic::from(name.to_string()))
                    .collect();
                Ok(names.into())
            })
        });

        class.property("namespace", |_, obj| {
            obj.with_collection("namespace", |c| {
                Ok(match &c.scope {
                    Some(scope) => Dynamic::from(scope.clone()),
                    None => Dynamic::UNIT,
                })
            })
        });

        let this = self.clone();
        class.property("inspect", move |_, obj| {
            obj.with_collection("inspect", |collection| {
                let text = match &collection.scope {
                    Some(scope) => format!(
                        "#<{} namespace=\"{}\" items={}>",
                        this.collection_name(),
                        scope,
                        collection.items.len()
                    ),
                    None => format!("#<{} (not fetched)>", this.collection_name()),
                };
                Ok(Dynamic::from(text))
            })
        });

        for action in self.descriptor.collection_actions() {
            let action = action.clone();
            class.method(&action.key.clone(), Arity::up_to(1), move |ctx, obj, args| {
                let pods = obj.collection(&action.key)?.items;
                delegate::run_action(ctx, &action, pods, args.first())
            });
        }

        // `Pods::fetch(scope, options)`: a new collection, independent of the global
        let this = self.clone();
        class.class_method("fetch", Arity::up_to(2), move |ctx, args| {
            let (scope, options) = parse_get_args(args)?;
            let scope = scope.unwrap_or_else(|| ctx.runtime.namespace());
            let fresh = ctx.runtime.instantiate(
                this.collection_name(),
                Vars::Collection(CollectionVars::default()),
            )?;
            this.refresh(ctx, &fresh, scope, &options)
        });

        class
    }

    /// Build the item class (`Pod`)
    pub fn item_class(self: &Rc<Self>) -> ClassDef {
        let mut class = ClassDef::new(self.item_name());

        for field in &self.descriptor.fields {
            let getter = field.clone();
            class.property(&field.name, move |_, obj| {
                let item = obj.item(&getter.name)?;
                read_field(&getter, &item.raw)
            });

            if field.writable {
                let setter = field.clone();
                class.setter(&field.name, move |_, obj, value| {
                    let value = from_script(&value)?;
                    obj.with_item_mut(&setter.name, |item| {
                        Ok(assign_path(&mut item.raw, &setter.json_path, value)?)
                    })
                });
            }
        }

        if self.descriptor.updatable {
            let this = self.clone();
            class.method("update", Arity::NONE, move |ctx, obj, _| {
                let current = obj.item("update")?;
                let identity = current.identity().ok_or_else(|| {
                    BindingError::InvalidArgument(format!(
                        "{} has no metadata.name to refresh by",
                        this.item_name()
                    ))
                })?;
                let scope = if identity.namespace.is_empty() {
                    current.origin.scope.clone()
                } else {
                    identity.namespace.clone()
                };

                let items = this.fetch(
                    ctx.runtime.api(),
                    &scope,
                    &ListOptions::by_name(&identity.name),
                )?;
                let raw = items
                    .into_iter()
                    .find(|item| ItemIdentity::from_item(item).as_ref() == Some(&identity))
                    .ok_or_else(|| {
                        BindingError::NotFound(format!("{} {}", this.item_name(), identity))
                    })?;

                // Swap the slot only; the script handle stays the same
                obj.replace_vars(Vars::Item(ItemVars {
                    raw,
                    origin: current.origin,
                }));
                Ok(Dynamic::from(obj.clone()))
            });
        }

        class.property("to_h", |_, obj| to_script(&obj.item("to_h")?.raw));

        class.property("to_json", |_, obj| {
            let item = obj.item("to_json")?;
            serde_json::to_string_pretty(&item.raw)
                .map(Dynamic::from)
                .map_err(|e| BindingError::InvalidArgument(e.to_string()))
        });

        let this = self.clone();
        class.property("inspect", move |_, obj| {
            let item = obj.item("inspect")?;
            let label = item
                .identity()
                .map(|identity| identity.to_string())
                .unwrap_or_else(|| format!("#{}", item.origin.index));
            Ok(Dynamic::from(format!("#<{} {}>", this.item_name(), label)))
        });

        for action in self.descriptor.item_actions() {
            let action = action.clone();
            class.method(&action.key.clone(), Arity::up_to(1), move |ctx, obj, args| {
                let pod = obj.item(&action.key)?.raw;
                delegate::run_action(ctx, &action, vec![pod], args.first())
            });
        }

        class
    }
}

/// Copy item `index` out of the collection
fn project_by_index(
    descriptor: &ResourceClassDescriptor,
    collection: &CollectionVars,
    index: usize,
) -> BindingResult<ItemVars> {
    let raw = collection
        .items
        .get(index)
        .cloned()
        .ok_or_else(|| BindingError::IndexOutOfRange {
            class: descriptor.display_name.clone(),
            index: index as i64,
            length: collection.items.len(),
        })?;
    Ok(ItemVars {
        raw,
        origin: ItemOrigin {
            kind: descriptor.key.clone(),
            scope: collection.scope.clone().unwrap_or_default(),
            index,
        },
    })
}

fn item_name(item: &Value) -> Option<&str> {
    lookup_path(item, "metadata.name").and_then(|v| v.as_str())
}

fn read_field(field: &FieldDef, raw: &Value) -> BindingResult<Dynamic> {
    let Some(value) = lookup_path(raw, &field.json_path) else {
        return Ok(Dynamic::UNIT);
    };
    match field.format {
        FieldFormat::Raw => to_script(value),
        FieldFormat::Age => Ok(value
            .as_str()
            .and_then(|ts| format_age(ts, chrono::Utc::now()))
            .map(Dynamic::from)
            .unwrap_or(Dynamic::UNIT)),
    }
}

/// `get([scope], [options])`: a scope string and/or an options map
fn parse_get_args(args: &[Dynamic]) -> BindingResult<(Option<String>, ListOptions)> {
    let mut scope = None;
    let mut options = ListOptions::default();

    for arg in args {
        if arg.is_string() {
            if scope.is_some() {
                return Err(BindingError::InvalidArgument(
                    "scope given more than once".to_string(),
                ));
            }
            scope = Some(expect_string(arg, "scope")?);
        } else if let Some(map) = arg.clone().try_cast::<Map>() {
            options = parse_list_options(&map)?;
        } else if arg.is_unit() {
            continue;
        } else {
            return Err(BindingError::InvalidArgument(format!(
                "expected a namespace string or an options map, got {}",
                arg.type_name()
            )));
        }
    }

    Ok((scope, options))
}

fn parse_list_options(map: &Map) -> BindingResult<ListOptions> {
    let mut options = ListOptions::default();
    for (key, value) in map {
        match key.as_str() {
            "label_selector" | "labels" => {
                options.label_selector = Some(selector(value, key)?);
            }
            "field_selector" | "fields" => {
                options.field_selector = Some(selector(value, key)?);
            }
            "limit" => {
                let limit = expect_int(value, "limit")?;
                let limit = u32::try_from(limit)
                    .ok()
                    .filter(|l| *l > 0)
                    .ok_or_else(|| {
                        BindingError::InvalidArgument(format!(
                            "limit must be a positive integer, got {}",
                            limit
                        ))
                    })?;
                options.limit = Some(limit);
            }
            other => {
                return Err(BindingError::InvalidArgument(format!(
                    "unknown list option '{}'",
                    other
                )))
            }
        }
    }
    Ok(options)
}

/// A selector is either a string (`app=web,tier!=db`) or a map of equalities
fn selector(value: &Dynamic, what: &str) -> BindingResult<String> {
    if value.is_string() {
        return expect_string(value, what);
    }
    let Some(map) = value.clone().try_cast::<Map>() else {
        return Err(BindingError::InvalidArgument(format!(
            "{} must be a string or a map, got {}",
            what,
            value.type_name()
        )));
    };
    let pairs = map
        .iter()
        .map(|(k, v)| Ok(format!("{}={}", k, selector_value(v, what)?)))
        .collect::<BindingResult<Vec<_>>>()?;
    Ok(pairs.join(","))
}

fn selector_value(value: &Dynamic, what: &str) -> BindingResult<String> {
    if value.is_string() {
        expect_string(value, what)
    } else if value.is_int() || value.is_bool() {
        Ok(value.to_string())
    } else {
        Err(BindingError::InvalidArgument(format!(
            "{} values must be strings, got {}",
            what,
            value.type_name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Runtime;
    use crate::resource::get_resource;
    use crate::test_utils::{pod, MockApi};
    use rhai::ImmutableString;

    fn runtime(api: Rc<MockApi>) -> Runtime {
        Runtime::new(api, "default")
    }

    fn s(text: &str) -> Dynamic {
        Dynamic::from(text.to_string())
    }

    #[test]
    fn test_get_replaces_items_and_returns_self() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web"), pod("default", "db")]);
        let rt = runtime(api.clone());

        let pods = rt.new_collection("pods").unwrap();
        let result = rt.invoke(None, &pods, "get", &[s("default")]).unwrap();
        let returned = result.try_cast::<ScriptObject>().unwrap();

        assert!(returned.same_instance(&pods));
        assert_eq!(pods.collection("t").unwrap().items.len(), 2);
        assert_eq!(api.list_calls()[0].scope, "default");
    }

    #[test]
    fn test_failed_get_leaves_previous_items() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web")]);
        api.push_error("connection refused");
        let rt = runtime(api.clone());

        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[]).unwrap();
        let err = rt.invoke(None, &pods, "get", &[s("other")]).unwrap_err();

        assert!(err.to_string().contains("connection refused"));
        let collection = pods.collection("t").unwrap();
        assert_eq!(collection.items.len(), 1);
        assert_eq!(collection.scope.as_deref(), Some("default"));
    }

    #[test]
    fn test_get_defaults_to_runtime_namespace() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![]);
        let rt = runtime(api.clone());
        rt.set_namespace("kube-system");

        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[]).unwrap();
        assert_eq!(api.list_calls()[0].scope, "kube-system");
    }

    #[test]
    fn test_update_scope() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web")]);
        api.push_list(vec![pod("default", "web")]);
        api.push_list(vec![pod("kube-system", "dns"), pod("kube-system", "proxy")]);
        let rt = runtime(api.clone());
        rt.set_namespace("prod");

        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[s("default")]).unwrap();

        // Without a scope the previous one is reused, not the runtime default
        rt.invoke(None, &pods, "update", &[]).unwrap();
        rt.invoke(None, &pods, "update", &[s("kube-system")]).unwrap();

        let scopes: Vec<String> = api.list_calls().into_iter().map(|c| c.scope).collect();
        assert_eq!(scopes, vec!["default", "default", "kube-system"]);

        let collection = pods.collection("t").unwrap();
        assert_eq!(collection.scope.as_deref(), Some("kube-system"));
        assert_eq!(collection.items.len(), 2);
    }

    #[test]
    fn test_update_before_get_uses_runtime_namespace() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![]);
        let rt = runtime(api.clone());
        rt.set_namespace("prod");

        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "update", &[]).unwrap();
        assert_eq!(api.list_calls()[0].scope, "prod");
    }

    #[test]
    fn test_get_options() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![]);
        let rt = runtime(api.clone());

        let mut labels = Map::new();
        labels.insert("app".into(), s("web"));
        let mut options = Map::new();
        options.insert("labels".into(), Dynamic::from(labels));
        options.insert("limit".into(), Dynamic::from(10_i64));

        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[s("prod"), Dynamic::from(options)])
            .unwrap();

        let call = &api.list_calls()[0];
        assert_eq!(call.scope, "prod");
        assert_eq!(call.options.label_selector.as_deref(), Some("app=web"));
        assert_eq!(call.options.limit, Some(10));
    }

    #[test]
    fn test_get_rejects_bad_arguments() {
        let rt = runtime(Rc::new(MockApi::new()));
        let pods = rt.new_collection("pods").unwrap();

        let err = rt
            .invoke(None, &pods, "get", &[Dynamic::from(3_i64)])
            .unwrap_err();
        assert!(matches!(err, BindingError::InvalidArgument(_)));

        let mut options = Map::new();
        options.insert("bogus".into(), Dynamic::TRUE);
        let err = rt
            .invoke(None, &pods, "get", &[Dynamic::from(options)])
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown list option 'bogus'");
    }

    #[test]
    fn test_index_out_of_range() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web")]);
        let rt = runtime(api);
        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[]).unwrap();

        for index in [1_i64, -1] {
            let err = rt
                .invoke(None, &pods, "[]", &[Dynamic::from(index)])
                .unwrap_err();
            assert!(matches!(err, BindingError::IndexOutOfRange { .. }));
        }
        assert_eq!(pods.collection("t").unwrap().items.len(), 1);
    }

    #[test]
    fn test_index_yields_distinct_instances() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web")]);
        let rt = runtime(api);
        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[]).unwrap();

        let first = rt.invoke(None, &pods, "[]", &[Dynamic::from(0_i64)]).unwrap();
        let second = rt.invoke(None, &pods, "[]", &[Dynamic::from(0_i64)]).unwrap();
        let first = first.try_cast::<ScriptObject>().unwrap();
        let second = second.try_cast::<ScriptObject>().unwrap();

        assert_eq!(first.class_name(), "Pod");
        assert!(!first.same_instance(&second));
        assert_eq!(first.item("t").unwrap(), second.item("t").unwrap());
    }

    #[test]
    fn test_index_by_name() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web"), pod("default", "db")]);
        let rt = runtime(api);
        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[]).unwrap();

        let db = rt
            .invoke(None, &pods, "[]", &[Dynamic::from(ImmutableString::from("db"))])
            .unwrap()
            .try_cast::<ScriptObject>()
            .unwrap();
        assert_eq!(db.item("t").unwrap().origin.index, 1);

        let err = rt.invoke(None, &pods, "[]", &[s("cache")]).unwrap_err();
        assert_eq!(err.to_string(), "Pod \"cache\" not found");
    }

    #[test]
    fn test_length_does_not_fetch() {
        let api = Rc::new(MockApi::new());
        let rt = runtime(api.clone());
        let pods = rt.new_collection("pods").unwrap();

        let length = rt.invoke(None, &pods, "length", &[]).unwrap();
        assert_eq!(length.as_int().unwrap(), 0);
        assert!(api.list_calls().is_empty());
    }

    #[test]
    fn test_fields_and_setters() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web")]);
        let rt = runtime(api);
        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[]).unwrap();
        let web = rt
            .invoke(None, &pods, "[]", &[Dynamic::from(0_i64)])
            .unwrap()
            .try_cast::<ScriptObject>()
            .unwrap();

        let name = rt.invoke(None, &web, "name", &[]).unwrap();
        assert_eq!(name.into_string().unwrap(), "web");
        let phase = rt.invoke(None, &web, "phase", &[]).unwrap();
        assert_eq!(phase.into_string().unwrap(), "Running");

        let mut labels = Map::new();
        labels.insert("tier".into(), s("frontend"));
        rt.invoke(None, &web, "labels=", &[Dynamic::from(labels)])
            .unwrap();
        assert_eq!(
            web.item("t").unwrap().raw["metadata"]["labels"]["tier"],
            "frontend"
        );
        // The collection keeps its own copy
        assert!(pods.collection("t").unwrap().items[0]["metadata"]
            .get("labels")
            .is_none());

        let err = rt.invoke(None, &web, "phase=", &[s("Failed")]).unwrap_err();
        assert!(matches!(err, BindingError::NoMethod { .. }));
    }

    #[test]
    fn test_item_update_keeps_handle() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web")]);
        let mut refreshed = pod("default", "web");
        refreshed["status"]["phase"] = "Succeeded".into();
        api.push_list(vec![refreshed]);
        let rt = runtime(api.clone());

        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[]).unwrap();
        let web = rt
            .invoke(None, &pods, "[]", &[Dynamic::from(0_i64)])
            .unwrap()
            .try_cast::<ScriptObject>()
            .unwrap();

        let returned = rt
            .invoke(None, &web, "update", &[])
            .unwrap()
            .try_cast::<ScriptObject>()
            .unwrap();
        assert!(returned.same_instance(&web));
        assert_eq!(web.item("t").unwrap().raw["status"]["phase"], "Succeeded");

        let call = &api.list_calls()[1];
        assert_eq!(
            call.options.field_selector.as_deref(),
            Some("metadata.name=web")
        );
    }

    #[test]
    fn test_item_update_not_found() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web")]);
        api.push_list(vec![]);
        let rt = runtime(api);

        let pods = rt.new_collection("pods").unwrap();
        rt.invoke(None, &pods, "get", &[]).unwrap();
        let web = rt
            .invoke(None, &pods, "[]", &[Dynamic::from(0_i64)])
            .unwrap()
            .try_cast::<ScriptObject>()
            .unwrap();

        let before = web.item("t").unwrap();
        let err = rt.invoke(None, &web, "update", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Pod default/web not found");
        assert_eq!(web.item("t").unwrap(), before);
    }

    #[test]
    fn test_inspect() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("default", "web")]);
        let rt = runtime(api);
        let pods = rt.new_collection("pods").unwrap();

        let text = rt.invoke(None, &pods, "inspect", &[]).unwrap();
        assert_eq!(text.into_string().unwrap(), "#<Pods (not fetched)>");

        rt.invoke(None, &pods, "get", &[]).unwrap();
        let text = rt.invoke(None, &pods, "inspect", &[]).unwrap();
        assert_eq!(
            text.into_string().unwrap(),
            "#<Pods namespace=\"default\" items=1>"
        );

        let web = rt
            .invoke(None, &pods, "[]", &[Dynamic::from(0_i64)])
            .unwrap()
            .try_cast::<ScriptObject>()
            .unwrap();
        let text = rt.invoke(None, &web, "inspect", &[]).unwrap();
        assert_eq!(text.into_string().unwrap(), "#<Pod default/web>");
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let api = Rc::new(MockApi::new());
        api.push_typed_list("ServiceList", vec![]);
        let rt = runtime(api);
        let pods = rt.new_collection("pods").unwrap();

        let err = rt.invoke(None, &pods, "get", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Expected PodList from the API, got ServiceList");
    }

    #[test]
    fn test_class_fetch_allocates_new_collection() {
        let api = Rc::new(MockApi::new());
        api.push_list(vec![pod("kube-system", "dns")]);
        let rt = runtime(api);

        let fetched = rt
            .invoke_class(None, "Pods", "fetch", &[s("kube-system")])
            .unwrap()
            .try_cast::<ScriptObject>()
            .unwrap();
        assert_eq!(fetched.class_name(), "Pods");
        assert_eq!(
            fetched.collection("t").unwrap().scope.as_deref(),
            Some("kube-system")
        );

        let err = rt.invoke(None, &fetched, "fetch", &[]).unwrap_err();
        assert!(matches!(err, BindingError::NoMethod { .. }));
    }

    #[test]
    fn test_custom_callbacks() {
        let descriptor = get_resource("configmaps").unwrap();
        let binding = ResourceBinding::new(
            descriptor,
            Rc::new(|_, _, scope, _| {
                Ok(vec![serde_json::json!({
                    "metadata": {"name": format!("cm-{}", scope), "namespace": scope}
                })])
            }),
            Rc::new(project_by_index),
        );
        let rt = Runtime::with_bindings(Rc::new(MockApi::new()), "default", vec![binding]);

        let maps = rt.new_collection("configmaps").unwrap();
        rt.invoke(None, &maps, "get", &[s("prod")]).unwrap();
        let names = rt.invoke(None, &maps, "names", &[]).unwrap();
        let names: Vec<String> = names
            .into_array()
            .unwrap()
            .into_iter()
            .map(|n| n.into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["cm-prod"]);
        assert!(rt.new_collection("pods").is_err());
    }

    #[test]
    fn test_wrong_arity() {
        let rt = runtime(Rc::new(MockApi::new()));
        let pods = rt.new_collection("pods").unwrap();
        let err = rt
            .invoke(None, &pods, "each", &[])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "wrong number of arguments for Pods.each (given 0, expected 1)"
        );
    }
}
