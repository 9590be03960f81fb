//! Binding runtime
//!
//! Owns the class table, the resource API and one [`ResourceBinding`] per
//! kind. Every script call on a [`ScriptObject`] ends up in
//! [`Runtime::invoke`].

use super::class::{Arity, Callback, CallContext, ClassRegistry};
use super::delegate;
use super::generator::ResourceBinding;
use super::object::{CollectionVars, ScriptObject, Vars};
use crate::error::{BindingError, BindingResult};
use crate::resource::{all_descriptors, ResourceApi};
use rhai::{Dynamic, NativeCallContext};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub struct Runtime {
    classes: ClassRegistry,
    api: Rc<dyn ResourceApi>,
    bindings: BTreeMap<String, Rc<ResourceBinding>>,
    /// Scope used by `get` when none is given
    namespace: RefCell<String>,
}

impl Runtime {
    /// Runtime with every kind from the resource registry
    pub fn new(api: Rc<dyn ResourceApi>, namespace: impl Into<String>) -> Self {
        let bindings = all_descriptors().map(ResourceBinding::standard).collect();
        Self::with_bindings(api, namespace, bindings)
    }

    pub fn with_bindings(
        api: Rc<dyn ResourceApi>,
        namespace: impl Into<String>,
        bindings: Vec<ResourceBinding>,
    ) -> Self {
        let mut classes = ClassRegistry::new();
        classes.register(delegate::log_stream_class());

        let mut by_key = BTreeMap::new();
        for binding in bindings {
            let binding = Rc::new(binding);
            classes.register(binding.collection_class());
            classes.register(binding.item_class());
            by_key.insert(binding.descriptor.key.clone(), binding);
        }

        Self {
            classes,
            api,
            bindings: by_key,
            namespace: RefCell::new(namespace.into()),
        }
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn api(&self) -> &dyn ResourceApi {
        self.api.as_ref()
    }

    pub fn namespace(&self) -> String {
        self.namespace.borrow().clone()
    }

    pub fn set_namespace(&self, namespace: &str) {
        tracing::info!("Default namespace set to {}", namespace);
        *self.namespace.borrow_mut() = namespace.to_string();
    }

    pub fn binding(&self, key: &str) -> BindingResult<&Rc<ResourceBinding>> {
        self.bindings
            .get(key)
            .ok_or_else(|| BindingError::UnknownClass(key.to_string()))
    }

    /// Registry keys of every bound kind, sorted
    pub fn resource_keys(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    /// Allocate an instance of any registered class
    pub fn instantiate(&self, class: &str, vars: Vars) -> BindingResult<ScriptObject> {
        self.classes.instantiate(class, vars)
    }

    /// A new, unfetched collection of `key`
    pub fn new_collection(&self, key: &str) -> BindingResult<ScriptObject> {
        let binding = self.binding(key)?;
        self.instantiate(
            &binding.descriptor.display_name,
            Vars::Collection(CollectionVars::default()),
        )
    }

    /// Dispatch an instance method on `receiver`
    pub fn invoke(
        &self,
        native: Option<&NativeCallContext<'_>>,
        receiver: &ScriptObject,
        method: &str,
        args: &[Dynamic],
    ) -> BindingResult<Dynamic> {
        let class = self.classes.get(receiver.class_name())?;
        let no_method = || BindingError::NoMethod {
            class: class.name.clone(),
            method: method.to_string(),
        };
        let found = class.get(method).ok_or_else(no_method)?;
        let Callback::Instance(f) = &found.callback else {
            return Err(no_method());
        };
        check_arity(&found.arity, &class.name, method, args.len())?;

        tracing::trace!("{}.{} ({} args)", class.name, method, args.len());
        let ctx = CallContext {
            runtime: self,
            native,
        };
        f(&ctx, receiver, args)
    }

    /// Dispatch a class method (`Pods::fetch(...)`)
    pub fn invoke_class(
        &self,
        native: Option<&NativeCallContext<'_>>,
        class: &str,
        method: &str,
        args: &[Dynamic],
    ) -> BindingResult<Dynamic> {
        let class = self.classes.get(class)?;
        let no_method = || BindingError::NoMethod {
            class: class.name.clone(),
            method: method.to_string(),
        };
        let found = class.get(method).ok_or_else(no_method)?;
        let Callback::Class(f) = &found.callback else {
            return Err(no_method());
        };

        check_arity(&found.arity, &class.name, method, args.len())?;

        let ctx = CallContext {
            runtime: self,
            native,
        };
        f(&ctx, args)
    }
}

fn check_arity(arity: &Arity, class: &str, method: &str, given: usize) -> BindingResult<()> {
    if arity.accepts(given) {
        return Ok(());
    }
    Err(BindingError::Arity {
        class: class.to_string(),
        method: method.to_string(),
        given,
        expected: arity.to_string(),
    })
}
