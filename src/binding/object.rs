//! Script-visible objects
//!
//! Every object handed to the engine is a [`ScriptObject`]: a class name
//! plus a shared slot of [`Vars`]. Cloning the handle shares the slot (the
//! same script object); allocating a new object never does.

use crate::error::{BindingError, BindingResult};
use crate::resource::{ItemIdentity, LogOptions};
use serde_json::Value;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Last fetched contents of a collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionVars {
    /// Scope of the last successful fetch, `None` until the first one
    pub scope: Option<String>,
    pub items: Vec<Value>,
}

/// Where an item was projected from.
///
/// A plain lookup key, not a reference: the item stays valid whatever
/// happens to the collection afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOrigin {
    /// Registry key of the resource kind (`pods`)
    pub kind: String,
    pub scope: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemVars {
    /// Value copy of the item as last fetched
    pub raw: Value,
    pub origin: ItemOrigin,
}

impl ItemVars {
    pub fn identity(&self) -> Option<ItemIdentity> {
        ItemIdentity::from_item(&self.raw)
    }
}

/// Working data of a log stream: the pods to read from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogStreamVars {
    pub pods: Vec<Value>,
    pub options: LogOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Vars {
    Collection(CollectionVars),
    Item(ItemVars),
    LogStream(LogStreamVars),
}

impl Vars {
    fn label(&self) -> &'static str {
        match self {
            Vars::Collection(_) => "collection",
            Vars::Item(_) => "item",
            Vars::LogStream(_) => "log stream",
        }
    }
}

/// Handle to one script-visible instance
#[derive(Debug, Clone)]
pub struct ScriptObject {
    class: Rc<str>,
    vars: Rc<RefCell<Vars>>,
}

impl ScriptObject {
    pub(crate) fn new(class: &str, vars: Vars) -> Self {
        Self {
            class: Rc::from(class),
            vars: Rc::new(RefCell::new(vars)),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// True when both handles point at the same instance
    pub fn same_instance(&self, other: &ScriptObject) -> bool {
        Rc::ptr_eq(&self.vars, &other.vars)
    }

    pub fn vars(&self) -> Ref<'_, Vars> {
        self.vars.borrow()
    }

    /// Swap the whole slot; the handle (script identity) is untouched
    pub fn replace_vars(&self, vars: Vars) -> Vars {
        self.vars.replace(vars)
    }

    fn wrong_receiver(&self, method: &str, expected: &'static str) -> BindingError {
        tracing::debug!(
            "{}.{} expected {} data, found {}",
            self.class,
            method,
            expected,
            self.vars.borrow().label()
        );
        BindingError::WrongReceiver {
            class: self.class.to_string(),
            method: method.to_string(),
            expected,
        }
    }

    /// Snapshot of the collection data
    pub fn collection(&self, method: &str) -> BindingResult<CollectionVars> {
        match &*self.vars.borrow() {
            Vars::Collection(c) => Ok(c.clone()),
            _ => Err(self.wrong_receiver(method, "collection")),
        }
    }

    /// Read the collection data in place.
    ///
    /// The slot stays borrowed while `f` runs, so `f` must not call back
    /// into script code; take a [`ScriptObject::collection`] snapshot for that.
    pub fn with_collection<T>(
        &self,
        method: &str,
        f: impl FnOnce(&CollectionVars) -> BindingResult<T>,
    ) -> BindingResult<T> {
        let vars = self.vars.borrow();
        if let Vars::Collection(collection) = &*vars {
            return f(collection);
        }
        drop(vars);
        Err(self.wrong_receiver(method, "collection"))
    }

    /// Snapshot of the item data
    pub fn item(&self, method: &str) -> BindingResult<ItemVars> {
        match &*self.vars.borrow() {
            Vars::Item(i) => Ok(i.clone()),
            _ => Err(self.wrong_receiver(method, "item")),
        }
    }

    /// Snapshot of the log stream data
    pub fn log_stream(&self, method: &str) -> BindingResult<LogStreamVars> {
        match &*self.vars.borrow() {
            Vars::LogStream(l) => Ok(l.clone()),
            _ => Err(self.wrong_receiver(method, "log stream")),
        }
    }

    /// Mutate the item's raw value in place
    pub fn with_item_mut<T>(
        &self,
        method: &str,
        f: impl FnOnce(&mut ItemVars) -> BindingResult<T>,
    ) -> BindingResult<T> {
        let mut vars = self.vars.borrow_mut();
        if let Vars::Item(item) = &mut *vars {
            return f(item);
        }
        drop(vars);
        Err(self.wrong_receiver(method, "item"))
    }
}
