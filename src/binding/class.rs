//! Class table
//!
//! Each script class is an explicit map from method name to host callback.
//! The engine adapter never discovers methods by itself: it asks the
//! registry which names exist and routes every call through
//! [`super::Runtime::invoke`].

use super::object::{ScriptObject, Vars};
use super::runtime::Runtime;
use crate::error::{BindingError, BindingResult};
use rhai::{Dynamic, NativeCallContext};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

/// Key under which a class stores its `[]` handler
pub const INDEXER: &str = "[]";

/// Everything a host callback may touch besides its receiver
pub struct CallContext<'a, 'n> {
    pub runtime: &'a Runtime,
    /// Present when called from script code; needed to call back into it
    pub native: Option<&'a NativeCallContext<'n>>,
}

/// Instance method callback: `(context, receiver, args)`
pub type HostFn =
    Rc<dyn Fn(&CallContext<'_, '_>, &ScriptObject, &[Dynamic]) -> BindingResult<Dynamic>>;

/// Class method callback: `(context, args)`
pub type ClassFn = Rc<dyn Fn(&CallContext<'_, '_>, &[Dynamic]) -> BindingResult<Dynamic>>;

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub required: usize,
    pub optional: usize,
}

impl Arity {
    pub const NONE: Arity = Arity::exactly(0);

    pub const fn exactly(n: usize) -> Self {
        Self {
            required: n,
            optional: 0,
        }
    }

    pub const fn up_to(n: usize) -> Self {
        Self {
            required: 0,
            optional: n,
        }
    }

    pub fn accepts(&self, given: usize) -> bool {
        given >= self.required && given <= self.required + self.optional
    }

    pub fn max(&self) -> usize {
        self.required + self.optional
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional == 0 {
            write!(f, "{}", self.required)
        } else {
            write!(f, "{}..{}", self.required, self.max())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Class,
}

/// How the engine reaches a method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodStyle {
    /// `obj.name(args)`, also readable as `obj.name` when it takes no arguments
    Call,
    /// `obj.name`
    Property,
    /// `obj.name = value`
    Setter,
    /// `obj[key]`
    Indexer,
}

#[derive(Clone)]
pub enum Callback {
    Instance(HostFn),
    Class(ClassFn),
}

#[derive(Clone)]
pub struct Method {
    pub arity: Arity,
    pub style: MethodStyle,
    pub callback: Callback,
}

impl Method {
    pub fn kind(&self) -> MethodKind {
        match self.callback {
            Callback::Instance(_) => MethodKind::Instance,
            Callback::Class(_) => MethodKind::Class,
        }
    }

    /// Can be read as a property without parentheses
    pub fn readable(&self) -> bool {
        self.kind() == MethodKind::Instance
            && matches!(self.style, MethodStyle::Call | MethodStyle::Property)
            && self.arity.accepts(0)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("arity", &self.arity)
            .field("kind", &self.kind())
            .field("style", &self.style)
            .finish()
    }
}

/// One script class: a name and its dispatch table
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub methods: BTreeMap<String, Method>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: BTreeMap::new(),
        }
    }

    fn insert(&mut self, name: impl Into<String>, method: Method) -> &mut Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn method<F>(&mut self, name: &str, arity: Arity, f: F) -> &mut Self
    where
        F: Fn(&CallContext<'_, '_>, &ScriptObject, &[Dynamic]) -> BindingResult<Dynamic> + 'static,
    {
        self.insert(
            name,
            Method {
                arity,
                style: MethodStyle::Call,
                callback: Callback::Instance(Rc::new(f)),
            },
        )
    }

    pub fn property<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&CallContext<'_, '_>, &ScriptObject) -> BindingResult<Dynamic> + 'static,
    {
        self.insert(
            name,
            Method {
                arity: Arity::NONE,
                style: MethodStyle::Property,
                callback: Callback::Instance(host_fn(move |ctx, obj, _| f(ctx, obj))),
            },
        )
    }

    /// Setters are stored as `name=`
    pub fn setter<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&CallContext<'_, '_>, &ScriptObject, Dynamic) -> BindingResult<()> + 'static,
    {
        self.insert(
            setter_key(name),
            Method {
                arity: Arity::exactly(1),
                style: MethodStyle::Setter,
                callback: Callback::Instance(host_fn(move |ctx, obj, args| {
                    let value = args.first().cloned().unwrap_or(Dynamic::UNIT);
                    f(ctx, obj, value).map(|_| Dynamic::UNIT)
                })),
            },
        )
    }

    pub fn indexer<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&CallContext<'_, '_>, &ScriptObject, &Dynamic) -> BindingResult<Dynamic> + 'static,
    {
        self.insert(
            INDEXER,
            Method {
                arity: Arity::exactly(1),
                style: MethodStyle::Indexer,
                callback: Callback::Instance(host_fn(move |ctx, obj, args| match args.first() {
                    Some(key) => f(ctx, obj, key),
                    None => Err(BindingError::InvalidArgument("missing index".to_string())),
                })),
            },
        )
    }

    pub fn class_method<F>(&mut self, name: &str, arity: Arity, f: F) -> &mut Self
    where
        F: Fn(&CallContext<'_, '_>, &[Dynamic]) -> BindingResult<Dynamic> + 'static,
    {
        self.insert(
            name,
            Method {
                arity,
                style: MethodStyle::Call,
                callback: Callback::Class(Rc::new(f)),
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn class_methods(&self) -> impl Iterator<Item = (&str, &Method)> {
        self.methods
            .iter()
            .filter(|(_, m)| m.kind() == MethodKind::Class)
            .map(|(name, m)| (name.as_str(), m))
    }
}

fn host_fn<F>(f: F) -> HostFn
where
    F: Fn(&CallContext<'_, '_>, &ScriptObject, &[Dynamic]) -> BindingResult<Dynamic> + 'static,
{
    Rc::new(f)
}

pub fn setter_key(name: &str) -> String {
    format!("{}=", name)
}

/// Names the engine adapter must route, grouped by how they are reached
#[derive(Debug, Default)]
pub struct DispatchNames {
    pub calls: BTreeSet<String>,
    pub getters: BTreeSet<String>,
    pub setters: BTreeSet<String>,
}

/// All registered classes, by name
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, Rc<ClassDef>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: ClassDef) {
        tracing::debug!(
            "Registering class {} ({} methods)",
            class.name,
            class.methods.len()
        );
        self.classes.insert(class.name.clone(), Rc::new(class));
    }

    pub fn get(&self, name: &str) -> BindingResult<Rc<ClassDef>> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| BindingError::UnknownClass(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Allocate a fresh instance of a registered class
    pub fn instantiate(&self, name: &str, vars: Vars) -> BindingResult<ScriptObject> {
        let class = self.get(name)?;
        Ok(ScriptObject::new(&class.name, vars))
    }

    pub fn classes(&self) -> impl Iterator<Item = &Rc<ClassDef>> {
        self.classes.values()
    }

    pub fn dispatch_names(&self) -> DispatchNames {
        let mut names = DispatchNames::default();
        for class in self.classes.values() {
            for (name, method) in &class.methods {
                if method.kind() == MethodKind::Class {
                    continue;
                }
                match method.style {
                    MethodStyle::Call => {
                        names.calls.insert(name.clone());
                    }
                    MethodStyle::Property => {}
                    MethodStyle::Setter => {
                        names
                            .setters
                            .insert(name.trim_end_matches('=').to_string());
                    }
                    MethodStyle::Indexer => {}
                }
                if method.readable() {
                    names.getters.insert(name.clone());
                }
                // Properties are also callable as `obj.name()`
                if method.style == MethodStyle::Property {
                    names.calls.insert(name.clone());
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClassDef {
        let mut class = ClassDef::new("Widgets");
        class
            .method("get", Arity::up_to(2), |_, obj, _| Ok(Dynamic::from(obj.clone())))
            .property("length", |_, _| Ok(Dynamic::from(0_i64)))
            .setter("labels", |_, _, _| Ok(()))
            .indexer(|_, _, key| Ok(key.clone()))
            .class_method("fetch", Arity::up_to(1), |_, _| Ok(Dynamic::UNIT));
        class
    }

    #[test]
    fn test_arity() {
        let arity = Arity::up_to(2);
        assert!(arity.accepts(0));
        assert!(arity.accepts(2));
        assert!(!arity.accepts(3));
        assert_eq!(arity.to_string(), "0..2");
        assert_eq!(Arity::exactly(1).to_string(), "1");
        assert!(!Arity::exactly(1).accepts(0));
    }

    #[test]
    fn test_method_kinds_and_styles() {
        let class = sample();
        assert_eq!(class.get("get").unwrap().kind(), MethodKind::Instance);
        assert_eq!(class.get("fetch").unwrap().kind(), MethodKind::Class);
        assert_eq!(class.get("labels=").unwrap().style, MethodStyle::Setter);
        assert_eq!(class.get(INDEXER).unwrap().style, MethodStyle::Indexer);
        assert_eq!(class.class_methods().count(), 1);
    }

    #[test]
    fn test_dispatch_names() {
        let mut registry = ClassRegistry::new();
        registry.register(sample());
        let names = registry.dispatch_names();

        assert!(names.calls.contains("get"));
        assert!(names.calls.contains("length"));
        assert!(!names.calls.contains("fetch"));
        assert!(names.getters.contains("get"));
        assert!(names.getters.contains("length"));
        assert!(names.setters.contains("labels"));
    }

    #[test]
    fn test_instantiate_unknown_class() {
        let registry = ClassRegistry::new();
        let err = registry
            .instantiate("Nope", Vars::Collection(Default::default()))
            .unwrap_err();
        assert!(matches!(err, BindingError::UnknownClass(_)));
        assert_eq!(err.to_string(), "class Nope is not registered");
    }

    #[test]
    fn test_instantiate_uses_class_name() {
        let mut registry = ClassRegistry::new();
        registry.register(sample());
        let obj = registry
            .instantiate("Widgets", Vars::Collection(Default::default()))
            .unwrap();
        assert_eq!(obj.class_name(), "Widgets");
    }
}
