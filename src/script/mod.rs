//! Script engine adapter
//!
//! Wires the binding [`Runtime`] into a rhai [`Engine`]. Every method name
//! any class defines is registered once on [`ScriptObject`] and forwarded
//! to [`Runtime::invoke`]; the class table decides what actually runs.

mod render;

pub use render::render;

use crate::binding::bridge::{describe, raise};
use crate::binding::{Runtime, ScriptObject};
use crate::error::{BindingError, BindingResult};
use crate::repl::{EvalError, Evaluator};
use crate::resource::ResourceApi;
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Module, NativeCallContext, Scope, INT};
use std::cell::RefCell;
use std::rc::Rc;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

pub struct ScriptEngine {
    engine: Engine,
    scope: Scope<'static>,
    runtime: Rc<Runtime>,
    printed: Rc<RefCell<Vec<String>>>,
    context: String,
}

impl ScriptEngine {
    /// Engine over every registered kind
    pub fn new(
        api: Rc<dyn ResourceApi>,
        context: impl Into<String>,
        namespace: impl Into<String>,
    ) -> BindingResult<Self> {
        Self::with_runtime(Rc::new(Runtime::new(api, namespace)), context)
    }

    pub fn with_runtime(runtime: Rc<Runtime>, context: impl Into<String>) -> BindingResult<Self> {
        let printed = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();

        let sink = printed.clone();
        engine.on_print(move |text| sink.borrow_mut().push(text.to_string()));
        let sink = printed.clone();
        engine.on_debug(move |text, _, _| sink.borrow_mut().push(text.to_string()));

        register_classes(&mut engine, &runtime);
        register_globals(&mut engine, &runtime);

        // One global per kind, not fetched until the script asks
        let mut scope = Scope::new();
        for key in runtime.resource_keys() {
            let collection = runtime.new_collection(&key)?;
            scope.push(key, collection);
        }

        tracing::info!(
            "Script engine ready with {} resource kinds",
            runtime.resource_keys().len()
        );

        Ok(Self {
            engine,
            scope,
            runtime,
            printed,
            context: context.into(),
        })
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Evaluate in the persistent scope
    pub fn eval_dynamic(&mut self, source: &str) -> ScriptResult<Dynamic> {
        self.engine
            .eval_with_scope::<Dynamic>(&mut self.scope, source)
    }
}

impl Evaluator for ScriptEngine {
    fn eval(&mut self, source: &str) -> Result<Option<String>, EvalError> {
        match self.eval_dynamic(source) {
            Ok(value) => Ok(render(&self.runtime, value)),
            Err(err) => {
                tracing::debug!("Evaluation failed: {:?}", err);
                Err(EvalError(describe(&err)))
            }
        }
    }

    fn take_printed(&mut self) -> Vec<String> {
        std::mem::take(&mut *self.printed.borrow_mut())
    }

    fn context(&self) -> String {
        self.context.clone()
    }

    fn namespace(&self) -> String {
        self.runtime.namespace()
    }
}

fn call(
    runtime: &Runtime,
    native: Option<&NativeCallContext>,
    obj: &ScriptObject,
    method: &str,
    args: &[Dynamic],
) -> ScriptResult<Dynamic> {
    runtime.invoke(native, obj, method, args).map_err(raise)
}

fn call_class(runtime: &Runtime, class: &str, method: &str, args: &[Dynamic]) -> ScriptResult<Dynamic> {
    runtime
        .invoke_class(None, class, method, args)
        .map_err(raise)
}

fn register_classes(engine: &mut Engine, runtime: &Rc<Runtime>) {
    engine.register_type_with_name::<ScriptObject>("ScriptObject");

    let names = runtime.classes().dispatch_names();
    for name in &names.calls {
        register_call(engine, runtime, name);
    }
    for name in &names.getters {
        let (rt, method) = (runtime.clone(), name.clone());
        engine.register_get(name, move |obj: &mut ScriptObject| {
            call(&rt, None, obj, &method, &[])
        });
    }
    for name in &names.setters {
        let (rt, key) = (runtime.clone(), crate::binding::class::setter_key(name));
        engine.register_set(name, move |obj: &mut ScriptObject, value: Dynamic| {
            call(&rt, None, obj, &key, &[value]).map(|_| ())
        });
    }

    let rt = runtime.clone();
    engine.register_indexer_get(move |obj: &mut ScriptObject, index: INT| {
        call(&rt, None, obj, crate::binding::class::INDEXER, &[Dynamic::from(index)])
    });
    let rt = runtime.clone();
    engine.register_indexer_get(move |obj: &mut ScriptObject, key: ImmutableString| {
        call(&rt, None, obj, crate::binding::class::INDEXER, &[Dynamic::from(key)])
    });

    let rt = runtime.clone();
    engine.register_fn("to_string", move |obj: &mut ScriptObject| {
        render::inspect(&rt, obj)
    });
    let rt = runtime.clone();
    engine.register_fn("to_debug", move |obj: &mut ScriptObject| {
        render::inspect(&rt, obj)
    });
    engine.register_fn("class_name", |obj: &mut ScriptObject| {
        obj.class_name().to_string()
    });

    // Class methods live in a static module named after the class
    for class in runtime.classes().classes() {
        let mut module = Module::new();
        let mut registered = false;
        for (name, _) in class.class_methods() {
            register_class_call(&mut module, runtime, &class.name, name);
            registered = true;
        }
        if registered {
            engine.register_static_module(class.name.as_str(), module.into());
        }
    }
}

/// Routes `obj.name(...)` with up to three arguments; the class table
/// checks the real arity
fn register_call(engine: &mut Engine, runtime: &Rc<Runtime>, name: &str) {
    let (rt, m) = (runtime.clone(), name.to_string());
    engine.register_fn(name, move |ctx: NativeCallContext, obj: &mut ScriptObject| {
        call(&rt, Some(&ctx), obj, &m, &[])
    });
    let (rt, m) = (runtime.clone(), name.to_string());
    engine.register_fn(
        name,
        move |ctx: NativeCallContext, obj: &mut ScriptObject, a: Dynamic| {
            call(&rt, Some(&ctx), obj, &m, &[a])
        },
    );
    let (rt, m) = (runtime.clone(), name.to_string());
    engine.register_fn(
        name,
        move |ctx: NativeCallContext, obj: &mut ScriptObject, a: Dynamic, b: Dynamic| {
            call(&rt, Some(&ctx), obj, &m, &[a, b])
        },
    );
    let (rt, m) = (runtime.clone(), name.to_string());
    engine.register_fn(
        name,
        move |ctx: NativeCallContext, obj: &mut ScriptObject, a: Dynamic, b: Dynamic, c: Dynamic| {
            call(&rt, Some(&ctx), obj, &m, &[a, b, c])
        },
    );
}

fn register_class_call(module: &mut Module, runtime: &Rc<Runtime>, class: &str, name: &str) {
    let (rt, c, m) = (runtime.clone(), class.to_string(), name.to_string());
    module.set_native_fn(name, move || call_class(&rt, &c, &m, &[]));
    let (rt, c, m) = (runtime.clone(), class.to_string(), name.to_string());
    module.set_native_fn(name, move |a: Dynamic| call_class(&rt, &c, &m, &[a]));
    let (rt, c, m) = (runtime.clone(), class.to_string(), name.to_string());
    module.set_native_fn(name, move |a: Dynamic, b: Dynamic| {
        call_class(&rt, &c, &m, &[a, b])
    });
}

fn register_globals(engine: &mut Engine, runtime: &Rc<Runtime>) {
    let rt = runtime.clone();
    engine.register_fn("namespace", move || rt.namespace());

    let rt = runtime.clone();
    engine.register_fn("use_namespace", move |namespace: &str| -> ScriptResult<String> {
        let namespace = namespace.trim();
        if namespace.is_empty() {
            return Err(raise(BindingError::InvalidArgument(
                "namespace must not be empty".to_string(),
            )));
        }
        rt.set_namespace(namespace);
        Ok(namespace.to_string())
    });

    let rt = runtime.clone();
    engine.register_fn("resources", move || -> Array {
        rt.resource_keys().into_iter().map(Dynamic::from).collect()
    });
}
