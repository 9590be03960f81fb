//! Script bindings for cluster resources
//!
//! Projects descriptor-defined kinds into script classes:
//!
//! - [`generator`] - builds a collection class and an item class per kind
//! - [`delegate`] - actions that drive an instance of another class (`logs`)
//! - [`bridge`] - host errors to script exceptions and back
//! - [`class`] - the per-class dispatch tables
//! - [`object`] - the script-visible instances and their data
//!
//! All calls funnel through [`Runtime::invoke`], which looks the method up
//! in the receiver's class table, checks the argument count and runs the
//! host callback.

pub mod bridge;
pub mod class;
pub mod delegate;
pub mod generator;
pub mod object;
mod runtime;

pub use class::{Arity, CallContext, ClassDef, ClassRegistry, Method, MethodKind, MethodStyle};
pub use generator::ResourceBinding;
pub use object::{CollectionVars, ItemOrigin, ItemVars, LogStreamVars, ScriptObject, Vars};
pub use runtime::Runtime;
