//! Stencil - a stylesheet-driven JSON transformation engine.
//!
//! A *stylesheet* is itself a JSON document: it declares named transforms,
//! pointer prefixes, and context values, and designates a root transform.
//! The engine compiles the stylesheet into an executable transform tree and
//! applies it to input documents, producing a new JSON value or a textual
//! artifact such as XML.
//!
//! # Architecture
//!
//! ```text
//! Stylesheet (JSON) → Engine (compile) → Transform (apply) → Value | text
//! ```
//!
//! - [`Engine`] holds the scoped registries (prefixes, named transforms,
//!   transform kinds, context) and compiles configuration objects into
//!   [`Transform`]s. Named transforms resolve lazily; cycles are detected.
//! - [`Transform`] is the immutable compiled unit: `(input, context, args)`
//!   to value. The built-in kinds are `literal`, `extract`,
//!   `stringtemplate`, `json`, `map`, `foreach`, `apply`, `choose`,
//!   `native`, `function`, and `callable`, plus the XML element builders.
//! - [`DataPointer`] selections route against the input (`$in`) or the
//!   [`Context`] (`$context`), through stylesheet-defined prefix expansions.
//! - [`Stylesheet`] ties it together for whole-document runs, including
//!   output encoding.
//!
//! The engine is single-threaded and synchronous: compiled transforms share
//! their engine through cheap reference-counted handles, and lazy resolution
//! mutates the registry in place, so an engine must stay on one thread.

mod document;
mod engine;
mod error;
mod kinds;
mod native;
pub mod parse;
mod pointer;
mod scope;
mod stdmod;
mod transform;

pub use document::Stylesheet;
pub use engine::Engine;
pub use error::{ApplyError, ConfigError};
pub use pointer::DataPointer;
pub use scope::{Context, ScopedMap};
pub use transform::Transform;
