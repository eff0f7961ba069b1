//! The transformation engine: registries of prefixes, named transforms, and
//! transform kinds, plus the compiler that turns stylesheet configuration
//! into executable [`Transform`]s.
//!
//! Engines form a tree. A transform configuration that declares `prefixes`,
//! `transforms`, or `context` gets a child engine wrapping the current one,
//! so inner declarations shadow outer ones and disappear when processing
//! leaves that layer.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::debug;

use crate::error::{json_type_name, ApplyError, ConfigError};
use crate::kinds::{self, KindFn};
use crate::parse;
use crate::pointer::DataPointer;
use crate::scope::{Context, ScopedMap};
use crate::stdmod;
use crate::transform::Transform;

/// A named-transform slot. Resolution moves a slot from `Unparsed` through
/// `InProgress` to `Compiled`; re-entering an `InProgress` slot is a cycle.
#[derive(Clone, Debug)]
pub(crate) enum Slot {
    Unparsed(Value),
    InProgress,
    Compiled(Transform),
}

/// The engine handle. Cloning shares the underlying registries; child
/// engines hold their parent alive.
#[derive(Clone, Debug)]
pub struct Engine(Rc<EngineInner>);

#[derive(Debug)]
struct EngineInner {
    parent: Option<Engine>,
    prefixes: Rc<ScopedMap<String>>,
    transforms: Rc<ScopedMap<Slot>>,
    kinds: Rc<ScopedMap<KindFn>>,
    context: Context,
    /// Process-wide settings (`$sys.*`), shared across the whole engine tree.
    system: Rc<RefCell<IndexMap<String, Value>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// A bare engine with no definitions loaded. Most callers want
    /// [`Engine::standard`].
    pub fn new() -> Self {
        let mut system = IndexMap::new();
        system.insert(
            "$sys.contrib_pkg".to_string(),
            Value::String("contrib".to_string()),
        );
        Engine(Rc::new(EngineInner {
            parent: None,
            prefixes: Rc::new(ScopedMap::new()),
            transforms: Rc::new(ScopedMap::new()),
            kinds: Rc::new(ScopedMap::new()),
            context: Context::new(),
            system: Rc::new(RefCell::new(system)),
        }))
    }

    /// An engine with the standard module installed: the built-in transform
    /// kinds, the standard named transforms, and the default context.
    pub fn standard() -> Self {
        let engine = Self::new();
        stdmod::install(&engine);
        engine
    }

    /// Wrap this engine with a child scoped to the given configuration's
    /// `prefixes`, `transforms`, and `context` declarations.
    pub fn wrap(&self, config: &Map<String, Value>) -> Result<Engine, ConfigError> {
        let child = Engine(Rc::new(EngineInner {
            parent: Some(self.clone()),
            prefixes: Rc::new(ScopedMap::with_defaults(Rc::clone(&self.0.prefixes))),
            transforms: Rc::new(ScopedMap::with_defaults(Rc::clone(&self.0.transforms))),
            kinds: Rc::new(ScopedMap::with_defaults(Rc::clone(&self.0.kinds))),
            context: self.0.context.derive(),
            system: Rc::clone(&self.0.system),
        }));
        child.load_definitions(config)?;
        Ok(child)
    }

    /// Load `prefixes` and `transforms` definitions and `context` values from
    /// a configuration object into this engine.
    pub fn load_definitions(&self, config: &Map<String, Value>) -> Result<(), ConfigError> {
        if let Some(defs) = config.get("prefixes") {
            let Some(defs) = defs.as_object() else {
                return Err(ConfigError::NotAnObject { node: "prefixes" });
            };
            for (name, expansion) in defs {
                let Some(expansion) = expansion.as_str() else {
                    return Err(ConfigError::WrongParamType {
                        name: name.clone(),
                        param: "prefixes",
                        need: "string",
                        got: json_type_name(expansion),
                    });
                };
                self.0.prefixes.insert(name.clone(), expansion.to_string());
            }
        }

        if let Some(defs) = config.get("transforms") {
            let Some(defs) = defs.as_object() else {
                return Err(ConfigError::NotAnObject { node: "transforms" });
            };
            for (name, transform_config) in defs {
                self.add_transform(name, transform_config.clone());
            }
        }

        if let Some(Value::Object(values)) = config.get("context") {
            self.0.context.update(values);
        }
        Ok(())
    }

    /// Register a named transform configuration for lazy resolution.
    pub fn add_transform(&self, name: &str, config: Value) {
        self.0
            .transforms
            .insert(name.to_string(), Slot::Unparsed(config));
    }

    pub(crate) fn register_kind(&self, name: &str, compiler: KindFn) {
        self.0.kinds.insert(name.to_string(), compiler);
    }

    fn lookup_kind(&self, name: &str) -> Option<KindFn> {
        self.0.kinds.get(name)
    }

    pub fn context(&self) -> &Context {
        &self.0.context
    }

    pub fn resolve_prefix(&self, name: &str) -> Option<String> {
        self.0.prefixes.get(name)
    }

    pub fn system_value(&self, key: &str) -> Option<Value> {
        self.0.system.borrow().get(key).cloned()
    }

    pub fn set_system(&self, key: &str, value: Value) {
        self.0.system.borrow_mut().insert(key.to_string(), value);
    }

    /// Resolve a reference into a compiled transform. Function-form
    /// references (`ident(args)`) compile to `function` transforms; other
    /// names look up the named-transform registry, compiling lazily at the
    /// engine that owns the definition.
    pub fn resolve_transform(&self, name: &str) -> Result<Transform, ConfigError> {
        let name = name.trim();
        if parse::is_function_form(name) {
            return kinds::function::from_invocation(self, name);
        }
        if name.contains('(') || name.contains(')') {
            return Err(ConfigError::FunctionSyntax(format!(
                "invalid function invocation: {name}"
            )));
        }

        let mut engine = Some(self.clone());
        while let Some(current) = engine {
            if current.0.transforms.contains_local(name) {
                return current.resolve_local(name);
            }
            engine = current.0.parent.clone();
        }
        Err(ConfigError::UnknownName(name.to_string()))
    }

    fn resolve_local(&self, name: &str) -> Result<Transform, ConfigError> {
        let Some(slot) = self.0.transforms.get(name) else {
            return Err(ConfigError::UnknownName(name.to_string()));
        };
        match slot {
            Slot::Compiled(transform) => Ok(transform),
            Slot::InProgress => Err(ConfigError::Cycle(name.to_string())),
            Slot::Unparsed(config) => {
                debug!(transform = name, "compiling named transform");
                self.0
                    .transforms
                    .insert(name.to_string(), Slot::InProgress);
                match self.make_transform(&config, Some(name)) {
                    Ok(transform) => {
                        self.0
                            .transforms
                            .insert(name.to_string(), Slot::Compiled(transform.clone()));
                        Ok(transform)
                    }
                    Err(err) => {
                        // Leave the slot as it was; a failed compile must not
                        // corrupt the registry.
                        self.0
                            .transforms
                            .insert(name.to_string(), Slot::Unparsed(config));
                        Err(err)
                    }
                }
            }
        }
    }

    /// Resolve every visible named transform, validating the stylesheet.
    /// Disabled transforms are skipped.
    pub fn resolve_all_transforms(&self) -> Result<(), ConfigError> {
        for name in self.0.transforms.keys() {
            match self.resolve_transform(&name) {
                Ok(_) | Err(ConfigError::Disabled(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Compile a transform configuration. A string configuration is an alias
    /// and resolves as a reference.
    pub fn make_transform(
        &self,
        config: &Value,
        name: Option<&str>,
    ) -> Result<Transform, ConfigError> {
        self.make_transform_full(config, name, None, false)
    }

    pub(crate) fn make_transform_full(
        &self,
        config: &Value,
        name: Option<&str>,
        kind_override: Option<&str>,
        skip_wrap: bool,
    ) -> Result<Transform, ConfigError> {
        if let Value::String(reference) = config {
            return self.resolve_transform(reference);
        }
        let Some(obj) = config.as_object() else {
            return Err(ConfigError::WrongParamType {
                name: crate::error::display_name(name),
                param: "config",
                need: "object or string",
                got: json_type_name(config),
            });
        };

        let kind = kind_override
            .or_else(|| obj.get("$type").and_then(Value::as_str))
            .unwrap_or("identity");

        let scoped = !skip_wrap
            && ["prefixes", "transforms", "context"]
                .iter()
                .any(|key| obj.contains_key(*key));
        let engine = if scoped { self.wrap(obj)? } else { self.clone() };

        if obj.get("status").and_then(Value::as_str) == Some("disabled") {
            return Err(ConfigError::Disabled(crate::error::display_name(name)));
        }

        let Some(compiler) = engine.lookup_kind(kind) else {
            return Err(ConfigError::UnknownKind {
                name: crate::error::display_name(name),
                kind: kind.to_string(),
            });
        };

        let display = crate::error::display_name(name);
        let op = compiler(obj, &engine, &display)?;

        // The `apply` kind consumes `input` itself, against the applied
        // transform's engine.
        let pre = if kind == "apply" {
            None
        } else {
            match obj.get("input") {
                Some(selector) => kinds::resolve_input(selector, &engine, &display)?,
                None => None,
            }
        };

        let context_overrides = obj
            .get("context")
            .and_then(Value::as_object)
            .filter(|values| !values.is_empty())
            .cloned();

        Ok(Transform::new(
            name.map(str::to_string),
            kind,
            engine,
            pre,
            context_overrides,
            op,
        ))
    }

    /// Expand a pointer's target through the prefix table until a built-in
    /// target is reached. Expansion is bounded: a revisited target stops the
    /// loop rather than spinning on a cyclic prefix table.
    pub fn normalize_pointer(&self, pointer: &DataPointer) -> Result<DataPointer, ConfigError> {
        let mut out = pointer.clone();
        if out.target.is_none() {
            out.target = Some("$in".to_string());
            return Ok(out);
        }

        let mut seen = HashSet::new();
        while !out.is_resolved() {
            let Some(target) = out.target.clone() else {
                out.target = Some("$in".to_string());
                break;
            };
            if !seen.insert(target.clone()) {
                break;
            }
            let Some(expansion) = self.resolve_prefix(&target) else {
                break;
            };
            let combined = format!("{expansion}{}", out.path);
            out = DataPointer::parse(&combined).map_err(|_| ConfigError::BadPrefix {
                prefix: target,
                expansion,
            })?;
        }
        Ok(out)
    }

    /// Use a data pointer to select from the input document or the context.
    pub fn extract(
        &self,
        input: &Value,
        context: &Context,
        select: &str,
    ) -> Result<Value, ApplyError> {
        let pointer = DataPointer::new(select)?;
        let pointer = self.normalize_pointer(&pointer).map_err(ApplyError::Config)?;

        if !pointer.path.is_empty() && !pointer.path.starts_with('/') {
            return Err(ApplyError::Pointer {
                select: select.to_string(),
                reason: format!("did not normalize to a usable JSON pointer: {pointer}"),
            });
        }

        let found = match pointer.target.as_deref() {
            Some("$in") => input.pointer(&pointer.path).cloned(),
            Some("$context") => context.extract(&pointer.path),
            other => {
                return Err(ApplyError::Pointer {
                    select: select.to_string(),
                    reason: format!(
                        "target '{}' did not resolve to a data source",
                        other.unwrap_or_default()
                    ),
                })
            }
        };
        found.ok_or_else(|| ApplyError::Extraction {
            select: select.to_string(),
            pointer: pointer.to_string(),
            input: input.clone(),
        })
    }
}
