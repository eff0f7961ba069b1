//! The compiled transform: an immutable unit of work taking
//! `(input, context, args)` to a value.

use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;

use crate::engine::Engine;
use crate::error::ApplyError;
use crate::kinds::Op;
use crate::scope::Context;

/// A compiled transform. Cheap to clone; constructed once by the engine and
/// applied many times. The skeleton behind it is immutable after compilation.
#[derive(Clone)]
pub struct Transform(Rc<TransformInner>);

struct TransformInner {
    name: Option<String>,
    kind: String,
    engine: Engine,
    /// Compiled `input` pre-selector; applied to the actual input first.
    pre: Option<Transform>,
    /// `context` values declared on the configuration. Each apply evaluates
    /// under a derived child context carrying them, scoped to that one call.
    context_overrides: Option<Map<String, Value>>,
    op: Op,
}

impl Transform {
    pub(crate) fn new(
        name: Option<String>,
        kind: impl Into<String>,
        engine: Engine,
        pre: Option<Transform>,
        context_overrides: Option<Map<String, Value>>,
        op: Op,
    ) -> Self {
        Self(Rc::new(TransformInner {
            name,
            kind: kind.into(),
            engine,
            pre,
            context_overrides,
            op,
        }))
    }

    /// An engine-internal transform with no pre-selector, used for compiled
    /// sub-pieces (pointer extractions, template fragments, skeletons).
    pub(crate) fn internal(
        engine: &Engine,
        name: Option<String>,
        kind: &str,
        op: Op,
    ) -> Self {
        Self::new(name, kind, engine.clone(), None, None, op)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.0.engine
    }

    pub(crate) fn op(&self) -> &Op {
        &self.0.op
    }

    pub(crate) fn display_name(&self) -> String {
        crate::error::display_name(self.0.name.as_deref())
    }

    /// Apply the transform to input data under the given context.
    pub fn apply(
        &self,
        input: &Value,
        context: &Context,
        args: &[Value],
    ) -> Result<Value, ApplyError> {
        let derived;
        let context = match &self.0.context_overrides {
            Some(values) => {
                derived = context.derive();
                derived.update(values);
                &derived
            }
            None => context,
        };
        let selected;
        let input = match &self.0.pre {
            Some(pre) => {
                selected = pre.apply(input, context, &[])?;
                &selected
            }
            None => input,
        };
        self.0.op.apply(self, input, context, args)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("name", &self.0.name)
            .field("kind", &self.0.kind)
            .finish_non_exhaustive()
    }
}
