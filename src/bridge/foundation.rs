//! Reference bridge: greeting and double-precision addition.
//!
//! The typed inherent methods are the native surface; `invoke` is the
//! marshaled surface the embedding runtime reaches through the registry.
//! Both operations are total over their declared input types, so this bridge
//! never produces an `error`-status record on well-typed input.

use crate::bridge::{CapabilityBridge, InvokeError};
use crate::spec::{OperationId, SpecKey};
use serde_json::{Number, Value};

/// Bridge exposing the `foundation_models_v1` spec.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoundationModels;

impl FoundationModels {
    /// Identity tag registered with the embedding runtime.
    pub const TAG: &'static str = "foundation_models";
    /// Spec key this bridge implements (see `schema/specs.json`).
    pub const SPEC_KEY: &'static str = "foundation_models_v1";

    /// Construction takes no input and cannot fail.
    pub fn new() -> Self {
        FoundationModels
    }

    /// Format a greeting around `name`.
    ///
    /// Any string is accepted, including the empty string, which yields the
    /// double-space form `"Hello  from FoundationModels!"`.
    pub fn greet(&self, name: &str) -> String {
        format!("Hello {name} from FoundationModels!")
    }

    /// Plain IEEE-754 double addition; non-finite inputs pass through.
    pub fn add(&self, a: f64, b: f64) -> f64 {
        a + b
    }
}

impl CapabilityBridge for FoundationModels {
    fn tag(&self) -> &str {
        Self::TAG
    }

    fn spec_key(&self) -> SpecKey {
        SpecKey(Self::SPEC_KEY.to_string())
    }

    fn operations(&self) -> Vec<OperationId> {
        vec![
            OperationId("greet".to_string()),
            OperationId("add".to_string()),
        ]
    }

    fn invoke(&self, operation: &OperationId, args: &Value) -> Result<Value, InvokeError> {
        match operation.as_str() {
            "greet" => {
                let name = require_str(args, "name", operation)?;
                Ok(Value::String(self.greet(name)))
            }
            "add" => {
                let a = require_f64(args, "a", operation)?;
                let b = require_f64(args, "b", operation)?;
                let sum = self.add(a, b);
                // JSON numbers cannot carry NaN/Infinity; surface the
                // marshaling gap instead of silently emitting null.
                Number::from_f64(sum)
                    .map(Value::Number)
                    .ok_or_else(|| InvokeError::Execution {
                        operation: operation.clone(),
                        detail: format!("result {sum} is not representable as a JSON number"),
                    })
            }
            _ => Err(InvokeError::UnknownOperation {
                operation: operation.clone(),
            }),
        }
    }
}

fn require_str<'a>(
    args: &'a Value,
    key: &str,
    operation: &OperationId,
) -> Result<&'a str, InvokeError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| InvokeError::ArgumentParsing {
            operation: operation.clone(),
            detail: format!("expected string argument '{key}'"),
        })
}

fn require_f64(args: &Value, key: &str, operation: &OperationId) -> Result<f64, InvokeError> {
    args.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| InvokeError::ArgumentParsing {
            operation: operation.clone(),
            detail: format!("expected numeric argument '{key}'"),
        })
}
