//! Embedding host context: owns the registry and catalog for one context
//! lifetime and dispatches marshaled calls.
//!
//! The context is the in-process stand-in for an embedding runtime. It is
//! created once per context, cross-validates the registry against the spec
//! catalog up front, and then serves any number of concurrent dispatches;
//! bridges are shared read-only so no locking discipline is required.

use crate::boundary::{
    BridgeInfo, CallInfo, HostInfo, InvocationRecord, OperationContext, OutcomeInfo,
    RECORD_SCHEMA_VERSION, detect_host_info,
};
use crate::bridge::{BridgeRegistry, InvokeError};
use crate::spec::{BridgeTag, CatalogKey, OperationDecl, OperationId, SpecIndex};
use crate::validation::validate_registry;
use anyhow::{Result, anyhow, bail};
use serde_json::Value;

/// One embedding context: registry + catalog + host snapshot.
pub struct HostContext {
    registry: BridgeRegistry,
    specs: SpecIndex,
    host: HostInfo,
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("specs", &self.specs)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl HostContext {
    /// Build a context, rejecting registries that drift from the catalog.
    ///
    /// Validation up front means dispatch can treat every registered bridge
    /// as fully resolvable: a tag always maps to a known spec, and the
    /// declared operations are implemented in full.
    pub fn new(registry: BridgeRegistry, specs: SpecIndex) -> Result<Self> {
        if registry.is_empty() {
            bail!("refusing to build a host context with no registered bridges");
        }
        let errors = validate_registry(&specs, &registry);
        if !errors.is_empty() {
            bail!(
                "registry does not satisfy the spec catalog:\n{}",
                errors.join("\n")
            );
        }
        Ok(Self {
            registry,
            specs,
            host: detect_host_info(),
        })
    }

    pub fn registry(&self) -> &BridgeRegistry {
        &self.registry
    }

    pub fn specs(&self) -> &SpecIndex {
        &self.specs
    }

    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    pub fn catalog_key(&self) -> &CatalogKey {
        self.specs.key()
    }

    /// Dispatch one marshaled call and capture the outcome as a record.
    ///
    /// Addressing a tag or operation outside the declared surface is a
    /// caller error and fails without a record. Every other outcome is
    /// captured in the returned record with the matching status and error
    /// code.
    pub fn dispatch(
        &self,
        tag: &BridgeTag,
        operation: &OperationId,
        args: &Value,
    ) -> Result<InvocationRecord> {
        let bridge = self
            .registry
            .get(tag)
            .ok_or_else(|| anyhow!("Unknown bridge tag: {}", tag.0))?;
        let spec_key = bridge.spec_key();
        let spec = self
            .specs
            .spec(&spec_key)
            .ok_or_else(|| anyhow!("Unknown spec key: {}", spec_key.0))?;
        let decl = spec.operation(operation).ok_or_else(|| {
            anyhow!(
                "Spec {} declares no operation named '{}'",
                spec_key.0,
                operation.0
            )
        })?;

        let outcome = if !bridge.available(&self.host) {
            reject(InvokeError::Unavailable { tag: tag.clone() })
        } else if let Err(err) = check_marshaled_args(decl, args) {
            reject(err)
        } else {
            match bridge.invoke(operation, args) {
                Ok(value) => OutcomeInfo {
                    status: "success".to_string(),
                    value: Some(value),
                    error_code: None,
                    error_detail: None,
                },
                Err(err) => reject(err),
            }
        };

        Ok(InvocationRecord {
            schema_version: RECORD_SCHEMA_VERSION.to_string(),
            specs_schema_version: Some(self.specs.key().clone()),
            host: self.host.clone(),
            bridge: BridgeInfo {
                tag: tag.clone(),
                spec: spec_key,
                version: bridge.version().to_string(),
            },
            call: CallInfo {
                operation: operation.clone(),
                args: record_args(args),
            },
            result: outcome,
            operation_context: OperationContext {
                operation: decl.snapshot(),
            },
        })
    }
}

/// Type-check marshaled arguments against the declared signature.
///
/// Runs before the bridge sees the call, so well-typed arguments are the
/// only thing operation bodies ever observe. Extraneous arguments are
/// rejected rather than dropped to keep records faithful to what callers
/// actually sent.
fn check_marshaled_args(decl: &OperationDecl, args: &Value) -> Result<(), InvokeError> {
    let Some(map) = args.as_object() else {
        return Err(InvokeError::ArgumentParsing {
            operation: decl.id.clone(),
            detail: "arguments must be a JSON object".to_string(),
        });
    };

    for param in &decl.params {
        match map.get(&param.name) {
            None => {
                return Err(InvokeError::ArgumentParsing {
                    operation: decl.id.clone(),
                    detail: format!("missing argument '{}'", param.name),
                });
            }
            Some(value) if !param.kind.admits(value) => {
                return Err(InvokeError::ArgumentParsing {
                    operation: decl.id.clone(),
                    detail: format!(
                        "argument '{}' must be a {}",
                        param.name,
                        param.kind.as_str()
                    ),
                });
            }
            Some(_) => {}
        }
    }

    for key in map.keys() {
        if !decl.params.iter().any(|param| &param.name == key) {
            return Err(InvokeError::ArgumentParsing {
                operation: decl.id.clone(),
                detail: format!("unexpected argument '{key}'"),
            });
        }
    }

    Ok(())
}

fn reject(err: InvokeError) -> OutcomeInfo {
    OutcomeInfo {
        status: err.status().to_string(),
        value: None,
        error_code: Some(err.code().to_string()),
        error_detail: Some(err.to_string()),
    }
}

fn record_args(args: &Value) -> Value {
    // The record schema requires an object; non-object inputs were rejected
    // above and are normalized here so the record still serializes.
    if args.is_object() {
        args.clone()
    } else {
        Value::Object(Default::default())
    }
}
