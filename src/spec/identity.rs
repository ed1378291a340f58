use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Versioned key for a spec catalog snapshot (e.g., `host_specs_v1`).
///
/// Stored alongside invocation records so consumers can resolve spec IDs
/// against the correct catalog snapshot.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogKey(pub String);

/// Stable identifier for a versioned capability interface (e.g.,
/// `foundation_models_v1`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecKey(pub String);

/// Name of a single operation declared by a spec.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity tag of a registered bridge instance.
///
/// Fixed at construction and exposed to the embedding runtime for lifetime
/// and dispatch bookkeeping. Tags must be non-empty; the registry enforces
/// this on registration.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeTag(pub String);

impl BridgeTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Marshaled value kind for operation parameters and return values.
///
/// Known variants keep serialization consistent; `Other` preserves forward
/// compatibility with catalogs that introduce new kinds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Object,
    Other(String),
}

/// One declared parameter: marshaled name plus its value kind.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub kind: ValueKind,
}

/// Compact operation signature attached to invocation records.
///
/// Snapshots denormalize catalog metadata into hbir records so they remain
/// self-describing even when the catalog evolves on disk.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OperationSnapshot {
    pub id: OperationId,
    pub params: Vec<ParamDecl>,
    pub returns: ValueKind,
}

impl Serialize for ValueKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ValueKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_str(&value))
    }
}

impl ValueKind {
    pub fn as_str(&self) -> &str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Object => "object",
            ValueKind::Other(value) => value.as_str(),
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "string" => ValueKind::String,
            "number" => ValueKind::Number,
            "boolean" => ValueKind::Boolean,
            "object" => ValueKind::Object,
            other => ValueKind::Other(other.to_string()),
        }
    }

    /// Whether a marshaled JSON value satisfies this kind.
    ///
    /// `Other` kinds never match; the catalog index rejects them up front so
    /// a mismatch here means the record and catalog disagree.
    pub fn admits(&self, value: &serde_json::Value) -> bool {
        match self {
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Object => value.is_object(),
            ValueKind::Other(_) => false,
        }
    }
}
