//! Handler signatures: the per-handler parameter descriptor table.
//!
//! `#[endpoint]` emits a [`Signature`] for every handler from its declared
//! parameters. The resolver reads it instead of inspecting the handler at
//! call time; each parameter's [`ParamDefault`] is fixed when the descriptor
//! is built.

use crate::depends::Depends;
use core::fmt;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A handler's declared shape.
#[derive(Debug, Clone, Serialize)]
pub struct Signature {
    /// Handler name.
    pub name: String,
    /// First doc comment paragraph, if any.
    pub doc: Option<String>,
    /// Whether the handler is `async`.
    pub is_async: bool,
    /// Declared parameters, in order.
    pub params: Vec<Parameter>,
    /// Declared return type name, if any.
    pub returns: Option<String>,
}

impl Signature {
    /// Creates a synchronous signature with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            is_async: false,
            params: Vec::new(),
            returns: None,
        }
    }

    /// Sets the documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Marks the handler as `async`.
    #[must_use]
    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Sets the return type name.
    #[must_use]
    pub fn with_returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = Some(returns.into());
        self
    }

    /// Returns the parameter with the given name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|param| param.name == name)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub ty: DeclaredType,
    /// Default or marker.
    pub default: ParamDefault,
    /// Doc comment, if any.
    pub description: Option<String>,
}

impl Parameter {
    /// Creates a required parameter.
    pub fn new(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: ParamDefault::Required,
            description: None,
        }
    }

    /// Sets the default.
    #[must_use]
    pub fn with_default(mut self, default: ParamDefault) -> Self {
        self.default = default;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DeclaredType
// ─────────────────────────────────────────────────────────────────────────────

/// A parameter's declared type, as far as binding cares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    /// Any integer type.
    Integer,
    /// `f32` or `f64`.
    Float,
    /// `bool`.
    Boolean,
    /// `String` and friends.
    String,
    /// A raw `serde_json::Value`.
    Json,
    /// Anything else, by type name.
    Other(String),
}

impl DeclaredType {
    /// Returns the type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Json => "json",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for types that take part in scalar conversion.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Float | Self::Boolean | Self::String
        )
    }

    /// Returns `true` for types a request body can be bound to.
    #[must_use]
    pub fn accepts_body(&self) -> bool {
        !self.is_scalar()
    }

    /// Returns the model name for non-scalar, non-raw types.
    #[must_use]
    pub fn model_name(&self) -> Option<&str> {
        match self {
            Self::Other(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeclaredType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults and markers
// ─────────────────────────────────────────────────────────────────────────────

/// What a parameter falls back to when no input names it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParamDefault {
    /// No default.
    #[default]
    Required,
    /// A plain default value.
    Plain(Value),
    /// Resolved by calling a provider.
    Dependency(Depends),
    /// A query/path/body/header marker with its own optional default.
    Spec(ParamSpec),
}

impl ParamDefault {
    /// Returns the value step 6 of resolution uses, if any.
    ///
    /// For a marker this is the marker's own default, never the marker.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        match self {
            Self::Plain(value) => Some(value.clone()),
            Self::Spec(spec) => spec.default.clone(),
            Self::Required | Self::Dependency(_) => None,
        }
    }

    /// Returns the dependency, if this is one.
    #[must_use]
    pub fn dependency(&self) -> Option<&Depends> {
        match self {
            Self::Dependency(depends) => Some(depends),
            _ => None,
        }
    }

    /// Returns the marker location, if this is a marker.
    #[must_use]
    pub fn location(&self) -> Option<ParamLocation> {
        match self {
            Self::Spec(spec) => Some(spec.location),
            _ => None,
        }
    }
}

impl From<Depends> for ParamDefault {
    fn from(depends: Depends) -> Self {
        Self::Dependency(depends)
    }
}

impl From<ParamSpec> for ParamDefault {
    fn from(spec: ParamSpec) -> Self {
        Self::Spec(spec)
    }
}

/// Where a marked parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    /// Query string.
    Query,
    /// Path segment.
    Path,
    /// Request body.
    Body,
    /// Request header.
    Header,
}

/// A parameter marker, the analog of `Query(...)`/`Path(...)`/`Body(...)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    /// Where the parameter is read from.
    pub location: ParamLocation,
    /// The marker's own default.
    pub default: Option<Value>,
    /// Description.
    pub description: Option<String>,
}

impl ParamSpec {
    fn at(location: ParamLocation) -> Self {
        Self {
            location,
            default: None,
            description: None,
        }
    }

    /// A query parameter marker.
    #[must_use]
    pub fn query() -> Self {
        Self::at(ParamLocation::Query)
    }

    /// A path parameter marker.
    #[must_use]
    pub fn path() -> Self {
        Self::at(ParamLocation::Path)
    }

    /// A body marker.
    #[must_use]
    pub fn body() -> Self {
        Self::at(ParamLocation::Body)
    }

    /// A header marker.
    #[must_use]
    pub fn header() -> Self {
        Self::at(ParamLocation::Header)
    }

    /// Sets the marker's default.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn marker_default_is_unwrapped() {
        let spec = ParamDefault::Spec(ParamSpec::query().with_default(json!(10)));
        assert_eq!(spec.value(), Some(json!(10)));
        assert_eq!(spec.location(), Some(ParamLocation::Query));

        let bare = ParamDefault::Spec(ParamSpec::path());
        assert_eq!(bare.value(), None);

        assert_eq!(ParamDefault::Plain(json!("x")).value(), Some(json!("x")));
        assert_eq!(ParamDefault::Required.value(), None);
    }

    #[test]
    fn scalar_types() {
        assert!(DeclaredType::Integer.is_scalar());
        assert!(DeclaredType::String.is_scalar());
        assert!(DeclaredType::Json.accepts_body());
        assert!(DeclaredType::Other("PostCreate".into()).accepts_body());
        assert_eq!(
            DeclaredType::Other("PostCreate".into()).model_name(),
            Some("PostCreate")
        );
        assert_eq!(DeclaredType::Json.model_name(), None);
    }

    #[test]
    fn signature_serializes_descriptor_table() {
        let signature = Signature::new("list_posts")
            .with_async(true)
            .with_param(Parameter::new("skip", DeclaredType::Integer).with_default(
                ParamDefault::Spec(ParamSpec::query().with_default(json!(0))),
            ))
            .with_returns("Vec<Post>");

        let json = serde_json::to_value(&signature).unwrap();
        assert_eq!(json["name"], "list_posts");
        assert_eq!(json["params"][0]["type"], "integer");
        assert_eq!(json["params"][0]["default"]["kind"], "spec");
        assert_eq!(json["params"][0]["default"]["value"]["location"], "query");
        assert_eq!(json["params"][0]["default"]["value"]["default"], 0);
        assert!(signature.param("skip").is_some());
        assert!(signature.param("limit").is_none());
    }
}
