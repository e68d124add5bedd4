//! Domain objects with optional serialization capabilities.

use crate::error::ObjectError;
use crate::node::Node;
use serde::Serialize;

/// Table metadata for a relational model instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Declared column names, in declaration order.
    pub columns: Vec<String>,
}

impl TableInfo {
    /// Creates table metadata from a name and its columns.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// A domain object that the serializer can introspect.
///
/// Every capability is optional. The serializer consults them in a fixed
/// order and uses the first one that succeeds:
///
/// 1. [`dump`](Self::dump) for validated data objects
/// 2. [`table`](Self::table) with [`column`](Self::column) and
///    [`attributes`](Self::attributes) for relational models
/// 3. [`fields`](Self::fields) for record-like objects
/// 4. [`to_json`](Self::to_json), then [`describe`](Self::describe)
/// 5. `"<TypeName>"` built from [`type_name`](Self::type_name)
///
/// Relational detection relies only on [`table`](Self::table) returning
/// metadata, never on naming conventions.
///
/// # Example
///
/// ```
/// use pontoon_object::{Node, Object, ObjectError, TableInfo, serialize};
///
/// struct Post {
///     id: i64,
///     title: String,
/// }
///
/// impl Object for Post {
///     fn table(&self) -> Option<TableInfo> {
///         Some(TableInfo::new("posts", ["id", "title"]))
///     }
///
///     fn column(&self, name: &str) -> Result<Node, ObjectError> {
///         match name {
///             "id" => Ok(Node::Int(self.id)),
///             "title" => Ok(Node::Str(self.title.clone())),
///             other => Err(ObjectError::missing_attribute(other)),
///         }
///     }
/// }
///
/// let json = serialize(&Node::object(Post { id: 1, title: "Hello".into() }));
/// assert_eq!(json, serde_json::json!({"id": 1, "title": "Hello"}));
/// ```
pub trait Object: Send + Sync + 'static {
    /// Returns the concrete type name.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Dumps a validated data object to a plain structure.
    fn dump(&self) -> Option<Result<Node, ObjectError>> {
        None
    }

    /// Returns table metadata when this is a relational model instance.
    fn table(&self) -> Option<TableInfo> {
        None
    }

    /// Reads a declared column.
    fn column(&self, name: &str) -> Result<Node, ObjectError> {
        Err(ObjectError::missing_attribute(name))
    }

    /// Returns additional instance attributes beyond the declared columns.
    ///
    /// Names starting with `_` are private and skipped. An entry whose value
    /// failed to load is skipped without failing the object.
    fn attributes(&self) -> Vec<(String, Result<Node, ObjectError>)> {
        Vec::new()
    }

    /// Returns the named fields of a record-like object.
    fn fields(&self) -> Option<Vec<(String, Node)>> {
        None
    }

    /// Generic JSON conversion for anything the other capabilities miss.
    fn to_json(&self) -> Option<Result<serde_json::Value, ObjectError>> {
        None
    }

    /// Human-readable text form.
    fn describe(&self) -> Option<String> {
        None
    }
}

/// Returns the last path segment of a type name, without generic arguments.
///
/// `alloc::vec::Vec<u8>` becomes `Vec`, `my_app::models::Post` becomes `Post`.
#[must_use]
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Adapts any serde-serializable value as a validated data object.
///
/// # Example
///
/// ```
/// use pontoon_object::{Json, Node, serialize};
///
/// #[derive(serde::Serialize)]
/// struct Item {
///     id: u32,
/// }
///
/// let json = serialize(&Node::object(Json(Item { id: 3 })));
/// assert_eq!(json, serde_json::json!({"id": 3}));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> Object for Json<T>
where
    T: Serialize + Send + Sync + 'static,
{
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn dump(&self) -> Option<Result<Node, ObjectError>> {
        Some(
            serde_json::to_value(&self.0)
                .map(Node::from)
                .map_err(ObjectError::from),
        )
    }
}
