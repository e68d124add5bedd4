//! Dependency resolution: binding request inputs to a handler's parameters.
//!
//! For each declared parameter the first applicable source wins:
//!
//! 1. a direct keyword argument supplied by a trusted caller, verbatim;
//! 2. a path parameter, converted to the declared scalar type;
//! 3. a query parameter, converted the same way;
//! 4. a dependency marker, by calling its provider;
//! 5. the request body, for parameters that take a structured value;
//! 6. the declared default (a marker's own default, never the marker);
//! 7. otherwise the parameter stays unresolved.
//!
//! Resolution never fails. Conversions that do not apply keep the original
//! value, and an unresolved parameter only matters if the handler cannot
//! bind it.

use crate::frame::{Arg, CallFrame};
use crate::signature::{DeclaredType, ParamDefault, ParamLocation, Parameter, Signature};
use indexmap::IndexMap;
use serde_json::{Number, Value};

/// Path or query parameters.
pub type Params = serde_json::Map<String, Value>;

/// Direct keyword arguments.
pub type Kwargs = IndexMap<String, Arg>;

/// Everything a single resolution draws from.
#[derive(Debug, Default)]
pub struct ResolveInputs {
    /// Path parameters.
    pub path_params: Params,
    /// Query parameters.
    pub query_params: Params,
    /// Request body.
    pub body: Option<Value>,
    /// Direct keyword arguments.
    pub kwargs: Kwargs,
}

/// Builds the call frame for `signature` from `inputs`.
pub async fn resolve(signature: &Signature, inputs: ResolveInputs) -> CallFrame {
    let ResolveInputs {
        path_params,
        query_params,
        body,
        mut kwargs,
    } = inputs;
    let mut frame = CallFrame::new();

    for param in &signature.params {
        let name = param.name.as_str();

        if let Some(arg) = kwargs.shift_remove(name) {
            tracing::trace!(param = name, source = "kwargs", "parameter resolved");
            frame.insert(name, arg);
            continue;
        }

        if let Some(raw) = path_params.get(name) {
            tracing::trace!(param = name, source = "path", "parameter resolved");
            frame.insert(name, convert_scalar(raw, &param.ty));
            continue;
        }

        if let Some(raw) = query_params.get(name) {
            tracing::trace!(param = name, source = "query", "parameter resolved");
            frame.insert(name, convert_scalar(raw, &param.ty));
            continue;
        }

        if let Some(depends) = param.default.dependency() {
            match depends.resolve().await {
                Some(value) => {
                    tracing::trace!(
                        param = name,
                        provider = depends.name(),
                        "dependency resolved"
                    );
                    frame.insert(name, Arg::Injected(value));
                }
                None => {
                    tracing::debug!(
                        param = name,
                        provider = depends.name(),
                        "dependency provider yielded nothing"
                    );
                }
            }
            continue;
        }

        if let Some(body) = body.as_ref().filter(|_| binds_body(param)) {
            tracing::trace!(param = name, source = "body", "parameter resolved");
            frame.insert(name, body.clone());
            continue;
        }

        if let Some(default) = param.default.value() {
            tracing::trace!(param = name, source = "default", "parameter resolved");
            frame.insert(name, default);
            continue;
        }

        tracing::trace!(param = name, "parameter unresolved");
    }

    frame
}

/// Whether the request body goes to `param`. Scalar parameters without a
/// body marker fall through to their default.
fn binds_body(param: &Parameter) -> bool {
    match param.default.location() {
        Some(ParamLocation::Body) => true,
        Some(_) => false,
        None => param.ty.accepts_body() && !matches!(param.default, ParamDefault::Dependency(_)),
    }
}

/// Converts a raw path or query value to the declared scalar type.
///
/// Non-scalar types, and values that do not convert, pass through unchanged.
#[must_use]
pub fn convert_scalar(raw: &Value, ty: &DeclaredType) -> Value {
    let converted = match ty {
        DeclaredType::Integer => to_integer(raw),
        DeclaredType::Float => to_float(raw),
        DeclaredType::Boolean => to_boolean(raw),
        DeclaredType::String => to_string(raw),
        DeclaredType::Json | DeclaredType::Other(_) => None,
    };
    converted.unwrap_or_else(|| raw.clone())
}

fn to_integer(raw: &Value) -> Option<Value> {
    match raw {
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(raw.clone()),
        Value::Number(number) => number
            .as_f64()
            .filter(|float| float.is_finite())
            // Saturating cast; finite floats truncate toward zero.
            .map(|float| Value::from(float.trunc() as i64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .map(Value::from)
                .or_else(|_| text.parse::<u64>().map(Value::from))
                .ok()
        }
        Value::Bool(flag) => Some(Value::from(i64::from(*flag))),
        _ => None,
    }
}

fn to_float(raw: &Value) -> Option<Value> {
    let float = match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    Number::from_f64(float).map(Value::Number)
}

fn to_boolean(raw: &Value) -> Option<Value> {
    match raw {
        Value::Bool(_) => Some(raw.clone()),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Number(number) => number.as_f64().map(|n| Value::Bool(n != 0.0)),
        _ => None,
    }
}

fn to_string(raw: &Value) -> Option<Value> {
    match raw {
        Value::String(_) => Some(raw.clone()),
        Value::Number(number) => Some(Value::String(number.to_string())),
        Value::Bool(flag) => Some(Value::String(flag.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depends::Depends;
    use crate::signature::ParamSpec;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    fn value<'a>(frame: &'a CallFrame, name: &str) -> Option<&'a Value> {
        frame.get(name).and_then(Arg::as_value)
    }

    #[tokio::test]
    async fn kwargs_beat_path_params() {
        let signature =
            Signature::new("get_item").with_param(Parameter::new("item_id", DeclaredType::Integer));
        let mut kwargs = Kwargs::new();
        kwargs.insert("item_id".to_string(), Arg::Value(json!("from-kwargs")));

        let frame = resolve(
            &signature,
            ResolveInputs {
                path_params: params(json!({"item_id": "7"})),
                kwargs,
                ..ResolveInputs::default()
            },
        )
        .await;

        assert_eq!(value(&frame, "item_id"), Some(&json!("from-kwargs")));
    }

    #[tokio::test]
    async fn path_beats_query_and_converts() {
        let signature =
            Signature::new("get_item").with_param(Parameter::new("item_id", DeclaredType::Integer));

        let frame = resolve(
            &signature,
            ResolveInputs {
                path_params: params(json!({"item_id": "7"})),
                query_params: params(json!({"item_id": "9"})),
                ..ResolveInputs::default()
            },
        )
        .await;

        assert_eq!(value(&frame, "item_id"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn dependency_beats_body() {
        let signature = Signature::new("create_post").with_param(
            Parameter::new("db", DeclaredType::Other("Session".into()))
                .with_default(Depends::new(|| "session").into()),
        );

        let frame = resolve(
            &signature,
            ResolveInputs {
                body: Some(json!({"title": "x"})),
                ..ResolveInputs::default()
            },
        )
        .await;

        assert!(matches!(frame.get("db"), Some(Arg::Injected(_))));
    }

    #[tokio::test]
    async fn empty_generator_leaves_parameter_unresolved() {
        let signature = Signature::new("f").with_param(
            Parameter::new("db", DeclaredType::Other("Session".into()))
                .with_default(Depends::generator(Vec::<u8>::new).into()),
        );

        let frame = resolve(&signature, ResolveInputs::default()).await;
        assert!(!frame.contains("db"));
    }

    #[tokio::test]
    async fn body_binds_structured_parameters_only() {
        let signature = Signature::new("create_post")
            .with_param(Parameter::new("post", DeclaredType::Other("PostCreate".into())))
            .with_param(Parameter::new("note", DeclaredType::String))
            .with_param(
                Parameter::new("raw", DeclaredType::Json)
                    .with_default(ParamSpec::query().with_default(json!(null)).into()),
            );

        let frame = resolve(
            &signature,
            ResolveInputs {
                body: Some(json!({"title": "Hello"})),
                ..ResolveInputs::default()
            },
        )
        .await;

        assert_eq!(value(&frame, "post"), Some(&json!({"title": "Hello"})));
        assert!(!frame.contains("note"));
        assert_eq!(value(&frame, "raw"), Some(&json!(null)));
    }

    #[tokio::test]
    async fn body_marker_binds_scalars() {
        let signature = Signature::new("rename").with_param(
            Parameter::new("name", DeclaredType::String)
                .with_default(ParamSpec::body().into()),
        );

        let frame = resolve(
            &signature,
            ResolveInputs {
                body: Some(json!("new name")),
                ..ResolveInputs::default()
            },
        )
        .await;

        assert_eq!(value(&frame, "name"), Some(&json!("new name")));
    }

    #[tokio::test]
    async fn scalars_skip_the_body_and_take_their_default() {
        let signature = Signature::new("count").with_param(
            Parameter::new("count", DeclaredType::Integer)
                .with_default(ParamDefault::Plain(json!(3))),
        );

        let frame = resolve(
            &signature,
            ResolveInputs {
                body: Some(json!({"count": 9})),
                ..ResolveInputs::default()
            },
        )
        .await;

        assert_eq!(value(&frame, "count"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn defaults_unwrap_markers() {
        let signature = Signature::new("list_posts")
            .with_param(
                Parameter::new("skip", DeclaredType::Integer)
                    .with_default(ParamSpec::query().with_default(json!(0)).into()),
            )
            .with_param(
                Parameter::new("limit", DeclaredType::Integer)
                    .with_default(ParamDefault::Plain(json!(100))),
            )
            .with_param(Parameter::new("q", DeclaredType::String));

        let frame = resolve(
            &signature,
            ResolveInputs {
                query_params: params(json!({"limit": "5"})),
                ..ResolveInputs::default()
            },
        )
        .await;

        assert_eq!(value(&frame, "skip"), Some(&json!(0)));
        assert_eq!(value(&frame, "limit"), Some(&json!(5)));
        assert!(!frame.contains("q"));
    }

    #[test]
    fn integer_conversion() {
        let ty = DeclaredType::Integer;
        assert_eq!(convert_scalar(&json!("7"), &ty), json!(7));
        assert_eq!(convert_scalar(&json!(" -3 "), &ty), json!(-3));
        assert_eq!(convert_scalar(&json!(2.9), &ty), json!(2));
        assert_eq!(convert_scalar(&json!(true), &ty), json!(1));
        assert_eq!(convert_scalar(&json!("abc"), &ty), json!("abc"));
        assert_eq!(
            convert_scalar(&json!("18446744073709551615"), &ty),
            json!(18_446_744_073_709_551_615_u64)
        );
    }

    #[test]
    fn float_conversion() {
        let ty = DeclaredType::Float;
        assert_eq!(convert_scalar(&json!("2.5"), &ty), json!(2.5));
        assert_eq!(convert_scalar(&json!(3), &ty), json!(3.0));
        assert_eq!(convert_scalar(&json!("NaN"), &ty), json!("NaN"));
        assert_eq!(convert_scalar(&json!("x"), &ty), json!("x"));
    }

    #[test]
    fn boolean_conversion() {
        let ty = DeclaredType::Boolean;
        assert_eq!(convert_scalar(&json!("true"), &ty), json!(true));
        assert_eq!(convert_scalar(&json!("OFF"), &ty), json!(false));
        assert_eq!(convert_scalar(&json!(0), &ty), json!(false));
        assert_eq!(convert_scalar(&json!("maybe"), &ty), json!("maybe"));
    }

    #[test]
    fn string_and_passthrough() {
        assert_eq!(convert_scalar(&json!(7), &DeclaredType::String), json!("7"));
        assert_eq!(
            convert_scalar(&json!({"a": 1}), &DeclaredType::String),
            json!({"a": 1})
        );
        assert_eq!(
            convert_scalar(&json!("7"), &DeclaredType::Other("PostId".into())),
            json!("7")
        );
    }
}
