//! Shared utilities for endpoint macro code generation.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    Attribute, Expr, ExprLit, ExprPath, FnArg, GenericArgument, Ident, Lit, LitStr, Meta, Pat,
    PatType, PathArguments, ReturnType, Signature, Type,
};

/// Parameter markers and the `ParamSpec` constructor each maps to.
const MARKERS: [(&str, &str); 4] = [
    ("from_path", "path"),
    ("from_query", "query"),
    ("from_body", "body"),
    ("from_header", "header"),
];

/// Validates that a function signature is suitable for `#[endpoint]`.
///
/// Rejects unsafe, extern, generic and method functions.
pub(crate) fn validate_endpoint_signature(sig: &Signature) -> Option<TokenStream> {
    if let Some(unsafety) = &sig.unsafety {
        return Some(
            syn::Error::new_spanned(unsafety, "#[endpoint] cannot be applied to unsafe functions")
                .to_compile_error(),
        );
    }

    if let Some(abi) = &sig.abi {
        return Some(
            syn::Error::new_spanned(abi, "#[endpoint] cannot be applied to extern functions")
                .to_compile_error(),
        );
    }

    if !sig.generics.params.is_empty() {
        return Some(
            syn::Error::new_spanned(
                &sig.generics,
                "#[endpoint] does not support generic parameters",
            )
            .to_compile_error(),
        );
    }

    if let Some(FnArg::Receiver(receiver)) = sig.inputs.first() {
        return Some(
            syn::Error::new_spanned(
                receiver,
                "#[endpoint] functions cannot have a `self` receiver",
            )
            .to_compile_error(),
        );
    }

    None
}

/// Where a parameter's value comes from.
#[derive(Debug, Clone)]
pub(crate) enum ParamSource {
    /// Named inputs, or the body for structured types.
    Inferred,
    /// `#[default(expr)]`
    Default(Expr),
    /// `#[from_query]` and the other location markers.
    Marker {
        location: Ident,
        default: Option<Expr>,
        description: Option<LitStr>,
    },
    /// `#[depends(..)]`
    Depends { constructor: Ident, provider: Expr },
}

/// Parsed information about a single function parameter.
#[derive(Debug, Clone)]
pub(crate) struct ParamInfo {
    /// Binding identifier.
    pub ident: Ident,
    /// Parameter name as seen by callers.
    pub name: String,
    /// Parameter type.
    pub ty: Type,
    /// Description from doc comments.
    pub description: Option<String>,
    /// Value source.
    pub source: ParamSource,
}

/// Returns `true` for attributes `#[endpoint]` consumes.
pub(crate) fn is_endpoint_attr(attr: &Attribute) -> bool {
    let path = attr.path();
    path.is_ident("doc")
        || path.is_ident("default")
        || path.is_ident("depends")
        || MARKERS.iter().any(|(marker, _)| path.is_ident(marker))
}

/// Extracts doc comment text from attributes.
pub(crate) fn extract_doc_comments(attrs: &[Attribute]) -> Option<String> {
    let mut docs = Vec::new();

    for attr in attrs {
        if attr.path().is_ident("doc")
            && let Meta::NameValue(meta) = &attr.meta
            && let Expr::Lit(ExprLit {
                lit: Lit::Str(lit_str),
                ..
            }) = &meta.value
        {
            docs.push(lit_str.value().trim().to_string());
        }
    }

    if docs.is_empty() {
        None
    } else {
        Some(docs.join("\n"))
    }
}

/// Parses a typed function parameter into a [`ParamInfo`].
pub(crate) fn parse_param(pat_type: &PatType) -> syn::Result<ParamInfo> {
    let Pat::Ident(pat_ident) = &*pat_type.pat else {
        return Err(syn::Error::new_spanned(
            &pat_type.pat,
            "#[endpoint] parameters must be plain identifiers",
        ));
    };

    if matches!(&*pat_type.ty, Type::Reference(_) | Type::ImplTrait(_)) {
        return Err(syn::Error::new_spanned(
            &pat_type.ty,
            "#[endpoint] parameters must have owned, concrete types",
        ));
    }

    let mut source = None;
    for attr in &pat_type.attrs {
        let parsed = if attr.path().is_ident("default") {
            ParamSource::Default(attr.parse_args::<Expr>()?)
        } else if attr.path().is_ident("depends") {
            parse_depends(attr)?
        } else if let Some((_, location)) = MARKERS
            .iter()
            .find(|(marker, _)| attr.path().is_ident(marker))
        {
            parse_marker(attr, location)?
        } else {
            continue;
        };

        if source.replace(parsed).is_some() {
            return Err(syn::Error::new_spanned(
                attr,
                "a parameter takes at most one of #[default], #[depends] and the #[from_*] markers",
            ));
        }
    }

    Ok(ParamInfo {
        ident: pat_ident.ident.clone(),
        name: pat_ident.ident.unraw().to_string(),
        ty: (*pat_type.ty).clone(),
        description: extract_doc_comments(&pat_type.attrs),
        source: source.unwrap_or(ParamSource::Inferred),
    })
}

/// Parses `#[from_query]` or `#[from_query(default = expr, description = "..")]`.
fn parse_marker(attr: &Attribute, location: &str) -> syn::Result<ParamSource> {
    let mut default = None;
    let mut description = None;

    match &attr.meta {
        Meta::Path(_) => {}
        Meta::List(_) => {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    default = Some(meta.value()?.parse::<Expr>()?);
                    Ok(())
                } else if meta.path.is_ident("description") {
                    description = Some(meta.value()?.parse::<LitStr>()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `default` or `description`"))
                }
            })?;
        }
        Meta::NameValue(_) => {
            return Err(syn::Error::new_spanned(
                attr,
                "expected `#[marker]` or `#[marker(default = .., description = ..)]`",
            ));
        }
    }

    Ok(ParamSource::Marker {
        location: format_ident!("{}", location),
        default,
        description,
    })
}

/// Parses `#[depends(provider)]`, `#[depends(future = provider)]` or
/// `#[depends(generator = provider)]`.
fn parse_depends(attr: &Attribute) -> syn::Result<ParamSource> {
    let mut found = None;

    attr.parse_nested_meta(|meta| {
        let (constructor, provider) = if meta.path.is_ident("future") {
            ("future", meta.value()?.parse::<Expr>()?)
        } else if meta.path.is_ident("generator") {
            ("generator", meta.value()?.parse::<Expr>()?)
        } else {
            let path = Expr::Path(ExprPath {
                attrs: Vec::new(),
                qself: None,
                path: meta.path.clone(),
            });
            ("new", path)
        };

        if found
            .replace((format_ident!("{}", constructor), provider))
            .is_some()
        {
            return Err(meta.error("#[depends] takes a single provider"));
        }
        Ok(())
    })?;

    let Some((constructor, provider)) = found else {
        return Err(syn::Error::new_spanned(attr, "#[depends] requires a provider"));
    };
    Ok(ParamSource::Depends {
        constructor,
        provider,
    })
}

/// Returns the name of a provider given as a path.
pub(crate) fn provider_name(provider: &Expr) -> Option<String> {
    match provider {
        Expr::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.unraw().to_string()),
        _ => None,
    }
}

/// Returns the first type argument of `ty` if its last segment is `wrapper`.
fn type_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == wrapper
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        Some(inner)
    } else {
        None
    }
}

/// Renders a type, keeping only the spaces that separate words.
pub(crate) fn type_name(ty: &Type) -> String {
    let rendered = quote!(#ty).to_string();
    let chars: Vec<char> = rendered.chars().collect();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| {
            c != ' '
                || (i > 0
                    && i + 1 < chars.len()
                    && is_word(chars[i - 1])
                    && is_word(chars[i + 1]))
        })
        .map(|(_, &c)| c)
        .collect()
}

/// Maps a parameter type to its `DeclaredType` expression.
///
/// `Option<T>` maps as `T`.
pub(crate) fn declared_type(ty: &Type, pb: &TokenStream) -> TokenStream {
    let ty = type_argument(ty, "Option").unwrap_or(ty);

    if let Type::Path(type_path) = ty
        && type_path.qself.is_none()
        && let Some(segment) = type_path.path.segments.last()
    {
        let variant = match segment.ident.to_string().as_str() {
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" => Some(quote!(Integer)),
            "f32" | "f64" => Some(quote!(Float)),
            "bool" => Some(quote!(Boolean)),
            "String" => Some(quote!(String)),
            "Value" if is_json_value(&type_path.path) => Some(quote!(Json)),
            _ => None,
        };
        if let Some(variant) = variant {
            return quote!(#pb::DeclaredType::#variant);
        }
    }

    let name = type_name(ty);
    quote!(#pb::DeclaredType::Other(::std::string::String::from(#name)))
}

/// Matches `Value` and `serde_json::Value`, not other types named `Value`.
fn is_json_value(path: &syn::Path) -> bool {
    let segments: Vec<String> = path
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect();
    match segments.as_slice() {
        [only] => only == "Value",
        [krate, last] => krate == "serde_json" && last == "Value",
        _ => false,
    }
}

/// Checks if a return type is `Result<T, E>`.
pub(crate) fn is_result_type(return_type: &ReturnType) -> bool {
    if let ReturnType::Type(_, ty) = return_type
        && let Type::Path(type_path) = ty.as_ref()
        && let Some(segment) = type_path.path.segments.last()
    {
        return segment.ident == "Result";
    }
    false
}

/// Returns the response model name: the success type with any `Json<_>`
/// wrapper removed, or `None` for unit.
pub(crate) fn return_model(return_type: &ReturnType) -> Option<String> {
    let ReturnType::Type(_, ty) = return_type else {
        return None;
    };
    let ty: &Type = ty;
    let ty = type_argument(ty, "Result").unwrap_or(ty);
    let ty = type_argument(ty, "Json").unwrap_or(ty);

    if let Type::Tuple(tuple) = ty
        && tuple.elems.is_empty()
    {
        return None;
    }
    Some(type_name(ty))
}

/// Converts a `snake_case` string to `PascalCase`.
pub(crate) fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn declared(ty: Type) -> String {
        declared_type(&ty, &quote!(pb)).to_string()
    }

    #[test]
    fn json_values_map_to_json() {
        assert!(declared(parse_quote!(Value)).ends_with("Json"));
        assert!(declared(parse_quote!(serde_json::Value)).ends_with("Json"));
        assert!(declared(parse_quote!(::serde_json::Value)).ends_with("Json"));
        assert!(declared(parse_quote!(Option<serde_json::Value>)).ends_with("Json"));
    }

    #[test]
    fn other_types_named_value_stay_opaque() {
        let declared = declared(parse_quote!(crate::config::Value));
        assert!(declared.contains("Other"));
        assert!(declared.contains("\"crate::config::Value\""));
    }

    #[test]
    fn scalars_map_by_name() {
        assert!(declared(parse_quote!(u16)).ends_with("Integer"));
        assert!(declared(parse_quote!(Option<f64>)).ends_with("Float"));
        assert!(declared(parse_quote!(bool)).ends_with("Boolean"));
    }

    #[test]
    fn type_names_keep_word_spaces_only() {
        assert_eq!(type_name(&parse_quote!(Vec<&'static str>)), "Vec<&'static str>");
        assert_eq!(type_name(&parse_quote!(dyn Send)), "dyn Send");
    }
}
