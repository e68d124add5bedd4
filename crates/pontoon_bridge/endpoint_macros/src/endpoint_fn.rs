//! Code generation for `#[endpoint]` on standalone functions.

use pontoon_macro_utils::{PontoonCrate, resolve_crate_path};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{FnArg, ItemFn};

use crate::common::{
    ParamInfo, ParamSource, declared_type, extract_doc_comments, is_endpoint_attr,
    is_result_type, parse_param, provider_name, return_model, to_pascal_case,
    validate_endpoint_signature,
};

/// Generates a Handler impl struct for an `#[endpoint]` function.
///
/// The macro consumes the original function and generates:
/// - A private `__endpoint_impl_<name>` function with the original body
/// - A `<Name>Endpoint` struct implementing `Handler`
/// - A constructor `fn <name>() -> <Name>Endpoint`
pub(crate) fn generate_endpoint_fn(input: &ItemFn) -> TokenStream {
    if let Some(err) = validate_endpoint_signature(&input.sig) {
        return err;
    }

    let params = match input
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat_type) => Some(parse_param(pat_type)),
            FnArg::Receiver(_) => None,
        })
        .collect::<syn::Result<Vec<_>>>()
    {
        Ok(params) => params,
        Err(err) => return err.to_compile_error(),
    };

    let pb = resolve_crate_path(PontoonCrate::Bridge);

    let fn_name = &input.sig.ident;
    let fn_name_str = fn_name.to_string();
    let struct_name = format_ident!("{}Endpoint", to_pascal_case(&fn_name_str));
    let impl_fn_name = format_ident!("__endpoint_impl_{}", fn_name);
    let is_async = input.sig.asyncness.is_some();

    let doc_builder = extract_doc_comments(&input.attrs).map(|doc| quote! { .with_doc(#doc) });
    let returns_builder =
        return_model(&input.sig.output).map(|model| quote! { .with_returns(#model) });
    let param_builders: Vec<_> = params.iter().map(|param| parameter(param, &pb)).collect();

    let frame = if params.is_empty() {
        quote! { _frame }
    } else {
        quote! { mut __frame }
    };
    let extractions: Vec<_> = params.iter().map(|param| extraction(param, &pb)).collect();
    let call_args: Vec<_> = params.iter().map(|param| &param.ident).collect();
    let await_call = is_async.then(|| quote! { .await });

    let result_handling = if is_result_type(&input.sig.output) {
        quote! {
            match __result {
                ::core::result::Result::Ok(__value) => {
                    ::core::result::Result::<#pb::Node, #pb::HandlerError>::Ok(
                        #pb::IntoNode::into_node(__value),
                    )
                }
                ::core::result::Result::Err(__err) => {
                    ::core::result::Result::Err(#pb::HandlerError::from(__err))
                }
            }
        }
    } else {
        quote! {
            ::core::result::Result::<#pb::Node, #pb::HandlerError>::Ok(
                #pb::IntoNode::into_node(__result),
            )
        }
    };

    let vis = &input.vis;
    let block = &input.block;
    let asyncness = &input.sig.asyncness;
    let output = &input.sig.output;

    // The private impl function keeps the original parameters minus the
    // attributes consumed here.
    let cleaned_params: Vec<_> = input
        .sig
        .inputs
        .iter()
        .map(|arg| {
            if let FnArg::Typed(pat_type) = arg {
                let mut cleaned = pat_type.clone();
                cleaned.attrs.retain(|attr| !is_endpoint_attr(attr));
                FnArg::Typed(cleaned)
            } else {
                arg.clone()
            }
        })
        .collect();

    let struct_doc = format!("Handler for the `{fn_name_str}` endpoint.");
    let constructor_doc = format!("Creates an instance of the `{fn_name_str}` endpoint.");

    quote! {
        #asyncness fn #impl_fn_name(#(#cleaned_params),*) #output #block

        #[doc = #struct_doc]
        #vis struct #struct_name;

        impl #pb::Handler for #struct_name {
            fn signature(&self) -> #pb::Signature {
                #pb::Signature::new(#fn_name_str)
                    #doc_builder
                    .with_async(#is_async)
                    #(
                        .with_param(#param_builders)
                    )*
                    #returns_builder
            }

            fn call(&self, #frame: #pb::CallFrame) -> #pb::HandlerFuture<'_> {
                ::std::boxed::Box::pin(async move {
                    #(#extractions)*
                    let __result = #impl_fn_name(#(#call_args),*) #await_call;
                    #result_handling
                })
            }
        }

        #[doc = #constructor_doc]
        #[must_use]
        #vis fn #fn_name() -> #struct_name {
            #struct_name
        }
    }
}

/// Builds the `Parameter` expression for one parameter.
fn parameter(param: &ParamInfo, pb: &TokenStream) -> TokenStream {
    let name = &param.name;
    let declared = declared_type(&param.ty, pb);

    let default = match &param.source {
        ParamSource::Inferred => None,
        ParamSource::Default(expr) => Some(quote! {
            #pb::ParamDefault::Plain(#pb::__private::serde_json::json!(#expr))
        }),
        ParamSource::Marker {
            location,
            default,
            description,
        } => {
            let default = default
                .as_ref()
                .map(|expr| quote! { .with_default(#pb::__private::serde_json::json!(#expr)) });
            let description = description
                .as_ref()
                .map(|text| quote! { .with_description(#text) });
            Some(quote! {
                #pb::ParamDefault::Spec(#pb::ParamSpec::#location() #default #description)
            })
        }
        ParamSource::Depends {
            constructor,
            provider,
        } => {
            let name = provider_name(provider).map(|name| quote! { .with_name(#name) });
            Some(quote! {
                #pb::ParamDefault::Dependency(#pb::Depends::#constructor(#provider) #name)
            })
        }
    };

    let default = default.map(|default| quote! { .with_default(#default) });
    let description = param
        .description
        .as_ref()
        .map(|text| quote! { .with_description(#text) });

    quote! {
        #pb::Parameter::new(#name, #declared) #default #description
    }
}

/// Builds the statement binding one parameter out of the call frame.
fn extraction(param: &ParamInfo, pb: &TokenStream) -> TokenStream {
    let ident = &param.ident;
    let name = &param.name;
    let ty = &param.ty;

    let take = match &param.source {
        ParamSource::Depends { .. } => quote! { __frame.take_injected::<#ty>(#name) },
        _ => quote! { __frame.take_value::<#ty>(#name) },
    };

    quote! {
        let #ident: #ty = match #take {
            ::core::result::Result::Ok(__value) => __value,
            ::core::result::Result::Err(__err) => {
                return ::core::result::Result::Err(#pb::HandlerError::from(__err));
            }
        };
    }
}
