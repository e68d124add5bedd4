//! Procedural macros for Pontoon bridge endpoints.
//!
//! Provides `#[endpoint]`, which turns a plain or `async` function into a
//! `Handler` the bridge can register and invoke.

mod common;
mod endpoint_fn;

use proc_macro::TokenStream;

/// Defines a bridge endpoint from a function.
///
/// Generates a `Handler` impl struct whose signature table is derived from
/// the function's parameters, and a constructor with the function's name.
///
/// # Parameter Attributes
///
/// - `/// doc comment`: the parameter's description
/// - `#[default(value)]`: a plain default, used when no input names the parameter
/// - `#[from_path]`, `#[from_query]`, `#[from_body]`, `#[from_header]`: where the
///   value comes from; each accepts optional `default = value` and
///   `description = "..."`
/// - `#[depends(provider)]`: injected from a synchronous provider function
/// - `#[depends(future = provider)]`: injected from an async provider
/// - `#[depends(generator = provider)]`: injected from the first item of the
///   provider's iterator
///
/// # Example
///
/// ```
/// use pontoon_bridge::{HttpException, endpoint};
///
/// struct Session;
///
/// fn session() -> Session {
///     Session
/// }
///
/// #[endpoint]
/// /// Search posts.
/// async fn search_posts(
///     /// Text to match.
///     #[from_query]
///     q: String,
///     #[from_query(default = 10)]
///     limit: i64,
///     #[depends(session)]
///     _db: Session,
/// ) -> Result<Vec<String>, HttpException> {
///     Ok(vec![format!("{q}:{limit}")])
/// }
/// ```
#[proc_macro_attribute]
pub fn endpoint(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    endpoint_fn::generate_endpoint_fn(&input).into()
}
