//! Shared utilities for Pontoon procedural macro crates.
//!
//! Provides crate-path resolution so that generated code emits correct
//! fully-qualified paths whether the consumer depends on `pontoon_bridge`
//! directly or only on the `pontoon` umbrella crate.

use proc_macro2::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};

/// A Pontoon crate that macro-generated code may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PontoonCrate {
    /// `pontoon_bridge`
    Bridge,
}

impl PontoonCrate {
    /// Returns the `Cargo.toml` package name for this crate.
    fn as_str(self) -> &'static str {
        match self {
            Self::Bridge => "pontoon_bridge",
        }
    }
}

/// Returns a [`TokenStream`] path for the given Pontoon crate.
///
/// Resolution order:
/// 1. Direct dependency (possibly renamed in `Cargo.toml`).
/// 2. Indirect access via the `pontoon` umbrella crate (`pontoon::<name>`),
///    including from the umbrella's own tests.
/// 3. Fallback to the literal crate name (compile error will point the user
///    to the missing dependency).
pub fn resolve_crate_path(krate: PontoonCrate) -> TokenStream {
    let name = krate.as_str();

    match crate_name(name) {
        Ok(FoundCrate::Itself) => {
            let ident = format_ident!("{}", name);
            quote!(#ident)
        }
        Ok(FoundCrate::Name(found)) => {
            let ident = format_ident!("{}", found);
            quote!(#ident)
        }
        Err(_) => match crate_name("pontoon") {
            Ok(FoundCrate::Name(found)) => {
                let pontoon = format_ident!("{}", found);
                let ident = format_ident!("{}", name);
                quote!(#pontoon::#ident)
            }
            // Tests and doctests of the umbrella crate see it as `pontoon`.
            Ok(FoundCrate::Itself) => {
                let ident = format_ident!("{}", name);
                quote!(pontoon::#ident)
            }
            _ => {
                let ident = format_ident!("{}", name);
                quote!(#ident)
            }
        },
    }
}
