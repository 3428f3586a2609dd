//! Crate path resolution for generated code.
//!
//! Detects whether the user depends on `orma` (facade) or `orma-data`
//! directly, and returns the appropriate path prefix for generated code.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

/// Returns the token stream for accessing `orma_data` types.
///
/// If the user depends on `orma`, returns `::orma::data`.
/// Otherwise returns `::orma_data`.
pub fn orma_data_path() -> TokenStream {
    if let Ok(found) = crate_name("orma") {
        match found {
            // the facade declares `extern crate self as orma`
            FoundCrate::Itself => quote!(::orma::data),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident::data)
            }
        }
    } else if let Ok(found) = crate_name("orma-data") {
        match found {
            // orma-data re-exports itself under its own name
            FoundCrate::Itself => quote!(::orma_data),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident)
            }
        }
    } else {
        // Fallback - assume orma_data is available (for error messages)
        quote!(::orma_data)
    }
}
