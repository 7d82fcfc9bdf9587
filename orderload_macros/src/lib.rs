//! Attribute macros that attach the derive bundle required by `orderload`'s
//! `Metric` and `Aggregate` traits.
//!
//! Both macros expect `serde` to be reachable from the call site.
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

extern crate proc_macro;

fn with_value_derives(item: &ItemStruct) -> TokenStream2 {
    quote! {
        #[derive(
            serde::Serialize,
            serde::Deserialize,
            std::cmp::PartialEq,
            std::fmt::Debug,
            std::clone::Clone
        )]
        #item
    }
}

/// Marks a struct as a single request sample.
///
/// Adds the serde, equality, debug and clone derives and implements `Metric`,
/// which must be in scope where the macro is used.
#[proc_macro_attribute]
pub fn metric(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(item as ItemStruct);
    let ident = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let derived = with_value_derives(&ast);

    let expanded = quote! {
        #derived

        impl #impl_generics Metric for #ident #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}

/// Marks a struct as a mergeable accumulator of metrics.
///
/// Only the derives are added; the `Aggregate` impl is written by hand since
/// `consume` and `merge` carry the actual semantics.
#[proc_macro_attribute]
pub fn aggregate(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(item as ItemStruct);
    TokenStream::from(with_value_derives(&ast))
}
