use crate::entry::EntryEnum;
use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;

pub fn traceable_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as EntryEnum);
    let enum_name = &input.name;

    let enum_variants = input.variants.iter().map(|variant| {
        let name = &variant.name;
        let message = &variant.message;
        let fields = variant.field_definitions();
        let no_source = variant.has_attribute("no_source");
        match (no_source, fields.is_empty()) {
            (true, true) => quote! {
                #[error(#message)]
                #name
            },
            (true, false) => quote! {
                #[error(#message)]
                #name { #(#fields,)* }
            },
            (false, _) => quote! {
                #[error(#message)]
                #name { #(#fields,)* err: String }
            },
        }
    });

    let level_arms = input.variants.iter().map(|variant| {
        let name = &variant.name;
        let level = &variant.level;
        if variant.has_attribute("no_source") && variant.fields.is_empty() {
            quote! { Self::#name => #level }
        } else {
            quote! { Self::#name { .. } => #level }
        }
    });

    // Unit variants without a source need no constructor.
    let constructors = input.variants.iter().filter_map(|variant| {
        let no_source = variant.has_attribute("no_source");
        if no_source && variant.fields.is_empty() {
            return None;
        }
        let name = &variant.name;
        let params = variant
            .fields
            .iter()
            .map(|(field, ty)| quote! { #field: impl Into<#ty> });
        let assignments = variant
            .fields
            .iter()
            .map(|(field, _)| quote! { #field: #field.into() });
        if no_source {
            Some(quote! {
                #[allow(non_snake_case)]
                pub fn #name(#(#params),*) -> Self {
                    Self::#name { #(#assignments,)* }
                }
            })
        } else {
            Some(quote! {
                #[allow(non_snake_case)]
                pub fn #name(#(#params,)* source: impl std::fmt::Display) -> Self {
                    Self::#name { #(#assignments,)* err: source.to_string() }
                }
            })
        }
    });

    quote! {
        #[allow(dead_code)]
        #[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize, serde::Deserialize)]
        pub enum #enum_name {
            #(#enum_variants,)*
        }

        impl #enum_name {
            pub fn level(&self) -> tracing::Level {
                match self {
                    #(#level_arms,)*
                }
            }

            #(#constructors)*
        }
    }
    .into()
}
