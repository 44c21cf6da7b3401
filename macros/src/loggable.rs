use crate::entry::EntryEnum;
use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;

pub fn loggable_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as EntryEnum);
    let enum_name = &input.name;

    let enum_variants = input.variants.iter().map(|variant| {
        let name = &variant.name;
        let message = &variant.message;
        let fields = variant.field_definitions();
        if fields.is_empty() {
            quote! {
                #[error(#message)]
                #name
            }
        } else {
            quote! {
                #[error(#message)]
                #name { #(#fields,)* }
            }
        }
    });

    let level_arms = input.variants.iter().map(|variant| {
        let name = &variant.name;
        let level = &variant.level;
        if variant.fields.is_empty() {
            quote! { Self::#name => #level }
        } else {
            quote! { Self::#name { .. } => #level }
        }
    });

    quote! {
        #[allow(dead_code)]
        #[derive(Debug, Clone, thiserror::Error, serde::Serialize, serde::Deserialize)]
        pub enum #enum_name {
            #(#enum_variants,)*
        }

        impl #enum_name {
            pub fn level(&self) -> tracing::Level {
                match self {
                    #(#level_arms,)*
                }
            }
        }
    }
    .into()
}
