use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Expr, Token, parse_macro_input};

struct LogInput {
    entry: Expr,
    debug_info: Option<Expr>,
}

impl Parse for LogInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let entry = input.parse::<Expr>()?;
        let debug_info = if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            Some(input.parse::<Expr>()?)
        } else {
            None
        };
        Ok(LogInput { entry, debug_info })
    }
}

pub fn log_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as LogInput);
    let entry = &input.entry;

    let emit = match &input.debug_info {
        Some(debug_info) => quote! {
            let debug_info = #debug_info;
            if level == tracing::Level::ERROR {
                tracing::error!(message = %message, debug = ?debug_info);
            } else if level == tracing::Level::WARN {
                tracing::warn!(message = %message, debug = ?debug_info);
            } else if level == tracing::Level::INFO {
                tracing::info!(message = %message, debug = ?debug_info);
            } else if level == tracing::Level::DEBUG {
                tracing::debug!(message = %message, debug = ?debug_info);
            } else {
                tracing::trace!(message = %message, debug = ?debug_info);
            }
        },
        None => quote! {
            if level == tracing::Level::ERROR {
                tracing::error!("{}", message);
            } else if level == tracing::Level::WARN {
                tracing::warn!("{}", message);
            } else if level == tracing::Level::INFO {
                tracing::info!("{}", message);
            } else if level == tracing::Level::DEBUG {
                tracing::debug!("{}", message);
            } else {
                tracing::trace!("{}", message);
            }
        },
    };

    quote! {
        {
            let entry = &#entry;
            let level = entry.level();
            let message = entry.to_string();
            #emit
        }
    }
    .into()
}
