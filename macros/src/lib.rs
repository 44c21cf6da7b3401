mod entry;
mod log;
mod loggable;
mod traceable;

use proc_macro::TokenStream;

/// Emits a loggable or traceable value at its own level.
///
/// `log!(entry)` or `log!(entry, debug_payload)`.
#[proc_macro]
pub fn log(input: TokenStream) -> TokenStream {
    log::log_impl(input)
}

/// Declares a log entry enum whose variants carry a message and a level.
#[proc_macro]
pub fn loggable(input: TokenStream) -> TokenStream {
    loggable::loggable_impl(input)
}

/// Declares an error enum. Variants capture their cause as a string unless
/// marked `#[no_source]`, and get a constructor named after the variant.
#[proc_macro]
pub fn traceable(input: TokenStream) -> TokenStream {
    traceable::traceable_impl(input)
}
