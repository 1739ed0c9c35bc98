mod error_kind;

use error_kind::ErrorKindTarget;
use proc_macro::TokenStream;
use quote::ToTokens;
use syn::parse_macro_input;

/// Derives the `ErrorKind` trait from `cas-error` for the given struct.
///
/// The trait can be derived for unit structs and structs with named fields. The information of
/// the error is customized with the `error` attribute:
///
/// ```
/// use cas_attrs::ErrorKind;
/// use cas_error::ErrorKind;
///
/// #[derive(Debug, ErrorKind)]
/// #[error(
///     message = format!("the pattern never binds `{}`", self.name),
///     labels = ["used here"],
///     help = "bind it in the pattern, or remove it from the replacement",
/// )]
/// pub struct Unbound {
///     pub name: String,
/// }
/// ```
///
/// The following tags are available:
///
/// | Tag         | Description                                                                  |
/// | ----------- | ---------------------------------------------------------------------------- |
/// | `message`   | Required. The message displayed at the top of the error.                     |
/// | `labels`    | An array of label texts, one per span of the error, in order.                |
/// | `help`      | Optional help text, describing what the user can do to fix it.              |
/// | `note`      | Optional note with background information about the error.                  |
///
/// Each tag accepts an expression. For structs with named fields, the expression is evaluated
/// with the fields of the struct in scope (and `self`), so they can be used in the expression.
/// `message`, `help` and `note` must evaluate to something implementing [`ToString`]; the
/// items of `labels` must additionally have an `is_empty` method (`&str` or [`String`]). An
/// empty label highlights its span without text.
#[proc_macro_derive(ErrorKind, attributes(error))]
pub fn error_kind(item: TokenStream) -> TokenStream {
    parse_macro_input!(item as ErrorKindTarget)
        .into_token_stream()
        .into()
}
