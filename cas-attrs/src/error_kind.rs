use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned, ToTokens};
use syn::{
    parse::{Parse, ParseStream},
    spanned::Spanned,
    Attribute,
    Expr,
    Fields,
    Ident,
    ItemStruct,
    Result,
};

/// The tags accepted by the `error` attribute.
#[derive(Debug, Default)]
pub struct ErrorArgs {
    pub message: Option<Expr>,
    pub labels: Option<Expr>,
    pub help: Option<Expr>,
    pub note: Option<Expr>,
}

impl ErrorArgs {
    /// Parses the tags of a single `#[error(...)]` attribute.
    fn from_attr(attr: &Attribute) -> Result<Self> {
        let mut args = Self::default();
        attr.parse_nested_meta(|meta| {
            let slot = if meta.path.is_ident("message") {
                &mut args.message
            } else if meta.path.is_ident("labels") {
                &mut args.labels
            } else if meta.path.is_ident("help") {
                &mut args.help
            } else if meta.path.is_ident("note") {
                &mut args.note
            } else {
                return Err(meta.error("unknown tag, expected one of `message`, `labels`, `help`, `note`"));
            };

            if slot.is_some() {
                return Err(meta.error("duplicate tag"));
            }
            *slot = Some(meta.value()?.parse()?);
            Ok(())
        })?;
        Ok(args)
    }
}

/// The struct to derive [`ErrorKind`] for.
#[derive(Debug)]
pub struct ErrorKindTarget {
    pub name: Ident,
    pub fields: Fields,
    pub args: ErrorArgs,
}

impl Parse for ErrorKindTarget {
    fn parse(input: ParseStream) -> Result<Self> {
        let item = input.parse::<ItemStruct>()?;
        let attr = item.attrs.iter()
            .find(|attr| attr.path().is_ident("error"))
            .ok_or_else(|| syn::Error::new(item.ident.span(), "missing `#[error(...)]` attribute"))?;
        let args = ErrorArgs::from_attr(attr)?;
        if args.message.is_none() {
            return Err(syn::Error::new(attr.span(), "the `message` tag is required"));
        }

        Ok(Self {
            name: item.ident,
            fields: item.fields,
            args,
        })
    }
}

impl ErrorKindTarget {
    /// Creates a `let` statement that destructures `self` into its named fields, so the tag
    /// expressions can name them directly.
    fn destructure(&self) -> TokenStream2 {
        let name = &self.name;
        match &self.fields {
            Fields::Named(fields) => {
                let idents = fields.named.iter().map(|field| &field.ident);
                quote! { let #name { #(#idents),* } = self; }
            },
            Fields::Unnamed(_) => quote_spanned! {
                name.span() => compile_error!("`ErrorKind` cannot be derived for tuple structs");
            },
            Fields::Unit => quote! {},
        }
    }
}

impl ToTokens for ErrorKindTarget {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        let name = &self.name;
        let destructure = self.destructure();
        let message = &self.args.message;
        let labels = self.args.labels.as_ref()
            .map(|labels| quote! { #labels })
            .unwrap_or_else(|| quote! { [""] });
        let help = self.args.help.as_ref().map(|help| quote! { builder.set_help(#help); });
        let note = self.args.note.as_ref().map(|note| quote! { builder.set_note(#note); });

        tokens.extend(quote! {
            impl ErrorKind for #name {
                fn as_any(&self) -> &dyn std::any::Any {
                    self
                }

                fn build_report<'a>(
                    &self,
                    src_id: &'a str,
                    spans: &[std::ops::Range<usize>],
                ) -> ariadne::Report<(&'a str, std::ops::Range<usize>)> {
                    #[allow(unused_variables)]
                    #destructure

                    let labels = #labels
                        .into_iter()
                        .zip(spans.iter())
                        .map(|(label_str, span)| {
                            let mut label = ariadne::Label::new((src_id, span.clone()))
                                .with_color(cas_error::EXPR);
                            if !label_str.is_empty() {
                                label = label.with_message(label_str);
                            }
                            label
                        })
                        .collect::<Vec<_>>();

                    let mut builder = ariadne::Report::build(ariadne::ReportKind::Error, src_id, spans[0].start)
                        .with_message(#message)
                        .with_labels(labels);

                    #help
                    #note
                    builder.finish()
                }
            }
        });
    }
}
