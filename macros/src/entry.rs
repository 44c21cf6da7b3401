use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Error, Expr, Ident, LitStr, Result, Token, Type, braced};

pub struct EntryEnum {
    pub name: Ident,
    pub variants: Vec<EntryVariant>,
}

pub struct EntryVariant {
    pub attributes: Vec<Attribute>,
    pub message: LitStr,
    pub name: Ident,
    pub fields: Vec<(Ident, Type)>,
    pub level: Expr,
}

impl EntryVariant {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr.path().is_ident(name))
    }

    pub fn field_definitions(&self) -> Vec<TokenStream> {
        self.fields
            .iter()
            .map(|(name, ty)| quote! { #name: #ty })
            .collect()
    }
}

impl Parse for EntryEnum {
    fn parse(input: ParseStream) -> Result<Self> {
        let name = input.parse::<Ident>()?;

        let content;
        braced!(content in input);

        let mut variants = Vec::new();
        while !content.is_empty() {
            variants.push(content.parse::<EntryVariant>()?);
            if content.peek(Token![,]) {
                content.parse::<Token![,]>()?;
            }
        }

        Ok(EntryEnum { name, variants })
    }
}

impl Parse for EntryVariant {
    fn parse(input: ParseStream) -> Result<Self> {
        let attributes = input.call(Attribute::parse_outer)?;
        let error_attr = attributes
            .iter()
            .find(|attr| attr.path().is_ident("error"))
            .ok_or_else(|| Error::new(input.span(), "Missing #[error(...)] attribute"))?;
        let message = error_attr.parse_args::<LitStr>()?;

        let name = input.parse::<Ident>()?;

        let mut fields = Vec::new();
        if input.peek(syn::token::Brace) {
            let field_content;
            braced!(field_content in input);
            while !field_content.is_empty() {
                let field_name = field_content.parse::<Ident>()?;
                field_content.parse::<Token![:]>()?;
                let field_type = field_content.parse::<Type>()?;
                fields.push((field_name, field_type));
                if field_content.peek(Token![,]) {
                    field_content.parse::<Token![,]>()?;
                }
            }
        }

        input.parse::<Token![=>]>()?;
        let level = input.parse::<Expr>()?;

        Ok(EntryVariant {
            attributes,
            message,
            name,
            fields,
            level,
        })
    }
}
