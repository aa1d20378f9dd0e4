mod parse;

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, LitStr};

use parse::{column_attr, resolve_core_path};

pub(crate) fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "CsvRecord cannot be derived for generic types",
        ));
    }
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "CsvRecord requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "CsvRecord can only be derived for structs",
            ))
        }
    };

    let core = resolve_core_path();
    let name = &input.ident;

    let mut specs = Vec::new();
    let mut inits = Vec::new();
    let mut arms = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let Some(attr) = column_attr(&field.attrs)? else {
            inits.push(quote! { #ident: ::core::default::Default::default() });
            continue;
        };

        let index = specs.len();
        let field_name = LitStr::new(&ident.unraw().to_string(), ident.span());
        let column = attr.column;
        let layout = match attr.layout {
            Some(layout) => quote! { ::core::option::Option::Some(#layout) },
            None => quote! { ::core::option::Option::None },
        };
        specs.push(quote! {
            #core::decoder::FieldSpec::new(
                #field_name,
                #column,
                <#ty as #core::decoder::CsvValue>::KIND,
                #layout,
            )
        });
        inits.push(quote! { #ident: <#ty as #core::decoder::CsvValue>::zero() });
        arms.push(quote! {
            #index => {
                if let ::core::option::Option::Some(value) =
                    <#ty as #core::decoder::CsvValue>::from_value(value)
                {
                    self.#ident = value;
                }
            }
        });
    }

    Ok(quote! {
        impl #core::decoder::CsvRecord for #name {
            fn schema() -> ::core::result::Result<
                &'static #core::decoder::RecordSchema,
                #core::decoder::DecodeError,
            > {
                static SCHEMA: ::std::sync::OnceLock<
                    ::core::result::Result<#core::decoder::RecordSchema, #core::decoder::DecodeError>,
                > = ::std::sync::OnceLock::new();
                SCHEMA
                    .get_or_init(|| #core::decoder::RecordSchema::build(::std::vec![#(#specs),*]))
                    .as_ref()
                    .map_err(::core::clone::Clone::clone)
            }

            fn empty() -> Self {
                Self { #(#inits),* }
            }

            #[allow(unused_variables)]
            fn assign(&mut self, index: usize, value: #core::decoder::FieldValue) {
                match index {
                    #(#arms)*
                    _ => {}
                }
            }
        }
    })
}
