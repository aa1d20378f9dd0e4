use proc_macro2::Span;
use proc_macro_crate::{crate_name, FoundCrate};
use syn::{Attribute, Ident, LitStr, Path};

/// Path to the runtime crate, whether the derive runs inside it or in a dependent.
pub(crate) fn resolve_core_path() -> Path {
    let found = crate_name("alphavantage-core").unwrap_or(FoundCrate::Itself);
    match found {
        FoundCrate::Itself => syn::parse_quote! { alphavantage_core },
        FoundCrate::Name(name) => {
            let ident = Ident::new(&name, Span::call_site());
            syn::parse_quote! { #ident }
        }
    }
}

/// Contents of one `#[csv(...)]` attribute.
#[derive(Default)]
pub(crate) struct ColumnAttr {
    pub(crate) column: Option<LitStr>,
    pub(crate) layout: Option<LitStr>,
}

pub(crate) fn column_attr(attrs: &[Attribute]) -> syn::Result<Option<ColumnAttr>> {
    let mut found: Option<ColumnAttr> = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("csv")) {
        if found.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[csv] attribute"));
        }
        let mut parsed = ColumnAttr::default();
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                parsed.column = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("layout") {
                parsed.layout = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `column` or `layout`"))
            }
        })?;
        if parsed.column.is_none() {
            return Err(syn::Error::new_spanned(attr, "#[csv] requires `column = \"...\"`"));
        }
        found = Some(parsed);
    }
    Ok(found)
}
