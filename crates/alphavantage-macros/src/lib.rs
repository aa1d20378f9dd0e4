mod csv_record;

use syn::{parse_macro_input, DeriveInput};

/// Derives `CsvRecord` for a struct with named fields.
///
/// Fields tagged `#[csv(column = "name")]` are filled from the CSV column of
/// that name; time fields may add `layout = "..."` with a `time` format
/// description. Untagged fields keep their `Default` value.
#[proc_macro_derive(CsvRecord, attributes(csv))]
pub fn derive_csv_record(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    csv_record::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
