mod decode_field;
mod encode_record;

use decode_field::{FieldKind, decode_field};
use encode_record::{encode_field_def, encode_target, encode_value};
use proc_macro::TokenStream;
use quote::quote;
use syn::{Fields, ItemStruct, parse_macro_input};

/// Implements `tabula::Record` for a struct with named fields.
///
/// The first field is the primary key. Field attributes:
/// - `#[tabula(name = "column")]` column name, otherwise `#[serde(rename = "...")]`
///   is honored, otherwise the field name is used.
/// - `#[tabula(extra = "UNIQUE")]` DDL appended after the column type.
/// - `#[tabula(flatten)]` splices the columns of a nested record, first field only.
#[proc_macro_derive(Record, attributes(tabula))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let name = &item.ident;
    if !item.generics.params.is_empty() {
        panic!("Record `{}` cannot have generic parameters", name);
    }
    let Fields::Named(fields) = &item.fields else {
        panic!("Record `{}` must be a struct with named fields", name);
    };
    if fields.named.is_empty() {
        panic!("Record `{}` must have at least one field", name);
    }
    let metadata = fields.named.iter().map(decode_field).collect::<Vec<_>>();
    if let Some(field) = metadata
        .iter()
        .skip(1)
        .find(|m| m.kind == FieldKind::Flatten)
    {
        panic!(
            "Field `{}` of `{}` cannot be flattened, only the first field of a record can",
            field.ident, name
        );
    }
    let field_defs = metadata.iter().map(encode_field_def);
    let values = metadata.iter().map(encode_value);
    let targets = metadata.iter().map(encode_target);
    quote! {
        impl ::tabula::Record for #name {
            fn fields() -> &'static [::tabula::FieldDef] {
                static FIELDS: ::std::sync::LazyLock<::std::boxed::Box<[::tabula::FieldDef]>> =
                    ::std::sync::LazyLock::new(|| {
                        let mut fields = ::std::vec::Vec::<::tabula::FieldDef>::new();
                        #(#field_defs)*
                        fields.into_boxed_slice()
                    });
                &FIELDS
            }

            fn values(&self) -> ::tabula::Row {
                let mut values = ::std::vec::Vec::<::tabula::Value>::new();
                #(#values)*
                values.into_boxed_slice()
            }

            fn targets(&mut self) -> ::std::vec::Vec<&mut dyn ::tabula::ScanTarget> {
                let mut targets = ::std::vec::Vec::<&mut dyn ::tabula::ScanTarget>::new();
                #(#targets)*
                targets
            }
        }
    }
    .into()
}
