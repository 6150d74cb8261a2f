use crate::decode_field::{FieldKind, FieldMetadata};
use proc_macro2::TokenStream;
use quote::quote;

pub fn encode_field_def(metadata: &FieldMetadata) -> TokenStream {
    let ty = &metadata.ty;
    let name = &metadata.name;
    let extra = &metadata.extra;
    match metadata.kind {
        FieldKind::Value => quote! {
            fields.push(
                ::tabula::FieldDef::new(
                    #name,
                    <#ty as ::tabula::AsValue>::KIND,
                    <#ty as ::tabula::AsValue>::NULLABLE,
                )
                .with_extra(#extra),
            );
        },
        FieldKind::RepeatedText => quote! {
            fields.push(
                ::tabula::FieldDef::new(#name, ::tabula::SqlKind::Text, true).with_extra(#extra),
            );
        },
        FieldKind::Flatten => quote! {
            fields.extend_from_slice(<#ty as ::tabula::Record>::fields());
        },
    }
}

pub fn encode_value(metadata: &FieldMetadata) -> TokenStream {
    let ident = &metadata.ident;
    match metadata.kind {
        FieldKind::Value => quote! {
            values.push(::tabula::AsValue::as_value(::std::clone::Clone::clone(&self.#ident)));
        },
        FieldKind::RepeatedText => quote! {
            values.push(::tabula::AsValue::as_value(self.#ident.first().cloned()));
        },
        FieldKind::Flatten => quote! {
            values.extend(::tabula::Record::values(&self.#ident).into_vec());
        },
    }
}

pub fn encode_target(metadata: &FieldMetadata) -> TokenStream {
    let ident = &metadata.ident;
    match metadata.kind {
        FieldKind::Value | FieldKind::RepeatedText => quote! {
            targets.push(&mut self.#ident);
        },
        FieldKind::Flatten => quote! {
            targets.extend(::tabula::Record::targets(&mut self.#ident));
        },
    }
}
