use proc_macro2::Ident;
use quote::ToTokens;
use syn::{
    Expr, ExprLit, Field, GenericArgument, Lit, LitStr, Meta, PathArguments, Token, Type,
    ext::IdentExt, parse::ParseBuffer, punctuated::Punctuated,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    /// Maps to one column through `AsValue`.
    Value,
    /// `Vec<String>`, one nullable text column holding the first element.
    RepeatedText,
    /// Nested record whose columns are spliced in place.
    Flatten,
}

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) name: String,
    pub(crate) extra: String,
    pub(crate) kind: FieldKind,
}

pub fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Field is expected to have a name");
    let mut name = None;
    let mut renamed = None;
    let mut extra = String::new();
    let mut kind = if is_repeated_text(&field.ty) {
        FieldKind::RepeatedText
    } else {
        FieldKind::Value
    };
    for attr in &field.attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("tabula") {
            let Ok(list) = meta.require_list() else {
                panic!(
                    "Error while parsing `tabula`, use it like: `#[tabula(attribute = value, ...)]`"
                );
            };
            let _ = list.parse_nested_meta(|arg| {
                if arg.path.is_ident("name") {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!(
                            "Error while parsing `name`, use it like: `#[tabula(name = \"my_column\")]`"
                        );
                    };
                    name = Some(v.value());
                } else if arg.path.is_ident("extra") {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!(
                            "Error while parsing `extra`, use it like: `#[tabula(extra = \"UNIQUE\")]`"
                        );
                    };
                    extra = v.value().trim().to_string();
                } else if arg.path.is_ident("flatten") {
                    let Err(..) = arg.value() else {
                        // value() is Err for Meta::Path
                        panic!("Error while parsing `flatten`, use it like: `#[tabula(flatten)]`");
                    };
                    kind = FieldKind::Flatten;
                } else {
                    panic!(
                        "Unknown attribute `{}` inside tabula macro",
                        arg.path.to_token_stream()
                    );
                }
                Ok(())
            });
        } else if meta.path().is_ident("serde") {
            renamed = renamed.or_else(|| serde_rename(meta));
        }
    }
    let name = name
        .or(renamed)
        .unwrap_or_else(|| ident.unraw().to_string());
    FieldMetadata {
        ident,
        ty: field.ty.clone(),
        name,
        extra,
        kind,
    }
}

/// The value of `#[serde(rename = "...")]`, other serde arguments are ignored.
fn serde_rename(meta: &Meta) -> Option<String> {
    let list = meta.require_list().ok()?;
    let args = list
        .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
        .ok()?;
    args.into_iter().find_map(|arg| match arg {
        Meta::NameValue(v) if v.path.is_ident("rename") => match v.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(v), ..
            }) => Some(v.value()),
            _ => None,
        },
        _ => None,
    })
}

fn is_repeated_text(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    let Some(last) = type_path.path.segments.last() else {
        return false;
    };
    if last.ident != "Vec" {
        return false;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return false;
    };
    matches!(
        args.args.first(),
        Some(GenericArgument::Type(Type::Path(inner)))
            if inner.path.segments.last().is_some_and(|v| v.ident == "String")
    )
}
