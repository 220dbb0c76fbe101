use crate::{ValueKind, matches_path};
use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{GenericArgument, PathArguments, Type, TypePath};

/// Kind of a field type as written in the model declaration.
///
/// `Option<T>` yields the nullable twin of `T`. Nested options are rejected.
pub fn decode_type(ty: &Type) -> syn::Result<ValueKind> {
    let unsupported = || {
        syn::Error::new_spanned(
            ty,
            format!(
                "Type `{}` has no column mapping",
                ty.to_token_stream().to_string().replace(' ', "")
            ),
        )
    };
    let Type::Path(TypePath { path, qself: None }) = ty else {
        return Err(unsupported());
    };
    if let Some(ident) = path.get_ident() {
        if ident == "bool" {
            return Ok(ValueKind::Bool);
        } else if ident == "i16" {
            return Ok(ValueKind::Short);
        } else if ident == "i32" {
            return Ok(ValueKind::Int);
        } else if ident == "i64" {
            return Ok(ValueKind::Long);
        } else if ident == "f32" {
            return Ok(ValueKind::Float);
        } else if ident == "f64" {
            return Ok(ValueKind::Double);
        } else if ident == "char" {
            return Ok(ValueKind::Char);
        }
    }
    if matches_path(path, &["std", "string", "String"]) {
        return Ok(ValueKind::Text);
    }
    let is_vec = matches_path(path, &["std", "vec", "Vec"]);
    let is_option = matches_path(path, &["std", "option", "Option"]);
    if !is_vec && !is_option {
        return Err(unsupported());
    }
    let Some(segment) = path.segments.last() else {
        return Err(unsupported());
    };
    let PathArguments::AngleBracketed(bracketed) = &segment.arguments else {
        return Err(unsupported());
    };
    let Some(GenericArgument::Type(inner)) = bracketed.args.first() else {
        return Err(unsupported());
    };
    if is_vec {
        return match inner {
            Type::Path(TypePath { path, .. }) if path.is_ident("u8") => Ok(ValueKind::Blob),
            _ => Err(unsupported()),
        };
    }
    let inner = decode_type(inner)?;
    if inner.is_nullable() {
        return Err(unsupported());
    }
    Ok(inner.nullable())
}

impl ToTokens for ValueKind {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let variant = match self {
            ValueKind::Text => quote!(Text),
            ValueKind::TextOpt => quote!(TextOpt),
            ValueKind::Char => quote!(Char),
            ValueKind::CharOpt => quote!(CharOpt),
            ValueKind::Short => quote!(Short),
            ValueKind::ShortOpt => quote!(ShortOpt),
            ValueKind::Int => quote!(Int),
            ValueKind::IntOpt => quote!(IntOpt),
            ValueKind::Long => quote!(Long),
            ValueKind::LongOpt => quote!(LongOpt),
            ValueKind::Float => quote!(Float),
            ValueKind::FloatOpt => quote!(FloatOpt),
            ValueKind::Double => quote!(Double),
            ValueKind::DoubleOpt => quote!(DoubleOpt),
            ValueKind::Bool => quote!(Bool),
            ValueKind::BoolOpt => quote!(BoolOpt),
            ValueKind::Blob => quote!(Blob),
            ValueKind::BlobOpt => quote!(BlobOpt),
        };
        tokens.extend(quote!(::trove::ValueKind::#variant));
    }
}
