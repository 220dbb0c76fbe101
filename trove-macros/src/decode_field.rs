use proc_macro2::Span;
use quote::ToTokens;
use syn::{
    Error, Field, Ident, Lit, LitStr, Result, Token, Type, Visibility, parse::ParseBuffer,
    spanned::Spanned,
};
use trove_core::{ValueKind, decode_type};

pub(crate) enum FieldRole {
    /// Persisted as a column.
    Column(ColumnMetadata),
    /// Embedded model whose fields follow the own ones.
    Parent { ident: Ident, ty: Type },
    Ignored,
}

pub(crate) struct ColumnMetadata {
    pub(crate) ident: Ident,
    pub(crate) name: String,
    pub(crate) kind: ValueKind,
    pub(crate) primary_key: bool,
    pub(crate) autoincrement: bool,
    pub(crate) not_null: bool,
    pub(crate) default: Option<String>,
    pub(crate) unique: Vec<String>,
    pub(crate) private: bool,
}

fn default_literal(lit: &Lit) -> Result<String> {
    Ok(match lit {
        Lit::Str(v) => v.value(),
        Lit::Int(v) => v.base10_digits().to_string(),
        Lit::Float(v) => v.base10_digits().to_string(),
        Lit::Bool(v) => if v.value { "1" } else { "0" }.to_string(),
        Lit::Char(v) => v.value().to_string(),
        _ => {
            return Err(Error::new(
                lit.span(),
                "Error while parsing `default`, use a string, number or boolean literal",
            ));
        }
    })
}

pub(crate) fn decode_field(field: &Field) -> Result<FieldRole> {
    let Some(ident) = field.ident.clone() else {
        return Err(Error::new(
            field.span(),
            "Model fields must be named, tuple structs are not supported",
        ));
    };
    let mut name = ident.to_string();
    if let Some(stripped) = name.strip_prefix("r#") {
        name = stripped.to_string();
    }
    let mut primary_key = false;
    let mut autoincrement = false;
    let mut not_null = false;
    let mut default = None;
    let mut unique = Vec::new();
    let mut ignore = false;
    let mut parent = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("trove") {
            continue;
        }
        attr.parse_nested_meta(|arg| {
            let has_value = arg.input.peek(Token![=]);
            let flag = |attribute: &str| -> Result<()> {
                if has_value {
                    Err(arg.error(format!(
                        "Error while parsing `{attribute}`, use it like: `#[trove({attribute})]`"
                    )))
                } else {
                    Ok(())
                }
            };
            if arg.path.is_ident("primary_key") {
                flag("primary_key")?;
                primary_key = true;
            } else if arg.path.is_ident("autoincrement") {
                flag("autoincrement")?;
                autoincrement = true;
            } else if arg.path.is_ident("not_null") {
                flag("not_null")?;
                not_null = true;
            } else if arg.path.is_ident("ignore") {
                flag("ignore")?;
                ignore = true;
            } else if arg.path.is_ident("parent") {
                flag("parent")?;
                parent = true;
            } else if arg.path.is_ident("unique") {
                let group = if has_value {
                    arg.value()
                        .and_then(ParseBuffer::parse::<LitStr>)?
                        .value()
                } else {
                    "default".to_string()
                };
                if !unique.contains(&group) {
                    unique.push(group);
                }
            } else if arg.path.is_ident("default") {
                let lit = arg.value().and_then(ParseBuffer::parse::<Lit>)?;
                default = Some(default_literal(&lit)?);
            } else if arg.path.is_ident("name") {
                name = arg
                    .value()
                    .and_then(ParseBuffer::parse::<LitStr>)
                    .map_err(|_| {
                        arg.error(
                            "Error while parsing `name`, use it like: `#[trove(name = \"column\")]`",
                        )
                    })?
                    .value();
            } else {
                return Err(arg.error(format!(
                    "Unknown attribute `{}` inside trove macro",
                    arg.path.to_token_stream()
                )));
            }
            Ok(())
        })?;
    }
    if ignore {
        return Ok(FieldRole::Ignored);
    }
    if parent {
        return Ok(FieldRole::Parent {
            ident,
            ty: field.ty.clone(),
        });
    }
    if autoincrement && !primary_key {
        return Err(Error::new(
            ident.span(),
            "`autoincrement` requires the field to be the `primary_key`",
        ));
    }
    if name.is_empty() {
        return Err(Error::new(Span::call_site(), "Column names cannot be empty"));
    }
    Ok(FieldRole::Column(ColumnMetadata {
        kind: decode_type(&field.ty)?,
        private: matches!(field.vis, Visibility::Inherited),
        ident,
        name,
        primary_key,
        autoincrement,
        not_null,
        default,
        unique,
    }))
}
