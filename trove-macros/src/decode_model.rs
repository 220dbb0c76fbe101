use crate::decode_field::{ColumnMetadata, FieldRole, decode_field};
use syn::{Error, Fields, Ident, ItemStruct, LitStr, Result, Type, parse::ParseBuffer};

pub(crate) struct ModelMetadata {
    pub(crate) table: String,
    pub(crate) columns: Vec<ColumnMetadata>,
    pub(crate) parents: Vec<(Ident, Type)>,
}

pub(crate) fn decode_model(item: &ItemStruct) -> Result<ModelMetadata> {
    let mut table = item.ident.to_string();
    for attr in &item.attrs {
        if !attr.path().is_ident("trove") {
            continue;
        }
        attr.parse_nested_meta(|arg| {
            if arg.path.is_ident("table") {
                table = arg
                    .value()
                    .and_then(ParseBuffer::parse::<LitStr>)
                    .map_err(|_| {
                        arg.error(
                            "Error while parsing `table`, use it like: `#[trove(table = \"users\")]`",
                        )
                    })?
                    .value();
                Ok(())
            } else {
                Err(arg.error("Unknown attribute inside trove macro, expected `table`"))
            }
        })?;
    }
    if table.is_empty() {
        return Err(Error::new(item.ident.span(), "The table name cannot be empty"));
    }
    let Fields::Named(fields) = &item.fields else {
        return Err(Error::new(
            item.ident.span(),
            "Model can only be derived for structs with named fields",
        ));
    };
    let mut columns = Vec::<ColumnMetadata>::new();
    let mut parents = Vec::new();
    for field in &fields.named {
        match decode_field(field)? {
            FieldRole::Column(column) => {
                if columns.iter().any(|v| v.name == column.name) {
                    return Err(Error::new(
                        column.ident.span(),
                        format!("Column `{}` is declared twice", column.name),
                    ));
                }
                columns.push(column);
            }
            FieldRole::Parent { ident, ty } => parents.push((ident, ty)),
            FieldRole::Ignored => {}
        }
    }
    if columns.iter().filter(|v| v.primary_key).count() > 1 {
        return Err(Error::new(
            item.ident.span(),
            "A model can declare at most one `primary_key`",
        ));
    }
    Ok(ModelMetadata {
        table,
        columns,
        parents,
    })
}
