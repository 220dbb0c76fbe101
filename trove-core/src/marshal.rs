use crate::{
    AsValue, ColumnMap, FieldScope, Model, ModelDescriptor, OrmError, Result, RowLabeled, Value,
    ValueKind,
};

fn collect<M: Model>(
    model: &M,
    descriptor: &ModelDescriptor,
    scope: FieldScope,
) -> Result<ColumnMap> {
    let mut row = ColumnMap::with_capacity(descriptor.fields(scope).count());
    for field in descriptor.fields(scope) {
        let Some(value) = model.field(field.name) else {
            return Err(OrmError::FieldAccess {
                model: descriptor.model().to_owned(),
                field: field.name.to_owned(),
            }
            .into());
        };
        row.insert(field.name, value);
    }
    Ok(row)
}

/// Every field of `model`, private ones included.
pub fn to_row<M: Model>(model: &M) -> Result<ColumnMap> {
    collect(model, M::describe()?, FieldScope::All)
}

/// The fields of `model` that are backed by a column.
pub fn to_storage_row<M: Model>(model: &M) -> Result<ColumnMap> {
    collect(model, M::describe()?, FieldScope::Storage)
}

/// Storage row of `model` as written by inserts: an autoincrement key that is still
/// empty (NULL or 0) is left out so that the store generates it.
pub fn to_insert_row<M: Model>(model: &M) -> Result<ColumnMap> {
    let descriptor = M::describe()?;
    let mut row = collect(model, descriptor, FieldScope::Storage)?;
    if let Some(pk) = descriptor.primary_key().filter(|v| v.is_passive()) {
        if matches!(row.get(pk.name), Some(Value::Null | Value::Integer(0))) {
            row.remove(pk.name);
        }
    }
    Ok(row)
}

/// Build a `M` from `row`.
///
/// Fields whose column is not in the row keep their zero value, a projection that
/// selects only some columns is not an error.
pub fn from_row<M: Model>(row: &RowLabeled) -> Result<M> {
    let descriptor = M::describe()?;
    let mut result = M::instantiate().map_err(|e| {
        e.context(OrmError::Instantiation {
            model: descriptor.model().to_owned(),
        })
    })?;
    for field in descriptor.fields(FieldScope::All) {
        let value = match field.kind.extract(row, field.name) {
            Ok(v) => v,
            Err(e) if matches!(OrmError::of(&e), Some(OrmError::ColumnNotFound { .. })) => {
                continue;
            }
            Err(e) => return Err(e),
        };
        result.set_field(field.name, value).map_err(|e| {
            e.context(OrmError::FieldAccess {
                model: descriptor.model().to_owned(),
                field: field.name.to_owned(),
            })
        })?;
    }
    Ok(result)
}

/// Cell at position `index` of `row`, read as `kind`.
pub fn from_row_column(kind: ValueKind, row: &RowLabeled, index: usize) -> Result<Value> {
    kind.extract_index(row, index)
}

/// Cell at position `index` of `row`, converted to `T`.
pub fn from_row_column_as<T: AsValue>(row: &RowLabeled, index: usize) -> Result<T> {
    T::try_from_value(from_row_column(T::KIND, row, index)?)
}
