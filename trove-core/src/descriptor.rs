use crate::{ColumnType, Model, OrmError, Result, ValueKind};

/// Whether a field takes part in storage.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Public,
    /// Round-tripped by the marshaller but never part of a table.
    Private,
}

/// Which fields of a descriptor to walk.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    /// Fields backed by a column.
    #[default]
    Storage,
    /// Storage fields and private ones.
    All,
}

/// Declarative specification of one persisted field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field and column name.
    pub name: &'static str,
    pub kind: ValueKind,
    pub primary_key: bool,
    /// Key generated by the store when left empty.
    pub autoincrement: bool,
    pub not_null: bool,
    /// Literal rendered inside `DEFAULT '...'`.
    pub default: Option<String>,
    /// Unique groups this field belongs to, in declaration order.
    pub unique: Vec<&'static str>,
    pub visibility: Visibility,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            primary_key: false,
            autoincrement: false,
            not_null: false,
            default: None,
            unique: Vec::new(),
            visibility: Visibility::Public,
        }
    }
    pub fn primary_key(mut self, autoincrement: bool) -> Self {
        self.primary_key = true;
        self.autoincrement = autoincrement;
        self
    }
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }
    pub fn unique(mut self, group: &'static str) -> Self {
        if !self.unique.contains(&group) {
            self.unique.push(group);
        }
        self
    }
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }
    pub fn column_type(&self) -> ColumnType {
        self.kind.column_type()
    }
    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }
    /// Column left out of inserts so the store generates it.
    pub fn is_passive(&self) -> bool {
        self.primary_key && self.autoincrement
    }
}

/// Set of columns whose combined values are unique across rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueGroup {
    pub name: &'static str,
    pub columns: Vec<&'static str>,
}

/// Collects the fields of a model in registration order.
#[derive(Debug)]
pub struct DescriptorBuilder {
    model: &'static str,
    table: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl DescriptorBuilder {
    pub fn new(model: &'static str, table: &'static str) -> Self {
        Self {
            model,
            table,
            fields: Vec::new(),
        }
    }

    /// Append a field, unless one with the same name was registered already.
    pub fn field(&mut self, field: FieldDescriptor) -> &mut Self {
        if self.fields.iter().any(|v| v.name == field.name) {
            log::warn!(
                "Field `{}` of model `{}` is shadowed by a field registered earlier",
                field.name,
                self.model,
            );
        } else {
            self.fields.push(field);
        }
        self
    }

    /// Register the fields of the embedded parent model `P` after the ones already present.
    pub fn inherit<P: Model>(&mut self) -> &mut Self {
        P::register(self);
        self
    }

    pub fn build(self) -> Result<ModelDescriptor> {
        let model = self.model;
        let schema = |reason: String| -> crate::Error {
            OrmError::Schema {
                model: model.to_owned(),
                reason,
            }
            .into()
        };
        if self.table.is_empty() {
            return Err(schema("the table name is empty".into()));
        }
        if !self.fields.iter().any(|v| !v.is_private()) {
            return Err(schema("it has no accessible persisted fields".into()));
        }
        let mut primary_key = None;
        for (i, field) in self.fields.iter().enumerate() {
            if field.autoincrement && !field.primary_key {
                return Err(schema(format!(
                    "field `{}` is autoincrement but it is not the primary key",
                    field.name
                )));
            }
            if !field.primary_key {
                continue;
            }
            if let Some(previous) = primary_key.replace(i) {
                return Err(schema(format!(
                    "both `{}` and `{}` are declared as primary key",
                    self.fields[previous].name, field.name
                )));
            }
            if field.is_private() {
                return Err(schema(format!(
                    "the primary key `{}` is a private field",
                    field.name
                )));
            }
            if field.autoincrement && !field.kind.is_integer() {
                return Err(schema(format!(
                    "the autoincrement primary key `{}` is not an integer ({:?})",
                    field.name, field.kind
                )));
            }
        }
        let mut unique_groups = Vec::<UniqueGroup>::new();
        for field in self.fields.iter().filter(|v| !v.is_private()) {
            for &group in &field.unique {
                match unique_groups.iter_mut().find(|v| v.name == group) {
                    Some(v) => v.columns.push(field.name),
                    None => unique_groups.push(UniqueGroup {
                        name: group,
                        columns: vec![field.name],
                    }),
                }
            }
        }
        Ok(ModelDescriptor {
            model,
            table: self.table,
            fields: self.fields.into(),
            primary_key,
            unique_groups: unique_groups.into(),
        })
    }
}

/// Persisted shape of a model, built once per type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    model: &'static str,
    table: &'static str,
    fields: Box<[FieldDescriptor]>,
    primary_key: Option<usize>,
    unique_groups: Box<[UniqueGroup]>,
}

impl ModelDescriptor {
    /// Short type name of the model.
    pub fn model(&self) -> &'static str {
        self.model
    }
    pub fn table(&self) -> &'static str {
        self.table
    }
    pub fn fields(&self, scope: FieldScope) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(move |v| scope == FieldScope::All || !v.is_private())
    }
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|v| v.name == name)
    }
    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.primary_key.map(|i| &self.fields[i])
    }
    /// Primary key, or `NoPrimaryKey` when the model does not declare one.
    pub fn require_primary_key(&self) -> Result<&FieldDescriptor> {
        self.primary_key().ok_or_else(|| {
            OrmError::NoPrimaryKey {
                model: self.model.to_owned(),
            }
            .into()
        })
    }
    pub fn unique_groups(&self) -> &[UniqueGroup] {
        &self.unique_groups
    }
}
