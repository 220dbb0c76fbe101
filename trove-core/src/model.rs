use crate::{DescriptorBuilder, ModelDescriptor, OrmError, Result, Value, short_type_name};
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{LazyLock, PoisonError, RwLock},
};

/// A plain struct persisted as a table row.
///
/// Usually implemented with `#[derive(Model)]`, which registers every field together
/// with its metadata and generates the by-name accessors the marshaller uses.
pub trait Model: Sized + Send + 'static {
    /// Table bound to this model.
    const TABLE: &'static str;

    /// Register the fields, own ones first, then the ones of the embedded parents.
    fn register(builder: &mut DescriptorBuilder);

    /// Zero value the read path starts from.
    fn instantiate() -> Result<Self>;

    /// Current value of the field `name`.
    fn field(&self, name: &str) -> Option<Value>;

    /// Overwrite the field `name`. The value was already coerced to the kind of the field.
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    fn describe() -> Result<&'static ModelDescriptor> {
        describe::<Self>()
    }
}

#[derive(Default)]
struct Registry {
    by_type: HashMap<TypeId, &'static ModelDescriptor>,
    /// Owning model per table, keyed by the ASCII lowercase name as sqlite compares them.
    by_table: HashMap<String, &'static str>,
}

static REGISTRY: LazyLock<RwLock<Registry>> = LazyLock::new(Default::default);

/// Descriptor of `M`, built on first use and cached for the process lifetime.
pub fn describe<M: Model>() -> Result<&'static ModelDescriptor> {
    let id = TypeId::of::<M>();
    if let Some(descriptor) = REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_type
        .get(&id)
        .copied()
    {
        return Ok(descriptor);
    }
    let model = short_type_name::<M>();
    let mut builder = DescriptorBuilder::new(model, M::TABLE);
    M::register(&mut builder);
    let descriptor = builder.build()?;
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(descriptor) = registry.by_type.get(&id).copied() {
        return Ok(descriptor);
    }
    let table = M::TABLE.to_ascii_lowercase();
    if let Some(existing) = registry.by_table.get(&table) {
        return Err(OrmError::TableNameCollision {
            table: M::TABLE.to_owned(),
            existing: (*existing).to_owned(),
            model: std::any::type_name::<M>().to_owned(),
        }
        .into());
    }
    let descriptor: &'static ModelDescriptor = Box::leak(Box::new(descriptor));
    registry.by_type.insert(id, descriptor);
    registry
        .by_table
        .insert(table, std::any::type_name::<M>());
    log::debug!(
        "Registered model `{}` on table `{}` with {} fields",
        model,
        M::TABLE,
        descriptor.fields(crate::FieldScope::All).count()
    );
    Ok(descriptor)
}
