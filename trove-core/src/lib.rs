mod as_value;
mod database;
mod decode_type;
mod descriptor;
mod error;
mod marshal;
mod model;
mod pool;
mod repository;
mod row;
mod selection;
mod session;
mod sql_writer;
mod store;
mod util;
mod value;
mod value_kind;

pub use ::anyhow::Context;
pub use as_value::*;
pub use database::*;
pub use decode_type::*;
pub use descriptor::*;
pub use error::*;
pub use marshal::*;
pub use model::*;
pub use pool::*;
pub use repository::*;
pub use row::*;
pub use selection::*;
pub use session::*;
pub use sql_writer::*;
pub use store::*;
pub use util::*;
pub use value::*;
pub use value_kind::*;
pub mod future {
    pub use ::futures::future::*;
}

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
