mod cbox;
mod connection;
mod cursor;
mod extract;
mod prepared;
mod sql_writer;
mod store;

use std::ffi::{CStr, c_char};

pub(crate) use cbox::*;
pub use connection::*;
pub use cursor::*;
pub use prepared::*;
pub use sql_writer::*;
pub use store::*;

pub(crate) fn error_message_from_ptr<'a>(ptr: *const c_char) -> &'a str {
    unsafe {
        if !ptr.is_null() {
            CStr::from_ptr(ptr)
                .to_str()
                .unwrap_or("Unknown error (the error message was not a valid C string)")
        } else {
            "Unknown error (could not extract the error message)"
        }
    }
}
