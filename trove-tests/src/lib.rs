mod measurements;
mod notes;
mod nullability;
#[cfg(not(feature = "disable-transactions"))]
mod transactions;
mod users;

use crate::{
    measurements::measurements, notes::notes, nullability::nullability, users::users,
};
use log::LevelFilter;
use std::env;
#[cfg(not(feature = "disable-transactions"))]
use transactions::transactions;
use trove::{Repository, Store};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run every scenario against `store`. The synchronous ones use the database of the
/// repository directly, the others go through its worker pool.
pub async fn execute_tests<S: Store>(store: S) {
    let repository = Repository::new(store).expect("Could not start the repository");
    let database = repository.database();
    users(database);
    nullability(database);
    measurements(database);
    #[cfg(not(feature = "disable-transactions"))]
    transactions(database);
    notes(&repository).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
