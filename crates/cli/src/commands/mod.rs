//! Command implementations.

mod inspect;
mod prepare;
mod search;
mod validate;
mod worker;

pub use inspect::run_inspect;
pub use prepare::run_prepare;
pub use search::run_search;
pub use validate::run_validate;
pub use worker::run_worker;
