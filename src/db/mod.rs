pub mod apply;
pub mod pool;
pub mod sql_script;

pub use apply::apply_script;
pub use pool::create_pool;
pub use sql_script::{generate_sql, persist_script, write_script, SqlScript};
