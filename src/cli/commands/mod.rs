//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod evaluate;
mod ingest;
mod serve;
mod status;

pub use ask::{run_ask, run_compare};
pub use config::run_config;
pub use doctor::run_doctor;
pub use evaluate::run_evaluate;
pub use ingest::run_ingest;
pub use serve::{router, run_serve, AppState};
pub use status::{run_namespaces, run_status};
