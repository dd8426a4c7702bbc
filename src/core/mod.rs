pub mod checksum;
pub mod engine;
pub mod ledger;
pub mod lock;
pub mod runner;

pub use crate::domain::model::{ChangeEntry, ChangeState, Document, Filter, MigrationReport};
pub use crate::domain::ports::{ChangeUnit, DocumentStore};
pub use crate::utils::error::Result;
