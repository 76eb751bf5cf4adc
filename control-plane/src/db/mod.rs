pub mod models;
mod repo;

pub use models::{GameImage, Server, Transaction, TransactionKind, User};
pub use repo::Repo;
