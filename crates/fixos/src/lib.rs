//! `fixos` - Repair-shop management with local-first, optionally mirrored storage
//!
//! This library provides the records of a small repair shop (customers,
//! equipment, service orders, inventory, sales and accounts), stored in a
//! local `SQLite` database and, in cloud mode, mirrored to `PostgreSQL`.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod accounts;
pub mod assistant;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod model;
pub mod money;
pub mod notify;
pub mod orders;
pub mod print;
pub mod remote;
pub mod reports;
pub mod repository;
pub mod sales;
pub mod settings;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{
    Collection, Customer, Entity, Equipment, FinancialAccount, OrderStatus, Product, Sale,
    ServiceOrder, Supplier,
};
pub use remote::{MemoryRemote, PgRemote, RemoteStore};
pub use repository::{Repository, SyncReport};
pub use storage::{Storage, StorageStats};
