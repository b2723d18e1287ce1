//! Listings core for a student-housing marketplace: searchable properties,
//! temporary stays and roommate ads, plus the controller that mirrors a
//! property into a hospitality stay.

pub mod config;
pub mod criteria;
pub mod error;
pub mod ids;
pub mod models;
pub mod pagination;
pub mod predicate;
pub mod services;
pub mod storage;
pub mod users;

pub use config::{init_logger, Config, ConfigError};
pub use criteria::{Criteria, PropertyCriteria, RoommateCriteria, TemporaryStayCriteria};
pub use error::{ServiceError, ServiceResult, StoreError};
pub use pagination::{Page, PageRequest};
pub use predicate::Predicate;
pub use services::{ServiceDeps, Services};
pub use storage::{MemoryStore, MongoStore, Store, Transaction};
pub use users::{Actor, UserLookup};
