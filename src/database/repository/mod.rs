use std::collections::HashMap;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::database::manager::DatabaseError;
use crate::database::pagination::{PageRequest, Paginated};

pub mod compost;
pub mod irrigation;
pub mod machine_codes;
pub mod soil;
pub mod users;

pub use compost::{CompostFilter, CompostRepository};
pub use irrigation::{IrrigationFilter, IrrigationRepository};
pub use machine_codes::{MachineCodeError, MachineCodeRepository};
pub use soil::{SoilFilter, SoilRepository};
pub use users::{CredentialError, UserRepository};

/// A per-user record collection: every read and write is scoped to `owner`,
/// and a record owned by someone else is indistinguishable from a missing one.
#[async_trait]
pub trait OwnedRecords: Clone + Send + Sync + 'static {
    type Input: DeserializeOwned + Send + Sync + 'static;
    type Record: Serialize + Send + 'static;
    type Filter: Send + Sync + 'static;

    /// Human-readable entity name used in not-found messages.
    const ENTITY: &'static str;

    async fn create(&self, owner: i64, input: &Self::Input) -> Result<Self::Record, DatabaseError>;

    async fn get(&self, owner: i64, id: i64) -> Result<Self::Record, DatabaseError>;

    async fn list(
        &self,
        owner: i64,
        filter: &Self::Filter,
        page: PageRequest,
    ) -> Result<Paginated<Self::Record>, DatabaseError>;

    /// Replaces the record and its whole child set.
    async fn update(&self, owner: i64, id: i64, input: &Self::Input) -> Result<Self::Record, DatabaseError>;

    async fn delete(&self, owner: i64, id: i64) -> Result<(), DatabaseError>;
}

pub(crate) fn not_found<R: OwnedRecords>() -> DatabaseError {
    DatabaseError::not_found(format!("{} not found", R::ENTITY))
}

/// Buckets child rows by their parent id.
pub(crate) fn group_by_parent<C>(children: Vec<C>, parent_of: impl Fn(&C) -> i64) -> HashMap<i64, Vec<C>> {
    let mut grouped: HashMap<i64, Vec<C>> = HashMap::new();
    for child in children {
        grouped.entry(parent_of(&child)).or_default().push(child);
    }
    grouped
}
