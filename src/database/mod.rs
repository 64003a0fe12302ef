pub mod filter;
pub mod manager;
pub mod models;
pub mod pagination;
pub mod repository;

pub use filter::DateRange;
pub use manager::{Database, DatabaseError};
pub use pagination::{PageError, PageRequest, Paginated};
pub use repository::{
    CompostRepository, CredentialError, IrrigationRepository, MachineCodeError, MachineCodeRepository,
    OwnedRecords, SoilRepository, UserRepository,
};
