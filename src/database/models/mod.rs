pub mod compost;
pub mod irrigation;
pub mod machine_code;
pub mod soil;
pub mod user;

pub use compost::{CompostInput, CompostRecord, Fertilizer, SourceKind};
pub use irrigation::{IrrigationArea, IrrigationInput, IrrigationRecord, MoisturePoint};
pub use machine_code::{CodeStatus, MachineCode};
pub use soil::{SoilDetails, SoilRecord};
pub use user::{AccountStatus, LoginMethod, Role, User, UserProfile};
