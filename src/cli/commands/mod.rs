pub mod machine;
pub mod migrate;
pub mod user;
