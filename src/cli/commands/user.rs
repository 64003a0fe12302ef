use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::models::user::Role;
use crate::database::repository::{CredentialError, UserRepository};
use crate::database::Database;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Grant the admin role")]
    Promote {
        #[arg(help = "Username of the account")]
        username: String,
    },

    #[command(about = "Revoke the admin role")]
    Demote {
        #[arg(help = "Username of the account")]
        username: String,
    },
}

pub async fn handle(cmd: UserCommands, db: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    let users = UserRepository::new(db);
    let (username, role) = match cmd {
        UserCommands::Promote { username } => (username, Role::Admin),
        UserCommands::Demote { username } => (username, Role::Ordinary),
    };

    let user = match users.set_role(&username, role).await {
        Ok(user) => user,
        Err(CredentialError::NotFound) => anyhow::bail!("User '{}' not found", username),
        Err(e) => return Err(e.into()),
    };

    let message = match role {
        Role::Admin => format!("User '{}' is now an admin", username),
        Role::Ordinary => format!("User '{}' is now an ordinary user", username),
    };
    output_success(
        &output_format,
        &message,
        Some(json!({ "customerId": user.id, "username": username, "role": role.as_i16() })),
    )
}
