use clap::Subcommand;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::database::repository::MachineCodeRepository;
use crate::database::Database;

#[derive(Subcommand)]
pub enum MachineCommands {
    #[command(about = "Mint new active, unbound machine codes")]
    Generate {
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=1000), help = "How many codes to create")]
        count: u32,

        #[arg(long, help = "Label stored with each code")]
        name: Option<String>,

        #[arg(long, help = "Free-form description stored with each code")]
        description: Option<String>,
    },
}

pub async fn handle(cmd: MachineCommands, db: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MachineCommands::Generate { count, name, description } => {
            let codes = MachineCodeRepository::new(db);
            let mut created = Vec::with_capacity(count as usize);
            for _ in 0..count {
                created.push(codes.create(None, name.as_deref(), description.as_deref()).await?);
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "codes": created }))?);
                }
                OutputFormat::Text => {
                    println!("{:<8} {:<18} {}", "ID", "CODE", "NAME");
                    println!("{}", "-".repeat(40));
                    for code in &created {
                        println!("{:<8} {:<18} {}", code.id, code.code, code.name.as_deref().unwrap_or("-"));
                    }
                }
            }
            Ok(())
        }
    }
}
