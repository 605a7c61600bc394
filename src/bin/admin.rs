use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use roomhub::auth::{
    repo::JsonIdentityStore,
    repo_types::{normalize_email, Role},
    seed::{create_user, seed},
};

/// Maintenance commands for the identity store.
#[derive(Parser, Debug)]
#[command(name = "roomhub-admin", version)]
struct Cli {
    /// Directory holding users.json. Defaults to DATA_DIR or ./data.
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert one test account per role. Existing emails are left alone.
    Seed,
    /// Insert a single credentials account.
    CreateUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "student")]
        role: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "roomhub=info,roomhub_admin=info".into()),
        )
        .init();

    let cli = Cli::parse();
    tokio::fs::create_dir_all(&cli.data_dir)
        .await
        .with_context(|| format!("create data dir {}", cli.data_dir.display()))?;
    let store = JsonIdentityStore::in_dir(&cli.data_dir);

    match cli.command {
        Command::Seed => {
            let created = seed(&store).await?;
            info!(created, path = %store.path().display(), "seed finished");
        }
        Command::CreateUser {
            name,
            email,
            password,
            role,
        } => {
            let role: Role = role.parse().map_err(anyhow::Error::msg)?;
            if !create_user(&store, &name, &email, &password, role).await? {
                bail!("{} is already registered", normalize_email(&email));
            }
        }
    }
    Ok(())
}
