mod access;
mod api;
mod auth;
mod cli;
mod dashboard;
mod db;
mod env;
mod error;
mod http;
mod passwords;
mod server;
mod session;
mod sms;
mod state;

use crate::db::UserStore;
use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("install rustls crypto provider");

    let cli = cli::parse();
    match cli.command {
        Some(cli::Commands::Start) | None => {
            portier_common::logger::init("portier:server");
            let config = env::init()?;
            server::start(config).await
        }
        Some(cli::Commands::Version) => {
            println!("{}", env::version());
            Ok(())
        }
        Some(cli::Commands::CreateUser { username }) => {
            portier_common::logger::init("portier:cli");
            let config = env::init()?;
            create_user(&config, &username).await
        }
        Some(cli::Commands::Notify { message }) => {
            portier_common::logger::init("portier:cli");
            let config = env::init()?;
            if sms::SmsRelay::from_env(&config)?.send(&message).await {
                Ok(())
            } else {
                anyhow::bail!("failed to relay notification")
            }
        }
    }
}

async fn create_user(config: &env::Env, username: &str) -> anyhow::Result<()> {
    let password = rpassword::prompt_password(format!("Password for {username}: "))?;
    let confirmation = rpassword::prompt_password("Repeat password: ")?;
    if password != confirmation {
        anyhow::bail!("passwords do not match");
    }

    let db = db::Database::create(config).await?;
    let user = db
        .create_user(username, &password)
        .await
        .context("failed to create user")?;

    println!("created user {} (id {})", user.username, user.id);
    Ok(())
}
