use anyhow::Context;
use dotenv::dotenv;
use log::info;
use std::env;
use topichub_console::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    let username = env::var("TOPICHUB_USERNAME").context("TOPICHUB_USERNAME must be set")?;
    let password = env::var("TOPICHUB_PASSWORD").context("TOPICHUB_PASSWORD must be set")?;

    let console = Console::from_env()?;
    console.initialize()?;

    if console.is_logged_in() {
        println!("Restored session for {}", console.username());
    } else {
        let mut request = LoginRequest::new(username, password);
        if let Ok(system_id) = env::var("TOPICHUB_EMQX_SYSTEM_ID") {
            let system_id = system_id
                .parse::<i64>()
                .context("TOPICHUB_EMQX_SYSTEM_ID must be a number")?;
            request = request.with_system_id(system_id);
        }

        let response = console.login(request).await?;
        info!("logged in as {}", response.username);
        println!("Logged in as {}, session expires at {}", response.username, response.expires_at);
    }

    // Any request built through the console carries the bearer token
    let systems: serde_json::Value = console.get("/systems").execute().await?;
    println!("Systems: {}", serde_json::to_string_pretty(&systems)?);

    if env::var("TOPICHUB_KEEP_SESSION").is_err() {
        console.logout().await?;
        println!("Logged out: {:?}", console.snapshot());
    }

    Ok(())
}
