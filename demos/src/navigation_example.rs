use dotenv::dotenv;
use std::env;
use topichub_console::prelude::*;

fn print_navigation(navigation: &Navigation) {
    if navigation.redirected() {
        println!(
            "{} -> {} ({:?})",
            navigation.requested,
            navigation.path(),
            navigation.decision
        );
    } else {
        println!("{} allowed", navigation.path());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    let mut console = Console::from_env()?;

    for path in ["/", "/topics", "/login", "/no/such/page"] {
        let navigation = console.navigate(path)?;
        print_navigation(&navigation);
    }

    let credentials = (env::var("TOPICHUB_USERNAME"), env::var("TOPICHUB_PASSWORD"));
    let (Ok(username), Ok(password)) = credentials else {
        println!("Set TOPICHUB_USERNAME and TOPICHUB_PASSWORD to see the logged-in routes");
        return Ok(());
    };

    console.login(LoginRequest::new(username, password)).await?;
    println!("\nLogged in as {}", console.username());

    for path in ["/login", "/topics/1", "/groups"] {
        let navigation = console.navigate(path)?;
        print_navigation(&navigation);
    }

    console.logout().await?;
    let navigation = console.navigate("/dashboard")?;
    print_navigation(&navigation);

    Ok(())
}
