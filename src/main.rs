mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine, the variables may come from the shell
    dotenvy::dotenv().ok();
    env_logger::init();

    cli::run().await?;
    Ok(())
}
