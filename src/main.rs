use promptcast::{logger, server, ServerConfig};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(logger::LoggerConfig::from_env())?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = ServerConfig::from_env();
    if config.provider.api_key.is_none() {
        log::warn!("⚠️  OPENAI_API_KEY is not set; every generation request will fail");
    }

    if let Err(e) = server::run(config).await {
        log::error!("❌ Failed to start server: {}", e);
        return Err(e.into());
    }

    Ok(())
}
