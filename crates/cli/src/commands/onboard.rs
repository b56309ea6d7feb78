//! `webseek onboard`: First-time setup.

use webseek_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("WebSeek — First-Time Setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Add api_key (or set WEBSEEK_API_KEY) for the completion service");
    println!("   2. Add [search] api_key and engine_id (or GOOGLE_SEARCH_KEY / GOOGLE_CSE_ID)");
    println!("   3. Optionally add [reader] api_key (or JINA_API_KEY)");
    println!("   4. Run: webseek doctor, then webseek agent\n");

    Ok(())
}
