//! `webseek doctor`: Diagnose configuration and credentials.

use webseek_config::AppConfig;
use webseek_core::provider::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("WebSeek Doctor — Diagnostics");
    println!("============================\n");

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults. Run `webseek onboard` to create one.");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  1 blocking issue found.");
            return Ok(());
        }
    };

    let mut issues = report(&config);

    let router = webseek_providers::build_from_config(&config);
    if let Some(provider) = router.default() {
        match check_service(provider.as_ref()).await {
            Ok(()) => println!("  ✅ Completion service reachable"),
            Err(reason) => {
                println!("  ❌ Completion service unreachable: {reason}");
                issues.push("completion service is not reachable");
            }
        }
    }

    println!();
    if issues.is_empty() {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {} issue(s) found:", issues.len());
        for issue in &issues {
            println!("     - {issue}");
        }
    }

    Ok(())
}

/// Ask the completion service whether it answers.
async fn check_service(provider: &dyn Provider) -> Result<(), String> {
    match provider.health_check().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(format!("{} rejected the request", provider.name())),
        Err(e) => Err(e.to_string()),
    }
}

/// Print per-service status and return the problems found.
fn report(config: &AppConfig) -> Vec<&'static str> {
    let mut issues = Vec::new();

    println!("  Completion service: {} ({})", config.api_url, config.model);
    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key (only local endpoints will work)");
        issues.push("completion service has no API key");
    }

    if config.search.has_credentials() {
        println!("  ✅ Search credentials configured");
    } else {
        println!("  ❌ Search key or engine ID missing");
        issues.push("search tool is not configured");
    }

    if config.reader.api_key.is_some() {
        println!("  ✅ Reader key configured");
    } else {
        println!("  ⚠️  No reader key (anonymous page reads may be rate-limited)");
    }

    if config.uses_model_summarizer() {
        println!("  ✅ Pages summarized by {}", config.summarizer.model);
    } else {
        println!("  ℹ️  Pages summarized by text extraction");
    }

    if let Some(prompt) = &config.agent.secondary_system_prompt
        && !prompt.trim().is_empty()
    {
        println!("  ✅ Follow-up agent enabled");
    }

    issues
}
