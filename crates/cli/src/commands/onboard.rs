//! `myplant onboard`: first-time setup.

use myplant_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("myPlant backend setup");
    println!("=====================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Created config.toml at: {}", config_path.display());
    println!("\n  Next steps:");
    println!("   1. Set store.project_id (or MYPLANT_PROJECT_ID)");
    println!("   2. Export OPENAI_KEY and ENCRYPTION_ADMIN_KEY");
    println!("   3. Run: myplant doctor\n");

    Ok(())
}
