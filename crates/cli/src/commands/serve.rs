//! `myplant serve`: start the HTTP gateway.

use myplant_config::AppConfig;

use super::runtime;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("myPlant gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Store:     {}", config.store.backend);
    println!("   Notifier:  {} (topic '{}')", config.notify.backend, config.notify.topic);

    let state = runtime::build_state(&config)?;
    myplant_gateway::start(state).await?;

    Ok(())
}
