//! `myplant ask`: one assistant query from the terminal.

use myplant_agent::AssistantRequest;
use myplant_config::AppConfig;

use super::runtime;

pub async fn run(
    prompt: String,
    device: Option<String>,
    range: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let state = runtime::build_state(&config)?;

    let request = AssistantRequest {
        prompt: Some(prompt).filter(|p| !p.is_empty()),
        device_id: device.filter(|d| !d.is_empty()),
        time_range: range,
    };
    let reply = state.assistant.answer(&request).await;
    println!("{}", reply.reply);

    Ok(())
}
