//! `myplant doctor`: diagnose configuration health.
//!
//! Reports whether secrets are present, never their values.

use myplant_config::AppConfig;

/// One line of the report.
struct Check {
    ok: bool,
    label: String,
}

impl Check {
    fn new(ok: bool, label: impl Into<String>) -> Self {
        Self { ok, label: label.into() }
    }
}

fn checks(config: &AppConfig) -> Vec<Check> {
    let mut out = vec![Check::new(
        config.has_llm_key(),
        format!("LLM API key ({} at {})", config.llm.model, config.llm.api_url),
    )];

    match config.store.backend.as_str() {
        "memory" => out.push(Check::new(true, "Store: in-memory (empty on start)")),
        backend => {
            let project = config.store.project_id.as_deref().unwrap_or("<unset>");
            out.push(Check::new(
                config.store.project_id.is_some(),
                format!("Store: {backend} project {project}, database {}", config.store.database),
            ));
            out.push(Check::new(config.store.access_token.is_some(), "Store access token"));
        }
    }

    match config.notify.backend.as_str() {
        "log" => out.push(Check::new(true, "Notifier: log only")),
        backend => {
            let project = config.notify.project_id.as_deref().unwrap_or("<unset>");
            out.push(Check::new(
                config.notify.project_id.is_some(),
                format!("Notifier: {backend} project {project}, topic '{}'", config.notify.topic),
            ));
            out.push(Check::new(config.notify.access_token.is_some(), "Notifier access token"));
        }
    }

    out.push(Check::new(
        config.secrets.encryption_admin_key.is_some(),
        "ENCRYPTION_ADMIN_KEY",
    ));
    out
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("myPlant doctor");
    println!("==============\n");

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  [ok]   Config file: {}", config_path.display());
    } else {
        println!("  [warn] No config file, using defaults. Run `myplant onboard`.");
    }

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            return Ok(());
        }
    };

    let report = checks(&config);
    for check in &report {
        let mark = if check.ok { "[ok]  " } else { "[fail]" };
        println!("  {mark} {}", check.label);
    }

    let issues = report.iter().filter(|c| !c.ok).count();
    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_never_printed() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-live-123".into());
        config.secrets.encryption_admin_key = Some("hunter2".into());

        let report = checks(&config);
        assert!(report.iter().all(|c| !c.label.contains("sk-live-123") && !c.label.contains("hunter2")));
        assert!(report.iter().find(|c| c.label == "ENCRYPTION_ADMIN_KEY").unwrap().ok);
    }

    #[test]
    fn default_config_reports_missing_settings() {
        let report = checks(&AppConfig::default());
        assert!(!report[0].ok);
        assert!(report.iter().filter(|c| !c.ok).count() >= 4);
    }

    #[test]
    fn local_backends_need_no_credentials() {
        let mut config = AppConfig::default();
        config.store.backend = "memory".into();
        config.notify.backend = "log".into();
        config.llm.api_key = Some("k".into());
        config.secrets.encryption_admin_key = Some("s".into());
        assert!(checks(&config).iter().all(|c| c.ok));
    }
}
