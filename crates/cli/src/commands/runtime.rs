//! Builds the handlers and their collaborators from configuration.

use std::sync::Arc;

use myplant_agent::{AssistantQuery, AssistantSettings, ContextAssembler};
use myplant_config::AppConfig;
use myplant_core::notify::Notifier;
use myplant_core::store::{Devices, Events, Readings, UserProfiles};
use myplant_gateway::{Diagnostics, GatewayState};
use myplant_notify::{EventNotifier, FcmNotifier, LogNotifier};
use myplant_providers::OpenAiCompatProvider;
use myplant_security::{AuditLogger, ENCRYPTION_ADMIN_KEY, KeyIssuer, StaticSecrets};
use myplant_store::{FirestoreStore, InMemoryStore};
use tracing::warn;

/// One store backend seen through each repository trait.
struct Stores {
    profiles: Arc<dyn UserProfiles>,
    devices: Arc<dyn Devices>,
    readings: Arc<dyn Readings>,
    events: Arc<dyn Events>,
}

impl Stores {
    fn from<S>(store: Arc<S>) -> Self
    where
        S: UserProfiles + Devices + Readings + Events + 'static,
    {
        Self {
            profiles: store.clone(),
            devices: store.clone(),
            readings: store.clone(),
            events: store,
        }
    }
}

fn build_stores(config: &AppConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    match config.store.backend.as_str() {
        "memory" => {
            warn!("Using the in-memory store; it starts empty");
            Ok(Stores::from(Arc::new(InMemoryStore::new())))
        }
        _ => {
            let project = config
                .store
                .project_id
                .clone()
                .ok_or("store.project_id is required for the firestore backend (or set MYPLANT_PROJECT_ID)")?;
            let store = FirestoreStore::new(project, config.store.access_token.clone())
                .with_base_url(config.store.base_url.clone())
                .with_database(config.store.database.clone());
            Ok(Stores::from(Arc::new(store)))
        }
    }
}

fn build_notifier(config: &AppConfig) -> Arc<dyn Notifier> {
    match config.notify.backend.as_str() {
        "log" => Arc::new(LogNotifier::new()),
        _ => {
            let project = config.notify.project_id.clone().unwrap_or_default();
            if project.is_empty() {
                warn!("notify.project_id is not set; pushes will fail");
            }
            Arc::new(
                FcmNotifier::new(project, config.notify.access_token.clone())
                    .with_base_url(config.notify.base_url.clone()),
            )
        }
    }
}

/// Wire every handler the gateway serves.
pub fn build_state(config: &AppConfig) -> Result<Arc<GatewayState>, Box<dyn std::error::Error>> {
    let stores = build_stores(config)?;
    let notifier = build_notifier(config);

    if !config.has_llm_key() {
        warn!("No LLM API key configured; queryAgent will answer with a configuration error");
    }
    let provider = Arc::new(OpenAiCompatProvider::new(
        "openai",
        config.llm.api_url.clone(),
        config.llm.api_key.clone().unwrap_or_default(),
    ));

    let secrets = StaticSecrets::new().with(
        ENCRYPTION_ADMIN_KEY,
        config.secrets.encryption_admin_key.clone(),
    );
    let keys = KeyIssuer::new(
        stores.profiles,
        Arc::new(secrets),
        Arc::new(AuditLogger::tracing()),
    );

    let assembler = ContextAssembler::new(stores.devices, stores.readings.clone(), stores.events);
    let assistant = AssistantQuery::new(
        assembler,
        stores.readings,
        provider,
        AssistantSettings {
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        },
    );

    Ok(Arc::new(GatewayState {
        config: config.gateway.clone(),
        keys: Arc::new(keys),
        assistant: Arc::new(assistant),
        events: Arc::new(EventNotifier::new(notifier.clone(), config.notify.topic.clone())),
        diagnostics: Arc::new(Diagnostics::new(notifier, config.notify.topic.clone())),
    }))
}
