use std::sync::Arc;

use tower_http::cors::CorsLayer;

use onboard_core::application::ApplicationStateMachine;
use onboard_core::config::{ActivationPolicy, ClaimMode, OnboardConfig};
use onboard_core::directory::{Role, StaticDirectory};
use onboard_core::http::{onboarding_routes, ApiState};
use onboard_core::notify::{
    DeliveryChannel, EmailChannel, EmailDeliveryConfig, InAppChannel, NotificationDispatcher,
};
use onboard_core::store::{MemoryStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage (SMTP channel)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let port: u16 = std::env::var("ONBOARD_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let mut config = OnboardConfig::default();
    if let Ok(mode) = std::env::var("ONBOARD_CLAIM_MODE") {
        config.claim_mode = match mode.as_str() {
            "broadcast" => ClaimMode::Broadcast,
            _ => ClaimMode::SingleOwner,
        };
    }
    if let Ok(days) = std::env::var("ONBOARD_REVIEW_DUE_DAYS") {
        if let Ok(days) = days.parse() {
            config.review_due_days = days;
        }
    }
    if let Ok(secs) = std::env::var("ONBOARD_ACTIVATION_DELAY_SECS") {
        if let Ok(secs) = secs.parse() {
            config.activation = ActivationPolicy::After(std::time::Duration::from_secs(secs));
        }
    }

    // Staff roster and role directory from env:
    //   ONBOARD_STAFF="staff1:Alice,staff2:Bob"
    //   ONBOARD_ADMINS="admin@example.com"  ONBOARD_OWNERS="owner@example.com"
    let mut directory = StaticDirectory::new();
    if let Ok(staff) = std::env::var("ONBOARD_STAFF") {
        for entry in staff.split(',').filter(|s| !s.trim().is_empty()) {
            let (id, name) = entry.split_once(':').unwrap_or((entry, entry));
            directory = directory.with_staff(id.trim(), name.trim());
        }
    }
    for (var, role) in [("ONBOARD_ADMINS", Role::Admin), ("ONBOARD_OWNERS", Role::Owner)] {
        if let Ok(members) = std::env::var(var) {
            for member in members.split(',').filter(|s| !s.trim().is_empty()) {
                directory = directory.with_role_member(role, member.trim());
            }
        }
    }
    let directory = Arc::new(directory);

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let in_app = Arc::new(InAppChannel::new());
    let mut dispatcher = NotificationDispatcher::new(Arc::clone(&store), directory.clone())
        .with_channel(Arc::clone(&in_app) as Arc<dyn DeliveryChannel>);
    match EmailDeliveryConfig::from_env() {
        Some(email_config) => {
            eprintln!("   Email: SMTP via {}", email_config.smtp_host);
            dispatcher = dispatcher.with_channel(Arc::new(EmailChannel::new(email_config)));
        }
        None => eprintln!("   Email: disabled (ONBOARD_SMTP_HOST not set)"),
    }

    let machine = Arc::new(ApplicationStateMachine::new(
        store,
        directory,
        Arc::new(dispatcher),
        config,
    ));

    eprintln!("🏪 Onboard Core v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{port}/api/onboarding");
    eprintln!("   Claim mode: {:?}", config.claim_mode);

    let app = onboarding_routes(ApiState::new(machine)).layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
