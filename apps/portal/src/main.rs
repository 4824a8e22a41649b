use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appointment_cell::{AppointmentScope, AppointmentService};
use auth_cell::{AuthService, LoginRequest};
use chat_cell::{ChatService, Sender, UnreadSource};
use dashboard_cell::DashboardService;
use notification_cell::NotificationCenter;
use shared_api::ApiClient;
use shared_config::PortalConfig;
use shared_session::{FileStore, SessionContext};
use shared_utils::PollingFeed;

#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic portal client");

    let config = PortalConfig::from_env();
    if !config.is_configured() {
        bail!("CLINIC_API_URL is not set");
    }

    let store = FileStore::open(&config.session_file)
        .with_context(|| format!("opening session file {}", config.session_file))?;
    let session = Arc::new(SessionContext::restore(Arc::new(store)));
    let api = Arc::new(ApiClient::new(&config, session.clone()));

    if !session.is_authenticated() {
        let (Ok(email), Ok(password)) = (
            std::env::var("CLINIC_EMAIL"),
            std::env::var("CLINIC_PASSWORD"),
        ) else {
            bail!("No stored session; set CLINIC_EMAIL and CLINIC_PASSWORD to sign in");
        };
        AuthService::new(api.clone())
            .login(LoginRequest { email, password })
            .await
            .context("signing in")?;
    }

    let Some(role) = session.role() else {
        bail!("Session has no role");
    };
    let name = session
        .user()
        .map(|user| user.display_name().to_string())
        .unwrap_or_default();
    info!("Signed in as {} ({})", name, role);

    let scope = if role.is_staff() {
        AppointmentScope::Clinic
    } else {
        AppointmentScope::Mine
    };

    if role.is_staff() {
        match DashboardService::new(api.clone()).load_now().await {
            Ok(summary) => info!(
                "Dashboard: {} active patients, {} low-stock items, {} appointments today",
                summary.active_patients, summary.low_stock_items, summary.todays_appointments
            ),
            Err(e) => warn!("Dashboard unavailable: {}", e),
        }
    }

    let notifications = NotificationCenter::new(api.clone(), &config);
    let unread = PollingFeed::new(
        "unread chats",
        Arc::new(UnreadSource::new(
            Arc::new(ChatService::new(api.clone())),
            Arc::new(AppointmentService::new(api.clone())),
            scope,
            Sender::from_role(role),
        )),
        config.unread_poll_interval(),
    );

    let mut notification_updates = notifications.subscribe();
    let mut unread_updates = unread.subscribe();
    let mut session_changes = session.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            Some(snapshot) = notification_updates.recv() => {
                info!("{} unread notifications", snapshot.unread_count);
            }
            Some(counts) = unread_updates.recv() => {
                if counts.total() > 0 {
                    info!("{} unread chat messages", counts.total());
                }
            }
            changed = session_changes.changed() => {
                if changed.is_err() || !session_changes.borrow().is_authenticated() {
                    warn!("Session ended, sign in again to continue");
                    break;
                }
            }
        }
    }

    Ok(())
}
