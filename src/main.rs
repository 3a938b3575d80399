use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use dotenv::dotenv;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

mod constants;
mod email_client;
mod otp;
mod routes;
mod store;
mod store_test;

use email_client::{EmailClientConfig, Mailer, SmtpMailer};
use routes::verification::verification_router;
use store::{MemoryStore, PendingStore, RedisStore};

#[cfg(all(target_env = "musl", not(target_os = "macos")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PendingStore>,
    pub mailer: Arc<dyn Mailer>,
}

#[derive(OpenApi)]
#[openapi(paths(
    routes::verification::send_otp,
    routes::verification::verify_otp,
    routes::verification::consume_signup_token,
))]
struct ApiDoc;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let email_config = EmailClientConfig {
        smtp_server: env::var("SMTP_SERVER").unwrap(),
        smtp_port: env::var("SMTP_PORT").unwrap().parse().unwrap(),
        username: env::var("SMTP_USERNAME").unwrap(),
        password: env::var("SMTP_PASSWORD").unwrap(),
    };
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(email_config));

    let store: Arc<dyn PendingStore> = match env::var("REDIS_URL") {
        Ok(url) => {
            let client = redis::Client::open(url).unwrap();
            let connection = client.get_multiplexed_async_connection().await.unwrap();
            Arc::new(RedisStore::new(connection))
        }
        Err(_) => {
            warn!("REDIS_URL not set, using in-memory store; pending codes will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState { store, mailer };

    let app = Router::new()
        .merge(verification_router())
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::debug!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
