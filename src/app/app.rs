use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::{info, warn};

use crate::config::app_conf::AppConfig;
use crate::config::mongo_conf::MongoConfig;
use crate::config::stripe_conf::StripeConfig;
use crate::config::EmailConfig;
use crate::repository::quote_repo::MongoQuoteRepository;
use crate::repository::settings_repo::MongoSettingsRepository;
use crate::router::proposal_router::proposal_router;
use crate::router::quote_router::quote_router;
use crate::service::proposal_service::{ProposalService, ProposalServiceImpl};
use crate::service::quote_service::{QuoteService, QuoteServiceImpl};
use crate::util::documents::TextDocumentRenderer;
use crate::util::email::{LogNotifier, Notifier, SmtpNotifier};
use crate::util::payment::StripeGateway;

pub struct App {
    config: AppConfig,
    router: Router,
    pub quote_service: Arc<dyn QuoteService>,
    pub proposal_service: Arc<dyn ProposalService>,
}

impl App {
    pub async fn new() -> Self {
        let config = AppConfig::from_env().expect("Server config error");
        let mongo_config = MongoConfig::from_env().expect("Mongo config error");
        let stripe_config = StripeConfig::from_env().expect("Stripe config error");

        let quote_repo = Arc::new(
            MongoQuoteRepository::new(&mongo_config).await.expect("Quote repo error"),
        );
        let settings_repo = Arc::new(
            MongoSettingsRepository::new(&mongo_config).await.expect("Settings repo error"),
        );

        let gateway =
            Arc::new(StripeGateway::new(stripe_config.clone()).expect("Stripe gateway error"));

        // SMTP is optional; without it notifications are logged only.
        let notifier: Arc<dyn Notifier> = match EmailConfig::from_env() {
            Ok(email_config) => match SmtpNotifier::new(email_config) {
                Ok(notifier) => Arc::new(notifier),
                Err(e) => {
                    warn!("SMTP notifier unavailable, falling back to log notifier: {e}");
                    Arc::new(LogNotifier)
                }
            },
            Err(e) => {
                warn!("Email config not loaded, falling back to log notifier: {e}");
                Arc::new(LogNotifier)
            }
        };

        let quote_service: Arc<dyn QuoteService> =
            Arc::new(QuoteServiceImpl::new(quote_repo.clone(), settings_repo.clone()));
        let proposal_service: Arc<dyn ProposalService> = Arc::new(ProposalServiceImpl::new(
            quote_repo,
            settings_repo,
            gateway,
            notifier,
            Arc::new(TextDocumentRenderer),
            stripe_config.currency.clone(),
        ));

        let router = Self::create_router(quote_service.clone(), proposal_service.clone());
        App { config, router, quote_service, proposal_service }
    }

    fn create_router(
        quote_service: Arc<dyn QuoteService>,
        proposal_service: Arc<dyn ProposalService>,
    ) -> Router {
        Router::new()
            .merge(quote_router(quote_service))
            .merge(proposal_router(proposal_service))
            .route("/health", get(|| async { "OK" }))
    }

    pub async fn start(self) {
        let addr =
            SocketAddr::new(self.config.host.parse().expect("Invalid host"), self.config.port);
        info!("🚀 Server running at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind address");
        axum::serve(listener, self.router).await.expect("Failed to start server");
    }
}
