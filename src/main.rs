use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;

use portfolio_agent::agent::detect::LanguageDetector;
use portfolio_agent::agent::persona::Prompts;
use portfolio_agent::agent::{Backend, Orchestrator};
use portfolio_agent::config::{AppConfig, GenerationMode};
use portfolio_agent::model::OpenAiModel;
use portfolio_agent::store::MemoryStore;
use portfolio_agent::web::{json_error_handler, routes, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting portfolio agent");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Compile prompt templates
    let prompts = match Prompts::new(&config.owner_name) {
        Ok(prompts) => Arc::new(prompts),
        Err(e) => {
            error!("Template parsing error: {}", e);
            std::process::exit(1);
        }
    };

    let backend = match &config.mode {
        GenerationMode::Live(settings) => match OpenAiModel::new(settings.clone()) {
            Ok(model) => Backend::Live(Arc::new(model)),
            Err(e) => {
                error!("Failed to build model client: {}", e);
                std::process::exit(1);
            }
        },
        GenerationMode::Mock => {
            info!("No API key configured, serving mock responses");
            Backend::Mock
        }
    };

    let store = Arc::new(MemoryStore::new());

    // Create app state
    let app_state = web::Data::new(AppState {
        orchestrator: Orchestrator::new(backend.clone(), prompts.clone(), store.clone(), &config),
        detector: LanguageDetector::new(backend, prompts, config.generation_timeout),
        turns: store.clone(),
        users: store,
    });

    info!("Listening on {}:{}", config.host, config.port);

    // Start web server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
