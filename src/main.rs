use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cattery::auth::SystemClock;
use cattery::models::Identity;
use cattery::{api, config, seed, store, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    // OTLP export only when an endpoint is configured; stdout logging always.
    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "cattery"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cattery=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let args = cli::Cli::parse();
    let cfg = config::load()?;

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Token { command }) => handle_token_command(cfg, command).await,
        Some(cli::Commands::User { command }) => handle_user_command(cfg, command).await,
        Some(cli::Commands::Cat { command }) => handle_cat_command(cfg, command).await,
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn build_state(cfg: config::Config) -> anyhow::Result<Arc<AppState>> {
    let backends = store::open(&cfg).await?;
    let state = AppState::new(cfg, backends, Arc::new(SystemClock))?;
    Ok(Arc::new(state))
}

/// State for one-shot operator commands; these need a real database.
async fn build_persistent_state(cfg: config::Config) -> anyhow::Result<Arc<AppState>> {
    let backends = store::open_persistent(&cfg).await?;
    let state = AppState::new(cfg, backends, Arc::new(SystemClock))?;
    Ok(Arc::new(state))
}

async fn run_server(cfg: config::Config, port_override: Option<u16>) -> anyhow::Result<()> {
    let port = match port_override {
        Some(port) => port,
        None => cfg
            .listen_port()?
            .context("PORT environment variable not set")?,
    };

    let state = build_state(cfg).await?;

    if state.config.seed_demo {
        seed::demo(&state.credentials, &state.registry).await?;
    }

    tracing::info!(
        list_requires_auth = state.config.list_requires_auth,
        recheck_subject = state.config.recheck_subject,
        password_scheme = ?state.config.password_scheme,
        "authorization settings"
    );

    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("cattery listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_token_command(cfg: config::Config, cmd: cli::TokenCommands) -> anyhow::Result<()> {
    let tokens = cattery::auth::TokenService::new(&cfg.jwt_secret, Arc::new(SystemClock))?;
    match cmd {
        cli::TokenCommands::Issue { email } => {
            let token = tokens.issue(&Identity::from(email.as_str()))?;
            println!(
                "Token issued:\n  Subject: {}\n  Expires: in {}s\n  Use:     Authorization: Bearer {}",
                email,
                cattery::auth::TOKEN_TTL_SECS,
                token
            );
        }
        cli::TokenCommands::Inspect { token } => match tokens.claims(&token) {
            Ok(claims) => {
                println!(
                    "Token valid:\n  Subject:   {}\n  Issued at: {}\n  Remaining: {}s",
                    claims.sub,
                    claims.iat,
                    claims.remaining(tokens.now())
                );
            }
            Err(e) => {
                println!("Token rejected: {}", e);
            }
        },
    }
    Ok(())
}

async fn handle_user_command(cfg: config::Config, cmd: cli::UserCommands) -> anyhow::Result<()> {
    let state = build_persistent_state(cfg).await?;
    match cmd {
        cli::UserCommands::Add { email, password } => {
            let identity = Identity::from(email.trim());
            state
                .credentials
                .register(&identity, &password)
                .await
                .with_context(|| format!("could not register {}", identity))?;
            println!("User registered:\n  Email: {}", identity);
        }
        cli::UserCommands::List => {
            let users = state.credentials.identities().await?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                for u in users {
                    println!("{}", u);
                }
            }
        }
    }
    Ok(())
}

async fn handle_cat_command(cfg: config::Config, cmd: cli::CatCommands) -> anyhow::Result<()> {
    let state = build_persistent_state(cfg).await?;
    match cmd {
        cli::CatCommands::List => {
            let cats = state.registry.list().await?;
            if cats.is_empty() {
                println!("No cats found.");
            } else {
                println!("{:<10} {:<30} {:<30}", "ID", "NAME", "AUTHOR");
                for c in cats {
                    println!("{:<10} {:<30} {:<30}", c.id, c.name, c.author);
                }
            }
        }
    }
    Ok(())
}
