use actix_cors::Cors;
use actix_web::{http::header, middleware::{DefaultHeaders, Logger}, web, App, HttpServer};
use clap::Parser;
use huxiang_community::{
    build_pool,
    config::Config,
    helper::token_helpers::JwtKeys,
    models::db_operations::revocation_db_operations::{RedbRevocationStore, RevocationStore},
    routes,
    setup::db_setup,
    AppState,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "huxiang_server", author, version, about = "Starts the Huxiang community API server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let app_db_path = config.app_db_path();
    let token_store_path = config.token_store_path();
    for path in [&app_db_path, &token_store_path] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
    }

    let pool = build_pool(&app_db_path)
        .expect("FATAL: Failed to create Rusqlite connection pool.");

    {
        let conn = pool.get().expect("Failed to get DB connection for startup checks.");
        let pending = db_setup::pending_migrations(&conn)
            .expect("FATAL: Could not read the migration history.");
        if !pending.is_empty() {
            for migration in &pending {
                log::error!("Pending migration {:03} {}", migration.version, migration.name);
            }
            log::error!("Database schema is out of date. Run 'setup_cli --env-file <path> db migrate' first.");
            std::process::exit(1);
        }
    }

    let revoked_tokens = RedbRevocationStore::open(&token_store_path)
        .expect("FATAL: Failed to open the revoked token store.");
    match revoked_tokens.purge_expired() {
        Ok(0) => {}
        Ok(n) => log::info!("Purged {} expired revoked token(s)", n),
        Err(e) => log::warn!("Could not purge expired revoked tokens: {}", e),
    }

    let app_state = web::Data::new(AppState {
        jwt: JwtKeys::new(&config.jwt_secret_key, config.jwt_access_token_expires),
        revoked_tokens: Arc::new(revoked_tokens),
        password_hash_cost: config.password_hash_cost,
    });
    let pool_data = web::Data::new(pool);

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .app_data(pool_data.clone())
            .app_data(app_state.clone())
            .configure(routes::config_root)
            .configure(routes::config_api)
            .default_service(web::route().to(routes::not_found))
    })
    .bind(server_address)?
    .run()
    .await
}
