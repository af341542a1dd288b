use clap::{Parser, Subcommand};
use huxiang_community::config::Config;
use huxiang_community::models::db_operations::revocation_db_operations::{RedbRevocationStore, RevocationStore};
use huxiang_community::models::db_operations::{is_unique_violation, users_db_operations};
use huxiang_community::setup::db_setup;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for database setup and admin management.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Apply pending schema migrations in order.
    Migrate,
    /// Show applied and pending migrations.
    Status,
    /// Insert the sample admin, users, resources and posts.
    Seed,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
}

#[derive(Subcommand, Debug)]
enum TokensAction {
    /// Drop revocation entries whose tokens have expired.
    Purge,
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Migrate => migrate_database(&config),
            DbAction::Status => show_migration_status(&config),
            DbAction::Seed => seed_database(&config),
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { username, email, password } => {
                create_admin_user(&config, username, email, password);
            }
            AdminAction::List => {
                list_admin_users(&config);
            }
            AdminAction::ChangePassword { username, new_password } => {
                change_admin_password(&config, username, new_password);
            }
        },
        Commands::Tokens { action } => match action {
            TokensAction::Purge => purge_revoked_tokens(&config),
        },
    }
}

fn ensure_parent_dir(path: &Path) {
    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }
}

/// Opens the existing application database with foreign keys enforced.
fn open_existing_db(config: &Config) -> Option<Connection> {
    let db_path = config.app_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Database not found at '{}'. Please run `setup_cli db migrate` first.",
            db_path.display()
        );
        return None;
    }
    match Connection::open(&db_path).and_then(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }) {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("❌ Error opening database: {}", e);
            None
        }
    }
}

fn migrate_database(config: &Config) {
    let db_path = config.app_db_path();
    println!("\nMigrating database at '{}'...", db_path.display());
    ensure_parent_dir(&db_path);

    let mut conn = match Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("❌ Error creating database file: {}", e);
            return;
        }
    };
    match db_setup::run_migrations(&mut conn) {
        Ok(0) => println!("ℹ️ Database schema is already up to date."),
        Ok(n) => println!("✅ Applied {} migration(s) successfully.", n),
        Err(e) => eprintln!("❌ Error applying migrations: {}", e),
    }
}

fn show_migration_status(config: &Config) {
    let conn = match open_existing_db(config) {
        Some(conn) => conn,
        None => return,
    };
    let applied = match db_setup::applied_versions(&conn) {
        Ok(applied) => applied,
        Err(e) => {
            eprintln!("❌ Error reading migration history: {}", e);
            return;
        }
    };

    println!("Migrations:");
    for migration in db_setup::MIGRATIONS {
        let state = if applied.iter().any(|(v, _)| *v == migration.version) {
            "applied"
        } else {
            "pending"
        };
        println!("- {:03} {} [{}]", migration.version, migration.name, state);
    }
}

fn seed_database(config: &Config) {
    let mut conn = match open_existing_db(config) {
        Some(conn) => conn,
        None => return,
    };
    match db_setup::pending_migrations(&conn) {
        Ok(pending) if !pending.is_empty() => {
            eprintln!("❌ Error: {} migration(s) pending. Run `setup_cli db migrate` first.", pending.len());
            return;
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("❌ Error reading migration history: {}", e);
            return;
        }
    }

    println!("\nSeeding sample data...");
    match db_setup::seed_sample_data(&mut conn, config.password_hash_cost) {
        Ok(_) => println!("✅ Sample data seeded successfully."),
        Err(e) => eprintln!("❌ Error seeding sample data: {}", e),
    }
}

fn create_admin_user(config: &Config, username: &str, email: &str, password: &str) {
    let mut conn = match open_existing_db(config) {
        Some(conn) => conn,
        None => return,
    };
    match users_db_operations::create_user(&mut conn, username, email, password, true, config.password_hash_cost) {
        Ok(user) => println!("✅ Admin user '{}' created successfully (id {}).", user.username, user.id),
        Err(e) if is_unique_violation(&e) => {
            eprintln!("❌ Error: The username or email is already taken.")
        }
        Err(e) => eprintln!("❌ Error creating admin user: {}", e),
    }
}

fn list_admin_users(config: &Config) {
    let conn = match open_existing_db(config) {
        Some(conn) => conn,
        None => return,
    };

    println!("Listing Admin Users:");
    match users_db_operations::read_admins(&conn) {
        Ok(admins) => {
            for admin in admins {
                println!("- {} <{}>", admin.username, admin.email);
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}

fn change_admin_password(config: &Config, username: &str, new_password: &str) {
    let conn = match open_existing_db(config) {
        Some(conn) => conn,
        None => return,
    };
    match users_db_operations::read_user_by_username(&conn, username) {
        Ok(Some(user)) if user.is_admin => {}
        Ok(_) => {
            eprintln!("❌ Error: No admin user named '{}' found.", username);
            return;
        }
        Err(e) => {
            eprintln!("❌ Error looking up user: {}", e);
            return;
        }
    }
    match users_db_operations::update_password(&conn, username, new_password, config.password_hash_cost) {
        Ok(_) => println!("✅ Password for admin user '{}' changed successfully.", username),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}

fn purge_revoked_tokens(config: &Config) {
    let store_path = config.token_store_path();
    ensure_parent_dir(&store_path);
    let store = match RedbRevocationStore::open(&store_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ Error opening revoked token store: {}", e);
            return;
        }
    };
    match store.purge_expired() {
        Ok(n) => println!("✅ Removed {} expired revoked token(s).", n),
        Err(e) => eprintln!("❌ Error purging revoked tokens: {}", e),
    }
}
