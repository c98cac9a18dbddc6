use am_core::users::UserRepository;
use am_core::Store;
use am_events::bus::EventBus;
use am_events::rooms::Rooms;
use clap::{Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "am")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the marketplace API server.
    Serve,
    /// Print the OpenAPI spec to stdout.
    Openapi,
    /// Seed the platform administrator account.
    CreateAdmin {
        #[arg(long, default_value = "admin@cvru.ac.in")]
        email: String,
        #[arg(long, default_value = "admin123")]
        password: String,
    },
}

fn db_path() -> String {
    std::env::var("ACADMATE_DB_PATH").unwrap_or_else(|_| ".acadmate/market.db".to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve => {
            let db_path = db_path();
            if let Some(parent) = Path::new(&db_path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let port = std::env::var("ACADMATE_PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(8000);
            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
            let state = am_serve::AppState {
                db_path,
                bus: EventBus::new(1024),
                rooms: Rooms::new(),
            };
            if let Err(err) = am_serve::serve(state, addr).await {
                tracing::error!(error = %err, "serve failed");
            }
        }
        Command::Openapi => {
            println!("{}", am_serve::openapi::generate_spec());
        }
        Command::CreateAdmin { email, password } => {
            if let Err(message) = create_admin(&email, &password) {
                eprintln!("create-admin failed: {message}");
                std::process::exit(1);
            }
        }
    }
}

fn create_admin(email: &str, password: &str) -> Result<(), String> {
    let db_path = db_path();
    if let Some(parent) = Path::new(&db_path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let conn = am_db::schema::open_and_migrate(&db_path).map_err(|err| err.to_string())?;
    let store = am_db::store::DbStore::new(conn);

    let existing = store
        .users()
        .get_by_email(email)
        .map_err(|err| err.to_string())?;
    if existing.is_some() {
        println!("Admin user already exists.");
        return Ok(());
    }

    let password_hash = am_core::auth::hash_password(password).map_err(|err| err.to_string())?;
    let admin = store
        .users()
        .insert(am_core::users::NewUser {
            name: "Platform Administrator".to_string(),
            email: email.to_string(),
            password_hash,
            role: am_core::types::Role::Admin,
            phone_number: Some("0000000000".to_string()),
        })
        .map_err(|err| err.to_string())?;
    store
        .users()
        .set_verified(&admin.id, true)
        .map_err(|err| err.to_string())?;
    println!("Admin user created: {email}");
    Ok(())
}
