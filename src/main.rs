//! pdf-shelf server entry point.

use clap::Parser;
use pdf_shelf::{
    config::{BookCommand, Cli, Command, Config},
    db::{self, Book, Database},
    server,
    storage::FileStore,
};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Some(Command::Init { force }) => cmd_init(force).await,
        Some(Command::Book { action }) => cmd_book(action, &config).await,
        Some(Command::Serve { bind, uploads }) => cmd_serve(config, bind, uploads).await,
        None => cmd_serve(config, None, None).await,
    }
}

/// Initialize config, database and uploads directory.
async fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    let config = Config::default();
    let _db = Database::open(&config.database.path)?;
    println!("Initialized database: {}", config.database.path.display());

    FileStore::new(&config.storage.uploads_dir)
        .ensure_dirs()
        .await?;
    println!(
        "Created uploads directory: {}",
        config.storage.uploads_dir.display()
    );

    println!("\nEdit config.toml to configure your server.");
    println!("Then run: pdf-shelf serve");

    Ok(())
}

/// Book management commands.
async fn cmd_book(action: BookCommand, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;
    let files = FileStore::new(&config.storage.uploads_dir);
    let catalog = pdf_shelf::Catalog::new(db.clone(), files);

    match action {
        BookCommand::List => print_books(&db.list_books()?),

        BookCommand::Search { term } => print_books(&db.search_books(&term)?),

        BookCommand::Del { id } => match catalog.remove(id).await {
            Ok(book) => println!("Deleted book {}: {}", book.id, book.title),
            Err(pdf_shelf::AppError::NotFound(_)) => println!("Book not found: {}", id),
            Err(e) => return Err(e.into()),
        },
    }

    Ok(())
}

fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("No books found.");
        return;
    }

    println!(
        "{:<6} {:<30} {:<20} {:<15} ADDED",
        "ID", "TITLE", "AUTHOR", "CATEGORY"
    );
    println!("{}", "-".repeat(90));
    for book in books {
        println!(
            "{:<6} {:<30} {:<20} {:<15} {}",
            book.id,
            truncate(&book.title, 30),
            truncate(&book.author, 20),
            truncate(&book.category, 15),
            db::timestamp_to_datetime(book.created_at).format("%Y-%m-%d %H:%M")
        );
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Start the server.
async fn cmd_serve(
    mut config: Config,
    bind: Option<std::net::SocketAddr>,
    uploads: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(addr) = bind {
        config.server.bind = addr;
    }
    if let Some(dir) = uploads {
        config.storage.uploads_dir = dir;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_shelf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = Database::open(&config.database.path)?;
    let files = FileStore::new(&config.storage.uploads_dir);
    files.ensure_dirs().await?;

    tracing::info!(
        bind = %config.server.bind,
        database = %config.database.path.display(),
        uploads = %files.root().display(),
        books = db.count_books()?,
        "Starting pdf-shelf server"
    );

    let bind = config.server.bind;
    let state = server::AppState::new(config, db, files);
    let app = server::create_router(state);

    let listener = TcpListener::bind(bind).await?;
    tracing::info!(address = %bind, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
