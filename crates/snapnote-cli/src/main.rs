//! snapnote: turn screenshots into searchable notes.

mod commands;
mod logging;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "snapnote")]
#[command(author, version, about = "Turn screenshots into searchable notes")]
#[command(propagate_version = true)]
struct Cli {
    /// Note database file (default: <data_dir>/snapnote/notes.db)
    #[arg(long, global = true, env = "SNAPNOTE_DB")]
    db: Option<PathBuf>,

    /// Settings file (default: <config_dir>/snapnote/settings.toml)
    #[arg(long, global = true, env = "SNAPNOTE_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create notes from one or more image files
    Add {
        /// Image files to process
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },

    /// Create a note from image bytes on stdin
    Paste {
        /// Declared MIME type of the pasted data
        #[arg(long, default_value = "image/png")]
        mime: String,
    },

    /// List notes, newest first
    List {
        /// Only notes carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show one note
    Show {
        id: String,

        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search title, tags and content
    Search { query: String },

    /// Edit a note's title or content
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,
    },

    /// Add or remove tags
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Delete a note
    Delete { id: String },

    /// Export all notes as a JSON backup
    Export {
        /// Output directory (default: current directory)
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Start the recognition engine and report whether it is usable
    Warmup,

    /// Manage the remote analysis API key
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TagAction {
    /// Add a tag to a note
    Add { id: String, tag: String },
    /// Remove a tag from a note
    Remove { id: String, tag: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store the API key
    SetKey { key: String },
    /// Remove the stored API key
    ClearKey,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings_path = cli
        .settings
        .unwrap_or_else(settings::Settings::default_path);

    // Commands that never touch the database.
    match cli.command {
        Commands::Config { action } => {
            commands::config(&settings_path, action).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Warmup => return commands::warmup().await,
        _ => {}
    }

    let db_path = cli.db.unwrap_or_else(commands::default_db_path);
    let app = commands::App::open(&db_path, &settings_path).await?;

    execute(app, cli.command).await
}

/// Run a database command, then release the app whether or not it succeeded.
async fn execute(app: commands::App, command: Commands) -> anyhow::Result<ExitCode> {
    let outcome = dispatch(&app, command).await;
    app.close().await;
    outcome
}

async fn dispatch(app: &commands::App, command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Add { files } => app.add(files).await,
        Commands::Paste { mime } => app.paste(mime).await,
        Commands::List { tag } => app.list(tag.as_deref()).await,
        Commands::Show { id, json } => app.show(&id, json).await,
        Commands::Search { query } => app.search(&query).await,
        Commands::Edit { id, title, content } => app.edit(&id, title, content).await,
        Commands::Tag { action } => match action {
            TagAction::Add { id, tag } => app.tag(&id, &tag, true).await,
            TagAction::Remove { id, tag } => app.tag(&id, &tag, false).await,
        },
        Commands::Delete { id } => app.delete(&id).await,
        Commands::Export { dir } => app.export(&dir).await,
        Commands::Config { .. } | Commands::Warmup => Ok(ExitCode::SUCCESS),
    }
}
