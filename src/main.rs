use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fredometer::config::AppConfig;
use fredometer::conversation_log::ConversationLog;
use fredometer::db::{ingest, FaqRepository, SqliteExecutor};
use fredometer::intent::RelevanceClassifier;
use fredometer::logging::init_logging;
use fredometer::request::sanitize_message;
use fredometer::DataAssistant;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "fredometer")]
#[command(about = "Answer questions about the fredometer humanitarian statistics tables")]
struct Args {
    /// Path to the SQLite database (or set FREDOMETER_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Generation API key (or set GENERATION_API_KEY / GEMINI_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question and print the generated answer
    Ask { message: String },
    /// Show intent, rendered lookups and the prompt without calling the generation service
    Classify { message: String },
    /// Create the tables and load a CSV file into one of them
    Seed {
        #[arg(long)]
        table: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Manage curated FAQ entries
    Faq {
        #[command(subcommand)]
        action: FaqAction,
    },
    /// Print the schema description
    Schema,
}

#[derive(Subcommand)]
enum FaqAction {
    Add {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
    },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if let Some(key) = args.api_key {
        config.api_key = Some(key);
    }
    init_logging(config.error_log.as_deref())?;

    let registry = Arc::new(config.load_registry()?);

    match args.command {
        Command::Ask { message } => {
            let message = sanitize_message(&message);
            anyhow::ensure!(!message.is_empty(), "Missing \"message\"");

            let mut assistant = DataAssistant::new(Arc::clone(&registry), config.generation_client()?);
            if let Some(path) = &config.conversation_log {
                assistant = assistant.with_conversation_log(ConversationLog::open(path)?);
            }
            let executor = SqliteExecutor::open(&config.database_path)?;
            let response = assistant.answer(&message, &executor).await?;
            println!("{}", response.response);
        }
        Command::Classify { message } => {
            let message = sanitize_message(&message);
            let executor = SqliteExecutor::open(&config.database_path)?;
            let classifier = RelevanceClassifier::new(&registry);
            let intent = classifier.classify(&message, &executor);
            println!("{}", serde_json::to_string_pretty(&intent)?);

            if intent.is_related {
                for table in registry.tables_for(&intent) {
                    let predicates = fredometer::predicate::build_predicates(&message, table);
                    let query = predicates.render(table, fredometer::retrieval::MAX_ROWS_PER_TABLE);
                    println!("\n[{}]", table.name());
                    for condition in predicates.conditions() {
                        println!("  {}", condition);
                    }
                    println!("  SQL: {}", query.sql);
                    println!("  types: {}", query.type_tags());
                }
            }
        }
        Command::Seed { table, csv } => {
            let schema = registry
                .table(&table)
                .with_context(|| format!("unknown table '{}'", table))?;
            let mut conn = Connection::open(&config.database_path)
                .with_context(|| format!("opening {}", config.database_path.display()))?;
            ingest::create_tables(&conn, &registry)?;
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("opening {}", csv.display()))?;
            let inserted = ingest::load_csv(&mut conn, schema, file)?;
            info!("Seeded {} with {} rows", schema.name(), inserted);
            println!("Inserted {} rows into {}", inserted, schema.name());
        }
        Command::Faq { action } => {
            let repo = FaqRepository::new(Connection::open(&config.database_path)?)?;
            match action {
                FaqAction::Add { question, answer } => {
                    let entry = repo.add(&question, &answer)?;
                    println!("Saved FAQ #{}", entry.id);
                }
                FaqAction::List => {
                    for entry in repo.list()? {
                        println!("#{} Q: {}\n   A: {}", entry.id, entry.question, entry.answer);
                    }
                }
            }
        }
        Command::Schema => {
            println!("Schema version {}", registry.version());
            print!("{}", registry.describe());
        }
    }

    Ok(())
}
