use std::path::PathBuf;
use std::sync::Arc;

use teloxide::Bot;

use bot::BotContext;
use services::{Clock, QuizEngine, SessionManager};
use storage::JsonSessionStore;

/// Runtime configuration, all overridable from the environment (and `.env`).
struct Config {
    data_dir: PathBuf,
    themes_dir: PathBuf,
    media_dir: PathBuf,
}

impl Config {
    fn from_env() -> Self {
        Self {
            data_dir: env_path("QUIZ_DATA_DIR", "data/user_sessions"),
            themes_dir: env_path("QUIZ_THEMES_DIR", "questions"),
            media_dir: env_path("QUIZ_MEDIA_DIR", "audio"),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key).map_or_else(|_| PathBuf::from(default), PathBuf::from)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let config = Config::from_env();

    log::info!(
        "loading themes from {} (media in {})",
        config.themes_dir.display(),
        config.media_dir.display()
    );
    // Theme problems are configuration errors: refuse to launch.
    let bank = storage::load_theme_dir(&config.themes_dir, &config.media_dir)?;

    let store = Arc::new(JsonSessionStore::new(&config.data_dir));
    let sessions = SessionManager::new(store, Clock::default_clock());
    let engine = QuizEngine::new(Arc::new(bank), sessions);

    // TELOXIDE_TOKEN comes from the environment (or `.env`).
    let tg_bot = Bot::from_env();

    log::info!("starting quiz bot");
    bot::run(
        tg_bot,
        Arc::new(BotContext {
            engine,
            media_dir: config.media_dir,
        }),
    )
    .await;

    log::info!("quiz bot stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
