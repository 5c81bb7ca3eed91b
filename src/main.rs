//! Research Assistant console front end.
//!
//! Type a query to search. Lines starting with `/` are commands; `/help`
//! lists them.

use std::io::{self, Write};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use research_assistant::app::App;
use research_assistant::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use research_assistant::services::summary::generate_summary;
use research_assistant::telemetry;
use research_assistant::types::article::Article;
use research_assistant::types::view::{ResultOrigin, SearchOutcome, ViewMode};

const HELP: &str = "\
  <text>                  search for <text>
  /login <email> <pass>   sign in
  /logout                 sign out
  /history                list recent searches
  /open <n>               reopen history entry n
  /delete <n>             delete history entry n
  /check                  test the history store connection
  /summary <n>            summarise result n
  /export <n>             export the summary of result n
  /help                   show this help
  /quit                   exit";

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn print_outcome(outcome: &SearchOutcome, mode: &ViewMode) {
    let heading = match mode {
        ViewMode::Replay { query, .. } => format!("History: {}", query),
        _ => format!("Results for \"{}\"", outcome.query),
    };
    section(&heading);
    if outcome.origin == ResultOrigin::Fallback {
        println!("  (no structured response from the backend; showing sample articles)");
    }
    for (i, article) in outcome.articles.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, article.title);
        let mut meta = vec![article.source.clone().unwrap_or_else(|| "Unknown source".to_string())];
        if let Some(year) = &article.year {
            meta.push(year.clone());
        }
        if let Some(c) = &article.citations {
            meta.push(format!("cited by {}", c));
        }
        println!("      {}  {}", meta.join(" · "), article.url);
    }
    println!();
}

/// Parses a 1-based index argument.
fn index_arg(arg: Option<&str>, len: usize) -> Option<usize> {
    let n: usize = arg?.trim().parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

fn result_at(app: &App, arg: Option<&str>) -> Option<Article> {
    let outcome = app.search.results()?;
    let i = index_arg(arg, outcome.articles.len())?;
    outcome.articles.get(i).cloned()
}

async fn run_command(app: &App, line: &str) -> bool {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or("");
    let arg = parts.next();

    match command {
        "/quit" | "/exit" => return false,
        "/help" => println!("{}", HELP),
        "/login" => {
            let mut creds = arg.unwrap_or("").split_whitespace();
            match (creds.next(), creds.next()) {
                (Some(email), Some(password)) => match app.login(email, password).await {
                    Ok(summary) => println!(
                        "  Signed in as {} ({} searches in history)",
                        summary.email.unwrap_or_default(),
                        app.history().len()
                    ),
                    Err(e) => println!("  {}", e),
                },
                _ => println!("  usage: /login <email> <password>"),
            }
        }
        "/logout" => {
            app.logout().await;
            println!("  Signed out");
        }
        "/history" => {
            section("Search History");
            let entries = app.history().entries();
            if entries.is_empty() {
                println!("  No search history yet");
            }
            for (i, entry) in entries.iter().enumerate() {
                println!(
                    "  {:>2}. {}  ({} results, {})",
                    i + 1,
                    entry.query,
                    entry.result_count,
                    entry.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        "/open" | "/delete" => {
            let entries = app.history().entries();
            let Some(entry) = index_arg(arg, entries.len()).and_then(|i| entries.get(i)) else {
                println!("  usage: {} <n>  (see /history)", command);
                return true;
            };
            let session = app.session();
            if command == "/open" {
                let search_id = (!entry.is_placeholder()).then_some(entry.id.as_str());
                match app.search.open_history(&entry.query, search_id, &session).await {
                    Ok(outcome) => print_outcome(&outcome, &app.search.mode()),
                    Err(e) => println!("  {}", e),
                }
            } else {
                match app.history().delete_entry(&session, entry).await {
                    Ok(()) => println!("  Deleted \"{}\"", entry.query),
                    Err(e) => println!("  {}", e),
                }
            }
        }
        "/check" => {
            let session = app.session();
            println!("  {}", app.history().check_connection(&session).await);
        }
        "/summary" | "/export" => {
            let Some(article) = result_at(app, arg) else {
                println!("  usage: {} <n>  (search first)", command);
                return true;
            };
            let summary = generate_summary(&article);
            if command == "/summary" {
                section("Summary");
                println!("{}", summary);
            } else {
                match app.exporter.export(&article, &summary) {
                    Ok(file) => println!("  Wrote {} ({} page(s))", file.path.display(), file.pages),
                    Err(e) => println!("  Export failed: {}", e),
                }
            }
        }
        _ => println!("  unknown command {}, try /help", command),
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("RESEARCH_ASSISTANT_CONFIG").ok();
    let mut settings = SettingsEngine::new(config_path);
    let loaded = settings.load();
    let filter = loaded
        .as_ref()
        .map(|c| c.logging.filter.clone())
        .unwrap_or_else(|_| "warn".to_string());
    telemetry::init(&filter);
    if let Err(e) = &loaded {
        tracing::warn!(error = %e, "using default configuration");
    }

    let app = App::with_settings(settings).context("failed to initialize research assistant")?;

    println!();
    println!("  Research Assistant v{}", env!("CARGO_PKG_VERSION"));
    println!("  Backend: {}", app.config.backend.url);
    if app.auth.is_none() {
        println!("  No auth service configured; history stays on this machine");
    }
    println!("  Type a query, or /help");
    println!();

    if let Err(e) = app.startup().await {
        println!("  {}", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            prompt();
            continue;
        }
        if line.starts_with('/') {
            if !run_command(&app, line).await {
                break;
            }
        } else {
            let session = app.session();
            match app.search.submit(line, &session).await {
                Ok(outcome) => print_outcome(&outcome, &app.search.mode()),
                Err(e) => println!("  {}", e),
            }
        }
        prompt();
    }
    Ok(())
}
