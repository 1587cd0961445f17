mod app;
mod config;
mod features;
mod gate;
mod storage;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::cell::Cell;
use std::io;
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use config::AppConfig;
use gate::preference::{is_dismissed, set_dismissed};
use gate::{ConfirmationGate, ConfirmationRequest};
use storage::LocalStorage;

#[derive(Parser, Debug)]
#[command(name = "creditgate")]
#[command(author = "Sean Fournier")]
#[command(version = "0.1.0")]
#[command(about = "Review dashboard that asks before spending credits")]
struct Args {
    /// Output confirmation and credit status as JSON
    #[arg(short, long)]
    status: bool,

    /// Run a single feature by id (asks on stdin unless confirmations are off)
    #[arg(short, long)]
    run: Option<String>,

    /// Ask again before spending credits
    #[arg(long, conflicts_with = "dismiss_confirmations")]
    reset_confirmations: bool,

    /// Stop asking before spending credits
    #[arg(long)]
    dismiss_confirmations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let headless = args.status
        || args.run.is_some()
        || args.reset_confirmations
        || args.dismiss_confirmations;

    init_logging(headless);

    let config = AppConfig::load()?;

    if args.status {
        return print_status(&config);
    }

    if args.reset_confirmations || args.dismiss_confirmations {
        let mut storage = open_storage(&config)?;
        set_dismissed(&mut storage, args.dismiss_confirmations)?;
        println!(
            "Credit confirmations {}",
            if args.dismiss_confirmations { "disabled" } else { "enabled" }
        );
        return Ok(());
    }

    if let Some(feature) = args.run {
        return run_headless(config, &feature).await;
    }

    ui::set_theme(theme::Theme::from_overrides(&config.theme));
    run_tui()
}

/// Log to stderr for one-shot commands, to a file while the TUI owns the terminal
fn init_logging(headless: bool) {
    let log_file = if headless {
        None
    } else {
        LocalStorage::default_path()
            .and_then(|p| p.parent().map(|d| d.join("creditgate.log")))
            .and_then(|path| {
                std::fs::create_dir_all(path.parent()?).ok()?;
                std::fs::OpenOptions::new().create(true).append(true).open(path).ok()
            })
    };

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::from_default_env());

    match log_file {
        Some(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init(),
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
    }
}

fn open_storage(config: &AppConfig) -> Result<LocalStorage> {
    let path = config
        .storage_path()
        .context("Could not find a data directory for local storage")?;
    Ok(LocalStorage::new(path))
}

fn print_status(config: &AppConfig) -> Result<()> {
    let storage = open_storage(config)?;
    let features = features::catalog(&config.features);

    let output = serde_json::json!({
        "dismissed": is_dismissed(&storage),
        "storage": storage.path(),
        "credits": config.credits,
        "features": features,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Push one feature through the gate, rendering the prompt as a stdin question
async fn run_headless(mut config: AppConfig, id: &str) -> Result<()> {
    let features = features::catalog(&config.features);
    let feature = features::find(&features, id)
        .cloned()
        .with_context(|| format!("Unknown feature '{}'", id))?;

    let confirmed = Rc::new(Cell::new(false));
    let cancelled = Rc::new(Cell::new(false));

    let mut gate = ConfirmationGate::new(open_storage(&config)?);
    let mut request = ConfirmationRequest::new(feature.name.clone(), feature.credits, {
        let confirmed = Rc::clone(&confirmed);
        move || confirmed.set(true)
    })
    .on_cancel({
        let cancelled = Rc::clone(&cancelled);
        move || cancelled.set(true)
    });
    if let Some(detail) = &feature.detail {
        request = request.with_detail(detail.clone());
    }

    gate.trigger(request);

    if let Some(view) = gate.prompt() {
        let mut stdout = tokio::io::stdout();
        let mut question = format!(
            "Spend {} credits on {}? (balance {})",
            view.credit_amount, view.feature_name, config.credits
        );
        if let Some(detail) = &view.detail {
            question.push_str(&format!("\n  {}", detail));
        }
        question.push_str(" [y/N] ");
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;

        let mut answer = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut answer).await?;

        if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            gate.confirm();
        } else {
            gate.cancel();
        }
    }

    if cancelled.get() {
        println!("Cancelled {}", feature.name);
        return Ok(());
    }

    if !confirmed.get() {
        return Ok(());
    }

    if config.credits < feature.credits {
        anyhow::bail!(
            "Not enough credits for {} (need {}, have {})",
            feature.name,
            feature.credits,
            config.credits
        );
    }

    config.credits -= feature.credits;
    config.save()?;
    tracing::info!("Ran '{}' headless, {} credits left", feature.id, config.credits);
    println!(
        "Spent {} credits on {} ({} left)",
        feature.credits, feature.name, config.credits
    );

    if config.notifications {
        app::notify("creditgate", &format!("{} started", feature.name))?;
    }

    Ok(())
}

fn run_tui() -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = App::new().and_then(|mut app| run_app(&mut terminal, &mut app));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if !app.gate.is_visible() && app.popup == app::Popup::None => {
                            return Ok(())
                        }
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key) {
                                app.set_status(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        app.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_reset_and_dismiss_conflict() {
        let parsed = Args::try_parse_from([
            "creditgate",
            "--reset-confirmations",
            "--dismiss-confirmations",
        ]);
        assert!(parsed.is_err());

        let parsed = Args::try_parse_from(["creditgate", "--run", "diagnosis"]).unwrap();
        assert_eq!(parsed.run.as_deref(), Some("diagnosis"));
    }
}
