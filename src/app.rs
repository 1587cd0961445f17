use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

use crate::config::AppConfig;
use crate::features::{self, Feature};
use crate::gate::preference::{self, MemoryStore, PreferenceStore};
use crate::gate::{ConfirmationGate, ConfirmationRequest, GateState};
use crate::storage::LocalStorage;

/// Status messages clear after this long
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Work queued by gate continuations, drained after each key event
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    Run(Feature),
    Cancelled(Feature),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

pub struct App {
    pub popup: Popup,

    // Feature list
    pub features: Vec<Feature>,
    pub selected: usize,

    // Local balance (mirrors config.credits)
    pub credits: u32,

    pub config: AppConfig,
    persist_config: bool,

    // Confirmation gate and its transition feed
    pub gate: ConfirmationGate<Box<dyn PreferenceStore>>,
    gate_state: watch::Receiver<GateState>,
    pub dont_show_again: bool,
    // Last dismissal read, refreshed after key events instead of every frame
    dismissed: bool,

    actions_tx: mpsc::UnboundedSender<AppAction>,
    actions_rx: mpsc::UnboundedReceiver<AppAction>,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = AppConfig::load().unwrap_or_default();

        let store: Box<dyn PreferenceStore> = match config.storage_path() {
            Some(path) => {
                tracing::info!("Using local storage at {}", path.display());
                Box::new(LocalStorage::new(path))
            }
            None => {
                tracing::warn!("No data directory, confirmation preference will not persist");
                Box::new(MemoryStore::new())
            }
        };

        let mut app = Self::with_store(config, store);
        app.persist_config = true;
        Ok(app)
    }

    /// Build an app around an explicit store. Config changes stay in memory.
    pub fn with_store(config: AppConfig, store: Box<dyn PreferenceStore>) -> Self {
        let gate = ConfirmationGate::new(store);
        let dismissed = preference::is_dismissed(gate.store());
        let gate_state = gate.subscribe();
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();

        Self {
            popup: Popup::None,
            features: features::catalog(&config.features),
            selected: 0,
            credits: config.credits,
            config,
            persist_config: false,
            gate,
            gate_state,
            dont_show_again: false,
            dismissed,
            actions_tx,
            actions_rx,
            status_message: None,
            status_message_time: None,
        }
    }

    /// Set a status message (auto-clears after 3 seconds)
    pub(crate) fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub fn selected_feature(&self) -> Option<&Feature> {
        self.features.get(self.selected)
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    /// Re-read the dismissal preference, which another process may have changed
    fn refresh_dismissed(&mut self) {
        self.dismissed = preference::is_dismissed(self.gate.store());
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // The confirmation prompt sits above everything else
        let result = if self.gate.is_visible() {
            self.handle_prompt_key(key)
        } else if self.popup != Popup::None {
            self.handle_popup_key(key)
        } else {
            self.handle_normal_key(key)
        };

        self.sync_gate_state();
        self.process_actions();
        self.refresh_dismissed();
        result
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            KeyCode::Char(' ') | KeyCode::Enter => self.request_selected(),

            // Bring the prompt back after "don't show again"
            KeyCode::Char('R') => self.reset_confirmations()?,

            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q')
        ) {
            self.popup = Popup::None;
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => self.confirm_prompt(),
            KeyCode::Char('n') | KeyCode::Esc => self.gate.cancel(),
            KeyCode::Char('d') | KeyCode::Char(' ') => self.dont_show_again = !self.dont_show_again,
            _ => {}
        }
        Ok(())
    }

    fn move_down(&mut self) {
        if !self.features.is_empty() {
            self.selected = (self.selected + 1) % self.features.len();
        }
    }

    fn move_up(&mut self) {
        if !self.features.is_empty() {
            self.selected = if self.selected == 0 {
                self.features.len() - 1
            } else {
                self.selected - 1
            };
        }
    }

    /// Send the selected feature through the confirmation gate
    fn request_selected(&mut self) {
        let Some(feature) = self.selected_feature().cloned() else {
            return;
        };

        let confirm_tx = self.actions_tx.clone();
        let cancel_tx = self.actions_tx.clone();
        let on_confirm = feature.clone();
        let on_cancel = feature.clone();

        let mut request = ConfirmationRequest::new(feature.name.clone(), feature.credits, move || {
            let _ = confirm_tx.send(AppAction::Run(on_confirm));
        })
        .on_cancel(move || {
            let _ = cancel_tx.send(AppAction::Cancelled(on_cancel));
        });

        if let Some(detail) = &feature.detail {
            request = request.with_detail(detail.clone());
        }

        self.gate.trigger(request);
    }

    fn confirm_prompt(&mut self) {
        let saved = if self.dont_show_again {
            preference::set_dismissed(self.gate.store_mut(), true)
        } else {
            Ok(())
        };

        self.gate.confirm();
        self.process_actions();

        // Keep the failure visible over the spend message
        if let Err(e) = saved {
            tracing::warn!("Could not save dismissal preference: {}", e);
            self.set_status(format!("Could not save preference: {}", e));
        }
    }

    fn reset_confirmations(&mut self) -> Result<()> {
        preference::set_dismissed(self.gate.store_mut(), false)?;
        self.set_status("Credit confirmations re-enabled");
        Ok(())
    }

    /// Follow gate transitions published on the watch channel
    fn sync_gate_state(&mut self) {
        if !self.gate_state.has_changed().unwrap_or(false) {
            return;
        }

        let state = self.gate_state.borrow_and_update().clone();
        if let GateState::Pending(view) = state {
            tracing::debug!("Prompt opened for '{}'", view.feature_name);
            self.dont_show_again = false;
        }
    }

    /// Run everything the gate's continuations queued
    pub fn process_actions(&mut self) {
        while let Ok(action) = self.actions_rx.try_recv() {
            match action {
                AppAction::Run(feature) => self.run_feature(&feature),
                AppAction::Cancelled(feature) => {
                    self.set_status(format!("Cancelled {}", feature.name));
                }
            }
        }
    }

    fn run_feature(&mut self, feature: &Feature) {
        if self.credits < feature.credits {
            tracing::warn!(
                "Refusing '{}': needs {} credits, balance {}",
                feature.id,
                feature.credits,
                self.credits
            );
            self.set_status(format!(
                "Not enough credits for {} (need {}, have {})",
                feature.name, feature.credits, self.credits
            ));
            return;
        }

        self.credits -= feature.credits;
        self.config.credits = self.credits;
        if self.persist_config {
            if let Err(e) = self.config.save() {
                tracing::warn!("Failed to save credit balance: {}", e);
            }
        }

        tracing::info!(
            "Running '{}' for {} credits, {} left",
            feature.id,
            feature.credits,
            self.credits
        );
        self.set_status(format!(
            "Spent {} credits on {} ({} left)",
            feature.credits, feature.name, self.credits
        ));

        if self.config.notifications {
            let body = format!("{} started ({} credits)", feature.name, feature.credits);
            if let Err(e) = notify("creditgate", &body) {
                tracing::warn!("Notification failed: {}", e);
            }
        }
    }

    /// Periodic housekeeping, called from the main loop
    pub fn tick(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() >= STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        self.sync_gate_state();
    }
}

pub fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("dialog-information")
        .show()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::preference::tests::BrokenStore;
    use crate::gate::preference::StorageError;
    use std::cell::Cell;
    use std::rc::Rc;

    fn app_with_credits(credits: u32) -> App {
        let config = AppConfig {
            credits,
            ..AppConfig::default()
        };
        App::with_store(config, Box::new(MemoryStore::new()))
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::from(code)).unwrap();
    }

    /// Memory store that counts reads
    struct CountingStore {
        inner: MemoryStore,
        reads: Rc<Cell<u32>>,
    }

    impl PreferenceStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.reads.set(self.reads.get() + 1);
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_enter_opens_prompt_without_spending() {
        let mut app = app_with_credits(100);

        press(&mut app, KeyCode::Enter);

        let view = app.gate.prompt().unwrap();
        assert_eq!(view.feature_name, "진단");
        assert_eq!(view.credit_amount, 8);
        assert_eq!(app.credits, 100);
    }

    #[test]
    fn test_confirm_spends_credits() {
        let mut app = app_with_credits(100);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('y'));

        assert!(!app.gate.is_visible());
        assert_eq!(app.credits, 92);
        assert_eq!(app.config.credits, 92);
    }

    #[test]
    fn test_cancel_keeps_credits() {
        let mut app = app_with_credits(100);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);

        assert!(!app.gate.is_visible());
        assert_eq!(app.credits, 100);
        assert_eq!(app.status_message.as_deref(), Some("Cancelled 진단"));
    }

    #[test]
    fn test_dont_show_again_skips_next_prompt() {
        let mut app = app_with_credits(100);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('d'));
        assert!(app.dont_show_again);
        press(&mut app, KeyCode::Enter);

        assert!(app.is_dismissed());
        assert_eq!(app.credits, 92);

        // Next request runs straight through
        press(&mut app, KeyCode::Enter);
        assert!(!app.gate.is_visible());
        assert_eq!(app.credits, 84);

        // Reset brings the prompt back
        press(&mut app, KeyCode::Char('R'));
        assert!(!app.is_dismissed());
        press(&mut app, KeyCode::Enter);
        assert!(app.gate.is_visible());
        assert!(!app.dont_show_again);
    }

    #[test]
    fn test_insufficient_credits_refused() {
        let mut app = app_with_credits(5);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('y'));

        assert_eq!(app.credits, 5);
        assert!(app
            .status_message
            .as_deref()
            .unwrap()
            .starts_with("Not enough credits"));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app_with_credits(100);
        let count = app.features.len();

        press(&mut app, KeyCode::Up);
        assert_eq!(app.selected, count - 1);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_keys_go_to_prompt_first() {
        let mut app = app_with_credits(100);

        press(&mut app, KeyCode::Enter);
        // 'j' would move the selection if the prompt did not capture it
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected, 0);
        assert!(app.gate.is_visible());
    }

    #[test]
    fn test_failed_dismissal_save_stays_visible() {
        let mut app = App::with_store(AppConfig::default(), Box::new(BrokenStore));

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.credits, 92);
        assert!(app
            .status_message
            .as_deref()
            .unwrap()
            .starts_with("Could not save preference"));
        assert!(!app.is_dismissed());
    }

    #[test]
    fn test_dismissal_cached_between_keys() {
        let reads = Rc::new(Cell::new(0));
        let store = CountingStore {
            inner: MemoryStore::new(),
            reads: Rc::clone(&reads),
        };
        let mut app = App::with_store(AppConfig::default(), Box::new(store));

        let before = reads.get();
        for _ in 0..10 {
            assert!(!app.is_dismissed());
            app.tick();
        }
        assert_eq!(reads.get(), before);

        // Written behind the app's back, seen after the next key
        preference::set_dismissed(app.gate.store_mut(), true).unwrap();
        assert!(!app.is_dismissed());
        press(&mut app, KeyCode::Down);
        assert!(app.is_dismissed());
    }

    #[test]
    fn test_status_clears_after_timeout() {
        let mut app = app_with_credits(100);

        app.set_status("Spent 8 credits");
        app.tick();
        assert_eq!(app.status_message.as_deref(), Some("Spent 8 credits"));

        app.status_message_time = Instant::now().checked_sub(STATUS_TIMEOUT);
        app.tick();
        assert!(app.status_message.is_none());
        assert!(app.status_message_time.is_none());
    }
}
