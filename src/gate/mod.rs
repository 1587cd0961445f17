//! Credit confirmation gate
//!
//! Runs a caller's action only after the user confirms spending credits on
//! it, unless the user has opted out of these prompts. The gate has two
//! states:
//! - `Idle`: nothing pending, prompt hidden
//! - `Pending`: one request stored, prompt visible
//!
//! Every transition is published on a watch channel so a renderer can
//! follow the gate without the gate knowing which toolkit draws it.

pub mod preference;

use tokio::sync::watch;

use preference::{is_dismissed, PreferenceStore};

/// Zero-argument continuation run when a request resolves
pub type Continuation = Box<dyn FnOnce()>;

/// One pending "spend credits on this?" question
pub struct ConfirmationRequest {
    pub feature_name: String,
    pub credit_amount: u32,
    pub detail: Option<String>,
    on_confirm: Continuation,
    on_cancel: Option<Continuation>,
}

impl ConfirmationRequest {
    pub fn new(
        feature_name: impl Into<String>,
        credit_amount: u32,
        on_confirm: impl FnOnce() + 'static,
    ) -> Self {
        let feature_name = feature_name.into();
        debug_assert!(!feature_name.trim().is_empty(), "feature name must not be empty");

        Self {
            feature_name,
            credit_amount,
            detail: None,
            on_confirm: Box::new(on_confirm),
            on_cancel: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn on_cancel(mut self, on_cancel: impl FnOnce() + 'static) -> Self {
        self.on_cancel = Some(Box::new(on_cancel));
        self
    }

    fn view(&self) -> PromptView {
        PromptView {
            feature_name: self.feature_name.clone(),
            credit_amount: self.credit_amount,
            detail: self.detail.clone(),
        }
    }
}

impl std::fmt::Debug for ConfirmationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationRequest")
            .field("feature_name", &self.feature_name)
            .field("credit_amount", &self.credit_amount)
            .field("detail", &self.detail)
            .field("has_cancel", &self.on_cancel.is_some())
            .finish()
    }
}

/// What a renderer needs to draw the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView {
    pub feature_name: String,
    pub credit_amount: u32,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Idle,
    Pending(PromptView),
}

impl GateState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

pub struct ConfirmationGate<S: PreferenceStore> {
    store: S,
    pending: Option<ConfirmationRequest>,
    state_tx: watch::Sender<GateState>,
}

impl<S: PreferenceStore> ConfirmationGate<S> {
    pub fn new(store: S) -> Self {
        let (state_tx, _) = watch::channel(GateState::Idle);
        Self {
            store,
            pending: None,
            state_tx,
        }
    }

    /// Ask for confirmation, or run `on_confirm` right away if the user
    /// dismissed these prompts. A request already pending is replaced and
    /// its continuations are dropped without running.
    pub fn trigger(&mut self, request: ConfirmationRequest) {
        if is_dismissed(&self.store) {
            tracing::debug!(
                "Confirmation dismissed, running '{}' ({} credits) directly",
                request.feature_name,
                request.credit_amount
            );
            (request.on_confirm)();
            return;
        }

        if let Some(previous) = &self.pending {
            tracing::debug!(
                "Replacing pending confirmation '{}' with '{}'",
                previous.feature_name,
                request.feature_name
            );
        }

        let view = request.view();
        self.pending = Some(request);
        self.state_tx.send_replace(GateState::Pending(view));
    }

    /// User accepted the prompt. No-op when nothing is pending.
    pub fn confirm(&mut self) {
        let Some(request) = self.pending.take() else {
            return;
        };

        tracing::info!(
            "Confirmed '{}' for {} credits",
            request.feature_name,
            request.credit_amount
        );
        (request.on_confirm)();
        self.state_tx.send_replace(GateState::Idle);
    }

    /// User declined or dismissed the prompt. No-op when nothing is pending.
    pub fn cancel(&mut self) {
        let Some(request) = self.pending.take() else {
            return;
        };

        tracing::info!("Cancelled '{}'", request.feature_name);
        if let Some(on_cancel) = request.on_cancel {
            on_cancel();
        }
        self.state_tx.send_replace(GateState::Idle);
    }

    /// The prompt to draw, or `None` when it is hidden
    pub fn prompt(&self) -> Option<PromptView> {
        self.pending.as_ref().map(ConfirmationRequest::view)
    }

    pub fn is_visible(&self) -> bool {
        self.pending.is_some()
    }

    pub fn state(&self) -> GateState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state_tx.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Access for the control that toggles the dismissal flag
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
