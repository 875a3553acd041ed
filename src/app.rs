use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::chat::{ChatState, ReprocessOutcome, SendOutcome, Sender};
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    pub chat: ChatState,

    // Conversation viewport
    pub chat_scroll: u16,
    pub follow_bottom: bool,
    pub chat_height: u16,
    pub chat_width: u16,

    pub animation_frame: u8,

    backend: Arc<dyn Backend>,
    pub backend_url: String,
    send_task: Option<JoinHandle<anyhow::Result<String>>>,
    reprocess_task: Option<JoinHandle<anyhow::Result<()>>>,
}

impl App {
    pub fn new(backend: Arc<dyn Backend>, backend_url: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Landing,
            input_mode: InputMode::Normal,

            chat: ChatState::new(),

            chat_scroll: 0,
            follow_bottom: true,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            backend,
            backend_url: backend_url.into(),
            send_task: None,
            reprocess_task: None,
        }
    }

    /// Landing -> chat. The input field takes focus on arrival.
    pub fn open_chat(&mut self) {
        self.screen = Screen::Chat;
        self.input_mode = InputMode::Editing;
        self.scroll_to_bottom();
    }

    pub fn leave_chat(&mut self) {
        self.screen = Screen::Landing;
        self.input_mode = InputMode::Normal;
    }

    /// Start a send if the input allows it; the reply lands via `poll_tasks`.
    pub fn submit(&mut self) {
        let Some(text) = self.chat.begin_send() else {
            return;
        };
        tracing::info!(chars = text.chars().count(), "submitting chat message");

        let backend = Arc::clone(&self.backend);
        self.send_task = Some(tokio::spawn(async move { backend.chat(&text).await }));
        self.scroll_to_bottom();
    }

    pub fn reprocess(&mut self) {
        if !self.chat.begin_reprocess() {
            return;
        }
        tracing::info!("reprocessing documents");

        let backend = Arc::clone(&self.backend);
        self.reprocess_task = Some(tokio::spawn(async move { backend.reprocess().await }));
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.send_task.is_some() || self.reprocess_task.is_some()
    }

    /// Apply the outcome of any request that has settled.
    pub async fn poll_tasks(&mut self) {
        if self.send_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.send_task.take() {
                let reply = task
                    .await
                    .unwrap_or_else(|e| Err(anyhow!("chat task failed: {}", e)));
                if self.chat.finish_send(reply) == SendOutcome::Replied {
                    // Focus back on the entry field
                    if self.screen == Screen::Chat {
                        self.input_mode = InputMode::Editing;
                    }
                }
                self.scroll_to_bottom();
            }
        }

        if self.reprocess_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.reprocess_task.take() {
                let result = task
                    .await
                    .unwrap_or_else(|e| Err(anyhow!("reprocess task failed: {}", e)));
                if self.chat.finish_reprocess(result) != ReprocessOutcome::Skipped {
                    self.scroll_to_bottom();
                }
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_loading() || self.chat.is_reprocessing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.chat_scroll = self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.min(self.max_scroll()).saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_bottom = self.chat_scroll >= max;
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_bottom = false;
        self.chat_scroll = 0;
    }

    /// Keep the viewport consistent with the latest layout; called on every render.
    pub fn sync_scroll(&mut self) {
        let max = self.max_scroll();
        if self.follow_bottom || self.chat_scroll > max {
            self.chat_scroll = max;
        }
    }

    fn max_scroll(&self) -> u16 {
        // Defaults cover the first frame, before the chat area is known
        let width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let height = if self.chat_height > 0 { self.chat_height } else { 20 };
        conversation_height(&self.chat, self.animation_frame, width).saturating_sub(height)
    }
}

/// Rows the conversation occupies at `width`, measured on the paragraph `ui` draws.
///
/// Saturates at `u16::MAX`, the furthest a `Paragraph` can scroll.
pub fn conversation_height(chat: &ChatState, animation_frame: u8, width: u16) -> u16 {
    let rows = ui::conversation(chat, animation_frame).line_count(width);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

pub fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You",
        Sender::Ai => "Talk 2 DAU",
    }
}
