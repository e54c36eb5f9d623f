use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::client::{ChatTransport, HealthStatus};
use crate::conversation::{Conversation, Submission};
use crate::error::TransportError;
use crate::ui;

/// Backend reachability as last observed from `/health`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Checking,
    Up(String),
    Unreachable,
}

pub struct App {
    pub should_quit: bool,
    pub api_url: String,
    pub conversation: Conversation,

    // Input cursor, as a char index into the conversation's input buffer
    pub cursor: usize,

    // Chat view scroll state
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub backend: BackendStatus,
    health_task: Option<JoinHandle<Result<HealthStatus, TransportError>>>,
}

impl App {
    pub fn new(transport: Arc<dyn ChatTransport>, api_url: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            api_url: api_url.into(),
            conversation: Conversation::new(transport),
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
            backend: BackendStatus::Checking,
            health_task: None,
        }
    }

    /// Kick off a one-off `/health` probe for the header
    pub fn start_health_check(&mut self) {
        let transport = self.conversation.transport();
        self.backend = BackendStatus::Checking;
        self.health_task = Some(tokio::spawn(async move { transport.check_health().await }));
    }

    pub fn is_busy(&self) -> bool {
        self.conversation.is_busy()
    }

    pub fn input(&self) -> &str {
        self.conversation.input()
    }

    /// Submit the input box. Keeps the newest entry in view when accepted.
    pub fn submit(&mut self) -> Submission {
        let outcome = self.conversation.submit_input();
        if outcome == Submission::Sent {
            self.cursor = 0;
            self.animation_frame = 0;
            self.scroll_to_bottom();
        }
        outcome
    }

    /// Collect any background work that has finished
    pub async fn poll_background(&mut self) {
        if self.conversation.poll_reply().await {
            self.scroll_to_bottom();
        }

        if let Some(task) = self.health_task.take_if(|task| task.is_finished()) {
            self.backend = match task.await {
                Ok(Ok(health)) => {
                    info!(status = %health.status, "backend health");
                    BackendStatus::Up(health.status)
                }
                Ok(Err(_)) => BackendStatus::Unreachable,
                Err(e) => {
                    warn!(error = %e, "health check task did not complete");
                    BackendStatus::Unreachable
                }
            };
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing. All of these are ignored while a reply is pending.

    pub fn insert_char(&mut self, c: char) {
        if self.is_busy() {
            return;
        }
        let byte_pos = char_to_byte_index(self.input(), self.cursor);
        self.conversation.input_mut().insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.is_busy() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(self.input(), self.cursor);
        self.conversation.input_mut().remove(byte_pos);
    }

    pub fn delete_at_cursor(&mut self) {
        if self.is_busy() || self.cursor >= self.input().chars().count() {
            return;
        }
        let byte_pos = char_to_byte_index(self.input(), self.cursor);
        self.conversation.input_mut().remove(byte_pos);
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input().chars().count();
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = (self.chat_scroll + 1).min(self.max_scroll());
    }

    pub fn scroll_half_page_up(&mut self) {
        let half = (self.visible_height() / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_sub(half);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half = (self.visible_height() / 2).max(1);
        self.chat_scroll = (self.chat_scroll + half).min(self.max_scroll());
    }

    /// Scroll chat so the newest entry (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    fn max_scroll(&self) -> u16 {
        self.total_chat_lines().saturating_sub(self.visible_height())
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered chat lines at the current width, as wrapped by `ui`
    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width, default to 50 before the first draw
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };

        let lines = ui::chat_paragraph(self).line_count(wrap_width);
        u16::try_from(lines).unwrap_or(u16::MAX)
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
