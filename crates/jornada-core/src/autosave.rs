//! Debounced background writer for the notes pad.
//!
//! Edits are sent over an mpsc channel to a spawned task. The task keeps
//! only the latest text and saves it once no edit has arrived for
//! [`AUTOSAVE_DELAY`]. Progress is published on a watch channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::api::Backend;
use crate::cache::QueryCache;
use crate::resources::save_notes;

/// Quiet period after the last edit before the notes are saved.
pub const AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

const CHANNEL_BUFFER_SIZE: usize = 32;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutosaveStatus {
    pub saving: bool,
    pub last_saved: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

enum Command {
    Edit(String),
    Flush(oneshot::Sender<()>),
}

struct Writer {
    cache: QueryCache,
    backend: Arc<dyn Backend>,
    user_id: String,
    status: watch::Sender<AutosaveStatus>,
}

impl Writer {
    async fn run(self, mut rx: mpsc::Receiver<Command>, delay: Duration) {
        let mut pending: Option<String> = None;

        loop {
            let command = if pending.is_some() {
                tokio::select! {
                    command = rx.recv() => command,
                    _ = tokio::time::sleep(delay) => {
                        if let Some(text) = pending.take() {
                            self.save(&text).await;
                        }
                        continue;
                    }
                }
            } else {
                rx.recv().await
            };

            match command {
                Some(Command::Edit(text)) => pending = Some(text),
                Some(Command::Flush(ack)) => {
                    if let Some(text) = pending.take() {
                        self.save(&text).await;
                    }
                    let _ = ack.send(());
                }
                None => {
                    if pending.is_some() {
                        debug!(user_id = %self.user_id, "Autosave closed with unsaved edits");
                    }
                    break;
                }
            }
        }
    }

    async fn save(&self, text: &str) {
        if text.trim().is_empty() {
            debug!(user_id = %self.user_id, "Skipping autosave of blank notes");
            return;
        }

        self.status.send_modify(|status| status.saving = true);
        let result = save_notes(&self.cache, self.backend.as_ref(), &self.user_id, text).await;

        self.status.send_modify(|status| {
            status.saving = false;
            match result {
                Ok(_) => {
                    status.last_saved = Some(Utc::now());
                    status.last_error = None;
                }
                Err(e) => {
                    error!(user_id = %self.user_id, error = %e, "Failed to autosave notes");
                    status.last_error = Some(e.to_string());
                }
            }
        });
    }
}

/// Handle to a running autosave task. Dropping it stops the task and
/// discards any edit still waiting for its quiet period.
pub struct NotesAutosave {
    tx: mpsc::Sender<Command>,
    status: watch::Receiver<AutosaveStatus>,
    task: JoinHandle<()>,
}

impl NotesAutosave {
    pub fn spawn(cache: QueryCache, backend: Arc<dyn Backend>, user_id: &str) -> Self {
        Self::with_delay(cache, backend, user_id, AUTOSAVE_DELAY)
    }

    pub fn with_delay(cache: QueryCache, backend: Arc<dyn Backend>, user_id: &str, delay: Duration) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (status_tx, status) = watch::channel(AutosaveStatus::default());
        let writer = Writer {
            cache,
            backend,
            user_id: user_id.to_string(),
            status: status_tx,
        };
        let task = tokio::spawn(writer.run(rx, delay));

        Self { tx, status, task }
    }

    /// Record new text, restarting the quiet period.
    pub async fn edit(&self, text: impl Into<String>) {
        if self.tx.send(Command::Edit(text.into())).await.is_err() {
            warn!("Autosave task is no longer running");
        }
    }

    /// Save any pending text now and wait for the write to finish.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).await.is_err() {
            warn!("Autosave task is no longer running");
            return;
        }
        let _ = done.await;
    }

    pub fn status(&self) -> AutosaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutosaveStatus> {
        self.status.clone()
    }
}

impl Drop for NotesAutosave {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Whitespace-separated word count shown under the notes pad.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Lines with something other than whitespace on them.
pub fn line_count(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryBackend;
    use crate::resources::NOTES_TABLE;

    fn autosave(memory: &Arc<MemoryBackend>) -> NotesAutosave {
        NotesAutosave::spawn(QueryCache::new(), memory.clone(), "u-1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_saves_after_quiet_period() {
        let memory = Arc::new(MemoryBackend::new());
        let notes = autosave(&memory);

        notes.edit("Ideias").await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        notes.edit("Ideias para a semana").await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(memory.write_count(), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(memory.write_count(), 1);
        assert_eq!(memory.rows(NOTES_TABLE)[0]["conteudo"], "Ideias para a semana");

        let status = notes.status();
        assert!(!status.saving);
        assert!(status.last_saved.is_some());
        assert!(status.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_text_is_not_saved() {
        let memory = Arc::new(MemoryBackend::new());
        let notes = autosave(&memory);

        notes.edit("   \n").await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(memory.write_count(), 0);
        assert!(notes.status().last_saved.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_saves_immediately() {
        let memory = Arc::new(MemoryBackend::new());
        let notes = autosave(&memory);

        notes.edit("Rotina da manhã").await;
        notes.flush().await;
        assert_eq!(memory.write_count(), 1);

        // Nothing left pending after a flush
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(memory.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_reports_error() {
        let memory = Arc::new(MemoryBackend::new());
        let notes = autosave(&memory);

        memory.fail_next("connection reset");
        notes.edit("Texto").await;
        notes.flush().await;

        let status = notes.status();
        assert!(!status.saving);
        assert!(status.last_saved.is_none());
        assert!(status.last_error.unwrap().contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_discards_pending_edit() {
        let memory = Arc::new(MemoryBackend::new());
        let notes = autosave(&memory);

        notes.edit("Rascunho").await;
        drop(notes);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(memory.write_count(), 0);
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("  uma  frase\ncom quatro "), 4);
    }

    #[test]
    fn test_char_and_line_counts() {
        let text = "coração\n\n  \nsegunda linha\n";
        assert_eq!(char_count(text), 26);
        assert_eq!(line_count(text), 2);

        assert_eq!(char_count(""), 0);
        assert_eq!(line_count("   \n\t"), 0);
    }
}
