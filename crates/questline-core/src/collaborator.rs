//! Bridge to the slow collaborators behind activity modules: speech capture
//! and themed content generation.
//!
//! Requests travel over an mpsc channel and each carries a oneshot for its
//! reply, so callers can await a single answer without sharing state with the
//! worker. The engine itself never waits on a collaborator.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::CoreError;

const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// Base latency of a simulated speech take, plus a per-character share.
const RECORDING_BASE_MS: u64 = 300;
const RECORDING_PER_CHAR_MS: u64 = 120;

pub enum CollaboratorRequest {
    RecordSpeech {
        word: String,
        reply: oneshot::Sender<CollaboratorResponse>,
    },
    GenerateContent {
        prompt: String,
        theme: String,
        reply: oneshot::Sender<CollaboratorResponse>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollaboratorResponse {
    Recording { word: String, duration_ms: u64 },
    Content { text: String },
}

/// Cloneable sender side of the bridge.
#[derive(Debug, Clone)]
pub struct CollaboratorHandle {
    tx: mpsc::Sender<CollaboratorRequest>,
}

impl CollaboratorHandle {
    pub fn new(tx: mpsc::Sender<CollaboratorRequest>) -> Self {
        Self { tx }
    }

    pub async fn record_speech(&self, word: impl Into<String>) -> Result<CollaboratorResponse, CoreError> {
        let word = word.into();
        self.request(|reply| CollaboratorRequest::RecordSpeech { word, reply })
            .await
    }

    pub async fn generate_content(
        &self,
        prompt: impl Into<String>,
        theme: impl Into<String>,
    ) -> Result<CollaboratorResponse, CoreError> {
        let prompt = prompt.into();
        let theme = theme.into();
        self.request(|reply| CollaboratorRequest::GenerateContent { prompt, theme, reply })
            .await
    }

    async fn request<F>(&self, build: F) -> Result<CollaboratorResponse, CoreError>
    where
        F: FnOnce(oneshot::Sender<CollaboratorResponse>) -> CollaboratorRequest,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| CoreError::Collaborator("worker stopped".into()))?;
        rx.await
            .map_err(|_| CoreError::Collaborator("worker dropped the request".into()))
    }
}

/// Spawn a deterministic stand-in worker that answers after `delay`.
pub fn spawn_simulated(delay: Duration) -> (CollaboratorHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<CollaboratorRequest>(REQUEST_CHANNEL_CAPACITY);
    let task = tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match request {
                CollaboratorRequest::RecordSpeech { word, reply } => {
                    let duration_ms =
                        RECORDING_BASE_MS + RECORDING_PER_CHAR_MS * word.chars().count() as u64;
                    tracing::debug!(%word, duration_ms, "simulated recording");
                    // The caller may have given up waiting.
                    let _ = reply.send(CollaboratorResponse::Recording { word, duration_ms });
                }
                CollaboratorRequest::GenerateContent { prompt, theme, reply } => {
                    let text = format!("In the {theme} kingdom, a brave hero learns about {prompt}.");
                    let _ = reply.send(CollaboratorResponse::Content { text });
                }
            }
        }
        tracing::debug!("collaborator worker stopped");
    });
    (CollaboratorHandle::new(tx), task)
}
