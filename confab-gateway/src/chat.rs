//! Session-scoped chat orchestration.
//!
//! [`ChatService`] ties the pieces together: history snapshots feed prompt
//! assembly, every upstream call goes through the paced retry client, and
//! history is appended only after the call succeeds. A failed call leaves
//! the session exactly as it was.

use crate::chunker::chunk_text;
use crate::gate::RateGate;
use crate::prompt;
use crate::provider::{ContentBlock, ImageSource, InvokeRequest, Provider};
use crate::retry::{ResilientClient, RetryConfig};
use crate::session::{SessionStore, Turn};
use base64::Engine;
use confab_common::{Error, Limits, Result};
use std::sync::Arc;

/// File extensions routed to the vision path.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Orchestrates chat and document queries for all sessions.
pub struct ChatService {
    client: ResilientClient,
    gate: Arc<RateGate>,
    store: SessionStore,
    limits: Limits,
}

impl ChatService {
    pub fn new(provider: Arc<dyn Provider>, limits: Limits) -> Self {
        let gate = Arc::new(RateGate::new(limits.rate_limit_delay));
        let client = ResilientClient::new(
            provider,
            Arc::clone(&gate),
            RetryConfig::from_limits(&limits),
        );
        Self {
            client,
            gate,
            store: SessionStore::new(limits.memory_limit),
            limits,
        }
    }

    /// Answer a chat message in the context of the session's history.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<String> {
        let history = self.store.snapshot(session_id).await;
        let prompt = prompt::chat_prompt(&history, message);

        let response = self
            .client
            .invoke(session_id, InvokeRequest::text(prompt))
            .await?;

        self.store.append(session_id, Turn::user(message)).await;
        self.store
            .append(session_id, Turn::assistant(&response.text))
            .await;

        Ok(response.text)
    }

    /// Answer a question about an uploaded file.
    ///
    /// Images go upstream in one call alongside the question. Text files are
    /// chunked; documents over one chunk are summarized part by part and the
    /// question is answered over the combined summaries. On success the
    /// exchange is recorded as `[File: {name}] {query}` plus the answer.
    pub async fn document_query(
        &self,
        session_id: &str,
        file_name: &str,
        bytes: &[u8],
        query: &str,
    ) -> Result<String> {
        let extension = file_extension(file_name);

        let answer = if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            self.query_image(session_id, &extension, bytes, query).await?
        } else {
            self.query_text_document(session_id, bytes, query).await?
        };

        self.store
            .append(session_id, Turn::user(format!("[File: {file_name}] {query}")))
            .await;
        self.store
            .append(session_id, Turn::assistant(&answer))
            .await;

        Ok(answer)
    }

    async fn query_image(
        &self,
        session_id: &str,
        extension: &str,
        bytes: &[u8],
        query: &str,
    ) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        if encoded.len() > self.limits.max_image_base64_bytes {
            return Err(Error::SizeLimit(
                "Image file is too large. Please use an image smaller than 1MB.".to_string(),
            ));
        }

        let request = InvokeRequest {
            content: vec![
                ContentBlock::Text {
                    text: prompt::image_prompt(query),
                },
                ContentBlock::Image {
                    source: ImageSource::base64(media_type_for(extension), encoded),
                },
            ],
        };

        let response = self.client.invoke(session_id, request).await?;
        Ok(response.text)
    }

    async fn query_text_document(
        &self,
        session_id: &str,
        bytes: &[u8],
        query: &str,
    ) -> Result<String> {
        let content = String::from_utf8_lossy(bytes);
        let chunks = chunk_text(&content, self.limits.max_chunk_size)?;

        if chunks.len() == 1 {
            let request = InvokeRequest::text(prompt::direct_prompt(&chunks[0], query));
            let response = self.client.invoke(session_id, request).await?;
            return Ok(response.text);
        }

        let total = chunks.len();
        let mut summaries = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            let request =
                InvokeRequest::text(prompt::summary_prompt(index + 1, total, chunk));
            let response = self.client.invoke(session_id, request).await?;
            summaries.push(response.text);
        }

        let combined = prompt::join_summaries(&summaries);
        let request = InvokeRequest::text(prompt::final_prompt(&combined, query));
        let response = self.client.invoke(session_id, request).await?;
        Ok(response.text)
    }

    /// Forget the session's history and pacing state.
    pub async fn clear(&self, session_id: &str) {
        self.store.clear(session_id).await;
        self.gate.forget(session_id).await;
    }

    /// Drop sessions idle past the configured TTL. Returns counts of
    /// (histories, pacing entries) dropped.
    pub async fn evict_idle(&self) -> (usize, usize) {
        let ttl = self.limits.session_ttl;
        let histories = self.store.evict_idle(ttl).await;
        let gates = self.gate.evict_idle(ttl).await;
        (histories, gates)
    }

    #[cfg(test)]
    pub async fn has_session(&self, session_id: &str) -> bool {
        self.store.is_known(session_id).await || self.gate.is_known(session_id).await
    }
}

fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn media_type_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    }
}
