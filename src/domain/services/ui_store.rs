#[cfg(test)]
#[path = "ui_store_test.rs"]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::sync::RwLock;

use super::UrlListener;
use crate::infrastructure::storage::Storage;

const STORAGE_NAME: &str = "chat-ui-storage";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    #[serde(default)]
    pub is_preview_open: bool,
    #[serde(default = "default_sidebar_open")]
    pub is_sidebar_open: bool,
    #[serde(skip)]
    pub preview_url: Option<String>,
}

fn default_sidebar_open() -> bool {
    return true;
}

impl Default for UiState {
    fn default() -> UiState {
        return UiState {
            is_preview_open: false,
            is_sidebar_open: true,
            preview_url: None,
        };
    }
}

/// Preview pane and sidebar visibility.
#[derive(Clone, Default)]
pub struct UiStore {
    storage: Option<Storage>,
    state: Arc<RwLock<UiState>>,
}

impl UiStore {
    pub fn new(storage: Option<Storage>) -> UiStore {
        return UiStore {
            storage,
            state: Arc::new(RwLock::new(UiState::default())),
        };
    }

    pub async fn snapshot(&self) -> UiState {
        return self.state.read().await.clone();
    }

    pub async fn restore(&self) {
        let storage = match &self.storage {
            Some(storage) => storage,
            None => return,
        };

        match storage.load::<UiState>(STORAGE_NAME).await {
            Ok(Some(saved)) => {
                let mut state = self.state.write().await;
                state.is_preview_open = saved.is_preview_open;
                state.is_sidebar_open = saved.is_sidebar_open;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = ?err, "Ignoring unreadable UI storage");
            }
        }
    }

    async fn persist(&self) {
        if let Some(storage) = &self.storage {
            let state = self.snapshot().await;
            if let Err(err) = storage.save(STORAGE_NAME, &state).await {
                tracing::warn!(error = ?err, "Failed to persist UI state");
            }
        }
    }

    pub async fn toggle_preview(&self) -> bool {
        let mut state = self.state.write().await;
        state.is_preview_open = !state.is_preview_open;
        let open = state.is_preview_open;
        drop(state);

        self.persist().await;
        return open;
    }

    pub async fn toggle_sidebar(&self) -> bool {
        let mut state = self.state.write().await;
        state.is_sidebar_open = !state.is_sidebar_open;
        let open = state.is_sidebar_open;
        drop(state);

        self.persist().await;
        return open;
    }

    pub async fn set_preview_open(&self, open: bool) {
        self.state.write().await.is_preview_open = open;
        self.persist().await;
    }

    pub async fn set_sidebar_open(&self, open: bool) {
        self.state.write().await.is_sidebar_open = open;
        self.persist().await;
    }
}

#[async_trait]
impl UrlListener for UiStore {
    async fn url_detected(&self, url: &str) {
        let mut state = self.state.write().await;
        state.is_preview_open = true;
        state.is_sidebar_open = false;
        state.preview_url = Some(url.to_string());
        drop(state);

        self.persist().await;
    }
}
