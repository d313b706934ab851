//! メモの永続化境界
//!
//! 永続ストア本体は外部コラボレータ。ここではその境界をトレイトとして
//! 定義し、インメモリ実装を同梱する。プレースホルダ書き込みと完了書き込みは
//! 独立した書き込みで、後勝ちを許容する。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("メモが見つかりません: {id}")]
    NotFound { id: String },
    #[error("書き込みに失敗しました: {message}")]
    WriteFailed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoRecord {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub transcript: String,
    pub audio_url: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl MemoRecord {
    pub fn new(owner_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            title: title.into(),
            transcript: String::new(),
            audio_url: String::new(),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = transcript.into();
        self
    }

    pub fn with_audio_url(mut self, audio_url: impl Into<String>) -> Self {
        self.audio_url = audio_url.into();
        self
    }
}

#[async_trait]
pub trait MemoStore: Send + Sync {
    /// レコードを挿入し、その id を返す
    async fn insert(&self, memo: MemoRecord) -> Result<String, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<MemoRecord>, StoreError>;

    /// 完了した文字起こしを後から取り付ける（後勝ち）
    async fn update_transcript(&self, id: &str, transcript: &str) -> Result<(), StoreError>;

    async fn count(&self) -> usize;
}

/// インメモリ実装。テストおよび単体デプロイ用
#[derive(Default)]
pub struct InMemoryMemoStore {
    memos: RwLock<HashMap<String, MemoRecord>>,
}

impl InMemoryMemoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoStore for InMemoryMemoStore {
    async fn insert(&self, memo: MemoRecord) -> Result<String, StoreError> {
        let id = memo.id.clone();
        let mut guard = self.memos.write().await;
        guard.insert(id.clone(), memo);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<MemoRecord>, StoreError> {
        let guard = self.memos.read().await;
        Ok(guard.get(id).cloned())
    }

    async fn update_transcript(&self, id: &str, transcript: &str) -> Result<(), StoreError> {
        let mut guard = self.memos.write().await;
        let memo = guard.get_mut(id).ok_or_else(|| StoreError::NotFound {
            id: id.to_string(),
        })?;
        memo.transcript = transcript.to_string();
        Ok(())
    }

    async fn count(&self) -> usize {
        self.memos.read().await.len()
    }
}
