//! ライブメモのセッション管理
//!
//! 認識が終わる前にプレースホルダのメモレコードを作り、その id を返す。
//! 以後の途中経過/完了の書き込みは外部コラボレータがこの id に対して行う。
//! このコンポーネント自身は変換も認識もしない。

use std::sync::Arc;

use thiserror::Error;

use crate::store::{MemoRecord, MemoStore};

/// ライブ中のメモを示す固定のタイトル目印
pub const LIVE_TITLE_MARKER: &str = "[live]";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("所有者が未認証です")]
    Unauthorized,
    #[error("プレースホルダの作成に失敗しました: {message}")]
    Persistence { message: String },
}

pub struct LiveSessionManager {
    store: Arc<dyn MemoStore>,
}

impl LiveSessionManager {
    pub fn new(store: Arc<dyn MemoStore>) -> Self {
        Self { store }
    }

    /// プレースホルダレコードを作成し、セッション id を返す
    /// - 所有者が無い場合はストアへ一切書き込まない
    /// - 所有者識別子は前後の空白を除いた形で保存する
    pub async fn create_session(&self, owner_id: Option<&str>) -> Result<String, SessionError> {
        let owner_id = match owner_id.map(str::trim) {
            Some(owner) if !owner.is_empty() => owner,
            _ => return Err(SessionError::Unauthorized),
        };

        let placeholder = MemoRecord::new(owner_id, LIVE_TITLE_MARKER);

        self.store
            .insert(placeholder)
            .await
            .map_err(|e| SessionError::Persistence {
                message: e.to_string(),
            })
    }
}
