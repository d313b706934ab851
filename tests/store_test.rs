use std::sync::Arc;

use VoiceMemoBackendAPI::live::{LiveSessionManager, SessionError, LIVE_TITLE_MARKER};
use VoiceMemoBackendAPI::store::{InMemoryMemoStore, MemoRecord, MemoStore, StoreError};

#[cfg(test)]
mod store_tests {
    use super::*;

    /// 挿入と取得
    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryMemoStore::new();

        let record = MemoRecord::new("alice", "会議メモ").with_transcript("はじめの一歩");
        let id = store.insert(record).await.unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.owner_id, "alice");
        assert_eq!(fetched.title, "会議メモ");
        assert_eq!(fetched.transcript, "はじめの一歩");
        assert_eq!(fetched.metadata, serde_json::json!({}));
        assert_eq!(store.count().await, 1);
    }

    /// 完了書き込みは後勝ちであること
    #[tokio::test]
    async fn test_update_transcript_last_write_wins() {
        let store = InMemoryMemoStore::new();

        let id = store
            .insert(MemoRecord::new("alice", LIVE_TITLE_MARKER))
            .await
            .unwrap();

        store.update_transcript(&id, "途中経過").await.unwrap();
        store.update_transcript(&id, "最終的な文字起こし").await.unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.transcript, "最終的な文字起こし");
    }

    /// 存在しない id への完了書き込みは NotFound になること
    #[tokio::test]
    async fn test_update_transcript_missing_id() {
        let store = InMemoryMemoStore::new();
        let result = store.update_transcript("no-such-id", "text").await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    /// ライブセッション: 所有者なしは Unauthorized で書き込みゼロ件
    #[tokio::test]
    async fn test_live_session_requires_owner() {
        let store = Arc::new(InMemoryMemoStore::new());
        let manager = LiveSessionManager::new(store.clone());

        let result = manager.create_session(None).await;
        assert!(matches!(result, Err(SessionError::Unauthorized)));

        let result = manager.create_session(Some("   ")).await;
        assert!(matches!(result, Err(SessionError::Unauthorized)));

        assert_eq!(store.count().await, 0);
    }

    /// ライブセッション: 所有者識別子は前後の空白を除いて保存されること
    #[tokio::test]
    async fn test_live_session_owner_is_trimmed() {
        let store = Arc::new(InMemoryMemoStore::new());
        let manager = LiveSessionManager::new(store.clone());

        let session_id = manager.create_session(Some(" alice \n")).await.unwrap();

        let record = store.get(&session_id).await.unwrap().unwrap();
        assert_eq!(record.owner_id, "alice");
    }

    /// ライブセッション: プレースホルダは目印タイトル・空文字起こし・空音声参照
    #[tokio::test]
    async fn test_live_session_placeholder_shape() {
        let store = Arc::new(InMemoryMemoStore::new());
        let manager = LiveSessionManager::new(store.clone());

        let session_id = manager.create_session(Some("bob")).await.unwrap();

        let record = store.get(&session_id).await.unwrap().unwrap();
        assert_eq!(record.title, LIVE_TITLE_MARKER);
        assert_eq!(record.transcript, "");
        assert_eq!(record.audio_url, "");
        assert_eq!(record.owner_id, "bob");

        // その後の完了書き込みの取り付け先として機能すること
        store
            .update_transcript(&session_id, "ライブの最終結果")
            .await
            .unwrap();
        let record = store.get(&session_id).await.unwrap().unwrap();
        assert_eq!(record.transcript, "ライブの最終結果");
    }

    /// 並行挿入でレコードが混ざらないこと
    #[tokio::test]
    async fn test_concurrent_inserts_are_independent() {
        let store = Arc::new(InMemoryMemoStore::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let record = MemoRecord::new(format!("user-{}", i), "memo")
                    .with_transcript(format!("transcript-{}", i));
                store.insert(record).await.unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }

        assert_eq!(store.count().await, 16);
        for (i, id) in ids.iter().enumerate() {
            let record = store.get(id).await.unwrap().unwrap();
            assert_eq!(record.owner_id, format!("user-{}", i));
            assert_eq!(record.transcript, format!("transcript-{}", i));
        }
    }
}
