use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use VoiceMemoBackendAPI::upload::{MultipartForm, UploadClient, UploadPayload, UploadProgress};

/// 受信したバイト数をそのまま返すモック送信先サーバーを起動
async fn spawn_mock_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/submit",
            post(|body: axum::body::Bytes| async move {
                Json(json!({ "id": "memo-1", "success": true, "received": body.len() }))
            }),
        )
        .route(
            "/reject",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "unsupported audio" })),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[cfg(test)]
mod upload_tests {
    use super::*;

    /// 進捗は受け取った順に単調非減少で通知され、最後は 100 で終わること
    #[tokio::test]
    async fn test_progress_percents_in_order_ending_at_100() {
        let addr = spawn_mock_server().await;
        let client = UploadClient::new();

        // 64KB チャンクが複数回になるサイズ
        let content = vec![0u8; 150 * 1024];
        let total = content.len();

        let percents: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&percents);

        let response = client
            .upload(
                &format!("http://{}/submit", addr),
                UploadPayload::Audio {
                    content,
                    content_type: "audio/webm".to_string(),
                },
                Arc::new(move |progress: UploadProgress| {
                    sink.lock().unwrap().push(progress.percent.unwrap());
                }),
            )
            .await
            .unwrap();

        assert_eq!(response["id"], "memo-1");
        assert_eq!(response["success"], true);
        assert_eq!(response["received"], total as u64);

        let percents = percents.lock().unwrap().clone();
        assert!(percents.len() >= 2, "複数回の進捗通知を期待: {:?}", percents);
        assert!(
            percents.windows(2).all(|w| w[0] <= w[1]),
            "単調非減少であること: {:?}",
            percents
        );
        assert_eq!(*percents.last().unwrap(), 100);
    }

    /// 1チャンクで収まる小さな本文は 100% が1回通知されること
    #[tokio::test]
    async fn test_small_payload_single_tick() {
        let addr = spawn_mock_server().await;
        let client = UploadClient::new();

        let percents: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&percents);

        client
            .upload(
                &format!("http://{}/submit", addr),
                UploadPayload::Audio {
                    content: b"tiny".to_vec(),
                    content_type: "audio/mpeg".to_string(),
                },
                Arc::new(move |progress: UploadProgress| {
                    sink.lock().unwrap().push(progress.percent.unwrap());
                }),
            )
            .await
            .unwrap();

        assert_eq!(*percents.lock().unwrap(), vec![100]);
    }

    /// 非2xxのレスポンスはサーバーの {error} 本文を持つエラーになること
    #[tokio::test]
    async fn test_server_error_carries_error_body() {
        let addr = spawn_mock_server().await;
        let client = UploadClient::new();

        let result = client
            .upload(
                &format!("http://{}/reject", addr),
                UploadPayload::Audio {
                    content: b"audio".to_vec(),
                    content_type: "audio/webm".to_string(),
                },
                Arc::new(|_| {}),
            )
            .await;

        match result {
            Err(e) => assert!(e.to_string().contains("unsupported audio")),
            Ok(v) => panic!("エラーを期待: {:?}", v),
        }
    }

    /// マルチパートフォームも同じ進捗付き経路で送れること
    #[tokio::test]
    async fn test_multipart_form_upload() {
        let addr = spawn_mock_server().await;
        let client = UploadClient::new();

        let form = MultipartForm::new()
            .text("title", "会議メモ")
            .file("file", "memo.mp3", "audio/mpeg", vec![1u8; 2048]);

        let percents: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&percents);

        let response = client
            .upload(
                &format!("http://{}/submit", addr),
                UploadPayload::Form(form),
                Arc::new(move |progress: UploadProgress| {
                    sink.lock().unwrap().push(progress.percent.unwrap());
                }),
            )
            .await
            .unwrap();

        assert_eq!(response["success"], true);
        assert_eq!(*percents.lock().unwrap().last().unwrap(), 100);
    }

    /// フォーム符号化: 境界・ヘッダ・本文が multipart/form-data の形であること
    #[test]
    fn test_multipart_form_encoding() {
        let form = MultipartForm::new()
            .text("title", "memo")
            .file("file", "a.ogg", "audio/ogg", b"OggS".to_vec());

        let body = form.encode("BOUNDARY");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with("--BOUNDARY\r\n"));
        assert!(text.contains("Content-Disposition: form-data; name=\"title\""));
        assert!(text.contains("Content-Disposition: form-data; name=\"file\"; filename=\"a.ogg\""));
        assert!(text.contains("Content-Type: audio/ogg"));
        assert!(text.contains("OggS"));
        assert!(text.ends_with("--BOUNDARY--\r\n"));
    }

    /// total 不明の進捗イベントでは percent が計算されないこと
    #[test]
    fn test_progress_without_total() {
        let progress = UploadProgress::new(512, None);
        assert_eq!(progress.percent, None);
        assert_eq!(progress.loaded, 512);

        let progress = UploadProgress::new(25, Some(100));
        assert_eq!(progress.percent, Some(25));

        let progress = UploadProgress::new(100, Some(100));
        assert_eq!(progress.percent, Some(100));
    }
}
