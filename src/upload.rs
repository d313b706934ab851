//! チャンク送信アップロードクライアント
//!
//! 音声（またはマルチパートフォーム）を送信先へ POST しながら、
//! 送信済みバイト数から進捗率を都度コールバックする。単純な一括送信では
//! 「ここまで何バイト送ったか」が観測できないため、本文をチャンク化した
//! ストリームとして流し、チャンクが転送層へ引き渡されるたびに進捗を刻む。

use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream;
use serde_json::Value;
use uuid::Uuid;

const CHUNK_SIZE: usize = 64 * 1024;

/// 1回の進捗イベント
/// - percent は total が既知のときのみ計算される（四捨五入、0-100）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
    pub percent: Option<u8>,
}

impl UploadProgress {
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        let percent = match total {
            Some(total) if total > 0 => {
                Some(((loaded as f64 / total as f64) * 100.0).round() as u8)
            }
            _ => None,
        };
        Self {
            loaded,
            total,
            percent,
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// 送信ペイロード。フォームは送信前にバイト列へ符号化し、
/// 音声本文と同じ進捗付きストリームで送る
pub enum UploadPayload {
    Audio {
        content: Vec<u8>,
        content_type: String,
    },
    Form(MultipartForm),
}

#[derive(Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        content: Vec<u8>,
    },
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            content,
        });
        self
    }

    /// multipart/form-data 本文へ符号化
    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            match part {
                FormPart::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                FormPart::File {
                    name,
                    filename,
                    content_type,
                    content,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            name, filename
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(
                        format!("Content-Type: {}\r\n\r\n", content_type).as_bytes(),
                    );
                    body.extend_from_slice(content);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        body
    }
}

#[derive(Debug)]
pub enum ClientError {
    Network(reqwest::Error),
    InvalidResponse(String),
    ServerError(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::Network(error)
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Network(err) => write!(f, "ネットワークエラー: {}", err),
            ClientError::InvalidResponse(msg) => write!(f, "無効なレスポンス: {}", msg),
            ClientError::ServerError(msg) => write!(f, "サーバーエラー: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

#[derive(Debug, Clone)]
pub struct UploadClient {
    client: reqwest::Client,
}

impl Default for UploadClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// ペイロードを送信先へ POST し、JSON レスポンスを返す
    /// - 進捗はチャンク単位で、受け取った順のまま（重複する100%も含めて）通知する
    pub async fn upload(
        &self,
        url: &str,
        payload: UploadPayload,
        on_progress: ProgressCallback,
    ) -> Result<Value, ClientError> {
        let (body, content_type) = match payload {
            UploadPayload::Audio {
                content,
                content_type,
            } => (content, content_type),
            UploadPayload::Form(form) => {
                let boundary = format!("memo-{}", Uuid::new_v4());
                let body = form.encode(&boundary);
                let content_type = format!("multipart/form-data; boundary={}", boundary);
                (body, content_type)
            }
        };

        let total = body.len() as u64;
        let chunks: Vec<Bytes> = body
            .chunks(CHUNK_SIZE)
            .map(Bytes::copy_from_slice)
            .collect();

        let mut loaded = 0u64;
        let progress = Arc::clone(&on_progress);
        let body_stream = stream::iter(chunks.into_iter().map(move |chunk| {
            loaded += chunk.len() as u64;
            progress(UploadProgress::new(loaded, Some(total)));
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body_stream))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // エラー本文は {error: ...} の形を想定。崩れていても HTTP 状態は伝える
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(ClientError::ServerError(message));
        }

        serde_json::from_str(&text)
            .map_err(|e| ClientError::InvalidResponse(format!("JSONパースエラー: {}", e)))
    }
}
