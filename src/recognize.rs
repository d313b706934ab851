//! 音声認識クライアントモジュール
//!
//! 変換済みのリニア PCM を認識バックエンドへ unary RPC で送り、
//! 文字起こし結果へ写像する。
//!
//! - スキーマは `proto/memospeech.proto` からビルド時に生成
//! - チャネルはプロセスで一度だけ確立し、全リクエストで多重化して共有
//! - 資格情報は前後の空白を除去してから `authorization` メタデータへ載せる
//! - 結果ゼロ件は「無音」であってエラーではない

use std::time::Duration;

use thiserror::Error;
use tokio::sync::OnceCell;
use tonic::transport::{Channel, ClientTlsConfig};
use tonic::Request;

use crate::config::Config;

// 生成されたgRPCコード
pub mod speech_proto {
    tonic::include_proto!("memospeech");
}

use speech_proto::speech_client::SpeechClient;
use speech_proto::{RecognitionAudio, RecognitionConfig, RecognizeRequest, RecognizeResponse};

pub const LINEAR16: &str = "LINEAR16";

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("接続に失敗しました: {message}")]
    Connection { message: String },
    #[error("資格情報が拒否されました")]
    Unauthorized,
    #[error("転送エラー: {details}")]
    Transport { details: String },
}

/// 文字起こしの代替候補
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptAlternative {
    pub transcript: String,
    pub confidence: f32,
}

/// 1回の認識呼び出しの結果。生成後は不変
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptResult {
    pub transcript: String,
    pub alternatives: Vec<TranscriptAlternative>,
}

impl TranscriptResult {
    pub fn empty() -> Self {
        Self {
            transcript: String::new(),
            alternatives: Vec::new(),
        }
    }
}

/// `authorization` メタデータ値を生成
/// - 資格情報ファイル由来の末尾改行をそのまま転送してはならない
pub fn bearer_value(credential: &str) -> String {
    format!("Bearer {}", credential.trim())
}

/// RPC ステータスをエラー分類へ写像
pub fn classify_status(status: &tonic::Status) -> RecognitionError {
    match status.code() {
        tonic::Code::Unauthenticated | tonic::Code::PermissionDenied => {
            RecognitionError::Unauthorized
        }
        code => RecognitionError::Transport {
            details: format!("{:?}: {}", code, status.message()),
        },
    }
}

/// レスポンスから文字起こし結果を抽出
/// - 最初の結果の最初の候補を本文とする
/// - 結果や候補が無い場合は空の文字起こしを成功として返す
pub fn transcript_from_response(response: RecognizeResponse) -> TranscriptResult {
    let Some(first) = response.results.into_iter().next() else {
        return TranscriptResult::empty();
    };

    let alternatives: Vec<TranscriptAlternative> = first
        .alternatives
        .into_iter()
        .map(|alt| TranscriptAlternative {
            transcript: alt.transcript,
            confidence: alt.confidence,
        })
        .collect();

    let transcript = alternatives
        .first()
        .map(|alt| alt.transcript.clone())
        .unwrap_or_default();

    TranscriptResult {
        transcript,
        alternatives,
    }
}

// プロセス全体で共有するチャネル。確立後は読み取り専用
static SHARED_CHANNEL: OnceCell<Channel> = OnceCell::const_new();

async fn connect(endpoint: &str, timeout_seconds: u64) -> Result<Channel, RecognitionError> {
    let mut builder = Channel::from_shared(endpoint.to_string())
        .map_err(|e| RecognitionError::Connection {
            message: format!("不正なエンドポイント: {}", e),
        })?
        .timeout(Duration::from_secs(timeout_seconds))
        .connect_timeout(Duration::from_secs(timeout_seconds));

    if endpoint.starts_with("https://") {
        builder = builder
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| RecognitionError::Connection {
                message: format!("TLS設定に失敗: {}", e),
            })?;
    }

    builder.connect().await.map_err(|e| RecognitionError::Connection {
        message: e.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct SpeechRecognizer {
    endpoint: String,
    language_code: String,
    sample_rate_hertz: i32,
    timeout_seconds: u64,
}

impl SpeechRecognizer {
    pub fn new(config: &Config) -> Self {
        Self {
            endpoint: config.recognition.endpoint.clone(),
            language_code: config.recognition.language_code.clone(),
            sample_rate_hertz: config.audio.sample_rate as i32,
            timeout_seconds: config.recognition.request_timeout_seconds,
        }
    }

    /// リニア PCM を認識バックエンドへ送り、文字起こし結果を得る
    pub async fn recognize(
        &self,
        pcm: Vec<u8>,
        credential: &str,
    ) -> Result<TranscriptResult, RecognitionError> {
        let channel = SHARED_CHANNEL
            .get_or_try_init(|| connect(&self.endpoint, self.timeout_seconds))
            .await?
            .clone();

        // クライアント自体は呼び出しごとの状態を持たないため都度生成で良い
        let mut client = SpeechClient::new(channel);

        let mut request = Request::new(RecognizeRequest {
            config: Some(RecognitionConfig {
                encoding: LINEAR16.to_string(),
                sample_rate_hertz: self.sample_rate_hertz,
                language_code: self.language_code.clone(),
            }),
            audio: Some(RecognitionAudio { content: pcm }),
        });

        let value = bearer_value(credential)
            .parse()
            .map_err(|_| RecognitionError::Unauthorized)?;
        request.metadata_mut().insert("authorization", value);

        let response = client
            .recognize(request)
            .await
            .map_err(|status| classify_status(&status))?;

        Ok(transcript_from_response(response.into_inner()))
    }
}
