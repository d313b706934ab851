use crate::config::Config;
use crate::formats;
use crate::live::{LiveSessionManager, SessionError};
use crate::models::*;
use crate::pipeline::{PipelineError, TranscriptionPipeline};
use crate::store::{MemoRecord, MemoStore};
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// 外側の認証レイヤが検証済みの呼び出し元識別子を載せてくるヘッダ
pub const USER_ID_HEADER: &str = "x-user-id";

// =============================================================================
// Application State
// - ハンドラ間で共有する情報を集約（設定、パイプライン、ストア、統計、起動時刻）
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<TranscriptionPipeline>,
    pub store: Arc<dyn MemoStore>,
    pub live_sessions: Arc<LiveSessionManager>,
    pub credential: Arc<String>,
    pub stats: Arc<Mutex<ServerStats>>,
    pub start_time: Arc<Instant>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn MemoStore>, credential: String) -> Self {
        Self {
            pipeline: Arc::new(TranscriptionPipeline::new(&config)),
            live_sessions: Arc::new(LiveSessionManager::new(Arc::clone(&store))),
            store,
            config: Arc::new(config),
            credential: Arc::new(credential),
            stats: Arc::new(Mutex::new(ServerStats::default())),
            start_time: Arc::new(Instant::now()),
        }
    }
}

// =============================================================================
// Error Handling
// - 型安全な API エラーを定義し、`IntoResponse` で JSON へ変換
// =============================================================================

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Transcode(e) => {
                // ツール診断込みでログに残す。呼び出し元へはサーバー側失敗として返す
                log::error!("音声変換に失敗: {}", e);
                ApiError::new(ApiErrorCode::TranscodeFailed, "音声の変換に失敗しました")
                    .with_details(e.to_string())
            }
            PipelineError::Recognition(e) => {
                log::error!("音声認識に失敗: {}", e);
                ApiError::new(ApiErrorCode::RecognitionFailed, "音声の認識に失敗しました")
                    .with_details(e.to_string())
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthorized => {
                ApiError::new(ApiErrorCode::Unauthorized, "認証されていません")
            }
            SessionError::Persistence { message } => {
                ApiError::new(ApiErrorCode::PersistenceFailed, "セッションの作成に失敗しました")
                    .with_details(message)
            }
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match self.code {
            ApiErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorCode::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiErrorCode::TranscodeFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::RecognitionFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::PersistenceFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let response = ErrorResponse {
            error: self.message,
            code: self.code.as_str().to_string(),
            details: self.details,
        };

        (status_code, Json(response)).into_response()
    }
}

fn require_owner(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| ApiError::new(ApiErrorCode::Unauthorized, "認証されていません"))
}

// =============================================================================
// Request Handlers
// =============================================================================

/// 音声メモのアップロード・文字起こしエンドポイント
pub async fn create_memo(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MemoResponse>)> {
    // 未認証なら下流の処理は一切行わない（統計にも数えない）
    let owner_id = require_owner(&headers)?;

    {
        let mut stats = state.stats.lock().unwrap();
        stats.record_request();
    }

    let start_time = Instant::now();

    // 解析・検証を含むすべての途中離脱がこの集計に合流する
    let result = read_and_process_memo(&state, &mut multipart, owner_id).await;

    match &result {
        Ok(_) => {
            let mut stats = state.stats.lock().unwrap();
            stats.record_success(start_time.elapsed().as_millis() as u64);
        }
        Err(_) => {
            let mut stats = state.stats.lock().unwrap();
            stats.record_failure();
        }
    }

    result
}

/// マルチパートの解析・検証から文字起こし・保存まで
async fn read_and_process_memo(
    state: &AppState,
    multipart: &mut Multipart,
    owner_id: String,
) -> ApiResult<(StatusCode, Json<MemoResponse>)> {
    let mut file_data = Vec::new();
    let mut filename = String::new();
    let mut content_type = String::new();
    let mut title: Option<String> = None;

    // マルチパートフィールドを処理
    // - file: 音声データ本体
    // - title: メモのタイトル（省略可）
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::new(
            ApiErrorCode::InvalidInput,
            format!("マルチパートデータの解析に失敗: {}", e),
        )
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or("audio").to_string();
                content_type = field.content_type().unwrap_or("").to_string();
                file_data = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        ApiError::new(
                            ApiErrorCode::InvalidInput,
                            format!("ファイルデータの読み込みに失敗: {}", e),
                        )
                    })?
                    .to_vec();
            }
            "title" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::new(
                        ApiErrorCode::InvalidInput,
                        format!("タイトルの読み込みに失敗: {}", e),
                    )
                })?;
                title = Some(value);
            }
            _ => {} // 未知のフィールドは無視
        }
    }

    if file_data.is_empty() {
        return Err(ApiError::new(
            ApiErrorCode::InvalidInput,
            "ファイルが見つかりません",
        ));
    }

    if file_data.len() > state.config.max_file_size_bytes() {
        return Err(ApiError::new(
            ApiErrorCode::FileTooLarge,
            format!(
                "ファイルサイズが制限を超えています: {} > {}",
                file_data.len(),
                state.config.max_file_size_bytes()
            ),
        ));
    }

    // アップロード形式の解決
    // - wav は内部デコード対象ではあるがアップロード形式としては拒否
    // - 未知のタイプはブラウザ録音の既定である webm として扱う
    let mime_type = if formats::is_wav(&content_type, &filename) {
        return Err(ApiError::new(
            ApiErrorCode::UnsupportedFormat,
            format!("サポートされていないファイル形式: {}", filename),
        ));
    } else {
        formats::resolve_upload(&content_type, &filename)
            .unwrap_or("audio/webm")
            .to_string()
    };

    let audio = RawAudio {
        content: file_data,
        mime_type,
        filename: Some(filename),
    };

    process_memo(state, audio, owner_id, title).await
}

/// 文字起こしから保存までの共通ロジック
async fn process_memo(
    state: &AppState,
    audio: RawAudio,
    owner_id: String,
    title: Option<String>,
) -> ApiResult<(StatusCode, Json<MemoResponse>)> {
    let transcript = state
        .pipeline
        .transcribe(&audio, state.credential.as_str())
        .await?;

    // 文字起こしは成功していても、この書き込みが失敗すれば結果は失われる。
    // 現設計で許容されたリスクであり、自動リトライはしない
    let record = MemoRecord::new(owner_id, title.unwrap_or_default())
        .with_transcript(&transcript.transcript);
    let id = state.store.insert(record).await.map_err(|e| {
        log::error!("メモの保存に失敗: {}", e);
        ApiError::new(ApiErrorCode::PersistenceFailed, "メモの保存に失敗しました")
            .with_details(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(MemoResponse {
            id,
            transcript: transcript.transcript,
            success: true,
        }),
    ))
}

/// ライブメモのセッション作成エンドポイント
pub async fn create_live_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<LiveSessionResponse>)> {
    let owner_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok());

    let session_id = state.live_sessions.create_session(owner_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(LiveSessionResponse { session_id }),
    ))
}

/// 文字起こし済みテキストの手動登録エンドポイント
pub async fn create_manual_memo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ManualMemoRequest>,
) -> ApiResult<(StatusCode, Json<MemoResponse>)> {
    let owner_id = require_owner(&headers)?;

    // 空白のみの文字起こしはストアへ書き込む前に拒否する
    if request.transcript.trim().is_empty() {
        return Err(ApiError::new(
            ApiErrorCode::InvalidInput,
            "transcript は必須です",
        ));
    }

    let mut record = MemoRecord::new(owner_id, request.title.unwrap_or_default())
        .with_transcript(&request.transcript);
    if let Some(audio_url) = request.audio_url {
        record = record.with_audio_url(audio_url);
    }

    let transcript = record.transcript.clone();
    let id = state.store.insert(record).await.map_err(|e| {
        ApiError::new(ApiErrorCode::PersistenceFailed, "メモの保存に失敗しました")
            .with_details(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(MemoResponse {
            id,
            transcript,
            success: true,
        }),
    ))
}

/// メモの取得エンドポイント
/// - ライブセッションの途中経過を呼び出し側がポーリングする足場
pub async fn get_memo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MemoRecord>> {
    let memo = state
        .store
        .get(&id)
        .await
        .map_err(|e| {
            ApiError::new(ApiErrorCode::InternalError, "メモの取得に失敗しました")
                .with_details(e.to_string())
        })?
        .ok_or_else(|| {
            ApiError::new(ApiErrorCode::NotFound, format!("メモが見つかりません: {}", id))
        })?;

    Ok(Json(memo))
}

/// ヘルスチェックエンドポイント
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// サーバー統計情報を取得
pub async fn get_stats(State(state): State<AppState>) -> Json<ServerStats> {
    let mut stats = state.stats.lock().unwrap().clone();
    stats.uptime_seconds = state.start_time.elapsed().as_secs();
    Json(stats)
}
