//! 文字起こしパイプライン
//!
//! 変換と認識を合成する。1リクエストは「サブプロセス終了待ち」と
//! 「RPC 応答待ち」の2箇所で中断する。リクエスト間で共有されるのは
//! 読み取り専用のチャネルだけで、相互ロックは不要。

use thiserror::Error;

use crate::config::Config;
use crate::models::RawAudio;
use crate::recognize::{RecognitionError, SpeechRecognizer, TranscriptResult};
use crate::transcode::{AudioTranscoder, TranscodeError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

pub struct TranscriptionPipeline {
    transcoder: AudioTranscoder,
    recognizer: SpeechRecognizer,
}

impl TranscriptionPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            transcoder: AudioTranscoder::new(config),
            recognizer: SpeechRecognizer::new(config),
        }
    }

    /// 生音声を変換して認識し、文字起こし結果を返す
    /// - 変換済みデータは中間生成物で、呼び出し完了後に破棄される
    pub async fn transcribe(
        &self,
        audio: &RawAudio,
        credential: &str,
    ) -> Result<TranscriptResult, PipelineError> {
        let pcm = self
            .transcoder
            .transcode(&audio.content, &audio.mime_type)
            .await?;

        let result = self.recognizer.recognize(pcm, credential).await?;
        Ok(result)
    }
}
