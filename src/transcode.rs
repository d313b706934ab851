//! 音声変換モジュール
//!
//! 任意のコンテナ/コーデックの入力音声を、認識バックエンドが要求する
//! リニア PCM (s16le, モノラル, 16kHz) へ外部変換ツール(ffmpeg)の
//! サブプロセス起動で正規化する。
//!
//! - 一時ファイルはリクエストごとに一意で、成功・失敗・タイムアウトの
//!   どの経路でも `tempfile` の RAII で必ず削除される
//! - ツールパスの付け替え（ビルドルート不一致対策）は純粋関数として分離

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::Builder;
use thiserror::Error;
use tokio::process::Command;

use crate::config::Config;
use crate::formats;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("変換ツールが見つかりません: {path}")]
    ToolMissing { path: String },
    #[error("変換に失敗しました: {details}")]
    ConversionFailed { details: String },
    #[error("変換が{seconds}秒でタイムアウトしました")]
    Timeout { seconds: u64 },
    #[error("一時ファイルエラー: {0}")]
    Io(#[from] std::io::Error),
}

/// 配備環境ではビルド時のルートと実行時の作業ディレクトリが食い違う。
/// 設定されたツールパスがビルドルートで始まる場合、その相対部分を
/// 実際のルートに付け替える。単なるパス文字列の変換で、プロセス起動とは独立。
pub fn remap_build_root(tool_path: &str, build_root: &str, actual_root: &Path) -> PathBuf {
    if !build_root.is_empty() {
        if let Ok(relative) = Path::new(tool_path).strip_prefix(build_root) {
            return actual_root.join(relative);
        }
    }
    PathBuf::from(tool_path)
}

pub struct AudioTranscoder {
    config: Config,
}

impl AudioTranscoder {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 実際に起動するツールパスを解決
    pub fn resolved_tool_path(&self) -> PathBuf {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        remap_build_root(
            &self.config.paths.ffmpeg_path,
            &self.config.paths.build_root,
            &cwd,
        )
    }

    /// 入力バイト列をリニア PCM (s16le, モノラル, 16kHz) へ変換
    pub async fn transcode(&self, input: &[u8], mime_type: &str) -> Result<Vec<u8>, TranscodeError> {
        let extension = formats::extension_for_mime(mime_type);

        // 入出力とも一意な一時パス。ドロップ時に削除される
        let mut input_file = Builder::new()
            .prefix("memo-in-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(&self.config.paths.temp_dir)?;
        std::io::Write::write_all(&mut input_file, input)?;
        std::io::Write::flush(&mut input_file)?;

        let output_path = Builder::new()
            .prefix("memo-out-")
            .suffix(".pcm")
            .tempfile_in(&self.config.paths.temp_dir)?
            .into_temp_path();

        let tool = self.resolved_tool_path();
        let timeout_seconds = self.config.limits.transcode_timeout_seconds;

        let mut command = Command::new(&tool);
        command
            .arg("-y")
            .arg("-i")
            .arg(input_file.path())
            .args(["-f", "s16le", "-acodec", "pcm_s16le"])
            .args(["-ac", &self.config.audio.channels.to_string()])
            .args(["-ar", &self.config.audio.sample_rate.to_string()])
            .arg(output_path.as_os_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // タイムアウトで future が落ちたらプロセスも道連れにする
            .kill_on_drop(true);

        let waited = tokio::time::timeout(Duration::from_secs(timeout_seconds), async {
            command.output().await
        })
        .await;

        let output = match waited {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TranscodeError::ToolMissing {
                    path: tool.to_string_lossy().to_string(),
                });
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(TranscodeError::ToolMissing {
                    path: tool.to_string_lossy().to_string(),
                });
            }
            Ok(Err(e)) => return Err(TranscodeError::Io(e)),
            Err(_) => {
                return Err(TranscodeError::Timeout {
                    seconds: timeout_seconds,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::ConversionFailed {
                details: format!(
                    "終了コード {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            });
        }

        let pcm = tokio::fs::read(&output_path).await?;
        Ok(pcm)
        // input_file / output_path はここで（エラー経路でも）ドロップされ削除される
    }
}
