//! 進捗表示付きのアップロードCLI
//!
//! 使い方: upload_memo <音声ファイル> <送信先URL> [mimeタイプ]

use std::sync::Arc;

use VoiceMemoBackendAPI::upload::{UploadClient, UploadPayload};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(path), Some(url)) = (args.next(), args.next()) else {
        eprintln!("使い方: upload_memo <音声ファイル> <送信先URL> [mimeタイプ]");
        std::process::exit(2);
    };
    let mime_type = args.next().unwrap_or_else(|| "audio/webm".to_string());

    let content = tokio::fs::read(&path).await?;
    println!("{} を {} へアップロードします ({} bytes)", path, url, content.len());

    let client = UploadClient::new();
    let response = client
        .upload(
            &url,
            UploadPayload::Audio {
                content,
                content_type: mime_type,
            },
            Arc::new(|progress| {
                if let Some(percent) = progress.percent {
                    println!("  進捗: {}% ({} bytes)", percent, progress.loaded);
                }
            }),
        )
        .await
        .map_err(|e| anyhow::anyhow!("アップロードに失敗: {}", e))?;

    println!("レスポンス: {}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
