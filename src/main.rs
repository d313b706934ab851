use std::net::SocketAddr;
use std::sync::Arc;

use VoiceMemoBackendAPI::config::Config;
use VoiceMemoBackendAPI::create_app;
use VoiceMemoBackendAPI::handlers::AppState;
use VoiceMemoBackendAPI::store::InMemoryMemoStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ログの初期化
    env_logger::init();

    println!("VoiceMemoBackendAPI を起動中...");

    // 設定ファイルの読み込み
    let config = Config::load_or_create_default("config.toml")?;

    // 設定の検証
    config.validate()?;

    println!("設定ファイルを読み込みました");
    println!("サーバーアドレス: {}", config.server_address());
    println!("認識エンドポイント: {}", config.recognition.endpoint);

    // 認識バックエンドの資格情報
    // - 末尾改行を含む可能性があるが、除去はメタデータ生成時に行う
    let credential = match config.load_credential() {
        Ok(credential) => credential,
        Err(e) => {
            eprintln!("資格情報の読み込みに失敗しました: {}", e);
            eprintln!("サーバーは起動しますが、文字起こし機能は利用できません");
            String::new()
        }
    };

    // アプリケーション状態の初期化
    let store = Arc::new(InMemoryMemoStore::new());
    let state = AppState::new(config.clone(), store, credential);

    let app = create_app(state);

    // サーバーアドレスの解析
    let addr: SocketAddr = config
        .server_address()
        .parse()
        .map_err(|e| anyhow::anyhow!("無効なサーバーアドレス: {}", e))?;

    println!("サーバーを起動します: http://{}", addr);
    println!("API エンドポイント:");
    println!("  POST /memos - 音声メモのアップロード・文字起こし");
    println!("  POST /memos/live - ライブメモのセッション作成");
    println!("  POST /memos/manual - 文字起こし済みテキストの手動登録");
    println!("  GET  /memos/{{id}} - メモの取得");
    println!("  GET  /health - ヘルスチェック");
    println!("  GET  /stats - サーバー統計情報");
    println!();
    println!("使用例:");
    println!(
        "  curl -H \"x-user-id: alice\" -F \"file=@memo.mp3\" http://{}/memos",
        addr
    );

    // サーバーの起動
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("サーバーの起動に失敗: {}", e))?;

    Ok(())
}
