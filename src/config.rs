use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub recognition: RecognitionConfig,
    pub audio: AudioConfig,
    pub paths: PathsConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    pub endpoint: String,
    pub language_code: String,
    pub credential_file: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub temp_dir: String,
    pub ffmpeg_path: String,
    /// ビルド時ルートの目印。実行時の作業ディレクトリと食い違う環境では
    /// このプレフィックスを剥がしてカレントディレクトリに付け替える
    pub build_root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_file_size_mb: usize,
    pub transcode_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                max_request_size: 100 * 1024 * 1024, // 100MB
            },
            recognition: RecognitionConfig {
                endpoint: "https://speech.example.com:443".to_string(),
                language_code: "en-US".to_string(),
                credential_file: "speech_api.key".to_string(),
                request_timeout_seconds: 60,
            },
            audio: AudioConfig {
                sample_rate: 16000,
                channels: 1,
            },
            paths: PathsConfig {
                temp_dir: "temp".to_string(),
                ffmpeg_path: "/usr/bin/ffmpeg".to_string(),
                build_root: "/build/app".to_string(),
            },
            limits: LimitsConfig {
                max_file_size_mb: 50,
                transcode_timeout_seconds: 120,
            },
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load_or_create_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            match Self::load_from_file(&path) {
                Ok(config) => Ok(config),
                Err(e) => {
                    eprintln!("設定ファイルの読み込みに失敗しました: {}. デフォルト設定を使用します。", e);
                    let config = Self::default();
                    config.save_to_file(&path)?;
                    Ok(config)
                }
            }
        } else {
            let config = Self::default();
            config.save_to_file(&path)?;
            println!("デフォルト設定ファイルを作成しました: {}", path.as_ref().display());
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("無効なポート番号: {}", self.server.port));
        }

        if self.recognition.endpoint.is_empty() {
            return Err(anyhow::anyhow!("認識バックエンドのエンドポイントが未設定です"));
        }

        if self.recognition.language_code.is_empty() {
            return Err(anyhow::anyhow!("言語コードが未設定です"));
        }

        // 一時ディレクトリの存在確認と作成
        if !Path::new(&self.paths.temp_dir).exists() {
            fs::create_dir_all(&self.paths.temp_dir)
                .map_err(|e| anyhow::anyhow!("ディレクトリの作成に失敗: {} - {}", self.paths.temp_dir, e))?;
        }

        if self.limits.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("最大ファイルサイズは1MB以上である必要があります"));
        }

        if self.limits.transcode_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("変換タイムアウトは1秒以上である必要があります"));
        }

        Ok(())
    }

    /// 認識バックエンドの資格情報を読み込む
    /// - 末尾改行を含んだままの可能性がある。除去はメタデータ生成時に行う
    pub fn load_credential(&self) -> Result<String> {
        fs::read_to_string(&self.recognition.credential_file).map_err(|e| {
            anyhow::anyhow!(
                "資格情報ファイルが読み込めません: {} - {}",
                self.recognition.credential_file,
                e
            )
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.limits.max_file_size_mb * 1024 * 1024
    }
}
