//! アップロード形式の解決
//!
//! ブラウザ録音やファイルアップロードが申告する mime タイプ/拡張子を
//! 正規の mime タイプへ解決する。wav は内部のデコード対象としては有効だが、
//! 手動アップロード形式としては受け付けない。

/// 正規 mime タイプと受理する拡張子エイリアスの対応表
const SUPPORTED_FORMATS: &[(&str, &[&str])] = &[
    ("audio/mpeg", &["mp3", "mpeg"]),
    ("audio/mp4", &["m4a", "mp4"]),
    ("audio/ogg", &["ogg"]),
];

/// mime タイプまたは拡張子から正規 mime タイプを解決
/// - wav はどの表記でも None
pub fn resolve_mime(declared: &str) -> Option<&'static str> {
    let declared = declared.trim().to_lowercase();
    let declared = declared.split(';').next().unwrap_or("").trim();

    for &(canonical, aliases) in SUPPORTED_FORMATS {
        if declared == canonical {
            return Some(canonical);
        }
        for &alias in aliases {
            if declared == alias || declared == format!("audio/{}", alias) {
                return Some(canonical);
            }
        }
    }

    None
}

/// mime タイプからファイル拡張子を解決
/// - 空や未知のタイプは webm を既定とする（ブラウザ録音の既定コンテナ）
pub fn extension_for_mime(mime: &str) -> &'static str {
    for &(canonical, aliases) in SUPPORTED_FORMATS {
        if resolve_mime(mime) == Some(canonical) {
            return aliases[0];
        }
    }
    "webm"
}

/// ファイル名から拡張子を取り出す（小文字化）
pub fn extension_of(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// アップロードの mime タイプとファイル名の組を検証し、正規 mime を返す
/// - mime が未知でも拡張子から解決できれば受理する
pub fn resolve_upload(mime: &str, filename: &str) -> Option<&'static str> {
    if let Some(canonical) = resolve_mime(mime) {
        return Some(canonical);
    }
    extension_of(filename).and_then(|ext| resolve_mime(&ext))
}

/// wav 判定。デコード対象としては有効だがアップロード形式としては拒否する
pub fn is_wav(mime: &str, filename: &str) -> bool {
    let declared = mime.trim().to_lowercase();
    let declared = declared.split(';').next().unwrap_or("").trim().to_string();

    matches!(declared.as_str(), "audio/wav" | "audio/x-wav" | "audio/wave" | "wav")
        || extension_of(filename).as_deref() == Some("wav")
}
