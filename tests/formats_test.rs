use VoiceMemoBackendAPI::formats::*;

#[cfg(test)]
mod formats_tests {
    use super::*;

    /// サポート対象の mime タイプ/拡張子の組がすべて正規 mime に解決されること
    #[test]
    fn test_supported_pairs_resolve_to_canonical_mime() {
        let cases = vec![
            ("audio/mpeg", "memo.mp3", "audio/mpeg"),
            ("audio/mp3", "memo.mp3", "audio/mpeg"),
            ("mp3", "memo.mp3", "audio/mpeg"),
            ("mpeg", "memo.mpeg", "audio/mpeg"),
            ("audio/mp4", "memo.m4a", "audio/mp4"),
            ("m4a", "memo.m4a", "audio/mp4"),
            ("mp4", "memo.mp4", "audio/mp4"),
            ("audio/ogg", "memo.ogg", "audio/ogg"),
            ("ogg", "memo.ogg", "audio/ogg"),
        ];

        for (mime, filename, expected) in cases {
            assert_eq!(
                resolve_upload(mime, filename),
                Some(expected),
                "mime={} filename={}",
                mime,
                filename
            );
        }
    }

    /// mime が空でも拡張子から解決できること
    #[test]
    fn test_extension_fallback_when_mime_empty() {
        assert_eq!(resolve_upload("", "memo.mp3"), Some("audio/mpeg"));
        assert_eq!(resolve_upload("", "memo.M4A"), Some("audio/mp4"));
        assert_eq!(resolve_upload("application/octet-stream", "memo.ogg"), Some("audio/ogg"));
    }

    /// wav はどの表記でも解決されないこと（拡張子があっても）
    #[test]
    fn test_wav_never_resolves() {
        assert_eq!(resolve_upload("audio/wav", "memo.wav"), None);
        assert_eq!(resolve_upload("audio/x-wav", "memo.wav"), None);
        assert_eq!(resolve_upload("wav", "memo.wav"), None);
        assert_eq!(resolve_upload("", "memo.wav"), None);

        assert!(is_wav("audio/wav", "memo.bin"));
        assert!(is_wav("", "memo.wav"));
        assert!(is_wav("audio/wave", "memo"));
        assert!(!is_wav("audio/mpeg", "memo.mp3"));
    }

    /// 空・未知の mime タイプは webm 拡張子に既定されること
    #[test]
    fn test_unknown_mime_maps_to_webm_extension() {
        assert_eq!(extension_for_mime(""), "webm");
        assert_eq!(extension_for_mime("audio/webm"), "webm");
        assert_eq!(extension_for_mime("video/unknown"), "webm");
    }

    /// 既知の mime タイプは正規の拡張子に解決されること
    #[test]
    fn test_known_mime_maps_to_primary_extension() {
        assert_eq!(extension_for_mime("audio/mpeg"), "mp3");
        assert_eq!(extension_for_mime("audio/mp4"), "m4a");
        assert_eq!(extension_for_mime("audio/ogg"), "ogg");
    }

    /// charset 付きの mime タイプも解決できること
    #[test]
    fn test_mime_with_parameters() {
        assert_eq!(resolve_mime("audio/ogg; codecs=opus"), Some("audio/ogg"));
    }
}
