//! Download engine: resolves a URL through the extractor registry and
//! dispatches to the right download strategy.
//!
//! This is the queue's [`JobRunner`]. Every job flows through exactly one
//! exhaustive match on [`MediaDescriptor`], so the dispatch rules live in
//! one place: paired audio → dual-stream merge, HLS manifest → segmented
//! download, everything else → plain streaming.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::extractor::{
    AudioMedia, ExtractorRegistry, ImageMedia, MediaDescriptor, VideoFormat, VideoMedia,
};
use crate::queue::{JobObserver, JobRequest, JobRunner};

use super::error::DownloadError;
use super::filename::{ensure_extension, sanitize_filename, url_path_extension};
use super::hls::HlsDownloader;
use super::merge::DualStreamDownloader;
use super::plain::HttpClient;
use super::remux::{FfmpegRemuxer, Remuxer};

/// Returns true when the URL points at an HLS manifest, with or without a
/// query string. Extensions match case-insensitively.
fn is_hls_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    url.ends_with(".m3u8") || url.contains(".m3u8?")
}

/// Returns the format's paired audio URL, treating an empty string as
/// absent.
fn paired_audio(format: &VideoFormat) -> Option<&str> {
    format.audio_url.as_deref().filter(|url| !url.is_empty())
}

/// Picks the format to download.
///
/// Preference order: highest bitrate among formats carrying a paired audio
/// URL; if none carries one, highest bitrate overall.
fn select_best_format(formats: &[VideoFormat]) -> Option<&VideoFormat> {
    formats
        .iter()
        .filter(|f| paired_audio(f).is_some())
        .max_by_key(|f| f.bitrate)
        .or_else(|| formats.iter().max_by_key(|f| f.bitrate))
}

/// Resolves the base output name: sanitized request, then sanitized title,
/// then the stable media ID.
fn resolve_base_name(requested: Option<&str>, title: &str, id: &str) -> String {
    if let Some(requested) = requested {
        let name = sanitize_filename(requested);
        if !name.is_empty() {
            return name;
        }
    }
    let name = sanitize_filename(title);
    if name.is_empty() { id.to_string() } else { name }
}

/// The download engine.
pub struct DownloadEngine {
    config: Config,
    registry: ExtractorRegistry,
    client: HttpClient,
    hls: HlsDownloader,
    dual: DualStreamDownloader,
}

impl DownloadEngine {
    /// Creates an engine with an ffmpeg remuxer taken from the config.
    #[must_use]
    pub fn new(config: Config, registry: ExtractorRegistry) -> Self {
        let remuxer: Arc<dyn Remuxer> = Arc::new(FfmpegRemuxer::new(config.ffmpeg_path.clone()));
        Self::with_remuxer(config, registry, remuxer)
    }

    /// Creates an engine with an explicit remuxer (tests substitute stubs).
    #[must_use]
    pub fn with_remuxer(
        config: Config,
        registry: ExtractorRegistry,
        remuxer: Arc<dyn Remuxer>,
    ) -> Self {
        let config = config.normalized();
        let client = HttpClient::new();
        let hls = HlsDownloader::new(client.clone(), config.hls_concurrency, Arc::clone(&remuxer));
        let dual = DualStreamDownloader::new(client.clone(), remuxer);
        Self {
            config,
            registry,
            client,
            hls,
            dual,
        }
    }

    async fn run_video(
        &self,
        video: &VideoMedia,
        request: &JobRequest,
        observer: &dyn JobObserver,
        token: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let format = select_best_format(&video.formats).ok_or(DownloadError::NoMedia {
            kind: "video formats",
        })?;

        let hls = is_hls_url(&format.url);
        let mut ext = if format.ext.is_empty() {
            url_path_extension(&format.url).unwrap_or_else(|| "mp4".to_string())
        } else {
            format.ext.clone()
        };
        // A manifest extension never names the output container.
        if hls || ext == "m3u8" {
            ext = "ts".to_string();
        }

        let base = resolve_base_name(request.filename.as_deref(), &video.title, &video.id);
        let filename = ensure_extension(&base, &ext);
        let dest = self.config.output_dir.join(&filename);
        observer.set_filename(&filename);

        let progress = |downloaded: u64, total: u64| observer.progress(downloaded, total);

        let final_path: PathBuf = if let Some(audio_url) = paired_audio(format) {
            debug!(video = %format.url, audio = %audio_url, "dual-stream download");
            self.dual
                .download(
                    &format.url,
                    audio_url,
                    &dest,
                    &format.headers,
                    &progress,
                    token,
                )
                .await?
        } else if hls {
            debug!(manifest = %format.url, "HLS download");
            self.hls
                .download(&format.url, &dest, &format.headers, &progress, token)
                .await?
        } else {
            debug!(url = %format.url, "plain download");
            self.client
                .download_to_path(&format.url, &dest, &format.headers, &progress, token)
                .await?;
            dest.clone()
        };

        // Remuxing may have produced a different container.
        if final_path != dest
            && let Some(name) = final_path.file_name()
        {
            observer.set_filename(&name.to_string_lossy());
        }
        Ok(())
    }

    async fn run_audio(
        &self,
        audio: &AudioMedia,
        request: &JobRequest,
        observer: &dyn JobObserver,
        token: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let ext = if audio.ext.is_empty() {
            url_path_extension(&audio.url).unwrap_or_else(|| "mp3".to_string())
        } else {
            audio.ext.clone()
        };
        let base = resolve_base_name(request.filename.as_deref(), &audio.title, &audio.id);
        let filename = ensure_extension(&base, &ext);
        let dest = self.config.output_dir.join(&filename);
        observer.set_filename(&filename);

        let progress = |downloaded: u64, total: u64| observer.progress(downloaded, total);
        self.client
            .download_to_path(
                &audio.url,
                &dest,
                &std::collections::HashMap::new(),
                &progress,
                token,
            )
            .await?;
        Ok(())
    }

    /// Downloads every image sequentially; the first failure aborts the job
    /// and already-written files stay on disk.
    async fn run_images(
        &self,
        images: &ImageMedia,
        request: &JobRequest,
        observer: &dyn JobObserver,
        token: &CancellationToken,
    ) -> Result<(), DownloadError> {
        if images.images.is_empty() {
            return Err(DownloadError::NoMedia { kind: "images" });
        }

        let base = resolve_base_name(request.filename.as_deref(), &images.title, &images.id);
        let multiple = images.images.len() > 1;
        let names: Vec<String> = images
            .images
            .iter()
            .enumerate()
            .map(|(index, image)| {
                let ext = if image.ext.is_empty() { "jpg" } else { &image.ext };
                if multiple {
                    ensure_extension(&format!("{base}_{}", index + 1), ext)
                } else {
                    ensure_extension(&base, ext)
                }
            })
            .collect();
        observer.set_filename(&names.join(", "));

        let total = images.images.len() as u64;
        let headers = std::collections::HashMap::new();
        for (index, (image, name)) in images.images.iter().zip(&names).enumerate() {
            let dest = self.config.output_dir.join(name);
            self.client
                .download_to_path(&image.url, &dest, &headers, &|_, _| {}, token)
                .await?;
            observer.progress(index as u64 + 1, total);
        }
        Ok(())
    }
}

#[async_trait]
impl JobRunner for DownloadEngine {
    #[instrument(skip(self, observer, token), fields(url = %request.url))]
    async fn run(
        &self,
        request: &JobRequest,
        observer: &dyn JobObserver,
        token: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let extractor = self
            .registry
            .find(&request.url)
            .ok_or_else(|| DownloadError::NoExtractor {
                url: request.url.clone(),
            })?;
        info!(extractor = extractor.name(), "resolving media");

        let media = extractor
            .extract(&request.url)
            .await
            .map_err(|e| DownloadError::extraction(&request.url, e.to_string()))?;

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| DownloadError::io(&self.config.output_dir, e))?;

        match &media {
            MediaDescriptor::Video(video) => self.run_video(video, request, observer, token).await,
            MediaDescriptor::Audio(audio) => self.run_audio(audio, request, observer, token).await,
            MediaDescriptor::Image(images) => {
                self.run_images(images, request, observer, token).await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    use tempfile::TempDir;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::extractor::{ExtractError, Extractor, ImageFile};

    /// Extractor returning a canned descriptor for any URL.
    struct CannedExtractor {
        media: MediaDescriptor,
    }

    #[async_trait]
    impl Extractor for CannedExtractor {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn matches(&self, _url: &str) -> bool {
            true
        }

        async fn extract(&self, _url: &str) -> Result<MediaDescriptor, ExtractError> {
            Ok(self.media.clone())
        }
    }

    struct NoTool;

    #[async_trait]
    impl Remuxer for NoTool {
        async fn available(&self) -> bool {
            false
        }

        async fn merge(&self, _v: &Path, _a: &Path) -> Result<PathBuf, DownloadError> {
            Err(DownloadError::merge("no tool"))
        }

        async fn convert(&self, _i: &Path, _o: &Path) -> Result<(), DownloadError> {
            Err(DownloadError::merge("no tool"))
        }
    }

    /// Remuxer stub that merges and converts with plain file copies.
    struct CopyTool;

    #[async_trait]
    impl Remuxer for CopyTool {
        async fn available(&self) -> bool {
            true
        }

        async fn merge(&self, video: &Path, audio: &Path) -> Result<PathBuf, DownloadError> {
            let merged = crate::download::remux::merged_output_path(video);
            let mut data = tokio::fs::read(video)
                .await
                .map_err(|e| DownloadError::io(video, e))?;
            let audio_data = tokio::fs::read(audio)
                .await
                .map_err(|e| DownloadError::io(audio, e))?;
            data.extend(audio_data);
            tokio::fs::write(&merged, data)
                .await
                .map_err(|e| DownloadError::io(&merged, e))?;
            Ok(merged)
        }

        async fn convert(&self, input: &Path, output: &Path) -> Result<(), DownloadError> {
            tokio::fs::copy(input, output)
                .await
                .map_err(|e| DownloadError::io(output, e))?;
            Ok(())
        }
    }

    /// Observer recording everything it sees.
    #[derive(Default)]
    struct RecordingObserver {
        progress: Mutex<Vec<(u64, u64)>>,
        filenames: Mutex<Vec<String>>,
    }

    impl JobObserver for RecordingObserver {
        fn progress(&self, downloaded: u64, total: u64) {
            self.progress.lock().unwrap().push((downloaded, total));
        }

        fn set_filename(&self, filename: &str) {
            self.filenames.lock().unwrap().push(filename.to_string());
        }
    }

    fn engine_with(
        media: MediaDescriptor,
        output_dir: &Path,
        remuxer: Arc<dyn Remuxer>,
    ) -> DownloadEngine {
        let mut registry = ExtractorRegistry::new();
        registry.register(Box::new(CannedExtractor { media }));
        let config = Config::new(output_dir);
        DownloadEngine::with_remuxer(config, registry, remuxer)
    }

    fn engine_for(media: MediaDescriptor, output_dir: &Path) -> DownloadEngine {
        engine_with(media, output_dir, Arc::new(NoTool))
    }

    fn format(url: &str, audio_url: Option<&str>, bitrate: u64, ext: &str) -> VideoFormat {
        VideoFormat {
            url: url.to_string(),
            audio_url: audio_url.map(String::from),
            headers: HashMap::new(),
            bitrate,
            ext: ext.to_string(),
        }
    }

    #[test]
    fn test_format_selection_prefers_paired_audio() {
        let formats = vec![
            format("https://cdn/only-video-high.mp4", None, 9000, "mp4"),
            format(
                "https://cdn/with-audio-low.mp4",
                Some("https://cdn/a1.m4a"),
                2000,
                "mp4",
            ),
            format(
                "https://cdn/with-audio-mid.mp4",
                Some("https://cdn/a2.m4a"),
                5000,
                "mp4",
            ),
        ];
        let best = select_best_format(&formats).unwrap();
        assert_eq!(best.url, "https://cdn/with-audio-mid.mp4");
    }

    #[test]
    fn test_sole_audio_carrier_beats_higher_bitrates() {
        let formats = vec![
            format("https://cdn/a.mp4", None, 500, "mp4"),
            format("https://cdn/b.mp4", Some("https://cdn/b.m4a"), 300, "mp4"),
            format("https://cdn/c.mp4", None, 900, "mp4"),
        ];
        let best = select_best_format(&formats).unwrap();
        assert_eq!(best.url, "https://cdn/b.mp4");
    }

    #[test]
    fn test_format_selection_falls_back_to_global_max() {
        let formats = vec![
            format("https://cdn/low.mp4", None, 1000, "mp4"),
            format("https://cdn/high.mp4", None, 8000, "mp4"),
        ];
        let best = select_best_format(&formats).unwrap();
        assert_eq!(best.url, "https://cdn/high.mp4");
        assert!(select_best_format(&[]).is_none());
    }

    #[test]
    fn test_hls_url_detection() {
        assert!(is_hls_url("https://cdn/stream.m3u8"));
        assert!(is_hls_url("https://cdn/stream.m3u8?token=abc"));
        assert!(is_hls_url("https://cdn/stream.M3U8"));
        assert!(is_hls_url("https://cdn/stream.M3u8?token=abc"));
        assert!(!is_hls_url("https://cdn/stream.mp4"));
        assert!(!is_hls_url("https://cdn/m3u8/stream.mp4"));
    }

    #[test]
    fn test_empty_audio_url_is_not_paired() {
        let formats = vec![
            format("https://cdn/blank-audio.mp4", Some(""), 9000, "mp4"),
            format("https://cdn/real-audio.mp4", Some("https://cdn/a.m4a"), 300, "mp4"),
        ];
        let best = select_best_format(&formats).unwrap();
        assert_eq!(best.url, "https://cdn/real-audio.mp4");

        // Only blank audio anywhere: fall back to the global bitrate max.
        let formats = vec![
            format("https://cdn/blank-audio.mp4", Some(""), 100, "mp4"),
            format("https://cdn/video-only.mp4", None, 900, "mp4"),
        ];
        let best = select_best_format(&formats).unwrap();
        assert_eq!(best.url, "https://cdn/video-only.mp4");
    }

    #[test]
    fn test_base_name_resolution_order() {
        assert_eq!(
            resolve_base_name(Some("My Clip"), "Title", "id9"),
            "My_Clip"
        );
        assert_eq!(resolve_base_name(None, "Some: Title", "id9"), "Some_Title");
        assert_eq!(resolve_base_name(Some("///"), "::::", "id9"), "id9");
    }

    #[tokio::test]
    async fn test_plain_video_download_reports_filename() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(url_path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![5u8; 256]))
            .mount(&server)
            .await;

        let media = MediaDescriptor::Video(VideoMedia {
            title: "Demo Video".to_string(),
            id: "demo1".to_string(),
            formats: vec![format(
                &format!("{}/clip.mp4", server.uri()),
                None,
                1000,
                "mp4",
            )],
        });
        let engine = engine_for(media, temp.path());
        let observer = RecordingObserver::default();
        let request = JobRequest {
            url: "https://source.example/watch/demo1".to_string(),
            filename: None,
        };

        engine
            .run(&request, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            observer.filenames.lock().unwrap().as_slice(),
            ["Demo_Video.mp4"]
        );
        assert!(temp.path().join("Demo_Video.mp4").exists());
        let updates = observer.progress.lock().unwrap();
        assert_eq!(updates.last().unwrap(), &(256, 256));
    }

    #[tokio::test]
    async fn test_manifest_extension_corrected_to_ts() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        let manifest = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n\
            #EXTINF:4.0,\nseg0.ts\n#EXT-X-ENDLIST\n";
        Mock::given(method("GET"))
            .and(url_path("/live.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(manifest.as_bytes().to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/seg0.ts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![3u8; 188]))
            .mount(&server)
            .await;

        let media = MediaDescriptor::Video(VideoMedia {
            title: "Live Stream".to_string(),
            id: "live1".to_string(),
            formats: vec![format(
                &format!("{}/live.m3u8", server.uri()),
                None,
                0,
                "m3u8",
            )],
        });
        let engine = engine_for(media, temp.path());
        let observer = RecordingObserver::default();
        let request = JobRequest {
            url: "https://source.example/live".to_string(),
            filename: None,
        };

        engine
            .run(&request, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            observer.filenames.lock().unwrap().first().unwrap(),
            "Live_Stream.ts"
        );
        assert!(temp.path().join("Live_Stream.ts").exists());
    }

    #[tokio::test]
    async fn test_successful_merge_reports_adjusted_filename() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(url_path("/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 512]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/a.m4a"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![2u8; 256]))
            .mount(&server)
            .await;

        let audio_url = format!("{}/a.m4a", server.uri());
        let media = MediaDescriptor::Video(VideoMedia {
            title: "Split Clip".to_string(),
            id: "split1".to_string(),
            formats: vec![format(
                &format!("{}/v.mp4", server.uri()),
                Some(audio_url.as_str()),
                4000,
                "mp4",
            )],
        });
        let engine = engine_with(media, temp.path(), Arc::new(CopyTool));
        let observer = RecordingObserver::default();
        let request = JobRequest {
            url: "https://source.example/watch/split1".to_string(),
            filename: None,
        };

        engine
            .run(&request, &observer, &CancellationToken::new())
            .await
            .unwrap();

        // The merge changed the output container, so the filename is
        // reported a second time with the merged name.
        assert_eq!(
            observer.filenames.lock().unwrap().as_slice(),
            ["Split_Clip.mp4", "Split_Clip_merged.mp4"]
        );
        assert!(temp.path().join("Split_Clip_merged.mp4").exists());
        // Originals are kept next to the merged file.
        assert!(temp.path().join("Split_Clip.mp4").exists());
        assert!(temp.path().join("Split_Clip.m4a").exists());
    }

    #[tokio::test]
    async fn test_hls_conversion_reports_adjusted_filename() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        let manifest = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n\
            #EXTINF:4.0,\nseg0.ts\n#EXT-X-ENDLIST\n";
        Mock::given(method("GET"))
            .and(url_path("/live.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(manifest.as_bytes().to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/seg0.ts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![3u8; 188]))
            .mount(&server)
            .await;

        let media = MediaDescriptor::Video(VideoMedia {
            title: "Live Stream".to_string(),
            id: "live1".to_string(),
            formats: vec![format(
                &format!("{}/live.m3u8", server.uri()),
                None,
                0,
                "m3u8",
            )],
        });
        let engine = engine_with(media, temp.path(), Arc::new(CopyTool));
        let observer = RecordingObserver::default();
        let request = JobRequest {
            url: "https://source.example/live".to_string(),
            filename: None,
        };

        engine
            .run(&request, &observer, &CancellationToken::new())
            .await
            .unwrap();

        // Conversion replaced the transport stream; the job's filename
        // follows the new container.
        assert_eq!(
            observer.filenames.lock().unwrap().as_slice(),
            ["Live_Stream.ts", "Live_Stream.mp4"]
        );
        assert!(temp.path().join("Live_Stream.mp4").exists());
        assert!(!temp.path().join("Live_Stream.ts").exists());
    }

    #[tokio::test]
    async fn test_blank_audio_url_downloads_as_plain_video() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(url_path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![5u8; 128]))
            .mount(&server)
            .await;

        let media = MediaDescriptor::Video(VideoMedia {
            title: "Solo Clip".to_string(),
            id: "solo1".to_string(),
            formats: vec![format(
                &format!("{}/clip.mp4", server.uri()),
                Some(""),
                1000,
                "mp4",
            )],
        });
        let engine = engine_for(media, temp.path());
        let observer = RecordingObserver::default();
        let request = JobRequest {
            url: "https://source.example/solo1".to_string(),
            filename: None,
        };

        engine
            .run(&request, &observer, &CancellationToken::new())
            .await
            .unwrap();

        // A blank audio URL must not route through the dual-stream path.
        assert!(temp.path().join("Solo_Clip.mp4").exists());
        assert!(!temp.path().join("Solo_Clip.m4a").exists());
    }

    #[tokio::test]
    async fn test_multi_image_naming_and_fail_fast() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(url_path("/1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 10]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/2.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/3.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![3u8; 10]))
            .mount(&server)
            .await;

        let media = MediaDescriptor::Image(ImageMedia {
            title: "Gallery Post".to_string(),
            id: "post1".to_string(),
            images: (1..=3)
                .map(|i| ImageFile {
                    url: format!("{}/{i}.jpg", server.uri()),
                    ext: "jpg".to_string(),
                })
                .collect(),
        });
        let engine = engine_for(media, temp.path());
        let observer = RecordingObserver::default();
        let request = JobRequest {
            url: "https://source.example/post1".to_string(),
            filename: None,
        };

        let result = engine
            .run(&request, &observer, &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(DownloadError::HttpStatus { status: 404, .. })
        ));

        // 1-based suffixes, joined with ", ".
        assert_eq!(
            observer.filenames.lock().unwrap().first().unwrap(),
            "Gallery_Post_1.jpg, Gallery_Post_2.jpg, Gallery_Post_3.jpg"
        );
        // Fail-fast: the first image stays, the third is never fetched.
        assert!(temp.path().join("Gallery_Post_1.jpg").exists());
        assert!(!temp.path().join("Gallery_Post_3.jpg").exists());
    }

    #[tokio::test]
    async fn test_no_extractor_match_is_an_error() {
        let temp = TempDir::new().unwrap();
        let registry = ExtractorRegistry::new();
        let engine =
            DownloadEngine::with_remuxer(Config::new(temp.path()), registry, Arc::new(NoTool));
        let observer = RecordingObserver::default();
        let request = JobRequest {
            url: "https://unknown.example/x".to_string(),
            filename: None,
        };

        let result = engine
            .run(&request, &observer, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(DownloadError::NoExtractor { .. })));
    }

    #[tokio::test]
    async fn test_empty_formats_is_no_media() {
        let temp = TempDir::new().unwrap();
        let media = MediaDescriptor::Video(VideoMedia {
            title: "Empty".to_string(),
            id: "e1".to_string(),
            formats: vec![],
        });
        let engine = engine_for(media, temp.path());
        let observer = RecordingObserver::default();
        let request = JobRequest {
            url: "https://source.example/e1".to_string(),
            filename: None,
        };

        let result = engine
            .run(&request, &observer, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(DownloadError::NoMedia { .. })));
    }
}
