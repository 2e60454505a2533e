//! Artifact acquirer: turn an [`InputReference`] into a local file.
//!
//! Remote inputs go through an ordered list of interchangeable fetchers
//! (the built-in HTTP client first, then external transfer commands).
//! Inline inputs are standard base64. Either way the destination is
//! removed before every attempt and an empty result counts as a failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use fusejob_config::{FetchConfig, FetcherTemplate};
use fusejob_types::InputReference;

use crate::error::{AcquisitionError, AcquisitionResult};

/// Extensions trusted when they appear on a URL path.
const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "bmp", "gif", "mp4", "mov", "webm", "mkv", "avi",
];

/// A staged input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    pub path: PathBuf,
    pub len: u64,
}

/// One way of downloading a URL to a path.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn name(&self) -> &str;

    /// Write the resource at `url` to `dest`. Errors are human-readable.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP fetcher
// ─────────────────────────────────────────────────────────────────────────────

/// Streams the response body to disk with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> AcquisitionResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AcquisitionError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("bad status: {e}"))?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| format!("failed to create {}: {}", dest.display(), e))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| format!("failed to read response stream: {e}"))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("failed to write {}: {}", dest.display(), e))?;
        }

        file.flush()
            .await
            .map_err(|e| format!("failed to flush {}: {}", dest.display(), e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command fetcher
// ─────────────────────────────────────────────────────────────────────────────

/// Delegates to an external transfer tool such as `curl` or `wget`.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    template: FetcherTemplate,
    timeout: Duration,
}

impl CommandFetcher {
    pub fn new(template: FetcherTemplate, timeout: Duration) -> Self {
        Self { template, timeout }
    }

    fn render_args(&self, url: &str, dest: &Path) -> Vec<String> {
        let dest = dest.display().to_string();
        let secs = self.timeout.as_secs().max(1).to_string();
        let vars = [("{url}", url), ("{dest}", dest.as_str()), ("{timeout}", secs.as_str())];
        self.template
            .args
            .iter()
            .map(|a| render_template(a, &vars))
            .collect()
    }
}

/// Single-pass token replacement; substituted text is never rescanned.
fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match vars.iter().find(|(token, _)| tail.starts_with(token)) {
            Some((token, value)) => {
                out.push_str(value);
                rest = &tail[token.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[async_trait]
impl Fetcher for CommandFetcher {
    fn name(&self) -> &str {
        &self.template.name
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), String> {
        let output = tokio::process::Command::new(&self.template.program)
            .args(self.render_args(url, dest))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        // The tool gets its own timeout flag; this is the backstop.
        let backstop = self.timeout + Duration::from_secs(5);
        let output = match tokio::time::timeout(backstop, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("failed to spawn '{}': {}", self.template.program, e)),
            Err(_) => return Err(format!("timed out after {}s", backstop.as_secs())),
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!(
                "exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Acquirer
// ─────────────────────────────────────────────────────────────────────────────

/// Materializes job inputs on disk.
pub struct Acquirer {
    fetchers: Vec<Box<dyn Fetcher>>,
}

impl Acquirer {
    /// HTTP client first, then the configured command fetchers in order.
    pub fn from_config(fetch: &FetchConfig, timeout: Duration) -> AcquisitionResult<Self> {
        let mut fetchers: Vec<Box<dyn Fetcher>> =
            vec![Box::new(HttpFetcher::new(timeout, &fetch.user_agent)?)];
        fetchers.extend(
            fetch
                .fallbacks
                .iter()
                .cloned()
                .map(|t| Box::new(CommandFetcher::new(t, timeout)) as Box<dyn Fetcher>),
        );
        Ok(Self { fetchers })
    }

    pub fn with_fetchers(fetchers: Vec<Box<dyn Fetcher>>) -> Self {
        Self { fetchers }
    }

    pub fn fetcher_names(&self) -> Vec<&str> {
        self.fetchers.iter().map(|f| f.name()).collect()
    }

    /// Write `reference` to `dest`.
    pub async fn acquire(
        &self,
        reference: &InputReference,
        dest: &Path,
    ) -> AcquisitionResult<LocalArtifact> {
        match reference {
            InputReference::Remote(url) => self.fetch_remote(url, dest).await,
            InputReference::Inline(data) => write_inline(data, dest).await,
        }
    }

    /// Acquire into `dir` as `<stem>.<ext>`, choosing the extension from the
    /// URL or, failing that, from the file's leading bytes.
    pub async fn stage(
        &self,
        reference: &InputReference,
        dir: &Path,
        stem: &str,
    ) -> AcquisitionResult<LocalArtifact> {
        let partial = dir.join(format!("{stem}.download"));
        let artifact = self.acquire(reference, &partial).await?;

        let ext = match reference {
            InputReference::Remote(url) => url_extension(url),
            InputReference::Inline(_) => None,
        };
        let ext = match ext {
            Some(ext) => ext,
            None => sniff_file(&artifact.path).await.to_string(),
        };

        let path = dir.join(format!("{stem}.{ext}"));
        tokio::fs::rename(&artifact.path, &path)
            .await
            .map_err(|e| AcquisitionError::Io {
                path: path.clone(),
                source: e,
            })?;

        tracing::info!(
            input = stem,
            path = %path.display(),
            bytes = artifact.len,
            "Staged input"
        );
        Ok(LocalArtifact {
            path,
            len: artifact.len,
        })
    }

    async fn fetch_remote(&self, url: &str, dest: &Path) -> AcquisitionResult<LocalArtifact> {
        let mut failures = Vec::new();

        for fetcher in &self.fetchers {
            remove_if_present(dest).await?;
            tracing::debug!(fetcher = fetcher.name(), url = %url, "Fetching input");

            match fetcher.fetch(url, dest).await {
                Ok(()) => match non_empty_len(dest).await {
                    Some(len) => {
                        return Ok(LocalArtifact {
                            path: dest.to_path_buf(),
                            len,
                        });
                    }
                    None => {
                        tracing::warn!(fetcher = fetcher.name(), url = %url, "Fetch produced an empty file");
                        failures.push(format!("{}: empty file", fetcher.name()));
                    }
                },
                Err(e) => {
                    tracing::warn!(fetcher = fetcher.name(), url = %url, error = %e, "Fetch failed");
                    failures.push(format!("{}: {}", fetcher.name(), e));
                }
            }
        }

        remove_if_present(dest).await?;
        Err(AcquisitionError::FetchFailed {
            url: url.to_string(),
            failures,
        })
    }
}

async fn write_inline(data: &str, dest: &Path) -> AcquisitionResult<LocalArtifact> {
    let bytes = decode_inline(data)?;
    if bytes.is_empty() {
        return Err(AcquisitionError::EmptyPayload);
    }

    remove_if_present(dest).await?;
    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| AcquisitionError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;

    Ok(LocalArtifact {
        path: dest.to_path_buf(),
        len: bytes.len() as u64,
    })
}

/// Decode standard base64, tolerating a `data:...;base64,` prefix and
/// embedded whitespace.
pub fn decode_inline(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let body = match data.find(";base64,") {
        Some(idx) if data.starts_with("data:") => &data[idx + ";base64,".len()..],
        _ => data,
    };
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Standard base64 of `bytes`.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

async fn remove_if_present(path: &Path) -> AcquisitionResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AcquisitionError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

async fn non_empty_len(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}

/// Media extension on the URL's last path segment, lowercased.
pub fn url_extension(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let ext = Path::new(last).extension()?.to_str()?.to_ascii_lowercase();
    MEDIA_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

async fn sniff_file(path: &Path) -> &'static str {
    use tokio::io::AsyncReadExt;

    let mut head = [0u8; 16];
    let read = match tokio::fs::File::open(path).await {
        Ok(mut f) => f.read(&mut head).await.unwrap_or(0),
        Err(_) => 0,
    };
    sniff_extension(&head[..read])
}

/// Guess a file extension from leading bytes.
pub fn sniff_extension(head: &[u8]) -> &'static str {
    match head {
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [0x89, b'P', b'N', b'G', ..] => "png",
        [b'G', b'I', b'F', b'8', ..] => "gif",
        [b'B', b'M', ..] => "bmp",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'A', b'V', b'I', b' ', ..] => "avi",
        [_, _, _, _, b'f', b't', b'y', b'p', b'q', b't', ..] => "mov",
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => "mp4",
        [0x1A, 0x45, 0xDF, 0xA3, ..] => "webm",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Writes fixed bytes (possibly none) or fails, counting calls.
    struct FakeFetcher {
        name: &'static str,
        result: Result<Vec<u8>, &'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _url: &str, dest: &Path) -> Result<(), String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(bytes) => {
                    tokio::fs::write(dest, bytes).await.unwrap();
                    Ok(())
                }
                Err(e) => {
                    // Leave a partial file behind, as a broken transfer would.
                    tokio::fs::write(dest, b"partial").await.unwrap();
                    Err(e.to_string())
                }
            }
        }
    }

    fn fake(name: &'static str, result: Result<Vec<u8>, &'static str>) -> (Box<dyn Fetcher>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(FakeFetcher {
                name,
                result,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn http_only() -> Acquirer {
        Acquirer::with_fetchers(vec![Box::new(
            HttpFetcher::new(Duration::from_secs(5), "fusejob-test").unwrap(),
        )])
    }

    #[test]
    fn test_decode_roundtrip_and_prefix() {
        let bytes = vec![0u8, 1, 2, 250, 255];
        assert_eq!(decode_inline(&encode(&bytes)).unwrap(), bytes);

        let data_url = format!("data:image/png;base64,{}", encode(b"pixels"));
        assert_eq!(decode_inline(&data_url).unwrap(), b"pixels");

        assert_eq!(decode_inline("aGVs\nbG8=").unwrap(), b"hello");
        assert!(decode_inline("not base64!").is_err());
    }

    #[test]
    fn test_sniff_extension() {
        assert_eq!(sniff_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(sniff_extension(b"\x89PNG\r\n\x1a\n"), "png");
        assert_eq!(sniff_extension(b"\0\0\0\x18ftypisom"), "mp4");
        assert_eq!(sniff_extension(b"\0\0\0\x14ftypqt  "), "mov");
        assert_eq!(sniff_extension(b"RIFF\0\0\0\0WEBPVP8 "), "webp");
        assert_eq!(sniff_extension(b"hello"), "bin");
        assert_eq!(sniff_extension(b""), "bin");
    }

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://x.test/a/face.JPG?sig=1").as_deref(), Some("jpg"));
        assert_eq!(url_extension("https://x.test/clip.mp4").as_deref(), Some("mp4"));
        assert_eq!(url_extension("https://x.test/download?id=3"), None);
        assert_eq!(url_extension("https://x.test/archive.tar.gz"), None);
    }

    #[tokio::test]
    async fn test_inline_written() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("in.bin");
        let reference = InputReference::Inline(encode(b"face bytes"));

        let artifact = http_only().acquire(&reference, &dest).await.unwrap();
        assert_eq!(artifact.len, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), b"face bytes");
    }

    #[tokio::test]
    async fn test_inline_decode_error_and_empty() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("in.bin");

        let err = http_only()
            .acquire(&InputReference::Inline("%%%".into()), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::Decode(_)));

        let err = http_only()
            .acquire(&InputReference::Inline(String::new()), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::EmptyPayload));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_http_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/face.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFFu8; 2048]))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("source.download");
        let url = format!("{}/face.jpg", server.uri());
        let artifact = http_only()
            .acquire(&InputReference::Remote(url), &dest)
            .await
            .unwrap();
        assert_eq!(artifact.len, 2048);
    }

    #[tokio::test]
    async fn test_http_empty_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("x");
        let err = http_only()
            .acquire(&InputReference::Remote(server.uri()), &dest)
            .await
            .unwrap_err();

        match err {
            AcquisitionError::FetchFailed { failures, .. } => {
                assert_eq!(failures, vec!["http: empty file".to_string()]);
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fallback_after_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (fallback, calls) = fake("curl", Ok(vec![1u8; 300]));
        let acquirer = Acquirer::with_fetchers(vec![
            Box::new(HttpFetcher::new(Duration::from_secs(5), "t").unwrap()),
            fallback,
        ]);

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("x");
        let artifact = acquirer
            .acquire(&InputReference::Remote(server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(artifact.len, 300);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_partial_file_from_failed_fetcher_never_accepted() {
        let (broken, _) = fake("broken", Err("connection reset"));
        let (empty, _) = fake("empty", Ok(vec![]));
        let acquirer = Acquirer::with_fetchers(vec![broken, empty]);

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("x");
        let err = acquirer
            .acquire(&InputReference::Remote("https://unused.test/a.jpg".into()), &dest)
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("broken: connection reset"));
        assert!(msg.contains("empty: empty file"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let (first, first_calls) = fake("first", Ok(vec![9u8; 10]));
        let (second, second_calls) = fake("second", Ok(vec![8u8; 10]));
        let acquirer = Acquirer::with_fetchers(vec![first, second]);

        let tmp = TempDir::new().unwrap();
        acquirer
            .acquire(&InputReference::Remote("https://unused.test/".into()), &tmp.path().join("x"))
            .await
            .unwrap();

        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stage_names_by_url_then_sniff() {
        let (fetcher, _) = fake("f", Ok(b"\x89PNG\r\n\x1a\nrest".to_vec()));
        let acquirer = Acquirer::with_fetchers(vec![fetcher]);
        let tmp = TempDir::new().unwrap();

        let from_url = acquirer
            .stage(
                &InputReference::Remote("https://x.test/clip.mp4".into()),
                tmp.path(),
                "target",
            )
            .await
            .unwrap();
        assert_eq!(from_url.path, tmp.path().join("target.mp4"));

        let sniffed = acquirer
            .stage(&InputReference::Inline(encode(&[0xFF, 0xD8, 0xFF, 0xE0, 1, 2])), tmp.path(), "source")
            .await
            .unwrap();
        assert_eq!(sniffed.path, tmp.path().join("source.jpg"));
        assert!(!tmp.path().join("source.download").exists());
    }

    #[test]
    fn test_command_fetcher_renders_placeholders() {
        let fetcher = CommandFetcher::new(
            fusejob_config::default_fetchers().remove(0),
            Duration::from_secs(60),
        );
        let args = fetcher.render_args("https://x.test/a.jpg", Path::new("/tmp/a"));
        assert_eq!(
            args,
            vec!["-fsSL", "--max-time", "60", "-o", "/tmp/a", "https://x.test/a.jpg"]
        );
    }

    #[test]
    fn test_command_fetcher_does_not_rescan_url() {
        let fetcher = CommandFetcher::new(
            fusejob_config::default_fetchers().remove(0),
            Duration::from_secs(60),
        );
        let url = "https://x.test/{dest}/a.jpg?t={timeout}&q={other}";
        let args = fetcher.render_args(url, Path::new("/tmp/a"));
        assert_eq!(args[4], "/tmp/a");
        assert_eq!(args[5], url);
    }
}
