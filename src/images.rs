use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::app::{Result, RednoteError};

const USER_AGENT: &str = concat!("rednote/", env!("CARGO_PKG_VERSION"));
const KNOWN_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Turns publish image entries into local files.
///
/// `http://` and `https://` entries are downloaded into a cache directory;
/// anything else must be an existing local path and is passed through.
pub struct ImageResolver {
    client: Client,
    cache_dir: PathBuf,
}

impl ImageResolver {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            cache_dir: cache_dir.into(),
        })
    }

    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("rednote")
            .join("images")
    }

    /// Resolve every entry, preserving order.
    pub async fn resolve(&self, images: &[String]) -> Result<Vec<PathBuf>> {
        if images.is_empty() {
            return Err(RednoteError::Validation("at least one image is required".into()));
        }

        let mut paths = Vec::with_capacity(images.len());
        for entry in images {
            let entry = entry.trim();
            let path = if is_remote(entry) {
                self.download(entry).await?
            } else {
                local_path(entry)?
            };
            paths.push(path);
        }
        Ok(paths)
    }

    async fn download(&self, url: &str) -> Result<PathBuf> {
        let parsed = Url::parse(url)?;
        if let Some(ext) = extension_from_url(&parsed) {
            let cached = self.cache_dir.join(cache_file_name(url, ext));
            if cached.exists() {
                debug!(url, path = %cached.display(), "Image already cached");
                return Ok(cached);
            }
        }

        let response = self.client.get(parsed.clone()).send().await?;
        response.error_for_status_ref()?;

        let ext = extension_from_url(&parsed)
            .or_else(|| {
                response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(extension_from_content_type)
            })
            .unwrap_or("jpg");
        let body = response.bytes().await?;

        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let path = self.cache_dir.join(cache_file_name(url, ext));
        tokio::fs::write(&path, &body).await?;

        info!(url, path = %path.display(), bytes = body.len(), "Downloaded image");
        Ok(path)
    }
}

pub fn is_remote(entry: &str) -> bool {
    entry.starts_with("http://") || entry.starts_with("https://")
}

fn local_path(entry: &str) -> Result<PathBuf> {
    let path = Path::new(entry);
    if !path.is_file() {
        return Err(RednoteError::Validation(format!(
            "image file not found: {}",
            entry
        )));
    }
    Ok(path.to_path_buf())
}

/// Stable cache file name for `url`.
pub fn cache_file_name(url: &str, ext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{}.{}", hex::encode(hasher.finalize()), ext)
}

fn extension_from_url(url: &Url) -> Option<&'static str> {
    let last = url.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    KNOWN_EXTENSIONS.iter().copied().find(|known| *known == ext)
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim();
    match mime {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_local_paths_pass_through_in_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let resolver = ImageResolver::new(dir.path().join("cache")).unwrap();
        let entries = vec![
            b.to_string_lossy().into_owned(),
            a.to_string_lossy().into_owned(),
        ];

        let paths = assert_ok!(resolver.resolve(&entries).await);
        assert_eq!(paths, vec![b, a]);
    }

    #[tokio::test]
    async fn test_missing_local_file_is_validation_error() {
        let dir = tempdir().unwrap();
        let resolver = ImageResolver::new(dir.path()).unwrap();
        let missing = dir.path().join("missing.jpg").to_string_lossy().into_owned();

        let err = assert_err!(resolver.resolve(&[missing]).await);
        assert!(matches!(err, RednoteError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_list_is_validation_error() {
        let resolver = ImageResolver::new(std::env::temp_dir()).unwrap();
        assert!(matches!(
            resolver.resolve(&[]).await,
            Err(RednoteError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_cached_download_is_reused() {
        let dir = tempdir().unwrap();
        let url = "https://img.example.test/photos/cup.PNG?x=1";
        let cached = dir.path().join(cache_file_name(url, "png"));
        std::fs::write(&cached, b"png").unwrap();

        let resolver = ImageResolver::new(dir.path()).unwrap();
        let paths = resolver.resolve(&[url.to_string()]).await.unwrap();
        assert_eq!(paths, vec![cached]);
    }

    #[test]
    fn test_cache_file_name_is_stable_hex() {
        let a = cache_file_name("https://x/1.jpg", "jpg");
        assert_eq!(a, cache_file_name("https://x/1.jpg", "jpg"));
        assert_ne!(a, cache_file_name("https://x/2.jpg", "jpg"));
        assert_eq!(a.len(), 64 + ".jpg".len());
    }

    #[test]
    fn test_extension_detection() {
        let url = Url::parse("https://x/a/b.WebP").unwrap();
        assert_eq!(extension_from_url(&url), Some("webp"));
        let url = Url::parse("https://x/a/b").unwrap();
        assert_eq!(extension_from_url(&url), None);

        assert_eq!(extension_from_content_type("image/png; charset=binary"), Some("png"));
        assert_eq!(extension_from_content_type("text/html"), None);
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://x/y.jpg"));
        assert!(is_remote("http://x/y.jpg"));
        assert!(!is_remote("/home/me/y.jpg"));
        assert!(!is_remote("ftp://x/y.jpg"));
    }
}
