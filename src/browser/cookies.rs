//! Login cookies carried between sessions.
//!
//! Each session runs Chrome on a throwaway profile, so the login survives
//! only through this file: it is read into every new tab and written back
//! when the session closes.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::app::Result;

const SAME_SITE_VALUES: [&str; 3] = ["Strict", "Lax", "None"];

/// JSON file of cookies as reported by the browser.
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
}

impl CookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored cookies; a missing file is an empty jar.
    pub fn load(&self) -> Result<Vec<Value>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Vec<Value>>(&content) {
            Ok(cookies) => Ok(cookies),
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring unreadable cookie file: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Merge `cookies` over the stored ones and replace the file atomically.
    ///
    /// Cookies are keyed by name, domain and path; entries the session did
    /// not see are kept.
    pub fn save(&self, cookies: Vec<Value>) -> Result<usize> {
        let merged = merge(self.load()?, cookies);

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(&serde_json::to_vec_pretty(&merged)?)?;
        file.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), count = merged.len(), "Saved cookies");
        Ok(merged.len())
    }
}

fn key(cookie: &Value) -> Option<(String, String, String)> {
    let field = |name: &str| cookie.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
    let name = cookie.get("name")?.as_str()?.to_string();
    Some((name, field("domain"), field("path")))
}

fn merge(stored: Vec<Value>, fresh: Vec<Value>) -> Vec<Value> {
    let mut order = Vec::new();
    let mut by_key = HashMap::new();
    for cookie in stored.into_iter().chain(fresh) {
        let Some(k) = key(&cookie) else { continue };
        if !by_key.contains_key(&k) {
            order.push(k.clone());
        }
        by_key.insert(k, cookie);
    }
    order.into_iter().filter_map(|k| by_key.remove(&k)).collect()
}

/// Convert a stored cookie into a `Network.setCookies` entry.
///
/// Session cookies lose their sentinel expiry. Entries without a name or
/// value are dropped.
pub fn cookie_param(cookie: &Value) -> Option<CookieParam> {
    let name = cookie.get("name")?.as_str()?;
    let value = cookie.get("value")?.as_str()?;

    let mut param = Map::new();
    param.insert("name".into(), json!(name));
    param.insert("value".into(), json!(value));
    for field in ["domain", "path"] {
        if let Some(v) = cookie.get(field).and_then(Value::as_str) {
            param.insert(field.into(), json!(v));
        }
    }
    for field in ["secure", "httpOnly"] {
        if let Some(v) = cookie.get(field).and_then(Value::as_bool) {
            param.insert(field.into(), json!(v));
        }
    }
    if let Some(v) = cookie
        .get("sameSite")
        .and_then(Value::as_str)
        .filter(|v| SAME_SITE_VALUES.contains(v))
    {
        param.insert("sameSite".into(), json!(v));
    }

    let session = cookie.get("session").and_then(Value::as_bool).unwrap_or(false);
    if let Some(expires) = cookie.get("expires").and_then(Value::as_f64) {
        if !session && expires > 0.0 {
            param.insert("expires".into(), json!(expires));
        }
    }

    match serde_json::from_value(Value::Object(param)) {
        Ok(param) => Some(param),
        Err(e) => {
            warn!(name, "Skipping stored cookie: {}", e);
            None
        }
    }
}
