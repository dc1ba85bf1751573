// src/domain/link/normalizer.rs
//
// URL Normalizer
//
// RULES:
// - Pure and deterministic: same input string, same output
// - String-level only: no network access, redirects are resolved from known aliases
// - Never fails: unparseable input still yields a best-effort canonical string

use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::Url;

use super::platform::Platform;
use crate::domain::post::PostId;

/// Query parameters that never change the addressed content
const TRACKING_PARAMS: &[&str] = &[
    "igsh",
    "igshid",
    "mibextid",
    "img_index",
    "fbclid",
    "gclid",
    "dclid",
    "msclkid",
    "si",
    "ref",
    "ref_src",
    "rcm",
    "trk",
    "trackingid",
    "lipi",
    "__cft__",
    "__tn__",
    "mc_cid",
    "mc_eid",
    "xmt",
];

/// Short or legacy hosts that serve the same content as a canonical host
const HOST_ALIASES: &[(&str, &str)] = &[
    ("instagr.am", "instagram.com"),
    ("fb.com", "facebook.com"),
    ("threads.com", "threads.net"),
];

/// Sub-domain prefixes dropped when the rest of the host is a known platform
const PLATFORM_HOST_PREFIXES: &[&str] = &["m.", "mobile.", "web.", "l."];

/// Canonical form of a URL plus the platform inferred from it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedUrl {
    pub value: String,
    pub platform: Platform,
}

impl NormalizedUrl {
    /// Identity of any post addressed by this URL
    pub fn post_id(&self) -> PostId {
        PostId::from_normalized(&self.value)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Canonicalize a raw URL into `(normalized_url, platform)`.
pub fn normalize(raw: &str) -> NormalizedUrl {
    let trimmed = raw.trim();

    let parsed = Url::parse(trimmed).ok().or_else(|| {
        if trimmed.contains("://") {
            None
        } else {
            Url::parse(&format!("https://{}", trimmed)).ok()
        }
    });

    match parsed {
        Some(url) if url.host_str().is_some() => normalize_parsed(url),
        _ => normalize_opaque(trimmed),
    }
}

fn normalize_parsed(url: Url) -> NormalizedUrl {
    // `Url` already lower-cases scheme and host and drops default ports.
    let host = canonical_host(url.host_str().unwrap_or_default());
    let platform = Platform::from_host(&host);

    let scheme = if platform.is_known() && url.scheme() == "http" {
        "https"
    } else {
        url.scheme()
    };

    let mut value = format!("{}://{}", scheme, host);
    if let Some(port) = url.port() {
        value.push_str(&format!(":{}", port));
    }

    let path = canonical_path(url.path(), platform);
    value.push_str(path.trim_end_matches('/'));

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !pairs.is_empty() {
        pairs.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        value.push('?');
        value.push_str(&query);
    }

    NormalizedUrl { value, platform }
}

/// Fallback for strings `Url` cannot parse: strip fragment and trailing slashes,
/// lower-case everything up to the first path separator.
fn normalize_opaque(raw: &str) -> NormalizedUrl {
    let without_fragment = raw.split('#').next().unwrap_or_default();
    let trimmed = without_fragment.trim_end_matches('/');

    let (prefix, rest) = match trimmed.find("://") {
        Some(idx) => {
            let after_scheme = idx + 3;
            match trimmed[after_scheme..].find('/') {
                Some(slash) => trimmed.split_at(after_scheme + slash),
                None => (trimmed, ""),
            }
        }
        None => (trimmed, ""),
    };

    let value = format!("{}{}", prefix.to_lowercase(), rest);
    let host = prefix
        .split("://")
        .nth(1)
        .unwrap_or(prefix)
        .to_lowercase();

    NormalizedUrl {
        platform: Platform::from_host(&canonical_host(&host)),
        value,
    }
}

fn canonical_host(host: &str) -> String {
    let mut host = host.trim_end_matches('.').to_lowercase();

    if let Some(stripped) = host.strip_prefix("www.") {
        host = stripped.to_string();
    }

    for prefix in PLATFORM_HOST_PREFIXES {
        if let Some(stripped) = host.strip_prefix(prefix) {
            if Platform::from_host(stripped).is_known() {
                host = stripped.to_string();
                break;
            }
        }
    }

    for (alias, canonical) in HOST_ALIASES {
        if host == *alias {
            return canonical.to_string();
        }
    }

    host
}

/// Platform-specific path aliases that address the same post.
fn canonical_path(path: &str, platform: Platform) -> String {
    if platform != Platform::Instagram {
        return path.to_string();
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        // /reels/<code> is the plural form of /reel/<code>
        ["reels", code, ..] => format!("/reel/{}", code),
        // /<username>/p/<code> and /<username>/reel/<code> are share links of /p/<code>
        [_, kind @ ("p" | "reel"), code, ..] => format!("/{}/{}", kind, code),
        _ => path.to_string(),
    }
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tracking_and_trailing_slash() {
        let n = normalize("https://instagram.com/p/ABC123/?utm_source=ig");
        assert_eq!(n.value, "https://instagram.com/p/ABC123");
        assert_eq!(n.platform, Platform::Instagram);
    }

    #[test]
    fn test_same_identity_for_tracking_variants() {
        let a = normalize("https://www.instagram.com/reel/ABC123/?igsh=xyz");
        let b = normalize("https://instagram.com/reel/ABC123");
        let c = normalize("HTTP://WWW.INSTAGRAM.COM/reel/ABC123/#comments");
        assert_eq!(a.post_id(), b.post_id());
        assert_eq!(b.post_id(), c.post_id());
    }

    #[test]
    fn test_query_order_does_not_change_identity() {
        let a = normalize("https://example.com/watch?b=2&a=1&utm_medium=x");
        let b = normalize("https://example.com/watch?utm_campaign=y&a=1&b=2");
        assert_eq!(a.value, "https://example.com/watch?a=1&b=2");
        assert_eq!(a.post_id(), b.post_id());
    }

    #[test]
    fn test_meaningful_query_is_kept() {
        let n = normalize("https://www.facebook.com/watch/?v=123456&mibextid=abc");
        assert_eq!(n.value, "https://facebook.com/watch?v=123456");
        assert_eq!(n.platform, Platform::Facebook);
    }

    #[test]
    fn test_path_case_is_preserved() {
        let n = normalize("https://Instagram.com/p/AbC_-9/");
        assert_eq!(n.value, "https://instagram.com/p/AbC_-9");
    }

    #[test]
    fn test_short_host_aliases() {
        assert_eq!(
            normalize("http://instagr.am/p/XYZ").value,
            "https://instagram.com/p/XYZ"
        );
        assert_eq!(
            normalize("https://m.facebook.com/reel/42").value,
            "https://facebook.com/reel/42"
        );
        assert_eq!(
            normalize("https://www.threads.com/@someone/post/C1").platform,
            Platform::Threads
        );
    }

    #[test]
    fn test_instagram_share_paths_collapse() {
        let plain = normalize("https://instagram.com/p/CODE1");
        let shared = normalize("https://www.instagram.com/some.user/p/CODE1/?img_index=2");
        assert_eq!(plain.value, shared.value);

        let reels = normalize("https://instagram.com/reels/CODE2/");
        assert_eq!(reels.value, "https://instagram.com/reel/CODE2");
    }

    #[test]
    fn test_unknown_host_is_not_rejected() {
        let n = normalize("https://www.youtube.com/watch?v=ABC123");
        assert_eq!(n.platform, Platform::Unknown);
        assert_eq!(n.value, "https://youtube.com/watch?v=ABC123");
    }

    #[test]
    fn test_unknown_host_keeps_scheme_and_mobile_prefix() {
        let n = normalize("http://m.example.org/a/");
        assert_eq!(n.value, "http://m.example.org/a");
    }

    #[test]
    fn test_garbage_input_is_deterministic() {
        let a = normalize("not a url at all#frag");
        let b = normalize("not a url at all#frag");
        assert_eq!(a, b);
        assert_eq!(a.platform, Platform::Unknown);
    }

    #[test]
    fn test_linkedin_and_threads() {
        let li = normalize("https://www.linkedin.com/posts/someone_activity-123-abcd?trk=public");
        assert_eq!(li.platform, Platform::Linkedin);
        assert_eq!(li.value, "https://linkedin.com/posts/someone_activity-123-abcd");

        let th = normalize("https://www.threads.net/@user.name/post/C9xYz");
        assert_eq!(th.platform, Platform::Threads);
    }
}
