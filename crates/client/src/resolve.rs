//! Resource URL ⇄ id resolution.
//!
//! Upstream payloads reference other entities by URL. Two shapes occur:
//!
//! - canonical, with a trailing slash: `https://www.swapi.tech/api/people/42/`
//! - reference form, without one: `https://www.swapi.tech/api/films/3` or `/films/3`
//!
//! Both resolve to the trailing numeric segment. A query string or fragment
//! after that segment is ignored.

use std::sync::LazyLock;

use holonet_core::ResourceKind;
use regex::Regex;
use url::Url;

static TRAILING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)/?(?:[?#].*)?$").expect("static pattern is valid"));

static COLLECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(people|films)/\d+/?(?:[?#].*)?$").expect("static pattern is valid"));

/// Extract the numeric id from a resource URL.
///
/// Returns `None` if the URL does not end in a numeric path segment; callers
/// drop such references instead of failing.
pub fn id_from_url(url: &str) -> Option<u64> {
    TRAILING_ID.captures(url.trim()).and_then(|caps| caps[1].parse().ok())
}

/// Infer which collection a resource URL points into.
pub fn kind_from_url(url: &str) -> Option<ResourceKind> {
    COLLECTION
        .captures(url.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// Canonical URL of a resource: `{base}{segment}/{id}/`.
///
/// `base` is expected to end with `/`, as returned by `AppConfig::base_url`.
pub fn canonical_url(base: &Url, kind: ResourceKind, id: u64) -> Url {
    let mut url = base.clone();
    let path = format!("{}{}/{}/", base.path(), kind.segment(), id);
    url.set_path(&path);
    url
}
