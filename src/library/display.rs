use std::path::Path;
use std::time::Duration;

/// Format a duration as `m:ss` (minutes unpadded, seconds truncated).
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Title for a local file when its tags carry none: the file name without extension.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("UNKNOWN")
        .to_string()
}

/// Title for a remote stream: "Stream" plus a name for where it comes from.
///
/// A last path segment that looks like a file (`live.mp3`) names the stream;
/// otherwise the host does, since mount points like `/live` or `/stream` say
/// nothing. The URL is not validated; anything without a scheme is taken as a
/// bare path.
pub fn title_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let (host, path) = match without_query.split_once("://") {
        Some((_, rest)) => {
            let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
            (host_of(authority), path)
        }
        None => (None, without_query),
    };
    let segment = path.rsplit('/').find(|seg| !seg.trim().is_empty());

    let name = match (segment, host) {
        (Some(seg), _) if has_extension(seg) => Some(seg),
        (_, Some(host)) => Some(host),
        (seg, None) => seg,
    };
    match name {
        Some(name) => format!("Stream: {name}"),
        None => "Stream".to_string(),
    }
}

/// `user@host:port` -> `host`; bracketed IPv6 hosts keep their brackets.
fn host_of(authority: &str) -> Option<&str> {
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = match host.strip_prefix('[') {
        Some(v6) => v6.split_once(']').map_or(host, |(addr, _)| &host[..addr.len() + 2]),
        None => host.split_once(':').map_or(host, |(h, _)| h),
    };
    (!host.trim().is_empty()).then_some(host)
}

fn has_extension(segment: &str) -> bool {
    Path::new(segment)
        .extension()
        .is_some_and(|ext| !ext.is_empty())
}
