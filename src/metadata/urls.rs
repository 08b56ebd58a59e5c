use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://[^\s"<>]+"#).expect("Failed to compile URL regex")
});

/// Strip sentence punctuation that prose leaves glued to the end of a link.
///
/// A closing paren is only dropped when it is unbalanced, so links like
/// `https://en.wikipedia.org/wiki/Foo_(bar)` survive intact.
fn trim_trailing_punctuation(mut candidate: &str) -> &str {
    while let Some(last) = candidate.chars().last() {
        let trim = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' => true,
            ')' => candidate.matches('(').count() < candidate.matches(')').count(),
            _ => false,
        };
        if !trim {
            break;
        }
        candidate = &candidate[..candidate.len() - last.len_utf8()];
    }
    candidate
}

/// Returns the first well-formed http(s) URL in free text, or an empty string.
pub fn extract_first_url(text: &str) -> String {
    URL_REGEX
        .find_iter(text)
        .map(|m| trim_trailing_punctuation(m.as_str()))
        .find(|candidate| {
            Url::parse(candidate)
                .map(|url| url.host_str().is_some_and(|host| !host.is_empty()))
                .unwrap_or(false)
        })
        .map(str::to_string)
        .unwrap_or_default()
}

/// Resolve a possibly relative URL against the page it was found on.
///
/// Returns an empty string when the result is not a valid http(s) URL.
pub fn resolve_url(candidate: &str, base: &str) -> String {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return String::new();
    }

    let base = match Url::parse(base) {
        Ok(u) => u,
        Err(err) => {
            log::debug!("{base}: invalid base URL: {err}");
            return String::new();
        }
    };

    match base.join(candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url.to_string(),
        Ok(url) => {
            log::debug!("{candidate}: unsupported scheme {}", url.scheme());
            String::new()
        }
        Err(err) => {
            log::debug!("{candidate}: cannot resolve against {base}: {err}");
            String::new()
        }
    }
}

/// Lowercased extension of the last path segment (`/img/poster.PNG` -> `png`), or empty.
///
/// Only alphanumeric extensions are returned since the value ends up in a file name.
pub fn extension_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };

    let file_name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    match file_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => String::new(),
    }
}
