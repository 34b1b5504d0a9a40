use std::collections::BTreeMap;
use std::path::Path;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::ProbeError;
use crate::utils::read_lines;

/// Parses raw header flags into a header map.
///
/// Each flag is either a path to a file of `Name: Value` lines, a
/// comma-separated list of such tokens, or a single token. Tokens without a
/// colon, or with a name/value that cannot be sent, are dropped.
pub fn parse_headers(raw: &[String]) -> Result<HeaderMap, ProbeError> {
    let mut headers = HeaderMap::new();

    for flag in raw {
        let path = Path::new(flag);
        if path.is_file() {
            let lines = read_lines(path).map_err(|source| ProbeError::HeaderFileUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
            for line in &lines {
                add_header(&mut headers, line);
            }
            continue;
        }

        if flag.contains(',') {
            for part in flag.split(',') {
                add_header(&mut headers, part.trim());
            }
            continue;
        }

        add_header(&mut headers, flag);
    }

    Ok(headers)
}

fn add_header(headers: &mut HeaderMap, token: &str) {
    let Some((name, value)) = token.split_once(':') else {
        return;
    };
    if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(name.trim().as_bytes()),
        HeaderValue::from_str(value.trim()),
    ) {
        headers.append(name, value);
    }
}

/// Parses a cookie string (`a=1; b=2`) or a file of `name=value` lines.
pub fn parse_cookies(raw: Option<&str>) -> Result<BTreeMap<String, String>, ProbeError> {
    let mut cookies = BTreeMap::new();

    let raw = match raw.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(cookies),
    };

    let path = Path::new(raw);
    if path.is_file() {
        let lines = read_lines(path).map_err(|source| ProbeError::CookieFileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        for line in &lines {
            add_cookie(&mut cookies, line);
        }
        return Ok(cookies);
    }

    for pair in raw.split(';') {
        add_cookie(&mut cookies, pair.trim());
    }

    Ok(cookies)
}

fn add_cookie(cookies: &mut BTreeMap<String, String>, pair: &str) {
    let Some((name, value)) = pair.split_once('=') else {
        return;
    };
    let name = name.trim();
    if name.is_empty() {
        return;
    }
    cookies.insert(name.to_string(), value.trim().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn values(headers: &HeaderMap, name: &str) -> Vec<String> {
        headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_single_header() {
        let headers = parse_headers(&["User-Agent: TestAgent".to_string()]).unwrap();
        assert_eq!(values(&headers, "user-agent"), vec!["TestAgent"]);
    }

    #[test]
    fn test_multiple_and_comma_separated_headers() {
        let headers = parse_headers(&[
            "User-Agent: TestAgent, Accept: application/json".to_string(),
            "X-Trace: 1".to_string(),
        ])
        .unwrap();
        assert_eq!(values(&headers, "user-agent"), vec!["TestAgent"]);
        assert_eq!(values(&headers, "accept"), vec!["application/json"]);
        assert_eq!(values(&headers, "x-trace"), vec!["1"]);
    }

    #[test]
    fn test_repeated_header_keeps_every_value() {
        let headers = parse_headers(&["X-Forwarded-For: 127.0.0.1".to_string(), "X-Forwarded-For: 10.0.0.1".to_string()]).unwrap();
        assert_eq!(values(&headers, "x-forwarded-for"), vec!["127.0.0.1", "10.0.0.1"]);
    }

    #[test]
    fn test_malformed_header_is_dropped() {
        let headers = parse_headers(&["Invalid-Header".to_string(), "Bad Name: x".to_string()]).unwrap();
        assert!(headers.is_empty());
        assert!(parse_headers(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_headers_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "User-Agent: TestAgent\nAccept: application/json\n# This is a comment\nContent-Type: text/plain"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let headers = parse_headers(&[path]).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(values(&headers, "content-type"), vec!["text/plain"]);
    }

    #[test]
    fn test_cookie_string() {
        let cookies = parse_cookies(Some("name = value ; token = abc123")).unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["name"], "value");
        assert_eq!(cookies["token"], "abc123");
    }

    #[test]
    fn test_empty_and_malformed_cookies() {
        assert!(parse_cookies(None).unwrap().is_empty());
        assert!(parse_cookies(Some("")).unwrap().is_empty());
        assert!(parse_cookies(Some("invalid-cookie")).unwrap().is_empty());
        assert!(parse_cookies(Some("=orphan")).unwrap().is_empty());
    }

    #[test]
    fn test_cookies_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "name=value\ntoken=abc123\n# This is a comment\nsession=xyz789").unwrap();

        let cookies = parse_cookies(file.path().to_str()).unwrap();
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies["session"], "xyz789");
    }
}
