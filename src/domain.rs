use url::Url;

pub fn has_valid_tld(domain: &str) -> bool {
    if domain.is_empty() || domain.len() < 3 || !domain.contains('.') {
        return false;
    }

    if let Some(last_dot) = domain.rfind('.') {
        if last_dot == domain.len() - 1 {
            return false;
        }
        let tld = &domain[last_dot + 1..];
        tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_lowercase())
    } else {
        false
    }
}

/// Cleans up a domain title scraped from a page: surrounding whitespace, a
/// scheme or path if the page showed a URL, and letter case.
///
/// Text that isn't a host at all is returned trimmed and untouched.
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    match Url::parse(&candidate) {
        Ok(url) => match url.host_str() {
            Some(host) => host.trim_start_matches("www.").to_string(),
            None => trimmed.to_string(),
        },
        Err(_) => trimmed.to_string(),
    }
}
