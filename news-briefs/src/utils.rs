/// Text cleaning for feed content
pub mod text {
    use lazy_static::lazy_static;
    use regex::Regex;
    use scraper::Html;

    // Feeds sometimes escape their HTML twice, so decoding can surface new tags.
    const MAX_DECODE_PASSES: usize = 3;

    lazy_static! {
        static ref TAG: Regex = Regex::new(r"<[A-Za-z/!?][^<>]*>").unwrap();
        static ref BLOCK_BREAK: Regex =
            Regex::new(r"(?i)<\s*(?:br|hr|/p|/div|/li|/h[1-6]|/tr|/blockquote)\b[^>]*>").unwrap();
        static ref SCRIPT_OR_STYLE: Regex =
            Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>").unwrap();
    }

    /// Strip markup, decode entities and collapse whitespace.
    ///
    /// The result never contains a markup tag.
    pub fn clean_html(input: &str) -> String {
        let mut text = input.to_string();

        for _ in 0..MAX_DECODE_PASSES {
            if !TAG.is_match(&text) && !text.contains('&') {
                break;
            }
            let without_scripts = SCRIPT_OR_STYLE.replace_all(&text, " ");
            let spaced = BLOCK_BREAK.replace_all(&without_scripts, " ");
            let fragment = Html::parse_fragment(&spaced);
            let decoded: String = fragment.root_element().text().collect();

            if decoded == text {
                break;
            }
            text = decoded;
        }

        // Anything still tag-shaped after the decode passes is dropped outright
        let text = TAG.replace_all(&text, " ");
        collapse_whitespace(&text)
    }

    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn contains_markup(text: &str) -> bool {
        TAG.is_match(text)
    }

    /// Cut to at most `max_chars` characters, ending in "..." when shortened.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let keep = max_chars.saturating_sub(3);
        let head: String = text.chars().take(keep).collect();
        format!("{}...", head.trim_end())
    }

    pub fn alphanumeric_count(text: &str) -> usize {
        text.chars().filter(|c| c.is_alphanumeric()).count()
    }
}

/// URL helpers
pub mod url {
    use url::Url;

    /// Host of the link without a leading "www.".
    pub fn extract_domain(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        let host = url.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }

    pub fn is_valid_feed_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }

    /// Canonical form used for id derivation: lower-cased scheme and host, no fragment.
    /// Unparsable links are only trimmed.
    pub fn normalize_link(link: &str) -> String {
        let trimmed = link.trim();
        match Url::parse(trimmed) {
            Ok(mut url) => {
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => trimmed.to_string(),
        }
    }
}

/// Timestamp parsing tolerant of what feed providers actually emit
pub mod time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

    const OFFSET_FORMATS: &[&str] = &[
        "%a, %d %b %Y %H:%M:%S %z",
        "%a, %d %b %Y %H:%M:%S %:z",
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%a, %d %b %Y %H:%M %z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S%z",
    ];

    // Interpreted as UTC
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%d %b %Y %H:%M:%S",
        "%d %B %Y %H:%M:%S",
        "%d %b %Y %H:%M",
        "%b %d, %Y %H:%M:%S",
        "%B %d, %Y %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %b %Y", "%d %B %Y", "%b %d, %Y", "%B %d, %Y", "%Y/%m/%d"];

    /// Parse RFC 2822, RFC 3339 / ISO 8601 and the common malformed variants.
    /// Returns `None` rather than erroring when nothing fits.
    ///
    /// `FeedParser` output is always RFC 3339 already; the fallbacks matter for
    /// clients that hand over date text as the feed wrote it.
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Some(dt) = parse_iso_zulu(raw) {
            return Some(dt);
        }

        // Unix seconds
        if raw.len() >= 9 && raw.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(secs) = raw.parse::<i64>() {
                return Utc.timestamp_opt(secs, 0).single();
            }
        }

        // Weekdays are frequently wrong or missing their comma; drop them
        let cleaned = strip_weekday(raw);
        let cleaned = cleaned.replace(" GMT", " +0000").replace(" UTC", " +0000").replace(" UT", " +0000");
        let cleaned = cleaned.trim();

        if let Ok(dt) = DateTime::parse_from_rfc2822(cleaned) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Some(dt) = parse_with_formats(cleaned) {
            return Some(dt);
        }

        // Unrecognised trailing zone abbreviation, e.g. "CEST": fall back to UTC
        if let Some((head, tail)) = cleaned.rsplit_once(' ') {
            if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_alphabetic()) {
                return parse_with_formats(head.trim());
            }
        }

        None
    }

    fn parse_iso_zulu(raw: &str) -> Option<DateTime<Utc>> {
        let stripped = raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z'))?;
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(stripped, fmt).ok())
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    fn parse_with_formats(raw: &str) -> Option<DateTime<Utc>> {
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
                return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
            }
        }
        None
    }

    fn strip_weekday(raw: &str) -> String {
        let mut parts = raw.splitn(2, |c: char| c == ',' || c.is_whitespace());
        let first = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();

        let lowered = first.to_lowercase();
        let is_weekday = lowered.len() >= 3
            && ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
                .iter()
                .any(|day| lowered.starts_with(day))
            && lowered.chars().all(|c| c.is_ascii_alphabetic());

        if is_weekday {
            rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace()).to_string()
        } else {
            raw.to_string()
        }
    }
}
