use lazy_static::lazy_static;
use regex::Regex;

/// Wraps an emphasized span on both sides.
pub const EMPHASIS_MARKER: &str = "**";

/// Stands in for a literal `*` from source text so it cannot read as a marker.
pub const LITERAL_ASTERISK: char = '\u{2217}';

lazy_static! {
    // Alternatives are tried in order, most specific first.
    static ref QUANTIFIABLE: Regex = Regex::new(concat!(
        r"(?i)",
        // currency, optionally with a magnitude
        r"(?:[$€£¥]\s?\d+(?:,\d{3})*(?:\.\d+)?(?:\s?(?:thousand|million|billion|trillion|bn|[kmbt])\b)?)",
        // audience metrics
        r"|(?:\d+(?:,\d{3})*(?:\.\d+)?\+?\s(?:users|downloads|installs|followers|views|subscribers|customers|employees)\b)",
        // percentages
        r"|(?:\d+(?:,\d{3})*(?:\.\d+)?\s?(?:%|percent\b))",
        // magnitudes
        r"|(?:\d+(?:,\d{3})*(?:\.\d+)?\s?(?:thousand|million|billion|trillion)\b)",
        // multipliers
        r"|(?:\d+(?:\.\d+)?x\b)",
        // plain numbers
        r"|(?:\d+(?:,\d{3})*(?:\.\d+)?)",
    ))
    .unwrap();

    // `**span**` used as emphasis: opens after a non-word character, closes before one
    static ref WRAPPED_EMPHASIS: Regex =
        Regex::new(r"(^|[^\w*])\*\*([^*\s](?:[^*]*[^*\s])?)\*\*($|[^\w*])").unwrap();
}

// Adjacent wrapped spans share a boundary character, so one pass can miss every other one
const MAX_UNWRAP_PASSES: usize = 4;

/// Marks quantifiable data (numbers, money, percentages, magnitudes) in
/// summary text with `**`.
///
/// Every character of the input is preserved. Any existing marker is removed
/// before marking, so `enhance(enhance(x)) == enhance(x)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentEnhancer;

impl ContentEnhancer {
    pub fn new() -> Self {
        Self
    }

    pub fn enhance(&self, text: &str) -> String {
        let plain = strip_markers(text);
        let mut out = String::with_capacity(plain.len() + 16);
        let mut last = 0;

        for m in QUANTIFIABLE.find_iter(&plain) {
            if !is_standalone(&plain, m.start(), m.end()) {
                continue;
            }
            out.push_str(&plain[last..m.start()]);
            out.push_str(EMPHASIS_MARKER);
            out.push_str(m.as_str());
            out.push_str(EMPHASIS_MARKER);
            last = m.end();
        }
        out.push_str(&plain[last..]);
        out
    }

    /// The spans currently marked in `text`.
    pub fn emphasized<'t>(&self, text: &'t str) -> Vec<&'t str> {
        text.split(EMPHASIS_MARKER)
            .enumerate()
            .filter(|(i, span)| i % 2 == 1 && !span.is_empty())
            .map(|(_, span)| span)
            .collect()
    }
}

/// Remove emphasis markers. A run of `n` asterisks keeps `n % 2` of them.
pub fn strip_markers(text: &str) -> String {
    text.replace(EMPHASIS_MARKER, "")
}

/// Prepare source text for enhancement: emphasis wrapped around a span is
/// unwrapped, and any other `*` becomes `LITERAL_ASTERISK`.
///
/// "2**10" stays readable as "2∗∗10" instead of collapsing into "210". The
/// result contains no `*`, so every marker after enhancement is ours.
pub fn neutralize_markers(text: &str) -> String {
    let mut text = text.to_string();
    for _ in 0..MAX_UNWRAP_PASSES {
        if !text.contains(EMPHASIS_MARKER) {
            break;
        }
        let unwrapped = WRAPPED_EMPHASIS.replace_all(&text, "${1}${2}${3}").into_owned();
        if unwrapped == text {
            break;
        }
        text = unwrapped;
    }
    text.replace('*', &LITERAL_ASTERISK.to_string())
}

// Skip digits glued to words ("GPT-5", "A380", "5G") or to a literal asterisk ("2∗∗10").
fn is_standalone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();

    let glued_before = matches!(before, Some(c) if c.is_alphanumeric() || c == '_' || c == '-' || c == '/');
    let glued_after = matches!(after, Some(c) if c.is_alphabetic() || c == '_');
    let next_to_literal = before == Some(LITERAL_ASTERISK) || after == Some(LITERAL_ASTERISK);

    let starts_with_digit = text[start..].starts_with(|c: char| c.is_ascii_digit());
    !(starts_with_digit && glued_before) && !glued_after && !next_to_literal
}
