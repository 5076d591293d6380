use once_cell::sync::Lazy;
use regex::Regex;

// The three notations seen in the yearly exports, tried in order. All are
// anchored at the start so a trailing weekday suffix ("2025年1月2日（日）")
// still matches.
static KANJI_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})年(\d+)月(?:(\d+)日)?").unwrap());
static SLASH_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})/(\d+)/(\d+)").unwrap());
static HYPHEN_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d+)-(\d+)").unwrap());

/// Outcome of normalizing a single cell. Three-way so call sites can tell
/// "no value" apart from "value we didn't recognize".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Input was null or empty after trimming.
    Missing,
    /// Input matched a known notation; `YYYY-MM-DD` with zero-padded
    /// month and day.
    Iso(String),
    /// No notation matched; the (trimmed) original text, kept verbatim.
    Verbatim(String),
}

impl Normalized {
    /// The cell value to carry forward: `None` for missing, text otherwise.
    pub fn into_cell(self) -> Option<String> {
        match self {
            Normalized::Missing => None,
            Normalized::Iso(s) | Normalized::Verbatim(s) => Some(s),
        }
    }
}

/// Normalize one scalar into ISO-8601 if it matches a known notation.
///
/// `2025年1月2日` → `2025-01-02`, `2025年1月` → `2025-01-01` (day defaults
/// to 01), `2025/1/2` and `2025-1-2` → `2025-01-02`. The rewrite is purely
/// textual: a month of 13 survives here and is rejected later by date
/// coercion.
pub fn normalize(raw: Option<&str>) -> Normalized {
    let s = match raw {
        Some(s) => s.trim(),
        None => return Normalized::Missing,
    };
    if s.is_empty() {
        return Normalized::Missing;
    }

    for re in [&*KANJI_DATE, &*SLASH_DATE, &*HYPHEN_DATE] {
        if let Some(caps) = re.captures(s) {
            if let Some(iso) = captures_to_iso(&caps) {
                return Normalized::Iso(iso);
            }
        }
    }

    Normalized::Verbatim(s.to_string())
}

/// Whether `s` starts with any notation `normalize` can convert. Used by
/// column classification so detection agrees with what conversion does.
pub fn looks_like_date(s: &str) -> bool {
    let s = s.trim();
    KANJI_DATE.is_match(s) || SLASH_DATE.is_match(s) || HYPHEN_DATE.is_match(s)
}

fn captures_to_iso(caps: &regex::Captures) -> Option<String> {
    let year: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = match caps.get(3) {
        Some(d) => d.as_str().parse().ok()?,
        None => 1,
    };
    Some(format!("{:04}-{:02}-{:02}", year, month, day))
}
