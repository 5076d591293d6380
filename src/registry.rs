// src/registry.rs
//! Static reference data: municipality codes and election-category labels.
//! Loaded once at startup and immutable afterwards.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

const MUNICIPALITIES_JSON: &str = r#"{
    "oosk": "大阪市",
    "ski": "堺市",
    "tynk": "豊中市",
    "suita": "吹田市",
    "tktk": "高槻市",
    "hrkt": "枚方市",
    "yo": "八尾市",
    "nygw": "寝屋川市",
    "hoska": "東大阪市",
    "kswd": "岸和田市"
}"#;

static MUNICIPALITIES: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    serde_json::from_str(MUNICIPALITIES_JSON).expect("embedded municipality table is valid JSON")
});

/// Display name for a municipality code, if known.
pub fn municipality_name(code: &str) -> Option<&'static str> {
    MUNICIPALITIES.get(code).map(String::as_str)
}

/// All known municipalities, code → display name, in code order.
pub fn municipalities() -> &'static BTreeMap<String, String> {
    &MUNICIPALITIES
}

/// Label for an election-category code: `a` is the mayoral race, `b` the
/// assembly one.
pub fn category_label(category: char) -> Option<&'static str> {
    match category {
        'a' => Some("首長選挙"),
        'b' => Some("議員選挙"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(municipality_name("oosk"), Some("大阪市"));
        assert_eq!(municipality_name("hoska"), Some("東大阪市"));
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(municipality_name("kyoto"), None);
    }

    #[test]
    fn category_labels() {
        assert_eq!(category_label('a'), Some("首長選挙"));
        assert_eq!(category_label('b'), Some("議員選挙"));
        assert_eq!(category_label('z'), None);
    }

    #[test]
    fn table_holds_all_ten_municipalities() {
        assert_eq!(municipalities().len(), 10);
    }
}
