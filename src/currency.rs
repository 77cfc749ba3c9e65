use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Three-letter uppercase currency code, such as `EUR`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// The pivot currency every provider rate is quoted against.
    pub const USD: CurrencyCode = CurrencyCode(*b"USD");
}

impl FromStr for CurrencyCode {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match <[u8; 3]>::try_from(trimmed.as_bytes()) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_alphabetic) => {
                Ok(CurrencyCode(bytes.map(|b| b.to_ascii_uppercase())))
            }
            _ => Err(format!("'{trimmed}' is not a three-letter currency code")),
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|&b| f.write_char(b as char))
    }
}

/// Set of currency codes accepted for conversion. Loaded once per run.
#[derive(Debug, Default, Clone)]
pub struct CurrencyRegistry {
    codes: BTreeSet<CurrencyCode>,
}

#[derive(Deserialize)]
struct CodeEntry {
    code: String,
}

impl CurrencyRegistry {
    pub fn new(codes: impl IntoIterator<Item = CurrencyCode>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    /// Load the code list at `path`: a JSON array of `{"code": ...}` objects if the extension is
    /// `.json`, otherwise an HTML table.
    ///
    /// A missing or malformed list yields an empty registry, which rejects every code.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "currency list unreadable, registry is empty");
                return Self::default();
            }
        };

        let registry = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "currency list malformed, registry is empty");
                Self::default()
            })
        } else {
            Self::from_html(&text)
        };

        info!(path = %path.display(), count = registry.len(), "currency registry loaded");
        registry
    }

    /// Entries whose `code` is not a valid currency code are skipped.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<CodeEntry> = serde_json::from_str(text)?;
        Ok(Self::new(
            entries.iter().filter_map(|entry| entry.code.parse().ok()),
        ))
    }

    /// Every `<td>` cell whose text is three letters counts as a code.
    pub fn from_html(text: &str) -> Self {
        let mut codes = BTreeSet::new();
        let mut rest = text;
        while let Some(open) = find_ascii_ci(rest, "<td") {
            let after_tag = &rest[open..];
            let Some(tag_end) = after_tag.find('>') else {
                break;
            };
            let cell = &after_tag[tag_end + 1..];
            let cell_end = find_ascii_ci(cell, "</td").unwrap_or(cell.len());
            if let Ok(code) = strip_tags(&cell[..cell_end]).parse() {
                codes.insert(code);
            }
            rest = &cell[cell_end..];
        }
        debug!(count = codes.len(), "parsed currency codes from HTML");
        Self { codes }
    }

    /// Whether `code` (any case) is a known currency. Malformed input is simply not valid.
    pub fn is_valid(&self, code: &str) -> bool {
        code.parse::<CurrencyCode>()
            .is_ok_and(|code| self.codes.contains(&code))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Text content of an HTML fragment, with any nested tags dropped.
fn strip_tags(fragment: &str) -> String {
    let mut text = String::new();
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    #[test]
    fn parse_currency_codes() {
        assert_eq!(code("eur"), code("EUR"));
        assert_eq!(code(" gbp\n").to_string(), "GBP");
        assert_eq!(code("usd"), CurrencyCode::USD);

        assert!("EU".parse::<CurrencyCode>().is_err());
        assert!("EURO".parse::<CurrencyCode>().is_err());
        assert!("E1R".parse::<CurrencyCode>().is_err());
        assert!("€UR".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn validation_ignores_case() {
        let registry = CurrencyRegistry::new([code("EUR"), code("USD")]);
        assert!(registry.is_valid("EUR"));
        assert!(registry.is_valid("eur"));
        assert!(registry.is_valid("Usd"));
        assert!(!registry.is_valid("GBP"));
        assert!(!registry.is_valid("not a code"));
    }

    #[test]
    fn empty_registry_rejects_everything() {
        let registry = CurrencyRegistry::default();
        assert!(!registry.is_valid("USD"));
        assert!(!registry.is_valid("EUR"));
    }

    #[test]
    fn codes_from_json() {
        let registry = CurrencyRegistry::from_json(
            r#"[{"code": "EUR", "name": "Euro"}, {"code": "jpy"}, {"code": "bogus"}]"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.is_valid("JPY"));
        assert!(CurrencyRegistry::from_json(r#"{"code": "EUR"}"#).is_err());
    }

    #[test]
    fn codes_from_html_table() {
        let html = r#"
            <table>
              <tr><th>Code</th><th>Name</th></tr>
              <tr><td>AED</td><td>United Arab Emirates Dirham</td></tr>
              <TD class="code"> <b>chf</b> </TD><td>Swiss Franc</td>
              <tr><td>1234</td><td>ABC1</td></tr>
            </table>"#;
        let registry = CurrencyRegistry::from_html(html);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_valid("AED"));
        assert!(registry.is_valid("CHF"));
    }

    #[test]
    fn bundled_currency_list() {
        let registry = CurrencyRegistry::load(Path::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/currencies.json"
        )));
        assert!(registry.is_valid("USD"));
        assert!(registry.is_valid("eur"));
        assert!(registry.is_valid("GBP"));
    }

    #[test]
    fn load_fails_closed() {
        let dir = tempfile::tempdir().unwrap();

        let missing = CurrencyRegistry::load(&dir.path().join("missing.json"));
        assert!(missing.is_empty());

        let bad_path = dir.path().join("bad.json");
        std::fs::write(&bad_path, "not json").unwrap();
        assert!(CurrencyRegistry::load(&bad_path).is_empty());

        let good_path = dir.path().join("codes.json");
        let mut file = std::fs::File::create(&good_path).unwrap();
        write!(file, r#"[{{"code": "USD"}}, {{"code": "EUR"}}]"#).unwrap();
        let registry = CurrencyRegistry::load(&good_path);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_valid("eur"));
    }
}
