//! Text helpers for API output and contact input
//!
//! Catalog descriptions are authored in a rich-text editor and stored as HTML;
//! the bot wants plain text. Media files are stored as relative paths and
//! handed out as absolute URLs.

use once_cell::sync::Lazy;
use phonenumber::Mode;
use regex::Regex;
use scraper::{ElementRef, Html, Node};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

/// Elements whose content never reaches the reader.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that start a new line when rendered.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Strip markup from an HTML fragment and return readable plain text.
///
/// The fragment is parsed as HTML, so every named and numeric character
/// reference is decoded. Script and style content is dropped, block elements
/// separate words, non-breaking and zero-width joiner spaces become plain
/// spaces and runs of whitespace collapse to one space.
pub fn clean_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());
    collect_text(fragment.root_element(), &mut text);
    text.split(|c: char| c.is_whitespace() || c == '\u{200d}')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.contains(&name) {
        return;
    }
    let block = BLOCK_ELEMENTS.contains(&name);
    if block {
        out.push(' ');
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
    if block {
        out.push(' ');
    }
}

/// Build the public URL of a stored media file.
///
/// Empty paths yield `None`; absolute `http(s)` URLs are passed through.
pub fn media_url(base_url: &str, prefix: &str, path: Option<&str>) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }

    let base = base_url.trim_end_matches('/');
    let prefix = prefix.trim_matches('/');
    let relative = path.trim_start_matches('/');
    let relative = if prefix.is_empty() {
        relative
    } else {
        relative
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(relative)
    };

    if prefix.is_empty() {
        Some(format!("{}/{}", base, relative))
    } else {
        Some(format!("{}/{}/{}", base, prefix, relative))
    }
}

/// Normalise a phone number to E.164, reading national numbers as Russian.
///
/// Accepts `+<country><number>`, `8XXXXXXXXXX`, `7XXXXXXXXXX` and ten-digit
/// numbers without a trunk prefix. Spaces, dashes, dots and parentheses are
/// ignored. The result must be a valid number for its country code's
/// numbering plan; anything else yields `None`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let international = trimmed.starts_with('+');
    let mut digits = String::with_capacity(trimmed.len());
    for (i, ch) in trimmed.chars().enumerate() {
        match ch {
            '0'..='9' => digits.push(ch),
            ' ' | '-' | '(' | ')' | '.' => {}
            '+' if i == 0 => {}
            _ => return None,
        }
    }

    let candidate = if international {
        format!("+{}", digits)
    } else {
        match digits.len() {
            11 if digits.starts_with('8') || digits.starts_with('7') => {
                format!("+7{}", &digits[1..])
            }
            10 => format!("+7{}", digits),
            _ => return None,
        }
    };

    let number = phonenumber::parse(None, &candidate).ok()?;
    phonenumber::is_valid(&number).then(|| number.format().mode(Mode::E164).to_string())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_html_strips_tags_and_entities() {
        let html = "<p>Hello,&nbsp;<b>world</b>!</p>\n<p>Fish &amp; chips</p>";
        assert_eq!(clean_html(html), "Hello, world! Fish & chips");
    }

    #[test]
    fn test_clean_html_decodes_named_references() {
        assert_eq!(
            clean_html("<p>caf&eacute; &rsquo;quoted&rsquo; &copy; 2024</p>"),
            "café ’quoted’ © 2024"
        );
        assert_eq!(
            clean_html("&laquo;Rust&raquo; &mdash; &euro;5&hellip;"),
            "«Rust» — €5…"
        );
    }

    #[test]
    fn test_clean_html_drops_script_and_style() {
        let html = "<style>p { color: red; }</style><p>Visible</p>\
                    <script>alert('hidden');</script><p>text</p>";
        assert_eq!(clean_html(html), "Visible text");
    }

    #[test]
    fn test_clean_html_inline_markup_joins_words() {
        assert_eq!(clean_html("caf<b>é</b> <i>au</i> lait"), "café au lait");
        assert_eq!(clean_html("<ul><li>one</li><li>two</li></ul>"), "one two");
    }

    #[test]
    fn test_clean_html_decodes_numeric_references() {
        assert_eq!(clean_html("&#1055;&#x440;&#1080;&#1074;&#1077;&#1090;"), "Привет");
        assert_eq!(clean_html("a &unknown; b"), "a &unknown; b");
    }

    #[test]
    fn test_clean_html_escaped_markup_stays_text() {
        assert_eq!(clean_html("&lt;div&gt; is a tag"), "<div> is a tag");
    }

    #[test]
    fn test_clean_html_empty() {
        assert_eq!(clean_html(""), "");
        assert_eq!(clean_html("<br/><br/>"), "");
        assert_eq!(clean_html("a\u{200d}b"), "a b");
    }

    #[test]
    fn test_media_url() {
        let base = "http://127.0.0.1:8000/";
        assert_eq!(
            media_url(base, "/media/", Some("topics/intro.png")).as_deref(),
            Some("http://127.0.0.1:8000/media/topics/intro.png")
        );
        assert_eq!(
            media_url(base, "/media/", Some("/media/topics/intro.png")).as_deref(),
            Some("http://127.0.0.1:8000/media/topics/intro.png")
        );
        assert_eq!(
            media_url(base, "/media/", Some("https://cdn.example/x.png")).as_deref(),
            Some("https://cdn.example/x.png")
        );
        assert_eq!(
            media_url(base, "", Some("x.png")).as_deref(),
            Some("http://127.0.0.1:8000/x.png")
        );
        assert_eq!(media_url(base, "/media/", Some("  ")), None);
        assert_eq!(media_url(base, "/media/", None), None);
    }

    #[test]
    fn test_normalize_phone_russian_formats() {
        let expected = Some("+79001234567".to_string());
        assert_eq!(normalize_phone("89001234567"), expected);
        assert_eq!(normalize_phone("79001234567"), expected);
        assert_eq!(normalize_phone("+7 (900) 123-45-67"), expected);
        assert_eq!(normalize_phone("900 123 45 67"), expected);
    }

    #[test]
    fn test_normalize_phone_rejects_garbage() {
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("call me"), None);
        assert_eq!(normalize_phone("8900123456+7"), None);
        assert_eq!(normalize_phone("+4420"), None);
    }

    #[test]
    fn test_normalize_phone_checks_numbering_plan() {
        // right length, but no Russian number starts with 0
        assert_eq!(normalize_phone("+7 000 000 00 00"), None);
        assert_eq!(normalize_phone("80000000000"), None);
        // 999 is not an assigned country code
        assert_eq!(normalize_phone("+999 1234 5678"), None);
        assert_eq!(normalize_phone("+1 650 253 0000").as_deref(), Some("+16502530000"));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("anna@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.ru"));
        assert!(!is_valid_email("anna@"));
        assert!(!is_valid_email("anna example.com"));
        assert!(!is_valid_email("anna@localhost"));
    }

    proptest! {
        #[test]
        fn clean_html_output_is_trimmed_and_collapsed(input in ".{0,200}") {
            let cleaned = clean_html(&input);
            prop_assert_eq!(cleaned.trim(), cleaned.as_str());
            prop_assert!(!cleaned.contains("  "));
            prop_assert!(!cleaned.contains('\n'));
        }

        #[test]
        fn normalized_phone_is_e164(digits in "9[0-9]{9}") {
            let phone = normalize_phone(&format!("8{}", digits)).unwrap();
            prop_assert!(phone.starts_with("+7"));
            prop_assert_eq!(phone.len(), 12);
            prop_assert_eq!(normalize_phone(&phone), Some(phone.clone()));
        }
    }
}
