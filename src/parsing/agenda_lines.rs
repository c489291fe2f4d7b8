//! Numbered agenda line grammar.
//!
//! ```text
//! line      := ws* index "." ws* description
//! index     := digit+            (must be a positive integer that fits u32)
//! reference := ("의안번호" | "bill no" "."?) ws* digit+   (anywhere in the line)
//! ```
//!
//! Lines that do not match are ignored. The description is the remainder of
//! the line with surrounding whitespace trimmed; it may be empty.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::AgendaItem;

static AGENDA_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\.\s*(.*?)\s*$").expect("agenda line pattern"));

static REFERENCE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:의안번호|(?i:bill\s*no\.?))\s*(\d+)").expect("reference number pattern")
});

/// Parse one agenda line, e.g. "48. 서민의 금융생활 지원에 관한 법률 일부개정법률안(의안번호 2104052)"
pub fn parse_agenda_line(line: &str) -> Option<AgendaItem> {
    let caps = AGENDA_LINE.captures(line)?;
    let index: u32 = caps.get(1)?.as_str().parse().ok()?;
    if index == 0 {
        return None;
    }
    let description = caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_string();
    let reference_number = REFERENCE_NUMBER
        .captures(&description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Some(AgendaItem {
        index,
        description,
        reference_number,
    })
}

/// Parse every matching line of a raw agenda blob, in text order
pub fn parse_agenda_block(text: &str) -> impl Iterator<Item = AgendaItem> + '_ {
    text.lines().filter_map(parse_agenda_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agenda_line_with_reference() {
        let item = parse_agenda_line(
            "  48. 서민의 금융생활 지원에 관한 법률 일부개정법률안(정부 제출)(의안번호 2104052)",
        )
        .unwrap();

        assert_eq!(item.index, 48);
        assert!(item.description.starts_with("서민의 금융생활"));
        assert_eq!(item.reference_number.as_deref(), Some("2104052"));
    }

    #[test]
    fn test_parse_agenda_line_english_reference() {
        let item = parse_agenda_line("3. Consumer Credit Act amendment (Bill No. 2100417)").unwrap();
        assert_eq!(item.index, 3);
        assert_eq!(item.reference_number.as_deref(), Some("2100417"));
    }

    #[test]
    fn test_rejects_non_matching_lines() {
        assert!(parse_agenda_line("의사일정").is_none());
        assert!(parse_agenda_line("제1항 법률안").is_none());
        assert!(parse_agenda_line("0. not an item").is_none());
        assert!(parse_agenda_line("").is_none());
        assert!(parse_agenda_line("99999999999. overflow").is_none());
    }

    #[test]
    fn test_parse_block_keeps_text_order() {
        let block = "의사일정\n2. 둘째 법률안\n\n1. 첫째 법률안\n잡음";
        let items: Vec<u32> = parse_agenda_block(block).map(|i| i.index).collect();
        assert_eq!(items, vec![2, 1]);
    }

    #[test]
    fn test_empty_description_is_allowed() {
        let item = parse_agenda_line("7.").unwrap();
        assert_eq!(item.index, 7);
        assert!(item.description.is_empty());
        assert!(item.reference_number.is_none());
    }
}
