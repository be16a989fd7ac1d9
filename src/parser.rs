use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{FaturaError, Result};
use crate::models::{ParsedCardSection, ParsedTransactionLine};

// ---------------------------------------------------------------------------
// Text normalization
// ---------------------------------------------------------------------------

/// Replace non-ASCII space code points (NBSP, narrow no-break space, figure
/// space and friends — pdftotext output is full of them) with a plain space,
/// then trim the ends. Internal runs of spaces are preserved; the grammar
/// tolerates variable column spacing.
pub fn normalize_spaces(line: &str) -> String {
    let replaced: String = line
        .chars()
        .map(|c| if c.is_whitespace() && !c.is_ascii_whitespace() { ' ' } else { c })
        .collect();
    replaced.trim().to_string()
}

/// Lowercased, punctuation-stripped, whitespace-collapsed form of a
/// description. This is the one and only key function for checksums,
/// mapping lookups and mapping storage.
pub fn normalize_description(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Locale decimal parsing
// ---------------------------------------------------------------------------

/// Parse a Brazilian-format number: '.' thousands separator, ',' decimal
/// separator, optional leading '-'. "1.234,56" -> 1234.56
pub fn parse_decimal(raw: &str) -> Result<Decimal> {
    let cleaned = raw.trim().replace('.', "").replace(',', ".");
    Decimal::from_str(&cleaned).map_err(|_| FaturaError::InvalidValue(raw.trim().to_string()))
}

// ---------------------------------------------------------------------------
// Statement line grammar
// ---------------------------------------------------------------------------

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4}) - ([A-Z][A-Z ]*)$").unwrap())
}

fn transaction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{2}/\d{2}/\d{4})\s+(.+?)\s+(-?\d[\d.]*,\d{2})\s+(-?\d[\d.]*,\d{2})$")
            .unwrap()
    })
}

fn installment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*\S)\s+(\d{1,2})/(\d{1,2})$").unwrap())
}

/// A card-section header line: `7152 - ALEXANDRE C VIEIRA`.
pub fn parse_card_header(line: &str) -> Option<(String, String)> {
    let line = normalize_spaces(line);
    let caps = header_re().captures(&line)?;
    Some((caps[1].to_string(), normalize_spaces(&caps[2])))
}

/// Outcome of classifying one raw line.
#[derive(Debug)]
pub enum LineOutcome {
    Header { last_four: String, holder_name: String },
    Transaction(ParsedTransactionLine),
    /// Blank lines, footers, arbitrary statement prose. Not an error.
    Noise,
    /// Matched the transaction shape but a value failed to parse.
    Invalid(String),
}

pub fn classify_line(line: &str, card_last_four: &str, holder_name: &str) -> LineOutcome {
    let line = normalize_spaces(line);
    if line.is_empty() {
        return LineOutcome::Noise;
    }
    if let Some((last_four, holder)) = parse_card_header(&line) {
        return LineOutcome::Header { last_four, holder_name: holder };
    }

    let Some(caps) = transaction_re().captures(&line) else {
        return LineOutcome::Noise;
    };
    // The leading date is consumed as its own token, so a trailing NN/NN
    // installment suffix can never be mistaken for the date.
    let Some(date) = NaiveDate::parse_from_str(&caps[1], "%d/%m/%Y").ok() else {
        return LineOutcome::Noise;
    };

    let raw_description = caps[2].to_string();
    let (description, current, total) = match installment_re().captures(&raw_description) {
        Some(inst) => {
            let current: u32 = inst[2].parse().unwrap_or(0);
            let total: u32 = inst[3].parse().unwrap_or(0);
            (inst[1].to_string(), Some(current), Some(total))
        }
        None => (raw_description.clone(), None, None),
    };

    let value_local = match parse_decimal(&caps[3]) {
        Ok(v) => v,
        Err(e) => return LineOutcome::Invalid(e.to_string()),
    };
    let value_foreign = match parse_decimal(&caps[4]) {
        Ok(v) if v.is_zero() => None,
        Ok(v) => Some(v),
        Err(e) => return LineOutcome::Invalid(e.to_string()),
    };

    LineOutcome::Transaction(ParsedTransactionLine {
        date,
        description,
        raw_description,
        value_local,
        value_foreign,
        current_installment: current,
        total_installments: total,
        card_last_four: card_last_four.to_string(),
        card_holder_name: holder_name.to_string(),
    })
}

/// Parse one line against the transaction grammar. Anything that does not
/// match — blank lines, headers, footer prose, broken values — is `None`;
/// that leniency is how noise gets discarded.
pub fn parse_transaction_line(
    line: &str,
    card_last_four: &str,
    holder_name: &str,
) -> Option<ParsedTransactionLine> {
    match classify_line(line, card_last_four, holder_name) {
        LineOutcome::Transaction(parsed) => Some(parsed),
        _ => None,
    }
}

/// A line that matched the transaction shape but failed value parsing.
/// Reported in the import summary rather than silently dropped.
#[derive(Debug, Clone)]
pub struct LineError {
    pub line_number: usize,
    pub line: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub sections: Vec<ParsedCardSection>,
    pub errors: Vec<LineError>,
}

/// Scan a whole statement, grouping transaction lines under the most recent
/// card header. Lines before the first header cannot be attributed to a
/// card and are discarded.
pub fn parse_statement(text: &str) -> ParsedStatement {
    let mut out = ParsedStatement::default();
    let mut current: Option<ParsedCardSection> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let (last_four, holder) = match &current {
            Some(section) => (section.last_four.as_str(), section.holder_name.as_str()),
            None => ("", ""),
        };
        match classify_line(raw_line, last_four, holder) {
            LineOutcome::Header { last_four, holder_name } => {
                if let Some(done) = current.take() {
                    out.sections.push(done);
                }
                current = Some(ParsedCardSection { last_four, holder_name, lines: Vec::new() });
            }
            LineOutcome::Transaction(parsed) => {
                if let Some(section) = current.as_mut() {
                    section.lines.push(parsed);
                }
            }
            LineOutcome::Invalid(message) => {
                if current.is_some() {
                    out.errors.push(LineError {
                        line_number: idx + 1,
                        line: normalize_spaces(raw_line),
                        message,
                    });
                }
            }
            LineOutcome::Noise => {}
        }
    }
    if let Some(done) = current.take() {
        out.sections.push(done);
    }
    out
}

/// Sections only, in document order, dropping the error report.
pub fn parse_card_sections(text: &str) -> Vec<ParsedCardSection> {
    parse_statement(text).sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_spaces_replaces_unicode_spaces() {
        assert_eq!(normalize_spaces("a\u{00a0}b\u{202f}c\u{2007}d"), "a b c d");
        assert_eq!(normalize_spaces("  keep  internal   runs  "), "keep  internal   runs");
        assert_eq!(normalize_spaces(""), "");
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description("FeFloresCostura"), "feflorescostura");
        assert_eq!(normalize_description("MP *KIT"), "mp kit");
        assert_eq!(
            normalize_description("  Pão   de Açúcar,  SP! "),
            "pão de açúcar sp"
        );
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1.234,56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_decimal("-12.855,13").unwrap(), Decimal::new(-1285513, 2));
        assert_eq!(parse_decimal("0,00").unwrap(), Decimal::ZERO);
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn test_parse_card_header() {
        assert_eq!(
            parse_card_header("7152 - ALEXANDRE C VIEIRA"),
            Some(("7152".to_string(), "ALEXANDRE C VIEIRA".to_string()))
        );
        assert_eq!(parse_card_header("715 - SHORT"), None);
        assert_eq!(parse_card_header("31/07/2025 STORE 10,00 0,00"), None);
    }

    #[test]
    fn test_parse_transaction_line_basic() {
        let parsed = parse_transaction_line("31/07/2025 FeFloresCostura 196,50 0,00", "7152", "A").unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2025, 7, 31).unwrap());
        assert_eq!(parsed.description, "FeFloresCostura");
        assert_eq!(parsed.value_local, Decimal::new(1965, 1));
        assert_eq!(parsed.value_foreign, None);
        assert_eq!(parsed.current_installment, None);
        assert_eq!(parsed.total_installments, None);
    }

    #[test]
    fn test_parse_transaction_line_installments() {
        let parsed = parse_transaction_line("01/07/2025 MP *KIT 10/10 129,90 0,00", "7152", "A").unwrap();
        assert_eq!(parsed.description, "MP *KIT");
        assert_eq!(parsed.raw_description, "MP *KIT 10/10");
        assert_eq!(parsed.current_installment, Some(10));
        assert_eq!(parsed.total_installments, Some(10));
    }

    #[test]
    fn test_parse_transaction_line_foreign_value() {
        let parsed =
            parse_transaction_line("15/06/2025 AMAZON US 123,45 22,99", "7152", "A").unwrap();
        assert_eq!(parsed.value_foreign, Some(Decimal::new(2299, 2)));
    }

    #[test]
    fn test_parse_transaction_line_negative_payment() {
        let parsed =
            parse_transaction_line("10/06/2025 PAGAMENTO EFETUADO -12.855,13 0,00", "7152", "A")
                .unwrap();
        assert_eq!(parsed.value_local, Decimal::new(-1285513, 2));
    }

    #[test]
    fn test_parse_transaction_line_irregular_spacing() {
        let parsed = parse_transaction_line(
            "31/07/2025\u{00a0}\u{00a0}FeFloresCostura 02/02      196,50\u{202f}   0,00",
            "7152",
            "A",
        )
        .unwrap();
        assert_eq!(parsed.description, "FeFloresCostura");
        assert_eq!(parsed.current_installment, Some(2));
    }

    #[test]
    fn test_parse_transaction_line_rejects_noise() {
        for line in [
            "",
            "   ",
            "7152 - ALEXANDRE C VIEIRA",
            "Lançamentos da fatura atual",
            "SALDO ANTERIOR 1.000,00",
            "32/13/2025 BAD DATE 10,00 0,00",
        ] {
            assert!(parse_transaction_line(line, "7152", "A").is_none(), "parsed: {line}");
        }
    }

    #[test]
    fn test_installment_suffix_alone_is_description() {
        // No whitespace-preceded suffix to strip; "02/02" is the whole text.
        let parsed = parse_transaction_line("31/07/2025 02/02 10,00 0,00", "7152", "A").unwrap();
        assert_eq!(parsed.description, "02/02");
        assert_eq!(parsed.current_installment, None);
    }

    #[test]
    fn test_parse_card_sections_in_document_order() {
        let text = "\
Fatura de julho

7152 - ALEXANDRE C VIEIRA
01/07/2025 LOJA A 10,00 0,00
02/07/2025 LOJA B 20,00 0,00

9001 - MARIA C VIEIRA
03/07/2025 LOJA C 30,00 0,00
rodapé ignorado

4410 - JOSE VIEIRA
04/07/2025 LOJA D 40,00 0,00
";
        let sections = parse_card_sections(text);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].last_four, "7152");
        assert_eq!(sections[0].lines.len(), 2);
        assert_eq!(sections[1].holder_name, "MARIA C VIEIRA");
        assert_eq!(sections[1].lines.len(), 1);
        assert_eq!(sections[2].lines[0].description, "LOJA D");
    }

    #[test]
    fn test_lines_without_header_are_discarded() {
        let text = "01/07/2025 ORPHAN LINE 10,00 0,00\n";
        assert!(parse_card_sections(text).is_empty());
    }

    #[test]
    fn test_section_lines_carry_card_context() {
        let text = "7152 - ALEXANDRE C VIEIRA\n01/07/2025 LOJA A 10,00 0,00\n";
        let sections = parse_card_sections(text);
        assert_eq!(sections[0].lines[0].card_last_four, "7152");
        assert_eq!(sections[0].lines[0].card_holder_name, "ALEXANDRE C VIEIRA");
    }
}
