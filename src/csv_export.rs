//! The issuer's legacy CSV export: semicolon-delimited, Latin-1 encoded,
//! with metadata, column-header, exchange-rate and footer rows interleaved
//! with the same card-header/transaction grammar the PDF text uses.

use crate::error::Result;

/// Footer/summary rows to drop before grammar parsing.
const FOOTER_PHRASES: &[&str] = &[
    "SALDO ANTERIOR",
    "TOTAL A PAGAR",
    "PAGAMENTO MINIMO",
    "PAGAMENTO MÍNIMO",
];

/// The export is a single-byte legacy encoding; every Latin-1 byte maps
/// straight to the same Unicode scalar value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Reduce the CSV export to plain statement lines that the line grammar
/// understands: card headers stay as-is, transaction rows get their fields
/// re-joined with spaces, everything known-irrelevant is dropped.
pub fn statement_lines_from_csv(bytes: &[u8]) -> Result<Vec<String>> {
    let decoded = decode_latin1(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(decoded.as_bytes());

    let mut lines = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let fields: Vec<&str> = record.iter().map(|f| f.trim()).collect();

        // Column-header row: `Data;Descrição;...`
        if fields.first().map_or(false, |f| *f == "Data") {
            continue;
        }
        // Exchange-rate info rows are prefixed `;USD`.
        if fields.len() >= 2 && fields[0].is_empty() && fields[1].starts_with("USD") {
            continue;
        }

        let joined = fields
            .iter()
            .filter(|f| !f.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            continue;
        }
        let upper = joined.to_uppercase();
        if FOOTER_PHRASES.iter().any(|phrase| upper.contains(phrase)) {
            continue;
        }
        lines.push(joined);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_latin1() {
        // "Pão" in Latin-1: P=0x50, ã=0xE3, o=0x6F
        assert_eq!(decode_latin1(&[0x50, 0xE3, 0x6F]), "Pão");
    }

    #[test]
    fn test_filters_known_row_kinds() {
        let csv = b"Fatura de julho de 2025;;;\n\
Data;Descricao;Valor;Valor USD\n\
7152 - ALEXANDRE C VIEIRA\n\
31/07/2025;FeFloresCostura 02/02;196,50;0,00\n\
;USD 1,00 = R$ 5,43;;\n\
SALDO ANTERIOR;;1.000,00;\n\
Pagamento m\xEDnimo;;150,00;\n\
TOTAL A PAGAR;;2.500,00;\n";
        let lines = statement_lines_from_csv(csv).unwrap();
        assert_eq!(
            lines,
            vec![
                "Fatura de julho de 2025".to_string(),
                "7152 - ALEXANDRE C VIEIRA".to_string(),
                "31/07/2025 FeFloresCostura 02/02 196,50 0,00".to_string(),
            ]
        );
    }

    #[test]
    fn test_rejoined_rows_parse_as_transactions() {
        let csv = b"7152 - ALEXANDRE C VIEIRA\n31/07/2025;MERCADO;52,30;0,00\n";
        let lines = statement_lines_from_csv(csv).unwrap();
        let sections = crate::parser::parse_card_sections(&lines.join("\n"));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].lines[0].description, "MERCADO");
    }
}
