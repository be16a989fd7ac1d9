use rust_decimal::Decimal;

/// Format a value in Brazilian statement style: R$ 1.234,56 / -R$ 500,00
pub fn money(val: Decimal) -> String {
    let negative = val < Decimal::ZERO;
    let fixed = format!("{:.2}", val.abs().round_dp(2));
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    if negative {
        format!("-R$ {with_dots},{dec_part}")
    } else {
        format!("R$ {with_dots},{dec_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(Decimal::new(123456, 2)), "R$ 1.234,56");
        assert_eq!(money(Decimal::new(-50000, 2)), "-R$ 500,00");
        assert_eq!(money(Decimal::ZERO), "R$ 0,00");
        assert_eq!(money(Decimal::new(100000099, 2)), "R$ 1.000.000,99");
        assert_eq!(money(Decimal::new(4210, 2)), "R$ 42,10");
    }
}
