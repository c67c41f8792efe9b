use rust_decimal::{Decimal, RoundingStrategy};

/// Formats an amount as US dollars, e.g. `$1,234.57` or `-$0.50`.
pub fn currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded < Decimal::ZERO;
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${grouped}.{cents}", if negative { "-" } else { "" })
}

/// Formats a percentage without trailing zeros, e.g. `3.5%`.
pub fn percent(value: Decimal) -> String {
    format!("{}%", value.normalize())
}
