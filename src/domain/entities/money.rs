//! Amounts are carried as integer minor units (cents) end to end and only
//! rendered as decimals at the edges (emails, receipts, view models).

/// ISO currencies Stripe treats as zero-decimal.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// Normalize a processor currency code ("usd") to the stored form ("USD").
pub fn normalize_currency(code: &str) -> String {
    code.trim().to_uppercase()
}

pub fn is_zero_decimal(currency: &str) -> bool {
    ZERO_DECIMAL_CURRENCIES.contains(&normalize_currency(currency).as_str())
}

/// Render minor units as a major-unit decimal string, e.g. 5000 USD -> "50.00".
pub fn format_major_units(amount_minor: i64, currency: &str) -> String {
    if is_zero_decimal(currency) {
        return amount_minor.to_string();
    }
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Major-unit amount as a JSON number for API view models.
pub fn major_units(amount_minor: i64, currency: &str) -> f64 {
    if is_zero_decimal(currency) {
        amount_minor as f64
    } else {
        amount_minor as f64 / 100.0
    }
}

/// "$50.00"-style display label used in emails and receipts.
pub fn display_amount(amount_minor: i64, currency: &str) -> String {
    let currency = normalize_currency(currency);
    let symbol = match currency.as_str() {
        "USD" | "CAD" | "AUD" | "NZD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        _ => "",
    };
    let amount = format_major_units(amount_minor, &currency);
    if symbol.is_empty() {
        format!("{} {}", amount, currency)
    } else {
        format!("{}{} {}", symbol, amount, currency)
    }
}
