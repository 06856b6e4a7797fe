use crate::data::markers::MarkerLabel;

/// Placeholder for an unknown value. Never rendered as zero.
pub const UNKNOWN: &str = "—";

/// `1234567.891` → `1,234,567.89 ₽`
pub fn money(amount: f64) -> String {
    format!("{} ₽", grouped(amount))
}

/// `Some(15.0)` → `15.00 kg`, `None` → `—`
pub fn weight(value: Option<f64>) -> String {
    match value {
        Some(w) => format!("{} kg", grouped(w)),
        None => UNKNOWN.to_string(),
    }
}

/// Two decimals with comma thousands separators.
fn grouped(value: f64) -> String {
    let text = format!("{:.2}", value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut out = String::with_capacity(text.len() + int_part.len() / 3 + 1);
    if value < 0.0 && text.bytes().any(|b| b != b'0' && b != b'.') {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push('.');
    out.push_str(frac_part);
    out
}

/// Hover text for a marker. `with_weight` is false when the sheet has no
/// weight column at all, in which case weight is not mentioned.
pub fn marker_label(label: &MarkerLabel, with_weight: bool) -> String {
    match label {
        MarkerLabel::Single { counterparty, month, weekday } => {
            format!("{counterparty} | {month} | {weekday}")
        }
        MarkerLabel::Repeated { visits, avg_weight } if with_weight => {
            format!("visits: {visits} (avg weight: {})", weight(*avg_weight))
        }
        MarkerLabel::Repeated { visits, .. } => format!("visits: {visits}"),
    }
}
