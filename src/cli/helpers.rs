//! Shared formatting helpers for CLI commands

use console::{style, StyledObject};

use crate::analysis::break_even::RiskLevel;
use crate::analysis::financial::ViabilityRating;
use crate::core::identity::EntityId;

/// Format an EntityId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// `$1,234,567.89`, with a leading minus for negatives
pub fn format_money(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Absent values print as `n/a`
pub fn format_opt<T>(value: Option<T>, f: impl FnOnce(T) -> String) -> String {
    value.map(f).unwrap_or_else(|| "n/a".to_string())
}

pub fn format_months(months: Option<f64>) -> String {
    format_opt(months, |m| format!("{:.1} months", m))
}

pub fn format_years(years: Option<u32>) -> String {
    format_opt(years, |y| format!("{} years", y))
}

pub fn styled_risk(level: RiskLevel) -> StyledObject<String> {
    let s = style(level.to_string());
    match level {
        RiskLevel::Low => s.green(),
        RiskLevel::Moderate => s.yellow(),
        RiskLevel::High => s.red(),
        RiskLevel::Unknown => s.dim(),
    }
}

pub fn styled_rating(rating: ViabilityRating) -> StyledObject<String> {
    let s = style(rating.to_string());
    match rating {
        ViabilityRating::Excellent | ViabilityRating::Good => s.green(),
        ViabilityRating::Moderate => s.yellow(),
        ViabilityRating::Poor | ViabilityRating::NotViable => s.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;

    #[test]
    fn test_format_short_id() {
        let id = EntityId::new(EntityPrefix::Job);
        let formatted = format_short_id(&id);
        assert_eq!(formatted.len(), 16);
        assert!(formatted.starts_with("JOB-"));
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("Ti-6Al-4V ±", 11), "Ti-6Al-4V ±");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0.0), "$0.00");
        assert_eq!(format_money(999.999), "$1,000.00");
        assert_eq!(format_money(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_money(-5_000_000.0), "-$5,000,000.00");
    }

    #[test]
    fn test_absent_values() {
        assert_eq!(format_months(None), "n/a");
        assert_eq!(format_months(Some(17.84)), "17.8 months");
        assert_eq!(format_years(Some(3)), "3 years");
        assert_eq!(format_percent(23.456), "23.5%");
    }
}
