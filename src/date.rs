//! Due-date entry and validation.
//!
//! Dates are typed as a bare `DDMMYYYY` digit string, shown segmented as
//! `DD.MM.YYYY`, and stored in the segmented form.

use chrono::NaiveDate;

pub const DATE_DIGITS: usize = 8;
pub const MIN_YEAR: u32 = 1900;
pub const MAX_YEAR: u32 = 2100;

pub fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(month: u32, year: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Returns whether `digits` (`DDMMYYYY`) names a real calendar date between
/// [`MIN_YEAR`] and [`MAX_YEAR`]. Anything that is not exactly eight ASCII
/// digits is rejected.
pub fn is_valid_date(digits: &str) -> bool {
    if digits.len() != DATE_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let field = |range: std::ops::Range<usize>| -> u32 {
        digits[range]
            .bytes()
            .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
    };
    let day = field(0..2);
    let month = field(2..4);
    let year = field(4..8);

    if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
        return false;
    }

    (1..=days_in_month(month, year)).contains(&day)
}

/// Keeps ASCII digits only, at most [`DATE_DIGITS`] of them.
pub fn sanitize_digits(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(DATE_DIGITS)
        .collect()
}

/// Display form of a (possibly partial) digit string: `0312` -> `03.12`.
pub fn segment(digits: &str) -> String {
    let mut out = String::with_capacity(DATE_DIGITS + 2);
    for (i, c) in digits.chars().take(DATE_DIGITS).enumerate() {
        out.push(c);
        if (i == 1 || i == 3) && i + 1 < digits.len() {
            out.push('.');
        }
    }
    out
}

pub fn format_due_date(digits: &str) -> Option<String> {
    is_valid_date(digits).then(|| segment(digits))
}

/// Parses a stored `DD.MM.YYYY` due date.
pub fn parse_due_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.split('.');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(
        year.trim().parse().ok()?,
        month.trim().parse().ok()?,
        day.trim().parse().ok()?,
    )
}

/// Editable due-date field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateInput {
    digits: String,
}

impl DateInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, raw: &str) {
        self.digits = sanitize_digits(raw);
    }

    /// Appends `c` if it is a digit and the field is not full.
    pub fn push(&mut self, c: char) -> bool {
        if c.is_ascii_digit() && self.digits.len() < DATE_DIGITS {
            self.digits.push(c);
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<char> {
        self.digits.pop()
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn display(&self) -> String {
        segment(&self.digits)
    }

    pub fn is_complete(&self) -> bool {
        self.digits.len() == DATE_DIGITS
    }

    /// True once all eight digits are in and they do not form a valid date.
    pub fn is_invalid(&self) -> bool {
        self.is_complete() && !is_valid_date(&self.digits)
    }

    pub fn due_date(&self) -> Option<String> {
        format_due_date(&self.digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_year_boundaries() {
        assert!(is_valid_date("29022000"));
        assert!(!is_valid_date("29021900"));
        assert!(!is_valid_date("29022100"));
        assert!(is_valid_date("29022024"));
        assert!(!is_valid_date("29022025"));
        // 2400 is a leap year but outside the accepted range
        assert!(is_leap_year(2400));
        assert!(!is_valid_date("29022400"));
    }

    #[test]
    fn month_lengths() {
        assert!(!is_valid_date("31042025"));
        assert!(is_valid_date("30042025"));
        assert!(is_valid_date("31122025"));
        assert!(!is_valid_date("31112025"));
        assert!(!is_valid_date("00012025"));
    }

    #[test]
    fn year_and_month_range() {
        assert!(is_valid_date("01011900"));
        assert!(is_valid_date("31122100"));
        assert!(!is_valid_date("31121899"));
        assert!(!is_valid_date("01012101"));
        assert!(!is_valid_date("01002025"));
        assert!(!is_valid_date("01132025"));
    }

    #[test]
    fn rejects_malformed_input_without_panicking() {
        for raw in ["", "0101202", "010120250", "01.01.2025", "ab012025", "0١012025"] {
            assert!(!is_valid_date(raw), "{raw:?}");
        }
    }

    #[test]
    fn segments_partial_input() {
        assert_eq!(segment(""), "");
        assert_eq!(segment("0"), "0");
        assert_eq!(segment("03"), "03");
        assert_eq!(segment("031"), "03.1");
        assert_eq!(segment("0312"), "03.12");
        assert_eq!(segment("03122025"), "03.12.2025");
    }

    #[test]
    fn sanitize_strips_and_truncates() {
        assert_eq!(sanitize_digits("03.12.2025"), "03122025");
        assert_eq!(sanitize_digits("0312202599"), "03122025");
        assert_eq!(sanitize_digits("abc"), "");
    }

    #[test]
    fn parses_stored_due_dates() {
        assert_eq!(
            parse_due_date("03.12.2025"),
            NaiveDate::from_ymd_opt(2025, 12, 3)
        );
        assert_eq!(parse_due_date("31.02.2025"), None);
        assert_eq!(parse_due_date("03-12-2025"), None);
        assert_eq!(parse_due_date("03.12.2025.1"), None);
    }

    #[test]
    fn date_input_flags_invalid_only_when_complete() {
        let mut input = DateInput::new();
        for c in "3104202".chars() {
            assert!(input.push(c));
        }
        assert!(!input.is_invalid());
        assert_eq!(input.due_date(), None);

        assert!(input.push('5'));
        assert!(input.is_invalid());
        assert!(!input.push('1'));
        assert!(!input.push('x'));

        input.pop();
        input.pop();
        input.set("300420x25");
        assert_eq!(input.display(), "30.04.2025");
        assert_eq!(input.due_date().as_deref(), Some("30.04.2025"));
    }
}
