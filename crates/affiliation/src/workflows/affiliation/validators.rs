//! Pure field predicates. Each returns a plain `bool`; callers attach the messages.

use chrono::{Datelike, NaiveDate};

pub const MINIMUM_AGE: u32 = 16;
pub const MAXIMUM_AGE: u32 = 100;

pub const FULL_NAME_MIN_CHARS: usize = 5;
pub const FULL_NAME_MAX_CHARS: usize = 120;

const DOCUMENT_DIGITS: usize = 11;

/// Strip the `000.000.000-00` mask. Returns `None` when anything other than
/// digits and mask punctuation is present.
pub fn normalize_document_number(raw: &str) -> Option<String> {
    let mut digits = String::with_capacity(DOCUMENT_DIGITS);
    for ch in raw.trim().chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            '.' | '-' | ' ' => {}
            _ => return None,
        }
    }
    Some(digits)
}

/// Render eleven digits as `000.000.000-00`; anything else is returned unchanged.
pub fn format_document_number(raw: &str) -> String {
    match normalize_document_number(raw) {
        Some(digits) if digits.len() == DOCUMENT_DIGITS => format!(
            "{}.{}.{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..11]
        ),
        _ => raw.to_string(),
    }
}

fn check_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(position, digit)| digit * (weight_start - position as u32))
        .sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

/// National taxpayer identifier with both modulo-11 check digits.
pub fn is_valid_document_number(raw: &str) -> bool {
    let Some(normalized) = normalize_document_number(raw) else {
        return false;
    };
    if normalized.len() != DOCUMENT_DIGITS {
        return false;
    }

    let digits: Vec<u32> = normalized.chars().filter_map(|ch| ch.to_digit(10)).collect();
    if digits.iter().all(|digit| *digit == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Whole years elapsed between `birth_date` and `today`; `None` for future dates.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth_date > today {
        return None;
    }

    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

pub fn is_valid_age(birth_date: NaiveDate, today: NaiveDate) -> bool {
    age_on(birth_date, today).is_some_and(|age| (MINIMUM_AGE..=MAXIMUM_AGE).contains(&age))
}

/// At least two tokens of letters only (accents allowed), within length bounds.
pub fn is_valid_full_name(raw: &str) -> bool {
    let trimmed = raw.trim();
    let length = trimmed.chars().count();
    if !(FULL_NAME_MIN_CHARS..=FULL_NAME_MAX_CHARS).contains(&length) {
        return false;
    }

    let mut tokens = 0;
    for token in trimmed.split_whitespace() {
        if !token.chars().all(char::is_alphabetic) {
            return false;
        }
        tokens += 1;
    }
    tokens >= 2
}

pub fn is_valid_email(raw: &str) -> bool {
    let value = raw.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = value.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() {
        return false;
    }

    let last = domain.len().saturating_sub(1);
    domain
        .char_indices()
        .any(|(position, ch)| ch == '.' && position > 0 && position < last)
}

/// Phone numbers carry an area code: ten or eleven digits, optionally behind `+55`.
pub fn is_valid_phone(raw: &str) -> bool {
    let value = raw.trim();
    if value.is_empty()
        || !value
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, ' ' | '(' | ')' | '-' | '+'))
    {
        return false;
    }

    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    let local = match digits.strip_prefix("55") {
        Some(rest) if value.starts_with('+') => rest,
        _ => digits.as_str(),
    };
    matches!(local.len(), 10 | 11)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn document_number_accepts_masked_and_bare_digits() {
        assert!(is_valid_document_number("529.982.247-25"));
        assert!(is_valid_document_number("52998224725"));
        assert!(is_valid_document_number("123.456.789-09"));
    }

    #[test]
    fn document_number_rejects_repeated_digits() {
        for digit in 0..=9 {
            let repeated = digit.to_string().repeat(11);
            assert!(!is_valid_document_number(&repeated), "{repeated}");
        }
    }

    #[test]
    fn document_number_rejects_either_bad_check_digit() {
        assert!(!is_valid_document_number("52998224735"));
        assert!(!is_valid_document_number("52998224726"));
        assert!(!is_valid_document_number("123.456.789-00"));
    }

    #[test]
    fn document_number_rejects_wrong_length_and_letters() {
        assert!(!is_valid_document_number(""));
        assert!(!is_valid_document_number("5299822472"));
        assert!(!is_valid_document_number("529982247250"));
        assert!(!is_valid_document_number("529.982.247-2x"));
    }

    #[test]
    fn formats_document_number_mask() {
        assert_eq!(format_document_number("52998224725"), "529.982.247-25");
        assert_eq!(format_document_number("123"), "123");
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let today = date(2025, 6, 10);
        assert!(is_valid_age(date(2009, 6, 10), today));
        assert!(!is_valid_age(date(2009, 6, 11), today));
        assert!(is_valid_age(date(1925, 6, 11), today));
        assert!(is_valid_age(date(1925, 6, 10), today));
        assert!(!is_valid_age(date(1924, 6, 9), today));
        assert!(!is_valid_age(date(2030, 1, 1), today));
    }

    #[test]
    fn age_counts_whole_years_only() {
        let today = date(2025, 2, 28);
        assert_eq!(age_on(date(2008, 2, 29), today), Some(16));
        assert_eq!(age_on(date(2008, 3, 1), today), Some(16));
        assert_eq!(age_on(date(2009, 3, 1), today), Some(15));
    }

    #[test]
    fn full_name_requires_two_letter_tokens() {
        assert!(is_valid_full_name("Ana Souza"));
        assert!(is_valid_full_name("João da Silva Conceição"));
        assert!(!is_valid_full_name("Ana"));
        assert!(!is_valid_full_name(""));
        assert!(!is_valid_full_name("Ana Souza 2"));
        assert!(!is_valid_full_name("Ana $ouza"));
        assert!(!is_valid_full_name(&format!("Ana {}", "a".repeat(FULL_NAME_MAX_CHARS))));
    }

    #[test]
    fn email_needs_local_part_and_dotted_domain() {
        assert!(is_valid_email("ana.souza@email.com"));
        assert!(!is_valid_email("ana.souza@email"));
        assert!(!is_valid_email("@email.com"));
        assert!(!is_valid_email("ana@@email.com"));
        assert!(!is_valid_email("ana@.com"));
        assert!(!is_valid_email("ana@email."));
        assert!(!is_valid_email("ana souza@email.com"));
    }

    #[test]
    fn phone_requires_area_code() {
        assert!(is_valid_phone("(61) 99999-8888"));
        assert!(is_valid_phone("+55 11 98888-7777"));
        assert!(is_valid_phone("6133334444"));
        assert!(!is_valid_phone("99999-8888"));
        assert!(!is_valid_phone("call me"));
        assert!(!is_valid_phone(""));
    }
}
