/// Classification under the Colombian numbering plan: after stripping the
/// `57` country prefix, national numbers starting with `3` are mobile (and
/// assumed WhatsApp-capable), anything else is a landline. Numbers from other
/// plans are never guessed as mobile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneClass {
    Mobile,
    Landline,
    Unknown,
}

/// Classifies a raw phone string and returns the cleaned national number.
/// Empty or digit-free input yields `Unknown` with an empty number.
pub fn classify(raw: &str) -> (PhoneClass, String) {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return (PhoneClass::Unknown, String::new());
    }

    // A leading 57 on top of a full national number is the country prefix.
    let national = if digits.len() > 10 && digits.starts_with("57") {
        &digits[2..]
    } else {
        digits.as_str()
    };

    if national.starts_with('3') {
        (PhoneClass::Mobile, national.to_string())
    } else {
        (PhoneClass::Landline, national.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_numbers_start_with_three() {
        assert_eq!(
            classify("3001234567"),
            (PhoneClass::Mobile, "3001234567".to_string())
        );
        assert_eq!(
            classify("300 123 4567"),
            (PhoneClass::Mobile, "3001234567".to_string())
        );
    }

    #[test]
    fn country_prefix_is_stripped_before_the_leading_digit() {
        assert_eq!(
            classify("+57 300 123 4567"),
            (PhoneClass::Mobile, "3001234567".to_string())
        );
        assert_eq!(
            classify("573001234567"),
            (PhoneClass::Mobile, "3001234567".to_string())
        );
    }

    #[test]
    fn other_leading_digits_are_landlines() {
        assert_eq!(
            classify("(601) 234 5678"),
            (PhoneClass::Landline, "6012345678".to_string())
        );
        assert_eq!(classify("12345"), (PhoneClass::Landline, "12345".to_string()));
    }

    #[test]
    fn empty_or_digit_free_input_is_unknown() {
        assert_eq!(classify(""), (PhoneClass::Unknown, String::new()));
        assert_eq!(classify("n/a"), (PhoneClass::Unknown, String::new()));
    }

    #[test]
    fn short_numbers_keep_an_accidental_57_prefix() {
        // 5712345 is a seven-digit Bogota landline, not a 57 country code.
        assert_eq!(
            classify("5712345"),
            (PhoneClass::Landline, "5712345".to_string())
        );
    }
}
