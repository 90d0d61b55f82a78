// Message composition and shortcode invariants across the send path.

use promorelay_core::services::send_worker::{compose_salutation, substitute_shortlink};
use promorelay_core::services::short_link::generate_shortcode;
use promorelay_core::utils::phone::{is_phone, normalize, strip_plus_one, to_provider_format};
use regex::Regex;

#[test]
fn shortcodes_match_the_published_pattern() {
    let pattern = Regex::new(r"^[0-9A-Za-z]{7}$").unwrap();
    for _ in 0..200 {
        let code = generate_shortcode();
        assert!(pattern.is_match(&code), "bad shortcode: {}", code);
    }
}

#[test]
fn stored_phones_are_ten_bare_digits() {
    let pattern = Regex::new(r"^\d{10}$").unwrap();
    for raw in ["(555) 123-4567", "555.123.4567", "5551234567"] {
        assert!(is_phone(raw));
        let digits = normalize(raw);
        assert!(pattern.is_match(&digits));
        // the provider sees +1<digits>; the store sees the bare digits again
        assert_eq!(strip_plus_one(&to_provider_format(&digits)), digits);
    }
}

#[test]
fn full_compose_path_for_a_named_recipient() {
    let template = "20% off this week: ||| (reply STOP to opt out)";
    let composed = compose_salutation(template, Some("Ann"), false);
    let body = substitute_shortlink(&composed, "http://prly.io/x/ab3Xk2q");
    assert_eq!(
        body,
        "Hey Ann! 20% off this week: http://prly.io/x/ab3Xk2q (reply STOP to opt out)"
    );
}

#[test]
fn generic_promos_suppress_the_salutation_but_keep_the_link() {
    let template = "Flash sale: |||";
    let composed = compose_salutation(template, Some("Ann"), true);
    let body = substitute_shortlink(&composed, "http://prly.io/x/zzz1111");
    assert_eq!(body, "Flash sale: http://prly.io/x/zzz1111");
}

#[test]
fn template_without_placeholder_goes_out_verbatim() {
    let template = "Visit the store for todays deal";
    let composed = compose_salutation(template, None, false);
    assert_eq!(substitute_shortlink(&composed, "http://x/abc"), template);
}

#[test]
fn only_the_first_of_multiple_placeholders_is_replaced() {
    let body = substitute_shortlink("a ||| b ||| c", "LINK");
    assert_eq!(body, "a LINK b ||| c");
}
