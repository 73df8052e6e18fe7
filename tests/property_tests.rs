/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use rust_roleta_api::acesso::{constant_time_compare, digest_token, Papel};
use rust_roleta_api::validacao::{is_valid_email, normalizar_tel_cliente, validate_br_phone};

// Property: Email validation should never panic
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn emails_with_repeated_digits_rejected(
        repeat_pattern in prop::sample::select(vec!["999999", "111111", "000000", "123456789"]),
        local_prefix in "[a-z]{1,5}",
        domain in "[a-z]{3,10}",
        tld in "[a-z]{2,3}"
    ) {
        let email = format!("{}{}@{}.{}", local_prefix, repeat_pattern, domain, tld);
        let result = is_valid_email(&email);
        prop_assert!(!result, "Email with fake pattern should be rejected: {}", email);
    }
}

// Property: Phone validation should never panic, and valid numbers always
// normalize to a Brazilian E.164 string
proptest! {
    #[test]
    fn phone_validation_never_panics(phone in "\\PC*") {
        let _ = validate_br_phone(&phone);
    }

    #[test]
    fn valid_br_phones_normalize_to_e164(ddd in 11u8..=99u8, number in 900000000u32..=999999999u32) {
        let phone = format!("{}{}", ddd, number);
        let (valid, normalized) = validate_br_phone(&phone);
        if valid {
            prop_assert!(normalized.starts_with("+55"));
            prop_assert!(normalized[1..].chars().all(|c| c.is_ascii_digit()));
            prop_assert!(normalized.len() >= 13 && normalized.len() <= 14);
        }
    }

    #[test]
    fn normalization_never_loses_the_phone(phone in "\\PC{1,20}") {
        // Whatever comes in, something comes out: either the E.164 form or
        // the original string untouched.
        let out = normalizar_tel_cliente(Some(phone.clone())).unwrap();
        let (valid, normalized) = validate_br_phone(&phone);
        if valid {
            prop_assert_eq!(out, normalized);
        } else {
            prop_assert_eq!(out, phone);
        }
    }
}

// Property: credential digests are stable hex and compare like equality
proptest! {
    #[test]
    fn digest_is_always_64_hex_chars(token in "\\PC*") {
        let digest = digest_token(&token);
        prop_assert_eq!(digest.len(), 64);
        prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_is_deterministic(token in "\\PC*") {
        prop_assert_eq!(digest_token(&token), digest_token(&token));
    }

    #[test]
    fn constant_time_compare_matches_equality(a in "[a-f0-9]{0,64}", b in "[a-f0-9]{0,64}") {
        prop_assert_eq!(constant_time_compare(&a, &b), a == b);
    }
}

// Property: city scoping is consistent between the boolean check and the
// SQL filter projection
proptest! {
    #[test]
    fn gerente_scope_matches_its_filter(
        cidades in prop::collection::vec("[A-Z][a-z]{2,10}", 0..5),
        consulta in "[A-Z][a-z]{2,10}"
    ) {
        let papel = Papel::Gerente { cidades: cidades.clone() };
        let autorizada = papel.autoriza_cidade(&consulta);
        let filtro = papel.cidades_permitidas().expect("gerente is always scoped");
        prop_assert_eq!(autorizada, filtro.contains(&consulta));
    }

    #[test]
    fn diretoria_is_never_filtered(consulta in "[A-Z][a-z]{2,10}") {
        let papel = Papel::Diretoria;
        prop_assert!(papel.autoriza_cidade(&consulta));
        prop_assert_eq!(papel.cidades_permitidas(), None);
    }
}
