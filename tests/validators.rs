//! Property tests for operator-input validation.

use proptest::prelude::*;

use arch_installer::{
    error::PasswordError,
    validate::{validate_hostname, validate_password, validate_username, MIN_PASSWORD_LEN},
};

// =============================================================================
// Hostname
// =============================================================================

proptest! {
    /// Alphanumeric ends with interior hyphens, up to 63 chars, are accepted
    #[test]
    fn well_formed_hostnames_pass(h in "[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?") {
        prop_assert!(validate_hostname(&h));
    }

    /// A leading or trailing hyphen is never accepted
    #[test]
    fn hyphen_at_either_end_fails(body in "[a-z0-9]{0,10}") {
        let leading = format!("-{}", body);
        let trailing = format!("{}-", body);
        prop_assert!(!validate_hostname(&leading));
        prop_assert!(!validate_hostname(&trailing));
    }

    /// Anything longer than 63 chars is rejected
    #[test]
    fn overlong_hostnames_fail(h in "[a-z]{64,80}") {
        prop_assert!(!validate_hostname(&h));
    }

    /// Dots, spaces and underscores are not part of the grammar
    #[test]
    fn foreign_characters_fail(a in "[a-z]{1,5}", sep in "[._ /]", b in "[a-z]{1,5}") {
        let h = format!("{}{}{}", a, sep, b);
        prop_assert!(!validate_hostname(&h));
    }
}

// =============================================================================
// Username
// =============================================================================

proptest! {
    #[test]
    fn well_formed_usernames_pass(u in "[a-z_][a-z0-9_-]{2,31}") {
        prop_assert!(validate_username(&u));
    }

    #[test]
    fn capitalised_usernames_fail(u in "[A-Z][a-z]{2,10}") {
        prop_assert!(!validate_username(&u));
    }

    #[test]
    fn too_short_usernames_fail(u in "[a-z]{1,2}") {
        prop_assert!(!validate_username(&u));
    }
}

// =============================================================================
// Password
// =============================================================================

proptest! {
    /// Length is counted in characters, so multi-byte input is fine
    #[test]
    fn long_enough_passwords_pass(p in "\\PC{6,40}") {
        prop_assert_eq!(validate_password(&p), Ok(()));
    }

    #[test]
    fn short_passwords_are_too_short(p in "\\PC{1,5}") {
        prop_assert_eq!(validate_password(&p), Err(PasswordError::TooShort));
    }
}

#[test]
fn empty_password_is_empty() {
    assert_eq!(validate_password(""), Err(PasswordError::Empty));
    assert_eq!(MIN_PASSWORD_LEN, 6);
}
