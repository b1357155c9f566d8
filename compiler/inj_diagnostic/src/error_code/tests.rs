use super::*;
use pretty_assertions::assert_eq;

#[test]
fn all_variants_classified() {
    for code in ErrorCode::ALL {
        let phases = [
            code.is_resolution_error(),
            code.is_metadata_error(),
            code.is_internal_error(),
        ];
        assert_eq!(
            phases.iter().filter(|p| **p).count(),
            1,
            "{code} must belong to exactly one phase"
        );
    }
}

#[test]
fn as_str_matches_debug_name() {
    for code in ErrorCode::ALL {
        assert_eq!(code.as_str(), format!("{code:?}"));
    }
}

#[test]
fn descriptions_are_nonempty() {
    for code in ErrorCode::ALL {
        assert!(!code.description().is_empty());
    }
}
