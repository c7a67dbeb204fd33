//! Integration tests for Error types
//!
//! Tests error construction, display, context, and stable codes.

use plotline_foundation::{Error, ErrorCode, ErrorContext, ErrorKind};

// =============================================================================
// Error Codes
// =============================================================================

#[test]
fn every_kind_has_a_stable_code() {
    let cases = [
        (Error::not_found("blk_1"), ErrorCode::NotFound),
        (Error::invalid_state("blk_1", "Loading", "update block details"), ErrorCode::InvalidState),
        (Error::cannot_perform_on_root("delete"), ErrorCode::CannotPerformOnRoot),
        (Error::cyclic("a", "b"), ErrorCode::CyclicOperation),
        (Error::bad_request("has children"), ErrorCode::BadRequest),
        (Error::internal("id collision"), ErrorCode::Error),
        (Error::new(ErrorKind::Serialization("eof".into())), ErrorCode::Error),
        (Error::new(ErrorKind::Io("denied".into())), ErrorCode::Error),
    ];
    for (err, code) in cases {
        assert_eq!(err.code(), code, "{err}");
    }
}

// =============================================================================
// Error Display
// =============================================================================

#[test]
fn not_found_names_the_block() {
    let err = Error::not_found("blk_42");
    assert!(format!("{err}").contains("blk_42"));
}

#[test]
fn cyclic_names_both_blocks() {
    let msg = format!("{}", Error::cyclic("blk_a", "blk_b"));
    assert!(msg.contains("blk_a"));
    assert!(msg.contains("blk_b"));
}

#[test]
fn code_display_is_the_variant_name() {
    assert_eq!(ErrorCode::CannotPerformOnRoot.to_string(), "CannotPerformOnRoot");
    assert_eq!(ErrorCode::Error.to_string(), "Error");
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn context_is_attached() {
    let err = Error::not_found("blk_1").with_context(
        ErrorContext::new()
            .with_operation("move_block_manually")
            .with_block("blk_1"),
    );
    let ctx = err.context.as_ref().unwrap();
    assert_eq!(ctx.operation.as_deref(), Some("move_block_manually"));
    assert_eq!(ctx.to_string(), "in move_block_manually on block blk_1");
    assert_eq!(err.code(), ErrorCode::NotFound);
}
