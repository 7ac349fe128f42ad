mod common;

use std::cell::RefCell;

use coolbril::analysis;
use coolbril::errors::{Diagnostics, Level};
use coolbril::position::HasSpan;
use pretty_assertions::assert_eq;

use self::common::parse;

#[test]
fn test_levels() {
    let mut diagnostics = Diagnostics::new();

    diagnostics.info().with_message("starting").emit();
    diagnostics.warn().with_message("suspicious").emit();
    assert!(!diagnostics.has_errors());

    diagnostics.error().with_message("broken").emit();
    assert!(diagnostics.has_errors());

    let levels = diagnostics
        .into_vec()
        .into_iter()
        .map(|diagnostic| diagnostic.level)
        .collect::<Vec<_>>();

    assert_eq!(levels, [Level::Info, Level::Warn, Level::Error]);
}

#[test]
fn test_error_fills_in_span_and_message() {
    let classes = parse("class Main { main() : Int { missing }; };");
    let error = analysis::typeck(&classes).unwrap_err();
    let span = error.span().into_owned();
    let message = error.to_string();

    let mut diagnostics = Diagnostics::new();
    diagnostics.error().with_span_and_error(error).emit();

    let diagnostic = diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.message.span, Some(span));
    assert_eq!(diagnostic.message.message, message);
    assert!(diagnostic.source.is_some());
}

#[test]
fn test_emitter_sees_every_diagnostic() {
    let seen = RefCell::new(vec![]);

    {
        let mut diagnostics = Diagnostics::new();
        diagnostics.set_emitter(Box::new(|diagnostic| {
            seen.borrow_mut().push(diagnostic.message.message.clone());
        }));

        diagnostics.warn().with_message("first").emit();
        diagnostics.fatal().with_message("second".to_owned()).emit();
        assert!(diagnostics.has_errors());
    }

    assert_eq!(seen.into_inner(), ["first", "second"]);
}
