// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use serial_test::serial;

use super::*;

#[rstest]
fn test_abort_fatal() {
    let result: Result<i32> = abort("something went wrong", &Policy::fatal(), 5);
    match result {
        Err(Error::Aborted { message, code }) => {
            assert_eq!(message, "something went wrong");
            assert_eq!(code, 1);
        }
        other => panic!("expected an abort, got {other:?}"),
    }
}

#[rstest]
#[case(Policy::lenient())]
#[case(Policy::quiet())]
#[case(Policy::fatal().with_fatal(Fatal::Log).with_logger(Chatter::Silent))]
fn test_abort_non_fatal(#[case] policy: Policy) {
    let result = abort("oops", &policy, -1).unwrap();
    assert_eq!(result, -1);
}

#[rstest]
fn test_abort_with_code() {
    let err = abort_with_code("exited", 3, &Policy::fatal(), ()).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert_eq!(err.to_string(), "exited");
}

#[rstest]
fn test_abort_if() {
    assert!(abort_if(false, "fine").is_ok());
    let err = abort_if(true, "not fine").unwrap_err();
    assert_eq!(err.to_string(), "not fine");
}

#[rstest]
#[serial]
fn test_hdry() {
    let prior = crate::set_dryrun(false);
    let policy = Policy::default();
    assert!(!hdry(&policy, "do something"));
    assert!(hdry(&policy.with_dryrun(true), "do something"));

    crate::set_dryrun(true);
    assert!(hdry(&policy, "do something"));
    assert!(!hdry(&policy.with_dryrun(false), "do something"));
    assert!(hdry(&Policy::quiet(), "do something quietly"));
    crate::set_dryrun(prior);
}

#[rstest]
fn test_policy_builders() {
    let policy = Policy::quiet();
    assert_eq!(policy.fatal, Fatal::Quiet);
    assert_eq!(policy.logger, Chatter::Silent);
    assert_eq!(policy.dryrun, None);

    let policy = Policy::lenient().with_logger(Chatter::Print).with_dryrun(true);
    assert_eq!(policy.fatal, Fatal::Log);
    assert_eq!(policy.logger, Chatter::Print);
    assert!(policy.is_dryrun());
}

#[rstest]
#[case(Outcome::Done, 1)]
#[case(Outcome::NoOp, 0)]
#[case(Outcome::Failed, -1)]
fn test_outcome_code(#[case] outcome: Outcome, #[case] expected: i32) {
    assert_eq!(outcome.code(), expected);
    assert_eq!(outcome.is_failed(), expected < 0);
}
