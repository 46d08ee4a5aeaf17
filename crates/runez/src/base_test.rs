// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use rstest::rstest;
use serial_test::serial;

use super::*;

#[rstest]
#[serial]
fn test_dryrun_flag() {
    let prior = set_dryrun(true);
    assert!(is_dryrun());
    assert!(resolved_dryrun(None));
    assert!(!resolved_dryrun(Some(false)));

    assert!(set_dryrun(false));
    assert!(!is_dryrun());
    assert!(resolved_dryrun(Some(true)));
    set_dryrun(prior);
}

#[rstest]
#[serial]
fn test_anchored_scope() {
    assert!(Anchored::paths().is_empty());
    {
        let _anchor = Anchored::scoped(["/tmp/project"]);
        assert_eq!(Anchored::paths(), vec!["/tmp/project"]);
        assert_eq!(short("/tmp/project/src/lib.rs"), "src/lib.rs");
        assert_eq!(short("/tmp/project"), "/tmp/project");
        {
            let _nested = Anchored::scoped(["/tmp/project/sub"]);
            // Longer anchors apply first
            assert_eq!(short("/tmp/project/sub/foo"), "foo");
            assert_eq!(short("/tmp/project/other/foo"), "other/foo");
        }
        assert_eq!(short("/tmp/project/sub/foo"), "sub/foo");
    }
    assert!(Anchored::paths().is_empty());
    assert_eq!(short("/tmp/project/src/lib.rs"), "/tmp/project/src/lib.rs");
}

#[rstest]
#[serial]
fn test_anchored_set_add_pop() {
    Anchored::set(["/a", "/b", "/a"]);
    assert_eq!(Anchored::paths(), vec!["/b", "/a"]);

    Anchored::add(["/c"]);
    assert_eq!(Anchored::paths(), vec!["/c", "/b", "/a"]);
    assert_eq!(quoted(["/a/x", "/c/y z"]), "x \"y z\"");

    Anchored::pop(["/b", "/c"]);
    assert_eq!(Anchored::paths(), vec!["/a"]);

    Anchored::set(Vec::<PathBuf>::new());
    assert!(Anchored::paths().is_empty());
}

#[rstest]
#[case("/usr/bin/../lib", "/usr/lib")]
#[case("/usr/./bin", "/usr/bin")]
#[case("", "")]
#[case("<tmp>/foo", "<tmp>/foo")]
fn test_resolved_path(#[case] given: &str, #[case] expected: &str) {
    assert_eq!(resolved_path(given, None), PathBuf::from(expected));
}

#[rstest]
fn test_resolved_path_base() {
    let base = Path::new("/opt/base");
    assert_eq!(resolved_path("foo/bar", Some(base)), PathBuf::from("/opt/base/foo/bar"));
    assert_eq!(resolved_path("../foo", Some(base)), PathBuf::from("/opt/foo"));
    assert_eq!(resolved_path("/etc", Some(base)), PathBuf::from("/etc"));
}

#[rstest]
#[serial]
fn test_short() {
    assert_eq!(short_to("  some   text\n with spaces ", Some(0)), "some text with spaces");
    assert_eq!(short_to("hello world", Some(8)), "hello...");
    assert_eq!(short_to(42, Some(0)), "42");
}

#[rstest]
#[case("hello", 10, "hello")]
#[case("hello world", 5, "he...")]
#[case("hello world", 0, "hello world")]
#[case("abc", 2, "...")]
fn test_shortened(#[case] text: &str, #[case] size: usize, #[case] expected: &str) {
    assert_eq!(shortened(text, size), expected);
}

#[rstest]
fn test_uncolored() {
    assert_eq!(uncolored("\x1b[1mbold\x1b[0m text"), "bold text");
    assert_eq!(uncolored("\x1b[38;2;255;0;0mred\x1b[0m"), "red");
    assert_eq!(uncolored("plain"), "plain");
}

#[rstest]
#[serial]
fn test_quoted() {
    assert_eq!(quoted(["ls", "-l"]), "ls -l");
    assert_eq!(quoted(["echo", "hello world"]), "echo \"hello world\"");
    assert_eq!(quoted(["echo", "say \"hi\" now"]), "echo 'say \"hi\" now'");
    assert_eq!(quoted(Vec::<String>::new()), "");
}

#[rstest]
fn test_joined() {
    assert_eq!(joined([1, 2, 3], ", "), "1, 2, 3");
    assert_eq!(joined(["a"], "-"), "a");
}

#[rstest]
fn test_flattened() {
    let values = [Some("a b"), None, Some(""), Some(" c "), Some("a b")];
    assert_eq!(flattened(values, &Flatten::default()), vec!["a b", " c ", "a b"]);

    let options = Flatten {
        keep_empty: true,
        none: Some("-".to_string()),
        ..Default::default()
    };
    assert_eq!(flattened(values, &options), vec!["a b", "-", "", " c ", "a b"]);

    let options = Flatten {
        split: Some(Split::Whitespace),
        unique: true,
        ..Default::default()
    };
    assert_eq!(flattened(values, &options), vec!["a", "b", "c"]);

    let options = Flatten {
        split: Some(Split::On(',')),
        ..Default::default()
    };
    assert_eq!(flattened([Some("x, y,,z")], &options), vec!["x", "y", "z"]);

    let options = Flatten {
        strip: true,
        ..Default::default()
    };
    assert_eq!(flattened([Some(" c "), Some("  ")], &options), vec!["c"]);
}

#[rstest]
fn test_shellified() {
    let args = shellified([Some("cmd"), Some("--foo"), None, Some("--bar"), Some("1")]);
    assert_eq!(args, vec!["cmd", "--bar", "1"]);
    let args = shellified([Some("cmd"), Some("positional"), None]);
    assert_eq!(args, vec!["cmd", "positional"]);
}

#[rstest]
fn test_first_line() {
    assert_eq!(first_line("\n  \n hello \nworld", false), Some("hello"));
    assert_eq!(first_line("\nhello", true), Some(""));
    assert_eq!(first_line("  ", false), None);
    assert_eq!(first_line("", true), None);
}

#[rstest]
fn test_capped() {
    assert_eq!(capped(5, Some(1), Some(10)), 5);
    assert_eq!(capped(0, Some(1), Some(10)), 1);
    assert_eq!(capped(20, Some(1), Some(10)), 10);
    assert_eq!(capped(20, None, None), 20);
    assert_eq!(capped(0.5, Some(1.0), None), 1.0);
}

#[rstest]
fn test_decode() {
    assert_eq!(decode(b"  hello\n", true), "hello");
    assert_eq!(decode(b"  hello\n", false), "  hello\n");
    assert_eq!(decode(&[0x68, 0xff, 0x69], false), "h\u{fffd}i");
}
