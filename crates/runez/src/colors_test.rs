// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use serial_test::serial;

use super::*;

#[rstest]
fn test_cast_color() {
    assert!(cast_color("red").is_some());
    assert!(cast_color("teal").is_some());
    assert_eq!(cast_color("plain"), None);
    assert_eq!(cast_color("bold"), None);
    assert_eq!(cast_color("no-such-color"), None);
    for (name, _) in COLORS.iter().filter(|(n, _)| *n != "plain") {
        assert!(cast_color(name).is_some(), "{name}");
    }
}

#[rstest]
#[serial]
fn test_coloring_off() {
    let _colors = ActivateColors::new(false);
    assert!(!is_coloring());
    assert_eq!(red("foo"), "foo");
    assert_eq!(bold("foo"), "foo");
    assert_eq!(colored_bg("foo", "blue"), "foo");
    assert_eq!(adjusted_size("foo", 10), 10);
}

#[rstest]
#[serial]
fn test_coloring_on() {
    let _colors = ActivateColors::new(true);
    assert!(is_coloring());
    let text = red("foo");
    assert_ne!(text, "foo");
    assert!(text.contains("foo"));
    assert_eq!(uncolored(&text), "foo");
    assert_eq!(adjusted_size(&text, 10), 10 + text.len() - 3);

    assert!(bold("foo").starts_with("\x1b[1m"));
    assert_eq!(uncolored(&underline("foo")), "foo");
    assert_ne!(colored_bg("foo", "blue"), "foo");
    assert_eq!(colored("foo", "plain"), "foo");
    assert_eq!(colored("foo", "no-such-color"), "foo");
    assert_eq!(colored("", "red"), "");
}

#[rstest]
#[serial]
fn test_activate_colors() {
    let initial = is_coloring();
    {
        let _outer = ActivateColors::new(true);
        assert!(activate_colors(Some(false)));
        assert!(!is_coloring());
        {
            let _inner = ActivateColors::new(true);
            assert!(is_coloring());
        }
        assert!(!is_coloring());
    }
    assert_eq!(is_coloring(), initial);
}

#[rstest]
#[serial]
fn test_flavor_detect() {
    let prior = std::env::var("COLORTERM").ok();
    // SAFETY: tests touching env vars are serialized
    unsafe { std::env::set_var("COLORTERM", "truecolor") };
    assert_eq!(Flavor::detect(), Flavor::TrueColor);
    unsafe { std::env::set_var("COLORTERM", "") };
    assert_eq!(Flavor::detect(), Flavor::Ansi16);
    unsafe {
        match prior {
            Some(value) => std::env::set_var("COLORTERM", value),
            None => std::env::remove_var("COLORTERM"),
        }
    }
}
