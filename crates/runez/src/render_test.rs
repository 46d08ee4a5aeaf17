// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use serial_test::serial;

use super::*;
use crate::{ActivateColors, uncolored};

fn border(text: &str) -> PrettyBorder {
    text.parse().unwrap()
}

#[rstest]
#[case(Align::Left, "a   ")]
#[case(Align::Center, " a  ")]
#[case(Align::Right, "   a")]
fn test_align(#[case] align: Align, #[case] expected: &str) {
    assert_eq!(align.aligned("a", 4), expected);
    assert_eq!(align.aligned("abcdef", 4), "abcdef");
}

#[rstest]
#[serial]
fn test_align_colored() {
    let _colors = ActivateColors::new(true);
    let text = crate::colors::red("a");
    let aligned = Align::Right.aligned(&text, 3);
    assert_eq!(uncolored(&aligned), "  a");
}

#[rstest]
fn test_parse_align() {
    assert_eq!("RIGHT".parse::<Align>().unwrap(), Align::Right);
    assert_eq!("center".parse::<Align>().unwrap(), Align::Center);
    let err = "diagonal".parse::<Align>().unwrap_err();
    assert!(err.to_string().contains("Invalid horizontal alignment 'diagonal'"));
}

#[rstest]
fn test_parse_border() {
    assert_eq!(border("empty"), PrettyBorder::default());
    assert_eq!(border(""), PrettyBorder::default());

    let grid = border("rstgrid");
    assert_eq!(grid.top, Some(BorderChars::from("+++-")));
    assert_eq!(grid.header, Some(BorderChars::from("+++=")));
    assert_eq!(grid.cell.mid, "|");
    assert_eq!(grid.mid, None);

    let ascii = border("ascii");
    assert_eq!(ascii.top, Some(BorderChars::from("+++=")));
    assert_eq!(ascii.mid, Some(BorderChars::from("+++-")));

    let custom = border("colon,pad:2,hc:<|>");
    assert_eq!(custom.pad, 2);
    assert_eq!(custom.cell, BorderChars::from(" : "));
    assert_eq!(custom.cell.h, "");
    assert_eq!(custom.header_cell.unwrap().last, ">");
}

#[rstest]
#[case("foo", "Invalid border 'foo'")]
#[case("x:abc", "Invalid border line 'x'")]
#[case("pad:x", "Invalid border pad 'x'")]
fn test_parse_border_invalid(#[case] text: &str, #[case] expected: &str) {
    let err = text.parse::<PrettyBorder>().unwrap_err();
    assert!(err.to_string().contains(expected), "{err}");
}

#[rstest]
fn test_table_no_border() {
    let mut table = PrettyTable::with_header(["a", "bb"]);
    table.add_row(["xyz", "1"]);
    assert_eq!(table.to_string(), " a    bb\n xyz  1");
    assert_eq!(table.rows().len(), 1);
}

#[rstest]
fn test_table_mysql() {
    let mut table = PrettyTable::with_header(["Name", "Size"]);
    table.border = border("mysql");
    table.column_by_title("Size").unwrap().align = Some(Align::Right);
    table.add_rows([["foo", "10"], ["bar", "1234"]]);
    let expected = [
        "+------+------+",
        "| Name | Size |",
        "+------+------+",
        "| foo  |   10 |",
        "| bar  | 1234 |",
        "+------+------+",
    ];
    assert_eq!(table.to_string(), expected.join("\n"));
    assert!(table.column_by_title("missing").is_none());
}

#[rstest]
fn test_table_row_separators() {
    let mut table = PrettyTable::new(1);
    table.border = border("framed");
    table.add_row(["a"]);
    table.add_row(["b"]);
    assert_eq!(table.to_string(), "┍━━━┑\n│ a │\n┝━━━┥\n│ b │\n┕━━━┙");
}

#[rstest]
fn test_table_missing_and_hidden() {
    let mut table = PrettyTable::new(3);
    table.border = border("c:|||,pad:0");
    table.add_row(["a", "b", "c"]);
    table.add_row(["d"]);
    table.column_mut(1).shown = false;
    assert_eq!(table.to_string(), "|a|c|\n|d|-|");

    table.missing = "?".to_string();
    table.column_mut(1).shown = true;
    assert_eq!(table.to_string(), "|a|b|c|\n|d|?|?|");
}

#[rstest]
fn test_table_header() {
    let mut table = PrettyTable::with_header(["x"]);
    table.border = border("c:|||,pad:0");
    table.add_row([1, 2]);
    assert_eq!(table.columns.len(), 2);
    assert_eq!(table.to_string(), "|x|-|\n|1|2|");

    table.show_header = false;
    assert_eq!(table.to_string(), "|1|2|");
}

#[rstest]
#[serial]
fn test_two_column_diagnostics() {
    let _colors = ActivateColors::new(false);
    let rows = vec![
        ("platform".to_string(), "linux".to_string()),
        ("pid".to_string(), "123".to_string()),
    ];
    assert_eq!(
        PrettyTable::two_column_diagnostics(&rows, Some("colon"), 80).unwrap(),
        "  platform : linux\n       pid : 123"
    );

    let rows = vec![("key".to_string(), "a very long value here".to_string())];
    assert_eq!(
        PrettyTable::two_column_diagnostics(&rows, Some("colon"), 20).unwrap(),
        "  key : a very lo..."
    );
    assert!(PrettyTable::two_column_diagnostics(&rows, Some("bogus"), 20).is_err());

    // SAFETY: tests touching env vars are serialized
    unsafe { std::env::set_var("DIAGNOSTICS_BORDER", "github") };
    let rows = vec![("a".to_string(), "b".to_string())];
    let rendered = PrettyTable::two_column_diagnostics(&rows, None, 80);
    unsafe { std::env::remove_var("DIAGNOSTICS_BORDER") };
    assert_eq!(rendered.unwrap(), "| a | b |");
}
