// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pads_columns_to_the_widest_cell() {
    let mut table = Table::new(&["PROC", "SUBJECT"]);
    table.row(vec!["bids".into(), "sub-0001".into()]);
    table.row(vec!["freesurfer".into(), "sub-2".into()]);

    assert_eq!(
        table.render(),
        "PROC        SUBJECT\n\
         bids        sub-0001\n\
         freesurfer  sub-2\n"
    );
}

#[test]
fn short_rows_render_with_empty_cells() {
    let mut table = Table::new(&["A", "B"]);
    table.row(vec!["x".into()]);
    assert_eq!(table.render(), "A  B\nx\n");
}

#[test]
fn empty_table_is_just_the_header() {
    let table = Table::new(&["A"]);
    assert!(table.is_empty());
    assert_eq!(table.render(), "A\n");
}
