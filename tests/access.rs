//! Access resolution over rows and columns, ported against a 20x20 grid.

use tabulon::{Access, Table, Value};

const PROPERTY_ABC: &str = "abc";
const PROPERTY_DEF: &str = "def";

fn add_test_rows(table: &mut Table, n: usize) -> Vec<u64> {
    let mut idents = Vec::with_capacity(n);
    for i in 1..=n {
        let row = table.add_row(Access::Last).unwrap();
        table
            .set_row_label(row, Some(&format!("Row {} Label", i)))
            .unwrap();
        let r = table.row_mut(row).unwrap();
        r.set_description(Some(&format!("Row {} Description", i)))
            .unwrap();
        r.props_mut()
            .set_text(PROPERTY_ABC, Value::Text(format!("Row {} {}", i, PROPERTY_ABC)))
            .unwrap();
        r.props_mut()
            .set_text(PROPERTY_DEF, Value::Text(format!("Row {} {}", i, PROPERTY_DEF)))
            .unwrap();
        idents.push(row);
    }
    idents
}

fn add_test_columns(table: &mut Table, n: usize) -> Vec<u64> {
    let mut idents = Vec::with_capacity(n);
    for i in 1..=n {
        let col = table.add_column(Access::Last).unwrap();
        table
            .set_column_label(col, Some(&format!("Column {} Label", i)))
            .unwrap();
        let c = table.column_mut(col).unwrap();
        c.set_description(Some(&format!("Column {} Description", i)))
            .unwrap();
        c.props_mut()
            .set_text(
                PROPERTY_ABC,
                Value::Text(format!("Column {} {}", i, PROPERTY_ABC)),
            )
            .unwrap();
        idents.push(col);
    }
    idents
}

#[test]
fn test_every_get_mode_resolves_to_nothing_on_an_empty_table() {
    let mut t = Table::new(0, 0);
    assert_eq!(t.num_rows(), 0);
    assert_eq!(t.num_columns(), 0);

    let modes = [
        Access::First,
        Access::Last,
        Access::Next,
        Access::Previous,
        Access::Current,
        Access::ByIndex(1),
        Access::ByIdent(1),
        Access::by_label("x"),
        Access::by_description("x"),
        Access::ByUuid(tabulon::Uuid::nil()),
        Access::by_tags(["x"]),
        Access::ByUserProperty(PROPERTY_ABC.to_string(), Value::Text("x".into())),
    ];
    for access in modes {
        assert_eq!(t.get_row(access.clone()).unwrap(), None, "{:?}", access);
        assert_eq!(t.get_column(access).unwrap(), None);
    }
}

#[test]
fn test_positional_modes_over_rows() {
    let mut t = Table::new(0, 0);
    let rows = add_test_rows(&mut t, 20);
    assert_eq!(t.num_rows(), 20);

    // The cursor sits on the last added row.
    assert_eq!(t.get_row(Access::First).unwrap(), Some(rows[0]));
    // Getting First moved the cursor; restore it to the end.
    assert_eq!(t.get_row(Access::Last).unwrap(), Some(rows[19]));
    assert_eq!(t.get_row(Access::Current).unwrap(), Some(rows[19]));
    assert_eq!(t.get_row(Access::Previous).unwrap(), Some(rows[18]));
    // Previous moved the cursor to row 19 (1-based); Next returns the last.
    assert_eq!(t.get_row(Access::Next).unwrap(), Some(rows[19]));
    // At the end there is no next.
    assert_eq!(t.get_row(Access::Next).unwrap(), None);
}

#[test]
fn test_lookup_modes_over_rows() {
    let mut t = Table::new(0, 0);
    let rows = add_test_rows(&mut t, 20);

    for (i, ident) in rows.iter().enumerate() {
        let n = i + 1;
        assert_eq!(t.get_row(Access::ByIndex(n)).unwrap(), Some(*ident));
        assert_eq!(
            t.get_row(Access::by_label(format!("Row {} Label", n))).unwrap(),
            Some(*ident)
        );
        assert_eq!(t.get_row(Access::ByIdent(*ident)).unwrap(), Some(*ident));
        let uuid = t.row(*ident).unwrap().uuid();
        assert_eq!(t.get_row(Access::ByUuid(uuid)).unwrap(), Some(*ident));
        assert_eq!(
            t.get_row(Access::by_description(format!("Row {} Description", n)))
                .unwrap(),
            Some(*ident)
        );
        assert_eq!(
            t.get_row(Access::ByUserProperty(
                PROPERTY_ABC.to_string(),
                Value::Text(format!("Row {} {}", n, PROPERTY_ABC)),
            ))
            .unwrap(),
            Some(*ident)
        );
        assert_eq!(
            t.get_row(Access::ByUserProperty(
                PROPERTY_DEF.to_string(),
                Value::Text(format!("Row {} {}", n, PROPERTY_DEF)),
            ))
            .unwrap(),
            Some(*ident)
        );
    }

    // Indices stay 1..=20 in order.
    for (i, ident) in rows.iter().enumerate() {
        assert_eq!(t.row(*ident).unwrap().index(), i + 1);
    }
}

#[test]
fn test_lookup_modes_over_columns() {
    let mut t = Table::new(0, 0);
    let cols = add_test_columns(&mut t, 20);
    assert_eq!(t.num_columns(), 20);

    assert_eq!(t.get_column(Access::First).unwrap(), Some(cols[0]));
    assert_eq!(t.get_column(Access::Last).unwrap(), Some(cols[19]));

    for (i, ident) in cols.iter().enumerate() {
        let n = i + 1;
        assert_eq!(t.get_column(Access::ByIndex(n)).unwrap(), Some(*ident));
        assert_eq!(
            t.get_column(Access::by_label(format!("Column {} Label", n)))
                .unwrap(),
            Some(*ident)
        );
        assert_eq!(t.get_column(Access::ByIdent(*ident)).unwrap(), Some(*ident));
        assert_eq!(
            t.get_column(Access::by_description(format!("Column {} Description", n)))
                .unwrap(),
            Some(*ident)
        );
    }

    for (i, ident) in cols.iter().enumerate() {
        assert_eq!(t.column(*ident).unwrap().index(), i + 1);
    }
}

#[test]
fn test_out_of_range_and_zero_indexes() {
    let mut t = Table::new(0, 0);
    add_test_rows(&mut t, 3);

    assert_eq!(t.get_row(Access::ByIndex(0)).unwrap(), None);
    assert_eq!(t.get_row(Access::ByIndex(4)).unwrap(), None);
    assert_eq!(t.get_row(Access::by_label("no such row")).unwrap(), None);
}

#[test]
fn test_adding_by_ident_is_rejected() {
    let mut t = Table::new(0, 0);
    assert!(t.add_row(Access::ByIdent(42)).is_err());
    assert!(t.add_row(Access::by_tags(["x"])).is_err());
}

#[test]
fn test_adding_by_label_rejects_duplicates() {
    let mut t = Table::new(0, 0);
    let first = t.add_row(Access::by_label("totals")).unwrap();
    assert_eq!(t.row(first).unwrap().label(), Some("totals"));

    assert!(t.add_row(Access::by_label("totals")).is_err());
    assert_eq!(t.num_rows(), 1);
}

#[test]
fn test_insert_in_middle_reindexes_rows() {
    let mut t = Table::new(0, 0);
    let rows = add_test_rows(&mut t, 3);

    let inserted = t.add_row(Access::ByIndex(2)).unwrap();
    assert_eq!(t.num_rows(), 4);
    assert_eq!(t.row(inserted).unwrap().index(), 2);
    assert_eq!(t.row(rows[0]).unwrap().index(), 1);
    assert_eq!(t.row(rows[1]).unwrap().index(), 3);
    assert_eq!(t.row(rows[2]).unwrap().index(), 4);
}

#[test]
fn test_label_indexing_speeds_lookup_and_rejects_duplicates() {
    let mut t = Table::new(0, 0);
    let rows = add_test_rows(&mut t, 5);

    t.set_row_labels_indexed(true).unwrap();
    assert!(t.is_row_labels_indexed());
    assert_eq!(
        t.get_row(Access::by_label("Row 3 Label")).unwrap(),
        Some(rows[2])
    );
    // Indexed lookups are case-insensitive.
    assert_eq!(
        t.get_row(Access::by_label("row 3 label")).unwrap(),
        Some(rows[2])
    );

    // A duplicate label cannot be set while indexing is on.
    assert!(t.set_row_label(rows[0], Some("Row 3 Label")).is_err());

    // Disabling drops the index.
    t.set_row_labels_indexed(false).unwrap();
    assert!(!t.is_row_labels_indexed());
}

#[test]
fn test_enabling_label_index_with_duplicates_fails() {
    let mut t = Table::new(0, 0);
    let r1 = t.add_row(Access::Last).unwrap();
    let r2 = t.add_row(Access::Last).unwrap();
    t.set_row_label(r1, Some("same")).unwrap();
    t.set_row_label(r2, Some("same")).unwrap();

    assert!(t.set_row_labels_indexed(true).is_err());
    assert!(!t.is_row_labels_indexed());
}

#[test]
fn test_sort_rows_by_label_moves_cells_with_their_row() {
    let mut t = Table::new(0, 0);
    let col = t.add_column(Access::Last).unwrap();
    let rb = t.add_row(Access::Last).unwrap();
    let ra = t.add_row(Access::Last).unwrap();
    let unlabeled = t.add_row(Access::Last).unwrap();
    t.set_row_label(rb, Some("b")).unwrap();
    t.set_row_label(ra, Some("a")).unwrap();
    t.set_cell_value(rb, col, Some(Value::Int(2))).unwrap();
    t.set_cell_value(ra, col, Some(Value::Int(1))).unwrap();

    t.sort_rows_by_label();

    assert_eq!(t.row(ra).unwrap().index(), 1);
    assert_eq!(t.row(rb).unwrap().index(), 2);
    assert_eq!(t.row(unlabeled).unwrap().index(), 3);
    // Cells still belong to their rows.
    assert_eq!(t.cell_value(ra, col), Some(&Value::Int(1)));
    assert_eq!(t.cell_value(rb, col), Some(&Value::Int(2)));
}
