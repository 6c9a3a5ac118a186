//! Group membership, effective rows/columns, and cell counts.

use tabulon::{Access, ElementRef, Table, TableError};

#[test]
fn test_create_group() {
    let mut t = Table::new(10, 10);
    assert_eq!(t.num_groups(), 0);

    let g = t.add_group().unwrap();
    assert_eq!(t.num_groups(), 1);

    let group = t.group(g).unwrap();
    assert_eq!(group.num_rows(), 0);
    assert_eq!(group.num_columns(), 0);
    assert_eq!(group.num_groups(), 0);
    assert_eq!(t.group_num_cells(g).unwrap(), 0);

    t.delete_group(g).unwrap();
    assert_eq!(t.num_groups(), 0);
    assert!(t.group(g).is_err());
}

#[test]
fn test_grouped_rows() {
    let mut t = Table::new(100, 100);
    let g = t.add_group().unwrap();

    // A group cannot contain itself.
    let err = t.group_add(g, ElementRef::Group(g)).unwrap_err();
    assert!(matches!(err, TableError::Invalid { .. }));

    let r1 = t.add_row(Access::Last).unwrap();
    let r2 = t.add_row(Access::Last).unwrap();
    let r3 = t.add_row(Access::Last).unwrap();

    assert!(t
        .group_update(
            g,
            &[
                ElementRef::Row(r1),
                ElementRef::Row(r2),
                ElementRef::Row(r3),
            ],
        )
        .unwrap());
    assert_eq!(t.group(g).unwrap().num_rows(), 3);
    assert!(t.group(g).unwrap().contains_row(r1));
    assert!(t.group(g).unwrap().contains_row(r2));
    assert!(t.group(g).unwrap().contains_row(r3));

    // Re-adding changes nothing.
    assert!(!t.group_add(g, ElementRef::Row(r1)).unwrap());

    let r1_groups = t.groups_containing(ElementRef::Row(r1));
    assert_eq!(r1_groups, vec![g]);

    // Elements of another table are rejected.
    let mut t2 = Table::new(100, 100);
    let foreign = t2.add_row(Access::Last).unwrap();
    let err = t.group_add(g, ElementRef::Row(foreign)).unwrap_err();
    assert!(matches!(err, TableError::InvalidParent { .. }));

    t.group_remove(g, ElementRef::Row(r1)).unwrap();
    assert_eq!(t.group(g).unwrap().num_rows(), 2);

    t.group_remove(g, ElementRef::Row(r2)).unwrap();
    t.group_remove(g, ElementRef::Row(r3)).unwrap();
    assert_eq!(t.group(g).unwrap().num_rows(), 0);
}

#[test]
fn test_nested_group_cycle_is_rejected() {
    let mut t = Table::new(0, 0);
    let outer = t.add_group().unwrap();
    let inner = t.add_group().unwrap();

    t.group_add(outer, ElementRef::Group(inner)).unwrap();
    let err = t.group_add(inner, ElementRef::Group(outer)).unwrap_err();
    assert!(matches!(err, TableError::Invalid { .. }));
}

#[test]
fn test_effective_elements() {
    let mut t = Table::new(0, 0);
    let r: Vec<u64> = (0..5).map(|_| t.add_row(Access::Last).unwrap()).collect();
    let c: Vec<u64> = (0..3)
        .map(|_| t.add_column(Access::Last).unwrap())
        .collect();

    let g = t.add_group().unwrap();

    // Columns only: every table row is effective.
    t.group_add(g, ElementRef::Column(c[0])).unwrap();
    t.group_add(g, ElementRef::Column(c[1])).unwrap();
    assert_eq!(t.group_effective_columns(g).unwrap().len(), 2);
    assert_eq!(t.group_effective_rows(g).unwrap().len(), 5);
    assert_eq!(t.group_num_cells(g).unwrap(), 5 * 2);

    // One explicit row narrows the effective rows to it.
    t.group_add(g, ElementRef::Row(r[1])).unwrap();
    assert_eq!(t.group_effective_rows(g).unwrap().len(), 1);
    assert_eq!(t.group_num_cells(g).unwrap(), 2);

    // Two more rows.
    t.group_add(g, ElementRef::Row(r[0])).unwrap();
    t.group_add(g, ElementRef::Row(r[3])).unwrap();
    assert_eq!(t.group_effective_rows(g).unwrap().len(), 3);
    assert_eq!(t.group_num_cells(g).unwrap(), 3 * 2);

    // Without explicit columns, every table column is effective.
    t.group_remove(g, ElementRef::Column(c[0])).unwrap();
    t.group_remove(g, ElementRef::Column(c[1])).unwrap();
    assert_eq!(t.group_effective_columns(g).unwrap().len(), 3);
    assert_eq!(t.group_num_cells(g).unwrap(), 3 * 3);
}

#[test]
fn test_group_cell_count_includes_subgroups_and_explicit_cells() {
    let mut t = Table::new(0, 0);
    let r1 = t.add_row(Access::Last).unwrap();
    let r2 = t.add_row(Access::Last).unwrap();
    let c1 = t.add_column(Access::Last).unwrap();
    let c2 = t.add_column(Access::Last).unwrap();

    let inner = t.add_group().unwrap();
    t.group_add(inner, ElementRef::Row(r1)).unwrap();
    t.group_add(inner, ElementRef::Column(c1)).unwrap();
    assert_eq!(t.group_num_cells(inner).unwrap(), 1);

    let outer = t.add_group().unwrap();
    t.group_add(outer, ElementRef::Group(inner)).unwrap();
    // Materialize a cell and add it explicitly.
    t.set_cell_value(r2, c2, Some(tabulon::Value::Int(9)))
        .unwrap();
    let key = t.cell_key(r2, c2).unwrap();
    t.group_add(
        outer,
        ElementRef::Cell {
            column: key.0,
            offset: key.1,
        },
    )
    .unwrap();

    assert_eq!(t.group_num_cells(outer).unwrap(), 1 + 1);
}

#[test]
fn test_table_shape_changes_invalidate_group_cell_counts() {
    let mut t = Table::new(0, 0);
    let c1 = t.add_column(Access::Last).unwrap();
    t.add_row(Access::Last).unwrap();

    let g = t.add_group().unwrap();
    t.group_add(g, ElementRef::Column(c1)).unwrap();
    assert_eq!(t.group_num_cells(g).unwrap(), 1);

    t.add_row(Access::Last).unwrap();
    assert_eq!(t.group_num_cells(g).unwrap(), 2);

    let r = t.get_row(Access::First).unwrap().unwrap();
    t.delete_row(r).unwrap();
    assert_eq!(t.group_num_cells(g).unwrap(), 1);
}

#[test]
fn test_deleted_row_disappears_from_groups() {
    let mut t = Table::new(0, 0);
    let r1 = t.add_row(Access::Last).unwrap();
    let r2 = t.add_row(Access::Last).unwrap();
    let g = t.add_group().unwrap();
    t.group_add(g, ElementRef::Row(r1)).unwrap();
    t.group_add(g, ElementRef::Row(r2)).unwrap();
    assert_eq!(t.group(g).unwrap().num_rows(), 2);

    t.delete_row(r1).unwrap();
    assert_eq!(t.group(g).unwrap().num_rows(), 1);
    assert!(!t.group(g).unwrap().contains_row(r1));
}

#[test]
fn test_group_deletion_leaves_members_untouched() {
    let mut t = Table::new(0, 0);
    let r1 = t.add_row(Access::Last).unwrap();
    let g = t.add_group().unwrap();
    t.group_add(g, ElementRef::Row(r1)).unwrap();

    t.delete_group(g).unwrap();
    assert!(t.row(r1).is_ok());
}

#[test]
fn test_group_lookup_by_label() {
    let mut t = Table::new(0, 0);
    let g1 = t.add_group().unwrap();
    let g2 = t.add_group().unwrap();
    t.set_group_label(g1, Some("evens")).unwrap();
    t.set_group_label(g2, Some("odds")).unwrap();

    assert_eq!(
        t.get_group(&Access::by_label("odds")).unwrap(),
        Some(g2)
    );
    assert_eq!(t.get_group(&Access::by_label("primes")).unwrap(), None);

    t.set_group_labels_indexed(true).unwrap();
    assert_eq!(
        t.get_group(&Access::by_label("EVENS")).unwrap(),
        Some(g1)
    );
}
