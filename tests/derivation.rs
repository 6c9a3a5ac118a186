//! Derivation registration, affects edges, cycle rejection, recalculation.

use std::cell::RefCell;
use std::rc::Rc;

use tabulon::{
    Access, Derivation, ElementRef, EventType, Table, TableElementEvent, TableError, Value,
};

fn cell_ref(t: &Table, row: u64, col: u64) -> ElementRef {
    let (column, offset) = t.cell_key(row, col).unwrap();
    ElementRef::Cell { column, offset }
}

/// A 2x2 grid with every cell materialized.
fn grid() -> (Table, Vec<u64>, Vec<u64>) {
    let mut t = Table::new(0, 0);
    let rows: Vec<u64> = (0..2).map(|_| t.add_row(Access::Last).unwrap()).collect();
    let cols: Vec<u64> = (0..2).map(|_| t.add_column(Access::Last).unwrap()).collect();
    for r in &rows {
        for c in &cols {
            t.set_cell_value(*r, *c, Some(Value::Int(0))).unwrap();
        }
    }
    (t, rows, cols)
}

#[test]
fn test_register_and_clear_derivation() {
    let (mut t, rows, cols) = grid();
    let target = cell_ref(&t, rows[0], cols[0]);
    let source = cell_ref(&t, rows[1], cols[0]);

    assert!(t.derivation(target).is_none());
    let previous = t
        .set_derivation(target, Derivation::labeled("mirror"), &[source])
        .unwrap();
    assert!(previous.is_none());

    assert!(t.derivation(target).is_some());
    assert_eq!(t.derived_elements(), vec![target]);
    assert!(t.cell(rows[0], cols[0]).unwrap().is_derived());
    assert_eq!(t.affects(source), vec![target]);

    let removed = t.clear_derivation(target);
    assert!(removed.is_some());
    assert!(t.derivation(target).is_none());
    assert!(t.affects(source).is_empty());
    assert!(!t.cell(rows[0], cols[0]).unwrap().is_derived());
}

#[test]
fn test_rows_and_columns_can_be_derived_but_groups_cannot() {
    let (mut t, rows, cols) = grid();

    t.set_derivation(
        ElementRef::Column(cols[1]),
        Derivation::new(),
        &[ElementRef::Column(cols[0])],
    )
    .unwrap();
    assert!(t.column(cols[1]).unwrap().is_derived());

    t.set_derivation(
        ElementRef::Row(rows[1]),
        Derivation::new(),
        &[ElementRef::Row(rows[0])],
    )
    .unwrap();
    assert!(t.row(rows[1]).unwrap().is_derived());

    let g = t.add_group().unwrap();
    let err = t
        .set_derivation(ElementRef::Group(g), Derivation::new(), &[])
        .unwrap_err();
    assert!(matches!(err, TableError::Unsupported { .. }));
}

#[test]
fn test_cycles_are_rejected() {
    let (mut t, rows, cols) = grid();
    let a = cell_ref(&t, rows[0], cols[0]);
    let b = cell_ref(&t, rows[0], cols[1]);
    let c = cell_ref(&t, rows[1], cols[0]);

    // Direct self-reference.
    let err = t.set_derivation(a, Derivation::new(), &[a]).unwrap_err();
    assert!(matches!(err, TableError::CircularDependency));

    // a <- b <- c <- a.
    t.set_derivation(a, Derivation::new(), &[b]).unwrap();
    t.set_derivation(b, Derivation::new(), &[c]).unwrap();
    let err = t.set_derivation(c, Derivation::new(), &[a]).unwrap_err();
    assert!(matches!(err, TableError::CircularDependency));

    // The rejected registration left no traces.
    assert!(t.derivation(c).is_none());
    assert!(!t.cell(rows[1], cols[0]).unwrap().is_derived());
}

#[test]
fn test_affects_includes_row_and_column_indirects_for_cells() {
    let (mut t, rows, cols) = grid();
    let source = cell_ref(&t, rows[0], cols[0]);
    let direct = cell_ref(&t, rows[0], cols[1]);
    let via_column = cell_ref(&t, rows[1], cols[1]);

    t.set_derivation(direct, Derivation::new(), &[source]).unwrap();
    // A derivation reading the whole of column 0 affects through any cell
    // in that column.
    t.set_derivation(via_column, Derivation::new(), &[ElementRef::Column(cols[0])])
        .unwrap();

    let affects = t.affects(source);
    assert!(affects.contains(&direct));
    assert!(affects.contains(&via_column));
    assert!(!affects.contains(&source));
}

#[test]
fn test_setting_a_value_recalculates_affected_in_order() {
    let (mut t, rows, cols) = grid();
    let source = cell_ref(&t, rows[0], cols[0]);
    let mid = cell_ref(&t, rows[0], cols[1]);
    let leaf = cell_ref(&t, rows[1], cols[1]);

    t.set_derivation(mid, Derivation::new(), &[source]).unwrap();
    t.set_derivation(leaf, Derivation::new(), &[mid]).unwrap();

    let seen: Rc<RefCell<Vec<ElementRef>>> = Rc::default();
    let sink = seen.clone();
    t.add_event_listener(
        EventType::OnRecalculate,
        tabulon::listener(move |e: &TableElementEvent| {
            sink.borrow_mut().push(e.source);
            Ok(())
        }),
    );

    t.set_cell_value(rows[0], cols[0], Some(Value::Int(7)))
        .unwrap();

    assert_eq!(seen.borrow().as_slice(), &[mid, leaf]);
}

#[test]
fn test_manual_write_replaces_a_cell_derivation() {
    let (mut t, rows, cols) = grid();
    let target = cell_ref(&t, rows[0], cols[0]);
    let source = cell_ref(&t, rows[1], cols[0]);

    t.set_derivation(target, Derivation::new(), &[source]).unwrap();
    assert!(t.derivation(target).is_some());

    t.set_cell_value(rows[0], cols[0], Some(Value::Int(5)))
        .unwrap();
    assert!(t.derivation(target).is_none());
    assert!(!t.cell(rows[0], cols[0]).unwrap().is_derived());
}

#[test]
fn test_deleting_a_row_forgets_its_derivations_and_edges() {
    let (mut t, rows, cols) = grid();
    let source = cell_ref(&t, rows[0], cols[0]);
    let target = cell_ref(&t, rows[1], cols[0]);

    t.set_derivation(target, Derivation::new(), &[source]).unwrap();
    assert_eq!(t.affects(source), vec![target]);

    t.delete_row(rows[1]).unwrap();
    assert!(t.affects(source).is_empty());
    assert!(t.derived_elements().is_empty());
}

#[test]
fn test_suspended_recalculation_skips_traversal() {
    let (mut t, rows, cols) = grid();
    let source = cell_ref(&t, rows[0], cols[0]);
    let target = cell_ref(&t, rows[0], cols[1]);
    t.set_derivation(target, Derivation::new(), &[source]).unwrap();

    let seen: Rc<RefCell<Vec<ElementRef>>> = Rc::default();
    let sink = seen.clone();
    t.add_event_listener(
        EventType::OnRecalculate,
        tabulon::listener(move |e: &TableElementEvent| {
            sink.borrow_mut().push(e.source);
            Ok(())
        }),
    );

    t.disable_automatic_recalculation();
    assert!(t.is_automatic_recalculation());
    assert!(!t.is_automatic_recalculate_enabled());
    t.set_cell_value(rows[0], cols[0], Some(Value::Int(1)))
        .unwrap();
    assert!(seen.borrow().is_empty());

    t.enable_automatic_recalculation();
    t.set_cell_value(rows[0], cols[0], Some(Value::Int(2)))
        .unwrap();
    assert_eq!(seen.borrow().as_slice(), &[target]);
}

#[test]
fn test_group_derived_elements_walks_members() {
    let (mut t, rows, cols) = grid();
    t.set_derivation(
        ElementRef::Column(cols[1]),
        Derivation::new(),
        &[ElementRef::Column(cols[0])],
    )
    .unwrap();

    let g = t.add_group().unwrap();
    t.group_add(g, ElementRef::Column(cols[0])).unwrap();
    t.group_add(g, ElementRef::Column(cols[1])).unwrap();
    let _ = rows;

    let derived = t.group_derived_elements(g).unwrap();
    assert_eq!(derived, vec![ElementRef::Column(cols[1])]);
}
