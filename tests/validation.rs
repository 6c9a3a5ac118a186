//! Cell validator and transformer behavior, including precedence.

use std::sync::Arc;

use tabulon::{
    Access, CellTransformer, NumericRange, NumericRangeRequired, Table, TableError, Value,
};

#[test]
fn test_cell_validation_precedence_and_messages() {
    let mut t = Table::new(0, 0);
    let r1 = t.add_row(Access::Last).unwrap();
    let r2 = t.add_row(Access::Last).unwrap();
    let r3 = t.add_row(Access::Last).unwrap();
    let c1 = t.add_column(Access::Last).unwrap();
    let c2 = t.add_column(Access::Last).unwrap();

    t.row_mut(r1)
        .unwrap()
        .set_validator(Some(Arc::new(NumericRange::new(30.0, 40.0).unwrap())));
    t.column_mut(c1)
        .unwrap()
        .set_validator(Some(Arc::new(NumericRange::new(1.0, 10.0).unwrap())));

    // The cell's own validator beats the column's; the column's beats the
    // row's.
    t.get_cell(r3, c1)
        .unwrap()
        .set_validator(Some(Arc::new(NumericRangeRequired::new(-100.0, 20.0).unwrap())));

    // (r1, c1): column validator [1, 10] applies, not the row's [30, 40].
    t.set_cell_value(r1, c1, Some(Value::Float(2.0))).unwrap();
    assert_eq!(t.cell_value(r1, c1), Some(&Value::Float(2.0)));

    // (r2, c1): column validator accepts absent values.
    t.set_cell_value(r2, c1, None).unwrap();
    assert!(t.cell_value(r2, c1).is_none());

    // (r3, c1): the cell validator allows 19 even though the column's
    // range would not.
    t.set_cell_value(r3, c1, Some(Value::Int(19))).unwrap();
    assert_eq!(t.cell_value(r3, c1), Some(&Value::Int(19)));

    // Violations carry the validator's message.
    let err = t.set_cell_value(r2, c1, Some(Value::Int(-5))).unwrap_err();
    assert!(matches!(&err, TableError::Constraint(c) if c.0 == "Too Small"));

    let err = t.set_cell_value(r3, c1, None).unwrap_err();
    assert!(matches!(&err, TableError::Constraint(c) if c.0 == "Required"));

    // Column 2 has no validator; the row validator applies on r1 only.
    t.set_cell_value(r1, c2, Some(Value::Int(35))).unwrap();
    t.set_cell_value(r2, c2, Some(Value::Int(200))).unwrap();
    t.set_cell_value(r3, c2, None).unwrap();

    let err = t.set_cell_value(r1, c2, Some(Value::Int(50))).unwrap_err();
    assert!(matches!(&err, TableError::Constraint(c) if c.0 == "Too Large"));

    let err = t
        .set_cell_value(r1, c2, Some(Value::Text("abc".into())))
        .unwrap_err();
    assert!(matches!(&err, TableError::Constraint(c) if c.0 == "Numeric Value Required"));

    // Clearing the validator clears the constraint.
    t.row_mut(r1).unwrap().set_validator(None);
    t.set_cell_value(r1, c2, Some(Value::Int(50))).unwrap();
    t.set_cell_value(r1, c2, Some(Value::Int(0))).unwrap();
    t.set_cell_value(r1, c2, Some(Value::Text("abc".into())))
        .unwrap();
    assert_eq!(t.cell_value(r1, c2), Some(&Value::Text("abc".into())));
}

#[test]
fn test_transformer_rewrites_filled_values() {
    let mut t = Table::new(0, 0);
    let rows: Vec<u64> = (0..3).map(|_| t.add_row(Access::Last).unwrap()).collect();
    let c1 = t.add_column(Access::Last).unwrap();

    t.column_mut(c1).unwrap().set_validator(Some(Arc::new(
        CellTransformer(|value: Option<Value>| {
            value.map(|v| match v {
                Value::Text(s) => Value::Text(s.to_uppercase()),
                other => other,
            })
        }),
    )));

    t.fill_column(c1, Some(Value::Text("abc".into()))).unwrap();
    for r in &rows {
        assert_eq!(t.cell_value(*r, c1), Some(&Value::Text("ABC".into())));
    }

    // Without the transformer, values pass through untouched.
    t.column_mut(c1).unwrap().set_validator(None);
    t.fill_column(c1, Some(Value::Text("abc".into()))).unwrap();
    for r in &rows {
        assert_eq!(t.cell_value(*r, c1), Some(&Value::Text("abc".into())));
    }
}
