//! Context defaults, template inheritance, and canonical tags.

use tabulon::{Access, ElementType, Property, TableContext, Value};

#[test]
fn test_new_context_has_builtin_defaults() {
    let ctx = TableContext::new();
    assert!(ctx.is_default());
    assert_eq!(ctx.element_type(), ElementType::TableContext);
    assert_eq!(ctx.num_tables(), 0);
    assert!(ctx.is_null());

    assert_eq!(
        ctx.get_property(Property::RowCapacityIncr),
        Some(&Value::Int(256))
    );
    assert_eq!(
        ctx.get_property(Property::ColumnCapacityIncr),
        Some(&Value::Int(256))
    );
    assert_eq!(
        ctx.get_property(Property::FreeSpaceThreshold),
        Some(&Value::Float(2.0))
    );
    assert_eq!(
        ctx.get_property(Property::IsAutoRecalculateDefault),
        Some(&Value::Bool(true))
    );
    assert_eq!(
        ctx.get_property(Property::IsSupportsNullsDefault),
        Some(&Value::Bool(true))
    );
    assert_eq!(
        ctx.get_property(Property::IsReadOnlyDefault),
        Some(&Value::Bool(false))
    );

    // Every initializable property with a built-in default is present.
    for p in [
        Property::RowCapacityIncr,
        Property::ColumnCapacityIncr,
        Property::FreeSpaceThreshold,
        Property::IsAutoRecalculateDefault,
        Property::IsReadOnlyDefault,
        Property::IsSupportsNullsDefault,
        Property::IsEnforceDataTypeDefault,
        Property::IsTablesPersistentDefault,
    ] {
        assert!(ctx.has_property(p), "{} missing", p);
    }

    // Unset optional defaults stay unset.
    assert_eq!(ctx.get_property(Property::Precision), None);
    assert_eq!(ctx.get_property(Property::Units), None);
    assert_eq!(ctx.get_property(Property::DisplayFormat), None);
}

#[test]
fn test_template_contexts_inherit_current_defaults() {
    let mut tc = TableContext::new();
    tc.set_property(Property::RowCapacityIncr, Value::Int(32))
        .unwrap();
    tc.set_property(Property::IsAutoRecalculateDefault, Value::Bool(false))
        .unwrap();
    tc.set_property(Property::FreeSpaceThreshold, Value::Float(4.0))
        .unwrap();
    tc.set_property(
        Property::DisplayFormat,
        Value::Text("Value: {value}".into()),
    )
    .unwrap();

    let ntc = TableContext::from_template(&tc);
    assert!(!ntc.is_default());

    assert_eq!(ntc.get_property(Property::RowCapacityIncr), Some(&Value::Int(32)));
    assert_eq!(
        ntc.get_property(Property::IsAutoRecalculateDefault),
        Some(&Value::Bool(false))
    );
    assert_eq!(
        ntc.get_property(Property::FreeSpaceThreshold),
        Some(&Value::Float(4.0))
    );
    assert_eq!(
        ntc.get_property(Property::DisplayFormat),
        Some(&Value::Text("Value: {value}".into()))
    );
    assert_eq!(ntc.row_capacity_incr(), 32);
    assert!(!ntc.is_auto_recalculate());

    // The modified defaults differ from a fresh context's.
    let fresh = TableContext::new();
    assert_ne!(
        ntc.get_property(Property::RowCapacityIncr),
        fresh.get_property(Property::RowCapacityIncr)
    );
}

#[test]
fn test_canonical_tags() {
    let ctx = TableContext::new();
    assert!(ctx.tags().is_empty());

    let t = ctx.to_canonical_tag("abc").unwrap();
    assert_eq!(t.label(), "abc");
    assert_eq!(ctx.tags(), vec!["abc"]);

    // Repeated requests return the same canonical tag.
    assert_eq!(ctx.to_canonical_tag("abc").unwrap(), t);
    assert_eq!(ctx.to_canonical_tag(" AbC").unwrap(), t);
    assert_eq!(ctx.to_canonical_tag("ABC").unwrap(), t);
    assert_eq!(ctx.tags().len(), 1);

    ctx.to_canonical_tag("ghi").unwrap();
    ctx.to_canonical_tag("def").unwrap();
    assert_eq!(ctx.tags(), vec!["abc", "def", "ghi"]);

    // Blank labels yield no tag.
    assert!(ctx.to_canonical_tag("   ").is_none());
}

#[test]
fn test_tables_created_from_context_inherit_defaults() {
    let mut ctx = TableContext::new();
    ctx.set_property(Property::RowCapacityIncr, Value::Int(8))
        .unwrap();
    let tid = ctx.create_table(0, 0);
    assert_eq!(ctx.num_tables(), 1);
    assert!(ctx.is_registered(tid));

    let table = ctx.table(tid).unwrap();
    assert_eq!(table.row_capacity_incr(), 8);
    assert!(table.is_automatic_recalculation());
    assert!(!table.is_persistent());
}

#[test]
fn test_get_table_by_label_and_tags() {
    let mut ctx = TableContext::new();
    let t1 = ctx.create_table(0, 0);
    let t2 = ctx.create_table(0, 0);
    ctx.table_mut(t1).unwrap().set_label(Some("first")).unwrap();
    ctx.table_mut(t2).unwrap().set_label(Some("second")).unwrap();
    ctx.table_mut(t2).unwrap().tag(["hot", "fresh"]);

    assert_eq!(
        ctx.get_table(&Access::by_label("first")).unwrap(),
        Some(t1)
    );
    assert_eq!(
        ctx.get_table(&Access::by_label("third")).unwrap(),
        None
    );
    assert_eq!(ctx.get_table(&Access::by_tags(["hot"])).unwrap(), Some(t2));
    assert_eq!(ctx.get_table(&Access::ByIdent(t1)).unwrap(), Some(t1));

    // Positional access makes no sense on a context.
    assert!(ctx.get_table(&Access::First).is_err());
}

#[test]
fn test_purge_transients_keeps_persistent_tables() {
    let mut ctx = TableContext::new();
    let keep = ctx.create_table(0, 0);
    let drop_me = ctx.create_table(0, 0);
    ctx.table_mut(keep).unwrap().set_persistent(true);

    ctx.purge_transients();
    assert_eq!(ctx.num_tables(), 1);
    assert!(ctx.is_registered(keep));
    assert!(!ctx.is_registered(drop_me));

    ctx.clear();
    assert_eq!(ctx.num_tables(), 0);
    assert!(ctx.is_null());
}

#[test]
fn test_deleted_table_rejects_operations() {
    let mut ctx = TableContext::new();
    let tid = ctx.create_table(0, 0);
    ctx.delete_table(tid).unwrap();

    assert!(ctx.table(tid).is_err());
    assert!(ctx.delete_table(tid).is_err());
}
