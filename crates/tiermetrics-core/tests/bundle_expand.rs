#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use tiermetrics_core::name::{expand, name};
use tiermetrics_core::{ErrorCode, Level};

#[test]
fn plain_name_is_a_bundle_of_one() {
    let spec = expand("db.pool.active", &[Level::Debug]).expect("must expand");
    assert!(!spec.is_bundle());
    assert_eq!(spec.primary().name, "db.pool.active");
    assert_eq!(spec.primary().level, Level::Debug);
}

#[test]
fn marker_expands_short_then_full() {
    let spec = expand("p1.p2[+].p3.metric", &[Level::Info, Level::Trace]).expect("must expand");
    let names: Vec<_> = spec.members().iter().map(|m| (m.name.as_str(), m.level)).collect();
    assert_eq!(
        names,
        vec![("p1.p2.metric", Level::Info), ("p1.p2.p3.metric", Level::Trace)]
    );
}

#[test]
fn marker_on_first_segment() {
    let spec = expand("p[+].q.m", &[Level::Info, Level::Info]).expect("must expand");
    assert_eq!(spec.members()[0].name, "p.m");
    assert_eq!(spec.members()[1].name, "p.q.m");
}

#[test]
fn level_count_must_match_members() {
    let err = expand("a[+].b.c", &[Level::Info]).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::InvalidName);

    let err = expand("a.b.c", &[Level::Info, Level::Info]).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::InvalidName);

    let err = expand("a.b.c", &[]).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::InvalidName);
}

#[test]
fn rejects_malformed_markers() {
    for bad in [
        "a[+].b[+].c.d",
        "a.b.c[+]",
        "a.b[+].c",
        "a..b",
        "",
        "a.b[x].c",
        "a.b c",
    ] {
        let err = expand(bad, &[Level::Info, Level::Info]).expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::InvalidName, "{bad}");
    }
}

#[test]
fn join_skips_empty_parts() {
    assert_eq!(name("db.pool", &["conn", "active"]), "db.pool.conn.active");
    assert_eq!(name("", &["a", "", "b"]), "a.b");
}
