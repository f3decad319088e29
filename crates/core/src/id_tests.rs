crate::define_id! {
    pub struct TestId("tst-");
}

#[test]
fn new_id_has_prefix() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), 23);
}

#[test]
fn from_string_round_trips() {
    let id = TestId::from_string("tst-abc");
    assert_eq!(id.as_str(), "tst-abc");
    assert_eq!(id.suffix(), "abc");
}

#[test]
fn two_new_ids_differ() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn serde_round_trip() {
    let id = TestId::new();
    let json = serde_json::to_string(&id).unwrap();
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}
