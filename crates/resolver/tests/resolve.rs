use rh_domain::config::ResolverConfig;
use rh_resolver::EmployeeIndex;
use rh_staffing::RosterEntry;

fn roster() -> Vec<RosterEntry> {
    [
        (4021, "John Smith"),
        (4022, "Jane Smithers"),
        (4023, "Priya Raman"),
        (4024, "Jon Smyth"),
        (4025, "Carlos Mendez"),
    ]
    .into_iter()
    .map(|(id, name)| RosterEntry {
        id,
        full_name: Some(name.to_owned()),
    })
    .collect()
}

#[test]
fn exact_name_ranks_first() {
    let index = EmployeeIndex::build(&roster(), &ResolverConfig::default());
    let out = index.search("John Smith");
    assert!(!out.is_empty());
    assert_eq!(out[0].id, "4021");
    assert_eq!(out[0].score, 100.0);
    assert!(out.iter().all(|m| m.id != "4025"));
}

#[test]
fn misspelling_still_resolves() {
    let index = EmployeeIndex::build(&roster(), &ResolverConfig::default());
    let out = index.search("carlos mendes");
    assert_eq!(out.first().map(|m| m.id.as_str()), Some("4025"));
}

#[test]
fn no_shared_shingles_is_an_empty_result() {
    let index = EmployeeIndex::build(&roster(), &ResolverConfig::default());
    assert!(index.search("Xyzzy Qwv").is_empty());
}

#[test]
fn same_roster_same_answer() {
    let cfg = ResolverConfig::default();
    let a = EmployeeIndex::build(&roster(), &cfg).search("Smith");
    let b = EmployeeIndex::build(&roster(), &cfg).search("Smith");
    assert_eq!(a, b);
}

#[test]
fn empty_roster_resolves_nothing() {
    let index = EmployeeIndex::build(&[], &ResolverConfig::default());
    assert!(index.is_empty());
    assert!(index.search("John Smith").is_empty());
}
