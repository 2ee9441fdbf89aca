use std::collections::BTreeSet;

use relsync::{
    BehaviorConfig, Dataset, Identifier, LifecycleEvent, LinkedEntity, MemoryHost,
    RelationBehavior, RelationDescriptor, RelationHost, SyncError,
};
use serde_json::json;

fn ints(values: &[i64]) -> Vec<Identifier> {
    values.iter().map(|v| Identifier::Int(*v)).collect()
}

/// Host with GUID-keyed targets that resolves in descending key order
#[derive(Default)]
struct GuidHost {
    existing: BTreeSet<String>,
    linked: Vec<String>,
    log: Vec<String>,
}

#[derive(Clone)]
struct Contact {
    id: Option<String>,
}

impl LinkedEntity for Contact {
    fn identifier(&self) -> Option<Identifier> {
        // keys are handed over exactly as stored
        self.id.clone().map(Identifier::Text)
    }
}

impl RelationHost for GuidHost {
    type Entity = Contact;

    fn relation_metadata(&self, name: &str) -> Option<RelationDescriptor> {
        (name == "contacts").then(|| RelationDescriptor::junction("contacts", "contact", "account_contacts"))
    }

    fn currently_linked(&mut self, _name: &str) -> anyhow::Result<Vec<Contact>> {
        Ok(self
            .linked
            .iter()
            .map(|id| Contact {
                id: Some(id.clone()),
            })
            .chain(std::iter::once(Contact { id: None }))
            .collect())
    }

    fn resolve_by_ids(&mut self, _target_type: &str, ids: &[Identifier]) -> anyhow::Result<Vec<Contact>> {
        let mut found: Vec<Contact> = self
            .existing
            .iter()
            .filter(|id| ids.contains(&Identifier::text(id.as_str())))
            .map(|id| Contact {
                id: Some(id.clone()),
            })
            .collect();
        found.reverse();
        Ok(found)
    }

    fn link(&mut self, _name: &str, entity: &Contact) -> anyhow::Result<()> {
        let id = entity.id.clone().unwrap_or_default();
        self.log.push(format!("link {}", id));
        self.linked.push(id);
        Ok(())
    }

    fn unlink(&mut self, _name: &str, entity: &Contact, delete: bool) -> anyhow::Result<()> {
        let id = entity.id.clone().unwrap_or_default();
        self.log.push(format!("unlink {} {}", id, delete));
        self.linked.retain(|linked| linked != &id);
        Ok(())
    }
}

const A: &str = "00000000-0000-0000-0000-00000000000a";
const B: &str = "00000000-0000-0000-0000-00000000000b";
const C: &str = "00000000-0000-0000-0000-00000000000c";

#[test]
fn test_custom_host_processes_in_resolve_order() {
    let host = GuidHost {
        existing: [A, B, C].iter().map(|s| s.to_string()).collect(),
        linked: vec![],
        log: vec![],
    };
    let mut behavior = RelationBehavior::new(host, BehaviorConfig::new(["contacts"])).unwrap();

    // upper-case input matches the lower-case keys
    behavior
        .set("contactsIds", &json!([A.to_uppercase(), C, B]))
        .unwrap();
    behavior.on_lifecycle(LifecycleEvent::AfterInsert).unwrap();

    assert_eq!(
        behavior.host().log,
        vec![format!("link {}", C), format!("link {}", B), format!("link {}", A)]
    );
}

#[test]
fn test_custom_host_unsaved_links_ignored() {
    let host = GuidHost {
        existing: [A, B].iter().map(|s| s.to_string()).collect(),
        linked: vec![A.to_string()],
        log: vec![],
    };
    let mut behavior = RelationBehavior::new(host, BehaviorConfig::new(["contacts"])).unwrap();

    assert_eq!(behavior.get("contactsIds").unwrap(), vec![Identifier::text(A)]);

    let outcome = behavior
        .sync("contacts", &[Identifier::text(B)], false)
        .unwrap();

    assert_eq!(outcome.unlinked, vec![Identifier::text(A)]);
    assert_eq!(outcome.linked, vec![Identifier::text(B)]);
    assert_eq!(
        behavior.host().log,
        vec![format!("unlink {} false", A), format!("link {}", B)]
    );
}

#[test]
fn test_assigning_stored_guid_in_other_case_is_not_a_change() {
    let stored = A.to_uppercase();
    let host = GuidHost {
        existing: [stored.clone()].into_iter().collect(),
        linked: vec![stored.clone()],
        log: vec![],
    };
    let mut behavior = RelationBehavior::new(host, BehaviorConfig::new(["contacts"])).unwrap();

    behavior.set("contactsIds", &json!([A])).unwrap();

    assert!(behavior.changed_relations().unwrap().is_empty());
    assert!(behavior.save().unwrap().is_empty());
    assert!(behavior.host().log.is_empty());
    assert_eq!(behavior.host().linked, vec![stored]);
}

#[test]
fn test_opaque_hex_key_reaches_host_unchanged() {
    const MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
    let host = GuidHost {
        existing: [MD5.to_string()].into_iter().collect(),
        linked: vec![],
        log: vec![],
    };
    let mut behavior = RelationBehavior::new(host, BehaviorConfig::new(["contacts"])).unwrap();

    behavior.set("contactsIds", &json!([MD5])).unwrap();
    let results = behavior.save().unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1.linked[0].to_string(), MD5);
    assert_eq!(behavior.host().log, vec![format!("link {}", MD5)]);
}

#[test]
fn test_scenario_from_one_two_three_to_two_three_four() {
    let mut dataset = Dataset::fixture("post", "tags", "tag", &[1, 2, 3, 4], &[1, 2, 3]);
    {
        let host = MemoryHost::new(&mut dataset, "post").unwrap();
        let mut behavior = RelationBehavior::new(host, BehaviorConfig::new(["tags"])).unwrap();

        let outcome = behavior.sync("tags", &ints(&[2, 3, 4]), true).unwrap();
        assert_eq!(outcome.unlinked, ints(&[1]));
        assert_eq!(outcome.linked, ints(&[4]));

        let journal: Vec<String> = behavior
            .host()
            .journal()
            .iter()
            .map(|entry| entry.to_string())
            .collect();
        assert_eq!(journal, vec!["unlink tags 1 (delete)", "link tags 4"]);

        let again = behavior.sync("tags", &ints(&[4, 3, 2]), true).unwrap();
        assert!(again.is_noop());
        assert_eq!(behavior.host().calls().writes(), 2);
    }

    let mut linked = dataset.linked_ids("post", "tags");
    linked.sort();
    assert_eq!(linked, ints(&[2, 3, 4]));
}

#[test]
fn test_dangling_reference_reports_partial_outcome() {
    let mut dataset = Dataset::fixture("post", "tags", "tag", &[1, 2, 3], &[1, 3]);
    let host = MemoryHost::new(&mut dataset, "post").unwrap();
    let mut behavior = RelationBehavior::new(host, BehaviorConfig::new(["tags"])).unwrap();

    behavior.set("tagsIds", &json!([2, 3, 99])).unwrap();
    let err = behavior.save().unwrap_err();

    let SyncError::DanglingReference { missing, partial, .. } = err else {
        panic!("expected a dangling reference error");
    };
    assert_eq!(missing, ints(&[99]));
    assert_eq!(partial.unlinked, ints(&[1]));
    assert_eq!(partial.linked, ints(&[2]));

    // still pending: the relation is reported again until fixed
    assert_eq!(behavior.changed_relations().unwrap(), vec!["tags".to_string()]);
}

#[test]
fn test_unknown_relation_rejected_without_host_calls() {
    let mut dataset = Dataset::fixture("post", "tags", "tag", &[1, 2], &[]);
    let host = MemoryHost::new(&mut dataset, "post").unwrap();
    let mut behavior = RelationBehavior::new(host, BehaviorConfig::new(["tags"])).unwrap();

    let err = behavior.sync("notConfigured", &ints(&[1, 2]), true).unwrap_err();

    assert!(err.is_unknown_relation());
    assert_eq!(behavior.host().calls().total(), 0);
}

#[test]
fn test_set_to_same_contents_is_not_dirty() {
    let mut dataset = Dataset::fixture("post", "tags", "tag", &[1, 2, 3], &[1, 2, 3]);
    let host = MemoryHost::new(&mut dataset, "post").unwrap();
    let mut behavior = RelationBehavior::new(host, BehaviorConfig::new(["tags"])).unwrap();

    behavior.set("tagsIds", &json!(["3", "1", "2"])).unwrap();

    assert!(behavior.changed_relations().unwrap().is_empty());
    assert!(behavior.save().unwrap().is_empty());
    assert_eq!(behavior.host().calls().writes(), 0);
}
