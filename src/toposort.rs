//! Orders a file's messages so each one is declared only after every
//! message it statically embeds, breaking ties lexicographically for
//! reproducible output.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::Error;
use crate::model::field::{StorageClass, WireClass};
use crate::model::message::Message;

/// Returns the set of other message names a message's `STATIC` fields
/// embed by value.
///
/// A field whose storage is `POINTER` to a message contributes no edge at
/// all: pointer members only need a forward declaration in the target
/// language, which is exactly the knot that lets two messages refer to
/// each other. Only a fully inline (`STATIC`) message field forces one
/// message's declaration to follow the other's.
fn dependencies_of(message: &Message) -> BTreeSet<String> {
    message
        .all_fields()
        .iter()
        .filter(|f| f.storage == StorageClass::Static && f.wire_class == WireClass::Message)
        .filter_map(|f| f.type_name.clone())
        .filter(|name| name != &message.qualified_name)
        .collect()
}

/// Orders `messages` so that for every message `M`, every other message it
/// statically embeds appears earlier in the result.
///
/// Ties among messages with no remaining unsatisfied dependency are broken
/// by qualified name, so output order is reproducible regardless of the
/// order messages were declared in the input. Self-references and
/// references to messages outside `messages` (already-satisfied by
/// construction, or simply unknown) never block emission.
pub fn sort_dependencies(messages: &[Message]) -> Result<Vec<Message>, Error> {
    let by_name: HashMap<String, &Message> =
        messages.iter().map(|m| (m.qualified_name.clone(), m)).collect();

    let mut remaining: HashMap<String, BTreeSet<String>> = messages
        .iter()
        .map(|m| {
            let deps = dependencies_of(m)
                .into_iter()
                .filter(|d| by_name.contains_key(d))
                .collect();
            (m.qualified_name.clone(), deps)
        })
        .collect();

    let mut emitted: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(messages.len());

    while ordered.len() < messages.len() {
        let mut ready: Vec<&String> = remaining
            .iter()
            .filter(|(name, deps)| !emitted.contains(*name) && deps.iter().all(|d| emitted.contains(d)))
            .map(|(name, _)| name)
            .collect();
        ready.sort();

        let Some(next) = ready.first().cloned().cloned() else {
            let stuck: Vec<String> = remaining
                .keys()
                .filter(|name| !emitted.contains(*name))
                .cloned()
                .collect();
            return Err(Error::Cycle(stuck));
        };

        emitted.insert(next.clone());
        ordered.push((*by_name[&next]).clone());
        remaining.remove(&next);
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::AnnotationOverrides;
    use crate::descriptor::field_descriptor_proto::{Label, Type};
    use crate::descriptor::{DescriptorProto, FieldDescriptorProto};
    use crate::name::Name;
    use std::collections::HashMap as StdHashMap;

    fn message_with_static_embed(name: &str, embeds: Option<&str>) -> Message {
        let mut fields = vec![];
        if let Some(inner) = embeds {
            fields.push(FieldDescriptorProto {
                name: Some("inner".to_string()),
                number: Some(1),
                label: Some(Label::Required as i32),
                r#type: Some(Type::Message as i32),
                type_name: Some(format!(".{inner}")),
                extendee: None,
                default_value: None,
                oneof_index: None,
                options: None,
                proto3_optional: None,
            });
        }
        let desc = DescriptorProto {
            name: Some(name.to_string()),
            field: fields,
            nested_type: vec![],
            enum_type: vec![],
            extension_range: vec![],
            extension: vec![],
            options: None,
            oneof_decl: vec![],
        };
        let overrides = AnnotationOverrides {
            allocation: Some(crate::annotations::FieldAllocation::Static),
            ..AnnotationOverrides::builtin_defaults()
        };
        Message::build(
            &desc,
            format!("pkg.{name}"),
            Name::from_segment(name),
            &overrides,
            &StdHashMap::new(),
            false,
        )
        .unwrap()
    }

    #[test]
    fn orders_dependent_before_dependency_is_unnecessary_dependency_comes_first() {
        let a = message_with_static_embed("A", Some("pkg.B"));
        let b = message_with_static_embed("B", None);
        let ordered = sort_dependencies(&[a, b]).unwrap();
        let names: Vec<_> = ordered.iter().map(|m| m.name.as_ident()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn ties_break_lexicographically() {
        let z = message_with_static_embed("Z", None);
        let a = message_with_static_embed("A", None);
        let ordered = sort_dependencies(&[z, a]).unwrap();
        let names: Vec<_> = ordered.iter().map(|m| m.name.as_ident()).collect();
        assert_eq!(names, vec!["A", "Z"]);
    }

    #[test]
    fn detects_genuine_cycle() {
        let a = message_with_static_embed("A", Some("pkg.B"));
        let b = message_with_static_embed("B", Some("pkg.A"));
        let result = sort_dependencies(&[a, b]);
        assert!(result.is_err());
    }
}
