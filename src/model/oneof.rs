//! The oneof model: a tagged union over a sorted set of member fields.

use crate::error::{Error, Result};
use crate::model::field::{Field, StorageClass};
use crate::model::Dependencies;
use crate::name::Name;
use crate::size::EncodedSize;

/// A mutually-exclusive group of fields sharing storage.
#[derive(Clone, Debug)]
pub struct Oneof {
    pub parent_struct: Name,
    pub name: Name,
    /// Members, kept sorted by tag.
    pub members: Vec<Field>,
    /// When set, the outer union field name is omitted at emission.
    pub anonymous: bool,
}

impl Oneof {
    /// Builds a oneof from its (unsorted) members. Fails if any member
    /// requests callback storage, which a union cannot hold.
    pub fn new(
        parent_struct: Name,
        name: Name,
        mut members: Vec<Field>,
        anonymous: bool,
    ) -> Result<Oneof> {
        if let Some(bad) = members.iter().find(|f| f.storage == StorageClass::Callback) {
            return Err(Error::Annotation(format!(
                "oneof {} cannot contain callback member {}",
                name.as_ident(),
                bad.name.as_ident()
            )));
        }
        members.sort_by_key(|f| f.tag);
        Ok(Oneof {
            parent_struct,
            name,
            members,
            anonymous,
        })
    }

    /// The oneof's own tag, used to place it within its enclosing
    /// message's field order: the lowest tag among its members.
    pub fn tag(&self) -> u32 {
        self.members.iter().map(|f| f.tag).min().unwrap_or(0)
    }

    /// The worst-case encoded size across whichever member happens to be
    /// populated.
    ///
    /// All-numeric members reduce to a plain maximum. A single symbolic
    /// member adds a flat 5-byte tag-class allowance. A mix of numeric and
    /// symbolic members can't be resolved to one number or one symbol, so
    /// the result is an opaque `sizeof(union{...})` expression left for
    /// the target compiler to evaluate, conservatively bounded by the same
    /// 5-byte allowance.
    pub fn encoded_size(&self, deps: &Dependencies, current_file: &str) -> Option<EncodedSize> {
        let sizes: Vec<EncodedSize> = self
            .members
            .iter()
            .map(|f| f.encoded_size(deps, current_file))
            .collect::<Option<Vec<_>>>()?;

        let (numeric, symbolic): (Vec<_>, Vec<_>) =
            sizes.into_iter().partition(|s| s.is_numeric());

        if symbolic.is_empty() {
            let widest = numeric.iter().map(|s| s.constant_part()).max().unwrap_or(0);
            return Some(EncodedSize::constant(widest));
        }

        if numeric.is_empty() && symbolic.len() == 1 {
            let mut size = symbolic.into_iter().next().unwrap();
            size.add_constant(5);
            return Some(size);
        }

        let mut rendered: Vec<String> = numeric.iter().map(EncodedSize::render).collect();
        rendered.extend(symbolic.iter().map(EncodedSize::render));
        let mut size = EncodedSize::constant(5);
        size.add_symbol(format!("sizeof(union{{{}}})", rendered.join("; ")));
        Some(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::AnnotationOverrides;
    use crate::descriptor::field_descriptor_proto::{Label, Type};
    use crate::descriptor::FieldDescriptorProto;
    use crate::model::field::FieldKind;

    fn scalar_field(name: &str, tag: i32, ty: Type) -> Field {
        let desc = FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(tag),
            label: Some(Label::Optional as i32),
            r#type: Some(ty as i32),
            type_name: None,
            extendee: None,
            default_value: None,
            oneof_index: None,
            options: None,
            proto3_optional: None,
        };
        Field::build(
            &desc,
            Name::from_segment("M"),
            &AnnotationOverrides::default(),
            false,
            Some(Name::from_segment("which")),
            FieldKind::OneOfMember,
        )
        .unwrap()
    }

    #[test]
    fn all_numeric_members_reduce_to_max() {
        let a = scalar_field("x", 3, Type::Int32); // tag(1) + 10 = 11
        let b = scalar_field("y", 4, Type::Bool); // tag(1) + 1 = 2
        let oneof = Oneof::new(Name::from_segment("M"), Name::from_segment("which"), vec![a, b], false)
            .unwrap();
        assert_eq!(oneof.tag(), 3);
        assert_eq!(
            oneof.encoded_size(&Dependencies::new(), "f.proto"),
            Some(EncodedSize::constant(11))
        );
    }

    #[test]
    fn rejects_callback_member() {
        let mut repeated = scalar_field("z", 5, Type::Int32);
        repeated.storage = StorageClass::Callback;
        let result = Oneof::new(
            Name::from_segment("M"),
            Name::from_segment("which"),
            vec![repeated],
            false,
        );
        assert!(result.is_err());
    }
}
