//! The enum model: a value set plus naming and packing policy.

use crate::annotations::AnnotationOverrides;
use crate::descriptor::EnumDescriptorProto;
use crate::model::EnumFacts;
use crate::name::Name;
use crate::size::{varint_size, EncodedSize};

/// One declared enum.
#[derive(Clone, Debug)]
pub struct Enum {
    /// The fully qualified dotted name, e.g. `pkg.Status`.
    pub qualified_name: String,
    /// The name used as a symbol prefix when `long_names` is set.
    pub name: Name,
    /// `(value_name, value_number)` pairs in declaration order.
    pub values: Vec<(String, i64)>,
    /// Whether emitted value names are qualified by the enum name.
    pub long_names: bool,
    /// Whether the runtime should request packed storage for this enum.
    pub packed: bool,
    /// Whether an `_name()` string-lookup helper should be emitted.
    pub emit_to_string: bool,
}

impl Enum {
    /// Builds an `Enum` from its descriptor and resolved annotations.
    pub fn new(
        qualified_name: String,
        name: Name,
        descriptor: &EnumDescriptorProto,
        overrides: &AnnotationOverrides,
    ) -> Self {
        let values = descriptor
            .value
            .iter()
            .filter_map(|v| {
                let name = v.name.clone()?;
                let number = v.number? as i64;
                Some((name, number))
            })
            .collect();

        Enum {
            qualified_name,
            name,
            values,
            long_names: overrides.long_names.unwrap_or(true),
            packed: overrides.packed_enum.unwrap_or(false),
            emit_to_string: overrides.enum_to_string.unwrap_or(false),
        }
    }

    /// `true` if any declared value is negative. A negative-free enum can
    /// be stored as an unsigned type by referencing fields (`UENUM`),
    /// saving a sign-extension branch at decode time.
    pub fn has_negative_value(&self) -> bool {
        self.values.iter().any(|(_, v)| *v < 0)
    }

    /// The worst-case encoded size of any single value: the widest varint
    /// among all declared numbers.
    pub fn encoded_size(&self) -> EncodedSize {
        let widest = self
            .values
            .iter()
            .map(|(_, v)| varint_size(*v))
            .max()
            .unwrap_or(1);
        EncodedSize::constant(widest as u32)
    }

    /// Looks up a declared value's number by its short (unqualified) name,
    /// used when rewriting a default value that references this enum.
    pub fn value_number(&self, short_name: &str) -> Option<i64> {
        self.values
            .iter()
            .find(|(n, _)| n == short_name)
            .map(|(_, v)| *v)
    }

    /// The long (enum-qualified) form of a value name, e.g. `Status_OK`.
    pub fn long_value_name(&self, short_name: &str) -> String {
        format!("{}_{}", self.name.as_ident(), short_name)
    }

    /// Reduces this enum to the facts a referencing field needs.
    pub fn facts(&self) -> EnumFacts {
        EnumFacts {
            has_negative_value: self.has_negative_value(),
            encoded_size: self.encoded_size(),
            values: self.values.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enum_with_values(values: &[(&str, i64)]) -> Enum {
        Enum {
            qualified_name: "pkg.E".to_string(),
            name: Name::from_segment("E"),
            values: values
                .iter()
                .map(|(n, v)| (n.to_string(), *v))
                .collect(),
            long_names: true,
            packed: false,
            emit_to_string: false,
        }
    }

    #[test]
    fn detects_negative_values() {
        let e = enum_with_values(&[("A", 0), ("B", -1)]);
        assert!(e.has_negative_value());
    }

    #[test]
    fn encoded_size_is_widest_varint() {
        let e = enum_with_values(&[("A", 0), ("B", 300)]);
        assert_eq!(e.encoded_size(), EncodedSize::constant(2));
    }

    #[test]
    fn long_value_name_prefixes_enum_name() {
        let e = enum_with_values(&[("OK", 0)]);
        assert_eq!(e.long_value_name("OK"), "E_OK");
    }
}
