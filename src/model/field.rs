//! The field model: per-field storage, wire, and sizing decisions.

use crate::annotations::{AnnotationOverrides, FieldAllocation};
use crate::descriptor::field_descriptor_proto::{Label, Type};
use crate::descriptor::FieldDescriptorProto;
use crate::error::{Error, Result};
use crate::model::Dependencies;
use crate::name::Name;
use crate::size::{varint_size, EncodedSize};

/// How a field's value is framed on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireClass {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Float,
    Double,
    String,
    Bytes,
    FixedLengthBytes,
    Message,
    Enum,
    /// An enum known to have no negative values, storable unsigned.
    UEnum,
    Extension,
}

/// How the generated struct holds a field's value in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageClass {
    Static,
    Pointer,
    Callback,
}

/// A field's cardinality, combining the schema label with
/// annotation-driven refinements (`FixArray`, proto3 `Singular`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    Optional,
    Singular,
    Repeated,
    FixArray,
}

/// Distinguishes a plain message field from the other shapes that reuse
/// the field model, replacing the duck-typed class hierarchy this
/// generator's lineage traditionally uses with one tagged enum dispatched
/// on explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Regular,
    OneOfMember,
    ExtensionRange,
    ExtensionField,
}

/// One resolved field.
#[derive(Clone, Debug)]
pub struct Field {
    pub tag: u32,
    pub parent_struct: Name,
    pub name: Name,
    pub oneof: Option<Name>,
    pub rule: FieldRule,
    pub wire_class: WireClass,
    pub storage: StorageClass,
    pub kind: FieldKind,
    pub ctype: String,
    /// Fully qualified name of the message/enum type this field refers to,
    /// present only for `Message`/`Enum`/`UEnum` wire classes.
    pub type_name: Option<String>,
    pub max_count: Option<u32>,
    /// Byte capacity for `String`/`Bytes`/`FixedLengthBytes`.
    pub max_size: Option<u32>,
    pub default_value: Option<String>,
    pub callback_datatype: Option<String>,
}

/// `(ctype, per-element encoded size excluding tag, struct byte estimate)`
/// for the scalar wire classes whose size doesn't depend on a referenced
/// type. Message/enum/string/bytes are handled separately since their size
/// depends on a dependency lookup or a capacity annotation.
fn scalar_datatype(wire_class: WireClass, int_size: Option<u8>) -> Option<(String, u8, u32)> {
    let width_ctype = |signed: bool, default_bits: u8| -> String {
        let bits = int_size.unwrap_or(default_bits);
        format!("{}int{}_t", if signed { "" } else { "u" }, bits)
    };

    Some(match wire_class {
        WireClass::Bool => ("bool".to_string(), 1, 4),
        WireClass::Int32 => (width_ctype(true, 32), 10, 4),
        WireClass::Int64 => (width_ctype(true, 64), 10, 8),
        WireClass::Uint32 => (width_ctype(false, 32), 5, 4),
        WireClass::Uint64 => (width_ctype(false, 64), 10, 8),
        WireClass::Sint32 => (width_ctype(true, 32), 5, 4),
        WireClass::Sint64 => (width_ctype(true, 64), 10, 8),
        WireClass::Fixed32 => ("uint32_t".to_string(), 4, 4),
        WireClass::Sfixed32 => ("int32_t".to_string(), 4, 4),
        WireClass::Float => ("float".to_string(), 4, 4),
        WireClass::Fixed64 => ("uint64_t".to_string(), 8, 8),
        WireClass::Sfixed64 => ("int64_t".to_string(), 8, 8),
        WireClass::Double => ("double".to_string(), 8, 8),
        _ => return None,
    })
}

/// Escapes a raw default-value string for embedding inside a C string
/// literal's quotes.
fn escape_c_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            other => vec![other],
        })
        .collect()
}

fn wire_class_from_proto(ty: Type) -> WireClass {
    match ty {
        Type::Bool => WireClass::Bool,
        Type::Int32 => WireClass::Int32,
        Type::Int64 => WireClass::Int64,
        Type::Uint32 => WireClass::Uint32,
        Type::Uint64 => WireClass::Uint64,
        Type::Sint32 => WireClass::Sint32,
        Type::Sint64 => WireClass::Sint64,
        Type::Fixed32 => WireClass::Fixed32,
        Type::Fixed64 => WireClass::Fixed64,
        Type::Sfixed32 => WireClass::Sfixed32,
        Type::Sfixed64 => WireClass::Sfixed64,
        Type::Float => WireClass::Float,
        Type::Double => WireClass::Double,
        Type::String => WireClass::String,
        Type::Bytes => WireClass::Bytes,
        Type::Message | Type::Group => WireClass::Message,
        Type::Enum => WireClass::Enum,
    }
}

impl Field {
    /// Builds a field from its descriptor and fully resolved annotations.
    ///
    /// `proto3` marks the enclosing file/message as proto3 (drives
    /// `Singular` vs `Optional`); `oneof` is the owning oneof's name, if
    /// any; `kind` lets the caller mark extension-range/extension-field
    /// variants that reuse this same construction path.
    pub fn build(
        descriptor: &FieldDescriptorProto,
        parent_struct: Name,
        overrides: &AnnotationOverrides,
        proto3: bool,
        oneof: Option<Name>,
        kind: FieldKind,
    ) -> Result<Field> {
        let field_name = descriptor
            .name
            .clone()
            .ok_or_else(|| Error::Input("field has no name".to_string()))?;
        let tag = descriptor
            .number
            .ok_or_else(|| Error::Input(format!("field {field_name} has no number")))? as u32;

        // Step 1: legacy INLINE rewrite.
        let mut overrides = overrides.clone();
        if matches!(overrides.allocation, None) {
            overrides.allocation = Some(FieldAllocation::Default);
        }

        // Step 2: caps.
        let max_length = overrides.max_length;
        let max_size = match (overrides.max_size, max_length) {
            (Some(size), _) => Some(size),
            (None, Some(len)) => Some(len + 1),
            (None, None) => None,
        };
        let max_count = overrides.max_count;
        let fixed_count = overrides.fixed_count.unwrap_or(false);

        if fixed_count && max_count.is_none() {
            return Err(Error::Annotation(format!(
                "field {field_name} sets fixed_count without max_count"
            )));
        }

        let proto_type = descriptor
            .r#type
            .and_then(|t| Type::try_from(t).ok())
            .ok_or_else(|| Error::Input(format!("field {field_name} has no recognized type")))?;
        let mut wire_class = wire_class_from_proto(proto_type);

        if wire_class == WireClass::Bytes && overrides.fixed_length.unwrap_or(false) {
            wire_class = WireClass::FixedLengthBytes;
            if max_size.is_none() {
                return Err(Error::Annotation(format!(
                    "field {field_name} is fixed_length bytes without max_size"
                )));
            }
        }

        // Step 3: rule selection.
        let label = descriptor
            .label
            .and_then(|l| Label::try_from(l).ok())
            .ok_or_else(|| Error::Input(format!("field {field_name} has no label")))?;
        let rule = match label {
            Label::Repeated => {
                if fixed_count {
                    FieldRule::FixArray
                } else {
                    FieldRule::Repeated
                }
            }
            Label::Required => FieldRule::Required,
            Label::Optional => {
                if proto3 && !descriptor.proto3_optional.unwrap_or(false) {
                    FieldRule::Singular
                } else {
                    FieldRule::Optional
                }
            }
        };

        // Step 4: static feasibility.
        let repeated = matches!(rule, FieldRule::Repeated | FieldRule::FixArray);
        let needs_size_cap = matches!(
            wire_class,
            WireClass::String | WireClass::Bytes | WireClass::FixedLengthBytes
        );
        let static_feasible = !(repeated && max_count.is_none()) && !(needs_size_cap && max_size.is_none());

        // Step 5: allocation pick.
        let storage = match overrides.allocation.unwrap_or(FieldAllocation::Default) {
            FieldAllocation::Pointer => StorageClass::Pointer,
            FieldAllocation::Callback => StorageClass::Callback,
            FieldAllocation::Static => {
                if !static_feasible {
                    return Err(Error::Annotation(format!(
                        "field {field_name} requested STATIC allocation without the required capacity bound"
                    )));
                }
                StorageClass::Static
            }
            FieldAllocation::Default => {
                if static_feasible {
                    StorageClass::Static
                } else {
                    StorageClass::Callback
                }
            }
            FieldAllocation::Ignore => StorageClass::Callback,
        };

        if storage == StorageClass::Callback && oneof.is_some() {
            return Err(Error::Annotation(format!(
                "field {field_name} cannot use a callback inside a oneof"
            )));
        }

        // Step 6: type name + ctype.
        let type_name = descriptor
            .type_name
            .as_ref()
            .map(|t| t.trim_start_matches('.').to_string());

        let ctype = match wire_class {
            WireClass::String => "char".to_string(),
            WireClass::Bytes | WireClass::FixedLengthBytes => "pb_bytes_array_t".to_string(),
            WireClass::Message => type_name.clone().unwrap_or_default(),
            WireClass::Enum | WireClass::UEnum => type_name.clone().unwrap_or_default(),
            other => scalar_datatype(other, overrides.int_size)
                .map(|(ctype, _, _)| ctype)
                .unwrap_or_else(|| "int32_t".to_string()),
        };

        Ok(Field {
            tag,
            parent_struct,
            name: Name::from_segment(field_name),
            oneof: oneof.clone(),
            rule,
            wire_class,
            storage,
            kind: if oneof.is_some() {
                FieldKind::OneOfMember
            } else {
                kind
            },
            ctype,
            type_name,
            max_count,
            max_size,
            default_value: descriptor.default_value.clone(),
            callback_datatype: overrides.callback_datatype.clone(),
        })
    }

    /// Is this field's rule one that requires a presence indicator when
    /// not populated, outside of a oneof?
    pub fn has_presence_field(&self) -> bool {
        matches!(self.rule, FieldRule::Optional)
    }

    /// The `<Message>_<field>_tag` macro name.
    pub fn tag_macro_name(&self) -> String {
        format!("{}_{}_tag", self.parent_struct.as_ident(), self.name.as_ident())
    }

    /// The worst-case encoded size of this field, including its tag and
    /// wire-type byte(s), or `None` if unbounded (a callback field, or a
    /// same-file message dependency whose own size is unbounded).
    ///
    /// `current_file` is the proto file this field itself is declared in;
    /// it distinguishes a same-file unbounded submessage (truly unresolvable
    /// here, so the whole field stays unbounded) from a cross-file one
    /// (that file has already been generated with its own `<Sub>_size`
    /// macro, even when that macro itself is symbolic, so this field can
    /// fall back to a forward symbolic reference instead of giving up).
    pub fn encoded_size(&self, deps: &Dependencies, current_file: &str) -> Option<EncodedSize> {
        if self.storage != StorageClass::Static {
            return None;
        }

        let tag_bytes = varint_size(((self.tag as i64) << 3) | 0) as u32;

        let mut per_element = match self.wire_class {
            WireClass::Message => {
                let type_name = self.type_name.as_deref()?;
                let symbolic_reference = || {
                    let mut size = EncodedSize::constant(5);
                    size.add_symbol(format!("{}_size", type_name.replace('.', "_")));
                    size
                };
                match deps.message_facts(type_name) {
                    Some(facts) => match &facts.encoded_size {
                        Some(inner) => {
                            let inner_limit = inner.upper_limit();
                            let prefix = varint_size(inner_limit as i64) as u32;
                            EncodedSize::constant(prefix) + inner.clone()
                        }
                        None if facts.origin_file == current_file => return None,
                        None => symbolic_reference(),
                    },
                    None => symbolic_reference(),
                }
            }
            WireClass::Enum | WireClass::UEnum => {
                let type_name = self.type_name.as_deref();
                match type_name.and_then(|n| deps.enum_facts(n)) {
                    Some(facts) => facts.encoded_size.clone(),
                    None => EncodedSize::constant(10),
                }
            }
            WireClass::String | WireClass::FixedLengthBytes => {
                EncodedSize::constant(self.max_size.unwrap_or(0))
            }
            WireClass::Bytes => {
                let cap = self.max_size.unwrap_or(0);
                EncodedSize::constant(cap + varint_size(cap as i64) as u32)
            }
            WireClass::Extension => EncodedSize::constant(0),
            other => {
                let (_, size, _) = scalar_datatype(other, None)?;
                EncodedSize::constant(size as u32)
            }
        };

        per_element = per_element + EncodedSize::constant(tag_bytes);

        match self.rule {
            FieldRule::Repeated | FieldRule::FixArray => {
                let count = self.max_count.unwrap_or(0);
                let mut total = per_element * count;
                if count == 1 {
                    total.add_constant(1);
                }
                Some(total)
            }
            _ => Some(per_element),
        }
    }

    /// The byte footprint of a single element of this field, ignoring
    /// repetition and presence overhead. Used both as the basis for
    /// [`Field::byte_size_estimate`] and directly as the "max data-item
    /// byte estimate" input to descriptor word-width selection.
    pub fn item_byte_size(&self, deps: &Dependencies) -> u32 {
        match self.storage {
            StorageClass::Pointer => 8,
            StorageClass::Callback => 16,
            StorageClass::Static => match self.wire_class {
                WireClass::Message => self
                    .type_name
                    .as_deref()
                    .and_then(|n| deps.message_facts(n))
                    .map(|f| f.byte_size_estimate)
                    .unwrap_or(256),
                WireClass::String | WireClass::FixedLengthBytes => self.max_size.unwrap_or(0),
                WireClass::Bytes => self.max_size.unwrap_or(0) + 4,
                other => scalar_datatype(other, self.int_size_hint())
                    .map(|(_, _, item)| item)
                    .unwrap_or(4),
            },
        }
    }

    /// A structural byte-size estimate used only for descriptor
    /// word-width selection, not for the emitted wire size macro.
    pub fn byte_size_estimate(&self, deps: &Dependencies) -> u32 {
        let mut estimate = self.item_byte_size(deps);
        if matches!(self.rule, FieldRule::Repeated | FieldRule::FixArray)
            && self.storage == StorageClass::Static
        {
            estimate *= self.max_count.unwrap_or(1);
        }
        if self.has_presence_field() {
            estimate += 4;
        }
        (estimate + 3) / 4 * 4
    }

    /// The initializer literal for this field inside its message's
    /// `_init_zero` (`null_init = true`) or `_init_default`
    /// (`null_init = false`) macro.
    pub fn initializer(&self, deps: &Dependencies, null_init: bool) -> String {
        let inner = self.inner_initializer(deps, null_init);
        match self.storage {
            StorageClass::Static => match self.rule {
                FieldRule::Repeated => {
                    let count = self.max_count.unwrap_or(0).max(1) as usize;
                    format!("0, {{{}}}", vec![inner; count].join(", "))
                }
                FieldRule::FixArray => {
                    let count = self.max_count.unwrap_or(0).max(1) as usize;
                    format!("{{{}}}", vec![inner; count].join(", "))
                }
                FieldRule::Optional => format!("false, {inner}"),
                FieldRule::Required | FieldRule::Singular => inner,
            },
            StorageClass::Pointer => {
                if matches!(self.rule, FieldRule::Repeated | FieldRule::FixArray) {
                    "0, NULL".to_string()
                } else {
                    "NULL".to_string()
                }
            }
            StorageClass::Callback => {
                if matches!(self.wire_class, WireClass::Extension) {
                    "NULL".to_string()
                } else {
                    "{{NULL}, NULL}".to_string()
                }
            }
        }
    }

    /// The inner (per-element) initializer, ignoring repetition/presence
    /// wrapping: a sub-message's `_init_zero`/`_init_default` reference, a
    /// zero value for the field's pbtype, or the rendered default value
    /// when one is declared and `null_init` is false.
    fn inner_initializer(&self, deps: &Dependencies, null_init: bool) -> String {
        if self.wire_class == WireClass::Message {
            let suffix = if null_init { "init_zero" } else { "init_default" };
            return format!("{}_{}", self.ctype, suffix);
        }

        if self.default_value.is_none() || null_init {
            return match self.wire_class {
                WireClass::String => "\"\"".to_string(),
                WireClass::Bytes => "{0, {0}}".to_string(),
                WireClass::FixedLengthBytes => "{0}".to_string(),
                WireClass::Enum | WireClass::UEnum => self
                    .type_name
                    .as_deref()
                    .and_then(|n| deps.enum_facts(n))
                    .and_then(|facts| facts.values.first())
                    .map(|(_, number)| number.to_string())
                    .unwrap_or_else(|| "0".to_string()),
                _ => "0".to_string(),
            };
        }

        let raw = crate::model::message::resolve_enum_default(self, deps);
        match self.wire_class {
            WireClass::String => format!("\"{}\"", escape_c_string(&raw)),
            WireClass::Bytes => {
                let bytes = raw.as_bytes();
                let hex = bytes
                    .iter()
                    .map(|b| format!("0x{b:02x}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}, {{{hex}}}}}", bytes.len())
            }
            WireClass::FixedLengthBytes => {
                let hex = raw
                    .as_bytes()
                    .iter()
                    .map(|b| format!("0x{b:02x}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{hex}}}")
            }
            WireClass::Fixed32 | WireClass::Uint32 => format!("{raw}u"),
            WireClass::Fixed64 | WireClass::Uint64 => format!("{raw}ull"),
            WireClass::Sfixed64 | WireClass::Int64 | WireClass::Sint64 => format!("{raw}ll"),
            _ => raw,
        }
    }

    fn int_size_hint(&self) -> Option<u8> {
        match self.ctype.as_str() {
            "int8_t" | "uint8_t" => Some(8),
            "int16_t" | "uint16_t" => Some(16),
            "int64_t" | "uint64_t" => Some(64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageFacts;

    fn field_desc(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(label as i32),
            r#type: Some(ty as i32),
            type_name: None,
            extendee: None,
            default_value: None,
            oneof_index: None,
            options: None,
            proto3_optional: None,
        }
    }

    #[test]
    fn repeated_without_max_count_falls_back_to_callback() {
        let desc = field_desc("items", 1, Type::Int32, Label::Repeated);
        let field = Field::build(
            &desc,
            Name::from_segment("M"),
            &AnnotationOverrides::default(),
            false,
            None,
            FieldKind::Regular,
        )
        .unwrap();
        assert_eq!(field.storage, StorageClass::Callback);
        assert_eq!(field.encoded_size(&Dependencies::new(), "f.proto"), None);
    }

    #[test]
    fn required_int32_field_is_bounded() {
        let desc = field_desc("a", 1, Type::Int32, Label::Required);
        let field = Field::build(
            &desc,
            Name::from_segment("M"),
            &AnnotationOverrides::default(),
            false,
            None,
            FieldKind::Regular,
        )
        .unwrap();
        // tag=1 -> 1 tag byte, int32 worst case 10 bytes => 11
        assert_eq!(
            field.encoded_size(&Dependencies::new(), "f.proto"),
            Some(EncodedSize::constant(11))
        );
    }

    #[test]
    fn static_requested_without_cap_is_an_error() {
        let desc = field_desc("s", 2, Type::String, Label::Optional);
        let overrides = AnnotationOverrides {
            allocation: Some(FieldAllocation::Static),
            ..Default::default()
        };
        let result = Field::build(
            &desc,
            Name::from_segment("M"),
            &overrides,
            false,
            None,
            FieldKind::Regular,
        );
        assert!(result.is_err());
    }

    #[test]
    fn string_field_size_uses_max_size_annotation() {
        let desc = field_desc("b", 2, Type::String, Label::Optional);
        let overrides = AnnotationOverrides {
            max_length: Some(10),
            ..Default::default()
        };
        let field = Field::build(
            &desc,
            Name::from_segment("M"),
            &overrides,
            false,
            None,
            FieldKind::Regular,
        )
        .unwrap();
        assert_eq!(field.max_size, Some(11));
        // tag(1) + 11 bytes capacity = 12
        assert_eq!(
            field.encoded_size(&Dependencies::new(), "f.proto"),
            Some(EncodedSize::constant(12))
        );
    }

    #[test]
    fn message_field_adds_prefix_over_known_dependency_size() {
        let desc = {
            let mut d = field_desc("m", 1, Type::Message, Label::Optional);
            d.type_name = Some(".pkg.Inner".to_string());
            d
        };
        let overrides = AnnotationOverrides {
            allocation: Some(FieldAllocation::Static),
            ..Default::default()
        };
        let field = Field::build(
            &desc,
            Name::from_segment("M"),
            &overrides,
            false,
            None,
            FieldKind::Regular,
        )
        .unwrap();

        let mut deps = Dependencies::new();
        deps.insert_message(
            "pkg.Inner",
            MessageFacts {
                encoded_size: Some(EncodedSize::constant(20)),
                byte_size_estimate: 24,
                origin_file: "inner.proto".to_string(),
            },
        );

        // tag(1) + length-prefix(1, since 20 < 128) + 20 = 22
        assert_eq!(
            field.encoded_size(&deps, "f.proto"),
            Some(EncodedSize::constant(22))
        );
    }

    fn message_field(type_name: &str) -> Field {
        let desc = {
            let mut d = field_desc("m", 1, Type::Message, Label::Optional);
            d.type_name = Some(type_name.to_string());
            d
        };
        let overrides = AnnotationOverrides {
            allocation: Some(FieldAllocation::Static),
            ..Default::default()
        };
        Field::build(
            &desc,
            Name::from_segment("M"),
            &overrides,
            false,
            None,
            FieldKind::Regular,
        )
        .unwrap()
    }

    #[test]
    fn same_file_unbounded_dependency_stays_unbounded() {
        let field = message_field(".pkg.Inner");
        let mut deps = Dependencies::new();
        deps.insert_message(
            "pkg.Inner",
            MessageFacts {
                encoded_size: None,
                byte_size_estimate: 256,
                origin_file: "f.proto".to_string(),
            },
        );
        assert_eq!(field.encoded_size(&deps, "f.proto"), None);
    }

    #[test]
    fn cross_file_unbounded_dependency_falls_back_to_symbolic_reference() {
        let field = message_field(".pkg.Inner");
        let mut deps = Dependencies::new();
        deps.insert_message(
            "pkg.Inner",
            MessageFacts {
                encoded_size: None,
                byte_size_estimate: 256,
                origin_file: "other.proto".to_string(),
            },
        );
        let size = field.encoded_size(&deps, "f.proto").unwrap();
        assert!(size.render().contains("pkg_Inner_size"));
    }
}
