//! The message model: an ordered collection of fields and oneofs, plus
//! facts derived from them (sizes, required-field count, descriptor
//! word-width).

use std::collections::HashMap;

use crate::annotations::AnnotationOverrides;
use crate::descriptor::DescriptorProto;
use crate::error::Result;
use crate::model::extension::ExtensionRange;
use crate::model::field::{Field, FieldKind, FieldRule, StorageClass, WireClass};
use crate::model::oneof::Oneof;
use crate::model::{Dependencies, MessageFacts};
use crate::name::Name;
use crate::size::EncodedSize;

/// The descriptor word width the runtime should use for a message's field
/// table entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorWidth {
    One,
    Two,
    Four,
    Eight,
}

impl DescriptorWidth {
    pub fn bytes(self) -> u8 {
        match self {
            DescriptorWidth::One => 1,
            DescriptorWidth::Two => 2,
            DescriptorWidth::Four => 4,
            DescriptorWidth::Eight => 8,
        }
    }
}

/// One declared message.
#[derive(Clone, Debug)]
pub struct Message {
    pub qualified_name: String,
    pub name: Name,
    /// Top-level fields, excluding oneof members and the extension field.
    pub fields: Vec<Field>,
    pub oneofs: Vec<Oneof>,
    pub extension_field: Option<Field>,
    pub msgid: Option<u32>,
    pub packed: bool,
    pub map_entry: bool,
}

impl Message {
    /// Builds a message from its descriptor, resolved message-level
    /// annotations and a precomputed per-field-name override map (the
    /// caller resolves each field's annotations up front since doing so
    /// needs the side-file resolver, which this module has no access to).
    pub fn build(
        descriptor: &DescriptorProto,
        qualified_name: String,
        name: Name,
        message_overrides: &AnnotationOverrides,
        field_overrides: &HashMap<String, AnnotationOverrides>,
        proto3: bool,
    ) -> Result<Message> {
        let no_unions = message_overrides.no_unions.unwrap_or(false);

        let mut oneof_members: Vec<Vec<Field>> = vec![Vec::new(); descriptor.oneof_decl.len()];
        let mut fields = Vec::new();

        for field_desc in &descriptor.field {
            let field_name = field_desc.name.clone().unwrap_or_default();
            let mut overrides = message_overrides.clone();
            if let Some(o) = field_overrides.get(&field_name) {
                overrides.merge_from(o);
            }

            if matches!(overrides.allocation, Some(crate::annotations::FieldAllocation::Ignore)) {
                continue;
            }

            match field_desc.oneof_index {
                Some(index) if !no_unions => {
                    let oneof_decl = &descriptor.oneof_decl[index as usize];
                    let oneof_name = Name::from_segment(
                        oneof_decl.name.clone().unwrap_or_else(|| format!("oneof_{index}")),
                    );
                    let built = Field::build(
                        field_desc,
                        name.clone(),
                        &overrides,
                        proto3,
                        Some(oneof_name),
                        FieldKind::OneOfMember,
                    )?;
                    oneof_members[index as usize].push(built);
                }
                _ => {
                    let built = Field::build(
                        field_desc,
                        name.clone(),
                        &overrides,
                        proto3,
                        None,
                        FieldKind::Regular,
                    )?;
                    fields.push(built);
                }
            }
        }

        let mut oneofs = Vec::new();
        for (index, members) in oneof_members.into_iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let oneof_decl = &descriptor.oneof_decl[index];
            let oneof_name = Name::from_segment(
                oneof_decl.name.clone().unwrap_or_else(|| format!("oneof_{index}")),
            );
            let anonymous = message_overrides.anonymous_oneof.unwrap_or(false);
            oneofs.push(Oneof::new(name.clone(), oneof_name, members, anonymous)?);
        }

        let extension_field = descriptor
            .extension_range
            .iter()
            .filter_map(|r| r.start)
            .min()
            .map(|lowest| {
                ExtensionRange {
                    parent_struct: name.clone(),
                    lowest_tag: lowest as u32,
                }
                .as_field()
            });

        Ok(Message {
            qualified_name,
            name,
            fields,
            oneofs,
            extension_field,
            msgid: message_overrides.msgid,
            packed: message_overrides.packed_struct.unwrap_or(false),
            map_entry: false,
        })
    }

    /// Every field contributing to this message, in the order used for
    /// descriptor-table and size computations: top-level fields, then
    /// every oneof's members, then the synthetic extension field.
    pub fn all_fields(&self) -> Vec<&Field> {
        let mut all: Vec<&Field> = self.fields.iter().collect();
        for oneof in &self.oneofs {
            all.extend(oneof.members.iter());
        }
        if let Some(ext) = &self.extension_field {
            all.push(ext);
        }
        all
    }

    /// The number of required fields outside any oneof.
    pub fn required_count(&self) -> u32 {
        self.fields
            .iter()
            .filter(|f| matches!(f.rule, FieldRule::Required))
            .count() as u32
    }

    /// The message's own worst-case encoded size, or `None` when any
    /// contributing field or oneof is unbounded. `current_file` is the
    /// proto file this message itself is declared in (see
    /// [`Field::encoded_size`](crate::model::field::Field::encoded_size)).
    pub fn encoded_size(&self, deps: &Dependencies, current_file: &str) -> Option<EncodedSize> {
        if self.map_entry {
            return None;
        }
        let mut total = EncodedSize::zero();
        for field in &self.fields {
            total = total + field.encoded_size(deps, current_file)?;
        }
        for oneof in &self.oneofs {
            total = total + oneof.encoded_size(deps, current_file)?;
        }
        if let Some(ext) = &self.extension_field {
            total = total + ext.encoded_size(deps, current_file)?;
        }
        Some(total)
    }

    /// The structural byte-size estimate used when another message refers
    /// to this one as a nested static field.
    pub fn byte_size_estimate(&self, deps: &Dependencies) -> u32 {
        self.all_fields()
            .iter()
            .map(|f| f.byte_size_estimate(deps))
            .sum()
    }

    /// Reduces this message to the facts a referencing field needs.
    pub fn facts(&self, deps: &Dependencies, current_file: &str) -> MessageFacts {
        MessageFacts {
            encoded_size: self.encoded_size(deps, current_file),
            byte_size_estimate: self.byte_size_estimate(deps),
            origin_file: current_file.to_string(),
        }
    }

    /// Picks the smallest descriptor word width that fits every field's
    /// tag, structural offset, array capacity and per-item data size.
    ///
    /// Width selection is monotone: increasing any one of the four inputs
    /// can only move the result to a wider (or equal) width, never
    /// narrower, since each branch below is a strictly looser bound than
    /// the one that precedes it.
    pub fn descriptor_width(&self, deps: &Dependencies) -> DescriptorWidth {
        let fields = self.all_fields();
        let max_tag = fields.iter().map(|f| f.tag).max().unwrap_or(0);
        let max_offset = fields
            .iter()
            .map(|f| f.byte_size_estimate(deps))
            .max()
            .unwrap_or(0);
        let max_count = fields.iter().filter_map(|f| f.max_count).max().unwrap_or(0);
        let max_datasize = fields.iter().map(|f| f.item_byte_size(deps)).max().unwrap_or(0);

        if max_count > 65535 {
            DescriptorWidth::Eight
        } else if max_tag > 1023 || max_offset > 65535 || max_count > 4095 || max_datasize > 4095 {
            DescriptorWidth::Four
        } else if max_tag > 63 || max_offset > 255 {
            DescriptorWidth::Two
        } else {
            DescriptorWidth::One
        }
    }

    /// Messages whose storage is entirely static and whose encoded size
    /// is fully resolved qualify for a `STATIC` allocation check: a struct
    /// with no fields at all still needs a non-empty body, conventionally
    /// a single dummy member, to satisfy the target language.
    pub fn needs_dummy_field(&self) -> bool {
        self.fields.is_empty() && self.oneofs.is_empty() && self.extension_field.is_none()
    }

    /// `true` if every static top-level field (not inside a oneof, not a
    /// repeated/message/oneof-contained field) declares a default value,
    /// used by [`Message::default_payload`] to decide what participates.
    fn default_payload_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| {
            f.storage == StorageClass::Static
                && matches!(f.rule, FieldRule::Optional | FieldRule::Singular)
                && f.default_value.is_some()
                && !matches!(f.wire_class, WireClass::Message)
        })
    }

    /// Serializes the minimal wire-format payload representing this
    /// message's declared defaults: only optional, statically allocated,
    /// non-message scalar fields that declare a default value contribute
    /// bytes, each as an ordinary tag-prefixed wire-format value. Map
    /// entries never contribute a default payload.
    pub fn default_payload(&self, deps: &Dependencies) -> Vec<u8> {
        if self.map_entry {
            return Vec::new();
        }
        let mut out = Vec::new();
        for field in self.default_payload_fields() {
            encode_default_field(field, deps, &mut out);
        }
        out
    }

    /// The full struct-literal initializer for this message's
    /// `_init_zero` (`null_init = true`) or `_init_default`
    /// (`null_init = false`) macro, following the same member order as
    /// the generated struct: top-level fields by tag, then each oneof as
    /// a `which_X, {union}` pair, then the extension field.
    pub fn init_literal(&self, deps: &Dependencies, null_init: bool) -> String {
        if self.needs_dummy_field() {
            return "{0}".to_string();
        }

        let mut parts = Vec::new();

        let mut members: Vec<&Field> = self.fields.iter().collect();
        members.sort_by_key(|f| f.tag);
        for field in &members {
            parts.push(field.initializer(deps, null_init));
        }

        for oneof in &self.oneofs {
            if let Some(first) = oneof.members.first() {
                parts.push(format!("0, {{{}}}", first.initializer(deps, null_init)));
            }
        }

        if let Some(ext) = &self.extension_field {
            parts.push(ext.initializer(deps, null_init));
        }

        format!("{{{}}}", parts.join(", "))
    }
}

/// If `field` is an enum-typed field whose default references a short
/// value name, rewrites it to the value's number by looking it up in
/// `deps`; falls back to treating the default as a plain 64-bit integer
/// literal when the enum, or the value within it, can't be resolved.
pub(crate) fn resolve_enum_default(field: &Field, deps: &Dependencies) -> String {
    let raw = field.default_value.clone().unwrap_or_default();
    if !matches!(field.wire_class, WireClass::Enum | WireClass::UEnum) {
        return raw;
    }
    if raw.parse::<i64>().is_ok() {
        return raw;
    }
    field
        .type_name
        .as_deref()
        .and_then(|name| deps.enum_facts(name))
        .and_then(|facts| facts.values.iter().find(|(n, _)| n == &raw))
        .map(|(_, number)| number.to_string())
        .unwrap_or(raw)
}

fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

fn zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Appends one field's tag and default-value bytes to `out`, in the wire
/// format a real decoder expects: varint tag/wire-type, then a
/// type-appropriate value encoding (plain or zigzag varint, little-endian
/// fixed-width, or length-prefixed bytes).
fn encode_default_field(field: &Field, deps: &Dependencies, out: &mut Vec<u8>) {
    let resolved = resolve_enum_default(field, deps);

    let wire_type: u64 = match field.wire_class {
        WireClass::Fixed64 | WireClass::Sfixed64 | WireClass::Double => 1,
        WireClass::String | WireClass::Bytes | WireClass::FixedLengthBytes => 2,
        WireClass::Fixed32 | WireClass::Sfixed32 | WireClass::Float => 5,
        _ => 0,
    };
    encode_varint(((field.tag as u64) << 3) | wire_type, out);

    match field.wire_class {
        WireClass::Bool => encode_varint(u64::from(resolved == "true"), out),
        WireClass::Int32 | WireClass::Int64 | WireClass::Uint32 | WireClass::Uint64
        | WireClass::Enum | WireClass::UEnum => {
            encode_varint(resolved.parse::<i64>().unwrap_or(0) as u64, out);
        }
        WireClass::Sint32 => encode_varint(
            zigzag32(resolved.parse::<i32>().unwrap_or(0)) as u64,
            out,
        ),
        WireClass::Sint64 => encode_varint(zigzag64(resolved.parse::<i64>().unwrap_or(0)), out),
        WireClass::Fixed32 | WireClass::Sfixed32 => {
            out.extend_from_slice(&(resolved.parse::<i32>().unwrap_or(0) as u32).to_le_bytes());
        }
        WireClass::Float => {
            out.extend_from_slice(&resolved.parse::<f32>().unwrap_or(0.0).to_le_bytes());
        }
        WireClass::Fixed64 | WireClass::Sfixed64 => {
            out.extend_from_slice(&(resolved.parse::<i64>().unwrap_or(0) as u64).to_le_bytes());
        }
        WireClass::Double => {
            out.extend_from_slice(&resolved.parse::<f64>().unwrap_or(0.0).to_le_bytes());
        }
        WireClass::String | WireClass::Bytes | WireClass::FixedLengthBytes => {
            let bytes = resolved.as_bytes();
            encode_varint(bytes.len() as u64, out);
            out.extend_from_slice(bytes);
        }
        WireClass::Message | WireClass::Extension => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::field_descriptor_proto::{Label, Type};
    use crate::descriptor::FieldDescriptorProto;

    fn required_field(name: &str, tag: i32) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(tag),
            label: Some(Label::Required as i32),
            r#type: Some(Type::Int32 as i32),
            type_name: None,
            extendee: None,
            default_value: None,
            oneof_index: None,
            options: None,
            proto3_optional: None,
        }
    }

    #[test]
    fn required_count_ignores_oneof_members() {
        let desc = DescriptorProto {
            name: Some("M".to_string()),
            field: vec![required_field("a", 1)],
            nested_type: vec![],
            enum_type: vec![],
            extension_range: vec![],
            extension: vec![],
            options: None,
            oneof_decl: vec![],
        };
        let message = Message::build(
            &desc,
            "pkg.M".to_string(),
            Name::from_segment("M"),
            &AnnotationOverrides::builtin_defaults(),
            &HashMap::new(),
            false,
        )
        .unwrap();
        assert_eq!(message.required_count(), 1);
    }

    #[test]
    fn descriptor_width_widens_with_large_tag() {
        let mut desc = DescriptorProto {
            name: Some("M".to_string()),
            field: vec![required_field("a", 2000)],
            nested_type: vec![],
            enum_type: vec![],
            extension_range: vec![],
            extension: vec![],
            options: None,
            oneof_decl: vec![],
        };
        let message = Message::build(
            &desc,
            "pkg.M".to_string(),
            Name::from_segment("M"),
            &AnnotationOverrides::builtin_defaults(),
            &HashMap::new(),
            false,
        )
        .unwrap();
        assert_eq!(message.descriptor_width(&Dependencies::new()), DescriptorWidth::Four);

        desc.field = vec![required_field("a", 10)];
        let small_message = Message::build(
            &desc,
            "pkg.M".to_string(),
            Name::from_segment("M"),
            &AnnotationOverrides::builtin_defaults(),
            &HashMap::new(),
            false,
        )
        .unwrap();
        assert_eq!(
            small_message.descriptor_width(&Dependencies::new()),
            DescriptorWidth::One
        );
    }

    #[test]
    fn empty_message_needs_dummy_field() {
        let desc = DescriptorProto {
            name: Some("Empty".to_string()),
            field: vec![],
            nested_type: vec![],
            enum_type: vec![],
            extension_range: vec![],
            extension: vec![],
            options: None,
            oneof_decl: vec![],
        };
        let message = Message::build(
            &desc,
            "pkg.Empty".to_string(),
            Name::from_segment("Empty"),
            &AnnotationOverrides::builtin_defaults(),
            &HashMap::new(),
            false,
        )
        .unwrap();
        assert!(message.needs_dummy_field());
    }

    fn optional_field_with_default(name: &str, tag: i32, ty: Type, default: &str) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(tag),
            label: Some(Label::Optional as i32),
            r#type: Some(ty as i32),
            type_name: None,
            extendee: None,
            default_value: Some(default.to_string()),
            oneof_index: None,
            options: None,
            proto3_optional: None,
        }
    }

    #[test]
    fn default_payload_encodes_varint_field() {
        let desc = DescriptorProto {
            name: Some("M".to_string()),
            field: vec![optional_field_with_default("a", 1, Type::Int32, "300")],
            nested_type: vec![],
            enum_type: vec![],
            extension_range: vec![],
            extension: vec![],
            options: None,
            oneof_decl: vec![],
        };
        let message = Message::build(
            &desc,
            "pkg.M".to_string(),
            Name::from_segment("M"),
            &AnnotationOverrides::builtin_defaults(),
            &HashMap::new(),
            false,
        )
        .unwrap();
        // tag 1, wire type 0 (varint) -> 0x08, then varint(300) = 0xac 0x02
        assert_eq!(
            message.default_payload(&Dependencies::new()),
            vec![0x08, 0xac, 0x02]
        );
    }

    #[test]
    fn default_payload_skips_fields_without_defaults() {
        let desc = DescriptorProto {
            name: Some("M".to_string()),
            field: vec![{
                let mut f = optional_field_with_default("a", 1, Type::Int32, "1");
                f.default_value = None;
                f
            }],
            nested_type: vec![],
            enum_type: vec![],
            extension_range: vec![],
            extension: vec![],
            options: None,
            oneof_decl: vec![],
        };
        let message = Message::build(
            &desc,
            "pkg.M".to_string(),
            Name::from_segment("M"),
            &AnnotationOverrides::builtin_defaults(),
            &HashMap::new(),
            false,
        )
        .unwrap();
        assert!(message.default_payload(&Dependencies::new()).is_empty());
    }
}
