//! Hand-translated subset of `descriptor.proto`.
//!
//! The schema parser that produces these structures is out of scope for
//! this crate (see the crate-level docs); what matters here is decoding
//! whatever `FileDescriptorSet` bytes it hands us. Rather than depend on
//! `prost-types`, which has no slot for an unregistered custom option, each
//! `*Options` message carries its generator-specific option block as an
//! ordinary field at the same wire tag (1010) a real extension would use.
//! Protobuf extensions are wire-compatible with regular fields at the same
//! tag number, so a descriptor set produced by a real protobuf compiler
//! decodes into these types without modification.

#![allow(missing_docs)]

use prost::Message;

/// A complete set of file descriptors, as produced by compiling one or more
/// `.proto` files together with their transitive dependencies.
#[derive(Clone, PartialEq, Message)]
pub struct FileDescriptorSet {
    #[prost(message, repeated, tag = "1")]
    pub file: Vec<FileDescriptorProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FileDescriptorProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub package: Option<String>,
    #[prost(string, repeated, tag = "3")]
    pub dependency: Vec<String>,
    #[prost(message, repeated, tag = "4")]
    pub message_type: Vec<DescriptorProto>,
    #[prost(message, repeated, tag = "5")]
    pub enum_type: Vec<EnumDescriptorProto>,
    #[prost(message, repeated, tag = "7")]
    pub extension: Vec<FieldDescriptorProto>,
    #[prost(message, optional, tag = "8")]
    pub options: Option<FileOptions>,
    #[prost(string, optional, tag = "12")]
    pub syntax: Option<String>,
}

impl FileDescriptorProto {
    /// `true` when this file declares `syntax = "proto3";`.
    pub fn is_proto3(&self) -> bool {
        self.syntax.as_deref() == Some("proto3")
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct DescriptorProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub field: Vec<FieldDescriptorProto>,
    #[prost(message, repeated, tag = "3")]
    pub nested_type: Vec<DescriptorProto>,
    #[prost(message, repeated, tag = "4")]
    pub enum_type: Vec<EnumDescriptorProto>,
    #[prost(message, repeated, tag = "5")]
    pub extension_range: Vec<descriptor_proto::ExtensionRange>,
    #[prost(message, repeated, tag = "6")]
    pub extension: Vec<FieldDescriptorProto>,
    #[prost(message, optional, tag = "7")]
    pub options: Option<MessageOptions>,
    #[prost(message, repeated, tag = "8")]
    pub oneof_decl: Vec<OneofDescriptorProto>,
}

pub mod descriptor_proto {
    use prost::Message;

    #[derive(Clone, PartialEq, Message)]
    pub struct ExtensionRange {
        #[prost(int32, optional, tag = "1")]
        pub start: Option<i32>,
        #[prost(int32, optional, tag = "2")]
        pub end: Option<i32>,
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct FieldDescriptorProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(int32, optional, tag = "3")]
    pub number: Option<i32>,
    #[prost(enumeration = "field_descriptor_proto::Label", optional, tag = "4")]
    pub label: Option<i32>,
    #[prost(enumeration = "field_descriptor_proto::Type", optional, tag = "5")]
    pub r#type: Option<i32>,
    #[prost(string, optional, tag = "6")]
    pub type_name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub extendee: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub default_value: Option<String>,
    #[prost(int32, optional, tag = "9")]
    pub oneof_index: Option<i32>,
    #[prost(message, optional, tag = "8")]
    pub options: Option<FieldOptions>,
    #[prost(bool, optional, tag = "17")]
    pub proto3_optional: Option<bool>,
}

pub mod field_descriptor_proto {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Double = 1,
        Float = 2,
        Int64 = 3,
        Uint64 = 4,
        Int32 = 5,
        Fixed64 = 6,
        Fixed32 = 7,
        Bool = 8,
        String = 9,
        Group = 10,
        Message = 11,
        Bytes = 12,
        Uint32 = 13,
        Enum = 14,
        Sfixed32 = 15,
        Sfixed64 = 16,
        Sint32 = 17,
        Sint64 = 18,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
    #[repr(i32)]
    pub enum Label {
        Optional = 1,
        Required = 2,
        Repeated = 3,
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct OneofDescriptorProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnumDescriptorProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub value: Vec<EnumValueDescriptorProto>,
    #[prost(message, optional, tag = "3")]
    pub options: Option<EnumOptions>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnumValueDescriptorProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub number: Option<i32>,
}

/// Generator-specific options, attached at the conventional extension tag.
/// Mirrors the recognized annotation table: every field is optional so an
/// absent value means "not set at this level," letting the merge in
/// `annotations` distinguish "unset" from "explicitly false/zero."
#[derive(Clone, PartialEq, Message)]
pub struct GeneratorOptions {
    #[prost(enumeration = "generator_options::FieldType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub max_size: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub max_length: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub max_count: Option<i32>,
    #[prost(bool, optional, tag = "5")]
    pub fixed_count: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub fixed_length: Option<bool>,
    #[prost(int32, optional, tag = "7")]
    pub int_size: Option<i32>,
    #[prost(bool, optional, tag = "8")]
    pub long_names: Option<bool>,
    #[prost(bool, optional, tag = "9")]
    pub packed_enum: Option<bool>,
    #[prost(bool, optional, tag = "10")]
    pub packed_struct: Option<bool>,
    #[prost(bool, optional, tag = "11")]
    pub enum_to_string: Option<bool>,
    #[prost(int32, optional, tag = "12")]
    pub msgid: Option<i32>,
    #[prost(bool, optional, tag = "13")]
    pub no_unions: Option<bool>,
    #[prost(bool, optional, tag = "14")]
    pub anonymous_oneof: Option<bool>,
    #[prost(bool, optional, tag = "15")]
    pub proto3: Option<bool>,
    #[prost(enumeration = "generator_options::MangleNames", optional, tag = "16")]
    pub mangle_names: Option<i32>,
    #[prost(bool, optional, tag = "17")]
    pub skip_message: Option<bool>,
    #[prost(string, optional, tag = "18")]
    pub callback_datatype: Option<String>,
    #[prost(string, optional, tag = "19")]
    pub callback_function: Option<String>,
    #[prost(int32, optional, tag = "20")]
    pub descriptorsize: Option<i32>,
}

pub mod generator_options {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
    #[repr(i32)]
    pub enum FieldType {
        Default = 0,
        Static = 1,
        Pointer = 2,
        Callback = 3,
        Ignore = 4,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
    #[repr(i32)]
    pub enum MangleNames {
        None = 0,
        StripPackage = 1,
        Flatten = 2,
        PackageInitials = 3,
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct FileOptions {
    #[prost(message, optional, tag = "1010")]
    pub generator_options: Option<GeneratorOptions>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MessageOptions {
    #[prost(bool, optional, tag = "7")]
    pub map_entry: Option<bool>,
    #[prost(message, optional, tag = "1010")]
    pub generator_options: Option<GeneratorOptions>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FieldOptions {
    #[prost(message, optional, tag = "1010")]
    pub generator_options: Option<GeneratorOptions>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnumOptions {
    #[prost(message, optional, tag = "1010")]
    pub generator_options: Option<GeneratorOptions>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_options_round_trip_through_prost() {
        let opts = GeneratorOptions {
            max_size: Some(16),
            long_names: Some(false),
            ..Default::default()
        };
        let bytes = opts.encode_to_vec();
        let decoded = GeneratorOptions::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.max_size, Some(16));
        assert_eq!(decoded.long_names, Some(false));
        assert_eq!(decoded.msgid, None);
    }
}
