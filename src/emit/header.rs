use crate::emit::{guard_identifier, render_template, EmitOptions};
use crate::model::enums::Enum;
use crate::model::extension::ExtensionField;
use crate::model::field::{Field, StorageClass, WireClass};
use crate::model::message::Message;
use crate::model::Dependencies;

/// Renders the header artifact for one schema file.
///
/// `ordered_messages` must already be topologically sorted (see
/// `toposort::sort_dependencies`); this function only formats, it never
/// reorders.
pub fn emit_header(
    base_name: &str,
    enums: &[Enum],
    ordered_messages: &[Message],
    extensions: &[ExtensionField],
    deps: &Dependencies,
    includes: &[String],
    options: &EmitOptions,
) -> String {
    let guard = format!("PB_{}_INCLUDED", guard_identifier(base_name));
    let mut out = String::new();

    out.push_str(&format!("/* Automatically generated nanopb-style header */\n"));
    if let Some(ts) = &options.timestamp {
        out.push_str(&format!("/* Generated at {ts} */\n"));
    }
    out.push_str(&format!("#ifndef {guard}\n#define {guard}\n"));
    out.push_str(&render_template(&options.libformat, "pb.h"));
    for include in includes {
        let name = if options.strip_path {
            include.rsplit('/').next().unwrap_or(include).to_string()
        } else {
            include.clone()
        };
        out.push_str(&render_template(&options.genformat, &name));
    }
    out.push('\n');
    out.push_str("#if PB_PROTO_HEADER_VERSION != 40\n");
    out.push_str("#error Regenerate this file with the current version of the generator.\n");
    out.push_str("#endif\n\n");

    out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");

    for e in enums {
        out.push_str(&emit_enum(e));
        out.push('\n');
    }

    for message in ordered_messages {
        out.push_str(&emit_struct(message, deps));
        out.push('\n');
    }

    for ext in extensions {
        if ext.skip {
            out.push_str(&format!(
                "/* extension {} on {} is not optional and is not emitted */\n\n",
                ext.field.name.as_ident(),
                ext.extendee
            ));
            continue;
        }
        out.push_str(&format!(
            "extern const pb_extension_type_t {};\n\n",
            ext.pseudo_message_name.as_ident()
        ));
    }

    for message in ordered_messages {
        out.push_str(&emit_init_macros(message, deps));
        out.push_str(&emit_tag_constants(message));
        out.push_str(&emit_fieldlist_extern(message));
        out.push_str(&emit_default_macro(message, deps));
        out.push_str(&emit_size_macro(message, deps, base_name));
        if let Some(msgid) = message.msgid {
            out.push_str(&format!(
                "#define {}_msgid {}\n",
                message.name.as_ident(),
                msgid
            ));
        }
        out.push('\n');
    }

    if options.cpp_descriptors {
        out.push_str("#ifdef __cplusplus\n");
        for message in ordered_messages {
            out.push_str(&format!(
                "template <> struct pb_field_descriptor<{0}> {{ static const pb_msgdesc_t* descriptor() {{ return &{0}_msg; }} }};\n",
                message.name.as_ident()
            ));
        }
        out.push_str("#endif\n\n");
    }

    out.push_str("#ifdef __cplusplus\n} /* extern \"C\" */\n#endif\n\n");
    out.push_str(&format!("#endif /* {guard} */\n"));
    out
}

fn emit_enum(e: &Enum) -> String {
    let mut out = String::new();
    out.push_str(&format!("typedef enum _{} {{\n", e.name.as_ident()));
    for (i, (value_name, number)) in e.values.iter().enumerate() {
        let emitted_name = if e.long_names {
            e.long_value_name(value_name)
        } else {
            value_name.clone()
        };
        let comma = if i + 1 == e.values.len() { "" } else { "," };
        out.push_str(&format!("    {emitted_name} = {number}{comma}\n"));
    }
    out.push_str(&format!("}} {};\n", e.name.as_ident()));

    if e.emit_to_string {
        out.push_str(&format!(
            "const char *{}_name({} value);\n",
            e.name.as_ident(),
            e.name.as_ident()
        ));
    }
    out
}

fn struct_member_text(field: &Field, deps: &Dependencies) -> String {
    let ctype = match field.storage {
        StorageClass::Callback => field
            .callback_datatype
            .clone()
            .unwrap_or_else(|| "pb_callback_t".to_string()),
        _ => field.ctype.clone(),
    };

    let name = field.name.as_ident();

    let body = match field.storage {
        StorageClass::Pointer => format!("{ctype} *{name}"),
        StorageClass::Callback => format!("{ctype} {name}"),
        StorageClass::Static => match field.wire_class {
            WireClass::String => {
                let cap = field.max_size.unwrap_or(0);
                format!("char {name}[{cap}]")
            }
            WireClass::Bytes | WireClass::FixedLengthBytes => {
                let cap = field.max_size.unwrap_or(0);
                format!("PB_BYTES_ARRAY_T({cap}) {name}")
            }
            _ => format!("{ctype} {name}"),
        },
    };

    let array_suffix = if matches!(
        field.rule,
        crate::model::field::FieldRule::FixArray | crate::model::field::FieldRule::Repeated
    ) && field.storage == StorageClass::Static
    {
        format!("[{}]", field.max_count.unwrap_or(0))
    } else {
        String::new()
    };

    let _ = deps;
    format!("    {body}{array_suffix};")
}

fn emit_struct(message: &Message, deps: &Dependencies) -> String {
    let mut out = String::new();
    out.push_str(&format!("typedef struct _{} {{\n", message.name.as_ident()));

    if message.needs_dummy_field() {
        out.push_str("    char dummy_field;\n");
    } else {
        let mut members: Vec<&Field> = message.fields.iter().collect();
        members.sort_by_key(|f| f.tag);
        for field in &members {
            if field.has_presence_field() {
                out.push_str(&format!("    bool has_{};\n", field.name.as_ident()));
            }
            out.push_str(&struct_member_text(field, deps));
            out.push('\n');
        }
        for oneof in &message.oneofs {
            out.push_str(&format!("    pb_size_t which_{};\n", oneof.name.as_ident()));
            out.push_str(&format!("    union {{\n"));
            for member in &oneof.members {
                out.push_str("    ");
                out.push_str(&struct_member_text(member, deps));
                out.push('\n');
            }
            out.push_str(&format!("    }} {};\n", oneof.name.as_ident()));
        }
        if let Some(ext) = &message.extension_field {
            out.push_str(&struct_member_text(ext, deps));
            out.push('\n');
        }
    }

    out.push_str(&format!("}} {};\n", message.name.as_ident()));
    out
}

fn emit_init_macros(message: &Message, deps: &Dependencies) -> String {
    let name = message.name.as_ident();
    format!(
        "#define {name}_init_default {}\n#define {name}_init_zero {}\n",
        message.init_literal(deps, false),
        message.init_literal(deps, true)
    )
}

fn emit_tag_constants(message: &Message) -> String {
    let mut out = String::new();
    for field in message.all_fields() {
        out.push_str(&format!("#define {} {}\n", field.tag_macro_name(), field.tag));
    }
    out
}

fn emit_fieldlist_extern(message: &Message) -> String {
    format!(
        "extern const pb_msgdesc_t {}_msg;\n#define {}_fields &{}_msg\n",
        message.name.as_ident(),
        message.name.as_ident(),
        message.name.as_ident()
    )
}

/// Renders the `{name}_DEFAULT` macro: a hex-escaped byte-string literal
/// holding the message's serialized default payload, or `NULL` when it has
/// none.
fn emit_default_macro(message: &Message, deps: &Dependencies) -> String {
    let name = message.name.as_ident();
    let payload = message.default_payload(deps);
    if payload.is_empty() {
        return format!("#define {name}_DEFAULT NULL\n");
    }
    let hex: String = payload.iter().map(|b| format!("\\x{b:02x}")).collect();
    format!("#define {name}_DEFAULT (const uint8_t*)\"{hex}\\x00\"\n")
}

fn emit_size_macro(message: &Message, deps: &Dependencies, current_file: &str) -> String {
    let name = message.name.as_ident();
    match message.encoded_size(deps, current_file) {
        Some(size) => format!("#define {name}_size {}\n", size.render()),
        None => format!("/* {name}_size is not defined, because it is not constant */\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::AnnotationOverrides;
    use crate::descriptor::field_descriptor_proto::{Label, Type};
    use crate::descriptor::{DescriptorProto, FieldDescriptorProto};
    use crate::name::Name;
    use std::collections::HashMap;

    fn message_with_one_field() -> Message {
        let desc = DescriptorProto {
            name: Some("M".to_string()),
            field: vec![FieldDescriptorProto {
                name: Some("a".to_string()),
                number: Some(1),
                label: Some(Label::Required as i32),
                r#type: Some(Type::Int32 as i32),
                type_name: None,
                extendee: None,
                default_value: None,
                oneof_index: None,
                options: None,
                proto3_optional: None,
            }],
            nested_type: vec![],
            enum_type: vec![],
            extension_range: vec![],
            extension: vec![],
            options: None,
            oneof_decl: vec![],
        };
        Message::build(
            &desc,
            "pkg.M".to_string(),
            Name::from_segment("M"),
            &AnnotationOverrides::builtin_defaults(),
            &HashMap::new(),
            false,
        )
        .unwrap()
    }

    #[test]
    fn header_contains_struct_and_tag_macro() {
        let message = message_with_one_field();
        let deps = Dependencies::new();
        let header = emit_header(
            "simple.proto",
            &[],
            &[message],
            &[],
            &deps,
            &[],
            &EmitOptions::default(),
        );
        assert!(header.contains("typedef struct _M {"));
        assert!(header.contains("#define M_a_tag 1"));
        assert!(header.contains("#define M_size"));
        assert!(header.contains("#define M_DEFAULT NULL"));
    }

    #[test]
    fn default_macro_renders_hex_escaped_payload() {
        let desc = DescriptorProto {
            name: Some("M".to_string()),
            field: vec![FieldDescriptorProto {
                name: Some("a".to_string()),
                number: Some(1),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Int32 as i32),
                type_name: None,
                extendee: None,
                default_value: Some("1".to_string()),
                oneof_index: None,
                options: None,
                proto3_optional: None,
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
        let macro_text = emit_default_macro(&message, &Dependencies::new());
        // tag(1)<<3|0 = 0x08, varint(1) = 0x01
        assert_eq!(
            macro_text,
            "#define M_DEFAULT (const uint8_t*)\"\\x08\\x01\\x00\"\n"
        );
    }

    #[test]
    fn init_macros_use_declared_default_and_zero_fallback() {
        let desc = DescriptorProto {
            name: Some("M".to_string()),
            field: vec![FieldDescriptorProto {
                name: Some("a".to_string()),
                number: Some(1),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Int32 as i32),
                type_name: None,
                extendee: None,
                default_value: Some("5".to_string()),
                oneof_index: None,
                options: None,
                proto3_optional: None,
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
        let macros = emit_init_macros(&message, &Dependencies::new());
        assert!(macros.contains("#define M_init_default {false, 5}"));
        assert!(macros.contains("#define M_init_zero {false, 0}"));
    }

    #[test]
    fn empty_message_emits_dummy_field() {
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
        let header = emit_header(
            "simple.proto",
            &[],
            &[message],
            &[],
            &Dependencies::new(),
            &[],
            &EmitOptions::default(),
        );
        assert!(header.contains("char dummy_field;"));
    }

    #[test]
    fn header_emits_filtered_and_formatted_dependency_includes() {
        let header = emit_header(
            "simple.proto",
            &[],
            &[],
            &[],
            &Dependencies::new(),
            &["other.proto".to_string(), "pkg/nested.proto".to_string()],
            &EmitOptions::default(),
        );
        assert!(header.contains("#include \"other.proto\"\n"));
        assert!(header.contains("#include \"pkg/nested.proto\"\n"));
    }

    #[test]
    fn header_strips_directory_from_dependency_includes_when_requested() {
        let options = EmitOptions {
            strip_path: true,
            ..EmitOptions::default()
        };
        let header = emit_header(
            "simple.proto",
            &[],
            &[],
            &[],
            &Dependencies::new(),
            &["pkg/nested.proto".to_string()],
            &options,
        );
        assert!(header.contains("#include \"nested.proto\"\n"));
        assert!(!header.contains("pkg/nested.proto"));
    }
}
