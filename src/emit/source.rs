use crate::model::enums::Enum;
use crate::model::extension::ExtensionField;
use crate::model::message::Message;
use crate::model::Dependencies;

/// Renders the source artifact for one schema file: field-table bindings,
/// extension definitions, enum-to-string bodies, and the compile-time
/// checks the header's macros can't express on their own.
pub fn emit_source(
    base_name: &str,
    header_path: &str,
    enums: &[Enum],
    ordered_messages: &[Message],
    extensions: &[ExtensionField],
    deps: &Dependencies,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("/* Automatically generated nanopb-style source from {base_name} */\n"));
    out.push_str(&format!("#include \"{header_path}\"\n\n"));
    out.push_str("#if PB_PROTO_HEADER_VERSION != 40\n");
    out.push_str("#error Regenerate this file with the current version of the generator.\n");
    out.push_str("#endif\n\n");

    for message in ordered_messages {
        let width = message.descriptor_width(deps).bytes();
        out.push_str(&format!(
            "PB_BIND({0}, {0}, {1})\n\n",
            message.name.as_ident(),
            width
        ));
    }

    for ext in extensions {
        if ext.skip {
            continue;
        }
        out.push_str(&format!(
            "const pb_extension_type_t {} = {{\n    NULL,\n    NULL,\n    &{}_msg\n}};\n\n",
            ext.pseudo_message_name.as_ident(),
            ext.pseudo_message_name.as_ident()
        ));
    }

    for e in enums {
        if !e.emit_to_string {
            continue;
        }
        out.push_str(&emit_enum_to_string(e));
    }

    for message in ordered_messages {
        let required = message.required_count();
        if required > 0 {
            out.push_str(&format!(
                "PB_STATIC_ASSERT(({}_size == 0) || pb_membersize({}, {}) < 65536, {}_required_field_count_check)\n",
                message.name.as_ident(),
                message.name.as_ident(),
                message
                    .fields
                    .first()
                    .map(|f| f.name.as_ident())
                    .unwrap_or_default(),
                message.name.as_ident(),
            ));
        }
    }

    out.push_str("\n#if defined(PB_FIELD_32BIT)\n");
    out.push_str("PB_STATIC_ASSERT(sizeof(double) == 8, DOUBLE_MUST_BE_8_BYTES)\n");
    out.push_str("#endif\n");

    out
}

fn emit_enum_to_string(e: &Enum) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "const char *{}_name({} value) {{\n    switch (value) {{\n",
        e.name.as_ident(),
        e.name.as_ident()
    ));
    for (value_name, _) in &e.values {
        let emitted_name = if e.long_names {
            e.long_value_name(value_name)
        } else {
            value_name.clone()
        };
        out.push_str(&format!(
            "        case {emitted_name}: return \"{value_name}\";\n"
        ));
    }
    out.push_str("        default: return \"unknown\";\n    }\n}\n\n");
    out
}
