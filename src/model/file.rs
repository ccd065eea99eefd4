//! The schema-file model: every enum, message and extension declared by
//! one input file, plus the stitched cross-file dependency table.

use std::collections::HashMap;

use crate::annotations::{AnnotationOverrides, MangleNames, ResolverContext};
use crate::descriptor::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};
use crate::error::Result;
use crate::model::enums::Enum;
use crate::model::extension::ExtensionField;
use crate::model::field::WireClass;
use crate::model::message::Message;
use crate::model::Dependencies;
use crate::name::Name;

/// Everything derived from a single input `.proto` file.
#[derive(Clone, Debug)]
pub struct File {
    pub proto_name: String,
    pub package: String,
    pub enums: Vec<Enum>,
    pub messages: Vec<Message>,
    pub extensions: Vec<ExtensionField>,
    pub dependencies: Dependencies,
}

struct BuildCtx<'a> {
    package_segments: Vec<String>,
    mangle: MangleNames,
    proto3: bool,
    resolver: &'a mut ResolverContext,
    file_overrides: AnnotationOverrides,
}

fn mangled_symbol(package: &[String], nesting: &[String], policy: MangleNames) -> Name {
    match policy {
        MangleNames::None => {
            let mut segments = package.to_vec();
            segments.extend(nesting.iter().cloned());
            Name::from_segments(segments)
        }
        MangleNames::StripPackage => Name::from_segments(nesting.to_vec()),
        MangleNames::Flatten => Name::from_segments(nesting.last().cloned().into_iter().collect()),
        MangleNames::PackageInitials => {
            let initials = Name::from_segments(package.to_vec()).initials();
            let mut segments = if initials.is_empty() {
                Vec::new()
            } else {
                vec![initials]
            };
            segments.extend(nesting.iter().cloned());
            Name::from_segments(segments)
        }
    }
}

impl File {
    /// Builds the model for one input file. `cli_overrides` are the
    /// toplevel settings applied before any file-level or side-file
    /// layer; `resolver` carries the side-file pattern table shared
    /// across every file processed in this run.
    pub fn build(
        descriptor: &FileDescriptorProto,
        cli_overrides: &AnnotationOverrides,
        resolver: &mut ResolverContext,
    ) -> Result<File> {
        let proto_name = descriptor.name.clone().unwrap_or_default();
        let package = descriptor.package.clone().unwrap_or_default();
        let package_segments: Vec<String> = if package.is_empty() {
            Vec::new()
        } else {
            package.split('.').map(str::to_owned).collect()
        };

        let file_inline = descriptor
            .options
            .as_ref()
            .and_then(|o| o.generator_options.as_ref())
            .map(AnnotationOverrides::from_wire)
            .unwrap_or_default();

        let mut file_overrides = AnnotationOverrides::builtin_defaults();
        file_overrides.merge_from(cli_overrides);
        let file_overrides = resolver.resolve(&file_overrides, &package, &file_inline);

        let proto3 = descriptor.is_proto3() || file_overrides.proto3.unwrap_or(false);
        let mangle = file_overrides.mangle_names.unwrap_or(MangleNames::None);

        let mut ctx = BuildCtx {
            package_segments,
            mangle,
            proto3,
            resolver,
            file_overrides: file_overrides.clone(),
        };

        let mut enums = Vec::new();
        for enum_desc in &descriptor.enum_type {
            enums.push(build_enum(&mut ctx, enum_desc, &[])?);
        }

        let mut messages = Vec::new();
        for message_desc in &descriptor.message_type {
            build_message_recursive(&mut ctx, message_desc, &[], &mut messages, &mut enums)?;
        }

        let mut extensions = Vec::new();
        for ext_desc in &descriptor.extension {
            let dotted = format!(
                "{}.{}",
                package,
                ext_desc.name.clone().unwrap_or_default()
            );
            let overrides = resolve_field_overrides(&mut ctx, &dotted, ext_desc.options.as_ref());
            if matches!(
                overrides.allocation,
                Some(crate::annotations::FieldAllocation::Ignore)
            ) {
                continue;
            }
            extensions.push(ExtensionField::build(ext_desc, &overrides)?);
        }

        let mut dependencies = Dependencies::new();
        let placeholder = Dependencies::new();
        for e in &enums {
            dependencies.insert_enum(e.qualified_name.clone(), e.facts());
        }
        for m in &messages {
            dependencies.insert_message(m.qualified_name.clone(), m.facts(&placeholder, &proto_name));
        }

        Ok(File {
            proto_name,
            package,
            enums,
            messages,
            extensions,
            dependencies,
        })
    }

    /// Absorbs an already-built file's declarations into this file's
    /// dependency table, used when stitching in a file's imports. Local
    /// entries always win over an absorbed one of the same name.
    pub fn absorb_import(&mut self, imported: &File) {
        self.dependencies.absorb(&imported.dependencies);
    }

    /// Recomputes every message's facts in the dependency table using the
    /// now-complete (self plus imports) dependency view. Needed because
    /// `Message::facts` can only be computed correctly once every
    /// dependency a message refers to, including cross-file ones, is
    /// known; the constructor above fills the table with a first pass
    /// computed against an empty view so self-contained messages resolve,
    /// then this refines it.
    pub fn refine_facts(&mut self) {
        for _ in 0..self.messages.len() {
            let snapshot = self.dependencies.clone();
            let mut changed = false;
            for m in &self.messages {
                let facts = m.facts(&snapshot, &self.proto_name);
                let before = self.dependencies.message_facts(&m.qualified_name).cloned();
                if before.as_ref().map(|f| f.encoded_size.clone()) != Some(facts.encoded_size.clone())
                {
                    changed = true;
                }
                self.dependencies
                    .insert_message(m.qualified_name.clone(), facts);
            }
            if !changed {
                break;
            }
        }

        // Promote ENUM -> UENUM for fields referencing a negative-value-free
        // enum, and rewrite enum-valued defaults to their long-name form.
        for message in &mut self.messages {
            for field in message.fields.iter_mut().chain(
                message
                    .oneofs
                    .iter_mut()
                    .flat_map(|o| o.members.iter_mut()),
            ) {
                if !matches!(field.wire_class, WireClass::Enum) {
                    continue;
                }
                let Some(type_name) = field.type_name.clone() else {
                    continue;
                };
                let Some(facts) = self.dependencies.enum_facts(&type_name) else {
                    continue;
                };
                if !facts.has_negative_value {
                    field.wire_class = WireClass::UEnum;
                }
            }
        }
    }
}

fn resolve_field_overrides(
    ctx: &mut BuildCtx,
    dotted_name: &str,
    options: Option<&crate::descriptor::FieldOptions>,
) -> AnnotationOverrides {
    let inline = options
        .and_then(|o| o.generator_options.as_ref())
        .map(AnnotationOverrides::from_wire)
        .unwrap_or_default();
    ctx.resolver
        .resolve(&ctx.file_overrides, dotted_name, &inline)
}

fn build_enum(
    ctx: &mut BuildCtx,
    descriptor: &EnumDescriptorProto,
    nesting: &[String],
) -> Result<Enum> {
    let short_name = descriptor.name.clone().unwrap_or_default();
    let mut full_nesting = nesting.to_vec();
    full_nesting.push(short_name.clone());

    let dotted = format!(
        "{}{}",
        if ctx.package_segments.is_empty() {
            String::new()
        } else {
            format!("{}.", ctx.package_segments.join("."))
        },
        full_nesting.join(".")
    );

    let inline = descriptor
        .options
        .as_ref()
        .and_then(|o| o.generator_options.as_ref())
        .map(AnnotationOverrides::from_wire)
        .unwrap_or_default();
    let overrides = ctx.resolver.resolve(&ctx.file_overrides, &dotted, &inline);

    let symbol = mangled_symbol(&ctx.package_segments, &full_nesting, ctx.mangle);
    Ok(Enum::new(dotted, symbol, descriptor, &overrides))
}

fn build_message_recursive(
    ctx: &mut BuildCtx,
    descriptor: &DescriptorProto,
    nesting: &[String],
    messages: &mut Vec<Message>,
    enums: &mut Vec<Enum>,
) -> Result<()> {
    let short_name = descriptor.name.clone().unwrap_or_default();
    let mut full_nesting = nesting.to_vec();
    full_nesting.push(short_name.clone());

    let dotted = format!(
        "{}{}",
        if ctx.package_segments.is_empty() {
            String::new()
        } else {
            format!("{}.", ctx.package_segments.join("."))
        },
        full_nesting.join(".")
    );

    let inline = descriptor
        .options
        .as_ref()
        .and_then(|o| o.generator_options.as_ref())
        .map(AnnotationOverrides::from_wire)
        .unwrap_or_default();
    let mut message_overrides = ctx.resolver.resolve(&ctx.file_overrides, &dotted, &inline);

    let map_entry = descriptor
        .options
        .as_ref()
        .and_then(|o| o.map_entry)
        .unwrap_or(false);

    if message_overrides.skip_message.unwrap_or(false) {
        return Ok(());
    }

    let mut field_overrides = HashMap::new();
    for field_desc in &descriptor.field {
        let field_name = field_desc.name.clone().unwrap_or_default();
        let field_dotted = format!("{dotted}.{field_name}");
        field_overrides.insert(
            field_name,
            resolve_field_overrides(ctx, &field_dotted, field_desc.options.as_ref()),
        );
    }

    let symbol = mangled_symbol(&ctx.package_segments, &full_nesting, ctx.mangle);
    message_overrides.mangle_names = Some(ctx.mangle);
    let mut message = Message::build(
        descriptor,
        dotted,
        symbol,
        &message_overrides,
        &field_overrides,
        ctx.proto3,
    )?;
    message.map_entry = map_entry;
    messages.push(message);

    for nested_enum in &descriptor.enum_type {
        enums.push(build_enum(ctx, nested_enum, &full_nesting)?);
    }
    for nested_message in &descriptor.nested_type {
        build_message_recursive(ctx, nested_message, &full_nesting, messages, enums)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::field_descriptor_proto::{Label, Type};
    use crate::descriptor::FieldDescriptorProto;

    fn simple_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("simple.proto".to_string()),
            package: Some("pkg".to_string()),
            dependency: vec![],
            message_type: vec![DescriptorProto {
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
            }],
            enum_type: vec![],
            extension: vec![],
            options: None,
            syntax: None,
        }
    }

    #[test]
    fn builds_qualified_names_with_package_prefix() {
        let descriptor = simple_file();
        let mut resolver = ResolverContext::empty();
        let file = File::build(&descriptor, &AnnotationOverrides::default(), &mut resolver).unwrap();
        assert_eq!(file.messages.len(), 1);
        assert_eq!(file.messages[0].qualified_name, "pkg.M");
        assert_eq!(file.messages[0].name.as_ident(), "pkg_M");
    }

    #[test]
    fn strip_package_mangling_drops_package_prefix() {
        let mut descriptor = simple_file();
        descriptor.options = Some(crate::descriptor::FileOptions {
            generator_options: Some(crate::descriptor::GeneratorOptions {
                mangle_names: Some(
                    crate::descriptor::generator_options::MangleNames::StripPackage as i32,
                ),
                ..Default::default()
            }),
        });
        let mut resolver = ResolverContext::empty();
        let file = File::build(&descriptor, &AnnotationOverrides::default(), &mut resolver).unwrap();
        assert_eq!(file.messages[0].name.as_ident(), "M");
    }
}
