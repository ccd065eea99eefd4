//! The extension model: a pseudo-message wrapping a single field that
//! extends an outer message's tag space, plus the synthetic
//! extension-range field every extendable message carries.

use crate::annotations::AnnotationOverrides;
use crate::descriptor::field_descriptor_proto::Label;
use crate::descriptor::FieldDescriptorProto;
use crate::error::{Error, Result};
use crate::model::field::{Field, FieldKind, FieldRule, StorageClass, WireClass};
use crate::name::Name;

/// A single extension field declared at file scope, extending some other
/// message's tag space.
#[derive(Clone, Debug)]
pub struct ExtensionField {
    /// Fully qualified name of the message being extended.
    pub extendee: String,
    /// The one-field pseudo-message's name, used so the runtime sees a
    /// normal descriptor it can bind the extension through.
    pub pseudo_message_name: Name,
    pub field: Field,
    /// `true` for anything other than an optional extension: retained for
    /// completeness but emitted only as a commented placeholder.
    pub skip: bool,
}

impl ExtensionField {
    /// Builds an extension field from its file-scope descriptor.
    pub fn build(descriptor: &FieldDescriptorProto, overrides: &AnnotationOverrides) -> Result<Self> {
        let extendee = descriptor
            .extendee
            .clone()
            .ok_or_else(|| Error::Input("extension field has no extendee".to_string()))?
            .trim_start_matches('.')
            .to_string();

        let field_name = descriptor
            .name
            .clone()
            .ok_or_else(|| Error::Input("extension field has no name".to_string()))?;
        let pseudo_message_name = Name::from_dotted(&extendee) + field_name.as_str() + "extension";

        let skip = descriptor.label != Some(Label::Optional as i32);

        let field = Field::build(
            descriptor,
            pseudo_message_name.clone(),
            overrides,
            false,
            None,
            FieldKind::ExtensionField,
        )?;

        Ok(ExtensionField {
            extendee,
            pseudo_message_name,
            field,
            skip,
        })
    }
}

/// The synthetic `extensions` field a message with a declared extension
/// range carries, bound to a callback so the runtime can look up
/// extension values at decode time.
#[derive(Clone, Debug)]
pub struct ExtensionRange {
    pub parent_struct: Name,
    pub lowest_tag: u32,
}

impl ExtensionRange {
    /// Materializes the synthetic field this range contributes to its
    /// owning message's field list.
    pub fn as_field(&self) -> Field {
        Field {
            tag: self.lowest_tag,
            parent_struct: self.parent_struct.clone(),
            name: Name::from_segment("extensions"),
            oneof: None,
            rule: FieldRule::Optional,
            wire_class: WireClass::Extension,
            storage: StorageClass::Callback,
            kind: FieldKind::ExtensionRange,
            ctype: "pb_extension_t".to_string(),
            type_name: None,
            max_count: None,
            max_size: None,
            default_value: None,
            callback_datatype: None,
        }
    }
}
