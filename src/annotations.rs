//! Resolves the layered set of generator annotations (builtin defaults,
//! CLI settings, file-level options, external side files, inline schema
//! options) into one effective record per schema element.

use std::collections::HashSet;

use globset::GlobMatcher;

use crate::descriptor::generator_options as wire;
use crate::descriptor::GeneratorOptions;

/// Per-field storage-class override, as requested by an annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldAllocation {
    /// Let the field model pick a strategy based on feasibility.
    Default,
    /// Force an inline, fixed-capacity member.
    Static,
    /// Force a heap-owned pointer member.
    Pointer,
    /// Force a user-supplied encode/decode callback.
    Callback,
    /// Drop the field from emission entirely.
    Ignore,
}

/// Name-mangling policy controlling how nested/qualified schema paths
/// become emitted symbols.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MangleNames {
    /// Use the full package-qualified path.
    None,
    /// Drop the package prefix, keep nested path.
    StripPackage,
    /// Use only the terminal segment.
    Flatten,
    /// Replace the package with the initials of its parts.
    PackageInitials,
}

/// A flat, explicitly enumerated set of generator options.
///
/// Every field is an `Option<T>`: `None` means "not set at this layer,"
/// which lets the merge in [`ResolverContext::resolve`] distinguish "unset"
/// from "explicitly set to a falsy value" at each precedence layer, without
/// a separate bitmap tracking which fields were touched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationOverrides {
    pub allocation: Option<FieldAllocation>,
    pub max_size: Option<u32>,
    pub max_length: Option<u32>,
    pub max_count: Option<u32>,
    pub fixed_count: Option<bool>,
    pub fixed_length: Option<bool>,
    pub int_size: Option<u8>,
    pub long_names: Option<bool>,
    pub packed_enum: Option<bool>,
    pub packed_struct: Option<bool>,
    pub enum_to_string: Option<bool>,
    pub msgid: Option<u32>,
    pub no_unions: Option<bool>,
    pub anonymous_oneof: Option<bool>,
    pub proto3: Option<bool>,
    pub mangle_names: Option<MangleNames>,
    pub skip_message: Option<bool>,
    pub callback_datatype: Option<String>,
    pub callback_function: Option<String>,
    pub descriptorsize: Option<u32>,
}

impl AnnotationOverrides {
    /// The defaults every resolution starts from.
    pub fn builtin_defaults() -> Self {
        AnnotationOverrides {
            allocation: Some(FieldAllocation::Default),
            long_names: Some(true),
            mangle_names: Some(MangleNames::None),
            ..Default::default()
        }
    }

    /// Overwrites every field that `other` has set, leaving the rest
    /// untouched. The incoming (more specific) side always wins when set.
    pub fn merge_from(&mut self, other: &AnnotationOverrides) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field.clone();
                }
            };
        }
        take!(allocation);
        take!(max_size);
        take!(max_length);
        take!(max_count);
        take!(fixed_count);
        take!(fixed_length);
        take!(int_size);
        take!(long_names);
        take!(packed_enum);
        take!(packed_struct);
        take!(enum_to_string);
        take!(msgid);
        take!(no_unions);
        take!(anonymous_oneof);
        take!(proto3);
        take!(mangle_names);
        take!(skip_message);
        take!(callback_datatype);
        take!(callback_function);
        take!(descriptorsize);
    }

    /// Builds an override set from the wire-level `GeneratorOptions`
    /// attached to a schema element.
    pub fn from_wire(opts: &GeneratorOptions) -> Self {
        AnnotationOverrides {
            allocation: opts.r#type.and_then(field_type_from_wire),
            max_size: opts.max_size.map(|v| v as u32),
            max_length: opts.max_length.map(|v| v as u32),
            max_count: opts.max_count.map(|v| v as u32),
            fixed_count: opts.fixed_count,
            fixed_length: opts.fixed_length,
            int_size: opts.int_size.map(|v| v as u8),
            long_names: opts.long_names,
            packed_enum: opts.packed_enum,
            packed_struct: opts.packed_struct,
            enum_to_string: opts.enum_to_string,
            msgid: opts.msgid.map(|v| v as u32),
            no_unions: opts.no_unions,
            anonymous_oneof: opts.anonymous_oneof,
            proto3: opts.proto3,
            mangle_names: opts.mangle_names.and_then(mangle_names_from_wire),
            skip_message: opts.skip_message,
            callback_datatype: opts.callback_datatype.clone(),
            callback_function: opts.callback_function.clone(),
            descriptorsize: opts.descriptorsize.map(|v| v as u32),
        }
    }
}

fn field_type_from_wire(v: i32) -> Option<FieldAllocation> {
    match wire::FieldType::try_from(v).ok()? {
        wire::FieldType::Default => Some(FieldAllocation::Default),
        wire::FieldType::Static => Some(FieldAllocation::Static),
        wire::FieldType::Pointer => Some(FieldAllocation::Pointer),
        wire::FieldType::Callback => Some(FieldAllocation::Callback),
        wire::FieldType::Ignore => Some(FieldAllocation::Ignore),
    }
}

fn mangle_names_from_wire(v: i32) -> Option<MangleNames> {
    match wire::MangleNames::try_from(v).ok()? {
        wire::MangleNames::None => Some(MangleNames::None),
        wire::MangleNames::StripPackage => Some(MangleNames::StripPackage),
        wire::MangleNames::Flatten => Some(MangleNames::Flatten),
        wire::MangleNames::PackageInitials => Some(MangleNames::PackageInitials),
    }
}

/// One `glob -> overrides` entry loaded from a side file.
pub struct SidePattern {
    text: String,
    matcher: GlobMatcher,
    overrides: AnnotationOverrides,
}

impl SidePattern {
    /// Builds a side pattern from its source text and parsed glob.
    pub fn new(text: String, matcher: GlobMatcher, overrides: AnnotationOverrides) -> Self {
        SidePattern {
            text,
            matcher,
            overrides,
        }
    }

    /// The glob text as written in the side file, used in "pattern never
    /// matched" diagnostics.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Carries the side-file pattern table and the set of patterns that have
/// matched something so far, threaded explicitly through every resolution
/// call instead of living in a global.
///
/// Replaces what upstream code bases in this space model as a mutable
/// module-level singleton: constructing one per run and passing it by
/// `&mut` reference keeps resolution free of shared global state.
pub struct ResolverContext {
    patterns: Vec<SidePattern>,
    matched: HashSet<usize>,
    verbose: bool,
}

impl ResolverContext {
    /// Builds a context from a side-file pattern table.
    pub fn new(patterns: Vec<SidePattern>, verbose: bool) -> Self {
        ResolverContext {
            patterns,
            matched: HashSet::new(),
            verbose,
        }
    }

    /// An empty context with no side-file patterns loaded.
    pub fn empty() -> Self {
        ResolverContext::new(Vec::new(), false)
    }

    /// Resolves the effective annotations for one schema element.
    ///
    /// `enclosing` is the already-resolved annotation set of the nearest
    /// enclosing scope (file, then message, then field); `dotted_name` is
    /// this element's fully qualified dotted name, matched against every
    /// side-file glob in declaration order; `inline` is this element's own
    /// wire-level options, merged last.
    pub fn resolve(
        &mut self,
        enclosing: &AnnotationOverrides,
        dotted_name: &str,
        inline: &AnnotationOverrides,
    ) -> AnnotationOverrides {
        let mut resolved = enclosing.clone();

        for (index, pattern) in self.patterns.iter().enumerate() {
            if pattern.matcher.is_match(dotted_name) {
                resolved.merge_from(&pattern.overrides);
                self.matched.insert(index);
                if self.verbose {
                    log::debug!("{dotted_name} matched side pattern {}", pattern.text());
                }
            }
        }

        resolved.merge_from(inline);
        resolved
    }

    /// Side-file patterns that never matched any schema element this run,
    /// for the "unused pattern" warning.
    pub fn unused_patterns(&self) -> Vec<&str> {
        self.patterns
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.matched.contains(i))
            .map(|(_, p)| p.text())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::Glob;

    fn pattern(glob: &str, overrides: AnnotationOverrides) -> SidePattern {
        SidePattern::new(
            glob.to_string(),
            Glob::new(glob).unwrap().compile_matcher(),
            overrides,
        )
    }

    #[test]
    fn higher_precedence_source_wins_when_set() {
        let mut base = AnnotationOverrides {
            max_size: Some(10),
            ..Default::default()
        };
        let inline = AnnotationOverrides {
            max_size: Some(20),
            ..Default::default()
        };
        base.merge_from(&inline);
        assert_eq!(base.max_size, Some(20));
    }

    #[test]
    fn unset_field_is_preserved_across_merge() {
        let mut base = AnnotationOverrides {
            max_size: Some(10),
            long_names: Some(false),
            ..Default::default()
        };
        let inline = AnnotationOverrides {
            max_size: Some(20),
            ..Default::default()
        };
        base.merge_from(&inline);
        assert_eq!(base.long_names, Some(false));
    }

    #[test]
    fn side_file_pattern_applies_by_glob_match_on_dotted_name() {
        let p = pattern(
            "pkg.Foo.*",
            AnnotationOverrides {
                max_size: Some(32),
                ..Default::default()
            },
        );
        let mut ctx = ResolverContext::new(vec![p], false);
        let resolved = ctx.resolve(
            &AnnotationOverrides::builtin_defaults(),
            "pkg.Foo.bar",
            &AnnotationOverrides::default(),
        );
        assert_eq!(resolved.max_size, Some(32));
        assert!(ctx.unused_patterns().is_empty());
    }

    #[test]
    fn unmatched_pattern_is_reported_as_unused() {
        let p = pattern("other.*", AnnotationOverrides::default());
        let mut ctx = ResolverContext::new(vec![p], false);
        ctx.resolve(
            &AnnotationOverrides::builtin_defaults(),
            "pkg.Foo.bar",
            &AnnotationOverrides::default(),
        );
        assert_eq!(ctx.unused_patterns(), vec!["other.*"]);
    }
}
