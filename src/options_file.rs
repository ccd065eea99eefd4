//! Reads an external side file of `<glob> <option>:<value>...` lines and
//! turns it into the [`SidePattern`] table a [`ResolverContext`] matches
//! against dotted qualified names.

use std::path::{Path, PathBuf};

use globset::Glob;

use crate::annotations::{AnnotationOverrides, FieldAllocation, MangleNames, SidePattern};
use crate::error::{Error, Result};

/// Parses the text of one side file into its pattern table.
///
/// Lines are `#`-comment-stripped and blank-line-skipped before parsing; a
/// surviving line is a glob pattern followed by whitespace-separated
/// `key:value` settings, e.g. `pkg.Foo.bar max_size:16 fixed_length:true`.
pub fn parse(contents: &str, source: &Path) -> Result<Vec<SidePattern>> {
    let mut patterns = Vec::new();

    for raw_line in contents.lines() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let glob_text = tokens.next().ok_or_else(|| Error::OptionsFile {
            path: source.to_path_buf(),
            message: "expected a glob pattern".to_string(),
        })?;

        let mut overrides = AnnotationOverrides::default();
        for token in tokens {
            let (key, value) = token.split_once(':').ok_or_else(|| Error::OptionsFile {
                path: source.to_path_buf(),
                message: format!("expected key:value, got '{token}'"),
            })?;
            apply_option(&mut overrides, key, value).map_err(|message| Error::OptionsFile {
                path: source.to_path_buf(),
                message,
            })?;
        }

        let matcher = Glob::new(glob_text)
            .map_err(|e| Error::OptionsFile {
                path: source.to_path_buf(),
                message: format!("invalid glob '{glob_text}': {e}"),
            })?
            .compile_matcher();

        patterns.push(SidePattern::new(glob_text.to_string(), matcher, overrides));
    }

    Ok(patterns)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Applies one `key:value` setting to `overrides`. Shared by side-file
/// parsing and by the CLI's repeatable `--settings KEY:VALUE` flag.
pub(crate) fn apply_option(overrides: &mut AnnotationOverrides, key: &str, value: &str) -> std::result::Result<(), String> {
    match key {
        "type" => {
            overrides.allocation = Some(match value {
                "FT_STATIC" | "STATIC" => FieldAllocation::Static,
                "FT_POINTER" | "POINTER" => FieldAllocation::Pointer,
                "FT_CALLBACK" | "CALLBACK" => FieldAllocation::Callback,
                "FT_IGNORE" | "IGNORE" => FieldAllocation::Ignore,
                "FT_DEFAULT" | "DEFAULT" => FieldAllocation::Default,
                other => return Err(format!("unrecognized allocation type '{other}'")),
            });
        }
        "max_size" => overrides.max_size = Some(parse_u32(value)?),
        "max_length" => overrides.max_length = Some(parse_u32(value)?),
        "max_count" => overrides.max_count = Some(parse_u32(value)?),
        "fixed_count" => overrides.fixed_count = Some(parse_bool(value)?),
        "fixed_length" => overrides.fixed_length = Some(parse_bool(value)?),
        "int_size" => overrides.int_size = Some(parse_u32(value)? as u8),
        "long_names" => overrides.long_names = Some(parse_bool(value)?),
        "packed_enum" => overrides.packed_enum = Some(parse_bool(value)?),
        "packed_struct" => overrides.packed_struct = Some(parse_bool(value)?),
        "enum_to_string" => overrides.enum_to_string = Some(parse_bool(value)?),
        "msgid" => overrides.msgid = Some(parse_u32(value)?),
        "no_unions" => overrides.no_unions = Some(parse_bool(value)?),
        "anonymous_oneof" => overrides.anonymous_oneof = Some(parse_bool(value)?),
        "proto3" => overrides.proto3 = Some(parse_bool(value)?),
        "mangle_names" => {
            overrides.mangle_names = Some(match value {
                "M_NONE" | "NONE" => MangleNames::None,
                "M_STRIP_PACKAGE" | "STRIP_PACKAGE" => MangleNames::StripPackage,
                "M_FLATTEN" | "FLATTEN" => MangleNames::Flatten,
                "M_PACKAGE_INITIALS" | "PACKAGE_INITIALS" => MangleNames::PackageInitials,
                other => return Err(format!("unrecognized mangle_names value '{other}'")),
            });
        }
        "skip_message" => overrides.skip_message = Some(parse_bool(value)?),
        "callback_datatype" => overrides.callback_datatype = Some(value.to_string()),
        "callback_function" => overrides.callback_function = Some(value.to_string()),
        "descriptorsize" => {
            overrides.descriptorsize = Some(match value {
                "AUTO" => 0,
                other => parse_u32(other)?,
            });
        }
        other => return Err(format!("unrecognized option '{other}'")),
    }
    Ok(())
}

fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value {
        "true" | "True" | "1" => Ok(true),
        "false" | "False" | "0" => Ok(false),
        other => Err(format!("expected true/false, got '{other}'")),
    }
}

fn parse_u32(value: &str) -> std::result::Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("expected an integer, got '{value}'"))
}

/// Locates and reads the side file for `proto_path`, substituting `%s` in
/// `pattern` with the proto file's path, and searching each directory in
/// `search_path` in order. Returns `Ok(None)` when no side file exists
/// anywhere on the path, which is not an error: most schema files simply
/// have no side file.
pub fn find_and_parse(
    proto_path: &str,
    pattern: &str,
    search_path: &[PathBuf],
) -> Result<Option<Vec<SidePattern>>> {
    let file_name = pattern.replacen("%s", proto_path, 1);

    let candidates: Vec<PathBuf> = if search_path.is_empty() {
        vec![PathBuf::from(&file_name)]
    } else {
        search_path.iter().map(|dir| dir.join(&file_name)).collect()
    };

    for candidate in candidates {
        if candidate.is_file() {
            let contents = std::fs::read_to_string(&candidate).map_err(|source| Error::Io {
                path: candidate.clone(),
                source,
            })?;
            return Ok(Some(parse(&contents, &candidate)?));
        }
    }

    Ok(None)
}
