//! Stateless formatters that turn a resolved file model into header and
//! source text. Emission never mutates the model and is deterministic:
//! identical input models always render identical text.

mod header;
mod source;

pub use header::emit_header;
pub use source::emit_source;

/// Options controlling how include lines and guards are rendered, mirroring
/// the CLI surface in `cli::Args`.
#[derive(Clone, Debug)]
pub struct EmitOptions {
    pub header_extension: String,
    pub source_extension: String,
    pub genformat: String,
    pub libformat: String,
    pub strip_path: bool,
    pub timestamp: Option<String>,
    pub cpp_descriptors: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            header_extension: ".pb.h".to_string(),
            source_extension: ".pb.c".to_string(),
            genformat: "#include \"%s\"\n".to_string(),
            libformat: "#include <%s>\n".to_string(),
            strip_path: false,
            timestamp: None,
            cpp_descriptors: false,
        }
    }
}

/// Renders `template` with `value` substituted for its first `%s`, or
/// returns `template` unchanged when it contains none (mirroring the
/// fallback the upstream generator uses when a format string is a bare
/// literal).
pub(crate) fn render_template(template: &str, value: &str) -> String {
    if template.contains("%s") {
        template.replacen("%s", value, 1)
    } else {
        template.to_string()
    }
}

/// Turns a `.proto` base name into a safe C identifier for header guards:
/// uppercase alphanumerics, everything else becomes `_`.
pub(crate) fn guard_identifier(base_name: &str) -> String {
    base_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}
