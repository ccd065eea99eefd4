//! Command-line surface: the flags the generator accepts when invoked
//! directly over a serialized descriptor set.

use std::path::PathBuf;

use clap::Parser;

/// Compiles a Protocol Buffers descriptor set into nanopb-style static
/// field descriptor tables.
#[derive(Parser, Debug)]
#[command(name = "nanopb-gen", version, about)]
pub struct Args {
    /// Serialized `FileDescriptorSet` input(s) to compile.
    pub inputs: Vec<PathBuf>,

    /// A file name that must not appear in the emitted include list.
    /// Repeatable.
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Suffix used for generated headers.
    #[arg(long, default_value = ".pb.h")]
    pub header_extension: String,

    /// Suffix used for generated sources.
    #[arg(long, default_value = ".pb.c")]
    pub source_extension: String,

    /// `%s`-templated side-file name pattern.
    #[arg(long, default_value = "%s.options")]
    pub options_file: String,

    /// Directory to search for side files, tried in order. Repeatable.
    #[arg(long = "options_path")]
    pub options_path: Vec<PathBuf>,

    /// Directory generated artifacts are written into.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Template used for emitted include lines referencing other generated
    /// headers.
    #[arg(long, default_value = "#include \"%s\"\n")]
    pub genformat: String,

    /// Template used for the runtime `pb.h` include.
    #[arg(long, default_value = "#include <%s>\n")]
    pub libformat: String,

    /// `%s`-templated pattern applied to a file's base name before the
    /// extension is appended.
    #[arg(long, default_value = "%s")]
    pub fileformat: String,

    /// Drop directory components from emitted include names.
    #[arg(long, overrides_with = "no_strip_path")]
    pub strip_path: bool,

    /// Opposite of `--strip-path` (the default).
    #[arg(long, overrides_with = "strip_path")]
    pub no_strip_path: bool,

    /// Additionally emit a C++ descriptor-lookup template block.
    #[arg(long)]
    pub cpp_descriptors: bool,

    /// Include a generation timestamp in each artifact's preamble.
    #[arg(long, overrides_with = "no_timestamp")]
    pub timestamp: bool,

    /// Opposite of `--timestamp` (the default).
    #[arg(long, overrides_with = "timestamp")]
    pub no_timestamp: bool,

    /// Suppress "unused side pattern" warnings.
    #[arg(short, long)]
    pub quiet: bool,

    /// Log each side pattern as it matches a schema element.
    #[arg(short, long)]
    pub verbose: bool,

    /// A `KEY:VALUE` annotation override applied before any file-level or
    /// side-file setting. Repeatable.
    #[arg(long = "settings")]
    pub settings: Vec<String>,

    /// Run as a protoc plugin, reading a `CodeGeneratorRequest` on stdin
    /// and writing a `CodeGeneratorResponse` on stdout instead of reading
    /// `inputs` directly.
    #[arg(long)]
    pub protoc_plugin: bool,
}

impl Args {
    /// `true` when this invocation should behave as a protoc plugin: the
    /// flag is explicit, or argv[0] looks like `protoc-gen-*`, exactly how
    /// a plugin binary is conventionally invoked by the schema compiler.
    pub fn is_plugin_mode(&self, argv0: &str) -> bool {
        self.protoc_plugin || argv0.contains("protoc-gen-")
    }
}
