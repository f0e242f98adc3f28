/// Knobs for one compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Namespace searched last during name resolution.
    pub builtin_namespace: String,
    /// Treat any warning as a fatal error once lowering finishes.
    pub warnings_as_errors: bool,
    /// Maximum generic nesting depth of a specialized type or function name.
    pub max_specialization_depth: usize,
    /// Report every lowered instruction table to the sink at debug severity.
    pub dump_ir: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            builtin_namespace: "std".to_string(),
            warnings_as_errors: false,
            max_specialization_depth: 32,
            dump_ir: false,
        }
    }
}
