//! Compilation options.

/// Default limit on nested pattern references.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 32;

/// Options controlling a compile call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Seed for every random stream (humanize, Markov, random arpeggios,
    /// probability and density draws).
    pub seed: u32,
    /// First arrangement entry to compile, by section name.
    pub start_section: Option<String>,
    /// Last arrangement entry to compile (inclusive), by section name.
    pub end_section: Option<String>,
    /// Maximum nesting of conditional/extends/transform references.
    pub max_resolution_depth: usize,
    /// Expand section occurrences on the rayon thread pool.
    pub parallel: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            start_section: None,
            end_section: None,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            parallel: true,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_start_section(mut self, name: impl Into<String>) -> Self {
        self.start_section = Some(name.into());
        self
    }

    pub fn with_end_section(mut self, name: impl Into<String>) -> Self {
        self.end_section = Some(name.into());
        self
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
