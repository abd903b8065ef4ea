// Non-fatal findings collected while processing one drawing

/// Ordered sink for warnings. Parsers push warnings here and report fatal
/// conditions through their `Result`, so warnings raised before an abort are
/// still visible to the caller.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.warnings.iter().map(String::as_str)
    }
}
