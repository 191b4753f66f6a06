//! Synthesis options

/// Knobs applied to every proxy a synthesizer produces
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    /// Prefix of generated type names
    pub name_prefix: String,

    /// Check argument counts and types before entering the handler chain
    pub check_arguments: bool,

    /// Turn panics in method bodies into `Fault::Panic`
    pub catch_panics: bool,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            name_prefix: "Intercepted".to_string(),
            check_arguments: true,
            catch_panics: true,
        }
    }
}

impl ProxyOptions {
    /// Set the generated name prefix
    pub fn with_name_prefix(mut self, prefix: &str) -> Self {
        self.name_prefix = prefix.to_string();
        self
    }

    /// Enable or disable argument checks
    pub fn with_argument_checks(mut self, enabled: bool) -> Self {
        self.check_arguments = enabled;
        self
    }

    /// Enable or disable panic capture
    pub fn with_panic_capture(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }
}
