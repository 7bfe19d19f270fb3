use std::collections::HashMap;

/// Per-method redaction policy, looked up at log time per spec.md §4.1.
/// Missing entries (no spec given for a method) default to fully
/// redacted, matching "missing entries default to fully-redacted".
#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: String,
    pub args_loggable: Vec<bool>,
    pub result_loggable: bool,
}

impl MethodSpec {
    /// Whether argument `index` may be logged verbatim. Arguments beyond
    /// the declared `args_loggable` length are treated as redacted;
    /// variadic/overflow args never get an implicit pass.
    pub fn arg_loggable(&self, index: usize) -> bool {
        self.args_loggable.get(index).copied().unwrap_or(false)
    }
}

/// The set of callable methods of an exposed object, plus their redaction
/// policy. In the source system this is derived by reflecting over a
/// class's prototype; there is no runtime reflection in Rust, so each
/// exposed type builds its `Schema` explicitly at construction time (see
/// spec.md §9 "Reflective schema").
#[derive(Debug, Clone, Default)]
pub struct Schema {
    methods: HashMap<String, MethodSpec>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

#[derive(Default)]
pub struct SchemaBuilder {
    methods: HashMap<String, MethodSpec>,
}

impl SchemaBuilder {
    /// Registers a method that is never logged verbatim (all args and the
    /// result are redacted). The common case for anything touching
    /// user-identifying data.
    pub fn redacted_method(mut self, name: impl Into<String>, arg_count: usize) -> Self {
        let name = name.into();
        self.methods.insert(
            name.clone(),
            MethodSpec {
                name,
                args_loggable: vec![false; arg_count],
                result_loggable: false,
            },
        );
        self
    }

    /// Registers a method with an explicit per-argument / result
    /// redaction policy.
    pub fn method(
        mut self,
        name: impl Into<String>,
        args_loggable: Vec<bool>,
        result_loggable: bool,
    ) -> Self {
        let name = name.into();
        self.methods.insert(
            name.clone(),
            MethodSpec {
                name,
                args_loggable,
                result_loggable,
            },
        );
        self
    }

    /// Registers a method whose args and result are all safe to log
    /// verbatim (e.g. `ping`, `serverInfo`).
    pub fn loggable_method(self, name: impl Into<String>, arg_count: usize) -> Self {
        self.method(name, vec![true; arg_count], true)
    }

    pub fn build(self) -> Schema {
        Schema { methods: self.methods }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn missing_method_has_no_spec() {
        let schema = Schema::builder().loggable_method("ping", 0).build();
        assert!(schema.method("ping").is_some());
        assert!(schema.method("unknown").is_none());
    }

    #[test]
    fn overflow_args_default_to_redacted() {
        let schema = Schema::builder().method("echo", vec![true], true).build();
        let spec = schema.method("echo").expect("registered");
        assert!(spec.arg_loggable(0));
        assert!(!spec.arg_loggable(1));
    }
}
