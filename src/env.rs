use std::collections::BTreeMap;

/// Destination for loaded environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEnv {
    kind: TargetEnvKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetEnvKind {
    /// Writes through [`std::env::set_var`], which mutates global process
    /// state and is not thread-safe for concurrent environment access.
    Process,
    Memory(BTreeMap<String, String>),
}

impl Default for TargetEnv {
    fn default() -> Self {
        Self::memory()
    }
}

impl TargetEnv {
    /// Create a process-environment target.
    ///
    /// # Safety
    ///
    /// The caller must ensure no other threads concurrently read or write the
    /// process environment for the duration of operations that may mutate this
    /// target.
    pub unsafe fn process() -> Self {
        Self {
            kind: TargetEnvKind::Process,
        }
    }

    /// Create an in-memory environment target.
    pub fn memory() -> Self {
        Self::from_memory(BTreeMap::new())
    }

    /// Create an in-memory environment target seeded with existing variables.
    pub fn from_memory(map: BTreeMap<String, String>) -> Self {
        Self {
            kind: TargetEnvKind::Memory(map),
        }
    }

    pub fn is_process(&self) -> bool {
        matches!(self.kind, TargetEnvKind::Process)
    }

    pub fn as_memory(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            TargetEnvKind::Memory(map) => Some(map),
            TargetEnvKind::Process => None,
        }
    }

    pub fn into_memory(self) -> Option<BTreeMap<String, String>> {
        match self.kind {
            TargetEnvKind::Memory(map) => Some(map),
            TargetEnvKind::Process => None,
        }
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        match &self.kind {
            TargetEnvKind::Process => std::env::var_os(key).is_some(),
            TargetEnvKind::Memory(map) => map.contains_key(key),
        }
    }

    pub(crate) fn set_var(&mut self, key: &str, value: &str) {
        match &mut self.kind {
            // SAFETY: `process()` is unsafe and its caller guarantees exclusive
            // access to the process environment.
            TargetEnvKind::Process => unsafe { std::env::set_var(key, value) },
            TargetEnvKind::Memory(map) => {
                map.insert(key.to_owned(), value.to_owned());
            }
        }
    }
}

/// Whether `std::env::set_var` accepts the pair without panicking.
///
/// Memory targets share the rule so both destinations load the same entries.
pub(crate) fn is_settable(key: &str, value: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '\0']) && !value.contains('\0')
}
