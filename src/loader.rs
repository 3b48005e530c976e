use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::env::{TargetEnv, is_settable};
use crate::error::Error;
use crate::model::{CircularPolicy, Entry, LoadReport, Pair, SubstitutionMode};
use crate::reader::{parse_str, strip_bom};
use crate::resolver::finalize_all;

/// Load `.env` from the current working directory into the process environment.
///
/// # Safety
///
/// The caller must ensure no other threads concurrently read or write the
/// process environment while this runs.
pub unsafe fn dotenv() -> Result<LoadReport, Error> {
    // SAFETY: forwarded to the caller.
    unsafe { from_filename(".env") }
}

/// Load a `.env` file from a specific path into the process environment.
///
/// # Safety
///
/// Same contract as [`dotenv`].
pub unsafe fn from_path(path: impl AsRef<Path>) -> Result<LoadReport, Error> {
    // SAFETY: forwarded to the caller.
    let target = unsafe { TargetEnv::process() };
    EnvLoader::new().path(path).target(target).load()
}

/// Load multiple `.env` files into the process environment.
///
/// # Safety
///
/// Same contract as [`dotenv`].
pub unsafe fn from_paths<I, P>(paths: I) -> Result<LoadReport, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    // SAFETY: forwarded to the caller.
    let target = unsafe { TargetEnv::process() };
    EnvLoader::new().paths(paths).target(target).load()
}

/// Load a dotenv file by filename from the current working directory.
///
/// # Safety
///
/// Same contract as [`dotenv`].
pub unsafe fn from_filename(name: &str) -> Result<LoadReport, Error> {
    // SAFETY: forwarded to the caller.
    unsafe { from_path(PathBuf::from(name)) }
}

/// Builder-style dotenv loader.
///
/// Every file is scanned and resolved on its own: `${NAME}` only sees pairs
/// of the same file, never the target environment. Files are then applied in
/// order and the first occurrence of a key wins.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    paths: Vec<PathBuf>,
    required: bool,
    override_existing: bool,
    substitution_mode: SubstitutionMode,
    circular_policy: CircularPolicy,
    target: TargetEnv,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.paths
            .extend(paths.into_iter().map(|path| path.as_ref().to_path_buf()));
        self
    }

    /// When false, missing files are skipped instead of failing the load.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn override_existing(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    pub fn substitution_mode(mut self, substitution_mode: SubstitutionMode) -> Self {
        self.substitution_mode = substitution_mode;
        self
    }

    pub fn circular_policy(mut self, circular_policy: CircularPolicy) -> Self {
        self.circular_policy = circular_policy;
        self
    }

    pub fn target(mut self, target: TargetEnv) -> Self {
        self.target = target;
        self
    }

    pub fn target_env(&self) -> &TargetEnv {
        &self.target
    }

    pub fn into_target(self) -> TargetEnv {
        self.target
    }

    /// Scan and resolve every file without touching the target.
    pub fn parse_only(&self) -> Result<Vec<Entry>, Error> {
        Ok(self.collect_entries()?.entries)
    }

    pub fn load(&mut self) -> Result<LoadReport, Error> {
        let collected = self.collect_entries()?;
        let mut report = LoadReport {
            files_read: collected.files_read,
            circular: collected.circular,
            ..LoadReport::default()
        };

        let mut seen = HashSet::new();
        for entry in collected.entries {
            if !seen.insert(entry.key.clone()) {
                debug!(key = %entry.key, "skipping duplicate key");
                report.duplicates += 1;
                continue;
            }

            if !is_settable(&entry.key, &entry.value) {
                warn!(key = %entry.key, "skipping key the environment cannot hold");
                continue;
            }

            if !self.override_existing && self.target.contains_key(&entry.key) {
                debug!(key = %entry.key, "skipping existing key");
                report.skipped_existing += 1;
                continue;
            }

            self.target.set_var(&entry.key, &entry.value);
            report.loaded += 1;
        }

        Ok(report)
    }

    fn collect_entries(&self) -> Result<Collected, Error> {
        let mut collected = Collected::default();

        for path in self.effective_paths() {
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound && !self.required => {
                    debug!(path = %path.display(), "skipping missing optional file");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            collected.files_read += 1;

            let text = std::str::from_utf8(&bytes)?;
            let pairs = self.resolve_file(strip_bom(text), &path, &mut collected)?;
            debug!(path = %path.display(), pairs = pairs.len(), "read dotenv file");

            collected
                .entries
                .extend(pairs.into_iter().map(|pair| entry_from(pair, &path)));
        }

        Ok(collected)
    }

    fn resolve_file(
        &self,
        text: &str,
        path: &Path,
        collected: &mut Collected,
    ) -> Result<Vec<Pair>, Error> {
        let mut pairs = parse_str(text);
        if self.substitution_mode == SubstitutionMode::Disabled {
            return Ok(pairs);
        }

        let report = finalize_all(&mut pairs);
        for &index in &report.circular {
            let key = pairs[index].key();
            if self.circular_policy == CircularPolicy::Error {
                return Err(Error::CircularReference {
                    key: key.to_owned(),
                    path: path.to_path_buf(),
                });
            }
            warn!(key, path = %path.display(), "circular variable reference, keeping partial value");
        }
        collected.circular += report.circular.len();
        Ok(pairs)
    }

    fn effective_paths(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(".env")]
        } else {
            self.paths.clone()
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            required: true,
            override_existing: false,
            substitution_mode: SubstitutionMode::Expand,
            circular_policy: CircularPolicy::KeepPartial,
            target: TargetEnv::memory(),
        }
    }
}

#[derive(Default)]
struct Collected {
    entries: Vec<Entry>,
    files_read: usize,
    circular: usize,
}

fn entry_from(pair: Pair, path: &Path) -> Entry {
    let (key, value) = pair.into_key_value();
    Entry {
        key,
        value,
        source: Some(path.to_path_buf()),
    }
}
