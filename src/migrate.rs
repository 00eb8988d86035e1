//! Linear schema migrations driven by a persisted version counter.
//!
//! Step `i` (0-based) moves the schema from version `i` to `i + 1`. The version is stored
//! under `schema_version` in the metadata relation and written once after each step
//! completes, so a failed run resumes at the step that failed.
//!
//! Steps are not wrapped in a transaction. A step that fails halfway keeps whatever it
//! already executed; write steps so they can be re-run (`IF NOT EXISTS` DDL), or call
//! [`QueryExecutor::atomic`] inside `apply`.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SqlFragmentError;
use crate::executor::QueryExecutor;
use crate::fragment::Fragment;
use crate::host::StorageHandle;
use crate::meta::MetadataTable;

type StepHook<H> = Box<dyn Fn(&mut H) -> Result<(), SqlFragmentError>>;
type PendingObserver<H> = Box<dyn Fn(&[Migration<H>])>;

/// One named migration step.
pub struct Migration<H> {
    name: Cow<'static, str>,
    before_apply: Option<StepHook<H>>,
    apply: StepHook<H>,
}

impl<H> Migration<H> {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, apply: F) -> Self
    where
        F: Fn(&mut H) -> Result<(), SqlFragmentError> + 'static,
    {
        Self {
            name: name.into(),
            before_apply: None,
            apply: Box::new(apply),
        }
    }

    /// Hook run right before `apply`, against the same handle.
    #[must_use]
    pub fn before_apply<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut H) -> Result<(), SqlFragmentError> + 'static,
    {
        self.before_apply = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn has_before_apply(&self) -> bool {
        self.before_apply.is_some()
    }

    fn run_hooks(&self, handle: &mut H) -> Result<(), SqlFragmentError> {
        if let Some(hook) = &self.before_apply {
            hook(handle)?;
        }
        (self.apply)(handle)
    }
}

impl<H: StorageHandle + 'static> Migration<H> {
    /// Step that runs each literal statement in order.
    pub fn statements(
        name: impl Into<Cow<'static, str>>,
        statements: &'static [&'static str],
    ) -> Self {
        Self::new(name, move |handle: &mut H| {
            for &statement in statements {
                handle.none(Fragment::literal(statement))?;
            }
            Ok(())
        })
    }
}

impl<H> fmt::Debug for Migration<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("before_apply", &self.has_before_apply())
            .finish_non_exhaustive()
    }
}

/// Snapshot returned by [`MigrationRunner::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatus {
    pub current_version: u32,
    pub target_version: u32,
    pub pending_steps: Vec<String>,
}

impl MigrationStatus {
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.pending_steps.is_empty()
    }
}

/// Outcome of [`MigrationRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    pub applied: Vec<String>,
}

impl MigrationReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Applies an ordered list of [`Migration`]s.
///
/// ```rust
/// # #[cfg(feature = "sqlite")]
/// # fn demo() -> Result<(), sql_fragment::SqlFragmentError> {
/// use sql_fragment::prelude::*;
///
/// let runner = MigrationRunner::new(vec![
///     Migration::statements("create_users", &["CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY)"]),
///     Migration::statements("add_email", &["ALTER TABLE users ADD COLUMN email TEXT"]),
/// ])?;
///
/// let mut db = SqliteHandle::open_in_memory()?;
/// let report = runner.run(&mut db)?;
/// assert_eq!(report.to_version, 2);
/// assert!(runner.run(&mut db)?.is_noop());
/// # Ok(()) }
/// # #[cfg(feature = "sqlite")]
/// # demo().unwrap();
/// ```
pub struct MigrationRunner<H> {
    steps: Vec<Migration<H>>,
    metadata: MetadataTable,
    on_pending: Option<PendingObserver<H>>,
}

impl<H> fmt::Debug for MigrationRunner<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("steps", &self.steps)
            .field("metadata", &self.metadata)
            .field("on_pending", &self.on_pending.is_some())
            .finish()
    }
}

impl<H> MigrationRunner<H> {
    /// # Errors
    ///
    /// Returns `SqlFragmentError::ConfigError` on duplicate step names or more steps than a
    /// `u32` version can count.
    pub fn new(steps: Vec<Migration<H>>) -> Result<Self, SqlFragmentError> {
        if u32::try_from(steps.len()).is_err() {
            return Err(SqlFragmentError::ConfigError(format!(
                "{} migration steps exceed the version range",
                steps.len()
            )));
        }
        let mut seen = HashSet::with_capacity(steps.len());
        for step in &steps {
            if !seen.insert(step.name()) {
                return Err(SqlFragmentError::ConfigError(format!(
                    "duplicate migration step name {:?}",
                    step.name()
                )));
            }
        }
        Ok(Self {
            steps,
            metadata: MetadataTable::default(),
            on_pending: None,
        })
    }

    /// Store the version in a differently named metadata relation.
    ///
    /// # Errors
    ///
    /// Returns `SqlFragmentError::ConfigError` if `name` is not a plain identifier.
    pub fn with_metadata_table(mut self, name: &'static str) -> Result<Self, SqlFragmentError> {
        self.metadata = MetadataTable::new(name)?;
        Ok(self)
    }

    /// Called once with the pending steps before the first one runs; never called when
    /// nothing is pending.
    #[must_use]
    pub fn on_pending<F>(mut self, observer: F) -> Self
    where
        F: Fn(&[Migration<H>]) + 'static,
    {
        self.on_pending = Some(Box::new(observer));
        self
    }

    #[must_use]
    pub fn steps(&self) -> &[Migration<H>] {
        &self.steps
    }

    #[must_use]
    pub fn metadata(&self) -> MetadataTable {
        self.metadata
    }

    /// Version reached once every step has been applied.
    #[must_use]
    pub fn target_version(&self) -> u32 {
        version_after(self.steps.len())
    }
}

impl<H: StorageHandle> MigrationRunner<H> {
    /// Read the persisted version and list what a run would apply.
    ///
    /// Read-only: a missing metadata relation reads as version 0 and is not created, so
    /// this works on read-only connections.
    ///
    /// # Errors
    ///
    /// Returns `SchemaAhead` if the database is ahead of the known steps, or the host's
    /// rejection.
    pub fn status(&self, handle: &mut H) -> Result<MigrationStatus, SqlFragmentError> {
        let current = self.current_version(handle)?;
        Ok(MigrationStatus {
            current_version: current,
            target_version: self.target_version(),
            pending_steps: self
                .pending(current)
                .iter()
                .map(|step| step.name().to_owned())
                .collect(),
        })
    }

    /// Apply every pending step in order, persisting the version after each one.
    ///
    /// # Errors
    ///
    /// `MigrationStep` naming the failed step and its target version when its hooks or the
    /// version write fail (the version stays at the last completed step), `SchemaAhead`, or
    /// the host's rejection while reading the version.
    pub fn run(&self, handle: &mut H) -> Result<MigrationReport, SqlFragmentError> {
        let current = self.current_version(handle)?;
        let pending = self.pending(current);
        if pending.is_empty() {
            debug!(version = current, "schema is up to date");
            return Ok(MigrationReport {
                from_version: current,
                to_version: current,
                applied: Vec::new(),
            });
        }

        if let Some(observer) = &self.on_pending {
            observer(pending);
        }
        info!(
            from = current,
            to = self.target_version(),
            pending = pending.len(),
            "applying migrations"
        );

        let mut version = current;
        let mut applied = Vec::with_capacity(pending.len());
        for step in pending {
            let target = version + 1;
            let outcome = step
                .run_hooks(handle)
                .and_then(|()| self.metadata.set_schema_version(handle, target));
            if let Err(source) = outcome {
                warn!(step = step.name(), version = target, error = %source, "migration step failed");
                return Err(SqlFragmentError::MigrationStep {
                    name: step.name().to_owned(),
                    version: target,
                    source: Box::new(source),
                });
            }
            info!(step = step.name(), version = target, "applied migration");
            version = target;
            applied.push(step.name().to_owned());
        }

        Ok(MigrationReport {
            from_version: current,
            to_version: version,
            applied,
        })
    }

    fn current_version(&self, handle: &mut H) -> Result<u32, SqlFragmentError> {
        let current = self.metadata.schema_version(handle)?;
        let known = self.target_version();
        if current > known {
            return Err(SqlFragmentError::SchemaAhead {
                found: current,
                known,
            });
        }
        Ok(current)
    }
}

impl<H> MigrationRunner<H> {
    fn pending(&self, current: u32) -> &[Migration<H>] {
        let start = usize::try_from(current).unwrap_or(usize::MAX);
        self.steps.get(start..).unwrap_or(&[])
    }
}

fn version_after(steps: usize) -> u32 {
    // step count is bounded by `MigrationRunner::new`
    u32::try_from(steps).unwrap_or(u32::MAX)
}
