//! # Hooks
//!
//! A hook is a one-argument function over the data validated so far. It
//! returns either a value or a [`HookFailure`]:
//!
//! - cross-field hooks ("validators") return the updated data map, which
//!   must be a JSON object;
//! - derived hooks return the value stored under their field name.
//!
//! Hooks are referenced by name ([`HookRef::Named`]) or supplied inline
//! ([`HookRef::Inline`]). Names are resolved against a [`HookTable`] once,
//! at build time, and the registry stores the function itself together with
//! a stable [`HookIdentity`]. Nothing is looked up by name during
//! validation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fieldspec_core::{DataMap, ErrorKind, FieldPath, ValidationError};
use serde::Serialize;
use serde_json::Value;

use crate::error::BuildError;

/// Signature shared by cross-field and derived hooks.
pub type HookFn = dyn Fn(&DataMap) -> Result<Value, HookFailure> + Send + Sync;

/// A shareable hook function.
#[derive(Clone)]
pub struct Hook(Arc<HookFn>);

impl Hook {
    /// Wrap a closure or function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&DataMap) -> Result<Value, HookFailure> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the hook.
    pub fn call(&self, data: &DataMap) -> Result<Value, HookFailure> {
        (self.0)(data)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// Why a hook rejected the data.
#[derive(Debug, Clone, PartialEq)]
pub enum HookFailure {
    /// A plain message; the pipeline wraps it into a [`ValidationError`].
    Message(String),
    /// A pre-built error. Cross-field hooks report it as is; derived hooks
    /// fold it into their own error.
    Error(ValidationError),
    /// Several pre-built errors, handled like [`HookFailure::Error`].
    Errors(Vec<ValidationError>),
}

impl HookFailure {
    /// Shorthand for [`HookFailure::Message`].
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// Convert into reportable errors tagged with the hook's identity.
    ///
    /// Messages become one error of `kind` at `path`. Pre-built errors keep
    /// their own kind and path; an empty list still yields one error so a
    /// failure is never silently dropped.
    pub fn into_errors(
        self,
        kind: ErrorKind,
        path: FieldPath,
        identity: &HookIdentity,
    ) -> Vec<ValidationError> {
        let tag = identity.qualified();
        match self {
            Self::Message(msg) => vec![ValidationError::new(kind, path, msg).with_hook(tag)],
            Self::Error(err) => vec![err.with_hook(tag)],
            Self::Errors(errs) if errs.is_empty() => {
                vec![ValidationError::new(kind, path, "hook failed without a reason").with_hook(tag)]
            }
            Self::Errors(errs) => errs.into_iter().map(|e| e.with_hook(tag.clone())).collect(),
        }
    }

    /// Fold into the single error reported for a failed derived field.
    ///
    /// Whatever the hook returned, the result has kind
    /// [`ErrorKind::DerivedHookFailed`] and sits at the derived field's
    /// `path`. Pre-built error messages are joined with `"; "`.
    pub fn into_derived_error(self, path: FieldPath, identity: &HookIdentity) -> ValidationError {
        let message = match self {
            Self::Message(msg) => msg,
            Self::Error(err) => err.message,
            Self::Errors(errs) if errs.is_empty() => "hook failed without a reason".to_string(),
            Self::Errors(errs) => errs
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; "),
        };
        ValidationError::new(ErrorKind::DerivedHookFailed, path, message)
            .with_hook(identity.qualified())
    }
}

impl From<&str> for HookFailure {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_string())
    }
}

impl From<String> for HookFailure {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

impl From<ValidationError> for HookFailure {
    fn from(err: ValidationError) -> Self {
        Self::Error(err)
    }
}

impl From<Vec<ValidationError>> for HookFailure {
    fn from(errs: Vec<ValidationError>) -> Self {
        Self::Errors(errs)
    }
}

/// A hook as written in a definition: by name or inline.
#[derive(Debug, Clone)]
pub enum HookRef {
    /// Looked up in the [`HookTable`] at build time.
    Named(String),
    /// An anonymous function; its identity is synthesized at build time.
    Inline(Hook),
}

impl HookRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn inline<F>(f: F) -> Self
    where
        F: Fn(&DataMap) -> Result<Value, HookFailure> + Send + Sync + 'static,
    {
        Self::Inline(Hook::new(f))
    }
}

impl From<&str> for HookRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<Hook> for HookRef {
    fn from(hook: Hook) -> Self {
        Self::Inline(hook)
    }
}

/// Stable identity of a resolved hook, used in error messages and in
/// generated schema extension metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookIdentity {
    /// Registered name, or a synthesized `validator#<n>` / `<field>#<n>`.
    pub name: String,
    /// Namespace the hook was registered under; `None` for inline hooks.
    pub module: Option<String>,
    /// Position in its hook list.
    pub ordinal: usize,
}

impl HookIdentity {
    /// `module::name`, or just `name` without a module.
    pub fn qualified(&self) -> String {
        match &self.module {
            Some(module) => format!("{module}::{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for HookIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// A hook bound to its identity, as stored on a registry.
#[derive(Debug, Clone)]
pub struct ResolvedHook {
    pub identity: HookIdentity,
    pub hook: Hook,
}

#[derive(Debug, Clone)]
struct TableEntry {
    module: Option<String>,
    hook: Hook,
}

/// Named hooks available to definitions.
#[derive(Debug, Clone, Default)]
pub struct HookTable {
    entries: BTreeMap<String, TableEntry>,
}

impl HookTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the built-in normalizing hooks, registered under the
    /// `standard` module:
    ///
    /// - `strip_whitespace`: trims every top-level string value;
    /// - `lowercase`: lowercases every top-level string value.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register_in("standard", "strip_whitespace", Hook::new(|data| {
            Ok(map_strings(data, |s| s.trim().to_string()))
        }));
        table.register_in("standard", "lowercase", Hook::new(|data| {
            Ok(map_strings(data, str::to_lowercase))
        }));
        table
    }

    /// Register a hook with no module. Replaces an existing entry.
    pub fn register(&mut self, name: impl Into<String>, hook: Hook) -> &mut Self {
        self.entries.insert(name.into(), TableEntry { module: None, hook });
        self
    }

    /// Register a hook under a module namespace. Replaces an existing entry.
    pub fn register_in(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        hook: Hook,
    ) -> &mut Self {
        self.entries.insert(
            name.into(),
            TableEntry {
                module: Some(module.into()),
                hook,
            },
        );
        self
    }

    /// Returns true if a hook is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolve a hook reference to a function plus identity.
    ///
    /// `anonymous` names an inline hook; `referrer` describes who asked, for
    /// the error message.
    pub(crate) fn resolve(
        &self,
        hook_ref: &HookRef,
        anonymous: String,
        ordinal: usize,
        referrer: &str,
    ) -> Result<ResolvedHook, BuildError> {
        match hook_ref {
            HookRef::Named(name) => {
                let entry = self.entries.get(name).ok_or_else(|| BuildError::UnknownHook {
                    name: name.clone(),
                    referrer: referrer.to_string(),
                })?;
                Ok(ResolvedHook {
                    identity: HookIdentity {
                        name: name.clone(),
                        module: entry.module.clone(),
                        ordinal,
                    },
                    hook: entry.hook.clone(),
                })
            }
            HookRef::Inline(hook) => Ok(ResolvedHook {
                identity: HookIdentity {
                    name: anonymous,
                    module: None,
                    ordinal,
                },
                hook: hook.clone(),
            }),
        }
    }
}

fn map_strings(data: &DataMap, f: impl Fn(&str) -> String) -> Value {
    Value::Object(
        data.iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => Value::String(f(s)),
                    other => other.clone(),
                };
                (k.clone(), v)
            })
            .collect(),
    )
}
