// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Parameter Namespace
//!
//! Merges the parameters declared by every compartment, mechanism and
//! receptor into one flat name -> quantity map.
//!
//! Each declaration has a base name (`g_L`, `V_th`, `tau_AMPA`), an owning
//! scope and a suffix used for qualification (`soma`, `L1_dend`). A base
//! name declared by one owner stays unqualified. When several owners declare
//! it, [`NamespacePolicy`] decides:
//!
//! | Policy | identical values | differing values |
//! |---|---|---|
//! | `ShareIdentical` | one shared `base` | `base_<suffix>` each |
//! | `AlwaysQualify` | `base_<suffix>` each | `base_<suffix>` each |
//!
//! Model-wide parameters replace every declaration of the same base name.
//! Any two entries ending up with the same final name is a
//! [`ModelError::NameCollision`]; differing values are never merged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use dendrify_units::Quantity;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespacePolicy {
    /// Share a name when every declaration agrees on value and dimension
    #[default]
    ShareIdentical,
    /// Qualify with the owner suffix whenever more than one owner declares a name
    AlwaysQualify,
}

impl fmt::Display for NamespacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespacePolicy::ShareIdentical => write!(f, "share_identical"),
            NamespacePolicy::AlwaysQualify => write!(f, "always_qualify"),
        }
    }
}

impl FromStr for NamespacePolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s {
            "share_identical" => Ok(NamespacePolicy::ShareIdentical),
            "always_qualify" => Ok(NamespacePolicy::AlwaysQualify),
            other => Err(ModelError::InvalidValue {
                owner: "namespace".to_string(),
                parameter: "policy".to_string(),
                reason: format!("expected 'share_identical' or 'always_qualify', got '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct Declaration {
    base: String,
    scope: String,
    suffix: String,
    value: Quantity,
}

/// Collects declarations before names are assigned
#[derive(Debug, Default)]
pub(crate) struct NamespaceResolver {
    declarations: Vec<Declaration>,
}

impl NamespaceResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Declare `base` for the owner identified by `scope`
    ///
    /// Redeclaring the same base in the same scope is accepted only with an
    /// identical value.
    pub(crate) fn declare(&mut self, scope: &str, suffix: &str, base: &str, value: Quantity) -> ModelResult<()> {
        if let Some(existing) = self
            .declarations
            .iter()
            .find(|d| d.scope == scope && d.base == base)
        {
            if existing.value == value {
                return Ok(());
            }
            return Err(ModelError::NameCollision(format!("{}_{}", base, suffix)));
        }
        self.declarations.push(Declaration {
            base: base.to_string(),
            scope: scope.to_string(),
            suffix: suffix.to_string(),
            value,
        });
        Ok(())
    }

    pub(crate) fn resolve(
        self,
        policy: NamespacePolicy,
        overrides: &BTreeMap<String, Quantity>,
    ) -> ModelResult<Namespace> {
        let mut groups: BTreeMap<&str, Vec<&Declaration>> = BTreeMap::new();
        for d in &self.declarations {
            groups.entry(d.base.as_str()).or_default().push(d);
        }

        let mut ns = Namespace::default();
        for (base, decls) in &groups {
            if let Some(value) = overrides.get(*base) {
                for d in decls.iter().filter(|d| d.value != *value) {
                    warn!(
                        target: "dendrify-model",
                        "Model-wide parameter {} = {} replaces {} declared by '{}'",
                        base, value, d.value, d.suffix
                    );
                }
                ns.insert(base, *value)?;
                ns.bind_all(decls, base);
                continue;
            }

            let first = decls[0].value;
            let identical = decls.iter().all(|d| d.value == first);
            let share = decls.len() == 1 || (identical && policy == NamespacePolicy::ShareIdentical);
            if share {
                ns.insert(base, first)?;
                ns.bind_all(decls, base);
            } else {
                if !identical {
                    debug!(
                        target: "dendrify-model",
                        "Parameter '{}' differs across {} owner(s); qualifying",
                        base,
                        decls.len()
                    );
                }
                for d in decls {
                    let name = format!("{}_{}", d.base, d.suffix);
                    ns.insert(&name, d.value)?;
                    ns.bind(d, &name);
                }
            }
        }

        for (name, value) in overrides {
            if !groups.contains_key(name.as_str()) {
                ns.insert(name, *value)?;
            }
        }
        Ok(ns)
    }
}

/// Resolved parameter names and values
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Namespace {
    names: BTreeMap<(String, String), String>,
    pub(crate) values: BTreeMap<String, Quantity>,
}

impl Namespace {
    fn bind(&mut self, d: &Declaration, name: &str) {
        self.names
            .insert((d.scope.clone(), d.base.clone()), name.to_string());
    }

    fn bind_all(&mut self, decls: &[&Declaration], name: &str) {
        for d in decls {
            self.bind(d, name);
        }
    }

    /// Add a fixed-name entry; fails if the name is taken
    pub(crate) fn insert(&mut self, name: &str, value: Quantity) -> ModelResult<()> {
        if self.values.contains_key(name) {
            return Err(ModelError::NameCollision(name.to_string()));
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Final name of `base` as declared in `scope`
    pub(crate) fn name(&self, scope: &str, base: &str) -> Option<&str> {
        self.names
            .get(&(scope.to_string(), base.to_string()))
            .map(String::as_str)
    }

    /// `(base, final name)` of every parameter declared in `scope`
    pub(crate) fn scoped<'a>(&'a self, scope: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.names
            .iter()
            .filter(move |((s, _), _)| s == scope)
            .map(|((_, base), name)| (base.as_str(), name.as_str()))
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub(crate) fn into_values(self) -> BTreeMap<String, Quantity> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dendrify_units::units;

    fn resolver() -> NamespaceResolver {
        let mut r = NamespaceResolver::new();
        r.declare("c:soma", "soma", "C", 200.0 * units::PICOFARAD).unwrap();
        r.declare("c:dend", "dend", "C", 50.0 * units::PICOFARAD).unwrap();
        r.declare("c:soma", "soma", "E_L", -70.0 * units::MILLIVOLT).unwrap();
        r.declare("c:dend", "dend", "E_L", -70.0 * units::MILLIVOLT).unwrap();
        r.declare("c:soma", "soma", "V_th", -50.0 * units::MILLIVOLT).unwrap();
        r
    }

    #[test]
    fn test_share_identical() {
        let ns = resolver()
            .resolve(NamespacePolicy::ShareIdentical, &BTreeMap::new())
            .unwrap();
        let names: Vec<_> = ns.values.keys().cloned().collect();
        assert_eq!(names, vec!["C_dend", "C_soma", "E_L", "V_th"]);
        assert_eq!(ns.name("c:dend", "E_L"), Some("E_L"));
        assert_eq!(ns.name("c:dend", "C"), Some("C_dend"));
    }

    #[test]
    fn test_always_qualify() {
        let ns = resolver()
            .resolve(NamespacePolicy::AlwaysQualify, &BTreeMap::new())
            .unwrap();
        let names: Vec<_> = ns.values.keys().cloned().collect();
        assert_eq!(names, vec!["C_dend", "C_soma", "E_L_dend", "E_L_soma", "V_th"]);
    }

    #[test]
    fn test_model_wide_override() {
        let mut overrides = BTreeMap::new();
        overrides.insert("E_L".to_string(), -65.0 * units::MILLIVOLT);
        overrides.insert("tau_Na".to_string(), 0.5 * units::MILLISECOND);
        let ns = resolver()
            .resolve(NamespacePolicy::AlwaysQualify, &overrides)
            .unwrap();
        assert_eq!(ns.values.get("E_L"), Some(&(-65.0 * units::MILLIVOLT)));
        assert_eq!(ns.name("c:soma", "E_L"), Some("E_L"));
        assert!(ns.contains("tau_Na"));
        assert!(!ns.contains("E_L_soma"));
    }

    #[test]
    fn test_conflicting_redeclaration_in_one_scope() {
        let mut r = resolver();
        let err = r
            .declare("c:soma", "soma", "V_th", -40.0 * units::MILLIVOLT)
            .unwrap_err();
        assert_eq!(err, ModelError::NameCollision("V_th_soma".into()));
        assert!(r.declare("c:soma", "soma", "V_th", -50.0 * units::MILLIVOLT).is_ok());
    }

    #[test]
    fn test_qualified_name_collides_with_declared_name() {
        let mut r = resolver();
        r.declare("c:soma", "soma", "C_dend", 1.0 * units::PICOFARAD).unwrap();
        let err = r
            .resolve(NamespacePolicy::ShareIdentical, &BTreeMap::new())
            .unwrap_err();
        assert_eq!(err, ModelError::NameCollision("C_dend".into()));
    }

    #[test]
    fn test_scoped_lookup() {
        let ns = resolver()
            .resolve(NamespacePolicy::ShareIdentical, &BTreeMap::new())
            .unwrap();
        let soma: Vec<_> = ns.scoped("c:soma").collect();
        assert_eq!(soma, vec![("C", "C_soma"), ("E_L", "E_L"), ("V_th", "V_th")]);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "always_qualify".parse::<NamespacePolicy>().unwrap(),
            NamespacePolicy::AlwaysQualify
        );
        assert!("sometimes".parse::<NamespacePolicy>().is_err());
    }
}
