//! Namespace container and name candidate expansion

use rustc_hash::FxHashMap;

use crate::error::DeclError;

/// Namespace in which unqualified names are resolved
///
/// With container `a.b`, the name `c` is tried as `a.b.c`, then `a.c`, then
/// `c`. A leading `.` makes a name absolute. Aliases map a simple name to a
/// fully qualified one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    name: String,
    aliases: FxHashMap<String, String>,
}

impl Container {
    /// Container with the given dotted name
    pub fn new(name: impl Into<String>) -> Result<Self, DeclError> {
        let name = name.into();
        if name.starts_with('.') {
            return Err(DeclError::InvalidQualifiedName {
                name,
                reason: "container name must not contain a leading '.'",
            });
        }
        Ok(Container {
            name,
            aliases: FxHashMap::default(),
        })
    }

    /// Dotted container name, empty for the root namespace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make the last segment of each qualified name an alias for it
    pub fn add_abbreviations<I, S>(&mut self, qualified_names: I) -> Result<(), DeclError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for qn in qualified_names {
            let qn = qn.as_ref().trim();
            if !qn.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
                return Err(DeclError::InvalidQualifiedName {
                    name: qn.to_string(),
                    reason: "wanted name of the form 'qualified.name'",
                });
            }
            let alias = match qn.rfind('.') {
                Some(ind) if ind > 0 && ind < qn.len() - 1 => &qn[ind + 1..],
                _ => {
                    return Err(DeclError::InvalidQualifiedName {
                        name: qn.to_string(),
                        reason: "wanted name of the form 'qualified.name'",
                    })
                }
            };
            self.alias_as("abbreviation", qn, alias)?;
        }
        Ok(())
    }

    /// Let `alias` stand for `qualified_name`
    pub fn add_alias(&mut self, alias: &str, qualified_name: &str) -> Result<(), DeclError> {
        self.alias_as("alias", qualified_name, alias)
    }

    fn alias_as(&mut self, kind: &'static str, qualified_name: &str, alias: &str) -> Result<(), DeclError> {
        if alias.is_empty() || alias.contains('.') {
            return Err(DeclError::InvalidQualifiedName {
                name: alias.to_string(),
                reason: "alias must be non-empty and simple (not qualified)",
            });
        }
        if qualified_name.starts_with('.') {
            return Err(DeclError::InvalidQualifiedName {
                name: qualified_name.to_string(),
                reason: "qualified name must not begin with a leading '.'",
            });
        }
        match qualified_name.rfind('.') {
            Some(ind) if ind > 0 && ind < qualified_name.len() - 1 => {}
            _ => {
                return Err(DeclError::InvalidQualifiedName {
                    name: qualified_name.to_string(),
                    reason: "alias must refer to a valid qualified name",
                })
            }
        }
        if let Some(existing) = self.aliases.get(alias) {
            return Err(DeclError::AliasCollision {
                kind,
                name: qualified_name.to_string(),
                alias: alias.to_string(),
                existing: existing.clone(),
            });
        }
        if self.name == alias || self.name.starts_with(&format!("{}.", alias)) {
            return Err(DeclError::InvalidQualifiedName {
                name: alias.to_string(),
                reason: "alias collides with container name",
            });
        }
        self.aliases.insert(alias.to_string(), qualified_name.to_string());
        Ok(())
    }

    fn find_alias(&self, name: &str) -> Option<String> {
        let (simple, qualifier) = match name.find('.') {
            Some(dot) => (&name[..dot], &name[dot..]),
            None => (name, ""),
        };
        self.aliases
            .get(simple)
            .map(|alias| format!("{}{}", alias, qualifier))
    }

    /// Candidate fully qualified names for `name`, most qualified first
    pub fn resolve_candidate_names(&self, name: &str) -> Vec<String> {
        if let Some(absolute) = name.strip_prefix('.') {
            return vec![self.find_alias(absolute).unwrap_or_else(|| absolute.to_string())];
        }
        if let Some(alias) = self.find_alias(name) {
            return vec![alias];
        }
        if self.name.is_empty() {
            return vec![name.to_string()];
        }
        let mut candidates = vec![format!("{}.{}", self.name, name)];
        let mut next = self.name.as_str();
        while let Some(i) = next.rfind('.') {
            next = &next[..i];
            candidates.push(format!("{}.{}", next, name));
        }
        candidates.push(name.to_string());
        candidates
    }
}
