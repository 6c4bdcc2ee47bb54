//! Environment config parsing (TOML)
//!
//! A config names the container, its aliases, the checker options, and the
//! variables, message types, enums and extra functions to declare on top of
//! the standard library.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use cel_checker::{
    CheckerOptions, Container, DeclError, Env, FunctionDecl, OverloadDecl, TypeRegistry,
    VariableDecl,
};
use cel_types::{parse_type, Type, TypeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a config
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Type string that does not parse
    #[error("Invalid type '{ty}' for {context}: {source}")]
    InvalidType {
        /// What the type was written for
        context: String,
        /// Type as written
        ty: String,
        /// Parse failure
        source: TypeError,
    },

    /// Declarations rejected by the environment
    #[error("Invalid declaration: {0}")]
    Declaration(#[from] DeclError),
}

/// Checking environment description
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvConfig {
    /// Container names are resolved against
    pub container: String,

    /// `alias = "qualified.name"` pairs
    pub aliases: BTreeMap<String, String>,

    /// Qualified names reachable by their last segment
    pub abbreviations: Vec<String>,

    /// Checker options
    pub options: CheckerOptions,

    /// Variable name to type
    pub variables: BTreeMap<String, String>,

    /// Message type name to its field types
    pub structs: BTreeMap<String, BTreeMap<String, String>>,

    /// Enum name to its values
    pub enums: BTreeMap<String, BTreeMap<String, i64>>,

    /// Extra function declarations
    pub functions: Vec<FunctionConfig>,
}

/// One declared function
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionConfig {
    /// Function name
    pub name: String,
    /// Overloads, in declaration order
    pub overloads: Vec<OverloadConfig>,
}

/// One overload of a declared function
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverloadConfig {
    /// Overload id
    pub id: String,
    /// Argument types, receiver first for member overloads
    #[serde(default)]
    pub args: Vec<String>,
    /// Result type
    pub result: String,
    /// Called as `target.name(...)`
    #[serde(default)]
    pub member: bool,
    /// Names usable as type parameters in `args` and `result`
    #[serde(default)]
    pub type_params: Vec<String>,
}

impl EnvConfig {
    /// Load a config from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a config from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Build the checking environment this config describes
    pub fn build_env(&self) -> Result<Env, ConfigError> {
        let mut container = Container::new(self.container.as_str())?;
        for (alias, name) in &self.aliases {
            container.add_alias(alias, name)?;
        }
        container.add_abbreviations(&self.abbreviations)?;

        let mut registry = TypeRegistry::new();
        for (name, fields) in &self.structs {
            let fields = fields
                .iter()
                .map(|(field, ty)| {
                    let context = format!("field '{}.{}'", name, field);
                    Ok((field.clone(), parse(ty, &[], context)?))
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            registry.register_struct(name, fields);
        }
        for (name, values) in &self.enums {
            registry.register_enum(name, values.iter().map(|(value, n)| (value.as_str(), *n)));
        }

        let mut env = Env::standard(container, Arc::new(registry), self.options.clone())?;

        let variables = self
            .variables
            .iter()
            .map(|(name, ty)| {
                let context = format!("variable '{}'", name);
                Ok(VariableDecl::new(name.as_str(), parse(ty, &[], context)?))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        env.add_idents(variables)?;

        let functions = self
            .functions
            .iter()
            .map(FunctionConfig::to_decl)
            .collect::<Result<Vec<_>, ConfigError>>()?;
        env.add_functions(functions)?;

        Ok(env)
    }
}

impl FunctionConfig {
    fn to_decl(&self) -> Result<FunctionDecl, ConfigError> {
        let overloads = self
            .overloads
            .iter()
            .map(|o| o.to_decl(&self.name))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(FunctionDecl::with_overloads(self.name.as_str(), overloads)?)
    }
}

impl OverloadConfig {
    fn to_decl(&self, function: &str) -> Result<OverloadDecl, ConfigError> {
        let params: Vec<&str> = self.type_params.iter().map(String::as_str).collect();
        let args = self
            .args
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                let context = format!("argument {} of overload '{}' of '{}'", i, self.id, function);
                parse(ty, &params, context)
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let context = format!("result of overload '{}' of '{}'", self.id, function);
        let result = parse(&self.result, &params, context)?;

        Ok(if self.member {
            OverloadDecl::member(self.id.as_str(), args, result)
        } else {
            OverloadDecl::global(self.id.as_str(), args, result)
        })
    }
}

fn parse(ty: &str, type_params: &[&str], context: String) -> Result<Type, ConfigError> {
    parse_type(ty, type_params).map_err(|source| ConfigError::InvalidType {
        context,
        ty: ty.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_types::Kind;

    const CONFIG: &str = r#"
container = "google.example"
abbreviations = ["google.example.Account.Kind"]

[aliases]
acct = "google.example.Account"

[options]
homogeneous_aggregate_literals = true

[variables]
account = "google.example.Account"
limits = "map(string, int)"

[structs."google.example.Account"]
id = "string"
balance = "int"

[enums."google.example.Account.Kind"]
PERSONAL = 0
BUSINESS = 1

[[functions]]
name = "first"

[[functions.overloads]]
id = "first_list"
args = ["list(A)"]
result = "A"
type_params = ["A"]

[[functions]]
name = "owner"

[[functions.overloads]]
id = "account_owner"
args = ["google.example.Account"]
result = "string"
member = true
"#;

    #[test]
    fn test_parse_config() {
        let config = EnvConfig::parse(CONFIG).unwrap();
        assert_eq!(config.container, "google.example");
        assert!(config.options.homogeneous_aggregate_literals);
        assert!(!config.options.cross_type_numeric_comparisons);
        assert_eq!(config.structs["google.example.Account"].len(), 2);
        assert_eq!(config.functions[0].overloads[0].type_params, vec!["A"]);
        assert!(config.functions[1].overloads[0].member);
    }

    #[test]
    fn test_build_env() {
        let env = EnvConfig::parse(CONFIG).unwrap().build_env().unwrap();
        assert_eq!(
            env.lookup_ident("limits").unwrap().ty(),
            &Type::map(Type::string(), Type::int())
        );
        assert_eq!(env.lookup_ident("Kind.BUSINESS").unwrap().ty(), &Type::int());
        assert_eq!(env.lookup_ident("acct").unwrap().ty().kind(), Kind::Type);

        let first = env.lookup_function("first").unwrap();
        let overload = first.overload("first_list").unwrap();
        assert_eq!(overload.result_type().kind(), Kind::TypeParam);
        assert!(env.lookup_function("owner").unwrap().overload("account_owner").unwrap().is_member_function());
    }

    #[test]
    fn test_empty_config_is_standard_env() {
        let env = EnvConfig::parse("").unwrap().build_env().unwrap();
        assert!(env.lookup_function("size").is_some());
        assert_eq!(env.container().name(), "");
    }

    #[test]
    fn test_invalid_type() {
        let config = EnvConfig::parse("[variables]\nx = \"list(int\"").unwrap();
        let err = config.build_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidType { .. }));
        assert!(err.to_string().starts_with("Invalid type 'list(int' for variable 'x'"));
    }

    #[test]
    fn test_declaration_error() {
        let config = EnvConfig::parse(
            r#"
[[functions]]
name = "has"

[[functions.overloads]]
id = "has_any"
args = ["dyn"]
result = "bool"
"#,
        )
        .unwrap();
        let err = config.build_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Declaration(DeclError::OverlappingMacro { .. })
        ));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        assert!(EnvConfig::parse("[options]\nhomogeneous = 1").is_ok());
        assert!(matches!(
            EnvConfig::parse("container = 3"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
