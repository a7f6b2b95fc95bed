//! Compose file model
//!
//! Only the shape of each service record matters here: nothing is validated
//! beyond what serde needs to build the structs, and unknown keys are ignored.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{ComposeError, Result};

pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
const ALTERNATE_COMPOSE_FILE: &str = "docker-compose.yaml";

/// A field that may be written as a single string or as a list of strings.
/// Always stored as a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList(pub Vec<String>);

impl StringList {
    /// The entries, in file order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Null,
            List(Vec<String>),
            Single(String),
        }

        // untagged tries variants in order: a key with no value, then the
        // list, then the bare string
        match Raw::deserialize(deserializer)? {
            Raw::Null => Ok(StringList::default()),
            Raw::List(items) => Ok(StringList(items)),
            Raw::Single(item) => Ok(StringList(vec![item])),
        }
    }
}

/// `environment:` accepts either `["KEY=value"]` or `{KEY: value}`.
/// Normalized to the list form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment(pub Vec<String>);

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Null,
            List(Vec<String>),
            Map(BTreeMap<String, Value>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Null => Ok(Environment::default()),
            Raw::List(items) => Ok(Environment(items)),
            Raw::Map(map) => {
                let items = map
                    .into_iter()
                    .map(|(key, value)| match scalar_to_string(&value) {
                        Some(value) => Ok(format!("{key}={value}")),
                        None if value.is_null() => Ok(key),
                        None => Err(de::Error::custom(format!(
                            "environment value for {key} must be a scalar"
                        ))),
                    })
                    .collect::<std::result::Result<Vec<_>, D::Error>>()?;
                Ok(Environment(items))
            }
        }
    }
}

/// Reference to a service defined in another compose file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ExtendConfig {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

/// One service declaration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub command: StringList,
    #[serde(default)]
    pub entrypoint: StringList,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub external_links: Vec<String>,
    #[serde(default, deserialize_with = "scalar_list")]
    pub ports: Vec<String>,
    #[serde(default, deserialize_with = "scalar_list")]
    pub expose: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub volumes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub volumes_from: Vec<String>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub env_file: StringList,
    #[serde(default)]
    pub extends: Option<ExtendConfig>,
    #[serde(default)]
    pub net: Option<String>,
    #[serde(default)]
    pub pid: Option<String>,
    #[serde(default)]
    pub dns: StringList,
    #[serde(default)]
    pub dns_search: StringList,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cap_add: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cap_drop: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub domainname: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub mem_limit: Option<String>,
    #[serde(default)]
    pub privileged: Option<bool>,
    #[serde(default)]
    pub restart: Option<String>,
    #[serde(default)]
    pub stdin_open: Option<bool>,
    #[serde(default)]
    pub tty: Option<bool>,
    #[serde(default)]
    pub cpu_shares: Option<u64>,
}

/// All services of a project, by declared name
#[derive(Debug, Clone, Default)]
pub struct ComposeConfig {
    pub services: BTreeMap<String, ServiceConfig>,
}

impl ComposeConfig {
    /// Reads and parses a compose file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ComposeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents).map_err(|source| ComposeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses either the flat layout (services at the top level) or the
    /// versioned layout with a `services:` section.
    pub fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let document: Value = serde_yaml::from_str(contents)?;
        let mut root = match document {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            other => {
                return Err(de::Error::custom(format!(
                    "expected a mapping of services, found {}",
                    value_kind(&other)
                )))
            }
        };

        let services = match root.remove("services") {
            Some(Value::Mapping(services)) => services,
            Some(Value::Null) => Mapping::new(),
            Some(other) => {
                // put it back so the error below names the offending key
                root.insert(Value::from("services"), other);
                root
            }
            None => root,
        };

        // a service whose whole body is commented out is null
        let services: BTreeMap<String, Option<ServiceConfig>> =
            serde_yaml::from_value(Value::Mapping(services))?;
        let services = services
            .into_iter()
            .map(|(name, service)| (name, service.unwrap_or_default()))
            .collect();
        Ok(Self { services })
    }

    /// Looks up a service by its declared name
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }

    /// Services that declare an image, in name order
    pub fn images(&self) -> impl Iterator<Item = (&str, &str)> {
        self.services
            .iter()
            .filter_map(|(name, service)| Some((name.as_str(), service.image.as_deref()?)))
            .filter(|(_, image)| !image.is_empty())
    }
}

/// Picks the compose file to read. When the default name is missing, the
/// `.yaml` spelling next to it is used instead.
pub fn locate(path: &Path) -> PathBuf {
    if path.exists() || path.file_name() != Some(OsStr::new(DEFAULT_COMPOSE_FILE)) {
        return path.to_path_buf();
    }

    let alternate = path.with_file_name(ALTERNATE_COMPOSE_FILE);
    if alternate.exists() {
        alternate
    } else {
        path.to_path_buf()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        scalar_to_string(&value)
            .map(Scalar)
            .ok_or_else(|| de::Error::custom(ExpectedScalar(value_kind(&value))))
    }
}

struct ExpectedScalar(&'static str);

impl fmt::Display for ExpectedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a string or number, found {}", self.0)
    }
}

// `ports: [80, "8080:80"]` mixes numbers and strings
fn scalar_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Scalar>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().map(|Scalar(s)| s).collect())
}

/// A key whose entries are all commented out is null in YAML; read it as empty
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn optional_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|Scalar(s)| s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FLAT: &str = r#"
web:
  image: nginx:1.25
  command: nginx -g 'daemon off;'
  links:
    - redis
  ports:
    - "8080:80"
    - 443
  environment:
    - MODE=dev
  cap_add:
    - NET_ADMIN
  privileged: true
  mem_limit: 512m
  # dns: 8.8.8.8
redis:
  image: redis
  dns:
    - 8.8.8.8
    - 8.8.4.4
  cpu_shares: 512
  some_future_key: whatever
"#;

    #[test]
    fn test_parse_flat_layout() {
        let config = ComposeConfig::parse(FLAT).unwrap();
        assert_eq!(config.services.len(), 2);

        let web = config.service("web").unwrap();
        assert_eq!(web.image.as_deref(), Some("nginx:1.25"));
        assert_eq!(web.command.as_slice(), ["nginx -g 'daemon off;'"]);
        assert_eq!(web.links, vec!["redis"]);
        assert_eq!(web.ports, vec!["8080:80", "443"]);
        assert_eq!(web.environment.0, vec!["MODE=dev"]);
        assert_eq!(web.cap_add, vec!["NET_ADMIN"]);
        assert_eq!(web.privileged, Some(true));
        assert_eq!(web.mem_limit.as_deref(), Some("512m"));
        assert!(web.dns.is_empty());

        let redis = config.service("redis").unwrap();
        assert_eq!(redis.dns.len(), 2);
        assert_eq!(redis.cpu_shares, Some(512));
    }

    #[test]
    fn test_parse_services_layout() {
        let yaml = r#"
version: "2"
services:
  db:
    image: postgres
    environment:
      POSTGRES_DB: app
      DEBUG: 1
      EMPTY:
volumes:
  data: {}
"#;
        let config = ComposeConfig::parse(yaml).unwrap();
        assert_eq!(config.services.keys().collect::<Vec<_>>(), vec!["db"]);

        let db = config.service("db").unwrap();
        assert_eq!(db.environment.0, vec!["DEBUG=1", "EMPTY", "POSTGRES_DB=app"]);
    }

    #[test]
    fn test_string_list_accepts_single_string() {
        let service: ServiceConfig = serde_yaml::from_str("env_file: .env").unwrap();
        assert_eq!(service.env_file, StringList(vec![".env".to_string()]));

        let service: ServiceConfig = serde_yaml::from_str("env_file: [a.env, b.env]").unwrap();
        assert_eq!(service.env_file.as_slice(), ["a.env", "b.env"]);
    }

    #[test]
    fn test_commented_out_entries_read_as_empty() {
        let yaml = "web:\n  image: nginx\n  environment:\n#    - FOO=bar\n  links:\n#    - redis\n  ports:\n#    - 80\n  dns:\n#    - 8.8.8.8\n  cap_add:\nworker:\n#  image: busybox\n";
        let config = ComposeConfig::parse(yaml).unwrap();

        let web = config.service("web").unwrap();
        assert_eq!(web.image.as_deref(), Some("nginx"));
        assert!(web.environment.0.is_empty());
        assert!(web.links.is_empty());
        assert!(web.ports.is_empty());
        assert!(web.dns.is_empty());
        assert!(web.cap_add.is_empty());

        let worker = config.service("worker").unwrap();
        assert!(worker.image.is_none());
    }

    #[test]
    fn test_load_tolerates_commented_out_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "web:\n  image: nginx\n  environment:\n#    - FOO=bar\n  links:\n#    - redis").unwrap();

        let config = ComposeConfig::load(file.path()).unwrap();
        assert_eq!(config.images().collect::<Vec<_>>(), vec![("web", "nginx")]);
    }

    #[test]
    fn test_images_skips_build_only_services() {
        let yaml = "app:\n  build: .\ncache:\n  image: redis\n";
        let config = ComposeConfig::parse(yaml).unwrap();
        assert_eq!(config.images().collect::<Vec<_>>(), vec![("cache", "redis")]);
    }

    #[test]
    fn test_empty_file_has_no_services() {
        assert!(ComposeConfig::parse("").unwrap().services.is_empty());
    }

    #[test]
    fn test_rejects_non_mapping_document() {
        assert!(ComposeConfig::parse("- web\n- db\n").is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker-compose.yml");
        match ComposeConfig::load(&path) {
            Err(ComposeError::ConfigRead { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ConfigRead, got {:?}", other),
        }
    }

    #[test]
    fn test_load_reports_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "web:\n  links: {{").unwrap();
        assert!(matches!(
            ComposeConfig::load(file.path()),
            Err(ComposeError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_locate_falls_back_to_yaml_extension() {
        let dir = tempfile::tempdir().unwrap();
        let default = dir.path().join(DEFAULT_COMPOSE_FILE);
        assert_eq!(locate(&default), default);

        let alternate = dir.path().join(ALTERNATE_COMPOSE_FILE);
        fs::write(&alternate, "web:\n  image: nginx\n").unwrap();
        assert_eq!(locate(&default), alternate);

        fs::write(&default, "web:\n  image: nginx\n").unwrap();
        assert_eq!(locate(&default), default);
    }
}
