//! Configuration management
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML file,
//! environment variables (after loading `.env`), then CLI flags applied by
//! the binary. The resulting [`EtlConfig`] is passed explicitly to the
//! pipeline; nothing reads ambient state after startup.

use crate::error::{EtlError, EtlResult};
use crate::reader::ReaderOptions;
use crate::replace::DEFAULT_BATCH_SIZE;
use crate::resolver::{DatasetSpec, DestinationResolver, TableName, DEFAULT_DATASETS, DEFAULT_SCHEMA};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::path::{Path, PathBuf};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_DB_HOST: &str = "localhost";

pub const DEFAULT_DB_PORT: u16 = 5432;

pub const DEFAULT_DB_USER: &str = "postgres";

pub const DEFAULT_DB_NAME: &str = "northwind";

/// Jobs run one at a time, so a small pool is enough.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 2;

pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_DATA_DIR: &str = "data";

const APPLICATION_NAME: &str = "northload";

/// Connection settings for the destination warehouse
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: DEFAULT_DB_USER.to_string(),
            password: String::new(),
            database: DEFAULT_DB_NAME.to_string(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database)
            .application_name(APPLICATION_NAME);

        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }

    /// Connection URL with the password masked, for logs and summaries
    pub fn redacted_url(&self) -> String {
        let auth = if self.password.is_empty() {
            self.user.clone()
        } else {
            format!("{}:***", self.user)
        };
        format!("postgresql://{}@{}:{}/{}", auth, self.host, self.port, self.database)
    }
}

/// One `[[datasets]]` entry; unset fields follow the `<key>.csv` ->
/// `<schema>.<key>` convention.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetEntry {
    pub key: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl DatasetEntry {
    pub fn conventional(key: &str) -> Self {
        Self {
            key: key.to_string(),
            table: None,
            file: None,
        }
    }

    fn to_spec(&self, schema: &str) -> EtlResult<DatasetSpec> {
        let mut spec = DatasetSpec::conventional(&self.key, schema)?;
        if let Some(ref table) = self.table {
            spec.table = TableName::parse(table, schema)?;
        }
        if let Some(ref file) = self.file {
            spec.file = file.clone();
        }
        Ok(spec)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtlConfig {
    pub database: DatabaseConfig,
    /// Directory that relative dataset files are resolved against
    pub data_dir: PathBuf,
    /// Schema for datasets that do not name one
    pub schema: String,
    /// Rows per INSERT statement
    pub batch_size: usize,
    pub reader: ReaderOptions,
    /// Datasets in load order
    pub datasets: Vec<DatasetEntry>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            schema: DEFAULT_SCHEMA.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            reader: ReaderOptions::default(),
            datasets: DEFAULT_DATASETS
                .iter()
                .map(|key| DatasetEntry::conventional(key))
                .collect(),
        }
    }
}

/// On-disk shape of the config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    database: Option<DatabaseConfig>,
    data_dir: Option<PathBuf>,
    schema: Option<String>,
    batch_size: Option<usize>,
    reader: Option<ReaderOptions>,
    datasets: Option<Vec<DatasetEntry>>,
}

impl EtlConfig {
    /// Load defaults, then `path` (if any), then the environment, and validate.
    pub fn load(path: Option<&Path>) -> EtlResult<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path).map_err(|e| {
                EtlError::config(format!("cannot read config file {}: {}", path.display(), e))
            })?;
            config = config.merge_toml(&text).map_err(|e| match e {
                EtlError::Config(msg) => {
                    EtlError::config(format!("{}: {}", path.display(), msg))
                },
                other => other,
            })?;
        }
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Overlay the keys present in a TOML document
    pub fn merge_toml(mut self, text: &str) -> EtlResult<Self> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| EtlError::config(e.message().to_string()))?;

        if let Some(database) = file.database {
            self.database = database;
        }
        if let Some(data_dir) = file.data_dir {
            self.data_dir = data_dir;
        }
        if let Some(schema) = file.schema {
            self.schema = schema;
        }
        if let Some(batch_size) = file.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(reader) = file.reader {
            self.reader = reader;
        }
        if let Some(datasets) = file.datasets {
            self.datasets = datasets;
        }

        Ok(self)
    }

    /// Apply environment overrides through `lookup`
    ///
    /// Variables: `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASS`, `DB_NAME`,
    /// `DB_MAX_CONNECTIONS`, `DB_CONNECT_TIMEOUT`, `ETL_DATA_DIR`,
    /// `ETL_SCHEMA`, `ETL_BATCH_SIZE`.
    pub fn apply_env<F>(&mut self, lookup: F) -> EtlResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DB_HOST") {
            self.database.host = host;
        }
        if let Some(port) = parse_var(&lookup, "DB_PORT")? {
            self.database.port = port;
        }
        if let Some(user) = lookup("DB_USER") {
            self.database.user = user;
        }
        if let Some(password) = lookup("DB_PASS") {
            self.database.password = password;
        }
        if let Some(database) = lookup("DB_NAME") {
            self.database.database = database;
        }
        if let Some(max) = parse_var(&lookup, "DB_MAX_CONNECTIONS")? {
            self.database.max_connections = max;
        }
        if let Some(timeout) = parse_var(&lookup, "DB_CONNECT_TIMEOUT")? {
            self.database.connect_timeout_secs = timeout;
        }
        if let Some(dir) = lookup("ETL_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(schema) = lookup("ETL_SCHEMA") {
            self.schema = schema;
        }
        if let Some(batch_size) = parse_var(&lookup, "ETL_BATCH_SIZE")? {
            self.batch_size = batch_size;
        }
        Ok(())
    }

    pub fn validate(&self) -> EtlResult<()> {
        if self.database.port == 0 {
            return Err(EtlError::config("database port must be greater than 0"));
        }
        if self.database.host.is_empty() {
            return Err(EtlError::config("database host cannot be empty"));
        }
        if self.database.user.is_empty() {
            return Err(EtlError::config("database user cannot be empty"));
        }
        if self.database.database.is_empty() {
            return Err(EtlError::config("database name cannot be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(EtlError::config("database max_connections must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(EtlError::config("batch_size must be greater than 0"));
        }
        self.reader.validate()?;
        self.resolver()?;

        if self.datasets.is_empty() {
            tracing::warn!("No datasets configured - the batch will be empty");
        }

        Ok(())
    }

    /// Destination mapping for the configured datasets
    pub fn resolver(&self) -> EtlResult<DestinationResolver> {
        let specs = self
            .datasets
            .iter()
            .map(|entry| entry.to_spec(&self.schema))
            .collect::<EtlResult<Vec<_>>>()?;
        DestinationResolver::new(specs)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> EtlResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EtlError::config(format!("{} has invalid value '{}'", name, raw))),
    }
}
