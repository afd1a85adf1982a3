use std::path::PathBuf;

pub const DEFAULT_DIR: &str = "data/";
pub const DEFAULT_FILENAME: &str = "default_store.oz";
pub const TEST_FILENAME: &str = "test_store.oz";

/// Where the store keeps its file. Supplied by the embedding process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dir: PathBuf,
    pub filename: String,
    pub test_filename: String,
    pub test_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dir: PathBuf::from(DEFAULT_DIR),
            filename: DEFAULT_FILENAME.to_string(),
            test_filename: TEST_FILENAME.to_string(),
            test_mode: false,
        }
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum Parameter {
    Dir,
    DbFilename,
    TestMode,
    Unknown,
}

impl Parameter {
    pub fn deserialize(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "dir" => Parameter::Dir,
            "dbfilename" => Parameter::DbFilename,
            "test-mode" => Parameter::TestMode,
            _ => Parameter::Unknown,
        }
    }

    fn takes_value(&self) -> bool {
        !matches!(self, Parameter::TestMode)
    }
}

impl Config {
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn storage_path(&self) -> PathBuf {
        let filename = if self.test_mode {
            &self.test_filename
        } else {
            &self.filename
        };
        self.dir.join(filename)
    }

    /// Build a config from `--dir <path> --dbfilename <name> --test-mode`
    /// style arguments. The program name must already be stripped.
    pub fn from_args<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut config = Config::default();
        let mut current_key = None;
        for arg in args.into_iter().map(Into::into) {
            if let Some(current_key) = current_key.take() {
                match current_key {
                    Parameter::Dir => config.dir = PathBuf::from(arg),
                    Parameter::DbFilename => config.filename = arg,
                    _ => {}
                }
            } else if let Some(name) = arg.strip_prefix("--") {
                let parameter = Parameter::deserialize(name);
                if parameter == Parameter::TestMode {
                    config.test_mode = true;
                } else if parameter.takes_value() {
                    current_key = Some(parameter);
                }
            } else {
                anyhow::bail!("invalid argument {:?}", arg)
            }
        }
        if let Some(key) = current_key {
            anyhow::bail!("missing value for {:?}", key)
        }
        Ok(config)
    }
}
