use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovcheckError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not parse coverage XML, no element '{0}'")]
    MissingElement(String),

    #[error("'{tag}' element is missing attribute '{attr}'")]
    MissingAttribute { tag: String, attr: String },

    #[error("failed to parse condition-coverage: {0}")]
    ConditionCoverage(String),

    #[error("a node named '{0}' was already added as a child")]
    DuplicateChild(String),

    #[error("invalid child dirpath: '{0}'")]
    InvalidPath(String),

    #[error("cannot add children to file node '{0}'")]
    ChildOfFile(String),

    #[error("Group '{0}' not found in config")]
    GroupNotFound(String),

    #[error("Invalid threshold for {kind} coverage ({value}). Must be between 0 and 100")]
    InvalidThreshold { kind: &'static str, value: f64 },

    #[error("Must specify --line, --branch, or --output")]
    NothingToCheck,
}

pub type Result<T> = std::result::Result<T, CovcheckError>;
