pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: `{field}` range {min}..{max} is empty")]
    InvalidRange {
        field: &'static str,
        min: u64,
        max: u64,
    },

    #[error(transparent)]
    Core(#[from] gatestorm_core::Error),

    #[error("no archetype selected")]
    NothingSelected,
}
