use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExploreError {
    TooManySpecies { limit: usize, found: usize },
    TooManyIterations { limit: usize },
}

impl fmt::Display for ExploreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExploreError::TooManySpecies { limit, found } => {
                write!(f, "Network exploration stopped: {} species exceed the limit of {}.", found, limit)
            }
            ExploreError::TooManyIterations { limit } => {
                write!(f, "Network exploration stopped after {} iterations.", limit)
            }
        }
    }
}

impl std::error::Error for ExploreError {}
