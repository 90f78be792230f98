//! Ordered pool of candidate access keys.

use thiserror::Error;

/// Errors building a [`CredentialPool`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// No usable access key was configured.
    #[error("no access keys configured")]
    Empty,
}

/// Fixed, ordered list of candidate access keys.
///
/// Order defines the round-robin rotation sequence and never changes for the
/// lifetime of the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPool {
    candidates: Vec<String>,
}

impl CredentialPool {
    /// Builds a pool, trimming whitespace and dropping blanks and duplicates
    /// while keeping first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Empty`] if no candidate remains.
    pub fn new<I, S>(candidates: I) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for candidate in candidates {
            let candidate = candidate.as_ref().trim();
            if !candidate.is_empty() && !unique.iter().any(|c| c == candidate) {
                unique.push(candidate.to_string());
            }
        }

        if unique.is_empty() {
            return Err(PoolError::Empty);
        }

        Ok(Self { candidates: unique })
    }

    /// Returns the number of candidates.
    #[must_use]
    pub fn len(&self) -> usize { self.candidates.len() }

    /// Always `false`; a pool holds at least one candidate.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.candidates.is_empty() }

    /// Returns the candidate at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> { self.candidates.get(index).map(String::as_str) }

    /// Returns the first candidate.
    #[must_use]
    pub fn first(&self) -> &str { &self.candidates[0] }

    /// Returns the index of `credential`, if it belongs to the pool.
    #[must_use]
    pub fn index_of(&self, credential: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c == credential)
    }

    /// Returns the round-robin successor of `index`.
    #[must_use]
    pub fn next_index(&self, index: usize) -> usize { (index + 1) % self.candidates.len() }

    /// Iterates over candidates in rotation order.
    pub fn iter(&self) -> impl Iterator<Item = &str> { self.candidates.iter().map(String::as_str) }
}
