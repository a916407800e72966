use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A value that must never appear in logs or debug output, such as an RPC endpoint carrying an API key.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::Secret;

    #[test]
    fn secrets_are_masked() {
        let url = Secret::new("https://sepolia.example.org/v3/my-api-key".to_string());
        assert_eq!(format!("{url}"), "****");
        assert_eq!(format!("{url:?}"), "****");
        assert!(url.reveal().ends_with("my-api-key"));
    }
}
