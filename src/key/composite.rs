//! Precedence chains built from extractors.

use crate::key::Key;

/// Tries `first`, then `second`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fallback<A, B> {
    first: A,
    second: B,
}

impl<A, B> Fallback<A, B> {
    pub const fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<R, A, B> Key<R> for Fallback<A, B>
where
    R: ?Sized,
    A: Key<R>,
    B: Key<R>,
{
    fn extract(&self, request: &R) -> Option<String> {
        self.first
            .extract(request)
            .or_else(|| self.second.extract(request))
    }

    fn name(&self) -> &'static str {
        self.first.name()
    }
}

/// An extractor that never fails: misses map to a fixed key.
#[derive(Debug, Clone, Copy)]
pub struct Total<K> {
    inner: K,
    otherwise: &'static str,
}

impl<K> Total<K> {
    pub const fn new(inner: K, otherwise: &'static str) -> Self {
        Self { inner, otherwise }
    }

    /// Key for `request`.
    pub fn derive<R: ?Sized>(&self, request: &R) -> String
    where
        K: Key<R>,
    {
        match self.inner.extract(request) {
            Some(key) => key,
            None => self.otherwise.to_owned(),
        }
    }
}

impl<R, K> Key<R> for Total<K>
where
    R: ?Sized,
    K: Key<R>,
{
    fn extract(&self, request: &R) -> Option<String> {
        Some(self.derive(request))
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::FnKey;

    type Stub = FnKey<fn(&str) -> Option<String>>;

    fn prefixed() -> Stub {
        FnKey::new("prefixed", |s: &str| s.strip_prefix("id=").map(String::from))
    }

    fn numeric() -> Stub {
        FnKey::new("numeric", |s: &str| {
            s.parse::<u32>().ok().map(|n| format!("n:{}", n))
        })
    }

    #[test]
    fn test_fallback_order() {
        let chain = Fallback::new(prefixed(), numeric());

        assert_eq!(chain.extract("id=7"), Some("7".to_string()));
        assert_eq!(chain.extract("7"), Some("n:7".to_string()));
        assert_eq!(chain.extract("x"), None);
        assert_eq!(chain.name(), "prefixed");
    }

    #[test]
    fn test_total_substitutes_on_miss() {
        let total = Total::new(Fallback::new(prefixed(), numeric()), "anon");

        assert_eq!(total.derive("id=a"), "a");
        assert_eq!(total.derive("?"), "anon");
        assert_eq!(total.extract("?"), Some("anon".to_string()));
    }
}
