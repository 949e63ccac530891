//! Per-path method slots.
//!
//! [`MethodRouter`] holds at most one value for each supported
//! [`HttpMethod`]. Filling a slot twice is refused.

use flongo_core::HttpMethod;

/// Maps the supported HTTP methods to values for a single path.
///
/// # Example
///
/// ```rust
/// use flongo_core::HttpMethod;
/// use flongo_router::MethodRouter;
///
/// let mut router = MethodRouter::new();
/// assert!(router.insert(HttpMethod::Get, "list").is_ok());
/// assert_eq!(router.insert(HttpMethod::Get, "again"), Err("again"));
///
/// assert_eq!(router.get(HttpMethod::Get), Some(&"list"));
/// assert_eq!(router.get(HttpMethod::Post), None);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    get: Option<T>,
    post: Option<T>,
    put: Option<T>,
    patch: Option<T>,
    delete: Option<T>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            get: None,
            post: None,
            put: None,
            patch: None,
            delete: None,
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates a new empty method router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, method: HttpMethod) -> &mut Option<T> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Delete => &mut self.delete,
        }
    }

    /// Fills the slot for `method`.
    ///
    /// Returns the value back if the slot is already taken.
    pub fn insert(&mut self, method: HttpMethod, value: T) -> Result<(), T> {
        let slot = self.slot_mut(method);
        if slot.is_some() {
            return Err(value);
        }
        *slot = Some(value);
        Ok(())
    }

    /// Returns the value registered for `method`.
    #[must_use]
    pub fn get(&self, method: HttpMethod) -> Option<&T> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
        }
    }

    /// Returns true if any methods are registered.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        HttpMethod::ALL.into_iter().any(|m| self.get(m).is_some())
    }

    /// Returns the registered methods in `GET, POST, PUT, PATCH, DELETE` order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<HttpMethod> {
        HttpMethod::ALL
            .into_iter()
            .filter(|m| self.get(*m).is_some())
            .collect()
    }

    /// Iterates over every registered value.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        HttpMethod::ALL.into_iter().filter_map(|m| self.get(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_router_new() {
        let router: MethodRouter<&str> = MethodRouter::new();
        assert!(!router.has_any_method());
        assert!(router.allowed_methods().is_empty());
    }

    #[test]
    fn test_each_slot_is_independent() {
        let mut router = MethodRouter::new();
        for (i, method) in HttpMethod::ALL.into_iter().enumerate() {
            router.insert(method, i).unwrap();
        }
        for (i, method) in HttpMethod::ALL.into_iter().enumerate() {
            assert_eq!(router.get(method), Some(&i));
        }
        assert_eq!(router.values().count(), 5);
    }

    #[test]
    fn test_duplicate_slot_is_refused() {
        let mut router = MethodRouter::new();
        router.insert(HttpMethod::Post, "first").unwrap();
        assert_eq!(router.insert(HttpMethod::Post, "second"), Err("second"));
        assert_eq!(router.get(HttpMethod::Post), Some(&"first"));
    }

    #[test]
    fn test_allowed_methods_order() {
        let mut router = MethodRouter::new();
        router.insert(HttpMethod::Delete, ()).unwrap();
        router.insert(HttpMethod::Get, ()).unwrap();
        assert_eq!(
            router.allowed_methods(),
            vec![HttpMethod::Get, HttpMethod::Delete]
        );
    }
}
