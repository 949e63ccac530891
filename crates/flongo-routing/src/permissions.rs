//! Per-method role requirements.

use crate::RouteConfigError;
use flongo_core::HttpMethod;
use std::collections::BTreeMap;

/// Roles a caller needs for each method of a route.
///
/// A method with no roles is unrestricted. Holding any one of the listed
/// roles is enough.
///
/// ```
/// use flongo_core::HttpMethod;
/// use flongo_routing::RoutePermissions;
///
/// let permissions = RoutePermissions::new().post("user").put(["admin", "owner"]);
///
/// assert_eq!(permissions.roles_for(HttpMethod::Post), ["user"]);
/// assert_eq!(permissions.roles_for(HttpMethod::Put), ["admin", "owner"]);
/// assert!(permissions.roles_for(HttpMethod::Get).is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePermissions {
    roles: BTreeMap<HttpMethod, Vec<String>>,
}

impl RoutePermissions {
    /// No restrictions on any method.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the roles for `method`. An empty role list removes the restriction.
    #[must_use]
    pub fn method(mut self, method: HttpMethod, roles: impl IntoRoles) -> Self {
        let roles = roles.into_roles();
        if roles.is_empty() {
            self.roles.remove(&method);
        } else {
            self.roles.insert(method, roles);
        }
        self
    }

    /// Sets roles from a method name, rejecting unsupported methods.
    pub fn named(self, method: &str, roles: impl IntoRoles) -> Result<Self, RouteConfigError> {
        let method = method.parse::<HttpMethod>()?;
        Ok(self.method(method, roles))
    }

    /// Sets the roles for `GET`.
    #[must_use]
    pub fn get(self, roles: impl IntoRoles) -> Self {
        self.method(HttpMethod::Get, roles)
    }

    /// Sets the roles for `POST`.
    #[must_use]
    pub fn post(self, roles: impl IntoRoles) -> Self {
        self.method(HttpMethod::Post, roles)
    }

    /// Sets the roles for `PUT`.
    #[must_use]
    pub fn put(self, roles: impl IntoRoles) -> Self {
        self.method(HttpMethod::Put, roles)
    }

    /// Sets the roles for `PATCH`.
    #[must_use]
    pub fn patch(self, roles: impl IntoRoles) -> Self {
        self.method(HttpMethod::Patch, roles)
    }

    /// Sets the roles for `DELETE`.
    #[must_use]
    pub fn delete(self, roles: impl IntoRoles) -> Self {
        self.method(HttpMethod::Delete, roles)
    }

    /// Returns the roles required for `method`; empty means unrestricted.
    #[must_use]
    pub fn roles_for(&self, method: HttpMethod) -> &[String] {
        self.roles.get(&method).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if no method is restricted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Values accepted as a role list: a single role or a list of roles.
///
/// Blank roles are dropped, so `""` means "no restriction".
pub trait IntoRoles {
    /// Converts into a list of non-blank roles.
    fn into_roles(self) -> Vec<String>;
}

fn collect_roles<I, S>(roles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    roles
        .into_iter()
        .map(|role| role.as_ref().trim().to_string())
        .filter(|role| !role.is_empty())
        .collect()
}

impl IntoRoles for &str {
    fn into_roles(self) -> Vec<String> {
        collect_roles([self])
    }
}

impl IntoRoles for String {
    fn into_roles(self) -> Vec<String> {
        collect_roles([self])
    }
}

impl IntoRoles for Vec<String> {
    fn into_roles(self) -> Vec<String> {
        collect_roles(self)
    }
}

impl IntoRoles for Vec<&str> {
    fn into_roles(self) -> Vec<String> {
        collect_roles(self)
    }
}

impl IntoRoles for &[&str] {
    fn into_roles(self) -> Vec<String> {
        collect_roles(self)
    }
}

impl<const N: usize> IntoRoles for [&str; N] {
    fn into_roles(self) -> Vec<String> {
        collect_roles(self)
    }
}
