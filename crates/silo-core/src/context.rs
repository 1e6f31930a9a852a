//! Request-scoped authentication context

use crate::types::Owner;

/// The principal that issued a request, resolved by the authentication
/// middleware before a handler runs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub principal: Principal,
}

impl RequestContext {
    pub fn anonymous(request_id: String) -> Self {
        Self {
            request_id,
            principal: Principal::Anonymous,
        }
    }

    pub fn authenticated(request_id: String, access_key: String, owner: Owner, is_admin: bool) -> Self {
        Self {
            request_id,
            principal: Principal::Authenticated {
                access_key,
                owner,
                is_admin,
            },
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.principal, Principal::Anonymous)
    }

    /// Owner identity for this request, if authenticated.
    pub fn owner(&self) -> Option<&Owner> {
        match &self.principal {
            Principal::Authenticated { owner, .. } => Some(owner),
            Principal::Anonymous => None,
        }
    }

    pub fn access_key(&self) -> Option<&str> {
        match &self.principal {
            Principal::Authenticated { access_key, .. } => Some(access_key),
            Principal::Anonymous => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.principal, Principal::Authenticated { is_admin: true, .. })
    }
}

#[derive(Debug, Clone)]
pub enum Principal {
    Anonymous,
    Authenticated {
        access_key: String,
        owner: Owner,
        is_admin: bool,
    },
}
