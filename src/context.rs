use uuid::Uuid;

/// Request-scoped metadata for log correlation.
///
/// The API layer builds one of these per request and passes it down the call
/// chain explicitly. No thread-local or global state: what a service logs is
/// exactly what it was handed.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// External account id of the caller, when authenticated.
    pub user_id: Option<i32>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: None,
        }
    }

    pub fn for_user(user_id: i32) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: Some(user_id),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
