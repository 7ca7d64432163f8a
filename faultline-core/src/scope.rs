use crate::protocol::{EventDraft, Metadata, User, Value};

/// Contextual data for a logical unit of work, such as a request or a job.
///
/// A scope is passed explicitly to
/// [`Client::capture_with_scope`](crate::Client::capture_with_scope) and is
/// applied to the event draft before the callbacks run.  Scope metadata is
/// redacted like any other metadata.
///
/// ```
/// use faultline_core::Scope;
///
/// let mut scope = Scope::new();
/// scope.set_context("GET /users/:id");
/// scope.add_metadata("request", "id", "a1b2");
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Scope {
    metadata: Metadata,
    user: Option<User>,
    context: Option<String>,
}

impl Scope {
    /// Creates an empty scope.
    pub fn new() -> Scope {
        Scope::default()
    }

    /// Adds a metadata value.
    pub fn add_metadata<T, K, V>(&mut self, tab: T, key: K, value: V)
    where
        T: Into<String>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.metadata.add(tab, key, value);
    }

    /// Removes a metadata tab.
    pub fn clear_metadata(&mut self, tab: &str) {
        self.metadata.remove_tab(tab);
    }

    /// The metadata of this scope.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Sets the affected user.
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// Sets the context.
    pub fn set_context<S: Into<String>>(&mut self, context: S) {
        self.context = Some(context.into());
    }

    /// Applies the scope to a draft.
    ///
    /// Values already present on the draft take precedence, since they were
    /// attached closer to where the error happened.
    pub fn apply_to_draft(&self, draft: &mut EventDraft) {
        if !self.metadata.is_empty() {
            let mut metadata = self.metadata.clone();
            metadata.merge(&draft.metadata);
            draft.metadata = metadata;
        }
        if draft.user == User::default() {
            if let Some(ref user) = self.user {
                draft.user = user.clone();
            }
        }
        if draft.context.is_none() {
            draft.context.clone_from(&self.context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Utc;

    #[test]
    fn test_draft_values_win() {
        let mut scope = Scope::new();
        scope.add_metadata("request", "route", "/scope");
        scope.add_metadata("request", "method", "GET");
        scope.set_context("scope context");
        scope.set_user(Some(User {
            id: Some("scope-user".into()),
            ..Default::default()
        }));

        let mut draft = EventDraft::new(vec![], true, None, Utc::now());
        draft.metadata.add("request", "route", "/draft");
        draft.context = Some("draft context".into());
        scope.apply_to_draft(&mut draft);

        assert_eq!(draft.metadata.get("request", "route"), Some(&"/draft".into()));
        assert_eq!(draft.metadata.get("request", "method"), Some(&"GET".into()));
        assert_eq!(draft.context.as_deref(), Some("draft context"));
        assert_eq!(draft.user.id.as_deref(), Some("scope-user"));
    }

    #[test]
    fn test_clear_metadata() {
        let mut scope = Scope::new();
        scope.add_metadata("request", "route", "/");
        scope.clear_metadata("request");
        assert!(scope.metadata().is_empty());
    }
}
