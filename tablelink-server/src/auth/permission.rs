//! Verb to permission flag mapping

use http::Method;

/// The right a request needs, derived from its HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    /// `None` for verbs outside POST/GET/PUT/DELETE, which are always denied
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::POST => Some(Self::Create),
            Method::GET => Some(Self::Read),
            Method::PUT => Some(Self::Update),
            Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }

    /// `role_rights` column holding this flag
    pub fn flag_column(self) -> &'static str {
        match self {
            Self::Create => "r_create",
            Self::Read => "r_read",
            Self::Update => "r_update",
            Self::Delete => "r_delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_mapping() {
        assert_eq!(Action::from_method(&Method::POST), Some(Action::Create));
        assert_eq!(Action::from_method(&Method::GET), Some(Action::Read));
        assert_eq!(Action::from_method(&Method::PUT), Some(Action::Update));
        assert_eq!(Action::from_method(&Method::DELETE), Some(Action::Delete));
        assert_eq!(Action::from_method(&Method::PATCH), None);
        assert_eq!(Action::from_method(&Method::HEAD), None);
    }

    #[test]
    fn test_flag_columns() {
        assert_eq!(Action::Read.flag_column(), "r_read");
        assert_eq!(Action::Delete.flag_column(), "r_delete");
    }
}
