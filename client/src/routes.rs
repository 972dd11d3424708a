use crate::session::AuthState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Home,
    Post(String),
    CreatePost,
    Login,
    Register,
}

impl View {
    pub fn from_path(path: &str) -> Option<Self> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match parts.as_slice() {
            [] => Some(View::Home),
            ["create"] => Some(View::CreatePost),
            ["login"] => Some(View::Login),
            ["register"] => Some(View::Register),
            ["posts", id] => Some(View::Post(id.to_string())),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            View::Home => "/".to_string(),
            View::Post(id) => format!("/posts/{}", id),
            View::CreatePost => "/create".to_string(),
            View::Login => "/login".to_string(),
            View::Register => "/register".to_string(),
        }
    }
}

/// The view actually shown when `requested` is asked for in `state`.
pub fn resolve(requested: View, state: &AuthState) -> View {
    let signed_in = state.is_authenticated();
    match requested {
        View::CreatePost if !signed_in => View::Login,
        View::Login | View::Register if signed_in => View::Home,
        other => other,
    }
}
