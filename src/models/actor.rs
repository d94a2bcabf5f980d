/// The authenticated principal behind a request.
/// Privileged actors (deployment operators, superusers) bypass ownership
/// checks and see every token.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: String,
    pub privileged: bool,
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Actor {
            user: id.into(),
            privileged: false,
        }
    }

    pub fn privileged(id: impl Into<String>) -> Self {
        Actor {
            user: id.into(),
            privileged: true,
        }
    }
}
