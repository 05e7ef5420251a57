use serde::Serialize;

use crate::models::Session;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub university: Option<String>,
}

impl ProfileResponse {
    /// 匿名会话没有资料
    pub fn from_session(session: &Session) -> Option<Self> {
        let user = session.user.as_ref()?;
        Some(Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            university: session.organization.clone(),
        })
    }
}
