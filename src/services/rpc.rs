//! Named remote procedures
//!
//! `POST /api/v1/rpc/{name}` dispatches here. Each procedure declares who
//! may call it and takes a JSON object of parameters.

use crate::models::{
    MentorFilter, MentorSort, PageParams, SortDirection, User, UserRole,
};
use crate::services::dashboard::DashboardService;
use crate::services::error::ServiceError;
use crate::services::home::HomeService;
use crate::services::mentor::MentorService;
use crate::services::post::PostService;
use crate::services::submission::SubmissionService;
use crate::services::user::{UserService, UserServiceError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Unknown procedure: {0}")]
    UnknownProcedure(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    User(#[from] UserServiceError),
}

/// Who may call a procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Public,
    Admin,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Procedure {
    pub name: &'static str,
    pub access: Access,
}

pub const PROCEDURES: &[Procedure] = &[
    Procedure { name: "search_mentors", access: Access::Public },
    Procedure { name: "get_mentor_profile", access: Access::Public },
    Procedure { name: "get_home_content", access: Access::Public },
    Procedure { name: "set_mentor_skills", access: Access::Admin },
    Procedure { name: "toggle_mentor_published", access: Access::Admin },
    Procedure { name: "toggle_post_published", access: Access::Admin },
    Procedure { name: "approve_mentor_submission", access: Access::Admin },
    Procedure { name: "reject_mentor_submission", access: Access::Admin },
    Procedure { name: "set_user_role", access: Access::Admin },
    Procedure { name: "get_admin_dashboard", access: Access::Admin },
];

pub fn find_procedure(name: &str) -> Option<&'static Procedure> {
    PROCEDURES.iter().find(|p| p.name == name)
}

#[derive(Debug, Default, Deserialize)]
struct SearchMentorsParams {
    q: Option<String>,
    skill: Option<String>,
    sort: Option<MentorSort>,
    order: Option<SortDirection>,
    page: Option<u32>,
    page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SlugParams {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct MentorSkillsParams {
    mentor_id: i64,
    skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MentorIdParams {
    mentor_id: i64,
}

#[derive(Debug, Deserialize)]
struct PostIdParams {
    post_id: i64,
}

#[derive(Debug, Deserialize)]
struct ReviewSubmissionParams {
    submission_id: i64,
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRoleParams {
    user_id: i64,
    role: UserRole,
}

pub struct RpcService {
    mentors: Arc<MentorService>,
    posts: Arc<PostService>,
    home: Arc<HomeService>,
    submissions: Arc<SubmissionService>,
    users: Arc<UserService>,
    dashboard: Arc<DashboardService>,
}

impl RpcService {
    pub fn new(
        mentors: Arc<MentorService>,
        posts: Arc<PostService>,
        home: Arc<HomeService>,
        submissions: Arc<SubmissionService>,
        users: Arc<UserService>,
        dashboard: Arc<DashboardService>,
    ) -> Self {
        Self {
            mentors,
            posts,
            home,
            submissions,
            users,
            dashboard,
        }
    }

    /// Invoke `name` on behalf of `caller`. `params` may be `null` for
    /// procedures without required parameters.
    pub async fn call(
        &self,
        name: &str,
        caller: Option<&User>,
        params: Value,
    ) -> Result<Value, RpcError> {
        let procedure =
            find_procedure(name).ok_or_else(|| RpcError::UnknownProcedure(name.to_string()))?;
        let admin = match procedure.access {
            Access::Public => None,
            Access::Admin => {
                let user = caller.ok_or(RpcError::Unauthorized)?;
                if !user.is_admin() {
                    return Err(RpcError::Forbidden);
                }
                Some(user)
            }
        };
        tracing::debug!("rpc {} by {:?}", name, caller.map(|u| u.id));

        match (procedure.name, admin) {
            ("search_mentors", _) => {
                let p: SearchMentorsParams = parse(params)?;
                let filter = MentorFilter {
                    q: p.q,
                    skill: p.skill,
                    sort: p.sort.unwrap_or_default(),
                    direction: p.order,
                    ..MentorFilter::default()
                };
                let page = PageParams::new(p.page.unwrap_or(1), p.page_size.unwrap_or(12));
                to_value(self.mentors.list(filter, page).await?)
            }
            ("get_mentor_profile", _) => {
                let p: SlugParams = parse(params)?;
                to_value(self.mentors.profile(&p.slug).await?)
            }
            ("get_home_content", _) => to_value(self.home.load().await?),
            ("set_mentor_skills", Some(_)) => {
                let p: MentorSkillsParams = parse(params)?;
                let skills = self.mentors.set_skills(p.mentor_id, p.skills).await?;
                Ok(json!({ "mentor_id": p.mentor_id, "skills": skills }))
            }
            ("toggle_mentor_published", Some(_)) => {
                let p: MentorIdParams = parse(params)?;
                to_value(self.mentors.toggle_published(p.mentor_id).await?)
            }
            ("toggle_post_published", Some(_)) => {
                let p: PostIdParams = parse(params)?;
                to_value(self.posts.toggle_published(p.post_id).await?)
            }
            ("approve_mentor_submission", Some(admin)) => {
                let p: ReviewSubmissionParams = parse(params)?;
                to_value(self.submissions.approve(p.submission_id, admin, p.note).await?)
            }
            ("reject_mentor_submission", Some(admin)) => {
                let p: ReviewSubmissionParams = parse(params)?;
                to_value(self.submissions.reject(p.submission_id, admin, p.note).await?)
            }
            ("set_user_role", Some(admin)) => {
                let p: UserRoleParams = parse(params)?;
                to_value(self.users.set_role(admin, p.user_id, p.role).await?)
            }
            ("get_admin_dashboard", Some(_)) => to_value(self.dashboard.load().await?),
            _ => Err(RpcError::UnknownProcedure(name.to_string())),
        }
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|e| RpcError::Service(ServiceError::InternalError(e.into())))
}
