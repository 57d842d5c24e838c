//! Server-rendered public pages
//!
//! Templates are compiled into the binary from `templates/` and rendered with
//! Tera. Every page extends `base.html`, which receives the standard variables
//! (`site_name`, `request_path`, `year`, `current_user`).

use axum::{
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

use crate::api::middleware::{AppState, MaybeUser};
use crate::models::User;
use crate::services::ServiceError;

mod error;
mod pages;

pub use error::PageError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct Templates;

/// Variables every page receives
#[derive(Debug, Clone, Serialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub request_path: String,
    pub year: i32,
    pub current_user: Option<CurrentUser>,
}

/// The signed-in user as templates see it
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub full_name: String,
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            is_admin: user.is_admin(),
        }
    }
}

pub struct PageRenderer {
    tera: Tera,
    site_name: String,
}

impl PageRenderer {
    /// Load and compile the embedded templates
    pub fn new(site_name: impl Into<String>) -> Result<Self, PageError> {
        let mut templates: Vec<(String, String)> = Vec::new();
        for name in Templates::iter() {
            let file = Templates::get(&name).ok_or_else(|| PageError::Load(name.to_string()))?;
            let content = std::str::from_utf8(&file.data)
                .map_err(|e| PageError::Load(format!("{}: {}", name, e)))?
                .to_string();
            templates.push((name.to_string(), content));
        }
        Self::from_templates(site_name, templates)
    }

    /// Compile the given `(name, source)` pairs as one set, so parents and
    /// macro files may come in any order
    pub fn from_templates(
        site_name: impl Into<String>,
        templates: Vec<(String, String)>,
    ) -> Result<Self, PageError> {
        let count = templates.len();
        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| PageError::Template(describe("load templates", &e)))?;

        tracing::debug!("Loaded {} page templates", count);
        Ok(Self {
            tera,
            site_name: site_name.into(),
        })
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn standard_vars(&self, request_path: &str, user: Option<&User>) -> StandardTemplateVars {
        StandardTemplateVars {
            site_name: self.site_name.clone(),
            request_path: request_path.to_string(),
            year: chrono::Utc::now().year(),
            current_user: user.map(CurrentUser::from),
        }
    }

    pub fn render(
        &self,
        template: &str,
        context: &TeraContext,
        vars: &StandardTemplateVars,
    ) -> Result<String, PageError> {
        let mut full = context.clone();
        full.insert("site_name", &vars.site_name);
        full.insert("request_path", &vars.request_path);
        full.insert("year", &vars.year);
        full.insert("current_user", &vars.current_user);

        self.tera
            .render(template, &full)
            .map_err(|e| PageError::Template(describe(&format!("render '{}'", template), &e)))
    }

    /// Render to a response; a template failure becomes a plain 500 page
    pub fn page(
        &self,
        status: StatusCode,
        template: &str,
        context: &TeraContext,
        vars: &StandardTemplateVars,
    ) -> Response {
        match self.render(template, context, vars) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("{}", e);
                error_page(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        }
    }

    pub fn not_found(&self, vars: &StandardTemplateVars) -> Response {
        self.page(StatusCode::NOT_FOUND, "not_found.html", &TeraContext::new(), vars)
    }

    /// Page for a failed service call: 404 for missing entities, 500 otherwise
    pub fn service_error(&self, err: ServiceError, vars: &StandardTemplateVars) -> Response {
        match err {
            ServiceError::NotFound(_) => self.not_found(vars),
            other => {
                tracing::error!("Page {} failed: {}", vars.request_path, other);
                error_page(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        }
    }
}

/// Public page routes, merged at the root of the application router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/mentors", get(pages::mentors))
        .route("/mentors/{slug}", get(pages::mentor))
        .route("/posts", get(pages::posts))
        .route("/posts/{slug}", get(pages::post))
}

/// Fallback for unknown routes
pub async fn not_found(
    axum::extract::State(state): axum::extract::State<AppState>,
    MaybeUser(user): MaybeUser,
    uri: Uri,
) -> Response {
    let vars = state.pages.standard_vars(uri.path(), user.as_ref());
    state.pages.not_found(&vars)
}

fn describe(action: &str, e: &tera::Error) -> String {
    let mut message = format!("Failed to {}: {}", action, e);
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Last-resort page that needs no templates
fn error_page(status: StatusCode, message: &str) -> Response {
    let body = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{code}</title></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 50px auto;">
<h1>{code}</h1>
<p>{message}</p>
</body>
</html>"#,
        code = status.as_u16(),
        message = message
    );
    (status, Html(body)).into_response()
}

#[cfg(test)]
mod tests;
