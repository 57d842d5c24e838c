use axum::http::StatusCode;
use tera::Context as TeraContext;

use super::pages::mentor_query_string;
use super::*;
use crate::models::{MentorSort, PageParams, PagedResult, SortDirection, UserRole};

fn renderer() -> PageRenderer {
    PageRenderer::new("HR Companion").expect("embedded templates should compile")
}

#[test]
fn test_embedded_templates_compile() {
    let pages = renderer();
    assert_eq!(pages.site_name(), "HR Companion");
    for name in ["base.html", "home.html", "mentors.html", "mentor.html", "posts.html", "post.html"] {
        assert!(
            pages.tera.get_template_names().any(|n| n == name),
            "missing {}",
            name
        );
    }
}

#[test]
fn test_not_found_page_status_and_path() {
    let pages = renderer();
    let vars = pages.standard_vars("/nowhere", None);

    let html = pages
        .render("not_found.html", &TeraContext::new(), &vars)
        .unwrap();
    assert!(html.contains("Page not found"));
    assert!(html.contains("nowhere"));

    let response = pages.not_found(&vars);
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_signed_in_user_shown_in_layout() {
    let pages = renderer();
    let user = User::new(
        "ada@example.com".to_string(),
        "Ada Lovelace".to_string(),
        String::new(),
        UserRole::Admin,
    );
    let vars = pages.standard_vars("/", Some(&user));
    assert!(vars.current_user.as_ref().is_some_and(|u| u.is_admin));

    let html = pages
        .render("not_found.html", &TeraContext::new(), &vars)
        .unwrap();
    assert!(html.contains("Ada Lovelace"));
}

#[test]
fn test_broken_template_is_reported() {
    let result = PageRenderer::from_templates(
        "Test",
        vec![("broken.html".to_string(), "{% if %}".to_string())],
    );
    assert!(matches!(result, Err(PageError::Template(_))));
}

#[test]
fn test_missing_template_render_fails() {
    let pages = renderer();
    let vars = pages.standard_vars("/", None);
    let err = pages
        .render("missing.html", &TeraContext::new(), &vars)
        .unwrap_err();
    assert!(err.to_string().contains("missing.html"));

    let response = pages.page(StatusCode::OK, "missing.html", &TeraContext::new(), &vars);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_service_error_maps_to_status() {
    let pages = renderer();
    let vars = pages.standard_vars("/mentors/x", None);

    let response = pages.service_error(ServiceError::NotFound("mentor x".to_string()), &vars);
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = pages.service_error(
        ServiceError::InternalError(anyhow::anyhow!("database gone")),
        &vars,
    );
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_posts_page_renders_pagination_bar() {
    let pages = renderer();
    let vars = pages.standard_vars("/posts", None);
    let result: PagedResult<serde_json::Value> =
        PagedResult::new(Vec::new(), 30, PageParams::new(2, 10));

    let mut ctx = TeraContext::new();
    ctx.insert("result", &result);
    ctx.insert("q", "");
    ctx.insert("category", "blog");
    ctx.insert("base_query", "category=blog");

    let html = pages.render("posts.html", &ctx, &vars).unwrap();
    assert!(html.contains("class=\"pagination\""));
    assert!(html.contains("<span class=\"current\">2</span>"));
    assert!(html.contains("page=3"));
    assert!(html.contains("Nothing published yet."));
}

#[test]
fn test_single_page_has_no_pagination_bar() {
    let pages = renderer();
    let vars = pages.standard_vars("/posts", None);
    let result: PagedResult<serde_json::Value> =
        PagedResult::new(Vec::new(), 3, PageParams::new(1, 10));

    let mut ctx = TeraContext::new();
    ctx.insert("result", &result);
    ctx.insert("q", "");
    ctx.insert("category", "");
    ctx.insert("base_query", "");

    let html = pages.render("posts.html", &ctx, &vars).unwrap();
    assert!(!html.contains("class=\"pagination\""));
}

#[test]
fn test_mentor_query_string_encodes_terms() {
    assert_eq!(
        mentor_query_string(
            Some("talent & culture"),
            Some("Interviewing"),
            MentorSort::Rating,
            SortDirection::Desc
        ),
        "q=talent%20%26%20culture&skill=Interviewing&sort=rating&order=desc"
    );
    assert_eq!(
        mentor_query_string(None, None, MentorSort::Name, SortDirection::Asc),
        "sort=name&order=asc"
    );
}
