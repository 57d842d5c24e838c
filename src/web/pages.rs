//! Page handlers

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::Response,
};
use serde::Serialize;
use tera::Context as TeraContext;

use crate::api::mentors::ListMentorsQuery;
use crate::api::middleware::{AppState, MaybeUser};
use crate::api::posts::ListPostsQuery;
use crate::models::{MentorFilter, MentorSort, PageParams, PostFilter, SortDirection};

/// Option of the directory's sort select
#[derive(Debug, Serialize)]
struct SortOption {
    value: &'static str,
    label: &'static str,
}

const SORT_OPTIONS: &[SortOption] = &[
    SortOption { value: "sort_order", label: "Recommended" },
    SortOption { value: "name", label: "Name" },
    SortOption { value: "rating", label: "Top rated" },
    SortOption { value: "experience", label: "Most experienced" },
    SortOption { value: "newest", label: "Newest" },
];

pub(super) async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    uri: Uri,
) -> Response {
    let vars = state.pages.standard_vars(uri.path(), user.as_ref());
    match state.home_service.load().await {
        Ok(home) => {
            let mut ctx = TeraContext::new();
            ctx.insert("home", &home);
            state.pages.page(StatusCode::OK, "home.html", &ctx, &vars)
        }
        Err(e) => state.pages.service_error(e, &vars),
    }
}

/// Directory. Unknown sort keys fall back to the default order instead of
/// failing the page.
pub(super) async fn mentors(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    uri: Uri,
    Query(query): Query<ListMentorsQuery>,
) -> Response {
    let vars = state.pages.standard_vars(uri.path(), user.as_ref());
    let filter = query.filter(true).unwrap_or_else(|_| MentorFilter {
        q: query.q.clone(),
        skill: query.skill.clone(),
        published_only: true,
        ..MentorFilter::default()
    });
    let sort = filter.sort;
    let direction = filter.effective_direction();

    let listing = state.mentor_service.list(filter, query.params()).await;
    let skills = state.mentor_service.skill_counts().await;
    let (result, skills) = match (listing, skills) {
        (Ok(result), Ok(skills)) => (result, skills),
        (Err(e), _) | (_, Err(e)) => return state.pages.service_error(e, &vars),
    };

    let mut ctx = TeraContext::new();
    ctx.insert("result", &result);
    ctx.insert(
        "skills",
        &skills.into_iter().map(|(name, _)| name).collect::<Vec<_>>(),
    );
    ctx.insert("q", &query.q.as_deref().unwrap_or(""));
    ctx.insert("skill", &query.skill.as_deref().unwrap_or(""));
    ctx.insert("sort", sort.as_str());
    ctx.insert("order", direction.as_str());
    ctx.insert("sort_options", SORT_OPTIONS);
    ctx.insert(
        "base_query",
        &mentor_query_string(query.q.as_deref(), query.skill.as_deref(), sort, direction),
    );
    state.pages.page(StatusCode::OK, "mentors.html", &ctx, &vars)
}

pub(super) async fn mentor(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response {
    let vars = state.pages.standard_vars(uri.path(), user.as_ref());
    match state.mentor_service.profile(&slug).await {
        Ok(profile) => {
            let mut ctx = TeraContext::new();
            ctx.insert("profile", &profile);
            state.pages.page(StatusCode::OK, "mentor.html", &ctx, &vars)
        }
        Err(e) => state.pages.service_error(e, &vars),
    }
}

pub(super) async fn posts(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    uri: Uri,
    Query(query): Query<ListPostsQuery>,
) -> Response {
    let vars = state.pages.standard_vars(uri.path(), user.as_ref());
    let filter = query.filter(true).unwrap_or_else(|_| PostFilter {
        q: query.q.clone(),
        published_only: true,
        ..PostFilter::default()
    });
    let category = filter.category.as_ref().map(|c| c.as_str()).unwrap_or("");
    let base_query = post_query_string(query.q.as_deref(), category);

    match state
        .post_service
        .list(filter, PageParams::new(query.page, query.page_size))
        .await
    {
        Ok(result) => {
            let mut ctx = TeraContext::new();
            ctx.insert("result", &result);
            ctx.insert("q", &query.q.as_deref().unwrap_or(""));
            ctx.insert("category", category);
            ctx.insert("base_query", &base_query);
            state.pages.page(StatusCode::OK, "posts.html", &ctx, &vars)
        }
        Err(e) => state.pages.service_error(e, &vars),
    }
}

pub(super) async fn post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response {
    let vars = state.pages.standard_vars(uri.path(), user.as_ref());
    let post = match state.post_service.view(&slug).await {
        Ok(post) => post,
        Err(e) => return state.pages.service_error(e, &vars),
    };
    let comments = match state.comment_service.list_for_post(post.id).await {
        Ok(comments) => comments,
        Err(e) => return state.pages.service_error(e, &vars),
    };

    let mut ctx = TeraContext::new();
    ctx.insert("post", &post);
    ctx.insert("comments", &comments);
    state.pages.page(StatusCode::OK, "post.html", &ctx, &vars)
}

/// Query string that reproduces the current directory view, without `page`
pub(super) fn mentor_query_string(
    q: Option<&str>,
    skill: Option<&str>,
    sort: MentorSort,
    direction: SortDirection,
) -> String {
    let mut parts = Vec::new();
    if let Some(q) = q {
        parts.push(format!("q={}", urlencoding::encode(q)));
    }
    if let Some(skill) = skill {
        parts.push(format!("skill={}", urlencoding::encode(skill)));
    }
    parts.push(format!("sort={}", sort));
    parts.push(format!("order={}", direction));
    parts.join("&")
}

fn post_query_string(q: Option<&str>, category: &str) -> String {
    let mut parts = Vec::new();
    if let Some(q) = q {
        parts.push(format!("q={}", urlencoding::encode(q)));
    }
    if !category.is_empty() {
        parts.push(format!("category={}", category));
    }
    parts.join("&")
}
