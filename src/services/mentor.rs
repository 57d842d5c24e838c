//! Mentor service
//!
//! Business rules for the mentor roster:
//! - Validated create/update with unique slugs
//! - Directory listing with search, skill filter, sort and pagination
//! - Published toggle and skill replacement
//! - Public profile assembly (skills, rendered bio, visible reviews)

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{MentorRepository, ReviewRepository};
use crate::models::{
    Mentor, MentorFilter, MentorInput, MentorProfile, MentorSort, MentorWithSkills, PageParams,
    PagedResult, SortDirection,
};
use crate::services::error::{is_valid_email, require_fields, ServiceError};
use crate::services::home::HOME_CACHE_PATTERN;
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::unique_slug;
use anyhow::Context;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Skills kept per mentor
pub const MAX_SKILLS: usize = 20;

/// Reviews shown on a profile page
const PROFILE_REVIEW_LIMIT: i64 = 20;

pub struct MentorService {
    repo: Arc<dyn MentorRepository>,
    reviews: Arc<dyn ReviewRepository>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
}

impl MentorService {
    pub fn new(
        repo: Arc<dyn MentorRepository>,
        reviews: Arc<dyn ReviewRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            reviews,
            cache,
            markdown: MarkdownRenderer::new(),
        }
    }

    /// Create a mentor; `input.skills`, when given, becomes the skill list
    pub async fn create(&self, input: MentorInput) -> Result<MentorWithSkills, ServiceError> {
        validate_input(&input)?;

        let slug = self.unique_slug(input.slug.as_deref(), &input.full_name, None).await?;
        let now = Utc::now();
        let mentor = Mentor {
            id: 0,
            slug,
            full_name: input.full_name.trim().to_string(),
            title: input.title.trim().to_string(),
            company: trimmed(input.company),
            bio: input.bio,
            avatar_url: trimmed(input.avatar_url),
            email: trimmed(input.email),
            linkedin_url: trimmed(input.linkedin_url),
            location: trimmed(input.location),
            years_experience: input.years_experience,
            is_published: input.is_published,
            is_featured: input.is_featured,
            sort_order: input.sort_order,
            rating_total: 0,
            rating_count: 0,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&mentor).await.context("Failed to create mentor")?;
        let skills = match input.skills {
            Some(names) => self.write_skills(created.id, names).await?,
            None => Vec::new(),
        };

        tracing::info!("Created mentor {} ({})", created.id, created.slug);
        self.invalidate_home().await?;
        Ok(MentorWithSkills::new(created, skills))
    }

    /// Replace every editable field. Skills change only when `input.skills` is set.
    pub async fn update(
        &self,
        id: i64,
        input: MentorInput,
    ) -> Result<MentorWithSkills, ServiceError> {
        validate_input(&input)?;
        let existing = self.require(id).await?;

        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(requested) if requested == existing.slug => existing.slug.clone(),
            Some(requested) => self.unique_slug(Some(requested), &input.full_name, Some(id)).await?,
            None => existing.slug.clone(),
        };

        let mentor = Mentor {
            slug,
            full_name: input.full_name.trim().to_string(),
            title: input.title.trim().to_string(),
            company: trimmed(input.company),
            bio: input.bio,
            avatar_url: trimmed(input.avatar_url),
            email: trimmed(input.email),
            linkedin_url: trimmed(input.linkedin_url),
            location: trimmed(input.location),
            years_experience: input.years_experience,
            is_published: input.is_published,
            is_featured: input.is_featured,
            sort_order: input.sort_order,
            ..existing
        };
        let updated = self.repo.update(&mentor).await.context("Failed to update mentor")?;

        let skills = match input.skills {
            Some(names) => self.write_skills(id, names).await?,
            None => self.repo.get_skills(id).await.context("Failed to load skills")?,
        };

        self.invalidate_home().await?;
        Ok(MentorWithSkills::new(updated, skills))
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete mentor")? {
            return Err(ServiceError::not_found(format!("Mentor {}", id)));
        }
        tracing::info!("Deleted mentor {}", id);
        self.invalidate_home().await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<MentorWithSkills, ServiceError> {
        let mentor = self.require(id).await?;
        let skills = self.repo.get_skills(id).await.context("Failed to load skills")?;
        Ok(MentorWithSkills::new(mentor, skills))
    }

    /// Fetch by slug. Unpublished mentors are hidden unless `include_unpublished`.
    pub async fn get_by_slug(
        &self,
        slug: &str,
        include_unpublished: bool,
    ) -> Result<MentorWithSkills, ServiceError> {
        let mentor = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get mentor by slug")?
            .filter(|m| include_unpublished || m.is_published)
            .ok_or_else(|| ServiceError::not_found(format!("Mentor '{}'", slug)))?;
        let skills = self.repo.get_skills(mentor.id).await.context("Failed to load skills")?;
        Ok(MentorWithSkills::new(mentor, skills))
    }

    /// Directory page: filtered, sorted and paged, with skills attached
    pub async fn list(
        &self,
        mut filter: MentorFilter,
        params: PageParams,
    ) -> Result<PagedResult<MentorWithSkills>, ServiceError> {
        filter.q = filter.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
        filter.skill = filter.skill.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        filter.limit = params.limit();
        filter.offset = params.offset();

        let mentors = self.repo.list(&filter).await.context("Failed to list mentors")?;
        let total = self.repo.count(&filter).await.context("Failed to count mentors")?;

        let ids: Vec<i64> = mentors.iter().map(|m| m.id).collect();
        let mut skills = self
            .repo
            .get_skills_for(&ids)
            .await
            .context("Failed to load skills")?;

        let items = mentors
            .into_iter()
            .map(|m| {
                let names = skills.remove(&m.id).unwrap_or_default();
                MentorWithSkills::new(m, names)
            })
            .collect();
        Ok(PagedResult::new(items, total, params))
    }

    /// Published, featured mentors in roster order
    pub async fn featured(&self, limit: u32) -> Result<Vec<MentorWithSkills>, ServiceError> {
        let filter = MentorFilter {
            featured_only: true,
            ..MentorFilter::default()
        };
        Ok(self.list(filter, PageParams::new(1, limit)).await?.items)
    }

    /// Flip `is_published` with a single update
    pub async fn toggle_published(&self, id: i64) -> Result<Mentor, ServiceError> {
        let mentor = self.require(id).await?;
        let published = !mentor.is_published;
        if !self
            .repo
            .set_published(id, published)
            .await
            .context("Failed to toggle mentor")?
        {
            return Err(ServiceError::not_found(format!("Mentor {}", id)));
        }

        tracing::info!("Mentor {} published = {}", id, published);
        self.invalidate_home().await?;
        Ok(Mentor {
            is_published: published,
            ..mentor
        })
    }

    /// Replace the mentor's skills, returning the stored list
    pub async fn set_skills(&self, id: i64, names: Vec<String>) -> Result<Vec<String>, ServiceError> {
        self.require(id).await?;
        let skills = self.write_skills(id, names).await?;
        self.invalidate_home().await?;
        Ok(skills)
    }

    /// Skill names in use by published mentors, most used first
    pub async fn skill_counts(&self) -> Result<Vec<(String, i64)>, ServiceError> {
        Ok(self.repo.skill_counts().await.context("Failed to count skills")?)
    }

    /// Public profile: mentor, skills, rendered bio and visible reviews
    pub async fn profile(&self, slug: &str) -> Result<MentorProfile, ServiceError> {
        let mentor = self.get_by_slug(slug, false).await?;
        let (reviews, _) = self
            .reviews
            .list_for_mentor(mentor.mentor.id, true, PROFILE_REVIEW_LIMIT, 0)
            .await
            .context("Failed to load reviews")?;
        let bio_html = self.markdown.render(&mentor.mentor.bio);

        Ok(MentorProfile {
            mentor,
            bio_html,
            reviews,
        })
    }

    async fn write_skills(&self, id: i64, names: Vec<String>) -> Result<Vec<String>, ServiceError> {
        let skills = normalize_skills(names);
        self.repo
            .replace_skills(id, &skills)
            .await
            .context("Failed to replace skills")?;
        Ok(skills)
    }

    async fn require(&self, id: i64) -> Result<Mentor, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get mentor")?
            .ok_or_else(|| ServiceError::not_found(format!("Mentor {}", id)))
    }

    async fn unique_slug(
        &self,
        requested: Option<&str>,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, ServiceError> {
        let repo = &self.repo;
        let slug = unique_slug(requested, name, "mentor", |candidate| async move {
            repo.slug_exists(&candidate, exclude_id).await
        })
        .await
        .context("Failed to check slug")?;
        Ok(slug)
    }

    async fn invalidate_home(&self) -> Result<(), ServiceError> {
        self.cache
            .delete_pattern(HOME_CACHE_PATTERN)
            .await
            .context("Failed to invalidate home cache")?;
        Ok(())
    }
}

fn validate_input(input: &MentorInput) -> Result<(), ServiceError> {
    require_fields(&[("full_name", &input.full_name), ("title", &input.title)])?;
    if input.years_experience < 0 {
        return Err(ServiceError::validation("years_experience cannot be negative"));
    }
    if let Some(email) = input.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        if !is_valid_email(email) {
            return Err(ServiceError::validation("Invalid email format"));
        }
    }
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim, drop empties, dedupe case-insensitively (first spelling wins) and
/// keep at most [`MAX_SKILLS`]
pub fn normalize_skills(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_lowercase()))
        .take(MAX_SKILLS)
        .collect()
}

/// Sort an already loaded slice by a directory field.
///
/// Ties fall back to name, then id, so the order is deterministic.
pub fn sort_mentors(mentors: &mut [MentorWithSkills], sort: MentorSort, direction: SortDirection) {
    mentors.sort_by(|a, b| {
        let (a, b) = match direction {
            SortDirection::Asc => (a, b),
            SortDirection::Desc => (b, a),
        };
        compare_by(&a.mentor, &b.mentor, sort)
            .then_with(|| a.mentor.full_name.to_lowercase().cmp(&b.mentor.full_name.to_lowercase()))
            .then_with(|| a.mentor.id.cmp(&b.mentor.id))
    });
}

fn compare_by(a: &Mentor, b: &Mentor, sort: MentorSort) -> Ordering {
    match sort {
        MentorSort::SortOrder => a.sort_order.cmp(&b.sort_order),
        MentorSort::Name => a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()),
        MentorSort::Newest => a.created_at.cmp(&b.created_at),
        MentorSort::Experience => a.years_experience.cmp(&b.years_experience),
        MentorSort::Rating => {
            let average = |m: &Mentor| m.rating().average.unwrap_or(0.0);
            average(a)
                .partial_cmp(&average(b))
                .unwrap_or(Ordering::Equal)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxMentorRepository, SqlxReviewRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use proptest::prelude::*;
    use std::time::Duration;

    pub(crate) fn build_service(pool: &DynDatabasePool, cache: Arc<Cache>) -> MentorService {
        MentorService::new(
            SqlxMentorRepository::boxed(pool.clone()),
            SqlxReviewRepository::boxed(pool.clone()),
            cache,
        )
    }

    async fn setup() -> (DynDatabasePool, Arc<Cache>, MentorService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let cache = create_cache(&CacheConfig::default());
        let service = build_service(&pool, cache.clone());
        (pool, cache, service)
    }

    pub(crate) fn input(name: &str, published: bool) -> MentorInput {
        MentorInput {
            full_name: name.to_string(),
            title: "Talent Partner".to_string(),
            bio: "Helps with **interviews**.".to_string(),
            is_published: published,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_name_and_title() {
        let (_pool, _cache, service) = setup().await;

        let missing_title = MentorInput {
            full_name: "Ana".to_string(),
            ..Default::default()
        };
        let err = service.create(missing_title).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(ref m) if m.contains("title")));

        let bad_email = MentorInput {
            email: Some("nope".to_string()),
            ..input("Ana", true)
        };
        assert!(matches!(
            service.create(bad_email).await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_slug_generated_and_unique() {
        let (_pool, _cache, service) = setup().await;

        let first = service.create(input("Ana Tran", true)).await.unwrap();
        let second = service.create(input("Ana Tran", true)).await.unwrap();
        assert_eq!(first.mentor.slug, "ana-tran");
        assert_eq!(second.mentor.slug, "ana-tran-2");

        // Keeping its own slug on update is not a conflict
        let updated = service
            .update(
                first.mentor.id,
                MentorInput {
                    slug: Some("ana-tran".to_string()),
                    ..input("Ana Tran", true)
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.mentor.slug, "ana-tran");

        // Taking another mentor's slug gets a suffix
        let renamed = service
            .update(
                second.mentor.id,
                MentorInput {
                    slug: Some("ana-tran".to_string()),
                    ..input("Ana Tran", true)
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.mentor.slug, "ana-tran-2");
    }

    #[tokio::test]
    async fn test_set_skills_normalizes() {
        let (_pool, _cache, service) = setup().await;
        let mentor = service.create(input("Ana", true)).await.unwrap();

        let skills = service
            .set_skills(
                mentor.mentor.id,
                vec![
                    " Hiring ".to_string(),
                    "hiring".to_string(),
                    "".to_string(),
                    "Coaching".to_string(),
                ],
            )
            .await
            .unwrap();
        assert_eq!(skills, vec!["Hiring", "Coaching"]);
        assert_eq!(service.get_by_id(mentor.mentor.id).await.unwrap().skills, skills);

        let missing = service.set_skills(9999, vec!["x".to_string()]).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_published_hides_profile() {
        let (_pool, _cache, service) = setup().await;
        let mentor = service.create(input("Ana", true)).await.unwrap();
        let slug = mentor.mentor.slug.clone();

        let profile = service.profile(&slug).await.unwrap();
        assert!(profile.bio_html.contains("<strong>interviews</strong>"));

        let toggled = service.toggle_published(mentor.mentor.id).await.unwrap();
        assert!(!toggled.is_published);
        assert!(matches!(service.profile(&slug).await, Err(ServiceError::NotFound(_))));
        assert!(service.get_by_slug(&slug, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (_pool, _cache, service) = setup().await;
        for name in ["Ana", "Bo", "Cam"] {
            let created = service.create(input(name, true)).await.unwrap();
            service
                .set_skills(created.mentor.id, vec!["Hiring".to_string()])
                .await
                .unwrap();
        }
        service.create(input("Draft", false)).await.unwrap();

        let page = service
            .list(
                MentorFilter {
                    sort: MentorSort::Name,
                    ..MentorFilter::default()
                },
                PageParams::new(1, 2),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        let names: Vec<&str> = page.items.iter().map(|m| m.mentor.full_name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bo"]);
        assert_eq!(page.items[0].skills, vec!["Hiring"]);

        let searched = service
            .list(
                MentorFilter {
                    q: Some("  ca ".to_string()),
                    ..MentorFilter::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(searched.total, 1);
        assert_eq!(searched.items[0].mentor.full_name, "Cam");
    }

    #[tokio::test]
    async fn test_writes_invalidate_home_cache() {
        let (_pool, cache, service) = setup().await;
        cache.set("home", &"stale", Duration::from_secs(60)).await.unwrap();

        service.create(input("Ana", true)).await.unwrap();
        assert!(cache.get::<String>("home").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (_pool, _cache, service) = setup().await;
        let mentor = service.create(input("Ana", true)).await.unwrap();
        service.delete(mentor.mentor.id).await.unwrap();
        assert!(matches!(
            service.delete(mentor.mentor.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    fn mentor(id: i64, name: &str, years: i32, total: i64, count: i64) -> MentorWithSkills {
        use crate::db::repositories::mentor::tests::test_mentor;
        let mut m = test_mentor(&name.to_lowercase(), name, true);
        m.id = id;
        m.years_experience = years;
        m.rating_total = total;
        m.rating_count = count;
        MentorWithSkills::new(m, Vec::new())
    }

    fn names(mentors: &[MentorWithSkills]) -> Vec<&str> {
        mentors.iter().map(|m| m.mentor.full_name.as_str()).collect()
    }

    #[test]
    fn test_sort_mentors() {
        let mut list = vec![
            mentor(1, "Cam", 3, 9, 2),
            mentor(2, "ana", 10, 0, 0),
            mentor(3, "Bo", 3, 5, 1),
        ];

        sort_mentors(&mut list, MentorSort::Name, SortDirection::Asc);
        assert_eq!(names(&list), vec!["ana", "Bo", "Cam"]);

        sort_mentors(&mut list, MentorSort::Experience, SortDirection::Desc);
        assert_eq!(names(&list), vec!["ana", "Cam", "Bo"]);

        sort_mentors(&mut list, MentorSort::Rating, SortDirection::Desc);
        assert_eq!(names(&list), vec!["Bo", "Cam", "ana"]);
    }

    #[test]
    fn test_normalize_skills_caps_count() {
        let many: Vec<String> = (0..30).map(|i| format!("Skill {}", i)).collect();
        assert_eq!(normalize_skills(many).len(), MAX_SKILLS);
    }

    proptest! {
        #[test]
        fn prop_normalized_skills_are_unique_and_trimmed(names in proptest::collection::vec("[ a-cA-C]{0,4}", 0..40)) {
            let skills = normalize_skills(names);
            prop_assert!(skills.len() <= MAX_SKILLS);
            let lowered: HashSet<String> = skills.iter().map(|s| s.to_lowercase()).collect();
            prop_assert_eq!(lowered.len(), skills.len());
            for s in &skills {
                prop_assert!(!s.is_empty());
                prop_assert_eq!(s.trim(), s.as_str());
            }
        }
    }
}
