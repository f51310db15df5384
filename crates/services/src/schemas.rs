//! Declared input schemas for each action, and the typed values they yield.

use domains::{FormData, Language, Profile, Result, Role, Theme, UserId, Validator};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 50;
pub const TITLE_MAX: usize = 100;
pub const CONTENT_MIN: usize = 10;
pub const CONTENT_MAX: usize = 1000;
pub const COMMENT_MAX: usize = 500;
pub const AGE_MIN: f64 = 18.0;
pub const AGE_MAX: f64 = 120.0;
pub const TAGS_MAX: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub published: bool,
    pub author_id: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub content: String,
    pub post_id: String,
    pub author_id: UserId,
}

/// Partial user update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }
}

fn owned(form: &FormData, field: &str) -> String {
    form.text(field).unwrap_or_default().to_owned()
}

fn user_rules(v: &mut Validator<'_>, required: bool) {
    let name_min = format!("Name must be at least {NAME_MIN} characters");
    let name_max = format!("Name must be at most {NAME_MAX} characters");
    let email = "Please enter a valid email address";
    let role = "Please select a valid role";

    if required {
        v.text("name").min_len(NAME_MIN, &name_min).max_len(NAME_MAX, &name_max);
        v.text("email").email(email);
        v.text("role").one_of(&Role::ALLOWED, role);
    } else {
        v.optional_text("name")
            .min_len(NAME_MIN, &name_min)
            .max_len(NAME_MAX, &name_max);
        v.optional_text("email").email(email);
        v.optional_text("role").one_of(&Role::ALLOWED, role);
    }
}

pub fn new_user(form: &FormData) -> Result<NewUser> {
    let mut v = Validator::new(form);
    user_rules(&mut v, true);
    v.finish()?;

    Ok(NewUser {
        name: owned(form, "name"),
        email: owned(form, "email"),
        role: form.text("role").and_then(Role::parse).unwrap_or(Role::User),
    })
}

pub fn user_changes(form: &FormData) -> Result<UserChanges> {
    let mut v = Validator::new(form);
    user_rules(&mut v, false);
    v.finish()?;

    Ok(UserChanges {
        name: form.text("name").map(str::to_owned),
        email: form.text("email").map(str::to_owned),
        role: form.text("role").and_then(Role::parse),
    })
}

pub fn new_post(form: &FormData) -> Result<NewPost> {
    let title_max = format!("Title must be at most {TITLE_MAX} characters");
    let content_min = format!("Content must be at least {CONTENT_MIN} characters");
    let content_max = format!("Content must be at most {CONTENT_MAX} characters");

    let mut v = Validator::new(form);
    v.text("title")
        .min_len(1, "Please enter a title")
        .max_len(TITLE_MAX, &title_max);
    v.text("content")
        .min_len(CONTENT_MIN, &content_min)
        .max_len(CONTENT_MAX, &content_max);
    v.flag("published", false);
    v.text("authorId").min_len(1, "An author is required");
    v.finish()?;

    Ok(NewPost {
        title: owned(form, "title"),
        content: owned(form, "content"),
        published: form.flag("published").unwrap_or(false),
        author_id: UserId::from(owned(form, "authorId")),
    })
}

pub fn new_comment(form: &FormData) -> Result<NewComment> {
    let content_max = format!("Comments must be at most {COMMENT_MAX} characters");

    let mut v = Validator::new(form);
    v.text("content")
        .min_len(1, "Please enter a comment")
        .max_len(COMMENT_MAX, &content_max);
    v.text("postId").min_len(1, "A post ID is required");
    v.text("authorId").min_len(1, "An author is required");
    v.finish()?;

    Ok(NewComment {
        content: owned(form, "content"),
        post_id: owned(form, "postId"),
        author_id: UserId::from(owned(form, "authorId")),
    })
}

pub fn profile(form: &FormData) -> Result<Profile> {
    let age_range = format!("Age must be between {AGE_MIN} and {AGE_MAX}");
    let too_many_tags = format!("At most {TAGS_MAX} tags are allowed");

    let mut v = Validator::new(form);
    v.number("age")
        .integer("Age must be a whole number")
        .range(AGE_MIN, AGE_MAX, &age_range);
    v.flag("newsletter", true);
    v.text("theme").one_of(&Theme::ALLOWED, "Please select a valid theme");
    v.text("language")
        .one_of(&Language::ALLOWED, "Please select a valid language");
    v.list("tags").max_items(TAGS_MAX, &too_many_tags);
    v.finish()?;

    Ok(Profile {
        // Range-checked above.
        age: form.number("age").unwrap_or(AGE_MIN) as u8,
        newsletter: form.flag("newsletter").unwrap_or(false),
        theme: form.text("theme").and_then(Theme::parse).unwrap_or(Theme::Auto),
        language: form
            .text("language")
            .and_then(Language::parse)
            .unwrap_or(Language::En),
        tags: form.list("tags"),
    })
}
