use crate::application::error::{ErrorReport, HttpError};
use crate::domain::contact::{ContactErrors, ContactMessage};
use crate::domain::content::sanitize_html;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use quillpress_api_types::PostView;
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

const DISPLAY_DATE: &[FormatItem<'static>] =
    format_description!("[year]/[month padding:none]/[day padding:none]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, "ページが見つかりません", ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Site-wide values every page needs.
#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub utc_offset: UtcOffset,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub page_title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, page_title: impl Into<String>, content: T) -> Self {
        Self {
            site_title: chrome.site_title,
            page_title: page_title.into(),
            content,
        }
    }
}

#[derive(Clone)]
pub struct CategoryBadge {
    pub id: i64,
    pub name: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub date: String,
    pub iso_date: String,
    pub badges: Vec<CategoryBadge>,
    pub excerpt_html: String,
}

pub struct IndexView {
    pub posts: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

pub struct ArticleView {
    pub id: i64,
    pub title: String,
    pub date: String,
    pub iso_date: String,
    pub badges: Vec<CategoryBadge>,
    pub thumbnail_url: Option<String>,
    pub content_html: String,
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub view: LayoutContext<ArticleView>,
}

#[derive(Default)]
pub struct ContactView {
    pub name: String,
    pub email: String,
    pub message: String,
    pub name_error: Option<&'static str>,
    pub email_error: Option<&'static str>,
    pub message_error: Option<&'static str>,
    pub notice: Option<&'static str>,
}

impl ContactView {
    pub fn with_errors(message: ContactMessage, errors: ContactErrors) -> Self {
        Self {
            name: message.name,
            email: message.email,
            message: message.message,
            name_error: errors.name,
            email_error: errors.email,
            message_error: errors.message,
            notice: None,
        }
    }

    pub fn sent() -> Self {
        Self {
            notice: Some("送信しました"),
            ..Self::default()
        }
    }

    pub fn failed(message: ContactMessage) -> Self {
        Self {
            name: message.name,
            email: message.email,
            message: message.message,
            notice: Some("送信に失敗しました"),
            ..Self::default()
        }
    }
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub view: LayoutContext<ContactView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "ページが見つかりません".to_string(),
            message: "お探しの記事は見つかりませんでした。".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

/// `2024/1/5`-style date in the site's display offset.
pub fn format_display_date(value: OffsetDateTime, offset: UtcOffset) -> String {
    value
        .to_offset(offset)
        .format(DISPLAY_DATE)
        .unwrap_or_else(|_| value.date().to_string())
}

fn iso_date(value: OffsetDateTime) -> String {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

fn badges(post: &PostView) -> Vec<CategoryBadge> {
    post.post_categories
        .iter()
        .map(|entry| CategoryBadge {
            id: entry.category.id,
            name: entry.category.name.clone(),
        })
        .collect()
}

pub fn post_card(post: &PostView, offset: UtcOffset) -> PostCard {
    PostCard {
        id: post.id,
        title: post.title.clone(),
        date: format_display_date(post.created_at, offset),
        iso_date: iso_date(post.created_at),
        badges: badges(post),
        excerpt_html: sanitize_html(&post.content),
    }
}

pub fn article_view(post: PostView, offset: UtcOffset) -> ArticleView {
    let badges = badges(&post);
    ArticleView {
        id: post.id,
        date: format_display_date(post.created_at, offset),
        iso_date: iso_date(post.created_at),
        badges,
        thumbnail_url: post.thumbnail_url,
        content_html: sanitize_html(&post.content),
        title: post.title,
    }
}
