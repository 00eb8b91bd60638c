//! Tera template engine wrapper.

use actix_web::HttpResponse;
use tera::{Context, Tera};

use crate::middleware::auth::Viewer;
use crate::middleware::error::AppResult;

/// Loaded templates, shared by every worker.
pub struct Templates {
    engine: Tera,
}

impl Templates {
    /// Load every `*.html` file under `dir`.
    pub fn new(dir: &str) -> Result<Self, tera::Error> {
        let engine = Tera::new(&format!("{}/**/*.html", dir.trim_end_matches('/')))?;
        tracing::debug!(
            templates = engine.get_template_names().count(),
            "Templates loaded from {}",
            dir
        );
        Ok(Self { engine })
    }

    /// Render `name` with `context` plus the current viewer.
    pub fn render(&self, name: &str, mut context: Context, viewer: &Viewer) -> AppResult<String> {
        context.insert("viewer", viewer);
        Ok(self.engine.render(name, &context)?)
    }

    /// Render into a `200 OK` HTML response.
    pub fn page(&self, name: &str, context: Context, viewer: &Viewer) -> AppResult<HttpResponse> {
        let body = self.render(name, context, viewer)?;
        Ok(html(body))
    }

    /// Render without request data; used by the error pages.
    pub fn render_bare(&self, name: &str, context: &Context) -> Result<String, tera::Error> {
        self.engine.render(name, context)
    }
}

pub fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}
