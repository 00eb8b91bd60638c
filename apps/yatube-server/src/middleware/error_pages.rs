//! Custom error pages for 400, 403, 404 and 500 responses.

use actix_web::{
    HttpMessage, Result,
    dev::ServiceResponse,
    http::{
        StatusCode,
        header::{self, HeaderValue},
    },
    middleware::{ErrorHandlerResponse, ErrorHandlers},
    web,
};
use tera::Context;
use yatube_shared::ErrorResponse;

use crate::middleware::auth::{Viewer, identify};
use crate::observability::RequestId;
use crate::state::AppState;

const ERROR_TEMPLATE: &str = "core/error.html";

/// Middleware replacing error bodies with the rendered error page.
pub fn error_pages<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(StatusCode::BAD_REQUEST, render_error_page)
        .handler(StatusCode::FORBIDDEN, render_error_page)
        .handler(StatusCode::NOT_FOUND, render_error_page)
        .handler(StatusCode::INTERNAL_SERVER_ERROR, render_error_page)
}

fn render_error_page<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    let (req, res) = res.into_parts();
    let status = res.status();

    let mut problem = ErrorResponse::for_status(status.as_u16()).with_instance(req.path());
    if let Some(request_id) = req.extensions().get::<RequestId>() {
        problem = problem.with_request_id(request_id.as_str());
    }

    let body = match req.app_data::<web::Data<AppState>>() {
        Some(state) => {
            let mut context = Context::new();
            context.insert("problem", &problem);
            context.insert("viewer", &Viewer::from(identify(&req).ok().as_ref()));
            state
                .templates
                .render_bare(ERROR_TEMPLATE, &context)
                .unwrap_or_else(|e| {
                    tracing::error!("Unable to render error page: {}", e);
                    format!("{} {}", problem.status, problem.title)
                })
        }
        None => format!("{} {}", problem.status, problem.title),
    };

    let mut res = res.set_body(body);
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    let res = ServiceResponse::new(req, res)
        .map_into_boxed_body()
        .map_into_right_body();
    Ok(ErrorHandlerResponse::Response(res))
}
