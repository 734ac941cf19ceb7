//! Maps domain failures to HTTP responses.
//!
//! User-fixable conditions are normally turned into redirects by the handlers;
//! whatever reaches this type is rendered as an error page. Details of storage
//! and QR failures go to the log, never to the page.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use askama::Template;
use rm_core::error::AppError;
use rm_ui::ErrorTemplate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

impl HttpError {
    fn public_message(&self) -> &'static str {
        match self {
            HttpError::App(AppError::NotFound { .. }) => "The requested record does not exist.",
            HttpError::App(AppError::DuplicateCode(_)) => "That machine code is already in use.",
            HttpError::App(AppError::Validation(_)) => "The submitted form was incomplete.",
            _ => "The request could not be completed. Nothing was saved; please try again.",
        }
    }
}

impl ResponseError for HttpError {
    fn status_code(&self) -> StatusCode {
        match self {
            HttpError::App(AppError::NotFound { .. }) => StatusCode::NOT_FOUND,
            HttpError::App(AppError::DuplicateCode(_)) => StatusCode::CONFLICT,
            HttpError::App(AppError::Validation(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("request failed: {self}");
        } else {
            log::warn!("request rejected: {self}");
        }

        let page = ErrorTemplate { title: "Error", message: self.public_message() }.render();
        match page {
            Ok(html) => HttpResponse::build(status).content_type("text/html; charset=utf-8").body(html),
            Err(_) => HttpResponse::build(status).body(self.public_message()),
        }
    }
}
