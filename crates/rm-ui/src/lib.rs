//! # rm-ui
//!
//! Askama templates for the four views. Handlers build the view structs
//! here and call `render()`; templates only print and loop.

use askama::Template;
use chrono::{DateTime, Utc};
use rm_core::models::{Comment, FaultDetail, FaultStatus, Machine};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub title: &'a str,
    pub notice: Option<&'a str>,
    pub machines: &'a [Machine],
}

#[derive(Template)]
#[template(path = "machine.html")]
pub struct MachineTemplate<'a> {
    pub title: String,
    pub notice: Option<&'a str>,
    pub machine: &'a Machine,
    pub created: String,
    pub qr_url: String,
    pub faults: Vec<FaultView>,
}

#[derive(Template)]
#[template(path = "create.html")]
pub struct CreateTemplate<'a> {
    pub title: &'a str,
    pub notice: Option<&'a str>,
    /// Echo of the rejected code, if any
    pub code: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub title: &'a str,
    pub message: &'a str,
}

pub struct StatusOption {
    pub label: &'static str,
    pub selected: bool,
}

pub struct CommentView {
    pub text: String,
    pub author: String,
    pub date: String,
}

pub struct FaultView {
    pub id: i64,
    pub description: String,
    pub status: String,
    pub technician: String,
    pub resolution: String,
    pub reported: String,
    pub comments: Vec<CommentView>,
    pub status_options: Vec<StatusOption>,
    /// The current label is outside the offered set (set by an older client)
    pub custom_status: bool,
}

impl From<&Comment> for CommentView {
    fn from(c: &Comment) -> Self {
        Self {
            text: c.text.clone(),
            author: c.author.clone().unwrap_or_else(|| "anonymous".to_string()),
            date: format_date(&c.created_at),
        }
    }
}

impl From<&FaultDetail> for FaultView {
    fn from(detail: &FaultDetail) -> Self {
        let fault = &detail.fault;
        let status_options = FaultStatus::ALL
            .iter()
            .map(|s| StatusOption { label: s.label(), selected: s.label() == fault.status })
            .collect();
        Self {
            id: fault.id,
            description: fault.description.clone(),
            status: fault.status.clone(),
            technician: fault.technician.clone().unwrap_or_default(),
            resolution: fault.resolution.clone().unwrap_or_default(),
            reported: format_date(&fault.reported_at),
            comments: detail.comments.iter().map(CommentView::from).collect(),
            status_options,
            custom_status: FaultStatus::from_label(&fault.status).is_none(),
        }
    }
}

impl<'a> MachineTemplate<'a> {
    pub fn new(machine: &'a Machine, faults: &[FaultDetail], qr_url: String, notice: Option<&'a str>) -> Self {
        Self {
            title: format!("{} ({})", machine.name, machine.code),
            notice,
            machine,
            created: format_date(&machine.created_at),
            qr_url,
            faults: faults.iter().map(FaultView::from).collect(),
        }
    }
}
