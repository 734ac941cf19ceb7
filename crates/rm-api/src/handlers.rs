//! # rm-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the workflows.
//! User-fixable failures become a redirect with a notice; the rest bubble up
//! as `HttpError` and render the error page.

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use askama::Template;
use rm_core::error::AppError;
use rm_core::models::{validate_code, FaultUpdate, NewFault, NewMachine};
use rm_ui::{CreateTemplate, IndexTemplate, MachineTemplate};
use serde::Deserialize;

use crate::error::HttpError;
use crate::notice::{Notice, NoticeQuery};
use crate::workflow::{self, AppState};

type HandlerResult = Result<HttpResponse, HttpError>;

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    pub codigo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportForm {
    pub descripcion: Option<String>,
    pub tecnico: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub comentario: Option<String>,
    pub autor_comentario: Option<String>,
    pub estado: Option<String>,
    pub solucion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateForm {
    pub nombre: Option<String>,
    pub codigo: Option<String>,
    pub descripcion: Option<String>,
}

fn see_other(location: impl Into<String>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.into()))
        .finish()
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(body)
}

fn machine_path(code: &str) -> String {
    format!("/maquina/{code}")
}

fn not_found_home() -> HttpResponse {
    see_other(Notice::NotFound.location("/"))
}

/// Landing page: search box plus the registered machines.
pub async fn index(data: web::Data<AppState>, query: web::Query<NoticeQuery>) -> HandlerResult {
    let machines = data.repo.list_machines().await?;
    let page = IndexTemplate { title: "Maintenance", notice: query.message(), machines: &machines }.render()?;
    Ok(html(page))
}

/// `POST /buscar`: jump to the machine or back to the search with a notice.
pub async fn search(data: web::Data<AppState>, form: web::Form<SearchForm>) -> HandlerResult {
    let code = form.codigo.as_deref().unwrap_or_default();
    match workflow::lookup_by_code(&data, code).await {
        Ok(machine) => Ok(see_other(machine_path(&machine.code))),
        Err(AppError::NotFound { .. }) => {
            log::warn!("search for unknown machine code {code:?}");
            Ok(not_found_home())
        }
        Err(e) => Err(e.into()),
    }
}

/// Renders a machine with its faults and comment logs.
pub async fn view_machine(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<NoticeQuery>,
) -> HandlerResult {
    let code = path.into_inner();
    let detail = match workflow::machine_view(&data, &code).await {
        Ok(detail) => detail,
        Err(AppError::NotFound { .. }) => return Ok(not_found_home()),
        Err(e) => return Err(e.into()),
    };

    let qr_url = data.qr.url(&detail.machine.code);
    let page = MachineTemplate::new(&detail.machine, &detail.faults, qr_url, query.message()).render()?;
    Ok(html(page))
}

/// `POST /maquina/{codigo}`: report a new fault.
pub async fn report_fault(
    data: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<ReportForm>,
) -> HandlerResult {
    let code = path.into_inner();
    let new = NewFault::new(form.descripcion.as_deref().unwrap_or_default(), form.tecnico.as_deref());

    match workflow::report_fault(&data, &code, new).await {
        Ok(_) => Ok(see_other(Notice::Reported.location(&machine_path(&code)))),
        Err(AppError::NotFound { .. }) => Ok(not_found_home()),
        Err(AppError::Validation(reason)) => {
            log::warn!("fault report on {code} rejected: {reason}");
            Ok(see_other(Notice::Invalid.location(&machine_path(&code))))
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /machine/{codigo}`: the path printed in QR codes.
pub async fn follow_qr_link(path: web::Path<String>) -> HttpResponse {
    let code = path.into_inner();
    if validate_code(&code).is_err() {
        return not_found_home();
    }
    HttpResponse::PermanentRedirect()
        .insert_header((header::LOCATION, machine_path(&code)))
        .finish()
}

/// `POST /falla/comentar/{id}` and `/falla/actualizar/{id}`.
pub async fn update_fault(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Form<UpdateForm>,
) -> HandlerResult {
    let fault_id = path.into_inner();
    let update = FaultUpdate::from_form(
        form.comentario.as_deref(),
        form.autor_comentario.as_deref(),
        form.estado.as_deref(),
        form.solucion.as_deref(),
    );

    match workflow::comment_or_update(&data, fault_id, update).await {
        Ok((_, machine)) => Ok(see_other(Notice::Updated.location(&machine_path(&machine.code)))),
        Err(AppError::NotFound { .. }) => Ok(not_found_home()),
        Err(AppError::Validation(reason)) => {
            log::warn!("update of fault #{fault_id} rejected: {reason}");
            match workflow::owning_machine(&data, fault_id).await {
                Ok(machine) => Ok(see_other(Notice::Invalid.location(&machine_path(&machine.code)))),
                Err(AppError::NotFound { .. }) => Ok(not_found_home()),
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /admin/crear`
pub async fn create_form(query: web::Query<NoticeQuery>) -> HandlerResult {
    let code = query
        .codigo
        .as_deref()
        .filter(|c| validate_code(c).is_ok())
        .unwrap_or_default();
    let page = CreateTemplate { title: "New machine", notice: query.message(), code }.render()?;
    Ok(html(page))
}

/// `POST /admin/crear`: register the machine and its QR image.
pub async fn create_machine(data: web::Data<AppState>, form: web::Form<CreateForm>) -> HandlerResult {
    let new = NewMachine::new(
        form.nombre.as_deref().unwrap_or_default(),
        form.codigo.as_deref().unwrap_or_default(),
        form.descripcion.as_deref(),
    );

    match workflow::admin_create(&data, new).await {
        Ok(machine) => Ok(see_other(Notice::Created.location(&machine_path(&machine.code)))),
        Err(AppError::DuplicateCode(code)) => {
            log::warn!("machine code {code} already exists");
            Ok(see_other(format!(
                "{}&codigo={code}",
                Notice::DuplicateCode.location("/admin/crear")
            )))
        }
        Err(AppError::Validation(reason)) => {
            log::warn!("machine creation rejected: {reason}");
            Ok(see_other(Notice::Invalid.location("/admin/crear")))
        }
        Err(e) => Err(e.into()),
    }
}
