//! Not-found, duplicate and failure paths: each ends in a notice or an error
//! page and leaves the store as it was.

use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use integration_tests::Fixture;
use rm_core::{MaintenanceRepo, NewFault, NewMachine};

fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[actix_web::test]
async fn unknown_code_search_redirects_home_with_notice() {
    let fx = Fixture::new().await;
    let app = test::init_service(App::new().app_data(fx.state.clone()).configure(rm_api::configure_routes)).await;

    let req = test::TestRequest::post().uri("/buscar").set_form([("codigo", "ZZZZ")]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/?aviso=not-found");
    assert!(fx.repo().list_machines().await.unwrap().is_empty());

    let req = test::TestRequest::get().uri("/?aviso=not-found").to_request();
    let body = test::read_body(test::call_service(&app, req).await).await;
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("Machine not found"));
}

#[actix_web::test]
async fn unknown_machine_page_and_fault_redirect_home() {
    let fx = Fixture::new().await;
    let app = test::init_service(App::new().app_data(fx.state.clone()).configure(rm_api::configure_routes)).await;

    let req = test::TestRequest::get().uri("/maquina/NOPE").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/?aviso=not-found");

    let req = test::TestRequest::post()
        .uri("/maquina/NOPE")
        .set_form([("descripcion", "Leak"), ("tecnico", "Jon")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/?aviso=not-found");

    let req = test::TestRequest::post()
        .uri("/falla/comentar/99")
        .set_form([("comentario", "hello"), ("estado", "Resolved")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/?aviso=not-found");

    let req = test::TestRequest::get().uri("/machine/A-01").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/?aviso=not-found");
}

#[actix_web::test]
async fn duplicate_code_is_rejected_and_original_kept() {
    let fx = Fixture::new().await;
    let app = test::init_service(App::new().app_data(fx.state.clone()).configure(rm_api::configure_routes)).await;

    let original = fx.state.repo.create_machine(NewMachine::new("Press 1", "A001", None)).await.unwrap();

    let req = test::TestRequest::post()
        .uri("/admin/crear")
        .set_form([("nombre", "Impostor"), ("codigo", "A001"), ("descripcion", "x")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin/crear?aviso=duplicate-code&codigo=A001");

    let machines = fx.repo().list_machines().await.unwrap();
    assert_eq!(machines, vec![original]);

    let req = test::TestRequest::get()
        .uri("/admin/crear?aviso=duplicate-code&codigo=A001")
        .to_request();
    let body = test::read_body(test::call_service(&app, req).await).await;
    let body = String::from_utf8(body.to_vec()).unwrap();
    assert!(body.contains("already in use"));
    assert!(body.contains(r#"value="A001""#));
}

#[actix_web::test]
async fn invalid_forms_come_back_with_notice() {
    let fx = Fixture::new().await;
    let app = test::init_service(App::new().app_data(fx.state.clone()).configure(rm_api::configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/admin/crear")
        .set_form([("nombre", "Press"), ("codigo", "TOOLONG")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/admin/crear?aviso=invalid");
    assert!(fx.repo().list_machines().await.unwrap().is_empty());

    let machine = fx.state.repo.create_machine(NewMachine::new("Press 1", "A001", None)).await.unwrap();
    let req = test::TestRequest::post()
        .uri("/maquina/A001")
        .set_form([("descripcion", "   ")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/maquina/A001?aviso=invalid");

    let fault = fx.repo().create_fault(machine.id, NewFault::new("Leak", None)).await.unwrap();
    let long_status = "x".repeat(31);
    let req = test::TestRequest::post()
        .uri(&format!("/falla/comentar/{}", fault.id))
        .set_form([("comentario", "note"), ("estado", long_status.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/maquina/A001?aviso=invalid");
    assert!(fx.repo().list_comments(fault.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn qr_failure_rolls_back_and_renders_error_page() {
    let fx = Fixture::with_broken_qr().await;
    let app = test::init_service(App::new().app_data(fx.state.clone()).configure(rm_api::configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/admin/crear")
        .set_form([("nombre", "Press 1"), ("codigo", "A001"), ("descripcion", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Nothing was saved"));

    assert!(fx.repo().list_machines().await.unwrap().is_empty());

    // The process keeps serving.
    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
