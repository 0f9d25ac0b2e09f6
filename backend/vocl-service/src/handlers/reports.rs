/// Report submission and the moderator/admin console
use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{
    AuditLogQuery, BanRequest, CreateReportRequest, ReportQuery, ResolveReportRequest,
    SetRoleRequest,
};
use crate::state::AppState;

pub async fn create_report(
    state: web::Data<AppState>,
    user: UserId,
    req: web::Json<CreateReportRequest>,
) -> Result<HttpResponse> {
    let report = state.reports.create_report(user.0, &req).await?;
    Ok(HttpResponse::Created().json(report))
}

pub async fn list_reports(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    let reports = state.reports.list_reports(user.0, &query).await?;
    Ok(HttpResponse::Ok().json(reports))
}

pub async fn resolve_report(
    state: web::Data<AppState>,
    user: UserId,
    report_id: web::Path<Uuid>,
    req: web::Json<ResolveReportRequest>,
) -> Result<HttpResponse> {
    let report = state.reports.resolve_report(user.0, *report_id, &req).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn set_role(
    state: web::Data<AppState>,
    user: UserId,
    target_id: web::Path<Uuid>,
    req: web::Json<SetRoleRequest>,
) -> Result<HttpResponse> {
    let profile = state.reports.set_role(user.0, *target_id, req.role).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn ban_user(
    state: web::Data<AppState>,
    user: UserId,
    target_id: web::Path<Uuid>,
    req: Option<web::Json<BanRequest>>,
) -> Result<HttpResponse> {
    let req = req.map(web::Json::into_inner).unwrap_or_default();
    let profile = state.reports.ban_user(user.0, *target_id, &req).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn unban_user(
    state: web::Data<AppState>,
    user: UserId,
    target_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let profile = state.reports.unban_user(user.0, *target_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn list_audit_logs(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<AuditLogQuery>,
) -> Result<HttpResponse> {
    let logs = state.reports.list_audit_logs(user.0, &query).await?;
    Ok(HttpResponse::Ok().json(logs))
}
