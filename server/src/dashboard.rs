use crate::db::UserSummary;
use crate::error::ServerError;
use crate::session::Authenticated;
use crate::state::AppState;
use askama::Template;
use axum::extract::State;
use axum::response::Html;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub(crate) struct DashboardTemplate {
    greeting: String,
    users: Vec<UserSummary>,
}

pub(crate) async fn dashboard(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Html<String>, ServerError> {
    let users = state.db.list_users().await?;
    let greeting = state
        .sessions
        .username(&auth.session_id)
        .unwrap_or_else(|| "local network".to_string());

    let template = DashboardTemplate { greeting, users };
    Ok(Html(template.render()?))
}
