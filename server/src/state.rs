use crate::db::UserStore;
use crate::env::Env;
use crate::session::SessionStore;
use crate::sms::SmsRelay;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) env: Arc<Env>,
    pub(crate) db: Arc<dyn UserStore>,
    pub(crate) sessions: SessionStore,
    pub(crate) sms: Arc<SmsRelay>,
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

#[cfg(test)]
pub(crate) fn state_with_users(db: Arc<dyn UserStore>) -> AppState {
    use envconfig::Envconfig;

    let env = Env::init_from_hashmap(&std::collections::HashMap::new()).unwrap();
    let sms = SmsRelay::from_env(&env).unwrap();

    AppState {
        env: Arc::new(env),
        db,
        sessions: SessionStore::default(),
        sms: Arc::new(sms),
    }
}

/// A `Database` whose pool never connects. Every query fails fast.
#[cfg(test)]
pub(crate) fn unreachable_database() -> crate::db::Database {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(500))
        .connect_lazy("postgres://portier@127.0.0.1:1/portier")
        .unwrap();
    crate::db::Database::with_pool(pool)
}
